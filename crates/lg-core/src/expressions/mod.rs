//! The expression capability.
//!
//! The core never evaluates `${...}` content. It hands the fragment to an
//! [`ExpressionEngine`], which reports the calls it contains and any syntax errors, with
//! ranges relative to the fragment.

mod basic;

use std::ops::Range;

pub use basic::BasicExpressionEngine;

/// A call to a template or function found in an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    pub name: String,
    /// Range of the callee name within the fragment.
    pub span: Range<usize>,
    /// `None` when the engine cannot tell statically, e.g. with spread arguments.
    pub argument_count: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionError {
    pub message: String,
    pub span: Range<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedExpression {
    pub calls: Vec<CallSite>,
    pub errors: Vec<ExpressionError>,
}

/// Hover content for part of an expression, passed through to the editor as is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionHover {
    pub contents: String,
    pub span: Option<Range<usize>>,
}

pub trait ExpressionEngine: Send + Sync {
    fn parse(&self, expression: &str) -> ParsedExpression;

    /// Hover for the fragment at `offset`, relative to the start of the fragment.
    fn hover(&self, expression: &str, offset: usize) -> Option<ExpressionHover>;
}
