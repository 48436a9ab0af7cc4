#[macro_use]
extern crate lazy_static;

pub mod analysis;
pub mod errors;
pub mod expressions;
pub mod functions;
pub mod imports;
pub mod parser;
pub mod types;

pub use analysis::{analyze_document, AnalysisContext, DocumentAnalysis};
pub use errors::{Cancelled, SourceError};
pub use parser::{parse, ParseResult};
