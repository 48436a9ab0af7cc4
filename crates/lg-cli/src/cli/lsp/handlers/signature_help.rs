//! Signature help handler

use super::common::{cursor_context, line_prefix, open_call, CursorContext};
use super::{Handler, TextDocumentHandler};
use crate::cli::lsp::workspace::SharedWorkspaceState;
use lg_core::functions::FunctionRegistry;
use lg_core::DocumentAnalysis;
use lsp_types::*;

#[derive(Clone)]
pub struct SignatureHelpHandler {
    workspace: SharedWorkspaceState,
}

impl SignatureHelpHandler {
    pub fn new(workspace: SharedWorkspaceState) -> Self {
        Self { workspace }
    }

    pub fn signature_help(&self, params: SignatureHelpParams) -> Option<SignatureHelp> {
        let (analysis, offset) = self.analysis_at(&params.text_document_position_params)?;
        signature_at(&analysis, offset, self.workspace.services().functions.as_ref())
    }
}

impl Handler for SignatureHelpHandler {
    fn workspace(&self) -> &SharedWorkspaceState {
        &self.workspace
    }
}

impl TextDocumentHandler for SignatureHelpHandler {}

/// Signature of the innermost unclosed call at `offset`. Templates win over functions
/// of the same name, as they do when calls are resolved.
pub fn signature_at(
    analysis: &DocumentAnalysis,
    offset: usize,
    functions: &dyn FunctionRegistry,
) -> Option<SignatureHelp> {
    let CursorContext::Expression(expression) = cursor_context(line_prefix(analysis, offset)?)
    else {
        return None;
    };
    let (callee, active) = open_call(expression)?;

    let signature = match analysis.symbols.resolve(callee) {
        Some(symbol) => information(
            symbol.signature(),
            &symbol.parameters,
            symbol.doc.clone(),
        ),
        None => {
            let function = functions.get(callee)?;
            information(function.label(), &function.parameters, Some(function.documentation.clone()))
        }
    };

    Some(SignatureHelp {
        signatures: vec![signature],
        active_signature: Some(0),
        active_parameter: Some(active),
    })
}

fn information(label: String, parameters: &[String], doc: Option<String>) -> SignatureInformation {
    SignatureInformation {
        label,
        documentation: doc.map(Documentation::String),
        parameters: Some(
            parameters
                .iter()
                .map(|name| ParameterInformation {
                    label: ParameterLabel::Simple(name.clone()),
                    documentation: None,
                })
                .collect(),
        ),
        active_parameter: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::lsp::tests::test_utils::{analysis_with, offset_of};
    use lg_core::functions::BuiltinFunctions;

    fn help(text: &str, marker: &str) -> Option<SignatureHelp> {
        let analysis = analysis_with(&[("main.lg", text)]);
        let offset = offset_of(analysis.text(), marker);
        signature_at(&analysis, offset, &BuiltinFunctions)
    }

    #[test]
    fn test_template_signature_with_active_parameter() {
        let text = "# Greet(first, last)\n- hi\n# Main\n- ${Greet('a', 'b')}";
        let help = help(text, "${Greet('a', ").unwrap();
        assert_eq!(help.signatures[0].label, "Greet(first, last)");
        assert_eq!(help.active_parameter, Some(1));
        assert_eq!(help.signatures[0].parameters.as_ref().unwrap().len(), 2);
    }

    #[test]
    fn test_function_signature() {
        let help = help("# Main(items)\n- ${join(items, ', ')}", "${join(").unwrap();
        assert_eq!(help.signatures[0].label, "join(list, separator, lastSeparator)");
        assert_eq!(help.active_parameter, Some(0));
    }

    #[test]
    fn test_nested_call_uses_innermost() {
        let help = help("# Main(a)\n- ${join(split(a, ','), ' ')}", "${join(split(a, ").unwrap();
        assert_eq!(help.signatures[0].label, "split(text, separator)");
        assert_eq!(help.active_parameter, Some(1));
    }

    #[test]
    fn test_outside_a_call_is_empty() {
        assert!(help("# Main(a)\n- ${a}", "${a").is_none());
        assert!(help("# Main\n- plain (text, here", "(text,").is_none());
    }
}
