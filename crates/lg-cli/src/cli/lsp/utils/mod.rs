//! LSP utility functions

use lg_core::types::{LineCol, LineIndex, Span};
use lsp_server::{ErrorCode, RequestId, Response};
use lsp_types::{Position, Range};
use serde::de::DeserializeOwned;

/// Cast an LSP request to a specific type
pub fn cast_request<R>(
    req: lsp_server::Request,
) -> Result<(RequestId, R::Params), (RequestId, serde_json::Error)>
where
    R: lsp_types::request::Request,
    R::Params: DeserializeOwned,
{
    match serde_json::from_value::<R::Params>(req.params) {
        Ok(params) => Ok((req.id, params)),
        Err(e) => Err((req.id, e)),
    }
}

/// Cast an LSP notification to a specific type
pub fn cast_notification<N>(not: lsp_server::Notification) -> Result<N::Params, serde_json::Error>
where
    N: lsp_types::notification::Notification,
    N::Params: DeserializeOwned,
{
    serde_json::from_value::<N::Params>(not.params)
}

pub fn error_response(id: RequestId, code: ErrorCode, message: impl Into<String>) -> Response {
    Response::new_err(id, code as i32, message.into())
}

/// Byte offset of an editor position, `None` past the end of the document.
pub fn position_to_offset(index: &LineIndex, position: Position) -> Option<usize> {
    index.offset(LineCol::new(position.line, position.character))
}

pub fn offset_to_position(index: &LineIndex, offset: usize) -> Position {
    let position = index.position(offset);
    Position::new(position.line, position.character)
}

pub fn span_to_range(index: &LineIndex, span: Span) -> Range {
    Range::new(offset_to_position(index, span.start), offset_to_position(index, span.end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lsp_types::request::HoverRequest;

    #[test]
    fn test_span_to_range_counts_utf16() {
        let index = LineIndex::new("# A\n- é ${x}");
        let start = "# A\n- é ".len();
        let range = span_to_range(&index, Span::new(start, start + 4));
        assert_eq!(range, Range::new(Position::new(1, 4), Position::new(1, 8)));
        assert_eq!(position_to_offset(&index, Position::new(1, 4)), Some(start));
    }

    #[test]
    fn test_cast_request_reports_bad_params() {
        let req = lsp_server::Request::new(
            RequestId::from(7),
            "textDocument/hover".to_string(),
            serde_json::json!({ "nope": true }),
        );
        let (id, _) = cast_request::<HoverRequest>(req).unwrap_err();
        assert_eq!(id, RequestId::from(7));
    }
}
