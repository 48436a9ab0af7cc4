//! LSP integration tests and shared fixtures.

pub mod mock_editor;
pub mod test_utils;

mod analysis_queue_test;
