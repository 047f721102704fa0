use serde::Serialize;

/// Title used when the caller does not supply one.
pub const DEFAULT_TITLE: &str = "Converted Meeting Notes";

/// What the remote service hands back after creating a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentHandle {
    pub document_id: String,
    pub title: String,
}

/// Result of a finished conversion, ready to print.
#[derive(Debug, Clone, Serialize)]
pub struct ConvertedDocument {
    pub document_id: String,
    pub title: String,
    pub url: String,
    /// Number of requests sent in the batch update.
    pub request_count: usize,
}
