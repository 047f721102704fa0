// =============================================================================
// GOOGLE DOCS MODULE
// =============================================================================
//
// Implementations of the core `DocumentsApi` trait.
//
// **Architecture:**
// This module lives in the infra layer because it handles external I/O
// (HTTP requests to Google APIs). The core layer only knows it can create a
// document and send it a batch of requests.
//
// - `GoogleDocsClient` talks to docs.googleapis.com
// - `RecordingDocumentsApi` keeps everything in memory for dry runs

pub mod google_docs_client;
pub mod recording_api;

pub use google_docs_client::GoogleDocsClient;
pub use recording_api::RecordingDocumentsApi;
