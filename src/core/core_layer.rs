// The core module contains all conversion logic.
// Nothing in here performs I/O; the remote service is reached through the
// `DocumentsApi` trait that the infra layer implements.

#[path = "notes/mod.rs"]
pub mod notes;

#[path = "requests/mod.rs"]
pub mod requests;

#[path = "conversion/mod.rs"]
pub mod conversion;
