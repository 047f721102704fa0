// The conversion workflow: create a document, translate the notes, send one
// batch. Three sequential steps with no retry; any failure is surfaced as-is.
//
// The remote service is hidden behind `DocumentsApi` so this module never
// touches HTTP. The infra layer supplies the real client (and a recording
// one for dry runs).

use async_trait::async_trait;
use thiserror::Error;

use super::conversion_models::{ConvertedDocument, DocumentHandle};
use crate::core::notes::classify_document;
use crate::core::requests::{InsertionStrategy, Request, RequestBuilder};

/// Errors raised by a `DocumentsApi` implementation.
#[derive(Debug, Error)]
pub enum DocsApiError {
    #[error("Authentication failed: {0}")]
    Auth(String),
    #[error("HTTP request failed: {0}")]
    Http(String),
    #[error("Docs API returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Unexpected Docs API response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Failed to create document: {0}")]
    CreateDocument(#[source] DocsApiError),
    #[error("Failed to apply formatting to document {document_id}: {source}")]
    ApplyFormatting {
        document_id: String,
        #[source]
        source: DocsApiError,
    },
}

/// The two remote operations the converter needs.
#[async_trait]
pub trait DocumentsApi: Send + Sync {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle, DocsApiError>;

    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> Result<(), DocsApiError>;

    /// Browser URL for a document.
    fn document_url(&self, document_id: &str) -> String {
        format!("https://docs.google.com/document/d/{}/edit", document_id)
    }
}

#[async_trait]
impl DocumentsApi for Box<dyn DocumentsApi> {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle, DocsApiError> {
        (**self).create_document(title).await
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> Result<(), DocsApiError> {
        (**self).batch_update(document_id, requests).await
    }

    fn document_url(&self, document_id: &str) -> String {
        (**self).document_url(document_id)
    }
}

pub struct ConversionService<A: DocumentsApi> {
    api: A,
    builder: RequestBuilder,
}

impl<A: DocumentsApi> ConversionService<A> {
    pub fn new(api: A, strategy: InsertionStrategy) -> Self {
        Self {
            api,
            builder: RequestBuilder::new(strategy),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Translates markdown into the batch that `convert` would send.
    pub fn parse_markdown(&self, markdown: &str) -> Vec<Request> {
        let lines = classify_document(markdown);
        tracing::debug!(
            lines = lines.len(),
            strategy = ?self.builder.strategy(),
            "Classified markdown"
        );
        let requests = self.builder.build(&lines);
        tracing::debug!(
            total = requests.len(),
            styled = requests.iter().filter(|r| r.range().is_some()).count(),
            "Built requests"
        );
        requests
    }

    /// Creates a new document titled `title` and fills it with the notes.
    pub async fn convert(
        &self,
        markdown: &str,
        title: &str,
    ) -> Result<ConvertedDocument, ConversionError> {
        let handle = self
            .api
            .create_document(title)
            .await
            .map_err(ConversionError::CreateDocument)?;
        tracing::info!(document_id = %handle.document_id, "Created document '{}'", handle.title);

        let requests = self.parse_markdown(markdown);

        // batchUpdate rejects an empty request list.
        if requests.is_empty() {
            tracing::warn!("No content to write; leaving document empty");
        } else {
            self.api
                .batch_update(&handle.document_id, &requests)
                .await
                .map_err(|source| ConversionError::ApplyFormatting {
                    document_id: handle.document_id.clone(),
                    source,
                })?;
            tracing::info!(
                document_id = %handle.document_id,
                requests = requests.len(),
                "Applied formatting"
            );
        }

        Ok(ConvertedDocument {
            url: self.api.document_url(&handle.document_id),
            document_id: handle.document_id,
            title: handle.title,
            request_count: requests.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeApi {
        fail_create: bool,
        fail_update: bool,
        batches: Mutex<Vec<(String, usize)>>,
    }

    #[async_trait]
    impl DocumentsApi for FakeApi {
        async fn create_document(&self, title: &str) -> Result<DocumentHandle, DocsApiError> {
            if self.fail_create {
                return Err(DocsApiError::Status {
                    status: 403,
                    body: "forbidden".to_string(),
                });
            }
            Ok(DocumentHandle {
                document_id: "doc-1".to_string(),
                title: title.to_string(),
            })
        }

        async fn batch_update(
            &self,
            document_id: &str,
            requests: &[Request],
        ) -> Result<(), DocsApiError> {
            if self.fail_update {
                return Err(DocsApiError::Http("connection reset".to_string()));
            }
            self.batches
                .lock()
                .unwrap()
                .push((document_id.to_string(), requests.len()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_convert_creates_then_updates() {
        let service = ConversionService::new(FakeApi::default(), InsertionStrategy::Bulk);
        let doc = service
            .convert("# Sync\n- item @alice", "Team Sync")
            .await
            .unwrap();

        assert_eq!(doc.document_id, "doc-1");
        assert_eq!(doc.title, "Team Sync");
        assert_eq!(doc.url, "https://docs.google.com/document/d/doc-1/edit");
        // insert + heading + bullet + mention
        assert_eq!(doc.request_count, 4);

        let batches = service.api().batches.lock().unwrap();
        assert_eq!(batches.as_slice(), &[("doc-1".to_string(), 4)]);
    }

    #[tokio::test]
    async fn test_empty_notes_skip_batch_update() {
        let service = ConversionService::new(FakeApi::default(), InsertionStrategy::PerLine);
        let doc = service.convert("", "Empty").await.unwrap();

        assert_eq!(doc.request_count, 0);
        assert!(service.api().batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_failure_is_surfaced() {
        let api = FakeApi {
            fail_create: true,
            ..FakeApi::default()
        };
        let service = ConversionService::new(api, InsertionStrategy::Bulk);
        let err = service.convert("text", "T").await.unwrap_err();

        assert!(matches!(err, ConversionError::CreateDocument(_)));
        assert!(err.to_string().contains("Failed to create document"));
    }

    #[tokio::test]
    async fn test_update_failure_names_the_document() {
        let api = FakeApi {
            fail_update: true,
            ..FakeApi::default()
        };
        let service = ConversionService::new(api, InsertionStrategy::Bulk);
        let err = service.convert("text", "T").await.unwrap_err();

        assert!(matches!(err, ConversionError::ApplyFormatting { .. }));
        assert!(err.to_string().contains("doc-1"));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_parse_markdown_matches_builder() {
        let service = ConversionService::new(FakeApi::default(), InsertionStrategy::Bulk);
        let requests = service.parse_markdown("## Agenda");
        assert_eq!(requests.len(), 2);
    }
}
