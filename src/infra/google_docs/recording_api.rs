use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::RwLock;

use crate::core::conversion::{DocsApiError, DocumentHandle, DocumentsApi};
use crate::core::requests::Request;

/// Document id handed out by the recorder.
pub const DRY_RUN_DOCUMENT_ID: &str = "dry-run";

/// One `batchUpdate` call as it would have been sent.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedBatch {
    #[serde(skip)]
    pub document_id: String,
    pub requests: Vec<Request>,
}

/// In-memory `DocumentsApi` that records calls instead of making them.
/// Backs `--dry-run`.
#[derive(Default)]
pub struct RecordingDocumentsApi {
    created: RwLock<Vec<String>>,
    batches: RwLock<Vec<RecordedBatch>>,
}

impl RecordingDocumentsApi {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub async fn created_titles(&self) -> Vec<String> {
        self.created.read().await.clone()
    }

    pub async fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.read().await.clone()
    }
}

#[async_trait]
impl DocumentsApi for RecordingDocumentsApi {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle, DocsApiError> {
        self.created.write().await.push(title.to_string());
        Ok(DocumentHandle {
            document_id: DRY_RUN_DOCUMENT_ID.to_string(),
            title: title.to_string(),
        })
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> Result<(), DocsApiError> {
        self.batches.write().await.push(RecordedBatch {
            document_id: document_id.to_string(),
            requests: requests.to_vec(),
        });
        Ok(())
    }

    fn document_url(&self, document_id: &str) -> String {
        format!("(dry run) {}", document_id)
    }
}
