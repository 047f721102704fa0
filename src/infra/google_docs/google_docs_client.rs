// =============================================================================
// GOOGLE DOCS CLIENT
// =============================================================================
//
// Thin reqwest wrapper over the two Docs v1 endpoints the converter needs:
//
// - `POST /v1/documents` creates an empty document and returns its id
// - `POST /v1/documents/{id}:batchUpdate` applies an ordered request list
//
// Every call fetches a bearer token from the configured
// `AccessTokenProvider`; providers cache tokens themselves.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::core::conversion::{DocsApiError, DocumentHandle, DocumentsApi};
use crate::core::requests::Request;
use crate::infra::google_auth::AccessTokenProvider;

pub const DOCS_API_BASE_URL: &str = "https://docs.googleapis.com/v1";

#[derive(Debug, Serialize)]
struct CreateDocumentBody<'a> {
    title: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedDocument {
    document_id: String,
    #[serde(default)]
    title: String,
}

#[derive(Debug, Serialize)]
struct BatchUpdateBody<'a> {
    requests: &'a [Request],
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<serde_json::Value>,
}

pub struct GoogleDocsClient {
    client: Client,
    base_url: String,
    auth: Box<dyn AccessTokenProvider>,
}

impl GoogleDocsClient {
    pub fn new(auth: Box<dyn AccessTokenProvider>) -> Self {
        Self::with_http_client(Client::new(), auth)
    }

    pub fn with_http_client(client: Client, auth: Box<dyn AccessTokenProvider>) -> Self {
        Self {
            client,
            base_url: DOCS_API_BASE_URL.to_string(),
            auth,
        }
    }

    /// Points the client at another API root (trailing slash optional).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn bearer(&self) -> Result<String, DocsApiError> {
        let token = self
            .auth
            .access_token()
            .await
            .map_err(|e| DocsApiError::Auth(e.to_string()))?;
        Ok(format!("Bearer {}", token))
    }

    async fn ensure_success(response: Response) -> Result<Response, DocsApiError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        Err(DocsApiError::Status { status, body })
    }
}

fn http_error(e: reqwest::Error) -> DocsApiError {
    DocsApiError::Http(e.to_string())
}

#[async_trait]
impl DocumentsApi for GoogleDocsClient {
    async fn create_document(&self, title: &str) -> Result<DocumentHandle, DocsApiError> {
        let url = format!("{}/documents", self.base_url);
        tracing::debug!("Creating Google Doc '{}'", title);

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&CreateDocumentBody { title })
            .send()
            .await
            .map_err(http_error)?;

        let created: CreatedDocument = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| DocsApiError::InvalidResponse(e.to_string()))?;

        Ok(DocumentHandle {
            title: if created.title.is_empty() {
                title.to_string()
            } else {
                created.title
            },
            document_id: created.document_id,
        })
    }

    async fn batch_update(
        &self,
        document_id: &str,
        requests: &[Request],
    ) -> Result<(), DocsApiError> {
        let url = format!("{}/documents/{}:batchUpdate", self.base_url, document_id);
        tracing::debug!(
            document_id,
            requests = requests.len(),
            "Sending batchUpdate"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.bearer().await?)
            .json(&BatchUpdateBody { requests })
            .send()
            .await
            .map_err(http_error)?;

        let reply: BatchUpdateResponse = Self::ensure_success(response)
            .await?
            .json()
            .await
            .map_err(|e| DocsApiError::InvalidResponse(e.to_string()))?;

        tracing::debug!(replies = reply.replies.len(), "batchUpdate accepted");
        Ok(())
    }
}
