// =============================================================================
// APPLICATION DEFAULT CREDENTIALS
// =============================================================================
//
// Uses whatever identity the host already has, the same way Google's client
// libraries resolve `default()` credentials:
//
// 1. `GOOGLE_APPLICATION_CREDENTIALS` pointing at a credentials file
// 2. gcloud's well-known file (`gcloud auth application-default login`)
// 3. The metadata server (GCE, Cloud Run, hosted notebooks)
//
// A credentials file is either a `service_account` key or an `authorized_user`
// refresh token; the `type` field decides which.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::access_token::{exchange_token, AccessTokenProvider, AuthError, TokenCache, TokenResponse};
use super::service_account::{ServiceAccountAuth, ServiceAccountCredentials};
use super::{DEFAULT_TOKEN_URI, DOCUMENTS_SCOPE};

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum CredentialsFile {
    ServiceAccount(ServiceAccountCredentials),
    AuthorizedUser(AuthorizedUserCredentials),
}

/// Refresh-token credentials written by `gcloud auth application-default login`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthorizedUserCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

pub struct AuthorizedUserAuth {
    credentials: AuthorizedUserCredentials,
    client: Client,
    cache: TokenCache,
}

impl AuthorizedUserAuth {
    pub fn new(credentials: AuthorizedUserCredentials) -> Self {
        Self {
            credentials,
            client: Client::new(),
            cache: TokenCache::new(),
        }
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, AuthError> {
        exchange_token(
            &self.client,
            &self.credentials.token_uri,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.credentials.refresh_token.as_str()),
                ("client_id", self.credentials.client_id.as_str()),
                ("client_secret", self.credentials.client_secret.as_str()),
            ],
        )
        .await
    }
}

#[async_trait]
impl AccessTokenProvider for AuthorizedUserAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.cache.get_or_fetch(|| self.fetch_new_token()).await
    }
}

/// Token source for code running on Google-hosted infrastructure.
pub struct MetadataServerAuth {
    client: Client,
    token_url: String,
    cache: TokenCache,
}

impl MetadataServerAuth {
    pub fn new() -> Self {
        Self::with_token_url(METADATA_TOKEN_URL)
    }

    pub fn with_token_url(token_url: impl Into<String>) -> Self {
        // The metadata server is link-local and must never be proxied.
        let client = Client::builder()
            .no_proxy()
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            token_url: token_url.into(),
            cache: TokenCache::new(),
        }
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .get(&self.token_url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", DOCUMENTS_SCOPE)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await?;
            return Err(AuthError::TokenExchange { status, body });
        }

        Ok(response.json().await?)
    }
}

impl Default for MetadataServerAuth {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccessTokenProvider for MetadataServerAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.cache.get_or_fetch(|| self.fetch_new_token()).await
    }
}

pub enum ApplicationDefaultCredentials {
    ServiceAccount(ServiceAccountAuth),
    AuthorizedUser(AuthorizedUserAuth),
    Metadata(MetadataServerAuth),
}

impl ApplicationDefaultCredentials {
    /// Resolves credentials in the standard lookup order.
    pub async fn discover() -> Result<Self, AuthError> {
        if let Ok(path) = std::env::var("GOOGLE_APPLICATION_CREDENTIALS") {
            tracing::info!("Using credentials from GOOGLE_APPLICATION_CREDENTIALS");
            return Self::from_file(path).await;
        }

        if let Some(path) = well_known_file().filter(|p| p.exists()) {
            tracing::info!("Using gcloud application default credentials at {}", path.display());
            return Self::from_file(path).await;
        }

        tracing::info!("No credentials file found; using the metadata server");
        Ok(Self::Metadata(MetadataServerAuth::new()))
    }

    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: CredentialsFile = serde_json::from_str(json)?;
        Ok(match file {
            CredentialsFile::ServiceAccount(credentials) => {
                Self::ServiceAccount(ServiceAccountAuth::new(credentials))
            }
            CredentialsFile::AuthorizedUser(credentials) => {
                Self::AuthorizedUser(AuthorizedUserAuth::new(credentials))
            }
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServiceAccount(_) => "service_account",
            Self::AuthorizedUser(_) => "authorized_user",
            Self::Metadata(_) => "metadata_server",
        }
    }
}

#[async_trait]
impl AccessTokenProvider for ApplicationDefaultCredentials {
    async fn access_token(&self) -> Result<String, AuthError> {
        match self {
            Self::ServiceAccount(auth) => auth.access_token().await,
            Self::AuthorizedUser(auth) => auth.access_token().await,
            Self::Metadata(auth) => auth.access_token().await,
        }
    }
}

/// Where `gcloud` keeps application default credentials.
fn well_known_file() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(dir).join(WELL_KNOWN_FILE));
    }

    // gcloud uses ~/.config on every Unix, not the platform config dir.
    let base = if cfg!(windows) {
        dirs::config_dir()?
    } else {
        dirs::home_dir()?.join(".config")
    };
    Some(base.join("gcloud").join(WELL_KNOWN_FILE))
}
