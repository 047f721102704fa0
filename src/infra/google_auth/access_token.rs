// Shared pieces for every auth flow: the provider trait, the error type, the
// token endpoint response, and the expiry-aware cache.

use std::future::Future;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::RwLock;

/// Tokens are refreshed this long before Google says they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Lifetime assumed when a token response has no `expires_in`.
const DEFAULT_LIFETIME_SECS: i64 = 55 * 60;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid credentials JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Failed to sign JWT: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token exchange failed ({status}): {body}")]
    TokenExchange { status: u16, body: String },
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Authorization was not completed: {0}")]
    Authorization(String),
}

/// Anything that can hand out a bearer token for the Docs API.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

#[async_trait]
impl AccessTokenProvider for Box<dyn AccessTokenProvider> {
    async fn access_token(&self) -> Result<String, AuthError> {
        (**self).access_token().await
    }
}

/// A token obtained out of band. Never refreshed.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}

/// Response from Google's token endpoint (and the metadata server).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    pub fn expires_at(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::seconds(self.expires_in.unwrap_or(DEFAULT_LIFETIME_SECS))
    }
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + Duration::seconds(EXPIRY_MARGIN_SECS)
    }
}

/// Holds the last token and only calls `fetch` when it is about to expire.
#[derive(Default)]
pub struct TokenCache {
    cached: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_fetch<F, Fut>(&self, fetch: F) -> Result<String, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<TokenResponse, AuthError>>,
    {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if token.is_fresh(Utc::now()) {
                    return Ok(token.token.clone());
                }
            }
        }

        let response = fetch().await?;
        let token = response.access_token.clone();

        let mut cached = self.cached.write().await;
        *cached = Some(CachedToken {
            token: token.clone(),
            expires_at: response.expires_at(Utc::now()),
        });

        Ok(token)
    }
}

/// POSTs a form to a token endpoint and decodes the response.
pub async fn exchange_token(
    client: &Client,
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, AuthError> {
    let response = client.post(token_uri).form(form).send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await?;
        return Err(AuthError::TokenExchange { status, body });
    }

    Ok(response.json().await?)
}
