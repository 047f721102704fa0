// =============================================================================
// SERVICE ACCOUNT AUTHENTICATION
// =============================================================================
//
// Signs a JWT with the service account's private key and trades it for an
// access token (the OAuth2 JWT-bearer grant). Documents created this way are
// owned by the service account, so share the target folder with its email.
//
// **Environment Variables:**
// - `GOOGLE_SERVICE_ACCOUNT_KEY` - Path to the JSON key file
// - `GOOGLE_SERVICE_ACCOUNT_JSON` - The JSON content directly (for deployment)

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::access_token::{exchange_token, AccessTokenProvider, AuthError, TokenCache, TokenResponse};
use super::{DEFAULT_TOKEN_URI, DOCUMENTS_SCOPE};

/// JWTs may be valid for at most one hour.
const JWT_LIFETIME_SECS: i64 = 3600;

/// Service account credentials from the JSON key file.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountCredentials {
    /// The service account email (used as issuer in JWT).
    pub client_email: String,

    /// The private key in PEM format.
    pub private_key: String,

    /// Where to exchange the JWT for an access token.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// JWT claims for Google OAuth2.
#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

pub struct ServiceAccountAuth {
    credentials: ServiceAccountCredentials,
    client: Client,
    cache: TokenCache,
}

impl ServiceAccountAuth {
    pub fn new(credentials: ServiceAccountCredentials) -> Self {
        Self {
            credentials,
            client: Client::new(),
            cache: TokenCache::new(),
        }
    }

    /// Creates a new authenticator from a JSON key file path.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_json(&content)
    }

    /// Creates a new authenticator from JSON content.
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let credentials: ServiceAccountCredentials = serde_json::from_str(json)?;
        Ok(Self::new(credentials))
    }

    /// Creates from environment variables.
    pub async fn from_env() -> Result<Self, AuthError> {
        if let Ok(path) = std::env::var("GOOGLE_SERVICE_ACCOUNT_KEY") {
            return Self::from_file(&path).await;
        }

        if let Ok(json) = std::env::var("GOOGLE_SERVICE_ACCOUNT_JSON") {
            return Self::from_json(&json);
        }

        Err(AuthError::InvalidCredentials(
            "Neither GOOGLE_SERVICE_ACCOUNT_KEY nor GOOGLE_SERVICE_ACCOUNT_JSON is set".to_string(),
        ))
    }

    pub fn client_email(&self) -> &str {
        &self.credentials.client_email
    }

    fn signed_assertion(&self, now: i64) -> Result<String, AuthError> {
        let claims = JwtClaims {
            iss: self.credentials.client_email.clone(),
            scope: DOCUMENTS_SCOPE.to_string(),
            aud: self.credentials.token_uri.clone(),
            iat: now,
            exp: now + JWT_LIFETIME_SECS,
        };

        let header = Header::new(Algorithm::RS256);
        let key = EncodingKey::from_rsa_pem(self.credentials.private_key.as_bytes())?;
        Ok(encode(&header, &claims, &key)?)
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, AuthError> {
        let jwt = self.signed_assertion(Utc::now().timestamp())?;
        tracing::debug!("Exchanging JWT for {}", self.credentials.client_email);

        exchange_token(
            &self.client,
            &self.credentials.token_uri,
            &[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", jwt.as_str()),
            ],
        )
        .await
    }
}

#[async_trait]
impl AccessTokenProvider for ServiceAccountAuth {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.cache.get_or_fetch(|| self.fetch_new_token()).await
    }
}
