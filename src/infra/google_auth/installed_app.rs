// =============================================================================
// INSTALLED APP (BROWSER) OAUTH FLOW
// =============================================================================
//
// The desktop flow: the user opens a consent URL, Google redirects the
// browser to a one-shot HTTP listener on 127.0.0.1, and the authorization
// code from that redirect is exchanged for tokens.
//
// **Setup:**
// 1. In Google Cloud Console, enable the Google Docs API.
// 2. Create an OAuth client ID of type "Desktop app".
// 3. Download the client secrets JSON and pass it with `--client-secrets`
//    (or set `GOOGLE_CLIENT_SECRETS`).
//
// The flow uses PKCE (S256) and a random `state` value. The first
// consent also returns a refresh token, kept in memory for later refreshes.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;

use super::access_token::{exchange_token, AccessTokenProvider, AuthError, TokenCache, TokenResponse};
use super::{DEFAULT_TOKEN_URI, DOCUMENTS_SCOPE};

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";

/// Upper bound on the redirect request head we are willing to buffer.
const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// How long a connection may take to send its request line.
const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS_PAGE: &str = "<html><body><h3>Authentication complete.</h3>\
<p>You may close this window and return to the terminal.</p></body></html>";

/// The `installed` (or `web`) section of a client secrets file.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

/// PKCE verifier and its S256 challenge.
#[derive(Debug, Clone)]
struct Pkce {
    verifier: String,
    challenge: String,
}

impl Pkce {
    fn generate() -> Self {
        Self::from_verifier(random_token(64))
    }

    fn from_verifier(verifier: String) -> Self {
        let digest = Sha256::digest(verifier.as_bytes());
        let challenge = URL_SAFE_NO_PAD.encode(digest);
        Self {
            verifier,
            challenge,
        }
    }
}

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Query parameters Google appends to the redirect URI.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RedirectParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

impl RedirectParams {
    /// Parses the request target of `GET /?code=...&state=... HTTP/1.1`.
    pub fn from_request_line(request_line: &str) -> Option<Self> {
        let mut parts = request_line.split_whitespace();
        if parts.next()? != "GET" {
            return None;
        }
        let target = parts.next()?;
        let url = Url::parse(&format!("http://127.0.0.1{}", target)).ok()?;

        let mut params = RedirectParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => params.code = Some(value.into_owned()),
                "state" => params.state = Some(value.into_owned()),
                "error" => params.error = Some(value.into_owned()),
                _ => {}
            }
        }
        Some(params)
    }

    fn is_oauth_redirect(&self) -> bool {
        self.code.is_some() || self.error.is_some()
    }

    /// Returns the authorization code after checking `state` and `error`.
    pub fn into_code(self, expected_state: &str) -> Result<String, AuthError> {
        if let Some(error) = self.error {
            return Err(AuthError::Authorization(error));
        }
        if self.state.as_deref() != Some(expected_state) {
            return Err(AuthError::Authorization(
                "state mismatch in OAuth redirect".to_string(),
            ));
        }
        self.code
            .ok_or_else(|| AuthError::Authorization("redirect carried no code".to_string()))
    }
}

pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    client: Client,
    cache: TokenCache,
    refresh_token: RwLock<Option<String>>,
    open_browser: bool,
}

impl InstalledAppFlow {
    pub fn new(secrets: ClientSecrets) -> Self {
        Self {
            secrets,
            client: Client::new(),
            cache: TokenCache::new(),
            refresh_token: RwLock::new(None),
            open_browser: true,
        }
    }

    /// Whether to launch the system browser on the consent URL. The URL is
    /// printed either way.
    pub fn with_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    pub async fn from_client_secrets_file(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_client_secrets_json(&content)
    }

    pub fn from_client_secrets_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretsFile = serde_json::from_str(json)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            AuthError::InvalidCredentials(
                "client secrets file has neither an 'installed' nor a 'web' section".to_string(),
            )
        })?;
        Ok(Self::new(secrets))
    }

    fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
        code_challenge: &str,
    ) -> Result<Url, AuthError> {
        Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", DOCUMENTS_SCOPE),
                ("state", state),
                ("code_challenge", code_challenge),
                ("code_challenge_method", "S256"),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| AuthError::InvalidCredentials(format!("bad auth_uri: {}", e)))
    }

    /// Runs the full browser consent flow against a loopback listener on a
    /// free port.
    pub async fn run_local_server(&self) -> Result<TokenResponse, AuthError> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{}/", port);

        let pkce = Pkce::generate();
        let state = random_token(32);
        let url = self.authorization_url(&redirect_uri, &state, &pkce.challenge)?;

        println!("Please visit this URL to authorize access to Google Docs:\n\n{}\n", url);
        if self.open_browser && !open_in_browser(url.as_str()) {
            tracing::debug!("Could not launch a browser; open the URL manually");
        }
        tracing::info!(port, "Waiting for OAuth redirect");

        let params = wait_for_redirect(&listener, REQUEST_READ_TIMEOUT).await?;
        let code = params.into_code(&state)?;

        let response = self
            .exchange_code(&code, &redirect_uri, &pkce.verifier)
            .await?;
        tracing::info!("OAuth consent completed");
        Ok(response)
    }

    /// Trades an authorization code for tokens.
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
        code_verifier: &str,
    ) -> Result<TokenResponse, AuthError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("code_verifier", code_verifier),
        ];
        if let Some(secret) = self.secrets.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        exchange_token(&self.client, &self.secrets.token_uri, &form).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.secrets.client_id.as_str()),
        ];
        if let Some(secret) = self.secrets.client_secret.as_deref() {
            form.push(("client_secret", secret));
        }
        exchange_token(&self.client, &self.secrets.token_uri, &form).await
    }

    async fn fetch_new_token(&self) -> Result<TokenResponse, AuthError> {
        let stored = self.refresh_token.read().await.clone();
        let response = match stored {
            Some(refresh_token) => self.refresh(&refresh_token).await?,
            None => self.run_local_server().await?,
        };

        if let Some(refresh_token) = &response.refresh_token {
            *self.refresh_token.write().await = Some(refresh_token.clone());
        }
        Ok(response)
    }
}

#[async_trait]
impl AccessTokenProvider for InstalledAppFlow {
    async fn access_token(&self) -> Result<String, AuthError> {
        self.cache.get_or_fetch(|| self.fetch_new_token()).await
    }
}

/// Accepts connections until one carries the OAuth redirect. Anything else
/// (favicon fetches, preconnects that reset or never speak) is answered with
/// a 404 or dropped, and the loop keeps waiting.
async fn wait_for_redirect(
    listener: &TcpListener,
    read_timeout: Duration,
) -> Result<RedirectParams, AuthError> {
    loop {
        let (mut stream, peer) = listener.accept().await?;

        let request_line =
            match tokio::time::timeout(read_timeout, read_request_line(&mut stream)).await {
                Ok(Ok(line)) => line,
                Ok(Err(e)) => {
                    tracing::debug!(%peer, "Dropping connection: {}", e);
                    continue;
                }
                Err(_) => {
                    tracing::debug!(%peer, "Dropping connection that sent no request");
                    continue;
                }
            };

        match RedirectParams::from_request_line(&request_line) {
            Some(params) if params.is_oauth_redirect() => {
                // A failed reply does not invalidate the code.
                if let Err(e) = write_response(&mut stream, "200 OK", SUCCESS_PAGE).await {
                    tracing::warn!("Could not send the success page: {}", e);
                }
                return Ok(params);
            }
            _ => {
                tracing::debug!("Ignoring non-redirect request: {}", request_line);
                if let Err(e) = write_response(&mut stream, "404 Not Found", "").await {
                    tracing::debug!(%peer, "Dropping connection: {}", e);
                }
            }
        }
    }
}

async fn read_request_line(stream: &mut TcpStream) -> Result<String, AuthError> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];

    while buffer.len() < MAX_REQUEST_BYTES {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        if buffer.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    let head = String::from_utf8_lossy(&buffer);
    Ok(head.lines().next().unwrap_or_default().to_string())
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> Result<(), AuthError> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}

/// Best-effort launch of the system browser. Returns whether a launcher
/// process started.
fn open_in_browser(url: &str) -> bool {
    let mut command = if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        command
    } else if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    };

    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::test_support::{direct_client, form_pairs, serve_once};

    const SECRETS_JSON: &str = r#"{
        "installed": {
            "client_id": "123.apps.googleusercontent.com",
            "client_secret": "shh",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]
        }
    }"#;

    #[test]
    fn test_parses_installed_section() {
        let flow = InstalledAppFlow::from_client_secrets_json(SECRETS_JSON).unwrap();
        assert_eq!(flow.secrets.client_id, "123.apps.googleusercontent.com");
        assert_eq!(flow.secrets.client_secret.as_deref(), Some("shh"));
    }

    #[test]
    fn test_parses_web_section_with_defaults() {
        let flow =
            InstalledAppFlow::from_client_secrets_json(r#"{"web":{"client_id":"abc"}}"#).unwrap();
        assert_eq!(flow.secrets.auth_uri, DEFAULT_AUTH_URI);
        assert_eq!(flow.secrets.token_uri, DEFAULT_TOKEN_URI);
        assert!(flow.secrets.client_secret.is_none());
    }

    #[test]
    fn test_rejects_secrets_without_client_section() {
        let err = InstalledAppFlow::from_client_secrets_json(r#"{"other":{}}"#)
            .err()
            .unwrap();
        assert!(matches!(err, AuthError::InvalidCredentials(_)));
    }

    #[test]
    fn test_pkce_challenge_matches_rfc_7636_example() {
        let pkce = Pkce::from_verifier("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk".to_string());
        assert_eq!(pkce.challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn test_generated_verifier_length() {
        let pkce = Pkce::generate();
        assert_eq!(pkce.verifier.len(), 64);
        assert!(pkce.verifier.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_authorization_url_carries_scope_and_pkce() {
        let flow = InstalledAppFlow::from_client_secrets_json(SECRETS_JSON).unwrap();
        let url = flow
            .authorization_url("http://127.0.0.1:5555/", "xyz", "challenge")
            .unwrap();
        let pairs: std::collections::HashMap<String, String> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert_eq!(pairs["scope"], DOCUMENTS_SCOPE);
        assert_eq!(pairs["redirect_uri"], "http://127.0.0.1:5555/");
        assert_eq!(pairs["state"], "xyz");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["response_type"], "code");
    }

    #[test]
    fn test_redirect_params_from_request_line() {
        let params =
            RedirectParams::from_request_line("GET /?state=s1&code=4%2FabcD&scope=x HTTP/1.1")
                .unwrap();
        assert_eq!(params.code.as_deref(), Some("4/abcD"));
        assert_eq!(params.state.as_deref(), Some("s1"));
        assert_eq!(params.into_code("s1").unwrap(), "4/abcD");
    }

    #[test]
    fn test_redirect_errors() {
        let denied = RedirectParams::from_request_line("GET /?error=access_denied&state=s HTTP/1.1")
            .unwrap();
        assert!(matches!(
            denied.into_code("s"),
            Err(AuthError::Authorization(msg)) if msg == "access_denied"
        ));

        let forged = RedirectParams::from_request_line("GET /?code=c&state=evil HTTP/1.1").unwrap();
        assert!(forged.into_code("s").is_err());

        assert!(RedirectParams::from_request_line("POST / HTTP/1.1").is_none());
    }

    #[tokio::test]
    async fn test_wait_for_redirect_skips_unrelated_requests() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            let mut favicon = TcpStream::connect(addr).await.unwrap();
            favicon
                .write_all(b"GET /favicon.ico HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            favicon.read_to_string(&mut reply).await.unwrap();
            assert!(reply.starts_with("HTTP/1.1 404"));

            let mut redirect = TcpStream::connect(addr).await.unwrap();
            redirect
                .write_all(b"GET /?code=abc&state=st HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            redirect.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let params = wait_for_redirect(&listener, REQUEST_READ_TIMEOUT).await.unwrap();
        assert_eq!(params.into_code("st").unwrap(), "abc");

        let reply = browser.await.unwrap();
        assert!(reply.starts_with("HTTP/1.1 200 OK"));
        assert!(reply.contains("Authentication complete"));
    }

    #[tokio::test]
    async fn test_wait_for_redirect_survives_reset_connection() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            // Connects and aborts with RST before sending anything.
            let aborted = TcpStream::connect(addr).await.unwrap();
            aborted.set_linger(Some(Duration::ZERO)).unwrap();
            drop(aborted);

            let mut redirect = TcpStream::connect(addr).await.unwrap();
            redirect
                .write_all(b"GET /?code=abc&state=st HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            redirect.read_to_string(&mut reply).await.unwrap();
            reply
        });

        let params = wait_for_redirect(&listener, REQUEST_READ_TIMEOUT).await.unwrap();
        assert_eq!(params.into_code("st").unwrap(), "abc");
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    #[tokio::test]
    async fn test_wait_for_redirect_drops_silent_connection() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let browser = tokio::spawn(async move {
            let silent = TcpStream::connect(addr).await.unwrap();

            let mut redirect = TcpStream::connect(addr).await.unwrap();
            redirect
                .write_all(b"GET /?code=xyz&state=st HTTP/1.1\r\nHost: x\r\n\r\n")
                .await
                .unwrap();
            let mut reply = String::new();
            redirect.read_to_string(&mut reply).await.unwrap();
            drop(silent);
            reply
        });

        let params = wait_for_redirect(&listener, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(params.into_code("st").unwrap(), "xyz");
        assert!(browser.await.unwrap().starts_with("HTTP/1.1 200 OK"));
    }

    fn flow_with_token_uri(secrets_json: &str, token_uri: String) -> InstalledAppFlow {
        let mut flow = InstalledAppFlow::from_client_secrets_json(secrets_json).unwrap();
        flow.secrets.token_uri = token_uri;
        flow.client = direct_client();
        flow
    }

    #[tokio::test]
    async fn test_exchange_code_sends_pkce_form() {
        let (base_url, server) = serve_once(
            "200 OK",
            r#"{"access_token":"a1","expires_in":3599,"refresh_token":"1//r"}"#,
        )
        .await;
        let flow = flow_with_token_uri(SECRETS_JSON, format!("{}/token", base_url));

        let response = flow
            .exchange_code("4/code", "http://127.0.0.1:5555/", "verifier123")
            .await
            .unwrap();
        assert_eq!(response.access_token, "a1");
        assert_eq!(response.refresh_token.as_deref(), Some("1//r"));

        let request = server.await.unwrap();
        assert!(request.head.starts_with("POST /token "));
        let form = form_pairs(&request.body);
        assert_eq!(form["grant_type"], "authorization_code");
        assert_eq!(form["code"], "4/code");
        assert_eq!(form["client_id"], "123.apps.googleusercontent.com");
        assert_eq!(form["redirect_uri"], "http://127.0.0.1:5555/");
        assert_eq!(form["code_verifier"], "verifier123");
        assert_eq!(form["client_secret"], "shh");
    }

    #[tokio::test]
    async fn test_exchange_code_without_client_secret() {
        let (base_url, server) = serve_once("200 OK", r#"{"access_token":"a2"}"#).await;
        let flow = flow_with_token_uri(
            r#"{"installed":{"client_id":"public-client"}}"#,
            format!("{}/token", base_url),
        );

        flow.exchange_code("c", "http://127.0.0.1:1/", "v").await.unwrap();

        let form = form_pairs(&server.await.unwrap().body);
        assert_eq!(form["client_id"], "public-client");
        assert!(!form.contains_key("client_secret"));
    }

    #[tokio::test]
    async fn test_stored_refresh_token_is_used_instead_of_browser() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"access_token":"fresh","expires_in":3599}"#).await;
        let flow = flow_with_token_uri(SECRETS_JSON, format!("{}/token", base_url));
        *flow.refresh_token.write().await = Some("1//stored".to_string());

        assert_eq!(flow.access_token().await.unwrap(), "fresh");

        let form = form_pairs(&server.await.unwrap().body);
        assert_eq!(form["grant_type"], "refresh_token");
        assert_eq!(form["refresh_token"], "1//stored");
        assert_eq!(form["client_secret"], "shh");
        // A refresh reply without a new refresh token keeps the old one.
        assert_eq!(
            flow.refresh_token.read().await.as_deref(),
            Some("1//stored")
        );
    }

    #[tokio::test]
    async fn test_rotated_refresh_token_replaces_stored_one() {
        let (base_url, _server) = serve_once(
            "200 OK",
            r#"{"access_token":"fresh","refresh_token":"1//rotated"}"#,
        )
        .await;
        let flow = flow_with_token_uri(SECRETS_JSON, format!("{}/token", base_url));
        *flow.refresh_token.write().await = Some("1//stored".to_string());

        flow.fetch_new_token().await.unwrap();
        assert_eq!(
            flow.refresh_token.read().await.as_deref(),
            Some("1//rotated")
        );
    }

    #[tokio::test]
    async fn test_rejected_refresh_is_surfaced() {
        let (base_url, _server) =
            serve_once("400 Bad Request", r#"{"error":"invalid_grant"}"#).await;
        let flow = flow_with_token_uri(SECRETS_JSON, format!("{}/token", base_url));
        *flow.refresh_token.write().await = Some("1//revoked".to_string());

        let err = flow.access_token().await.unwrap_err();
        assert!(matches!(
            err,
            AuthError::TokenExchange { status: 400, ref body } if body.contains("invalid_grant")
        ));
    }
}
