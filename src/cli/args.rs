use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, ValueEnum};

use crate::core::conversion::DEFAULT_TITLE;
use crate::core::requests::InsertionStrategy;
use crate::infra::google_docs::google_docs_client::DOCS_API_BASE_URL;

#[derive(Debug, Parser)]
#[command(name = "notes2docs")]
#[command(version)]
#[command(about = "Convert markdown meeting notes into a formatted Google Doc", long_about = None)]
pub struct Cli {
    /// Markdown notes file, or `-` to read stdin
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Title of the new document
    #[arg(short, long, default_value = DEFAULT_TITLE)]
    pub title: String,

    /// How to obtain a Google access token
    #[arg(long, value_enum, env = "NOTES2DOCS_AUTH", default_value_t = AuthMethod::Installed)]
    pub auth: AuthMethod,

    /// OAuth client secrets JSON (for `--auth installed`)
    #[arg(long, env = "GOOGLE_CLIENT_SECRETS", value_name = "PATH")]
    pub client_secrets: Option<PathBuf>,

    /// Only print the consent URL; do not launch a browser
    #[arg(long, env = "NOTES2DOCS_NO_BROWSER")]
    pub no_browser: bool,

    /// Service account key JSON (for `--auth service-account`)
    #[arg(long, env = "GOOGLE_SERVICE_ACCOUNT_KEY", value_name = "PATH")]
    pub service_account_key: Option<PathBuf>,

    /// Pre-minted access token (for `--auth access-token`)
    #[arg(long, env = "GOOGLE_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// How text insertion is laid out in the batch update
    #[arg(long, value_enum, env = "NOTES2DOCS_STRATEGY", default_value_t = Strategy::Bulk)]
    pub strategy: Strategy,

    /// Print the batchUpdate body instead of calling the API
    #[arg(long)]
    pub dry_run: bool,

    /// Docs API root URL
    #[arg(long, env = "GOOGLE_DOCS_API_URL", default_value = DOCS_API_BASE_URL, hide = true)]
    pub api_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum AuthMethod {
    /// Browser consent with a local redirect listener
    Installed,
    /// Service account JWT
    ServiceAccount,
    /// gcloud / GOOGLE_APPLICATION_CREDENTIALS / metadata server
    ApplicationDefault,
    /// Token passed in directly
    AccessToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One insertion for the whole body, then styling
    Bulk,
    /// One insertion per line at a running index
    PerLine,
}

impl From<Strategy> for InsertionStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Bulk => InsertionStrategy::Bulk,
            Strategy::PerLine => InsertionStrategy::PerLine,
        }
    }
}

/// Validated authentication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthConfig {
    Installed {
        client_secrets: PathBuf,
        open_browser: bool,
    },
    /// `None` falls back to `GOOGLE_SERVICE_ACCOUNT_JSON`.
    ServiceAccount { key_path: Option<PathBuf> },
    ApplicationDefault,
    AccessToken(String),
}

impl Cli {
    pub fn auth_config(&self) -> anyhow::Result<AuthConfig> {
        Ok(match self.auth {
            AuthMethod::Installed => match &self.client_secrets {
                Some(path) => AuthConfig::Installed {
                    client_secrets: path.clone(),
                    open_browser: !self.no_browser,
                },
                None => bail!(
                    "--auth installed needs --client-secrets (or GOOGLE_CLIENT_SECRETS) \
                     pointing at an OAuth client secrets JSON"
                ),
            },
            AuthMethod::ServiceAccount => AuthConfig::ServiceAccount {
                key_path: self.service_account_key.clone(),
            },
            AuthMethod::ApplicationDefault => AuthConfig::ApplicationDefault,
            AuthMethod::AccessToken => match &self.access_token {
                Some(token) if !token.trim().is_empty() => {
                    AuthConfig::AccessToken(token.trim().to_string())
                }
                _ => bail!("--auth access-token needs --access-token (or GOOGLE_ACCESS_TOKEN)"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("notes2docs").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["notes.md", "--auth", "installed", "--strategy", "bulk"]);
        assert_eq!(cli.input, PathBuf::from("notes.md"));
        assert_eq!(cli.title, "Converted Meeting Notes");
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_strategy_maps_to_core() {
        let cli = parse(&["notes.md", "--strategy", "per-line"]);
        assert_eq!(InsertionStrategy::from(cli.strategy), InsertionStrategy::PerLine);
    }

    #[test]
    fn test_installed_requires_client_secrets() {
        let mut cli = parse(&["notes.md", "--auth", "installed"]);
        cli.client_secrets = None;
        assert!(cli.auth_config().is_err());

        cli.client_secrets = Some(PathBuf::from("secrets.json"));
        assert_eq!(
            cli.auth_config().unwrap(),
            AuthConfig::Installed {
                client_secrets: PathBuf::from("secrets.json"),
                open_browser: true,
            }
        );
    }

    #[test]
    fn test_no_browser_flag() {
        let cli = parse(&[
            "notes.md",
            "--auth",
            "installed",
            "--client-secrets",
            "secrets.json",
            "--no-browser",
        ]);
        assert_eq!(
            cli.auth_config().unwrap(),
            AuthConfig::Installed {
                client_secrets: PathBuf::from("secrets.json"),
                open_browser: false,
            }
        );
    }

    #[test]
    fn test_access_token_must_be_present() {
        let mut cli = parse(&["notes.md", "--auth", "access-token"]);
        cli.access_token = Some("  ".to_string());
        assert!(cli.auth_config().is_err());

        cli.access_token = Some(" ya29.token ".to_string());
        assert_eq!(
            cli.auth_config().unwrap(),
            AuthConfig::AccessToken("ya29.token".to_string())
        );
    }

    #[test]
    fn test_service_account_key_is_optional() {
        let mut cli = parse(&["notes.md", "--auth", "service-account"]);
        cli.service_account_key = None;
        assert_eq!(
            cli.auth_config().unwrap(),
            AuthConfig::ServiceAccount { key_path: None }
        );
    }

    #[test]
    fn test_title_and_dry_run_flags() {
        let cli = parse(&["-", "--title", "Q3 Planning", "--dry-run"]);
        assert_eq!(cli.input, PathBuf::from("-"));
        assert_eq!(cli.title, "Q3 Planning");
        assert!(cli.dry_run);
    }

    #[test]
    fn test_unknown_auth_method_is_rejected() {
        let result = Cli::try_parse_from(["notes2docs", "notes.md", "--auth", "magic"]);
        assert!(result.is_err());
    }
}
