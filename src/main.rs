// This is the entry point of the notes converter.
//
// **Architecture Overview:**
// - `core/` = Conversion logic (markdown classification, request building)
// - `infra/` = Implementations of core traits (Google auth, Docs API)
// - `cli/` = Command-line arguments and input
//
// This file's job is to:
// 1. Load configuration
// 2. Pick an auth flow and build the Docs client (dependency injection)
// 3. Run a single conversion and report the result

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with several mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{read_notes, AuthConfig, Cli};
use crate::core::conversion::ConversionService;
use crate::core::requests::InsertionStrategy;
use crate::infra::google_auth::{
    AccessTokenProvider, ApplicationDefaultCredentials, InstalledAppFlow, ServiceAccountAuth,
    StaticTokenProvider,
};
use crate::infra::google_docs::{GoogleDocsClient, RecordingDocumentsApi};

async fn build_token_provider(config: AuthConfig) -> anyhow::Result<Box<dyn AccessTokenProvider>> {
    let provider: Box<dyn AccessTokenProvider> = match config {
        AuthConfig::Installed {
            client_secrets,
            open_browser,
        } => Box::new(
            InstalledAppFlow::from_client_secrets_file(&client_secrets)
                .await
                .with_context(|| {
                    format!("Failed to load client secrets from {}", client_secrets.display())
                })?
                .with_browser(open_browser),
        ),
        AuthConfig::ServiceAccount { key_path } => {
            let auth = match key_path {
                Some(path) => ServiceAccountAuth::from_file(&path)
                    .await
                    .with_context(|| format!("Failed to load service account key {}", path.display()))?,
                None => ServiceAccountAuth::from_env()
                    .await
                    .context("Failed to load service account credentials")?,
            };
            tracing::info!("Authenticating as service account {}", auth.client_email());
            Box::new(auth)
        }
        AuthConfig::ApplicationDefault => {
            let credentials = ApplicationDefaultCredentials::discover()
                .await
                .context("Failed to resolve application default credentials")?;
            tracing::info!("Using application default credentials ({})", credentials.kind());
            Box::new(credentials)
        }
        AuthConfig::AccessToken(token) => Box::new(StaticTokenProvider::new(token)),
    };
    Ok(provider)
}

/// Builds the batch without touching the network and prints it as the
/// JSON body `batchUpdate` would receive.
async fn dry_run(markdown: &str, title: &str, strategy: InsertionStrategy) -> anyhow::Result<()> {
    let service = ConversionService::new(RecordingDocumentsApi::new(), strategy);
    let doc = service.convert(markdown, title).await?;

    let batches = service.api().batches().await;
    match batches.first() {
        Some(batch) => {
            tracing::debug!(document_id = %batch.document_id, "Recorded batch");
            println!("{}", serde_json::to_string_pretty(batch)?)
        }
        None => println!("{}", serde_json::json!({ "requests": [] })),
    }

    tracing::info!(
        requests = doc.request_count,
        "Dry run for '{}' complete; nothing was sent",
        doc.title
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if it exists) before clap
    // reads its env fallbacks.
    dotenv::dotenv().ok();

    // Logs go to stderr so stdout stays clean for --dry-run output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let markdown = read_notes(&cli.input)
        .await
        .with_context(|| format!("Failed to read notes from {}", cli.input.display()))?;
    let strategy = InsertionStrategy::from(cli.strategy);

    if cli.dry_run {
        return dry_run(&markdown, &cli.title, strategy).await;
    }

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    let auth = build_token_provider(cli.auth_config()?).await?;
    let client = GoogleDocsClient::new(auth).with_base_url(cli.api_url.as_str());
    let service = ConversionService::new(client, strategy);

    let doc = service
        .convert(&markdown, &cli.title)
        .await
        .context("Failed to convert document")?;

    println!("Created document: {}", doc.title);
    println!("Document ID: {}", doc.document_id);
    println!("URL: {}", doc.url);
    Ok(())
}
