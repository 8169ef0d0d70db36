mod config;
mod line;
mod prompt_loader;
mod webhook;

use crate::config::Config;
use crate::line::LineClient;
use crate::webhook::AppState;
use anyhow::{Context, Result};
use azure_speech::{AzureBlobStore, AzureSpeechEngine, StorageAccount};
use clap::Parser;
use gemini_oracle::GeminiClient;
use relay_core::{ConversationRouter, SpeechPipeline};
use secrecy::ExposeSecret;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "LINE menu translation relay")]
struct Cli {
    /// Directory of `*.md` files overriding built-in prompts (file stem = prompt key)
    #[arg(long)]
    prompts: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    tracing::info!("Configuration loaded successfully. Starting LINE relay...");

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    // --- 4. Load Prompts ---
    let prompts = prompt_loader::load_prompt_book(args.prompts.as_deref())
        .context("Failed to load prompt overrides")?;

    // --- 5. Initialize API Clients ---
    let oracle = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        &config.gemini_model,
    ));
    tracing::info!("Using Gemini model {}", oracle.model());

    let line = Arc::new(LineClient::new(config.line_channel_access_token.clone()));

    let engine = AzureSpeechEngine::new(
        config.azure_speech_key.clone(),
        &config.azure_region,
        &config.azure_speech_voice,
    );
    let account =
        StorageAccount::from_connection_string(config.storage_connection_string.expose_secret())
            .context("Invalid AZURE_STORAGE_CONNECTION_STRING")?;
    tracing::info!(
        "Publishing speech to container {} of account {}",
        config.blob_container,
        account.account_name
    );
    let store = AzureBlobStore::new(account, &config.blob_container);

    let mut speech = SpeechPipeline::new(engine, store);
    if let Some(dir) = &config.scratch_dir {
        speech = speech.with_scratch_dir(dir);
    }

    let mut router =
        ConversationRouter::new(oracle, Arc::new(speech), line.clone(), Arc::new(prompts))
            .with_session_idle_timeout(config.session_idle_timeout);
    if let Some(dir) = &config.scratch_dir {
        router = router.with_scratch_dir(dir);
    }

    let state = AppState {
        router: Arc::new(router),
        replier: line,
    };

    // --- 6. Serve the webhook ---
    let app = webhook::create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_address))?;
    tracing::info!("Listening for LINE webhooks on {}", config.bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for Ctrl-C: {}", e);
            }
            tracing::info!("Received Ctrl-C, shutting down...");
        })
        .await
        .context("Webhook server failed")?;

    tracing::info!("Shutting down...");
    Ok(())
}
