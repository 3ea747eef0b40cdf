//! MRI client CLI
//!
//! Command-line front end for the MRI tumor-classification API:
//! 1. Loads configuration (file + env overrides)
//! 2. Opens the session file holding the token pair
//! 3. Runs one subcommand through the authenticated client
//! 4. Tells the user to log in again when the session could not be refreshed

mod cli;
mod commands;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mri_api::{ApiClient, SessionEvent};
use mri_auth::CredentialStore;
use tokio::sync::broadcast;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::Cli;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // JSON logs on stderr so stdout stays clean for command output
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();

    let (config_path, explicit) = Config::resolve_path(cli.config.as_deref());
    debug!(path = %config_path.display(), explicit, "loading configuration");
    let config = Config::load(&config_path, explicit)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    let session_path = config.session_path();
    info!(
        base_url = %config.api.base_url,
        timeout_secs = config.api.timeout_secs,
        session_file = %session_path.display(),
        "configuration loaded"
    );

    let store = CredentialStore::load(session_path.clone())
        .await
        .with_context(|| format!("failed to open session file {}", session_path.display()))?;
    let api = ApiClient::new(config.client_config(), Arc::new(store))
        .context("failed to build API client")?;

    let mut events = api.subscribe();
    let result = commands::run(&api, cli.command, cli.json).await;
    report_session_events(&mut events);
    result
}

/// Print a notice for session events raised while the command ran.
fn report_session_events(events: &mut broadcast::Receiver<SessionEvent>) {
    if let Some(reason) = pending_login_notice(std::iter::from_fn(|| events.try_recv().ok())) {
        eprintln!("Your session has expired ({reason}). Run `mri-client login` to sign in again.");
    }
}

/// Reason for a login notice, unless a later login or logout settled it.
fn pending_login_notice(events: impl IntoIterator<Item = SessionEvent>) -> Option<String> {
    events.into_iter().fold(None, |pending, event| {
        debug!(?event, "session event");
        match event {
            SessionEvent::LoginRequired { reason } => Some(reason),
            SessionEvent::LoggedIn | SessionEvent::LoggedOut => None,
            SessionEvent::TokensRefreshed => pending,
        }
    })
}
