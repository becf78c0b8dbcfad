use std::env;
use std::sync::Arc;

use anyhow::Context;
use brandhub_agent::config::loader::load_config;
use brandhub_agent::{apply_logging_level, build_deps, init_tracing};
use brandhub_core::{CoreError, format_rfc3339};
use brandhub_notifications::{
    ConnectionStatus, NotificationSession, SessionManager, StoreChange, StoreUpdate,
};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

/// How the configuration path was determined.
#[derive(Debug, Clone, Copy)]
enum ConfigSource {
    CliArgument,
    EnvironmentVariable,
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CliArgument => write!(f, "CLI argument (--config)"),
            Self::EnvironmentVariable => write!(f, "environment variable (BRANDHUB_CONFIG)"),
            Self::Default => write!(f, "default"),
        }
    }
}

#[tokio::main]
async fn main() {
    // .env is optional
    if let Err(e) = dotenvy::dotenv()
        && !matches!(e, dotenvy::Error::Io(ref io_err) if io_err.kind() == std::io::ErrorKind::NotFound)
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    init_tracing();

    let (config_path, source) = resolve_config_path();
    let cfg = match load_config(Some(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", CoreError::configuration(e));
            std::process::exit(2);
        }
    };
    tracing::info!(path = %config_path, source = %source, "Configuration loaded");
    apply_logging_level(&cfg.logging.level);

    let deps = match build_deps(&cfg) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Initialization failed: {e}");
            std::process::exit(2);
        }
    };

    let manager = SessionManager::new(deps, cfg.notifications.clone());
    if let Err(e) = run(&manager, cfg.brand.scope_id.as_deref()).await {
        tracing::error!(error = %e, "Agent stopped");
    }
    manager.logout().await;
}

/// Resolve the configuration file path.
///
/// Priority order:
/// 1. CLI argument: --config <path>
/// 2. Environment variable: BRANDHUB_CONFIG
/// 3. Default: brandhub.toml
fn resolve_config_path() -> (String, ConfigSource) {
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config"
            && let Some(path) = args.next()
        {
            return (path, ConfigSource::CliArgument);
        }
    }

    if let Ok(path) = env::var("BRANDHUB_CONFIG")
        && !path.is_empty()
    {
        return (path, ConfigSource::EnvironmentVariable);
    }

    ("brandhub.toml".to_string(), ConfigSource::Default)
}

async fn run(manager: &SessionManager, scope_id: Option<&str>) -> anyhow::Result<()> {
    let session = manager
        .switch_scope(scope_id)
        .await
        .context("no brand scope configured (brand.scope_id)")?;

    let snapshot = session.store().snapshot();
    tracing::info!(
        scope_id = %snapshot.scope_id,
        records = snapshot.records.len(),
        unread = snapshot.unread_count,
        "Following notifications, press Ctrl-C to stop"
    );

    let mut updates = BroadcastStream::new(session.subscribe());
    let mut status = session.subscribe_status();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res.context("failed to listen for Ctrl-C")?;
                tracing::info!("Shutting down");
                return Ok(());
            }
            changed = status.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let current = *status.borrow_and_update();
                if current == ConnectionStatus::Disconnected {
                    tracing::warn!(
                        scope_id = %session.scope(),
                        "Live channel lost; restart the agent to reconnect"
                    );
                }
            }
            item = updates.next() => match item {
                Some(Ok(update)) => log_update(&session, &update),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(skipped, "Store updates dropped by a slow consumer");
                }
                None => return Ok(()),
            }
        }
    }
}

fn log_update(session: &Arc<NotificationSession>, update: &StoreUpdate) {
    match &update.change {
        StoreChange::Inserted { id, kind } => {
            let Some(record) = session.store().get(id) else {
                return;
            };
            let at = format_rfc3339(&record.created_at).unwrap_or_default();
            tracing::info!(
                notification_id = %id,
                kind = %kind,
                created_at = %at,
                unread = update.unread_count,
                "{}",
                record.payload.summary()
            );
        }
        change => {
            tracing::debug!(?change, unread = update.unread_count, "Notification store changed");
        }
    }
}
