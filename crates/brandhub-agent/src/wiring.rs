//! Builds the session collaborators from configuration.

use std::sync::Arc;
use std::time::Duration;

use brandhub_notifications::{
    ApiError, AudioCue, ChannelError, CommandAudioCue, HttpNotificationApi, SessionDeps,
    SilentAudioCue, WebSocketConnector,
};
use thiserror::Error;
use tracing::info;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum WiringError {
    #[error("API client: {0}")]
    Api(#[from] ApiError),

    #[error("Live channel: {0}")]
    Channel(#[from] ChannelError),
}

pub fn build_deps(cfg: &AppConfig) -> Result<SessionDeps, WiringError> {
    let mut api = HttpNotificationApi::parse(&cfg.api.base_url)?
        .with_request_timeout(cfg.api.request_timeout_ms.map(Duration::from_millis));
    let mut connector = WebSocketConnector::parse(&cfg.channel.url)?;
    if let Some(token) = &cfg.brand.auth_token {
        api = api.with_bearer_token(token.clone());
        connector = connector.with_bearer_token(token.clone());
    }

    let audio: Arc<dyn AudioCue> = if cfg.audio.enabled {
        info!(command = %cfg.audio.command, "Audio cues enabled");
        Arc::new(CommandAudioCue::new(
            cfg.audio.command.clone(),
            cfg.audio.args.clone(),
        ))
    } else {
        Arc::new(SilentAudioCue)
    };

    Ok(SessionDeps {
        api: Arc::new(api),
        connector: Arc::new(connector),
        audio,
    })
}
