//! Audio-cue collaborator.
//!
//! Cues are fire-and-forget: each one runs in its own task with a timeout and
//! panic protection, and any failure is logged and dropped. A broken speaker
//! never reaches notification handling.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::FutureExt;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::AudioError;
use crate::types::NotificationKind;

/// Default upper bound for a single cue.
pub const DEFAULT_CUE_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait AudioCue: Send + Sync {
    fn name(&self) -> &str {
        "audio"
    }

    async fn play(&self, kind: NotificationKind) -> Result<(), AudioError>;
}

/// Plays nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentAudioCue;

#[async_trait]
impl AudioCue for SilentAudioCue {
    fn name(&self) -> &str {
        "silent"
    }

    async fn play(&self, _kind: NotificationKind) -> Result<(), AudioError> {
        Ok(())
    }
}

/// Runs an external player, e.g. `paplay /usr/share/sounds/{kind}.oga`.
///
/// `{kind}` in any argument is replaced by the notification kind.
#[derive(Debug, Clone)]
pub struct CommandAudioCue {
    program: String,
    args: Vec<String>,
}

impl CommandAudioCue {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn args_for(&self, kind: NotificationKind) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| arg.replace("{kind}", kind.as_str()))
            .collect()
    }
}

#[async_trait]
impl AudioCue for CommandAudioCue {
    fn name(&self) -> &str {
        &self.program
    }

    async fn play(&self, kind: NotificationKind) -> Result<(), AudioError> {
        let status = Command::new(&self.program)
            .args(self.args_for(kind))
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| AudioError::Unavailable(format!("{}: {e}", self.program)))?;

        if status.success() {
            Ok(())
        } else {
            Err(AudioError::Playback(format!(
                "{} exited with {status}",
                self.program
            )))
        }
    }
}

/// Play a cue in the background. The returned handle never yields an error.
pub fn spawn_cue(
    audio: Arc<dyn AudioCue>,
    kind: NotificationKind,
    timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let cue = audio.name().to_string();

        let result = tokio::time::timeout(timeout, async {
            AssertUnwindSafe(audio.play(kind)).catch_unwind().await
        })
        .await;

        match result {
            Ok(Ok(Ok(()))) => {
                debug!(cue = %cue, kind = %kind, "Audio cue played");
            }
            Ok(Ok(Err(e))) => {
                warn!(cue = %cue, kind = %kind, error = %e, "Audio cue failed");
            }
            Ok(Err(panic)) => {
                let panic_msg = if let Some(s) = panic.downcast_ref::<&str>() {
                    s.to_string()
                } else if let Some(s) = panic.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "Unknown panic".to_string()
                };
                error!(cue = %cue, kind = %kind, panic = %panic_msg, "Audio cue panicked");
            }
            Err(_) => {
                warn!(
                    cue = %cue,
                    kind = %kind,
                    timeout_ms = timeout.as_millis() as u64,
                    "Audio cue timed out"
                );
            }
        }
    })
}
