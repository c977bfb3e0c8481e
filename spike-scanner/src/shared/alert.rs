/// Alert sinks
///
/// Side effects fired for each newly detected spike. Every sink is best-effort: the
/// notifier logs a failed sink and carries on.
use crate::shared::format::format_volume;
use async_trait::async_trait;
use smol_str::SmolStr;
use spike_data::SpikeRecord;
use std::{io::Write, time::Duration};
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Errors raised by an [`AlertSink`].
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("desktop notifications are not permitted: {0}")]
    PermissionDenied(String),

    #[error("failed to spawn notifier `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("notifier `{command}` exited with {status}")]
    Exit { command: String, status: String },

    #[error("notifier `{command}` did not finish within {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("sound playback failed: {0}")]
    Sound(String),
}

/// Audible cue accompanying a desktop alert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    /// Short chime (terminal bell)
    Chime,
}

/// Everything a sink needs to present one spike.
#[derive(Debug, Clone, PartialEq)]
pub struct SpikeAlert {
    pub symbol: SmolStr,
    pub volume_delta: f64,
    /// Desktop notification title, e.g. `📈 AAPL spiked!`
    pub title: String,
    /// Desktop notification body, e.g. `Volume: 500,000`
    pub body: String,
}

impl SpikeAlert {
    /// In-app toast text, e.g. `📊 AAPL spiked with 500,000 volume`
    pub fn toast_text(&self) -> String {
        format!(
            "📊 {} spiked with {} volume",
            self.symbol,
            format_volume(self.volume_delta)
        )
    }
}

impl From<&SpikeRecord> for SpikeAlert {
    fn from(record: &SpikeRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            volume_delta: record.volume_delta,
            title: format!("📈 {} spiked!", record.symbol),
            body: format!("Volume: {}", format_volume(record.volume_delta)),
        }
    }
}

/// Fire-and-forget presentation of a [`SpikeAlert`].
#[async_trait]
pub trait AlertSink: Send + Sync {
    /// Sink name used in logs
    fn name(&self) -> &'static str;

    async fn notify(&self, alert: &SpikeAlert) -> Result<(), AlertError>;

    async fn play(&self, _sound: Sound) -> Result<(), AlertError> {
        Ok(())
    }
}

/// Longest a desktop notifier command may run before it is killed.
pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Desktop notifications via an external command (`notify-send` by default) plus
/// a terminal bell.
///
/// The command is invoked as `command [args..] title body` and killed if it outlives
/// the timeout, so a stuck notification daemon cannot stall the poll loop.
#[derive(Debug, Clone)]
pub struct DesktopSink {
    command: String,
    args: Vec<String>,
    enabled: bool,
    bell: bool,
    timeout: Duration,
}

impl DesktopSink {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            args: Vec::new(),
            enabled: true,
            bell: true,
            timeout: DEFAULT_NOTIFY_TIMEOUT,
        }
    }

    /// Arguments placed before the title and body
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Disabled sinks refuse to notify, the equivalent of a denied permission
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_bell(mut self, bell: bool) -> Self {
        self.bell = bell;
        self
    }
}

#[async_trait]
impl AlertSink for DesktopSink {
    fn name(&self) -> &'static str {
        "desktop"
    }

    async fn notify(&self, alert: &SpikeAlert) -> Result<(), AlertError> {
        if !self.enabled {
            return Err(AlertError::PermissionDenied(
                "desktop notifications disabled".to_string(),
            ));
        }

        let spawn_error = |source| AlertError::Spawn {
            command: self.command.clone(),
            source,
        };

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .arg(&alert.title)
            .arg(&alert.body)
            .kill_on_drop(true)
            .spawn()
            .map_err(spawn_error)?;

        let waited = tokio::time::timeout(self.timeout, child.wait()).await;
        let status = match waited {
            Ok(result) => result.map_err(spawn_error)?,
            Err(_) => {
                let _ = child.start_kill();
                return Err(AlertError::Timeout {
                    command: self.command.clone(),
                    after: self.timeout,
                });
            }
        };

        if !status.success() {
            return Err(AlertError::Exit {
                command: self.command.clone(),
                status: status.to_string(),
            });
        }

        debug!(symbol = %alert.symbol, "desktop notification sent");
        Ok(())
    }

    async fn play(&self, sound: Sound) -> Result<(), AlertError> {
        if !self.bell {
            return Ok(());
        }

        match sound {
            Sound::Chime => {
                let mut stdout = std::io::stdout();
                stdout
                    .write_all(b"\x07")
                    .and_then(|_| stdout.flush())
                    .map_err(|error| AlertError::Sound(error.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(symbol: &str, volume_delta: f64) -> SpikeRecord {
        SpikeRecord {
            symbol: SmolStr::new(symbol),
            volume_delta,
            timestamp: Utc::now(),
            ltp: 100.0,
            open_price_of_candle: 99.5,
        }
    }

    #[test]
    fn test_spike_alert_text() {
        let alert = SpikeAlert::from(&record("AAPL", 500_000.0));

        assert_eq!(alert.title, "📈 AAPL spiked!");
        assert_eq!(alert.body, "Volume: 500,000");
        assert_eq!(alert.toast_text(), "📊 AAPL spiked with 500,000 volume");
    }

    #[tokio::test]
    async fn test_disabled_desktop_sink_refuses() {
        let sink = DesktopSink::new("notify-send")
            .with_enabled(false)
            .with_bell(false);
        let alert = SpikeAlert::from(&record("MSFT", 300_000.0));

        let actual = sink.notify(&alert).await;
        assert!(matches!(actual, Err(AlertError::PermissionDenied(_))));
        assert!(sink.play(Sound::Chime).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_notifier_command() {
        let sink = DesktopSink::new("definitely-not-a-real-notifier-binary").with_bell(false);
        let alert = SpikeAlert::from(&record("GOOG", 700_000.0));

        let actual = sink.notify(&alert).await;
        assert!(matches!(actual, Err(AlertError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_notifier_is_killed_after_timeout() {
        let sink = DesktopSink::new("sh")
            .with_args(["-c", "sleep 30"])
            .with_timeout(Duration::from_millis(200))
            .with_bell(false);
        let alert = SpikeAlert::from(&record("AAPL", 1.0));

        let started = std::time::Instant::now();
        let actual = sink.notify(&alert).await;

        assert!(matches!(actual, Err(AlertError::Timeout { .. })));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_notifier_args_precede_title_and_body() {
        // $0 is the title and $1 the body once `-c script` is consumed
        let sink = DesktopSink::new("sh")
            .with_args(["-c", r#"[ "$1" = "Volume: 500,000" ]"#])
            .with_bell(false);
        let alert = SpikeAlert::from(&record("AAPL", 500_000.0));

        assert!(sink.notify(&alert).await.is_ok());
    }
}
