use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the handshake checking between pipes.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct SyncConfig {
    /// Logger configuration for synchronization logs.
    #[serde(default)]
    pub logger: LoggerConfig<SyncLogLevel>,
    /// Panic on the first hazard instead of recording it.
    #[serde(default)]
    pub strict: bool,
}

/// Log levels for synchronization.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SyncLogLevel {
    /// Synchronization logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// Hazards and unawaited flags are logged.
    #[serde(rename = "basic")]
    Basic,

    /// Every flag set, wait and barrier is logged as well.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for SyncLogLevel {
    fn is_disabled(&self) -> bool {
        matches!(self, SyncLogLevel::Disabled)
    }
}
