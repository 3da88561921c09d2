use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the movement engines.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct MovementConfig {
    /// Logger configuration for movement logs.
    #[serde(default)]
    pub logger: LoggerConfig<MovementLogLevel>,
    /// Whether issued hardware instructions are recorded in the core's trace.
    #[serde(default = "default_trace")]
    pub trace: bool,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            logger: Default::default(),
            trace: default_trace(),
        }
    }
}

fn default_trace() -> bool {
    true
}

/// Log levels for the movement engines.
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MovementLogLevel {
    /// Movement logging is disabled.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// One line per movement operation.
    #[serde(rename = "basic")]
    Basic,

    /// Every issued hardware instruction is logged as well.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for MovementLogLevel {
    fn is_disabled(&self) -> bool {
        matches!(self, MovementLogLevel::Disabled)
    }
}
