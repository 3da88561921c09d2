use super::{arena::ArenaConfig, movement::MovementConfig, sync::SyncConfig};
use alloc::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static TILECL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// File names searched when loading the configuration.
const CONFIG_FILE_NAMES: [&str; 2] = ["tilecl.toml", "TileCL.toml"];

/// Represents the global configuration for TileCL, combining arena, synchronization and
/// movement settings.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Capacities of the on-chip tiers and placement checking.
    #[serde(default)]
    pub arena: ArenaConfig,

    /// Handshake checking between pipes.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Movement engines: instruction trace and logging.
    #[serde(default)]
    pub movement: MovementConfig,
}

/// Errors raised while reading or writing a configuration file.
#[cfg(std_io)]
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file couldn't be read or written.
    #[error("Can't access the configuration file\nCaused by:\n  {0}")]
    Io(#[from] std::io::Error),

    /// The file isn't valid TOML for a [GlobalConfig].
    #[error("The configuration file doesn't have the right format\nCaused by:\n  {0}")]
    Format(#[from] toml::de::Error),

    /// The configuration can't be serialized.
    #[error("The configuration can't be serialized\nCaused by:\n  {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `tilecl.toml` or `TileCL.toml` in
    /// the current directory or its parents, then from the user configuration directory. If no
    /// file is found, a default configuration is used. Environment variables are applied last.
    pub fn get() -> Arc<Self> {
        let mut state = TILECL_GLOBAL_CONFIG.lock();

        match state.as_ref() {
            Some(config) => config.clone(),
            None => {
                cfg_if::cfg_if! {
                    if #[cfg(std_io)] {
                        let config = Self::from_current_dir();
                        let config = config.override_from_env();
                    } else {
                        let config = Self::default();
                    }
                }

                let config = Arc::new(config);
                *state = Some(config.clone());
                config
            }
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`. Attempting
    /// to set the configuration after it has been initialized will cause a panic.
    pub fn set(config: Self) {
        let mut state = TILECL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    #[cfg(std_io)]
    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> Result<(), ConfigError> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())?;
        std::fs::write(path, content)?;

        Ok(())
    }

    #[cfg(std_io)]
    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        use super::{movement::MovementLogLevel, sync::SyncLogLevel};

        if let Ok(val) = std::env::var("TILECL_DEBUG_LOG") {
            self.movement.logger.level = MovementLogLevel::Full;
            self.sync.logger.level = SyncLogLevel::Full;

            match val.as_str() {
                "stdout" => {
                    self.movement.logger.stdout = true;
                    self.sync.logger.stdout = true;
                }
                "stderr" => {
                    self.movement.logger.stderr = true;
                    self.sync.logger.stderr = true;
                }
                "1" | "true" => {
                    let file_path = "/tmp/tilecl.log";
                    self.movement.logger.file = Some(file_path.into());
                    self.sync.logger.file = Some(file_path.into());
                }
                "0" | "false" => {
                    self.movement.logger.level = MovementLogLevel::Disabled;
                    self.sync.logger.level = SyncLogLevel::Disabled;
                }
                file_path => {
                    self.movement.logger.file = Some(file_path.into());
                    self.sync.logger.file = Some(file_path.into());
                }
            }
        };

        if let Ok(val) = std::env::var("TILECL_STRICT_SYNC") {
            match val.as_str() {
                "1" | "true" => self.sync.strict = true,
                "0" | "false" => self.sync.strict = false,
                _ => {}
            }
        }

        if let Ok(val) = std::env::var("TILECL_TRACE") {
            match val.as_str() {
                "1" | "true" => self.movement.trace = true,
                "0" | "false" => self.movement.trace = false,
                _ => {}
            }
        }

        self
    }

    // Loads configuration from `tilecl.toml` or `TileCL.toml` in the current directory or its
    // parents, then from the user configuration directory.
    //
    // A file that exists but can't be parsed is reported and skipped.
    #[cfg(std_io)]
    fn from_current_dir() -> Self {
        let mut candidates = alloc::vec::Vec::new();

        if let Ok(mut dir) = std::env::current_dir() {
            loop {
                for name in CONFIG_FILE_NAMES {
                    candidates.push(dir.join(name));
                }
                if !dir.pop() {
                    break;
                }
            }
        }
        if let Some(dir) = dirs::config_dir() {
            for name in CONFIG_FILE_NAMES {
                candidates.push(dir.join("tilecl").join(name));
            }
        }

        for path in candidates {
            if !path.is_file() {
                continue;
            }
            match Self::from_file_path(&path) {
                Ok(config) => {
                    log::info!("Loaded TileCL configuration from {}", path.display());
                    return config;
                }
                Err(err) => log::warn!("Ignoring {}: {err}", path.display()),
            }
        }

        Self::default()
    }

    /// Loads configuration from a specified file path.
    #[cfg(std_io)]
    pub fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parses a configuration from TOML content.
    #[cfg(std_io)]
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}

#[cfg(all(test, std_io))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serial_test::serial;
    use tilecl_common::TileType;

    #[test]
    fn empty_file_gives_defaults() {
        let config = GlobalConfig::from_toml("").unwrap();

        assert_eq!(config.arena.capacity(TileType::Mat), 512 * 1024);
        assert!(!config.sync.strict);
        assert!(config.movement.trace);
    }

    #[test]
    fn sections_are_parsed() {
        let config = GlobalConfig::from_toml(
            r#"
            [arena]
            left = 32768
            check_overlap = true

            [sync]
            strict = true

            [movement]
            trace = false

            [movement.logger]
            level = "full"
            stdout = true
            "#,
        )
        .unwrap();

        assert_eq!(config.arena.capacity(TileType::Left), 32768);
        assert_eq!(config.arena.capacity(TileType::Right), 64 * 1024);
        assert!(config.arena.check_overlap);
        assert!(config.sync.strict);
        assert!(!config.movement.trace);
        assert!(config.movement.logger.stdout);
    }

    #[test]
    fn invalid_file_is_an_error() {
        let result = GlobalConfig::from_toml("[arena]\nleft = \"big\"");

        assert!(matches!(result, Err(ConfigError::Format(_))));
    }

    #[test]
    #[serial]
    fn debug_log_enables_both_categories() {
        use crate::config::{movement::MovementLogLevel, sync::SyncLogLevel};

        // SAFETY: tests reading the environment are serial.
        unsafe { std::env::set_var("TILECL_DEBUG_LOG", "stderr") };
        let config = GlobalConfig::default().override_from_env();
        unsafe { std::env::remove_var("TILECL_DEBUG_LOG") };

        assert_eq!(config.movement.logger.level, MovementLogLevel::Full);
        assert_eq!(config.sync.logger.level, SyncLogLevel::Full);
        assert!(config.sync.logger.stderr && !config.sync.logger.stdout);
    }
}
