//! Configuration file
//!
//! ```toml
//! board = "rpi4"
//!
//! [mapping]
//! device = "/dev/mem"
//! # offset = 0        # use 0 with /dev/gpiomem
//! length = 4096
//!
//! [channel]
//! socket = "/run/gpio-dr.sock"
//! mode = 0o666
//! read_timeout_ms = 2000
//! ```

use crate::boards::{get_board, BoardProfile};
use crate::error::ConfigError;
use crate::hal::regmap::check_block_length;
use crate::hal::BLOCK_SIZE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Conventional config file location
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gpio-dr.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Board profile id or alias
    pub board: String,
    pub mapping: MappingConfig,
    pub channel: ChannelConfig,
}

/// Where the register block comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    /// Device node to map
    pub device: PathBuf,
    /// Offset into the device; defaults to the board's GPIO base
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u64>,
    /// Bytes to map; at least the 4096-byte GPIO page
    pub length: usize,
}

/// Command socket settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub socket: PathBuf,
    /// Socket file permissions
    pub mode: u32,
    /// How long a connection may take to deliver its command
    pub read_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            board: "rpi4".to_string(),
            mapping: MappingConfig::default(),
            channel: ChannelConfig::default(),
        }
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/mem"),
            offset: None,
            length: BLOCK_SIZE,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            socket: PathBuf::from("/run/gpio-dr.sock"),
            mode: 0o666,
            read_timeout_ms: 2000,
        }
    }
}

impl Config {
    /// Load a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Load `path` if given, else the default location if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.exists() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.board_profile()?;
        check_block_length(config.mapping.length)?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn board_profile(&self) -> Result<&'static BoardProfile, ConfigError> {
        get_board(&self.board).ok_or_else(|| ConfigError::UnknownBoard(self.board.clone()))
    }

    /// Offset to map at: explicit, or the board's GPIO base
    pub fn map_offset(&self) -> Result<u64, ConfigError> {
        match self.mapping.offset {
            Some(offset) => Ok(offset),
            None => Ok(self.board_profile()?.gpio_base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MapError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.board_profile().unwrap().soc, "BCM2711");
        assert_eq!(config.map_offset().unwrap(), 0xFE20_0000);
        assert_eq!(config.mapping.length, 4096);
        assert_eq!(config.channel.mode, 0o666);
    }

    #[test]
    fn test_parse_partial() {
        let content = r#"
board = "rpi3"

[mapping]
device = "/dev/gpiomem"
offset = 0
"#;
        let config = Config::parse(content).unwrap();
        assert_eq!(config.mapping.device, PathBuf::from("/dev/gpiomem"));
        assert_eq!(config.map_offset().unwrap(), 0);
        assert_eq!(config.mapping.length, BLOCK_SIZE);
        assert_eq!(config.channel, ChannelConfig::default());
    }

    #[test]
    fn test_board_base_used_without_offset() {
        let config = Config::parse("board = \"rpi-zero\"\n").unwrap();
        assert_eq!(config.map_offset().unwrap(), 0x2020_0000);
    }

    #[test]
    fn test_octal_mode() {
        let config = Config::parse("[channel]\nmode = 0o660\n").unwrap();
        assert_eq!(config.channel.mode, 0o660);
    }

    #[test]
    fn test_unknown_board_rejected() {
        assert!(matches!(
            Config::parse("board = \"beaglebone\"\n"),
            Err(ConfigError::UnknownBoard(name)) if name == "beaglebone"
        ));
    }

    #[test]
    fn test_short_mapping_rejected() {
        assert!(matches!(
            Config::parse("[mapping]\nlength = 16\n"),
            Err(ConfigError::Mapping(MapError::InvalidLength(16)))
        ));
        assert!(matches!(
            Config::parse("[mapping]\nlength = 4098\n"),
            Err(ConfigError::Mapping(MapError::InvalidLength(4098)))
        ));
        let config = Config::parse("[mapping]\nlength = 8192\n").unwrap();
        assert_eq!(config.mapping.length, 8192);
    }

    #[test]
    fn test_invalid_toml_rejected() {
        assert!(matches!(Config::parse("board = "), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_generated_config_loads_back() {
        let config = Config::default();
        let text = config.to_toml().unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        assert_eq!(Config::load(file.path()).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            Config::load(Path::new("/nonexistent/gpio-dr.toml")),
            Err(ConfigError::Read { .. })
        ));
    }
}
