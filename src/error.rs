//! Error types
//!
//! `MapError` is fatal at startup, `ValidationError` is per command and never
//! reaches a channel writer, `RegisterError` guards the register accessors.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The register block could not be mapped
#[derive(Debug, Error)]
pub enum MapError {
    #[error("register block length {0} is not a multiple of 4 covering the 4096-byte GPIO page")]
    InvalidLength(usize),

    #[error("offset {offset:#x} is not aligned to the {page_size}-byte page size")]
    Unaligned { offset: u64, page_size: usize },

    #[error("offset {0:#x} does not fit the platform's off_t")]
    OffsetRange(u64),

    #[error("GPIO registers are already mapped by this process")]
    AlreadyMapped,

    #[error("failed to open {}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("mmap of {len} bytes at {offset:#x} failed")]
    Mmap {
        offset: u64,
        len: usize,
        #[source]
        source: io::Error,
    },
}

/// A command was rejected before touching any register
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("improper data format, expected <pin>,<value>")]
    Malformed,

    #[error("invalid pin number {0}")]
    PinOutOfRange(i64),

    #[error("invalid on/off value {0}")]
    InvalidValue(i64),
}

/// Out-of-contract register access
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum RegisterError {
    #[error("register offset {offset:#x} is outside the {len}-byte block")]
    OutOfBounds { offset: usize, len: usize },

    #[error("register offset {offset:#x} is not 32-bit aligned")]
    Misaligned { offset: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown board profile: {0}")]
    UnknownBoard(String),

    #[error("invalid [mapping] section")]
    Mapping(#[from] MapError),
}

/// Crate-wide error
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Map(#[from] MapError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Register(#[from] RegisterError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// The command was rejected by validation (as opposed to failing on hardware)
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }
}
