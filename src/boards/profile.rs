//! Board profile definition

use std::fmt;

/// A supported board and where its GPIO block lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardProfile {
    /// Short identifier (e.g., "rpi4")
    pub id: &'static str,
    /// Board name
    pub name: &'static str,
    /// System-on-chip
    pub soc: &'static str,
    /// Physical base address of the GPIO register block
    pub gpio_base: u64,
}

impl fmt::Display for BoardProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, GPIO at {:#010x})", self.name, self.soc, self.gpio_base)
    }
}
