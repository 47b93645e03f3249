//! Board profiles
//!
//! The GPIO register layout is shared across the BCM283x/BCM2711 family;
//! only the physical base of the block differs per board.

pub mod profile;

pub use profile::BoardProfile;

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Raspberry Pi 4 Model B / 400 / CM4
pub static RPI4: BoardProfile = BoardProfile {
    id: "rpi4",
    name: "Raspberry Pi 4",
    soc: "BCM2711",
    gpio_base: 0xFE20_0000,
};

/// Raspberry Pi 2 and 3
pub static RPI3: BoardProfile = BoardProfile {
    id: "rpi3",
    name: "Raspberry Pi 2/3",
    soc: "BCM2836/BCM2837",
    gpio_base: 0x3F20_0000,
};

/// Raspberry Pi Zero W (and the original Pi 1)
pub static RPI_ZERO: BoardProfile = BoardProfile {
    id: "rpi-zero",
    name: "Raspberry Pi Zero W",
    soc: "BCM2835",
    gpio_base: 0x2020_0000,
};

/// Registry of built-in board profiles
pub static BOARDS: Lazy<HashMap<&'static str, &'static BoardProfile>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("rpi4", &RPI4);
    m.insert("raspberry-pi-4", &RPI4);
    m.insert("bcm2711", &RPI4);
    m.insert("rpi3", &RPI3);
    m.insert("rpi2", &RPI3);
    m.insert("bcm2837", &RPI3);
    m.insert("rpi-zero", &RPI_ZERO);
    m.insert("rpi-zero-w", &RPI_ZERO);
    m.insert("bcm2835", &RPI_ZERO);
    m
});

/// Get a board profile by name or alias
pub fn get_board(name: &str) -> Option<&'static BoardProfile> {
    BOARDS.get(name.to_lowercase().as_str()).copied()
}

/// Canonical profiles, one per board
pub fn boards() -> [&'static BoardProfile; 3] {
    [&RPI4, &RPI3, &RPI_ZERO]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_aliases() {
        assert_eq!(get_board("rpi4").unwrap().gpio_base, 0xFE20_0000);
        assert_eq!(get_board("BCM2711").unwrap().id, "rpi4");
        assert_eq!(get_board("rpi2").unwrap().gpio_base, 0x3F20_0000);
        assert_eq!(get_board("rpi-zero-w").unwrap().gpio_base, 0x2020_0000);
        assert!(get_board("stm32").is_none());
    }

    #[test]
    fn test_every_alias_is_canonical() {
        for profile in BOARDS.values() {
            assert!(boards().iter().any(|b| b.id == profile.id));
        }
    }

    #[test]
    fn test_bases_are_page_aligned() {
        for board in boards() {
            assert_eq!(board.gpio_base % 4096, 0, "{}", board);
        }
    }
}
