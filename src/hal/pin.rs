//! Pin numbering and register address resolution
//!
//! Pure arithmetic from a pin number to the register words and bit positions
//! that control it. Nothing here touches hardware.
//!
//! # Register Layout
//!
//! | Register | Offset | Pins  | Bits per pin |
//! |----------|--------|-------|--------------|
//! | GPFSEL0  | 0x00   | 0-9   | 3            |
//! | GPFSEL1  | 0x04   | 10-19 | 3            |
//! | GPFSEL2  | 0x08   | 20-29 | 3            |
//! | GPSET0   | 0x1C   | 0-31  | 1            |
//! | GPCLR0   | 0x28   | 0-31  | 1            |

use crate::error::ValidationError;
use std::fmt;

/// GPIO register offsets
pub mod regs {
    pub const GPFSEL0: usize = 0x00; // Function Select 0 (pins 0-9)
    pub const GPFSEL1: usize = 0x04; // Function Select 1 (pins 10-19)
    pub const GPFSEL2: usize = 0x08; // Function Select 2 (pins 20-29)
    pub const GPFSEL3: usize = 0x0C;
    pub const GPFSEL4: usize = 0x10;
    pub const GPFSEL5: usize = 0x14;
    pub const GPSET0: usize = 0x1C; // Pin Output Set 0
    pub const GPSET1: usize = 0x20;
    pub const GPCLR0: usize = 0x28; // Pin Output Clear 0
    pub const GPCLR1: usize = 0x2C;
    pub const GPLEV0: usize = 0x34; // Pin Level 0
    pub const GPLEV1: usize = 0x38;

    /// Named registers, in address order
    pub const NAMED: &[(&str, usize)] = &[
        ("GPFSEL0", GPFSEL0),
        ("GPFSEL1", GPFSEL1),
        ("GPFSEL2", GPFSEL2),
        ("GPFSEL3", GPFSEL3),
        ("GPFSEL4", GPFSEL4),
        ("GPFSEL5", GPFSEL5),
        ("GPSET0", GPSET0),
        ("GPSET1", GPSET1),
        ("GPCLR0", GPCLR0),
        ("GPCLR1", GPCLR1),
        ("GPLEV0", GPLEV0),
        ("GPLEV1", GPLEV1),
    ];
}

/// Highest pin reachable through the command channel
pub const MAX_PIN: u8 = 21;

/// Function-select fields packed into one register
pub const FSEL_PINS_PER_WORD: u8 = 10;

/// Width of one function-select field
pub const FSEL_FIELD_WIDTH: u32 = 3;

/// Function-select encoding for a plain output
pub const FSEL_OUTPUT: u32 = 0b001;

/// A pin number that has passed range validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pin(u8);

impl Pin {
    pub fn new(raw: i64) -> Result<Self, ValidationError> {
        if (0..=i64::from(MAX_PIN)).contains(&raw) {
            Ok(Self(raw as u8))
        } else {
            Err(ValidationError::PinOutOfRange(raw))
        }
    }

    pub const fn number(self) -> u8 {
        self.0
    }

    /// Every pin the channel accepts
    pub fn all() -> impl Iterator<Item = Pin> {
        (0..=MAX_PIN).map(Pin)
    }
}

impl fmt::Display for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GPIO{}", self.0)
    }
}

/// Output level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low = 0,
    High = 1,
}

impl TryFrom<i64> for Level {
    type Error = ValidationError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Level::Low),
            1 => Ok(Level::High),
            other => Err(ValidationError::InvalidValue(other)),
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// A bit field inside one 32-bit register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Byte offset of the register within the block
    pub offset: usize,
    pub shift: u32,
    pub width: u32,
}

impl BitField {
    pub const fn new(offset: usize, shift: u32, width: u32) -> Self {
        Self { offset, shift, width }
    }

    pub const fn mask(&self) -> u32 {
        ((1u32 << self.width) - 1) << self.shift
    }

    /// `word` with this field zeroed
    pub const fn clear(&self, word: u32) -> u32 {
        word & !self.mask()
    }

    /// `word` with `value` ORed into this field
    pub const fn set(&self, word: u32, value: u32) -> u32 {
        word | ((value << self.shift) & self.mask())
    }

    pub const fn get(&self, word: u32) -> u32 {
        (word & self.mask()) >> self.shift
    }
}

/// Function-select register index and bit offset for `pin`
pub fn function_select_location(pin: Pin) -> (usize, u32) {
    let n = pin.number();
    let word_index = (n / FSEL_PINS_PER_WORD) as usize;
    let bit_offset = (n % FSEL_PINS_PER_WORD) as u32 * FSEL_FIELD_WIDTH;
    (word_index, bit_offset)
}

pub fn function_select_field(pin: Pin) -> BitField {
    let (word_index, bit_offset) = function_select_location(pin);
    BitField::new(regs::GPFSEL0 + word_index * 4, bit_offset, FSEL_FIELD_WIDTH)
}

/// Bit index of `pin` in GPSET0/GPCLR0.
///
/// Valid pins never exceed 31, so bank 0 covers all of them.
pub fn global_bit_offset(pin: Pin) -> u32 {
    u32::from(pin.number())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pin(n: i64) -> Pin {
        Pin::new(n).unwrap()
    }

    #[test]
    fn test_function_select_location() {
        assert_eq!(function_select_location(pin(0)), (0, 0));
        assert_eq!(function_select_location(pin(9)), (0, 27));
        assert_eq!(function_select_location(pin(10)), (1, 0));
        assert_eq!(function_select_location(pin(21)), (2, 3));
    }

    #[test]
    fn test_function_select_field_offsets() {
        assert_eq!(function_select_field(pin(4)).offset, regs::GPFSEL0);
        assert_eq!(function_select_field(pin(17)).offset, regs::GPFSEL1);
        assert_eq!(function_select_field(pin(21)).offset, regs::GPFSEL2);
        assert_eq!(function_select_field(pin(9)).mask(), 0b111 << 27);
    }

    #[test]
    fn test_fields_never_overlap() {
        for a in Pin::all() {
            for b in Pin::all().filter(|b| *b != a) {
                let (fa, fb) = (function_select_field(a), function_select_field(b));
                if fa.offset == fb.offset {
                    assert_eq!(fa.mask() & fb.mask(), 0, "{} and {}", a, b);
                }
            }
        }
    }

    #[test]
    fn test_global_bit_offset() {
        assert_eq!(global_bit_offset(pin(0)), 0);
        assert_eq!(global_bit_offset(pin(21)), 21);
    }

    #[test]
    fn test_pin_range() {
        assert!(Pin::new(0).is_ok());
        assert!(Pin::new(21).is_ok());
        assert_eq!(Pin::new(22), Err(ValidationError::PinOutOfRange(22)));
        assert_eq!(Pin::new(-1), Err(ValidationError::PinOutOfRange(-1)));
        assert_eq!(Pin::all().count(), 22);
    }

    #[test]
    fn test_level_conversion() {
        assert_eq!(Level::try_from(0), Ok(Level::Low));
        assert_eq!(Level::try_from(1), Ok(Level::High));
        assert_eq!(Level::try_from(2), Err(ValidationError::InvalidValue(2)));
    }

    #[test]
    fn test_bit_field_ops() {
        let field = BitField::new(0, 3, 3);
        assert_eq!(field.mask(), 0b111_000);
        assert_eq!(field.clear(0xFFFF_FFFF), 0xFFFF_FFC7);
        assert_eq!(field.set(0, FSEL_OUTPUT), 0b001_000);
        assert_eq!(field.set(0, 0b1111), 0b111_000);
        assert_eq!(field.get(0b101_000), 0b101);
    }
}
