//! Hardware Abstraction Layer for the Raspberry Pi GPIO block
//!
//! Provides:
//! - Register map (mapped device page or in-memory page)
//! - Pin address resolution
//! - Serialized pin output control

pub mod gpio;
pub mod mem;
pub mod pin;
pub mod regmap;

pub use gpio::GpioController;
pub use mem::MemRegisters;
pub use pin::{Level, Pin, MAX_PIN};
pub use regmap::{MappedRegisters, RegisterBlock, BLOCK_SIZE};
