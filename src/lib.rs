//! Userspace GPIO output driver for Raspberry Pi boards
//!
//! Maps the GPIO register page of a BCM2711 (or BCM2837/BCM2835) and drives
//! output pins 0..=21 in response to `<pin>,<value>` text commands.
//!
//! # Architecture
//!
//! ```text
//!   socket client ("4,1")
//!          │
//!          ▼
//!   ┌─────────────┐
//!   │   Server    │  one write + one read per connection
//!   └──────┬──────┘
//!          ▼
//!   ┌─────────────┐
//!   │  ProcEntry  │  truncate, parse, validate (silent), greeting
//!   └──────┬──────┘
//!          ▼
//!   ┌─────────────┐
//!   │GpioController│  mutex around configure + set/clear
//!   └──────┬──────┘
//!          ▼
//!   ┌─────────────┐
//!   │RegisterBlock│  mapped page or in-memory page
//!   └──────┬──────┘
//!          ▼
//!     BCM2711 HW
//! ```
//!
//! # Example
//!
//! ```
//! use gpio_dr::channel::{ProcEntry, ReadSession};
//! use gpio_dr::hal::{GpioController, MemRegisters};
//!
//! let entry = ProcEntry::new("gpio-dr", GpioController::new(MemRegisters::page()));
//! assert_eq!(entry.write(b"4,1"), 3);
//!
//! let mut buf = [0u8; 16];
//! let n = entry.read(&mut ReadSession::new(), &mut buf);
//! assert_eq!(&buf[..n], b"Hello!\n");
//! ```

pub mod boards;
pub mod channel;
pub mod config;
pub mod error;
pub mod hal;

pub use config::Config;
pub use error::{Error, Result};
