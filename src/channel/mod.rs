//! Command channel
//!
//! This module provides:
//! - `<pin>,<value>` command parsing
//! - The pseudo-file write/read contract (silent rejection, fixed greeting)
//! - A Unix socket transport for it

pub mod command;
pub mod proc_entry;
pub mod server;

pub use command::RawCommand;
pub use proc_entry::{ProcEntry, ReadSession, GREETING, MAX_USER_SIZE};
pub use server::Server;
