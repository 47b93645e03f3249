//! The `gpio-dr` pseudo-file
//!
//! Writes carry `<pin>,<value>` commands and always report success; reads
//! return a fixed greeting once per session.

use super::command;
use crate::error::Result;
use crate::hal::{GpioController, Level, RegisterBlock};
use log::{debug, info, warn};

/// Longest write accepted; the rest is dropped before parsing
pub const MAX_USER_SIZE: usize = 1024;

/// Liveness greeting returned by reads
pub const GREETING: &[u8; 7] = b"Hello!\n";

/// Per-reader state: the greeting is delivered once
#[derive(Debug, Default)]
pub struct ReadSession {
    delivered: bool,
}

impl ReadSession {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct ProcEntry<R> {
    name: String,
    controller: GpioController<R>,
}

impl<R: RegisterBlock> ProcEntry<R> {
    pub fn new(name: impl Into<String>, controller: GpioController<R>) -> Self {
        Self {
            name: name.into(),
            controller,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn controller(&self) -> &GpioController<R> {
        &self.controller
    }

    pub fn into_controller(self) -> GpioController<R> {
        self.controller
    }

    /// Accept a write from a client.
    ///
    /// Returns the number of bytes consumed: the input length capped at
    /// `MAX_USER_SIZE`, whether or not the command was valid.
    pub fn write(&self, user: &[u8]) -> usize {
        let size = user.len().min(MAX_USER_SIZE);
        let data = &user[..size];

        debug!("{}: data buffer: {:?}", self.name, String::from_utf8_lossy(data));

        match self.handle(data) {
            Ok((pin, level)) => info!("{}: pin {} driven {}", self.name, pin, level),
            Err(e) => warn!("{}: command ignored: {}", self.name, e),
        }

        size
    }

    /// Parse and apply one command, reporting the outcome
    pub fn handle(&self, data: &[u8]) -> Result<(i64, Level)> {
        let cmd = command::parse(&data[..data.len().min(MAX_USER_SIZE)])?;
        let level = self.controller.apply_command(cmd.pin, cmd.value)?;
        Ok((cmd.pin, level))
    }

    /// Serve a read for `session`.
    ///
    /// The first read with room for the whole greeting gets it; every later
    /// read of the session gets 0 bytes.
    pub fn read(&self, session: &mut ReadSession, buf: &mut [u8]) -> usize {
        if session.delivered || buf.len() < GREETING.len() {
            return 0;
        }
        buf[..GREETING.len()].copy_from_slice(GREETING);
        session.delivered = true;
        GREETING.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::pin::{function_select_field, regs, Pin, FSEL_OUTPUT};
    use crate::hal::MemRegisters;

    fn entry() -> ProcEntry<MemRegisters> {
        ProcEntry::new("gpio-dr", GpioController::new(MemRegisters::page()))
    }

    fn fsel(regs: &MemRegisters, pin: i64) -> u32 {
        let field = function_select_field(Pin::new(pin).unwrap());
        field.get(regs.peek(field.offset).unwrap())
    }

    #[test]
    fn test_write_high() {
        let entry = entry();
        assert_eq!(entry.write(b"4,1"), 3);

        entry.controller().with_registers(|regs| {
            assert_eq!(fsel(regs, 4), FSEL_OUTPUT);
            assert_eq!(regs.writes_to(regs::GPSET0), vec![1 << 4]);
            assert!(regs.writes_to(regs::GPCLR0).is_empty());
        });
    }

    #[test]
    fn test_write_low_after_high() {
        let entry = entry();
        entry.write(b"4,1");
        assert_eq!(entry.write(b"4,0"), 3);

        entry.controller().with_registers(|regs| {
            assert_eq!(fsel(regs, 4), FSEL_OUTPUT);
            assert_eq!(regs.writes_to(regs::GPSET0), vec![1 << 4]);
            assert_eq!(regs.writes_to(regs::GPCLR0), vec![1 << 4]);
        });
    }

    #[test]
    fn test_rejected_writes_report_full_size() {
        let entry = entry();
        assert_eq!(entry.write(b"99,1"), 4);
        assert_eq!(entry.write(b"abc"), 3);
        assert_eq!(entry.write(b"4,7"), 3);
        assert_eq!(entry.write(b""), 0);

        entry.controller().with_registers(|regs| assert!(regs.writes().is_empty()));
    }

    #[test]
    fn test_handle_reports_outcome() {
        let entry = entry();
        assert_eq!(entry.handle(b"21,0").unwrap(), (21, Level::Low));
        assert!(entry.handle(b"22,0").unwrap_err().is_validation());
        assert!(entry.handle(b"abc").unwrap_err().is_validation());
    }

    #[test]
    fn test_write_truncates() {
        let entry = entry();
        let mut payload = b"7,1".to_vec();
        payload.resize(3000, b' ');
        assert_eq!(entry.write(&payload), MAX_USER_SIZE);
        entry
            .controller()
            .with_registers(|regs| assert_eq!(regs.writes_to(regs::GPSET0), vec![1 << 7]));

        // The command itself sits past the cut.
        let entry = self::entry();
        let mut payload = vec![b' '; MAX_USER_SIZE];
        payload.extend_from_slice(b"7,1");
        assert_eq!(entry.write(&payload), MAX_USER_SIZE);
        entry.controller().with_registers(|regs| assert!(regs.writes().is_empty()));
    }

    #[test]
    fn test_read_greeting_once() {
        let entry = entry();
        let mut session = ReadSession::new();
        let mut buf = [0u8; 64];

        assert_eq!(entry.read(&mut session, &mut buf), 7);
        assert_eq!(&buf[..7], b"Hello!\n");
        assert_eq!(entry.read(&mut session, &mut buf), 0);

        let mut fresh = ReadSession::new();
        assert_eq!(entry.read(&mut fresh, &mut buf), 7);
    }

    #[test]
    fn test_read_short_buffer() {
        let entry = entry();
        let mut session = ReadSession::new();
        let mut small = [0u8; 4];

        assert_eq!(entry.read(&mut session, &mut small), 0);
        assert_eq!(small, [0u8; 4]);

        let mut buf = [0u8; 7];
        assert_eq!(entry.read(&mut session, &mut buf), 7);
        assert_eq!(&buf, GREETING);
    }

    #[test]
    fn test_read_ignores_writes() {
        let entry = entry();
        entry.write(b"4,1");
        let mut buf = [0u8; 16];
        assert_eq!(entry.read(&mut ReadSession::new(), &mut buf), 7);
        assert_eq!(&buf[..7], GREETING);
    }
}
