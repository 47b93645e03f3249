//! BCM GPIO output control
//!
//! Drives pins through the function-select, set and clear registers.
//!
//! The free functions perform the raw register sequences and assume the
//! caller has exclusive access to the block. `GpioController` is the shared
//! entry point: it validates a command, then runs the whole sequence under
//! one lock so read-modify-writes on a shared GPFSEL word cannot interleave.

use super::pin::{function_select_field, global_bit_offset, regs, Level, Pin, FSEL_OUTPUT};
use super::regmap::RegisterBlock;
use crate::error::{RegisterError, Result};
use log::trace;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Put `pin` in output mode.
///
/// Clears the pin's 3-bit GPFSEL field, then ORs in the output encoding.
/// Both steps read and write the same word; the other nine fields in it are
/// carried through unchanged.
pub fn configure_as_output<R>(regs: &mut R, pin: Pin) -> std::result::Result<(), RegisterError>
where
    R: RegisterBlock + ?Sized,
{
    let field = function_select_field(pin);

    let word = regs.read(field.offset)?;
    regs.write(field.offset, field.clear(word))?;

    let word = regs.read(field.offset)?;
    regs.write(field.offset, field.set(word, FSEL_OUTPUT))?;

    trace!("{} function select at {:#04x} set to output", pin, field.offset);
    Ok(())
}

/// Drive `pin` high.
///
/// GPSET0 ignores zero bits, so a single-bit mask leaves other pins alone.
pub fn drive_high<R>(regs: &mut R, pin: Pin) -> std::result::Result<(), RegisterError>
where
    R: RegisterBlock + ?Sized,
{
    regs.write(regs::GPSET0, 1 << global_bit_offset(pin))
}

/// Drive `pin` low through GPCLR0
pub fn drive_low<R>(regs: &mut R, pin: Pin) -> std::result::Result<(), RegisterError>
where
    R: RegisterBlock + ?Sized,
{
    regs.write(regs::GPCLR0, 1 << global_bit_offset(pin))
}

/// Force output mode, then drive `pin` to `level`
pub fn apply<R>(regs: &mut R, pin: Pin, level: Level) -> std::result::Result<(), RegisterError>
where
    R: RegisterBlock + ?Sized,
{
    configure_as_output(regs, pin)?;
    match level {
        Level::High => drive_high(regs, pin),
        Level::Low => drive_low(regs, pin),
    }
}

/// GPIO driver state
///
/// Owns the register block for its whole lifetime; dropping the controller
/// drops (and for a hardware mapping, unmaps) the block.
#[derive(Debug)]
pub struct GpioController<R> {
    regs: Mutex<R>,
}

impl<R: RegisterBlock> GpioController<R> {
    pub fn new(regs: R) -> Self {
        Self {
            regs: Mutex::new(regs),
        }
    }

    /// Validate `pin` and `value`, then drive the pin.
    ///
    /// Nothing is read or written unless both are in range.
    pub fn apply_command(&self, pin: i64, value: i64) -> Result<Level> {
        let pin = Pin::new(pin)?;
        let level = Level::try_from(value)?;

        let mut regs = self.lock();
        apply(&mut *regs, pin, level)?;
        Ok(level)
    }

    /// Run `f` against the register block while holding the lock
    pub fn with_registers<T>(&self, f: impl FnOnce(&R) -> T) -> T {
        f(&*self.lock())
    }

    pub fn into_inner(self) -> R {
        self.regs.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, R> {
        // Register words stay consistent even if a holder panicked.
        self.regs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
