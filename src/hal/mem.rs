//! In-memory register block
//!
//! Stands in for the hardware page in dry runs and tests. Writes are recorded
//! in order; a long-running block can bound the log with `with_log_limit`.

use super::regmap::{check_access, RegisterBlock, BLOCK_SIZE};
use crate::error::RegisterError;

#[derive(Debug, Clone)]
pub struct MemRegisters {
    words: Vec<u32>,
    writes: Vec<(usize, u32)>,
    log_limit: Option<usize>,
}

impl MemRegisters {
    /// A zeroed block of `len` bytes (rounded down to whole words)
    pub fn new(len: usize) -> Self {
        Self {
            words: vec![0; len / 4],
            writes: Vec::new(),
            log_limit: None,
        }
    }

    /// Keep only the most recent writes: at least `limit`, never `2 * limit` or more
    pub fn with_log_limit(mut self, limit: usize) -> Self {
        self.log_limit = Some(limit.max(1));
        self
    }

    /// A zeroed block the size of the GPIO page
    pub fn page() -> Self {
        Self::new(BLOCK_SIZE)
    }

    /// Set a word without recording it as a write
    pub fn seed(&mut self, offset: usize, value: u32) -> Result<(), RegisterError> {
        check_access(offset, self.len())?;
        self.words[offset / 4] = value;
        Ok(())
    }

    /// Current value of a word, `None` when out of range or misaligned
    pub fn peek(&self, offset: usize) -> Option<u32> {
        check_access(offset, self.len()).ok()?;
        Some(self.words[offset / 4])
    }

    pub fn words(&self) -> &[u32] {
        &self.words
    }

    /// `(offset, value)` for every write since creation or the last `clear_log`
    pub fn writes(&self) -> &[(usize, u32)] {
        &self.writes
    }

    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(o, _)| *o == offset)
            .map(|(_, v)| *v)
            .collect()
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
    }
}

impl Default for MemRegisters {
    fn default() -> Self {
        Self::page()
    }
}

impl RegisterBlock for MemRegisters {
    fn len(&self) -> usize {
        self.words.len() * 4
    }

    fn read(&self, offset: usize) -> Result<u32, RegisterError> {
        check_access(offset, self.len())?;
        Ok(self.words[offset / 4])
    }

    fn write(&mut self, offset: usize, value: u32) -> Result<(), RegisterError> {
        check_access(offset, self.len())?;
        self.words[offset / 4] = value;
        if let Some(limit) = self.log_limit {
            if self.writes.len() + 1 >= 2 * limit {
                self.writes.drain(..self.writes.len() + 1 - limit);
            }
        }
        self.writes.push((offset, value));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_writes_in_order() {
        let mut regs = MemRegisters::page();
        regs.write(0x1C, 1).unwrap();
        regs.write(0x28, 2).unwrap();
        regs.write(0x1C, 4).unwrap();

        assert_eq!(regs.writes(), &[(0x1C, 1), (0x28, 2), (0x1C, 4)]);
        assert_eq!(regs.writes_to(0x1C), vec![1, 4]);
        assert_eq!(regs.read(0x1C).unwrap(), 4);

        regs.clear_log();
        assert!(regs.writes().is_empty());
        assert_eq!(regs.peek(0x1C), Some(4));
    }

    #[test]
    fn test_log_limit_keeps_recent_writes() {
        let mut regs = MemRegisters::page().with_log_limit(4);
        for value in 0..100u32 {
            regs.write(0x1C, value).unwrap();
            assert!(regs.writes().len() < 8);
        }

        let kept = regs.writes_to(0x1C);
        assert!(kept.len() >= 4);
        assert_eq!(kept[kept.len() - 4..], [96, 97, 98, 99]);
        assert_eq!(regs.read(0x1C).unwrap(), 99);
    }

    #[test]
    fn test_seed_is_not_logged() {
        let mut regs = MemRegisters::new(16);
        regs.seed(8, 0xABCD).unwrap();
        assert!(regs.writes().is_empty());
        assert_eq!(regs.peek(8), Some(0xABCD));
        assert_eq!(regs.peek(16), None);
        assert_eq!(regs.seed(16, 0), Err(RegisterError::OutOfBounds { offset: 16, len: 16 }));
    }

    #[test]
    fn test_bounds_enforced() {
        let mut regs = MemRegisters::page();
        assert_eq!(
            regs.read(BLOCK_SIZE),
            Err(RegisterError::OutOfBounds { offset: BLOCK_SIZE, len: BLOCK_SIZE })
        );
        assert_eq!(regs.write(3, 1), Err(RegisterError::Misaligned { offset: 3 }));
        assert!(regs.writes().is_empty());
    }
}
