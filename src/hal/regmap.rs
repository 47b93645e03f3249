//! Memory-mapped register block
//!
//! `MappedRegisters` maps one page of the GPIO peripheral from `/dev/mem`
//! (at the board's physical base) or `/dev/gpiomem` (at offset 0). Only one
//! mapping may be alive per process; dropping it unmaps the page.

use crate::error::{MapError, RegisterError};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, Ordering};

/// Size of the GPIO register block
pub const BLOCK_SIZE: usize = 4096;

/// Word-granular access to a register block.
///
/// Offsets are in bytes from the start of the block. Implementations reject
/// offsets that are not 4-byte aligned or fall outside the block.
pub trait RegisterBlock {
    /// Length of the block in bytes
    fn len(&self) -> usize;

    fn read(&self, offset: usize) -> Result<u32, RegisterError>;

    fn write(&mut self, offset: usize, value: u32) -> Result<(), RegisterError>;
}

/// Bounds and alignment check shared by every `RegisterBlock`
pub fn check_access(offset: usize, len: usize) -> Result<(), RegisterError> {
    if offset % 4 != 0 {
        return Err(RegisterError::Misaligned { offset });
    }
    match offset.checked_add(4) {
        Some(end) if end <= len => Ok(()),
        _ => Err(RegisterError::OutOfBounds { offset, len }),
    }
}

/// A block must be word-sized and cover the whole GPIO register page
pub fn check_block_length(len: usize) -> Result<(), MapError> {
    if len < BLOCK_SIZE || len % 4 != 0 {
        return Err(MapError::InvalidLength(len));
    }
    Ok(())
}

/// System page size
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        BLOCK_SIZE
    }
}

static MAPPED: AtomicBool = AtomicBool::new(false);

/// Process-wide claim on the hardware mapping, released on drop
#[derive(Debug)]
struct Claim;

impl Claim {
    fn acquire() -> Result<Self, MapError> {
        MAPPED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Claim)
            .map_err(|_| MapError::AlreadyMapped)
    }
}

impl Drop for Claim {
    fn drop(&mut self) {
        MAPPED.store(false, Ordering::Release);
    }
}

/// A live mapping of the GPIO register page
#[derive(Debug)]
pub struct MappedRegisters {
    base: NonNull<u32>,
    len: usize,
    offset: u64,
    _device: File,
    _claim: Claim,
}

// The mapping is plain device memory; exclusive access is provided by
// `&mut self` on writes and by the controller's lock.
unsafe impl Send for MappedRegisters {}

impl MappedRegisters {
    /// Map `len` bytes of `device` starting at `offset`
    pub fn map(device: &Path, offset: u64, len: usize) -> Result<Self, MapError> {
        check_block_length(len)?;
        let page_size = page_size();
        if offset % page_size as u64 != 0 {
            return Err(MapError::Unaligned { offset, page_size });
        }
        let file_offset = libc::off_t::try_from(offset).map_err(|_| MapError::OffsetRange(offset))?;

        let claim = Claim::acquire()?;

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .custom_flags(libc::O_SYNC)
            .open(device)
            .map_err(|source| MapError::Open {
                path: device.to_path_buf(),
                source,
            })?;

        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                file_offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(MapError::Mmap {
                offset,
                len,
                source: std::io::Error::last_os_error(),
            });
        }
        let base = NonNull::new(addr as *mut u32).ok_or_else(|| MapError::Mmap {
            offset,
            len,
            source: std::io::Error::from(std::io::ErrorKind::AddrNotAvailable),
        })?;

        info!(
            "Mapped {} bytes of GPIO registers at {:#x} via {}",
            len,
            offset,
            device.display()
        );

        Ok(Self {
            base,
            len,
            offset,
            _device: file,
            _claim: claim,
        })
    }

    /// Physical (or device) offset this block was mapped from
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Whether some `MappedRegisters` is currently alive in this process
    pub fn is_mapped() -> bool {
        MAPPED.load(Ordering::Acquire)
    }
}

impl RegisterBlock for MappedRegisters {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&self, offset: usize) -> Result<u32, RegisterError> {
        check_access(offset, self.len)?;
        Ok(unsafe { ptr::read_volatile(self.base.as_ptr().add(offset / 4)) })
    }

    fn write(&mut self, offset: usize, value: u32) -> Result<(), RegisterError> {
        check_access(offset, self.len)?;
        unsafe { ptr::write_volatile(self.base.as_ptr().add(offset / 4), value) };
        Ok(())
    }
}

impl Drop for MappedRegisters {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.base.as_ptr() as *mut libc::c_void, self.len);
        }
        debug!("Unmapped GPIO registers at {:#x}", self.offset);
    }
}
