//! Block device: fixed-size block I/O over a backing file.
//!
//! This is the lowest layer the rest of the crate consumes. It knows nothing
//! about superblocks, inodes, or directories, only about transferring whole
//! blocks to and from a byte-addressed backing store. Every write is
//! write-through: `write` does not return until the bytes are flushed to the
//! backing file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// A block-addressable virtual disk.
///
/// Implementors transfer whole blocks of `block_size()` bytes at a given
/// logical block address (LBA). Out-of-range I/O must fail rather than
/// silently clip.
pub trait BlockDevice {
    /// Size of one block, in bytes.
    fn block_size(&self) -> usize;

    /// Total number of addressable blocks.
    fn num_blocks(&self) -> usize;

    /// Reads `n` contiguous blocks starting at `lba` into `buf`.
    ///
    /// `buf` must be exactly `n * block_size()` bytes long.
    fn read(&mut self, lba: usize, n: usize, buf: &mut [u8]) -> Result<()>;

    /// Writes `n` contiguous blocks starting at `lba` from `buf`.
    ///
    /// `buf` must be exactly `n * block_size()` bytes long. The write is
    /// flushed to the backing store before this returns.
    fn write(&mut self, lba: usize, n: usize, buf: &[u8]) -> Result<()>;
}

/// A [`BlockDevice`] backed by a single file on the host file system.
pub struct FileBackedDevice {
    file: File,
    block_size: usize,
    num_blocks: usize,
}

impl FileBackedDevice {
    /// Creates a fresh, zero-filled backing file of `block_size * num_blocks`
    /// bytes at `path`, truncating any existing file there.
    pub fn format(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(Error::Device)?;
        file.set_len((block_size * num_blocks) as u64)
            .map_err(Error::Device)?;
        log::debug!(
            "formatted backing file: {} blocks of {} bytes",
            num_blocks,
            block_size
        );
        Ok(Self {
            file,
            block_size,
            num_blocks,
        })
    }

    /// Opens an existing backing file at `path`, expected to already hold
    /// `block_size * num_blocks` bytes.
    pub fn mount(path: impl AsRef<Path>, block_size: usize, num_blocks: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(Error::Device)?;
        Ok(Self {
            file,
            block_size,
            num_blocks,
        })
    }

    fn check_range(&self, lba: usize, n: usize) -> Result<()> {
        if n == 0 || lba.checked_add(n).map_or(true, |end| end > self.num_blocks) {
            return Err(Error::InvalidArgument("block range out of bounds"));
        }
        Ok(())
    }

    /// Flushes buffered writes and releases the backing file.
    ///
    /// Since every [`BlockDevice::write`] is already write-through, this is
    /// a final defensive flush; dropping the device has the same effect.
    pub fn unmount(mut self) -> Result<()> {
        self.file.flush().map_err(Error::Device)
    }
}

impl BlockDevice for FileBackedDevice {
    fn block_size(&self) -> usize {
        self.block_size
    }

    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read(&mut self, lba: usize, n: usize, buf: &mut [u8]) -> Result<()> {
        self.check_range(lba, n)?;
        assert_eq!(buf.len(), n * self.block_size, "read: buffer size mismatch");

        self.file
            .seek(SeekFrom::Start((lba * self.block_size) as u64))
            .map_err(Error::Device)?;
        self.file.read_exact(buf).map_err(io_to_device_error)
    }

    fn write(&mut self, lba: usize, n: usize, buf: &[u8]) -> Result<()> {
        self.check_range(lba, n)?;
        assert_eq!(buf.len(), n * self.block_size, "write: buffer size mismatch");

        self.file
            .seek(SeekFrom::Start((lba * self.block_size) as u64))
            .map_err(Error::Device)?;
        self.file.write_all(buf).map_err(io_to_device_error)?;
        self.file.flush().map_err(Error::Device)
    }
}

/// An unexpected EOF while reading/writing a block range is reported as a
/// device transfer failure rather than bubbling up as a raw I/O kind.
fn io_to_device_error(e: io::Error) -> Error {
    Error::Device(e)
}
