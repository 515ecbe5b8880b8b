//! The file-system façade: mount/format plus the five user-facing
//! operations, tying together the superblock, FBM, directory, inode, and
//! open-file tables behind one handle.
//!
//! This replaces the source's process-wide globals (`sb`, `fbm_table`,
//! `dir_table`, `inode_table`, `file_entry_table`) with an explicit
//! `Volume<D>` owning all of them plus the block device, the same way
//! `fs::mod::FileSystem` in the teacher owns its superblock and device
//! rather than reaching for statics.

use crate::device::{BlockDevice, FileBackedDevice};
use crate::directory::Directory;
use crate::error::{Error, Result};
use crate::fbm::Fbm;
use crate::geometry::Geometry;
use crate::inode::InodeTable;
use crate::open_file::OpenFileTable;
use crate::param::{MAX_FILE_SIZE, MAX_OPEN_FILES, VOLUME_NAME};
use crate::superblock::Superblock;

/// Outcome of a write, before it is collapsed to the narrow `-1` surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    /// Bytes actually written.
    pub written: usize,
    /// Whether the write consumed the last byte of capacity, in which case
    /// the narrow `write` reports `-1` even though bytes were transferred.
    pub filled_to_capacity: bool,
}

/// A mounted volume: all in-memory tables plus the backing device.
pub struct Volume<D: BlockDevice> {
    dev: D,
    sb: Superblock,
    fbm: Fbm,
    dir: Directory,
    inodes: InodeTable,
    open_files: OpenFileTable,
}

impl Volume<FileBackedDevice> {
    /// Formats a fresh `goldfs` volume with `geometry` at `path` and mounts
    /// it.
    pub fn format(path: impl AsRef<std::path::Path>, geometry: Geometry) -> Result<Self> {
        let dev = FileBackedDevice::format(path, geometry.block_size, geometry.num_blocks)?;
        Self::format_on(dev, geometry)
    }

    /// Mounts an existing `goldfs` volume at `path`, discovering its
    /// geometry from the persisted superblock.
    pub fn mount(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut probe = FileBackedDevice::mount(path, std::mem::size_of::<crate::layout::RawSuperblock>(), 1)?;
        let probed_sb = Superblock::load(&mut probe)?;

        let dev = FileBackedDevice::mount(path, probed_sb.block_size, probed_sb.num_blocks)?;
        Self::mount_on(dev)
    }
}

impl<D: BlockDevice> Volume<D> {
    /// Formats a volume over an already-opened device.
    pub fn format_on(mut dev: D, geometry: Geometry) -> Result<Self> {
        let sb = Superblock::format(&mut dev, geometry)?;
        let mut fbm = Fbm::init(sb.num_blocks);
        let r = sb.regions;
        for i in r.sb_idx..r.sb_idx + r.sb_num {
            fbm.reserve(i)?;
        }
        for i in r.dir_idx..r.dir_idx + r.dir_num {
            fbm.reserve(i)?;
        }
        for i in r.inode_idx..r.inode_idx + r.inode_num {
            fbm.reserve(i)?;
        }
        for i in r.fbm_idx..r.fbm_idx + r.fbm_num {
            fbm.reserve(i)?;
        }

        let max_files = sb.max_files();
        let dir = Directory::init(max_files);
        let inodes = InodeTable::init(max_files);
        let open_files = OpenFileTable::init(MAX_OPEN_FILES);

        let mut vol = Self {
            dev,
            sb,
            fbm,
            dir,
            inodes,
            open_files,
        };
        vol.flush_persistent()?;
        Ok(vol)
    }

    /// Mounts an already-opened, previously formatted device.
    pub fn mount_on(mut dev: D) -> Result<Self> {
        let sb = Superblock::load(&mut dev)?;
        let max_files = sb.max_files();
        let fbm = Fbm::load(&mut dev, &sb.regions, sb.num_blocks)?;
        let dir = Directory::load(&mut dev, &sb.regions, max_files)?;
        let inodes = InodeTable::load(&mut dev, &sb.regions, max_files)?;
        let open_files = OpenFileTable::init(MAX_OPEN_FILES);
        log::info!("mounted volume '{}'", VOLUME_NAME);

        Ok(Self {
            dev,
            sb,
            fbm,
            dir,
            inodes,
            open_files,
        })
    }

    fn flush_persistent(&mut self) -> Result<()> {
        self.sb.flush(&mut self.dev)?;
        self.dir.flush(&mut self.dev, &self.sb.regions)?;
        self.inodes.flush(&mut self.dev, &self.sb.regions)?;
        self.fbm.flush(&mut self.dev, &self.sb.regions)?;
        Ok(())
    }

    // ---- open ----------------------------------------------------------

    /// Opens `name`, creating it if absent. Returns a typed `Result`; see
    /// [`Volume::open`] for the narrow `-1`-collapsing surface.
    pub fn open_typed(&mut self, name: &str) -> Result<usize> {
        if let Some(inode_idx) = self.dir.find(name) {
            if let Some(fd) = self.open_files.find_by_inode(inode_idx) {
                return Ok(fd);
            }
            let size = self.inodes.size(inode_idx)?;
            let fd = self.open_files.open(inode_idx, size)?;
            log::debug!("reopened '{}' as fd {}", name, fd);
            return Ok(fd);
        }

        let inode_idx = self.inodes.allocate()?;
        match self.open_create_rest(name, inode_idx) {
            Ok(fd) => {
                log::debug!("created '{}' as inode {}, fd {}", name, inode_idx, fd);
                Ok(fd)
            }
            Err(e) => {
                // Unwind the inode allocation above: the source leaks an
                // inode here when a later step fails (§9's "open-path
                // partial failure"). `ScopeGuard`'s closure form can't hold
                // `&mut self.inodes` across the later `&mut self.inodes`
                // calls it is meant to protect, so the guard is a plain
                // match on the combined steps instead.
                if let Err(release_err) = self.inodes.release(inode_idx) {
                    log::error!(
                        "rollback: failed to release inode {}: {}",
                        inode_idx,
                        release_err
                    );
                }
                Err(e)
            }
        }
    }

    /// The fallible remainder of the create path, isolated so its `?`s can
    /// be caught by [`Volume::open_typed`]'s rollback match.
    ///
    /// The open-file slot is reserved first, before the indirect block is
    /// allocated or the directory/inode tables are persisted. That way an
    /// "open-file table full" failure, which would otherwise be the one
    /// failure mode reachable only after the inode and directory entry are
    /// already flushed to disk, instead happens before any of that state
    /// exists, and the single rollback in `open_typed` (release the inode)
    /// is enough to undo everything.
    fn open_create_rest(&mut self, name: &str, inode_idx: usize) -> Result<usize> {
        let fd = self.open_files.open(inode_idx, 0)?;

        if let Err(e) = self.persist_new_file(name, inode_idx) {
            self.open_files.close(fd).ok();
            return Err(e);
        }
        Ok(fd)
    }

    /// Allocates the indirect block, binds it to the inode, adds the
    /// directory entry, and flushes both tables. On failure partway through,
    /// undoes the indirect block allocation so it is never left dangling in
    /// the FBM.
    fn persist_new_file(&mut self, name: &str, inode_idx: usize) -> Result<()> {
        let indirect =
            InodeTable::allocate_indirect_block(&mut self.fbm, &mut self.dev, &self.sb.regions)?;
        self.inodes.set_indirect_block(inode_idx, indirect)?;

        if let Err(e) = self.dir.add(name, inode_idx) {
            self.fbm.deallocate(indirect, &mut self.dev, &self.sb.regions)?;
            return Err(e);
        }
        self.inodes.flush(&mut self.dev, &self.sb.regions)?;
        self.dir.flush(&mut self.dev, &self.sb.regions)?;
        Ok(())
    }

    /// Opens `name`, creating it if absent. Returns `-1` on failure.
    pub fn open(&mut self, name: &str) -> i32 {
        match self.open_typed(name) {
            Ok(fd) => fd as i32,
            Err(e) => {
                log::warn!("open('{}') failed: {}", name, e);
                -1
            }
        }
    }

    // ---- close -----------------------------------------------------------

    pub fn close_typed(&mut self, fd: usize) -> Result<()> {
        self.open_files.close(fd)
    }

    pub fn close(&mut self, fd: i32) -> i32 {
        if fd < 0 {
            return -1;
        }
        match self.close_typed(fd as usize) {
            Ok(()) => 0,
            Err(e) => {
                log::warn!("close({}) failed: {}", fd, e);
                -1
            }
        }
    }

    // ---- seek --------------------------------------------------------

    pub fn seek_read_typed(&mut self, fd: usize, loc: usize) -> Result<()> {
        let inode_idx = self.open_files.inode_of(fd)?;
        let size = self.inodes.size(inode_idx)?;
        if loc > size {
            return Err(Error::InvalidArgument("seek past end of file"));
        }
        self.open_files.seek_read(fd, loc)
    }

    pub fn seek_read(&mut self, fd: i32, loc: i32) -> i32 {
        if fd < 0 || loc < 0 {
            return -1;
        }
        match self.seek_read_typed(fd as usize, loc as usize) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    }

    pub fn seek_write_typed(&mut self, fd: usize, loc: usize) -> Result<()> {
        let inode_idx = self.open_files.inode_of(fd)?;
        let size = self.inodes.size(inode_idx)?;
        if loc > size {
            return Err(Error::InvalidArgument("seek past end of file"));
        }
        self.open_files.seek_write(fd, loc)
    }

    pub fn seek_write(&mut self, fd: i32, loc: i32) -> i32 {
        if fd < 0 || loc < 0 {
            return -1;
        }
        match self.seek_write_typed(fd as usize, loc as usize) {
            Ok(()) => 0,
            Err(_) => -1,
        }
    }

    // ---- read --------------------------------------------------------

    pub fn read_typed(&mut self, fd: usize, buf: &mut [u8]) -> Result<usize> {
        let inode_idx = self.open_files.inode_of(fd)?;
        let read_cursor = self.open_files.read_cursor(fd)?;
        let size = self.inodes.size(inode_idx)?;

        let avail = size as isize - read_cursor as isize;
        if avail <= 0 {
            return Err(Error::InvalidArgument("nothing left to read"));
        }
        let length = buf.len().min(avail as usize);
        if length == 0 {
            return Err(Error::InvalidArgument("zero-length read"));
        }

        let block_size = self.dev.block_size();
        let list = self.inodes.block_list(inode_idx, &mut self.dev)?;
        let last_block = ((read_cursor + length) / block_size).min(list.len() - 1);

        let mut staging = vec![0u8; (last_block + 1) * block_size];
        for (i, slot) in list.iter().enumerate().take(last_block + 1) {
            let block = slot.ok_or(Error::Corrupt)?;
            self.dev
                .read(block, 1, &mut staging[i * block_size..(i + 1) * block_size])?;
        }

        buf[..length].copy_from_slice(&staging[read_cursor..read_cursor + length]);
        self.open_files.advance_read(fd, length)?;
        Ok(length)
    }

    pub fn read(&mut self, fd: i32, buf: &mut [u8]) -> i32 {
        if fd < 0 || buf.is_empty() {
            return -1;
        }
        match self.read_typed(fd as usize, buf) {
            Ok(n) => n as i32,
            Err(e) => {
                log::debug!("read(fd={}) failed: {}", fd, e);
                -1
            }
        }
    }

    // ---- write -------------------------------------------------------

    /// Full typed write, exposing the untruncated `(written, filled_to_capacity)`
    /// pair. See [`Volume::write`] for the narrow `-1`-collapsing surface.
    pub fn write_typed(&mut self, fd: usize, buf: &[u8]) -> Result<WriteOutcome> {
        let inode_idx = self.open_files.inode_of(fd)?;
        let write_cursor = self.open_files.write_cursor(fd)?;

        let avail = MAX_FILE_SIZE as isize - write_cursor as isize;
        if avail <= 0 {
            return Err(Error::InvalidArgument("file is already at capacity"));
        }
        let avail = avail as usize;
        let length = buf.len().min(avail);
        let filled_to_capacity = length == avail;

        let block_size = self.dev.block_size();
        let mut list = self.inodes.block_list(inode_idx, &mut self.dev)?;
        let last_block = ((write_cursor + length) / block_size).min(list.len() - 1);

        for slot in list.iter_mut().take(last_block + 1) {
            if slot.is_none() {
                let block = self.fbm.allocate(None, &mut self.dev, &self.sb.regions)?;
                *slot = Some(block);
                log::debug!("allocated data block {} for inode {}", block, inode_idx);
            }
        }
        self.inodes.set_block_list(inode_idx, &list, &mut self.dev)?;

        let size = self.inodes.size(inode_idx)?;
        let new_end = write_cursor + length;
        if new_end > size {
            self.inodes.set_size(inode_idx, new_end)?;
        }
        self.inodes.flush(&mut self.dev, &self.sb.regions)?;

        let mut staging = vec![0u8; (last_block + 1) * block_size];
        for (i, slot) in list.iter().enumerate().take(last_block + 1) {
            let block = slot.ok_or(Error::Corrupt)?;
            self.dev
                .read(block, 1, &mut staging[i * block_size..(i + 1) * block_size])?;
        }
        staging[write_cursor..write_cursor + length].copy_from_slice(&buf[..length]);
        for (i, slot) in list.iter().enumerate().take(last_block + 1) {
            let block = slot.ok_or(Error::Corrupt)?;
            self.dev
                .write(block, 1, &staging[i * block_size..(i + 1) * block_size])?;
        }

        self.open_files.advance_write(fd, length)?;
        Ok(WriteOutcome {
            written: length,
            filled_to_capacity,
        })
    }

    /// Writes `buf` at the current write cursor of `fd`. Returns the number
    /// of bytes written, or `-1` both on failure and when the write filled
    /// the file to capacity (see [`WriteOutcome`] for the untruncated view).
    pub fn write(&mut self, fd: i32, buf: &[u8]) -> i32 {
        if fd < 0 || buf.is_empty() {
            return -1;
        }
        match self.write_typed(fd as usize, buf) {
            Ok(outcome) if outcome.filled_to_capacity => -1,
            Ok(outcome) => outcome.written as i32,
            Err(e) => {
                log::debug!("write(fd={}) failed: {}", fd, e);
                -1
            }
        }
    }

    // ---- remove --------------------------------------------------------

    pub fn remove_typed(&mut self, name: &str) -> Result<()> {
        let inode_idx = self.dir.find(name).ok_or(Error::NotFound)?;

        self.open_files.close_all_for_inode(inode_idx);

        let list = self.inodes.block_list(inode_idx, &mut self.dev)?;
        for slot in list.iter() {
            if let Some(block) = slot {
                self.fbm.deallocate(*block, &mut self.dev, &self.sb.regions)?;
            }
        }
        let indirect = self.inodes.indirect_block(inode_idx)?;
        self.fbm.deallocate(indirect, &mut self.dev, &self.sb.regions)?;

        self.inodes.release(inode_idx)?;
        self.dir.remove(name)?;
        self.inodes.flush(&mut self.dev, &self.sb.regions)?;
        self.dir.flush(&mut self.dev, &self.sb.regions)?;
        log::debug!("removed '{}' (inode {})", name, inode_idx);
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> i32 {
        match self.remove_typed(name) {
            Ok(()) => 0,
            Err(e) => {
                log::warn!("remove('{}') failed: {}", name, e);
                -1
            }
        }
    }

    /// Releases the backing device. Only meaningful for device types that
    /// implement an explicit teardown; the generic path is a plain drop.
    pub fn into_device(self) -> D {
        self.dev
    }
}

impl Volume<FileBackedDevice> {
    /// Flushes and releases the backing file.
    pub fn unmount(self) -> Result<()> {
        self.dev.unmount()
    }
}
