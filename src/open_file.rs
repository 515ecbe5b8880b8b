//! Open-file table: the fixed-size array of open descriptors, each holding
//! an inode binding and independent read/write cursors, mirroring
//! `file_entry_table`.
//!
//! This table is purely in-memory, unlike the directory/inode/FBM regions;
//! nothing here is persisted, so a remount always starts with every
//! descriptor closed, matching the source's behaviour of rebuilding
//! `file_entry_table` fresh on every `mkssfs` call.

use crate::error::{Error, Resource, Result};

#[derive(Clone, Copy)]
struct Entry {
    taken: bool,
    inode: usize,
    read_cursor: usize,
    write_cursor: usize,
}

impl Entry {
    const fn free() -> Self {
        Self {
            taken: false,
            inode: 0,
            read_cursor: 0,
            write_cursor: 0,
        }
    }
}

/// The fixed-size, session-local open-file table.
pub struct OpenFileTable {
    entries: Vec<Entry>,
}

impl OpenFileTable {
    /// Builds an empty table sized for `max_open`.
    pub fn init(max_open: usize) -> Self {
        Self {
            entries: vec![Entry::free(); max_open],
        }
    }

    /// Returns the descriptor already bound to `inode`, if any.
    pub fn find_by_inode(&self, inode: usize) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.taken && e.inode == inode)
    }

    /// Opens a fresh descriptor bound to `inode`, with both cursors at
    /// `write_cursor` (`0` for a newly created file, the file's current
    /// size when reopening an existing one).
    pub fn open(&mut self, inode: usize, write_cursor: usize) -> Result<usize> {
        let idx = self
            .entries
            .iter()
            .position(|e| !e.taken)
            .ok_or(Error::Exhausted(Resource::OpenFiles))?;
        self.entries[idx] = Entry {
            taken: true,
            inode,
            read_cursor: 0,
            write_cursor,
        };
        Ok(idx)
    }

    /// Closes descriptor `fd`.
    pub fn close(&mut self, fd: usize) -> Result<()> {
        let entry = self.get_mut(fd)?;
        *entry = Entry::free();
        Ok(())
    }

    pub fn inode_of(&self, fd: usize) -> Result<usize> {
        Ok(self.get(fd)?.inode)
    }

    pub fn read_cursor(&self, fd: usize) -> Result<usize> {
        Ok(self.get(fd)?.read_cursor)
    }

    pub fn write_cursor(&self, fd: usize) -> Result<usize> {
        Ok(self.get(fd)?.write_cursor)
    }

    pub fn seek_read(&mut self, fd: usize, pos: usize) -> Result<()> {
        self.get_mut(fd)?.read_cursor = pos;
        Ok(())
    }

    pub fn seek_write(&mut self, fd: usize, pos: usize) -> Result<()> {
        self.get_mut(fd)?.write_cursor = pos;
        Ok(())
    }

    pub fn advance_read(&mut self, fd: usize, n: usize) -> Result<()> {
        self.get_mut(fd)?.read_cursor += n;
        Ok(())
    }

    pub fn advance_write(&mut self, fd: usize, n: usize) -> Result<()> {
        self.get_mut(fd)?.write_cursor += n;
        Ok(())
    }

    /// Closes every descriptor bound to `inode`. Used by `remove` to force
    /// close any lingering handles on the file being deleted.
    pub fn close_all_for_inode(&mut self, inode: usize) {
        for e in self.entries.iter_mut() {
            if e.taken && e.inode == inode {
                *e = Entry::free();
            }
        }
    }

    fn get(&self, fd: usize) -> Result<&Entry> {
        self.entries.get(fd).filter(|e| e.taken).ok_or(Error::InvalidArgument(
            "file descriptor is not open",
        ))
    }

    fn get_mut(&mut self, fd: usize) -> Result<&mut Entry> {
        self.entries
            .get_mut(fd)
            .filter(|e| e.taken)
            .ok_or(Error::InvalidArgument("file descriptor is not open"))
    }
}
