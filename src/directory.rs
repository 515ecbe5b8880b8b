//! Flat directory table: a fixed-size array of name-to-inode bindings, no
//! hierarchy, linear scan for lookups; mirrors the single flat `dir_table`
//! of the source.

use zerocopy::{AsBytes, FromBytes};

use crate::device::BlockDevice;
use crate::error::{Error, Resource, Result};
use crate::geometry::RegionLayout;
use crate::layout::{RawDirEntry, STATE_FREE, STATE_TAKEN};
use crate::param::MAX_NAME_LEN;

/// One directory slot: either free, or bound to a name and an inode number.
#[derive(Clone)]
struct Entry {
    taken: bool,
    name: [u8; MAX_NAME_LEN + 1],
    inode: i32,
}

impl Entry {
    const fn free() -> Self {
        Self {
            taken: false,
            name: [0; MAX_NAME_LEN + 1],
            inode: -1,
        }
    }
}

/// The flat, fixed-size directory table.
pub struct Directory {
    entries: Vec<Entry>,
}

fn encode_name(name: &str) -> Result<[u8; MAX_NAME_LEN + 1]> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(Error::InvalidArgument("file name length out of range"));
    }
    let mut buf = [0u8; MAX_NAME_LEN + 1];
    buf[..name.len()].copy_from_slice(name.as_bytes());
    Ok(buf)
}

fn decode_name(buf: &[u8; MAX_NAME_LEN + 1]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl Directory {
    /// Builds an empty directory sized for `max_files` entries.
    pub fn init(max_files: usize) -> Self {
        Self {
            entries: vec![Entry::free(); max_files],
        }
    }

    /// Reads the directory region from `dev`.
    pub fn load(dev: &mut impl BlockDevice, regions: &RegionLayout, max_files: usize) -> Result<Self> {
        let mut buf = vec![0u8; regions.dir_num * dev.block_size()];
        dev.read(regions.dir_idx, regions.dir_num, &mut buf)?;

        let raw_size = std::mem::size_of::<RawDirEntry>();
        let mut entries = Vec::with_capacity(max_files);
        for i in 0..max_files {
            let raw = RawDirEntry::read_from_prefix(&buf[i * raw_size..]).ok_or(Error::Corrupt)?;
            entries.push(Entry {
                taken: raw.state == STATE_TAKEN,
                name: raw.name,
                inode: raw.inode,
            });
        }
        Ok(Self { entries })
    }

    /// Writes the directory region back to `dev`.
    pub fn flush(&self, dev: &mut impl BlockDevice, regions: &RegionLayout) -> Result<()> {
        let raw_size = std::mem::size_of::<RawDirEntry>();
        let mut buf = vec![0u8; regions.dir_num * dev.block_size()];
        for (i, e) in self.entries.iter().enumerate() {
            let raw = RawDirEntry {
                name: e.name,
                state: if e.taken { STATE_TAKEN } else { STATE_FREE },
                inode: e.inode,
            };
            buf[i * raw_size..(i + 1) * raw_size].copy_from_slice(raw.as_bytes());
        }
        dev.write(regions.dir_idx, regions.dir_num, &buf)
    }

    /// Finds the inode bound to `name`, if any.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.taken && decode_name(&e.name) == name)
            .map(|idx| self.entries[idx].inode as usize)
    }

    /// Binds `name` to `inode`, taking the first free slot.
    pub fn add(&mut self, name: &str, inode: usize) -> Result<()> {
        let encoded = encode_name(name)?;
        let slot = self
            .entries
            .iter_mut()
            .find(|e| !e.taken)
            .ok_or(Error::Exhausted(Resource::Directory))?;
        slot.taken = true;
        slot.inode = inode as i32;
        slot.name = encoded;
        Ok(())
    }

    /// Unbinds `name`, returning the inode it was bound to.
    pub fn remove(&mut self, name: &str) -> Result<usize> {
        let slot = self
            .entries
            .iter_mut()
            .find(|e| e.taken && decode_name(&e.name) == name)
            .ok_or(Error::NotFound)?;
        let inode = slot.inode as usize;
        *slot = Entry::free();
        Ok(inode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_find_round_trips() {
        let mut dir = Directory::init(4);
        dir.add("a", 1).unwrap();
        dir.add("b", 2).unwrap();
        assert_eq!(dir.find("a"), Some(1));
        assert_eq!(dir.find("b"), Some(2));
        assert_eq!(dir.find("c"), None);
    }

    #[test]
    fn remove_frees_the_slot_for_reuse() {
        let mut dir = Directory::init(2);
        dir.add("a", 1).unwrap();
        dir.add("b", 2).unwrap();
        assert!(matches!(dir.add("c", 3), Err(Error::Exhausted(Resource::Directory))));

        dir.remove("a").unwrap();
        dir.add("c", 3).unwrap();
        assert_eq!(dir.find("c"), Some(3));
        assert_eq!(dir.find("a"), None);
    }

    #[test]
    fn rejects_name_too_long() {
        let mut dir = Directory::init(4);
        assert!(matches!(
            dir.add("this-name-is-too-long", 1),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn remove_missing_name_is_not_found() {
        let mut dir = Directory::init(4);
        assert!(matches!(dir.remove("nope"), Err(Error::NotFound)));
    }
}
