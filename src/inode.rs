//! Inode table: per-file metadata plus the direct/indirect block pointers,
//! mirroring `inode_table` and the `inode_get_block_list`/
//! `inode_set_block_list` pair of the source.
//!
//! Block resolution follows the same two-level scheme `fs::inode::bmap`
//! uses: the first `DIRECT_POINTERS` blocks live inline in the inode, the
//! rest live in a single indirect block addressed by `indirect`. Unlike
//! `bmap`, which allocates lazily on demand, a fresh inode here has its
//! indirect block allocated eagerly at creation, so the whole list is always
//! present and `ArrayVec`-sized, simplifying every caller that walks it.

use arrayvec::ArrayVec;
use zerocopy::{AsBytes, FromBytes};

use crate::device::BlockDevice;
use crate::error::{Error, Resource, Result};
use crate::fbm::Fbm;
use crate::geometry::RegionLayout;
use crate::layout::{RawInode, INVALID, STATE_FREE, STATE_TAKEN};
use crate::param::{DIRECT_POINTERS, INDIRECT_ENTRIES, MAX_BLOCKS_PER_FILE};

/// A file's block list: `DIRECT_POINTERS` inline entries followed by
/// `INDIRECT_ENTRIES` entries from the indirect block. `None` means the
/// slot has no block allocated yet.
pub type BlockList = ArrayVec<Option<usize>, MAX_BLOCKS_PER_FILE>;

#[derive(Clone, Copy)]
struct Entry {
    taken: bool,
    size: usize,
    direct: [i32; DIRECT_POINTERS],
    indirect: i32,
}

impl Entry {
    const fn free() -> Self {
        Self {
            taken: false,
            size: 0,
            direct: [INVALID; DIRECT_POINTERS],
            indirect: INVALID as i32,
        }
    }
}

/// The fixed-size inode table.
pub struct InodeTable {
    entries: Vec<Entry>,
}

impl InodeTable {
    /// Builds an empty table sized for `max_files` inodes.
    pub fn init(max_files: usize) -> Self {
        Self {
            entries: vec![Entry::free(); max_files],
        }
    }

    /// Reads the inode region from `dev`.
    pub fn load(dev: &mut impl BlockDevice, regions: &RegionLayout, max_files: usize) -> Result<Self> {
        let mut buf = vec![0u8; regions.inode_num * dev.block_size()];
        dev.read(regions.inode_idx, regions.inode_num, &mut buf)?;

        let raw_size = std::mem::size_of::<RawInode>();
        let mut entries = Vec::with_capacity(max_files);
        for i in 0..max_files {
            let raw = RawInode::read_from_prefix(&buf[i * raw_size..]).ok_or(Error::Corrupt)?;
            entries.push(Entry {
                taken: raw.state == STATE_TAKEN as i16,
                size: raw.size as usize,
                direct: raw.direct,
                indirect: raw.indirect as i32,
            });
        }
        Ok(Self { entries })
    }

    /// Writes the inode region back to `dev`.
    pub fn flush(&self, dev: &mut impl BlockDevice, regions: &RegionLayout) -> Result<()> {
        let raw_size = std::mem::size_of::<RawInode>();
        let mut buf = vec![0u8; regions.inode_num * dev.block_size()];
        for (i, e) in self.entries.iter().enumerate() {
            let raw = RawInode {
                size: e.size as u32,
                direct: e.direct,
                indirect: e.indirect as i16,
                state: if e.taken { STATE_TAKEN } else { STATE_FREE } as i16,
            };
            buf[i * raw_size..(i + 1) * raw_size].copy_from_slice(raw.as_bytes());
        }
        dev.write(regions.inode_idx, regions.inode_num, &buf)
    }

    /// Allocates a free inode, zeroing its size and block pointers.
    pub fn allocate(&mut self) -> Result<usize> {
        let idx = self
            .entries
            .iter()
            .position(|e| !e.taken)
            .ok_or(Error::Exhausted(Resource::Inodes))?;
        self.entries[idx] = Entry {
            taken: true,
            ..Entry::free()
        };
        Ok(idx)
    }

    /// Releases inode `idx` back to the free pool. Does not touch the FBM;
    /// callers are responsible for freeing the data/indirect blocks first.
    pub fn release(&mut self, idx: usize) -> Result<()> {
        let entry = self.entries.get_mut(idx).ok_or(Error::NotFound)?;
        *entry = Entry::free();
        Ok(())
    }

    pub fn size(&self, idx: usize) -> Result<usize> {
        Ok(self.get(idx)?.size)
    }

    pub fn set_size(&mut self, idx: usize, size: usize) -> Result<()> {
        self.get_mut(idx)?.size = size;
        Ok(())
    }

    pub fn indirect_block(&self, idx: usize) -> Result<usize> {
        let entry = self.get(idx)?;
        if entry.indirect < 0 {
            return Err(Error::Corrupt);
        }
        Ok(entry.indirect as usize)
    }

    /// Assigns the indirect block for a freshly allocated inode.
    pub fn set_indirect_block(&mut self, idx: usize, block: usize) -> Result<()> {
        self.get_mut(idx)?.indirect = block as i32;
        Ok(())
    }

    fn get(&self, idx: usize) -> Result<&Entry> {
        self.entries.get(idx).filter(|e| e.taken).ok_or(Error::NotFound)
    }

    fn get_mut(&mut self, idx: usize) -> Result<&mut Entry> {
        self.entries
            .get_mut(idx)
            .filter(|e| e.taken)
            .ok_or(Error::NotFound)
    }

    /// Materialises the full block list for inode `idx`: `DIRECT_POINTERS`
    /// entries from the inode itself, followed by `INDIRECT_ENTRIES` read
    /// from its indirect block.
    pub fn block_list(&self, idx: usize, dev: &mut impl BlockDevice) -> Result<BlockList> {
        let entry = self.get(idx)?;
        let mut list = BlockList::new();
        for &p in entry.direct.iter() {
            list.push(if p == INVALID { None } else { Some(p as usize) });
        }

        let indirect_lba = entry.indirect;
        if indirect_lba < 0 {
            return Err(Error::Corrupt);
        }
        let mut buf = vec![0u8; dev.block_size()];
        dev.read(indirect_lba as usize, 1, &mut buf)?;
        for chunk in buf.chunks_exact(4).take(INDIRECT_ENTRIES) {
            let raw = i32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            list.push(if raw == INVALID { None } else { Some(raw as usize) });
        }
        Ok(list)
    }

    /// Persists `list` back into inode `idx`: the first `DIRECT_POINTERS`
    /// entries inline, the rest into the indirect block.
    pub fn set_block_list(
        &mut self,
        idx: usize,
        list: &BlockList,
        dev: &mut impl BlockDevice,
    ) -> Result<()> {
        let indirect_lba = self.get(idx)?.indirect;
        if indirect_lba < 0 {
            return Err(Error::Corrupt);
        }

        let entry = self.get_mut(idx)?;
        for (slot, value) in entry.direct.iter_mut().zip(list.iter().take(DIRECT_POINTERS)) {
            *slot = value.map_or(INVALID, |v| v as i32);
        }

        let mut buf = vec![0u8; dev.block_size()];
        for (i, value) in list.iter().skip(DIRECT_POINTERS).enumerate() {
            let raw = value.map_or(INVALID, |v| v as i32);
            buf[i * 4..(i + 1) * 4].copy_from_slice(&raw.to_ne_bytes());
        }
        dev.write(indirect_lba as usize, 1, &buf)
    }

    /// Allocates and zero-fills a fresh indirect block through `fbm`,
    /// returning its block number.
    pub fn allocate_indirect_block(
        fbm: &mut Fbm,
        dev: &mut impl BlockDevice,
        regions: &RegionLayout,
    ) -> Result<usize> {
        let block = fbm.allocate(None, dev, regions)?;
        let mut buf = vec![0u8; dev.block_size()];
        for chunk in buf.chunks_exact_mut(4) {
            chunk.copy_from_slice(&INVALID.to_ne_bytes());
        }
        dev.write(block, 1, &buf)?;
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBackedDevice;
    use crate::geometry::Geometry;
    use crate::superblock::Superblock;

    fn harness(max_files: usize) -> (FileBackedDevice, RegionLayout, Fbm) {
        let path = std::env::temp_dir().join(format!(
            "ssfs-inode-{}-{}",
            std::process::id(),
            rand_suffix()
        ));
        let geometry = Geometry {
            block_size: 1024,
            num_blocks: 64,
            max_files,
        };
        let mut dev = FileBackedDevice::format(&path, geometry.block_size, geometry.num_blocks).unwrap();
        let sb = Superblock::format(&mut dev, geometry).unwrap();
        let mut fbm = Fbm::init(sb.num_blocks);
        for i in 0..sb.regions.fbm_idx + sb.regions.fbm_num {
            fbm.reserve(i).unwrap();
        }
        (dev, sb.regions, fbm)
    }

    fn rand_suffix() -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn allocate_assigns_indirect_block_and_zero_fills_it() {
        let (mut dev, regions, mut fbm) = harness(16);
        let mut table = InodeTable::init(16);
        let idx = table.allocate().unwrap();
        let indirect = InodeTable::allocate_indirect_block(&mut fbm, &mut dev, &regions).unwrap();
        table.set_indirect_block(idx, indirect).unwrap();

        let list = table.block_list(idx, &mut dev).unwrap();
        assert_eq!(list.len(), MAX_BLOCKS_PER_FILE);
        assert!(list.iter().all(|b| b.is_none()));
    }

    #[test]
    fn set_block_list_round_trips_through_direct_and_indirect_regions() {
        let (mut dev, regions, mut fbm) = harness(16);
        let mut table = InodeTable::init(16);
        let idx = table.allocate().unwrap();
        let indirect = InodeTable::allocate_indirect_block(&mut fbm, &mut dev, &regions).unwrap();
        table.set_indirect_block(idx, indirect).unwrap();

        let mut list = table.block_list(idx, &mut dev).unwrap();
        list[0] = Some(40);
        list[DIRECT_POINTERS] = Some(41);
        table.set_block_list(idx, &list, &mut dev).unwrap();

        let reloaded = table.block_list(idx, &mut dev).unwrap();
        assert_eq!(reloaded[0], Some(40));
        assert_eq!(reloaded[DIRECT_POINTERS], Some(41));
        assert_eq!(reloaded[1], None);
    }

    #[test]
    fn release_then_allocate_reuses_the_slot() {
        let mut table = InodeTable::init(2);
        let a = table.allocate().unwrap();
        let b = table.allocate().unwrap();
        assert!(matches!(table.allocate(), Err(Error::Exhausted(Resource::Inodes))));

        table.release(a).unwrap();
        let c = table.allocate().unwrap();
        assert_eq!(a, c);
        let _ = b;
    }
}
