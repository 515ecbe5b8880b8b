//! Free-block bitmap (FBM): one entry per block, tracking which blocks are
//! in use.
//!
//! Laid out the same way the directory/inode tables are: a fixed-size
//! in-memory array mirrored to a dedicated region on disk, with lowest-index
//! scans for allocation (see `array_arena::find_or_alloc` for the pattern
//! this borrows: scan for the first matching slot, flip it, return the
//! index).

use crate::device::BlockDevice;
use crate::error::{Error, Resource, Result};
use crate::geometry::RegionLayout;
use crate::layout::{STATE_FREE, STATE_TAKEN};

/// In-memory free-block bitmap, one `i8` state byte per block.
pub struct Fbm {
    table: Vec<i8>,
}

impl Fbm {
    /// Builds a bitmap with every block marked free.
    pub fn init(num_blocks: usize) -> Self {
        Self {
            table: vec![STATE_FREE; num_blocks],
        }
    }

    /// Reads the bitmap region from `dev`.
    pub fn load(dev: &mut impl BlockDevice, regions: &RegionLayout, num_blocks: usize) -> Result<Self> {
        let mut buf = vec![0u8; regions.fbm_num * dev.block_size()];
        dev.read(regions.fbm_idx, regions.fbm_num, &mut buf)?;
        let mut table: Vec<i8> = buf.iter().map(|&b| b as i8).collect();
        table.truncate(num_blocks);
        Ok(Self { table })
    }

    /// Writes the bitmap region back to `dev`.
    pub fn flush(&self, dev: &mut impl BlockDevice, regions: &RegionLayout) -> Result<()> {
        let mut buf = vec![0u8; regions.fbm_num * dev.block_size()];
        for (i, &state) in self.table.iter().enumerate() {
            buf[i] = state as u8;
        }
        dev.write(regions.fbm_idx, regions.fbm_num, &buf)
    }

    /// Marks `idx` as taken unconditionally, used while formatting to
    /// reserve the fixed regions up front.
    pub fn reserve(&mut self, idx: usize) -> Result<()> {
        let slot = self
            .table
            .get_mut(idx)
            .ok_or(Error::InvalidArgument("block index out of range"))?;
        *slot = STATE_TAKEN;
        Ok(())
    }

    /// Allocates a block, preferring `hint` if it is in range and free,
    /// otherwise the lowest-indexed free block. Returns
    /// [`Error::Exhausted`] if none is free. Flushes the bitmap to `dev` on
    /// success, matching the source's `block_allocate`.
    pub fn allocate(
        &mut self,
        hint: Option<usize>,
        dev: &mut impl BlockDevice,
        regions: &RegionLayout,
    ) -> Result<usize> {
        if let Some(idx) = hint {
            if idx < self.table.len() && self.table[idx] == STATE_FREE {
                self.table[idx] = STATE_TAKEN;
                self.flush(dev, regions)?;
                return Ok(idx);
            }
        }

        let idx = self
            .table
            .iter()
            .position(|&s| s == STATE_FREE)
            .ok_or(Error::Exhausted(Resource::Blocks))?;
        self.table[idx] = STATE_TAKEN;
        self.flush(dev, regions)?;
        Ok(idx)
    }

    /// Frees `idx` and flushes the bitmap. A block that is already free, or
    /// out of range, is left untouched and nothing is flushed, matching
    /// the source's tolerant deallocate.
    pub fn deallocate(&mut self, idx: usize, dev: &mut impl BlockDevice, regions: &RegionLayout) -> Result<()> {
        if let Some(slot) = self.table.get_mut(idx) {
            if *slot == STATE_TAKEN {
                *slot = STATE_FREE;
                self.flush(dev, regions)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBackedDevice;

    fn harness(num_blocks: usize) -> (FileBackedDevice, RegionLayout) {
        let path = std::env::temp_dir().join(format!(
            "ssfs-fbm-{}-{}",
            std::process::id(),
            rand_suffix()
        ));
        let block_size = num_blocks.max(1);
        let dev = FileBackedDevice::format(&path, block_size, num_blocks).unwrap();
        let regions = RegionLayout {
            sb_idx: 0,
            sb_num: 0,
            dir_idx: 0,
            dir_num: 0,
            inode_idx: 0,
            inode_num: 0,
            fbm_idx: 0,
            fbm_num: 1,
        };
        (dev, regions)
    }

    fn rand_suffix() -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn allocate_prefers_lowest_free_index() {
        let (mut dev, regions) = harness(8);
        let mut fbm = Fbm::init(8);
        assert_eq!(fbm.allocate(None, &mut dev, &regions).unwrap(), 0);
        assert_eq!(fbm.allocate(None, &mut dev, &regions).unwrap(), 1);
    }

    #[test]
    fn allocate_honours_free_hint() {
        let (mut dev, regions) = harness(8);
        let mut fbm = Fbm::init(8);
        assert_eq!(fbm.allocate(Some(5), &mut dev, &regions).unwrap(), 5);
        assert_eq!(fbm.allocate(None, &mut dev, &regions).unwrap(), 0);
    }

    #[test]
    fn allocate_falls_back_when_hint_taken() {
        let (mut dev, regions) = harness(2);
        let mut fbm = Fbm::init(2);
        fbm.allocate(Some(0), &mut dev, &regions).unwrap();
        assert_eq!(fbm.allocate(Some(0), &mut dev, &regions).unwrap(), 1);
    }

    #[test]
    fn allocate_fails_when_full() {
        let (mut dev, regions) = harness(1);
        let mut fbm = Fbm::init(1);
        fbm.allocate(None, &mut dev, &regions).unwrap();
        assert!(matches!(
            fbm.allocate(None, &mut dev, &regions),
            Err(Error::Exhausted(Resource::Blocks))
        ));
    }

    #[test]
    fn deallocate_then_reallocate_reuses_slot() {
        let (mut dev, regions) = harness(2);
        let mut fbm = Fbm::init(2);
        let a = fbm.allocate(None, &mut dev, &regions).unwrap();
        fbm.deallocate(a, &mut dev, &regions).unwrap();
        assert_eq!(fbm.allocate(None, &mut dev, &regions).unwrap(), a);
    }

    #[test]
    fn deallocate_out_of_range_is_a_no_op() {
        let (mut dev, regions) = harness(2);
        let mut fbm = Fbm::init(2);
        fbm.deallocate(99, &mut dev, &regions).unwrap();
    }
}
