//! Volume geometry.
//!
//! The source wires block size, block count, and table sizes through
//! compile-time constants only. This crate keeps those constants as the
//! default (see [`crate::param`]) but expresses them as a `Geometry` value
//! that [`crate::volume::Volume::format`] accepts, so tests can exercise
//! smaller volumes without recompiling. A `Geometry` is validated once at
//! format time and is otherwise immutable for the life of the volume.

use crate::error::{Error, Result};
use crate::param;

/// Size, in blocks, of the four fixed regions for a given geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionLayout {
    pub sb_idx: usize,
    pub sb_num: usize,
    pub dir_idx: usize,
    pub dir_num: usize,
    pub inode_idx: usize,
    pub inode_num: usize,
    pub fbm_idx: usize,
    pub fbm_num: usize,
}

/// Compile/format-time geometry of a volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub block_size: usize,
    pub num_blocks: usize,
    pub max_files: usize,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            block_size: param::BLOCK_SIZE,
            num_blocks: param::NUM_BLOCKS,
            max_files: param::MAX_FILES,
        }
    }
}

impl Geometry {
    /// Validates that the directory and inode regions divide the block size
    /// exactly, as required by the Superblock invariant, and computes the
    /// region layout: `SB`, then `DIR`, then `INODE`, then `FBM`, in that
    /// order, contiguous and disjoint.
    pub fn regions(&self) -> Result<RegionLayout> {
        const DIR_ENTRY_SIZE: usize = 16;
        const INODE_ENTRY_SIZE: usize = 64;

        if self.block_size == 0 || self.num_blocks == 0 || self.max_files == 0 {
            return Err(Error::InvalidArgument("geometry fields must be non-zero"));
        }
        if self.num_blocks > self.block_size {
            return Err(Error::InvalidArgument(
                "num_blocks must fit in a one-block free-block bitmap",
            ));
        }
        if self.block_size % DIR_ENTRY_SIZE != 0 || self.block_size % INODE_ENTRY_SIZE != 0 {
            return Err(Error::InvalidArgument(
                "block size must divide directory and inode entry sizes exactly",
            ));
        }
        let dir_entries_per_block = self.block_size / DIR_ENTRY_SIZE;
        let inode_entries_per_block = self.block_size / INODE_ENTRY_SIZE;
        if self.max_files % dir_entries_per_block != 0 || self.max_files % inode_entries_per_block != 0
        {
            return Err(Error::InvalidArgument(
                "max_files must divide evenly into whole directory/inode blocks",
            ));
        }

        let sb_idx = 0;
        let sb_num = 1;
        let dir_idx = sb_idx + sb_num;
        let dir_num = self.max_files / dir_entries_per_block;
        let inode_idx = dir_idx + dir_num;
        let inode_num = self.max_files / inode_entries_per_block;
        let fbm_idx = inode_idx + inode_num;
        let fbm_num = 1;

        if fbm_idx + fbm_num > self.num_blocks {
            return Err(Error::InvalidArgument(
                "num_blocks too small to hold the fixed regions",
            ));
        }

        Ok(RegionLayout {
            sb_idx,
            sb_num,
            dir_idx,
            dir_num,
            inode_idx,
            inode_num,
            fbm_idx,
            fbm_num,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_geometry_matches_documented_layout() {
        let regions = Geometry::default().regions().unwrap();
        assert_eq!(regions.sb_idx, 0);
        assert_eq!(regions.dir_idx, 1);
        assert_eq!(regions.dir_num, 4);
        assert_eq!(regions.inode_idx, 5);
        assert_eq!(regions.inode_num, 16);
        assert_eq!(regions.fbm_idx, 21);
        assert_eq!(regions.fbm_num, 1);
    }

    #[test]
    fn rejects_max_files_that_does_not_divide_evenly() {
        let geo = Geometry {
            block_size: 1024,
            num_blocks: 1024,
            max_files: 3,
        };
        assert!(geo.regions().is_err());
    }
}
