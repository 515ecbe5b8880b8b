//! In-memory superblock: the single source of truth for where each region
//! lives on disk.
//!
//! Mirrors `fs::superblock::Superblock` in spirit: a small struct hydrated
//! once at mount time from block 0, kept resident for the life of the
//! volume, and flushed back on format (it never changes after that, so
//! `mount` never needs to write it).

use zerocopy::{AsBytes, FromBytes};

use crate::device::BlockDevice;
use crate::error::{Error, Result};
use crate::geometry::{Geometry, RegionLayout};
use crate::layout::RawSuperblock;
use crate::param::MAGIC;

/// Region boundaries and geometry of a mounted volume.
#[derive(Debug, Clone, Copy)]
pub struct Superblock {
    pub block_size: usize,
    pub num_blocks: usize,
    pub regions: RegionLayout,
}

impl Superblock {
    /// Builds a superblock for a freshly chosen geometry and writes it to
    /// block 0 of `dev`.
    pub fn format(dev: &mut impl BlockDevice, geometry: Geometry) -> Result<Self> {
        if geometry.block_size != dev.block_size() || geometry.num_blocks != dev.num_blocks() {
            return Err(Error::InvalidArgument(
                "geometry does not match backing device dimensions",
            ));
        }
        let regions = geometry.regions()?;
        let sb = Self {
            block_size: geometry.block_size,
            num_blocks: geometry.num_blocks,
            regions,
        };
        sb.flush(dev)?;
        log::info!(
            "volume formatted: {} blocks x {} bytes, {} dir blocks, {} inode blocks",
            sb.num_blocks,
            sb.block_size,
            regions.dir_num,
            regions.inode_num
        );
        Ok(sb)
    }

    /// Reads and validates the superblock from block 0 of `dev`.
    pub fn load(dev: &mut impl BlockDevice) -> Result<Self> {
        let mut buf = vec![0u8; dev.block_size()];
        dev.read(0, 1, &mut buf)?;
        let raw = RawSuperblock::read_from_prefix(&buf).ok_or(Error::Corrupt)?;
        if raw.magic != MAGIC {
            return Err(Error::Corrupt);
        }
        let regions = RegionLayout {
            sb_idx: raw.sb_idx as usize,
            sb_num: raw.sb_num as usize,
            dir_idx: raw.dir_idx as usize,
            dir_num: raw.dir_num as usize,
            inode_idx: raw.inode_idx as usize,
            inode_num: raw.inode_num as usize,
            fbm_idx: raw.fbm_idx as usize,
            fbm_num: raw.fbm_num as usize,
        };
        Ok(Self {
            block_size: raw.block_size as usize,
            num_blocks: raw.blocks as usize,
            regions,
        })
    }

    /// Serializes this superblock to block 0 of `dev`.
    pub fn flush(&self, dev: &mut impl BlockDevice) -> Result<()> {
        let r = self.regions;
        let raw = RawSuperblock {
            magic: MAGIC,
            blocks: self.num_blocks as u32,
            block_size: self.block_size as u32,
            sb_idx: r.sb_idx as i32,
            sb_num: r.sb_num as i32,
            fbm_idx: r.fbm_idx as i32,
            fbm_num: r.fbm_num as i32,
            dir_idx: r.dir_idx as i32,
            dir_num: r.dir_num as i32,
            inode_idx: r.inode_idx as i32,
            inode_num: r.inode_num as i32,
        };
        let mut buf = vec![0u8; self.block_size];
        buf[..std::mem::size_of::<RawSuperblock>()].copy_from_slice(raw.as_bytes());
        dev.write(0, 1, &buf)
    }

    /// Number of files the directory/inode tables were sized for.
    pub fn max_files(&self) -> usize {
        let per_block = self.block_size / std::mem::size_of::<crate::layout::RawDirEntry>();
        self.regions.dir_num * per_block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::FileBackedDevice;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("ssfs-superblock-{}-{}", std::process::id(), name))
    }

    #[test]
    fn format_then_load_round_trips() {
        let path = temp_path("roundtrip");
        let mut dev = FileBackedDevice::format(&path, 1024, 1024).unwrap();
        let formatted = Superblock::format(&mut dev, Geometry::default()).unwrap();

        let mut remounted = FileBackedDevice::mount(&path, 1024, 1024).unwrap();
        let loaded = Superblock::load(&mut remounted).unwrap();

        assert_eq!(loaded.block_size, formatted.block_size);
        assert_eq!(loaded.num_blocks, formatted.num_blocks);
        assert_eq!(loaded.regions.dir_idx, formatted.regions.dir_idx);
        assert_eq!(loaded.regions.inode_idx, formatted.regions.inode_idx);
        assert_eq!(loaded.regions.fbm_idx, formatted.regions.fbm_idx);
        assert_eq!(loaded.max_files(), 256);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn load_rejects_bad_magic() {
        let path = temp_path("badmagic");
        let mut dev = FileBackedDevice::format(&path, 1024, 1024).unwrap();
        dev.write(0, 1, &[0u8; 1024]).unwrap();

        let mut remounted = FileBackedDevice::mount(&path, 1024, 1024).unwrap();
        assert!(matches!(Superblock::load(&mut remounted), Err(Error::Corrupt)));

        std::fs::remove_file(&path).ok();
    }
}
