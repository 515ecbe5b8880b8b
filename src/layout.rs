//! Byte-exact on-disk representations.
//!
//! These structs are read and written as raw bytes via `zerocopy`, the same
//! way the `ufs` on-disk inode is handled: `#[repr(C)]` plus
//! `AsBytes`/`FromBytes`, with a `const_assert_eq!` pinning the documented
//! size right next to the struct so a layout change trips a compile error
//! instead of a silent corruption.

use static_assertions::const_assert_eq;
use zerocopy::{AsBytes, FromBytes};

use crate::param::{DIRECT_POINTERS, MAX_NAME_LEN};

/// Sentinel used on disk for "no block"/"not in use" in `i32`/`i16` fields.
pub const INVALID: i32 = -1;

/// Entry state as persisted on disk: `0` means in use, `1` means free,
/// matching the source's `ENTRY_TAKEN`/`ENTRY_FREE` constants.
pub const STATE_TAKEN: i8 = 0;
pub const STATE_FREE: i8 = 1;

/// Superblock, as persisted in block 0.
///
/// Field order is `(sb, fbm, dir, inode)`, not the `(sb, dir, inode, fbm)`
/// order the regions actually occupy on disk (see [`crate::superblock`]);
/// that mismatch is inherited verbatim from the system this format
/// reproduces.
#[repr(C, packed)]
#[derive(Copy, Clone, Debug, AsBytes, FromBytes)]
pub struct RawSuperblock {
    pub magic: u32,
    pub blocks: u32,
    pub block_size: u32,
    pub sb_idx: i32,
    pub sb_num: i32,
    pub fbm_idx: i32,
    pub fbm_num: i32,
    pub dir_idx: i32,
    pub dir_num: i32,
    pub inode_idx: i32,
    pub inode_num: i32,
}

const_assert_eq!(std::mem::size_of::<RawSuperblock>(), 44);

/// Directory entry, as persisted in the directory region.
#[repr(C, packed)]
#[derive(Copy, Clone, AsBytes, FromBytes)]
pub struct RawDirEntry {
    pub name: [u8; MAX_NAME_LEN + 1],
    pub state: i8,
    pub inode: i32,
}

const_assert_eq!(std::mem::size_of::<RawDirEntry>(), 16);

/// Inode, as persisted in the inode region.
#[repr(C, packed)]
#[derive(Copy, Clone, AsBytes, FromBytes)]
pub struct RawInode {
    pub size: u32,
    pub direct: [i32; DIRECT_POINTERS],
    pub indirect: i16,
    pub state: i16,
}

const_assert_eq!(std::mem::size_of::<RawInode>(), 64);
