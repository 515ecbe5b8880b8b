//! File system geometry.
//!
//! These are the compile-time defaults for a freshly formatted volume. They
//! match the numbers observed in the system this crate reimplements: a
//! 1024-block, 1024-byte-block volume with 256 files and 32 concurrently
//! open files.

/// Size of a block, in bytes.
pub const BLOCK_SIZE: usize = 1024;

/// Number of blocks in the volume.
pub const NUM_BLOCKS: usize = 1024;

/// Maximum number of files the directory/inode tables can hold.
pub const MAX_FILES: usize = 256;

/// Maximum number of simultaneously open files.
pub const MAX_OPEN_FILES: usize = 32;

/// Direct block pointers stored inline in an inode.
pub const DIRECT_POINTERS: usize = 14;

/// Width, in bytes, of one entry in an indirect block.
pub const INDIRECT_ENTRY_SIZE: usize = 4;

/// Number of block pointers that fit in a single indirect block.
pub const INDIRECT_ENTRIES: usize = BLOCK_SIZE / INDIRECT_ENTRY_SIZE;

/// Number of block pointers a file can have in total (direct + indirect).
pub const MAX_BLOCKS_PER_FILE: usize = DIRECT_POINTERS + INDIRECT_ENTRIES;

/// Largest byte length a file may reach.
pub const MAX_FILE_SIZE: usize = MAX_BLOCKS_PER_FILE * BLOCK_SIZE;

/// On-disk magic identifying a formatted volume.
pub const MAGIC: u32 = 0xDEAD_BEEF;

/// Significant bytes allowed in a file name (the on-disk field is one byte
/// longer to guarantee a NUL terminator).
pub const MAX_NAME_LEN: usize = 10;

/// Fixed backing-file name used by [`crate::volume::Volume::mount`].
pub const VOLUME_NAME: &str = "goldfs";

static_assertions::const_assert_eq!(INDIRECT_ENTRIES, 256);
static_assertions::const_assert_eq!(MAX_FILE_SIZE, 270 * 1024);
