//! Error taxonomy for the file system core.
//!
//! Every fallible internal operation returns [`Result<T>`]. The POSIX-shaped
//! surface in [`crate::volume`] collapses this down to the documented `-1`
//! sentinel; callers that want the real reason use the `_typed` methods.

use std::io;

/// A table or region that has no more room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    /// The inode table has no free entry.
    Inodes,
    /// The directory table has no free entry.
    Directory,
    /// The open-file table has no free entry.
    OpenFiles,
    /// The free-block bitmap has no free block.
    Blocks,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Resource::Inodes => "inode table",
            Resource::Directory => "directory table",
            Resource::OpenFiles => "open-file table",
            Resource::Blocks => "free-block bitmap",
        };
        f.write_str(s)
    }
}

/// The error kinds a volume operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A supplied argument was out of range or otherwise nonsensical.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A name lookup found no matching directory entry.
    #[error("no such file")]
    NotFound,

    /// A fixed-size table or region has no room left.
    #[error("{0} is full")]
    Exhausted(Resource),

    /// The block device failed to transfer the requested number of blocks.
    #[error("device error: {0}")]
    Device(#[from] io::Error),

    /// The superblock's magic did not match on mount.
    #[error("volume is not formatted (bad magic)")]
    Corrupt,
}

/// Convenience alias for this crate's fallible operations.
pub type Result<T> = std::result::Result<T, Error>;
