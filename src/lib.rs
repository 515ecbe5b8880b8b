//! `ssfs`: a simple single-volume file system over a block-addressable
//! virtual disk.
//!
//! A flat namespace of up to a fixed number of files, each a byte stream
//! backed by an inode with direct and single-indirect block pointers, all
//! persisted write-through to one backing file. No hierarchy, no
//! concurrency, no crash journal; see [`volume::Volume`] for the
//! operations and [`geometry::Geometry`] for the sizes that can vary.
//!
//! ```no_run
//! use ssfs::{Geometry, Volume};
//!
//! let mut vol = Volume::format("goldfs.img", Geometry::default()).unwrap();
//! let fd = vol.open("hello.txt");
//! vol.write(fd, b"hi there");
//! vol.close(fd);
//! ```

pub mod device;
pub mod directory;
pub mod error;
pub mod fbm;
pub mod geometry;
pub mod inode;
pub mod layout;
pub mod open_file;
pub mod param;
pub mod superblock;
pub mod volume;

pub use device::{BlockDevice, FileBackedDevice};
pub use error::{Error, Resource, Result};
pub use geometry::Geometry;
pub use volume::{Volume, WriteOutcome};
