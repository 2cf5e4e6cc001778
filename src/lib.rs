//! A single-user, flat-namespace filesystem persisted on a fixed-size
//! emulated block device: a block allocator/bitmap, an inode table with
//! direct and single-indirect addressing, a flat root directory, and an
//! open-file table.
//!
//! The entry point is [`Fs`], built with [`Fs::format`] (fresh device) or
//! [`Fs::mount`] (existing device), and generic over any [`BlockDevice`]
//! so it can run against a real file or an in-memory fake in tests.

mod bitmap;
mod block_device;
mod directory;
mod error;
mod fs;
mod indirect;
mod inode;
mod layout;
mod open_file;
mod superblock;

pub use block_device::{BlockDevice, FileBlockDevice};
pub use error::{Error, Result, SlotKind};
pub use fs::{Fd, Fs};
pub use layout::{DEFAULT_DISK_NAME, MAX_FILE_SIZE, MAX_NAME_LEN, MAX_OPEN_FILES};
