//! Error kinds returned by the filesystem API.

use std::fmt;

/// Which of the three fixed-size tables was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
	/// The inode table has no free entry.
	Inode,
	/// The directory table has no free entry.
	DirectoryEntry,
	/// The open-file table has no free descriptor.
	OpenFile,
}

impl fmt::Display for SlotKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			SlotKind::Inode => "inode table",
			SlotKind::DirectoryEntry => "directory table",
			SlotKind::OpenFile => "open-file table",
		};
		f.write_str(s)
	}
}

/// Errors returned by the filesystem API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The operation was issued on a descriptor that is not open.
	#[error("file descriptor is not open")]
	NotOpen,
	/// The filename exceeds `MAX_NAME_LEN` bytes.
	#[error("filename exceeds the maximum length of {0} bytes")]
	NameTooLong(usize),
	/// No directory entry matches the requested name.
	#[error("no such file")]
	NotFound,
	/// One of the fixed-size tables has no free slot.
	#[error("no free slot in the {0}")]
	NoFreeSlot(SlotKind),
	/// The bitmap has no free block left to allocate.
	#[error("no free block on the device")]
	NoFreeBlock,
	/// The underlying block device failed.
	#[error("block device I/O failure: {0}")]
	IoFailure(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
