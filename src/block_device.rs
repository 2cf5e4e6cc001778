//! The block device: the filesystem's sole external collaborator.
//!
//! The engine in [`crate::fs`] only ever calls [`BlockDevice::read_blocks`]
//! and [`BlockDevice::write_blocks`]; it never touches a [`std::fs::File`]
//! directly. This mirrors the spec's framing of the device as an external
//! collaborator exposing exactly two operations, and lets the engine be
//! exercised in tests against an in-memory fake instead of a real file.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::layout::BLOCK_SIZE;

/// A fixed-block read/write interface over `count` consecutive blocks of
/// `BLOCK_SIZE` bytes each, starting at block `start`.
pub trait BlockDevice {
	/// Reads `count` consecutive blocks starting at `start` into `buf`.
	///
	/// `buf` must be exactly `count * BLOCK_SIZE` bytes.
	fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> io::Result<()>;

	/// Writes `count` consecutive blocks starting at `start` from `buf`.
	///
	/// `buf` must be exactly `count * BLOCK_SIZE` bytes.
	fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> io::Result<()>;
}

/// A block device backed by a plain host file, sized to hold exactly
/// `block_count` blocks of `BLOCK_SIZE` bytes.
pub struct FileBlockDevice {
	file: File,
}

impl FileBlockDevice {
	/// Creates a fresh, zero-filled device of `block_count` blocks at `path`,
	/// truncating any existing file.
	pub fn create_fresh(path: impl AsRef<Path>, block_count: u32) -> io::Result<Self> {
		let file = OpenOptions::new()
			.read(true)
			.write(true)
			.create(true)
			.truncate(true)
			.open(path)?;
		file.set_len(block_count as u64 * BLOCK_SIZE as u64)?;
		Ok(Self { file })
	}

	/// Opens an existing device at `path` without modifying its contents.
	pub fn open_existing(path: impl AsRef<Path>) -> io::Result<Self> {
		let file = OpenOptions::new().read(true).write(true).open(path)?;
		Ok(Self { file })
	}

	fn seek_to_block(&mut self, block: u32) -> io::Result<()> {
		self.file
			.seek(SeekFrom::Start(block as u64 * BLOCK_SIZE as u64))?;
		Ok(())
	}
}

impl BlockDevice for FileBlockDevice {
	fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> io::Result<()> {
		debug_assert_eq!(buf.len(), count as usize * BLOCK_SIZE);
		self.seek_to_block(start)?;
		self.file.read_exact(buf)
	}

	fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> io::Result<()> {
		debug_assert_eq!(buf.len(), count as usize * BLOCK_SIZE);
		self.seek_to_block(start)?;
		self.file.write_all(buf)?;
		self.file.flush()
	}
}

/// An in-memory device, useful for tests that want to exercise the engine
/// without touching the filesystem.
#[cfg(test)]
pub struct MemBlockDevice {
	blocks: Vec<u8>,
}

#[cfg(test)]
impl MemBlockDevice {
	pub fn new(block_count: u32) -> Self {
		Self {
			blocks: vec![0; block_count as usize * BLOCK_SIZE],
		}
	}
}

#[cfg(test)]
impl BlockDevice for MemBlockDevice {
	fn read_blocks(&mut self, start: u32, count: u32, buf: &mut [u8]) -> io::Result<()> {
		let off = start as usize * BLOCK_SIZE;
		let len = count as usize * BLOCK_SIZE;
		buf.copy_from_slice(&self.blocks[off..off + len]);
		Ok(())
	}

	fn write_blocks(&mut self, start: u32, count: u32, buf: &[u8]) -> io::Result<()> {
		let off = start as usize * BLOCK_SIZE;
		let len = count as usize * BLOCK_SIZE;
		self.blocks[off..off + len].copy_from_slice(buf);
		Ok(())
	}
}
