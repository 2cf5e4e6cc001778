//! The flat root directory table.

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::layout::{
	BLOCK_SIZE, DIR_ENTRY_COUNT, DIR_RECORD_SIZE, DIR_TABLE_BLOCKS, DIR_TABLE_START, MAX_NAME_LEN,
};

/// A single directory entry: a filename bound to an inode index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
	/// The filename, at most `MAX_NAME_LEN` bytes.
	pub name: String,
	/// The inode this entry refers to.
	pub inode: u32,
}

fn encode_name(name: &str) -> [u8; MAX_NAME_LEN + 1] {
	let mut buf = [0u8; MAX_NAME_LEN + 1];
	let bytes = name.as_bytes();
	buf[..bytes.len()].copy_from_slice(bytes);
	buf
}

fn decode_name(buf: &[u8]) -> String {
	let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
	String::from_utf8_lossy(&buf[..end]).into_owned()
}

impl DirEntry {
	fn encode(&self) -> [u8; DIR_RECORD_SIZE] {
		let mut buf = [0u8; DIR_RECORD_SIZE];
		buf[0] = 1;
		buf[1..1 + MAX_NAME_LEN + 1].copy_from_slice(&encode_name(&self.name));
		let off = 1 + MAX_NAME_LEN + 1;
		buf[off..off + 2].copy_from_slice(&(self.inode as u16).to_le_bytes());
		buf
	}

	fn encode_free() -> [u8; DIR_RECORD_SIZE] {
		[0u8; DIR_RECORD_SIZE]
	}

	fn decode(buf: &[u8]) -> Option<Self> {
		if buf[0] == 0 {
			return None;
		}
		let name = decode_name(&buf[1..1 + MAX_NAME_LEN + 1]);
		let off = 1 + MAX_NAME_LEN + 1;
		let inode = u16::from_le_bytes(buf[off..off + 2].try_into().unwrap()) as u32;
		Some(Self { name, inode })
	}
}

/// The flat root directory: `DIR_ENTRY_COUNT` slots, each either free or
/// holding a [`DirEntry`].
pub struct DirectoryTable {
	slots: Vec<Option<DirEntry>>,
}

impl DirectoryTable {
	/// Builds a table with every slot free.
	pub fn new_empty() -> Self {
		Self {
			slots: vec![None; DIR_ENTRY_COUNT],
		}
	}

	/// Occupies slot `idx`.
	pub fn set(&mut self, idx: usize, entry: DirEntry) {
		self.slots[idx] = Some(entry);
	}

	/// Frees slot `idx`.
	pub fn free(&mut self, idx: usize) {
		self.slots[idx] = None;
	}

	/// Finds the slot index and entry for `name`, if present.
	pub fn find(&self, name: &str) -> Option<(usize, &DirEntry)> {
		self.slots
			.iter()
			.enumerate()
			.find_map(|(i, slot)| slot.as_ref().filter(|e| e.name == name).map(|e| (i, e)))
	}

	/// Lowest-indexed free slot, if any.
	pub fn first_free(&self) -> Option<usize> {
		self.slots.iter().position(|s| s.is_none())
	}

	/// Returns the first used entry whose index is strictly greater than
	/// `after` (or the very first used entry, if `after` is `None`), along
	/// with its index. Used to implement the sequential directory-listing
	/// cursor without keeping the cursor logic inside this module.
	pub fn next_after(&self, after: Option<usize>) -> Option<(usize, &DirEntry)> {
		let start = after.map(|i| i + 1).unwrap_or(0);
		self.slots[start..]
			.iter()
			.enumerate()
			.find_map(|(i, slot)| slot.as_ref().map(|e| (start + i, e)))
	}

	fn to_bytes(&self) -> Vec<u8> {
		let mut buf = vec![0u8; DIR_TABLE_BLOCKS as usize * BLOCK_SIZE];
		for (i, slot) in self.slots.iter().enumerate() {
			let record = match slot {
				Some(entry) => entry.encode(),
				None => DirEntry::encode_free(),
			};
			let off = i * DIR_RECORD_SIZE;
			buf[off..off + DIR_RECORD_SIZE].copy_from_slice(&record);
		}
		buf
	}

	fn from_bytes(buf: &[u8]) -> Self {
		let mut slots = Vec::with_capacity(DIR_ENTRY_COUNT);
		for i in 0..DIR_ENTRY_COUNT {
			let off = i * DIR_RECORD_SIZE;
			slots.push(DirEntry::decode(&buf[off..off + DIR_RECORD_SIZE]));
		}
		Self { slots }
	}

	/// Reads the directory table from its fixed block range on `device`.
	pub fn load(device: &mut impl BlockDevice) -> Result<Self> {
		let mut buf = vec![0u8; DIR_TABLE_BLOCKS as usize * BLOCK_SIZE];
		device.read_blocks(DIR_TABLE_START, DIR_TABLE_BLOCKS, &mut buf)?;
		Ok(Self::from_bytes(&buf))
	}

	/// Flushes the directory table to its fixed block range on `device`.
	pub fn flush(&self, device: &mut impl BlockDevice) -> Result<()> {
		device.write_blocks(DIR_TABLE_START, DIR_TABLE_BLOCKS, &self.to_bytes())?;
		Ok(())
	}
}
