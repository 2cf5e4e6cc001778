//! The inode table.
//!
//! In memory, a free slot is `None` rather than the C source's
//! `file_size == -1` sentinel. On disk, the sentinel packing is still used,
//! since the fixed 6-block region has no room for a discriminant byte per
//! entry.

use crate::block_device::BlockDevice;
use crate::error::Result;
use crate::layout::{
	BLOCK_SIZE, DIRECT_POINTERS, INODE_COUNT, INODE_RECORD_SIZE, INODE_TABLE_BLOCKS,
	INODE_TABLE_START,
};

const FREE_SIZE: u32 = u32::MAX;
const FREE_PTR: u16 = u16::MAX;

/// A single file's metadata: its size and the blocks holding its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
	/// File size in bytes.
	pub size: u32,
	/// Direct block pointers; `None` means not yet allocated.
	pub direct: [Option<u32>; DIRECT_POINTERS],
	/// Indirect block pointer; `None` means not yet allocated.
	pub indirect: Option<u32>,
}

impl Inode {
	/// A brand-new, empty inode: size 0, no blocks allocated.
	pub fn empty() -> Self {
		Self {
			size: 0,
			direct: [None; DIRECT_POINTERS],
			indirect: None,
		}
	}

	fn encode(&self) -> [u8; INODE_RECORD_SIZE] {
		let mut buf = [0u8; INODE_RECORD_SIZE];
		buf[0..4].copy_from_slice(&self.size.to_le_bytes());
		let mut off = 4;
		for ptr in &self.direct {
			let raw = ptr.map(|p| p as u16).unwrap_or(FREE_PTR);
			buf[off..off + 2].copy_from_slice(&raw.to_le_bytes());
			off += 2;
		}
		let raw = self.indirect.map(|p| p as u16).unwrap_or(FREE_PTR);
		buf[off..off + 2].copy_from_slice(&raw.to_le_bytes());
		buf
	}

	fn decode(buf: &[u8]) -> Option<Self> {
		let size = u32::from_le_bytes(buf[0..4].try_into().unwrap());
		if size == FREE_SIZE {
			return None;
		}
		let mut direct = [None; DIRECT_POINTERS];
		let mut off = 4;
		for slot in &mut direct {
			let raw = u16::from_le_bytes(buf[off..off + 2].try_into().unwrap());
			*slot = (raw != FREE_PTR).then_some(raw as u32);
			off += 2;
		}
		let raw = u16::from_le_bytes(buf[off..off + 2].try_into().unwrap());
		let indirect = (raw != FREE_PTR).then_some(raw as u32);
		Some(Self {
			size,
			direct,
			indirect,
		})
	}

	fn encode_free() -> [u8; INODE_RECORD_SIZE] {
		let mut buf = [0u8; INODE_RECORD_SIZE];
		buf[0..4].copy_from_slice(&FREE_SIZE.to_le_bytes());
		buf
	}
}

/// The full inode table: `INODE_COUNT` slots, each either free or holding
/// an [`Inode`].
pub struct InodeTable {
	slots: Vec<Option<Inode>>,
}

impl InodeTable {
	/// Builds a table with every slot free.
	pub fn new_empty() -> Self {
		Self {
			slots: vec![None; INODE_COUNT],
		}
	}

	/// Returns a reference to the inode at `idx`, if occupied.
	pub fn get(&self, idx: u32) -> Option<&Inode> {
		self.slots[idx as usize].as_ref()
	}

	/// Returns a mutable reference to the inode at `idx`, if occupied.
	pub fn get_mut(&mut self, idx: u32) -> Option<&mut Inode> {
		self.slots[idx as usize].as_mut()
	}

	/// Occupies slot `idx` with `inode`, overwriting whatever was there.
	pub fn set(&mut self, idx: u32, inode: Inode) {
		self.slots[idx as usize] = Some(inode);
	}

	/// Frees slot `idx`.
	pub fn free(&mut self, idx: u32) {
		self.slots[idx as usize] = None;
	}

	/// Lowest-indexed free slot, if any.
	pub fn first_free(&self) -> Option<u32> {
		self.slots.iter().position(|s| s.is_none()).map(|i| i as u32)
	}

	fn to_bytes(&self) -> Vec<u8> {
		let mut buf = vec![0u8; INODE_TABLE_BLOCKS as usize * BLOCK_SIZE];
		for (i, slot) in self.slots.iter().enumerate() {
			let record = match slot {
				Some(inode) => inode.encode(),
				None => Inode::encode_free(),
			};
			let off = i * INODE_RECORD_SIZE;
			buf[off..off + INODE_RECORD_SIZE].copy_from_slice(&record);
		}
		buf
	}

	fn from_bytes(buf: &[u8]) -> Self {
		let mut slots = Vec::with_capacity(INODE_COUNT);
		for i in 0..INODE_COUNT {
			let off = i * INODE_RECORD_SIZE;
			slots.push(Inode::decode(&buf[off..off + INODE_RECORD_SIZE]));
		}
		Self { slots }
	}

	/// Reads the inode table from its fixed block range on `device`.
	pub fn load(device: &mut impl BlockDevice) -> Result<Self> {
		let mut buf = vec![0u8; INODE_TABLE_BLOCKS as usize * BLOCK_SIZE];
		device.read_blocks(INODE_TABLE_START, INODE_TABLE_BLOCKS, &mut buf)?;
		Ok(Self::from_bytes(&buf))
	}

	/// Flushes the inode table to its fixed block range on `device`.
	pub fn flush(&self, device: &mut impl BlockDevice) -> Result<()> {
		device.write_blocks(INODE_TABLE_START, INODE_TABLE_BLOCKS, &self.to_bytes())?;
		Ok(())
	}
}
