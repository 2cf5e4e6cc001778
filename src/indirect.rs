//! Codec for the contents of a single indirect block.
//!
//! Unlike the inode table's own pointer fields (packed as `u16`), the
//! entries inside an indirect block are a full data block's worth of `u32`
//! pointers. `INDIRECT_ENTRIES = BLOCK_SIZE / 4` is fixed by that ratio, not
//! a free choice, since it is what makes the array exactly fill one block.

use crate::layout::{BLOCK_SIZE, INDIRECT_ENTRIES};

const FREE_PTR: u32 = u32::MAX;

/// The decoded contents of one indirect block: `INDIRECT_ENTRIES` optional
/// data-block pointers.
pub struct IndirectBlock {
	entries: [Option<u32>; INDIRECT_ENTRIES],
}

impl IndirectBlock {
	/// A freshly allocated indirect block with every entry unallocated.
	pub fn new_empty() -> Self {
		Self {
			entries: [None; INDIRECT_ENTRIES],
		}
	}

	/// Returns the data-block pointer stored at `idx`, if allocated.
	pub fn get(&self, idx: usize) -> Option<u32> {
		self.entries[idx]
	}

	/// Stores a data-block pointer at `idx`.
	pub fn set(&mut self, idx: usize, ptr: u32) {
		self.entries[idx] = Some(ptr);
	}

	/// Decodes an indirect block from a raw block-sized buffer.
	pub fn from_bytes(buf: &[u8; BLOCK_SIZE]) -> Self {
		let mut entries = [None; INDIRECT_ENTRIES];
		for (i, slot) in entries.iter_mut().enumerate() {
			let raw = u32::from_le_bytes(buf[i * 4..i * 4 + 4].try_into().unwrap());
			*slot = (raw != FREE_PTR).then_some(raw);
		}
		Self { entries }
	}

	/// Encodes the indirect block to a raw block-sized buffer.
	pub fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
		let mut buf = [0u8; BLOCK_SIZE];
		for (i, slot) in self.entries.iter().enumerate() {
			let raw = slot.unwrap_or(FREE_PTR);
			buf[i * 4..i * 4 + 4].copy_from_slice(&raw.to_le_bytes());
		}
		buf
	}
}
