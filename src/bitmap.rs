//! The free-block bitmap.
//!
//! One byte per block, `0` for free and `1` for used. This keeps the whole
//! bitmap exactly `BLOCK_COUNT` bytes, which is exactly one block under the
//! default parameters (`BLOCK_COUNT == BLOCK_SIZE == 1024`).

use crate::block_device::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::{BITMAP_BLOCK, BLOCK_COUNT, BLOCK_SIZE};

const _: () = assert!(BLOCK_COUNT as usize <= BLOCK_SIZE);

/// The in-memory free-block bitmap.
pub struct Bitmap {
	used: Vec<bool>,
}

impl Bitmap {
	/// Builds a bitmap with every cell free.
	pub fn new_empty() -> Self {
		Self {
			used: vec![false; BLOCK_COUNT as usize],
		}
	}

	/// Marks `block` as used unconditionally. Used during formatting to
	/// reserve the fixed metadata regions.
	pub fn mark_used(&mut self, block: u32) {
		self.used[block as usize] = true;
	}

	/// First-fit allocation: scans from index 0 for a free cell, marks it
	/// used, and returns its index.
	pub fn allocate(&mut self) -> Result<u32> {
		let idx = self
			.used
			.iter()
			.position(|&used| !used)
			.ok_or(Error::NoFreeBlock)?;
		self.used[idx] = true;
		Ok(idx as u32)
	}

	/// Frees a previously allocated block. Freeing an already-free block is
	/// a caller bug, not a reportable error (mirrors the C source, which
	/// never guards this either), checked with `debug_assert!` only.
	pub fn free(&mut self, block: u32) {
		debug_assert!(self.used[block as usize], "double free of block {block}");
		self.used[block as usize] = false;
	}

	/// Number of cells currently marked used. Exercised by the allocation
	/// accounting property in the spec's testable properties.
	pub fn used_count(&self) -> usize {
		self.used.iter().filter(|&&u| u).count()
	}

	/// Serializes the bitmap to a single block-sized buffer.
	pub fn to_bytes(&self) -> [u8; BLOCK_SIZE] {
		let mut buf = [0u8; BLOCK_SIZE];
		for (i, &used) in self.used.iter().enumerate() {
			buf[i] = used as u8;
		}
		buf
	}

	/// Deserializes a bitmap from a single block-sized buffer.
	pub fn from_bytes(buf: &[u8; BLOCK_SIZE]) -> Self {
		let used = buf[..BLOCK_COUNT as usize]
			.iter()
			.map(|&b| b != 0)
			.collect();
		Self { used }
	}

	/// Reads the bitmap from its fixed block on `device`.
	pub fn load(device: &mut impl BlockDevice) -> Result<Self> {
		let mut buf = [0u8; BLOCK_SIZE];
		device.read_blocks(BITMAP_BLOCK, 1, &mut buf)?;
		Ok(Self::from_bytes(&buf))
	}

	/// Flushes the bitmap to its fixed block on `device`.
	pub fn flush(&self, device: &mut impl BlockDevice) -> Result<()> {
		device.write_blocks(BITMAP_BLOCK, 1, &self.to_bytes())?;
		Ok(())
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn allocate_is_first_fit() {
		let mut bm = Bitmap::new_empty();
		bm.mark_used(0);
		bm.mark_used(1);
		assert_eq!(bm.allocate().unwrap(), 2);
		assert_eq!(bm.allocate().unwrap(), 3);
	}

	#[test]
	fn free_makes_cell_reusable() {
		let mut bm = Bitmap::new_empty();
		let a = bm.allocate().unwrap();
		let b = bm.allocate().unwrap();
		bm.free(a);
		assert_eq!(bm.allocate().unwrap(), a);
		assert_ne!(a, b);
	}

	#[test]
	fn exhaustion_is_reported() {
		let mut bm = Bitmap::new_empty();
		for _ in 0..BLOCK_COUNT {
			bm.allocate().unwrap();
		}
		assert!(matches!(bm.allocate(), Err(Error::NoFreeBlock)));
	}

	#[test]
	fn round_trips_through_bytes() {
		let mut bm = Bitmap::new_empty();
		bm.mark_used(0);
		bm.mark_used(BLOCK_COUNT - 1);
		let bytes = bm.to_bytes();
		let bm2 = Bitmap::from_bytes(&bytes);
		assert_eq!(bm2.used_count(), 2);
	}
}
