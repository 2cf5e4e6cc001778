//! The superblock, stored in block 0.

use crate::block_device::BlockDevice;
use crate::error::{Error, Result};
use crate::layout::{BLOCK_COUNT, BLOCK_SIZE, INODE_COUNT, SUPERBLOCK_BLOCK};

const MAGIC: u32 = 0x5346_5321; // "SFS!"
const RECORD_SIZE: usize = 4 * 5;

/// The filesystem's superblock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
	pub magic: u32,
	pub block_size: u32,
	pub device_blocks: u32,
	pub inode_table_len: u32,
	pub root_inode: u32,
}

impl Superblock {
	/// The superblock written by a fresh format under the default layout.
	pub fn default_fresh() -> Self {
		Self {
			magic: MAGIC,
			block_size: BLOCK_SIZE as u32,
			device_blocks: BLOCK_COUNT,
			inode_table_len: INODE_COUNT as u32,
			root_inode: 0,
		}
	}

	fn encode(&self) -> [u8; RECORD_SIZE] {
		let mut buf = [0u8; RECORD_SIZE];
		buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
		buf[4..8].copy_from_slice(&self.block_size.to_le_bytes());
		buf[8..12].copy_from_slice(&self.device_blocks.to_le_bytes());
		buf[12..16].copy_from_slice(&self.inode_table_len.to_le_bytes());
		buf[16..20].copy_from_slice(&self.root_inode.to_le_bytes());
		buf
	}

	fn decode(buf: &[u8]) -> Result<Self> {
		let sb = Self {
			magic: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
			block_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
			device_blocks: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
			inode_table_len: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
			root_inode: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
		};
		if sb.magic != MAGIC {
			return Err(Error::IoFailure(std::io::Error::new(
				std::io::ErrorKind::InvalidData,
				"bad superblock magic: not an SFS device",
			)));
		}
		Ok(sb)
	}

	/// Reads the superblock from block 0 on `device`.
	pub fn load(device: &mut impl BlockDevice) -> Result<Self> {
		let mut buf = [0u8; BLOCK_SIZE];
		device.read_blocks(SUPERBLOCK_BLOCK, 1, &mut buf)?;
		Self::decode(&buf)
	}

	/// Flushes the superblock to block 0 on `device`.
	pub fn flush(&self, device: &mut impl BlockDevice) -> Result<()> {
		let mut buf = [0u8; BLOCK_SIZE];
		buf[..RECORD_SIZE].copy_from_slice(&self.encode());
		device.write_blocks(SUPERBLOCK_BLOCK, 1, &buf)?;
		Ok(())
	}
}
