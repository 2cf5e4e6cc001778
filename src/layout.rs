//! Fixed on-disk layout constants.
//!
//! These are design constants, not runtime configuration: the fixed block
//! ranges and on-disk field widths below all depend on these exact values,
//! so changing them requires re-deriving the on-disk sizes (see the
//! `const_assert`-style checks at the bottom of this module).

/// Block size in bytes (`B`).
pub const BLOCK_SIZE: usize = 1024;
/// Total number of blocks on the device (`M`).
pub const BLOCK_COUNT: u32 = 1024;
/// Inode-table capacity (`N`).
pub const INODE_COUNT: usize = 114;
/// Directory-table capacity (`D`).
pub const DIR_ENTRY_COUNT: usize = 96;
/// Maximum simultaneously open files (`K`).
pub const MAX_OPEN_FILES: usize = 10;
/// Direct pointers per inode (`DP`).
pub const DIRECT_POINTERS: usize = 12;
/// Pointer entries in an indirect block (`IP_ENTRIES` = `B / 4`).
pub const INDIRECT_ENTRIES: usize = BLOCK_SIZE / 4;
/// Maximum file size in bytes (`F_MAX`).
pub const MAX_FILE_SIZE: u32 = (DIRECT_POINTERS * BLOCK_SIZE + INDIRECT_ENTRIES * BLOCK_SIZE) as u32;
/// Maximum filename length, not including the NUL terminator (`L_MAX`).
pub const MAX_NAME_LEN: usize = 15;

/// Block holding the superblock.
pub const SUPERBLOCK_BLOCK: u32 = 0;
/// First block of the inode table.
pub const INODE_TABLE_START: u32 = 1;
/// Number of blocks occupied by the inode table.
pub const INODE_TABLE_BLOCKS: u32 = 6;
/// First block of the directory table.
pub const DIR_TABLE_START: u32 = INODE_TABLE_START + INODE_TABLE_BLOCKS;
/// Number of blocks occupied by the directory table.
pub const DIR_TABLE_BLOCKS: u32 = 2;
/// First allocatable data block.
pub const DATA_START: u32 = DIR_TABLE_START + DIR_TABLE_BLOCKS;
/// Block holding the free bitmap (`M - 1`).
pub const BITMAP_BLOCK: u32 = BLOCK_COUNT - 1;

/// Number of bytes a single on-disk inode record occupies.
pub const INODE_RECORD_SIZE: usize = 4 + DIRECT_POINTERS * 2 + 2;
/// Number of bytes a single on-disk directory entry occupies.
pub const DIR_RECORD_SIZE: usize = 1 + (MAX_NAME_LEN + 1) + 2;

/// Default host-file name backing the emulated block device.
pub const DEFAULT_DISK_NAME: &str = "current_disk";

const _LAYOUT_CHECKS: () = {
	assert!(INODE_COUNT * INODE_RECORD_SIZE <= (INODE_TABLE_BLOCKS as usize) * BLOCK_SIZE);
	assert!(DIR_ENTRY_COUNT * DIR_RECORD_SIZE <= (DIR_TABLE_BLOCKS as usize) * BLOCK_SIZE);
	assert!(INDIRECT_ENTRIES * 4 == BLOCK_SIZE);
	assert!(BLOCK_COUNT as usize > INODE_COUNT);
};
