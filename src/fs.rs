//! The filesystem engine: mount/format plus the nine core operations.
//!
//! Everything that was process-wide global state in the C source (the
//! inode table, directory table, bitmap, open-file table, and directory
//! iteration cursor) is bundled here into one handle, `Fs<D>`, passed by
//! `&mut self` to every operation.

use std::path::Path;

use crate::bitmap::Bitmap;
use crate::block_device::{BlockDevice, FileBlockDevice};
use crate::directory::{DirEntry, DirectoryTable};
use crate::error::{Error, Result, SlotKind};
use crate::indirect::IndirectBlock;
use crate::inode::{Inode, InodeTable};
use crate::layout::{
	BITMAP_BLOCK, BLOCK_SIZE, DATA_START, DIRECT_POINTERS, DIR_TABLE_START, INODE_TABLE_START,
	MAX_FILE_SIZE, MAX_NAME_LEN,
};
use crate::open_file::OpenFileTable;
use crate::superblock::Superblock;

pub use crate::open_file::FileId as Fd;

/// A mounted (or freshly formatted) Simple File System.
pub struct Fs<D: BlockDevice> {
	device: D,
	#[allow(dead_code)] // kept for parity with the on-disk layout; not consulted at runtime
	superblock: Superblock,
	inodes: InodeTable,
	directory: DirectoryTable,
	bitmap: Bitmap,
	open_files: OpenFileTable,
	dir_cursor: Option<usize>,
}

impl Fs<FileBlockDevice> {
	/// Formats a fresh device at `path`, initializing every on-disk structure.
	pub fn format(path: impl AsRef<Path>) -> Result<Self> {
		let device = FileBlockDevice::create_fresh(path, crate::layout::BLOCK_COUNT)?;
		Self::format_on(device)
	}

	/// Mounts an existing device at `path`, reading its on-disk structures.
	pub fn mount(path: impl AsRef<Path>) -> Result<Self> {
		let device = FileBlockDevice::open_existing(path)?;
		Self::mount_on(device)
	}
}

impl<D: BlockDevice> Fs<D> {
	/// Formats a fresh filesystem on an already-open device.
	pub fn format_on(mut device: D) -> Result<Self> {
		let superblock = Superblock::default_fresh();

		let mut bitmap = Bitmap::new_empty();
		bitmap.mark_used(crate::layout::SUPERBLOCK_BLOCK);
		for b in INODE_TABLE_START..DIR_TABLE_START {
			bitmap.mark_used(b);
		}
		for b in DIR_TABLE_START..DATA_START {
			bitmap.mark_used(b);
		}
		bitmap.mark_used(BITMAP_BLOCK);

		let mut inodes = InodeTable::new_empty();
		inodes.set(0, Inode::empty());

		let mut directory = DirectoryTable::new_empty();
		directory.set(
			0,
			DirEntry {
				name: "root".to_string(),
				inode: 0,
			},
		);

		superblock.flush(&mut device)?;
		inodes.flush(&mut device)?;
		directory.flush(&mut device)?;
		bitmap.flush(&mut device)?;

		Ok(Self {
			device,
			superblock,
			inodes,
			directory,
			bitmap,
			open_files: OpenFileTable::new_empty(),
			dir_cursor: None,
		})
	}

	/// Mounts an already-open device holding an existing filesystem.
	pub fn mount_on(mut device: D) -> Result<Self> {
		let superblock = Superblock::load(&mut device)?;
		let inodes = InodeTable::load(&mut device)?;
		let directory = DirectoryTable::load(&mut device)?;
		let bitmap = Bitmap::load(&mut device)?;
		Ok(Self {
			device,
			superblock,
			inodes,
			directory,
			bitmap,
			open_files: OpenFileTable::new_empty(),
			dir_cursor: None,
		})
	}

	/// Opens `name`, creating it if it does not exist.
	pub fn open(&mut self, name: &str) -> Result<Fd> {
		if name.len() > MAX_NAME_LEN {
			return Err(Error::NameTooLong(MAX_NAME_LEN));
		}

		if let Some((_, entry)) = self.directory.find(name) {
			let inode_idx = entry.inode;
			if let Some(fd) = self.open_files.find_open(inode_idx) {
				return Ok(fd);
			}
			let fd = self
				.open_files
				.first_free()
				.ok_or(Error::NoFreeSlot(SlotKind::OpenFile))?;
			let size = self.inodes.get(inode_idx).map(|i| i.size).unwrap_or(0);
			self.open_files.open(fd, inode_idx, size);
			return Ok(fd);
		}

		let inode_idx = self
			.inodes
			.first_free()
			.ok_or(Error::NoFreeSlot(SlotKind::Inode))?;
		let dir_idx = self
			.directory
			.first_free()
			.ok_or(Error::NoFreeSlot(SlotKind::DirectoryEntry))?;
		let fd = self
			.open_files
			.first_free()
			.ok_or(Error::NoFreeSlot(SlotKind::OpenFile))?;

		self.inodes.set(inode_idx, Inode::empty());
		self.directory.set(
			dir_idx,
			DirEntry {
				name: name.to_string(),
				inode: inode_idx,
			},
		);
		self.open_files.open(fd, inode_idx, 0);

		self.inodes.flush(&mut self.device)?;
		self.directory.flush(&mut self.device)?;

		Ok(fd)
	}

	/// Closes `fd`.
	pub fn close(&mut self, fd: Fd) -> Result<()> {
		if self.open_files.close(fd) {
			Ok(())
		} else {
			Err(Error::NotOpen)
		}
	}

	/// Repositions the cursor of `fd`. Not bounds-checked by design.
	pub fn seek(&mut self, fd: Fd, loc: u32) -> Result<()> {
		self.open_files
			.get_mut(fd)
			.ok_or(Error::NotOpen)?
			.cursor = loc;
		Ok(())
	}

	/// Returns the size of `name`.
	pub fn file_size(&self, name: &str) -> Result<u32> {
		let (_, entry) = self.directory.find(name).ok_or(Error::NotFound)?;
		Ok(self.inodes.get(entry.inode).map(|i| i.size).unwrap_or(0))
	}

	/// Advances the directory-iteration cursor and returns the next used
	/// filename, or `None` once exhausted. The cursor is not reset
	/// by exhaustion; call [`Fs::reset_listing`] to start over.
	pub fn next_filename(&mut self) -> Option<String> {
		let (idx, entry) = self.directory.next_after(self.dir_cursor)?;
		self.dir_cursor = Some(idx);
		Some(entry.name.clone())
	}

	/// Resets the sequential directory-listing cursor to before the first
	/// entry. Not part of the original nine operations, but a harmless and
	/// commonly-needed addition for callers that want to list twice.
	pub fn reset_listing(&mut self) {
		self.dir_cursor = None;
	}

	/// Writes `buf` at the current cursor of `fd`, growing the file as
	/// needed. Returns the number of bytes actually written, which may be
	/// less than `buf.len()` if the device runs out of free blocks, the
	/// write would cross `MAX_FILE_SIZE`, or `fd` is not open (in which
	/// case it is simply 0; unlike `read`, a bad descriptor is not an
	/// error here).
	pub fn write(&mut self, fd: Fd, buf: &[u8]) -> Result<usize> {
		let Some((inode_idx, mut cursor)) = self.open_files.get(fd).map(|e| (e.inode, e.cursor))
		else {
			return Ok(0);
		};

		let allowed = (MAX_FILE_SIZE - 1).saturating_sub(cursor);
		let length = buf.len().min(allowed as usize);
		if length == 0 {
			return Ok(0);
		}

		let mut file_size = self.inodes.get(inode_idx).map(|i| i.size).unwrap_or(0);
		let mut written = 0usize;
		let mut lb = (cursor / BLOCK_SIZE as u32) as usize;
		let mut first = true;

		loop {
			let bytes_remaining = length - written;
			if bytes_remaining == 0 {
				break;
			}
			let offset_in_block = if first { cursor as usize % BLOCK_SIZE } else { 0 };
			first = false;

			let (physical, is_new) = match self.resolve_for_write(inode_idx, lb) {
				Ok(r) => r,
				Err(Error::NoFreeBlock) => break,
				Err(e) => return Err(e),
			};

			let mut scratch = [0u8; BLOCK_SIZE];
			if !is_new {
				self.device.read_blocks(physical, 1, &mut scratch)?;
			}

			let window_len = (BLOCK_SIZE - offset_in_block).min(bytes_remaining);
			scratch[offset_in_block..offset_in_block + window_len]
				.copy_from_slice(&buf[written..written + window_len]);
			self.device.write_blocks(physical, 1, &scratch)?;

			written += window_len;
			cursor += window_len as u32;
			file_size = file_size.max(cursor);
			lb += 1;
		}

		if let Some(inode) = self.inodes.get_mut(inode_idx) {
			inode.size = file_size;
		}
		self.inodes.flush(&mut self.device)?;
		self.bitmap.flush(&mut self.device)?;

		self.open_files.get_mut(fd).unwrap().cursor = cursor;
		Ok(written)
	}

	/// Resolves the physical block for logical block `lb` of `inode_idx`,
	/// allocating a direct pointer, the indirect block, or an indirect
	/// entry as needed. The returned `bool` is `true` when the data block
	/// itself was freshly allocated by this call (so the caller need not
	/// read its stale contents before overwriting part of it).
	fn resolve_for_write(&mut self, inode_idx: u32, lb: usize) -> Result<(u32, bool)> {
		if lb < DIRECT_POINTERS {
			let inode = self.inodes.get_mut(inode_idx).expect("open inode vanished");
			if let Some(ptr) = inode.direct[lb] {
				return Ok((ptr, false));
			}
			let block = self.bitmap.allocate()?;
			self.inodes.get_mut(inode_idx).unwrap().direct[lb] = Some(block);
			return Ok((block, true));
		}

		let indirect_idx = lb - DIRECT_POINTERS;
		let inode = self.inodes.get_mut(inode_idx).expect("open inode vanished");
		let indirect_block_num = match inode.indirect {
			Some(b) => b,
			None => {
				let block = self.bitmap.allocate()?;
				self.inodes.get_mut(inode_idx).unwrap().indirect = Some(block);
				self.device
					.write_blocks(block, 1, &IndirectBlock::new_empty().to_bytes())?;
				block
			}
		};

		let mut buf = [0u8; BLOCK_SIZE];
		self.device.read_blocks(indirect_block_num, 1, &mut buf)?;
		let mut indirect = IndirectBlock::from_bytes(&buf);

		let (data_block, is_new) = match indirect.get(indirect_idx) {
			Some(b) => (b, false),
			None => {
				let block = self.bitmap.allocate()?;
				indirect.set(indirect_idx, block);
				self.device
					.write_blocks(indirect_block_num, 1, &indirect.to_bytes())?;
				(block, true)
			}
		};
		Ok((data_block, is_new))
	}

	/// Reads up to `buf.len()` bytes at the current cursor of `fd`.
	pub fn read(&mut self, fd: Fd, buf: &mut [u8]) -> Result<usize> {
		let (inode_idx, mut cursor) = {
			let entry = self.open_files.get(fd).ok_or(Error::NotOpen)?;
			(entry.inode, entry.cursor)
		};
		let file_size = self.inodes.get(inode_idx).map(|i| i.size).unwrap_or(0);

		let remaining_in_file = file_size.saturating_sub(cursor) as usize;
		let mut bytes_remaining = buf.len().min(remaining_in_file);
		if bytes_remaining == 0 {
			return Ok(0);
		}

		let mut lb = (cursor / BLOCK_SIZE as u32) as usize;
		let mut out_off = 0usize;
		let mut first = true;

		while bytes_remaining > 0 {
			let offset_in_block = if first { cursor as usize % BLOCK_SIZE } else { 0 };
			first = false;

			let physical = self.resolve_for_read(inode_idx, lb);
			let mut scratch = [0u8; BLOCK_SIZE];
			self.device.read_blocks(physical, 1, &mut scratch)?;

			let window_len = (BLOCK_SIZE - offset_in_block).min(bytes_remaining);
			buf[out_off..out_off + window_len]
				.copy_from_slice(&scratch[offset_in_block..offset_in_block + window_len]);

			out_off += window_len;
			cursor += window_len as u32;
			bytes_remaining -= window_len;
			lb += 1;
		}

		self.open_files.get_mut(fd).unwrap().cursor = cursor;
		Ok(out_off)
	}

	/// Resolves the physical block for logical block `lb` of `inode_idx`
	/// for reading. The filesystem's invariants guarantee this block is allocated
	/// whenever `lb` is within the file's current size.
	fn resolve_for_read(&mut self, inode_idx: u32, lb: usize) -> u32 {
		let inode = self.inodes.get(inode_idx).expect("open inode vanished");
		if lb < DIRECT_POINTERS {
			return inode.direct[lb].expect("direct pointer missing within file size");
		}
		let indirect_block_num = inode.indirect.expect("indirect block missing within file size");
		let mut buf = [0u8; BLOCK_SIZE];
		self.device
			.read_blocks(indirect_block_num, 1, &mut buf)
			.expect("reading indirect block");
		IndirectBlock::from_bytes(&buf)
			.get(lb - DIRECT_POINTERS)
			.expect("indirect entry missing within file size")
	}

	/// Removes `name` from the filesystem, freeing its inode and data
	/// blocks.
	pub fn remove(&mut self, name: &str) -> Result<()> {
		let (dir_idx, inode_idx) = {
			let (idx, entry) = self.directory.find(name).ok_or(Error::NotFound)?;
			(idx, entry.inode)
		};

		self.directory.free(dir_idx);
		self.directory.flush(&mut self.device)?;

		self.open_files.close_inode(inode_idx);

		let size = self.inodes.get(inode_idx).map(|i| i.size).unwrap_or(0);
		let inode = self.inodes.get(inode_idx).cloned();
		self.inodes.free(inode_idx);

		if size > 0 {
			if let Some(inode) = inode {
				let block_count = size.div_ceil(BLOCK_SIZE as u32) as usize;
				for lb in 0..block_count.min(DIRECT_POINTERS) {
					if let Some(ptr) = inode.direct[lb] {
						self.bitmap.free(ptr);
					}
				}
				if let Some(indirect_block_num) = inode.indirect {
					let mut buf = [0u8; BLOCK_SIZE];
					self.device.read_blocks(indirect_block_num, 1, &mut buf)?;
					let indirect = IndirectBlock::from_bytes(&buf);
					self.bitmap.free(indirect_block_num);
					for lb in DIRECT_POINTERS..block_count {
						if let Some(ptr) = indirect.get(lb - DIRECT_POINTERS) {
							self.bitmap.free(ptr);
						}
					}
				}
			}
			self.bitmap.flush(&mut self.device)?;
		}

		self.inodes.flush(&mut self.device)?;
		Ok(())
	}

	/// Total bitmap cells currently marked used. Exposed for the allocation
	/// accounting in tests.
	pub fn used_block_count(&self) -> usize {
		self.bitmap.used_count()
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::block_device::MemBlockDevice;
	use crate::layout::{BLOCK_COUNT, DIRECT_POINTERS, INDIRECT_ENTRIES};

	fn fresh() -> Fs<MemBlockDevice> {
		Fs::format_on(MemBlockDevice::new(BLOCK_COUNT)).unwrap()
	}

	#[test]
	fn write_then_read_round_trips_within_one_block() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		assert_eq!(fs.write(fd, b"hello").unwrap(), 5);
		fs.seek(fd, 0).unwrap();
		let mut buf = [0u8; 5];
		assert_eq!(fs.read(fd, &mut buf).unwrap(), 5);
		assert_eq!(&buf, b"hello");
		assert_eq!(fs.file_size("a").unwrap(), 5);
	}

	#[test]
	fn write_crossing_direct_block_boundary_preserves_both_halves() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		let payload = vec![7u8; BLOCK_SIZE + 1];
		assert_eq!(fs.write(fd, &payload).unwrap(), payload.len());
		fs.seek(fd, 0).unwrap();
		let mut buf = vec![0u8; payload.len()];
		assert_eq!(fs.read(fd, &mut buf).unwrap(), payload.len());
		assert_eq!(buf, payload);
	}

	#[test]
	fn write_crossing_into_indirect_block_round_trips() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		let len = DIRECT_POINTERS * BLOCK_SIZE + 17;
		let payload: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
		assert_eq!(fs.write(fd, &payload).unwrap(), payload.len());
		fs.seek(fd, 0).unwrap();
		let mut buf = vec![0u8; payload.len()];
		assert_eq!(fs.read(fd, &mut buf).unwrap(), payload.len());
		assert_eq!(buf, payload);
	}

	#[test]
	fn write_never_grows_file_past_max_size() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		let payload = vec![1u8; MAX_FILE_SIZE as usize + 100];
		let written = fs.write(fd, &payload).unwrap();
		assert_eq!(written, MAX_FILE_SIZE as usize - 1);
		assert_eq!(fs.file_size("a").unwrap(), MAX_FILE_SIZE - 1);
	}

	#[test]
	fn seek_then_write_overwrites_middle_without_truncating() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		fs.write(fd, b"0123456789").unwrap();
		fs.seek(fd, 2).unwrap();
		fs.write(fd, b"XY").unwrap();
		fs.seek(fd, 0).unwrap();
		let mut buf = [0u8; 10];
		fs.read(fd, &mut buf).unwrap();
		assert_eq!(&buf, b"01XY456789");
	}

	#[test]
	fn reopen_sets_cursor_to_current_size_for_append() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		fs.write(fd, b"abc").unwrap();
		fs.close(fd).unwrap();
		let fd2 = fs.open("a").unwrap();
		fs.write(fd2, b"def").unwrap();
		fs.seek(fd2, 0).unwrap();
		let mut buf = [0u8; 6];
		fs.read(fd2, &mut buf).unwrap();
		assert_eq!(&buf, b"abcdef");
	}

	#[test]
	fn open_file_table_exhaustion_and_recovery() {
		let mut fs = fresh();
		let mut fds = Vec::new();
		for i in 0..MAX_OPEN_FILES_FOR_TEST {
			fds.push(fs.open(&format!("f{i}")).unwrap());
		}
		assert!(matches!(
			fs.open("one-too-many"),
			Err(Error::NoFreeSlot(SlotKind::OpenFile))
		));
		fs.close(fds[0]).unwrap();
		assert!(fs.open("one-too-many").is_ok());
	}

	const MAX_OPEN_FILES_FOR_TEST: usize = crate::layout::MAX_OPEN_FILES;

	#[test]
	fn remove_frees_inode_and_data_blocks_for_reuse() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		fs.write(fd, &vec![1u8; DIRECT_POINTERS * BLOCK_SIZE + 1]).unwrap();
		let used_before = fs.used_block_count();
		fs.remove("a").unwrap();
		assert!(fs.used_block_count() < used_before);
		assert!(matches!(fs.open("a").map(|_| ()), Ok(())));
		assert!(fs.file_size("a").unwrap() == 0);
	}

	#[test]
	fn listing_visits_every_used_name_once_in_order() {
		let mut fs = fresh();
		fs.open("b").unwrap();
		fs.open("c").unwrap();
		let mut names = vec![fs.next_filename().unwrap()];
		while let Some(n) = fs.next_filename() {
			names.push(n);
		}
		assert_eq!(names, vec!["root", "b", "c"]);
		assert_eq!(fs.next_filename(), None);
	}

	#[test]
	fn operations_on_closed_descriptor_fail() {
		let mut fs = fresh();
		let fd = fs.open("a").unwrap();
		fs.close(fd).unwrap();
		assert!(matches!(fs.read(fd, &mut [0u8; 1]), Err(Error::NotOpen)));
		assert_eq!(fs.write(fd, b"x").unwrap(), 0);
		assert!(matches!(fs.seek(fd, 0), Err(Error::NotOpen)));
		assert!(matches!(fs.close(fd), Err(Error::NotOpen)));
	}

	#[test]
	fn indirect_entries_fit_exactly_within_max_file_size() {
		assert_eq!(
			MAX_FILE_SIZE as usize,
			(DIRECT_POINTERS + INDIRECT_ENTRIES) * BLOCK_SIZE
		);
	}
}
