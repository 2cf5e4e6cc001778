//! End-to-end scenarios against a real host file, exercising persistence
//! across a format/mount cycle the way a caller actually uses this crate.

use sfs::{Error, Fs, MAX_FILE_SIZE, MAX_OPEN_FILES};

fn disk_path(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
	dir.path().join(name)
}

#[test]
fn ten_byte_write_survives_a_remount() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk0");

	{
		let mut fs = Fs::format(&path).unwrap();
		let fd = fs.open("greeting").unwrap();
		assert_eq!(fs.write(fd, b"0123456789").unwrap(), 10);
		fs.close(fd).unwrap();
	}

	let mut fs = Fs::mount(&path).unwrap();
	assert_eq!(fs.file_size("greeting").unwrap(), 10);
	let fd = fs.open("greeting").unwrap();
	fs.seek(fd, 0).unwrap();
	let mut buf = [0u8; 10];
	assert_eq!(fs.read(fd, &mut buf).unwrap(), 10);
	assert_eq!(&buf, b"0123456789");
}

#[test]
fn write_one_byte_past_a_direct_block_boundary() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk1");
	let mut fs = Fs::format(&path).unwrap();
	let fd = fs.open("spanning").unwrap();

	let payload = vec![0xABu8; 1025];
	assert_eq!(fs.write(fd, &payload).unwrap(), 1025);

	fs.seek(fd, 0).unwrap();
	let mut buf = vec![0u8; 1025];
	assert_eq!(fs.read(fd, &mut buf).unwrap(), 1025);
	assert_eq!(buf, payload);
}

#[test]
fn write_crossing_the_direct_to_indirect_boundary() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk2");
	let mut fs = Fs::format(&path).unwrap();
	let fd = fs.open("big").unwrap();

	// 12 direct blocks worth, plus a little into the indirect range.
	let payload: Vec<u8> = (0..12289).map(|i| (i % 256) as u8).collect();
	assert_eq!(fs.write(fd, &payload).unwrap(), payload.len());
	assert_eq!(fs.file_size("big").unwrap() as usize, payload.len());

	fs.seek(fd, 0).unwrap();
	let mut buf = vec![0u8; payload.len()];
	assert_eq!(fs.read(fd, &mut buf).unwrap(), payload.len());
	assert_eq!(buf, payload);
}

#[test]
fn write_at_the_maximum_file_size_is_clipped_just_below_the_cap() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk3");
	let mut fs = Fs::format(&path).unwrap();
	let fd = fs.open("huge").unwrap();

	let payload = vec![0x42u8; MAX_FILE_SIZE as usize];
	let written = fs.write(fd, &payload).unwrap();
	assert_eq!(written, MAX_FILE_SIZE as usize - 1);
	assert_eq!(fs.file_size("huge").unwrap(), MAX_FILE_SIZE - 1);

	// A further write at the current cursor (already at the cap) writes nothing.
	assert_eq!(fs.write(fd, b"overflow").unwrap(), 0);
}

#[test]
fn seeking_back_and_overwriting_the_middle_of_a_file() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk4");
	let mut fs = Fs::format(&path).unwrap();
	let fd = fs.open("patchwork").unwrap();

	fs.write(fd, b"the quick brown fox").unwrap();
	fs.seek(fd, 4).unwrap();
	fs.write(fd, b"slow").unwrap();

	fs.seek(fd, 0).unwrap();
	let mut buf = [0u8; 19];
	fs.read(fd, &mut buf).unwrap();
	assert_eq!(&buf, b"the slow brown fox");
}

#[test]
fn exhausting_and_recovering_the_open_file_table() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk5");
	let mut fs = Fs::format(&path).unwrap();

	let mut fds = Vec::new();
	for i in 0..MAX_OPEN_FILES {
		fds.push(fs.open(&format!("file{i}")).unwrap());
	}

	assert!(matches!(
		fs.open("one-too-many"),
		Err(Error::NoFreeSlot(_))
	));

	fs.close(fds.remove(0)).unwrap();
	assert!(fs.open("one-too-many").is_ok());
}

#[test]
fn removing_and_recreating_a_file_reclaims_its_blocks() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk6");
	let mut fs = Fs::format(&path).unwrap();

	let fd = fs.open("to-delete").unwrap();
	fs.write(fd, &vec![1u8; 3000]).unwrap();
	let used_with_file = fs.used_block_count();

	fs.remove("to-delete").unwrap();
	let used_after_remove = fs.used_block_count();
	assert!(used_after_remove < used_with_file);

	let fd2 = fs.open("to-delete").unwrap();
	assert_eq!(fs.file_size("to-delete").unwrap(), 0);
	fs.write(fd2, b"fresh").unwrap();
	assert_eq!(fs.file_size("to-delete").unwrap(), 5);
}

#[test]
fn sequential_listing_covers_every_used_name_exactly_once() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk7");
	let mut fs = Fs::format(&path).unwrap();
	for name in ["alpha", "beta", "gamma"] {
		fs.open(name).unwrap();
	}

	let mut seen = Vec::new();
	while let Some(name) = fs.next_filename() {
		seen.push(name);
	}
	seen.sort();
	assert_eq!(seen, vec!["alpha", "beta", "gamma", "root"]);
	assert_eq!(fs.next_filename(), None);
}

#[test]
fn opening_by_name_twice_shares_one_descriptor() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk8");
	let mut fs = Fs::format(&path).unwrap();

	let fd1 = fs.open("shared").unwrap();
	let fd2 = fs.open("shared").unwrap();
	fs.write(fd1, b"hi").unwrap();

	fs.seek(fd2, 0).unwrap();
	let mut buf = [0u8; 2];
	fs.read(fd2, &mut buf).unwrap();
	assert_eq!(&buf, b"hi");
}

#[test]
fn unknown_name_reports_not_found() {
	let dir = tempfile::tempdir().unwrap();
	let path = disk_path(&dir, "disk9");
	let mut fs = Fs::format(&path).unwrap();
	assert!(matches!(fs.file_size("nope"), Err(Error::NotFound)));
	assert!(matches!(fs.remove("nope"), Err(Error::NotFound)));
}
