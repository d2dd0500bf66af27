mod common;

use common::{ROOT, mounted, remount};
use mzfs::fs::{FileKind, FsError, MapKind};

#[test]
fn file_survives_remount() {
    let mut fs = mounted(16, 8);
    let d = fs.mkdir(ROOT, b"d", 0o755).unwrap();
    let f = fs.create(d, b"f", 0o644).unwrap();
    assert_eq!(fs.write_bytes(f, 0, b"hi").unwrap(), 2);

    let mut fs = remount(fs);
    let d2 = fs.lookup(ROOT, b"d").unwrap();
    let f2 = fs.lookup(d2, b"f").unwrap();
    assert_eq!((d2, f2), (d, f));
    assert_eq!(fs.read_bytes(f2, 0, 2).unwrap(), b"hi");
    assert_eq!(fs.stat(f2).unwrap().kind, FileKind::Regular);
}

#[test]
fn rename_to_a_free_name() {
    let mut fs = mounted(16, 8);
    let f = fs.create(ROOT, b"f", 0o644).unwrap();
    fs.rename(ROOT, b"f", ROOT, b"g").unwrap();
    assert_eq!(fs.lookup(ROOT, b"g").unwrap(), f);
    assert!(matches!(fs.lookup(ROOT, b"f"), Err(FsError::NotFound)));
    assert_eq!(fs.stat(f).unwrap().nlinks, 1);
}

#[test]
fn accounting_right_after_format() {
    let fs = mounted(16, 8);
    let sb = *fs.superblock();
    assert_eq!(fs.free_inode_count(), sb.inode_count as u32 - 2);
    // the root directory block is the only zone format hands out
    assert_eq!(
        fs.free_block_count(),
        sb.zone_count as u32 - sb.first_data_zone as u32 - 1
    );
    assert!(fs.allocator().is_allocated(MapKind::Inode, 0).unwrap());
    assert!(fs.allocator().is_allocated(MapKind::Inode, 1).unwrap());

    let st = fs.statfs();
    assert_eq!(st.total_inodes, 16);
    assert_eq!(st.free_inodes, 14);
    assert_eq!(st.total_blocks, st.free_blocks);
    assert_eq!(st.block_size, 1024);
    assert_eq!(st.magic, 2020);
}

#[test]
fn unmount_persists_allocations() {
    let mut fs = mounted(16, 8);
    let f = fs.create(ROOT, b"f", 0o644).unwrap();
    fs.write_bytes(f, 0, &[1u8; 1500]).unwrap();
    let free_blocks = fs.free_block_count();
    let free_inodes = fs.free_inode_count();

    let fs = remount(fs);
    assert_eq!(fs.free_block_count(), free_blocks);
    assert_eq!(fs.free_inode_count(), free_inodes);
}
