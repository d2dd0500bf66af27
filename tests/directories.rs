mod common;

use common::{ROOT, mounted, names};
use mzfs::fs::consts::{BLOCK_SIZE, DIR_ENTRY_SIZE};
use mzfs::fs::FsError;

#[test]
fn names_are_unique_until_removed() {
    let mut fs = mounted(16, 8);
    let first = fs.create(ROOT, b"a", 0o644).unwrap();
    assert!(matches!(fs.create(ROOT, b"a", 0o644), Err(FsError::NameExists)));
    assert!(matches!(fs.mkdir(ROOT, b"a", 0o755), Err(FsError::NameExists)));
    assert!(matches!(fs.create(ROOT, b"..", 0o644), Err(FsError::NameExists)));

    fs.unlink(ROOT, b"a").unwrap();
    assert!(matches!(fs.lookup(ROOT, b"a"), Err(FsError::NotFound)));
    let second = fs.create(ROOT, b"a", 0o644).unwrap();
    assert_eq!(fs.lookup(ROOT, b"a").unwrap(), second);
    // the freed inode number comes back first
    assert_eq!(second, first);
}

#[test]
fn bad_names_are_rejected() {
    let mut fs = mounted(16, 8);
    assert!(matches!(
        fs.create(ROOT, &[b'n'; 51], 0o644),
        Err(FsError::NameTooLong)
    ));
    let overlong = [b'n'; 51];
    assert!(matches!(fs.lookup(ROOT, &overlong), Err(FsError::NameTooLong)));
    assert!(matches!(fs.unlink(ROOT, &overlong), Err(FsError::NameTooLong)));
    assert!(matches!(fs.rmdir(ROOT, &overlong), Err(FsError::NameTooLong)));
    assert!(matches!(
        fs.rename(ROOT, &overlong, ROOT, b"short"),
        Err(FsError::NameTooLong)
    ));
    assert!(matches!(fs.create(ROOT, b"a/b", 0o644), Err(FsError::InvalidName)));
    assert!(matches!(fs.create(ROOT, b"", 0o644), Err(FsError::InvalidName)));
    let long = [b'n'; 50];
    let ino = fs.create(ROOT, &long, 0o644).unwrap();
    assert_eq!(fs.lookup(ROOT, &long).unwrap(), ino);
    assert_eq!(fs.free_inode_count(), 13);
}

#[test]
fn tombstones_are_reused_in_place() {
    let mut fs = mounted(16, 8);
    for name in [b"a", b"b", b"c"] {
        fs.create(ROOT, name, 0o644).unwrap();
    }
    fs.unlink(ROOT, b"b").unwrap();
    fs.create(ROOT, b"d", 0o644).unwrap();
    assert_eq!(names(&mut fs, ROOT), [".", "..", "a", "d", "c"]);
    assert_eq!(fs.stat(ROOT).unwrap().size, 5 * DIR_ENTRY_SIZE as u32);
}

#[test]
fn readdir_spans_blocks_and_resumes() {
    let mut fs = mounted(64, 16);
    for i in 0..25 {
        fs.create(ROOT, format!("f{i:02}").as_bytes(), 0o644).unwrap();
    }
    let all = fs.readdir(ROOT, 0).unwrap();
    assert!(all.end);
    assert_eq!(all.entries.len(), 27);
    assert_eq!(all.next_cursor, 2 * BLOCK_SIZE as u64);
    assert_eq!(all.entries[18].next_cursor, BLOCK_SIZE as u64);
    assert_eq!(all.entries[19].next_cursor, (BLOCK_SIZE + DIR_ENTRY_SIZE) as u64);

    let mut seen = Vec::new();
    let (cursor, end) = fs
        .readdir_with(ROOT, 0, |entry| {
            if seen.len() == 5 {
                return false;
            }
            seen.push(entry.name.clone());
            true
        })
        .unwrap();
    assert!(!end);
    assert_eq!(cursor, all.entries[4].next_cursor);

    let rest = fs.readdir(ROOT, cursor).unwrap();
    assert_eq!(rest.entries.len(), 22);
    assert_eq!(rest.entries[0].name, all.entries[5].name);
}

#[test]
fn saved_cursor_survives_deletions() {
    let mut fs = mounted(16, 8);
    for name in ["a", "b", "c", "d"] {
        fs.create(ROOT, name.as_bytes(), 0o644).unwrap();
    }
    let first = fs.readdir(ROOT, 0).unwrap();
    let cursor = first.entries[3].next_cursor; // just past "b"
    fs.unlink(ROOT, b"a").unwrap();
    fs.unlink(ROOT, b"b").unwrap();

    let rest = fs.readdir(ROOT, cursor).unwrap();
    let rest: Vec<_> = rest.entries.iter().map(|e| e.name_str().into_owned()).collect();
    assert_eq!(rest, ["c", "d"]);
}

#[test]
fn cursor_beyond_the_last_block_is_corrupt() {
    let mut fs = mounted(16, 8);
    assert!(matches!(
        fs.readdir(ROOT, 10 * BLOCK_SIZE as u64),
        Err(FsError::Corrupt(_))
    ));
    let f = fs.create(ROOT, b"f", 0o644).unwrap();
    assert!(matches!(fs.readdir(f, 0), Err(FsError::NotDirectory)));
    assert!(matches!(fs.lookup(f, b"x"), Err(FsError::NotDirectory)));
}

#[test]
fn directory_is_capped_at_ten_blocks() {
    let mut fs = mounted(16, 16);
    let f = fs.create(ROOT, b"f", 0o644).unwrap();
    // 19 slots per block, three already used
    for i in 0..187 {
        fs.link(f, ROOT, format!("l{i}").as_bytes()).unwrap();
    }
    assert!(matches!(fs.link(f, ROOT, b"one-more"), Err(FsError::NoSpace)));
    assert_eq!(fs.stat(f).unwrap().nlinks, 188);
    assert_eq!(fs.readdir(ROOT, 0).unwrap().entries.len(), 190);
}

#[test]
fn mkdir_and_rmdir_track_links() {
    let mut fs = mounted(16, 8);
    let free_blocks = fs.free_block_count();
    let free_inodes = fs.free_inode_count();

    let d = fs.mkdir(ROOT, b"d", 0o750).unwrap();
    assert_eq!(fs.stat(ROOT).unwrap().nlinks, 3);
    let attr = fs.stat(d).unwrap();
    assert_eq!((attr.nlinks, attr.perm, attr.size), (2, 0o750, 104));
    assert_eq!(names(&mut fs, d), [".", ".."]);
    assert_eq!(fs.lookup(d, b"..").unwrap(), ROOT);
    assert_eq!(fs.lookup(d, b".").unwrap(), d);

    fs.create(d, b"inner", 0o644).unwrap();
    assert!(matches!(fs.rmdir(ROOT, b"d"), Err(FsError::NotEmpty)));
    assert!(matches!(fs.unlink(ROOT, b"d"), Err(FsError::IsDirectory)));
    fs.unlink(d, b"inner").unwrap();

    fs.rmdir(ROOT, b"d").unwrap();
    assert_eq!(fs.stat(ROOT).unwrap().nlinks, 2);
    assert_eq!(fs.free_block_count(), free_blocks);
    assert_eq!(fs.free_inode_count(), free_inodes);
    assert!(matches!(fs.stat(d), Err(FsError::InvalidInode(_))));
    assert!(matches!(fs.rmdir(ROOT, b"d"), Err(FsError::NotFound)));
}

#[test]
fn rmdir_refuses_files_and_dots() {
    let mut fs = mounted(16, 8);
    fs.create(ROOT, b"f", 0o644).unwrap();
    assert!(matches!(fs.rmdir(ROOT, b"f"), Err(FsError::NotDirectory)));
    assert!(matches!(fs.rmdir(ROOT, b"."), Err(FsError::InvalidArgument(_))));
    assert!(matches!(fs.rmdir(ROOT, b".."), Err(FsError::InvalidArgument(_))));
}

#[test]
fn moving_a_directory_rewires_its_parent() {
    let mut fs = mounted(16, 8);
    let a = fs.mkdir(ROOT, b"a", 0o755).unwrap();
    let b = fs.mkdir(ROOT, b"b", 0o755).unwrap();
    let c = fs.mkdir(a, b"c", 0o755).unwrap();
    assert_eq!(fs.stat(a).unwrap().nlinks, 3);

    fs.rename(a, b"c", b, b"c2").unwrap();
    assert_eq!(fs.lookup(b, b"c2").unwrap(), c);
    assert_eq!(fs.lookup(c, b"..").unwrap(), b);
    assert!(matches!(fs.lookup(a, b"c"), Err(FsError::NotFound)));
    assert_eq!(fs.stat(a).unwrap().nlinks, 2);
    assert_eq!(fs.stat(b).unwrap().nlinks, 3);
}

#[test]
fn directory_cannot_move_below_itself() {
    let mut fs = mounted(16, 8);
    let a = fs.mkdir(ROOT, b"a", 0o755).unwrap();
    let c = fs.mkdir(a, b"c", 0o755).unwrap();
    assert!(matches!(
        fs.rename(ROOT, b"a", c, b"x"),
        Err(FsError::InvalidArgument(_))
    ));
    assert!(matches!(
        fs.rename(ROOT, b"a", a, b"x"),
        Err(FsError::InvalidArgument(_))
    ));
    assert_eq!(fs.lookup(ROOT, b"a").unwrap(), a);
}
