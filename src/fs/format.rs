use log::info;

use crate::fs::consts::{BLOCK_SIZE, DIR_ENTRY_SIZE, INODE_SIZE, INODES_PER_BLOCK, ROOT_INO, SUPERBLOCK_BLOCK};
use crate::fs::error::{FsError, Result};
use crate::fs::filesystem::now;
use crate::fs::io::{Block, BlockStore};
use crate::fs::layout::{DirEntry, FileKind, InodeRecord};
use crate::fs::superblock::{Geometry, Superblock};

pub const SAMPLE_FILE_NAME: &str = "readme.txt";
pub const SAMPLE_FILE_TEXT: &[u8] = b"hello mzfs\n";
const SAMPLE_INO: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub geometry: Geometry,
    /// Seed `readme.txt` in the root directory.
    pub sample_file: bool,
    pub uid: u16,
    pub gid: u16,
}

impl FormatOptions {
    pub fn new(geometry: Geometry) -> Self {
        Self {
            geometry,
            sample_file: false,
            uid: 0,
            gid: 0,
        }
    }

    pub fn for_capacity(bytes: u64) -> Result<Self> {
        Ok(Self::new(Geometry::for_capacity(bytes)?))
    }

    pub fn with_sample_file(mut self) -> Self {
        self.sample_file = true;
        self
    }

    pub fn with_owner(mut self, uid: u16, gid: u16) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }
}

fn put_inode(sb: &Superblock, store: &mut impl BlockStore, ino: u32, record: &InodeRecord) -> Result<()> {
    let per_block = INODES_PER_BLOCK as u32;
    let block = sb.inode_table_start() + ino / per_block;
    let offset = (ino % per_block) as usize * INODE_SIZE;
    let mut buf: Block = [0u8; BLOCK_SIZE];
    store.read_block(block, &mut buf)?;
    record.serialize(&mut buf[offset..offset + INODE_SIZE]);
    store.write_block(block, &buf)
}

/// Writes an empty filesystem onto `store`: superblock, bitmaps, inode table
/// and the root directory.
pub fn format<S: BlockStore>(store: &mut S, options: &FormatOptions) -> Result<Superblock> {
    let sb = options.geometry.layout()?;
    if sb.zone_count as u32 > store.block_count() {
        return Err(FsError::InvalidArgument("store smaller than the requested geometry"));
    }
    let root_block = sb.first_data_zone as u32;
    let sample_block = sb.zone_block(0);
    if options.sample_file && (sb.tracked_zones() == 0 || u32::from(sb.inode_count) <= SAMPLE_INO) {
        return Err(FsError::InvalidArgument("no room for the sample file"));
    }

    let zero: Block = [0u8; BLOCK_SIZE];
    for block in 0..=root_block {
        store.write_block(block, &zero)?;
    }

    let mut buf: Block = [0u8; BLOCK_SIZE];
    sb.serialize(&mut buf);
    store.write_block(SUPERBLOCK_BLOCK, &buf)?;

    // inode 0 stays reserved, 1 is the root
    let mut imap: Block = [0u8; BLOCK_SIZE];
    imap[0] = 1;
    imap[ROOT_INO as usize] = 1;
    if options.sample_file {
        imap[SAMPLE_INO as usize] = 1;
        let mut zmap: Block = [0u8; BLOCK_SIZE];
        zmap[0] = 1;
        store.write_block(sb.zmap_start(), &zmap)?;
    }
    store.write_block(sb.imap_start(), &imap)?;

    let t = now();
    let mut root = InodeRecord {
        nlinks: 2,
        uid: options.uid,
        gid: options.gid,
        size: 2 * DIR_ENTRY_SIZE as u32,
        atime: t,
        mtime: t,
        ctime: t,
        ..InodeRecord::new(FileKind::Directory, 0o755)
    };
    root.zones[0] = root_block;

    let mut dir: Block = [0u8; BLOCK_SIZE];
    let mut entries = vec![DirEntry::new(b".", ROOT_INO)?, DirEntry::new(b"..", ROOT_INO)?];
    if options.sample_file {
        entries.push(DirEntry::new(SAMPLE_FILE_NAME.as_bytes(), SAMPLE_INO)?);
        root.size += DIR_ENTRY_SIZE as u32;

        let mut sample = InodeRecord {
            nlinks: 1,
            uid: options.uid,
            gid: options.gid,
            size: SAMPLE_FILE_TEXT.len() as u32,
            atime: t,
            mtime: t,
            ctime: t,
            ..InodeRecord::new(FileKind::Regular, 0o644)
        };
        sample.zones[0] = sample_block;
        put_inode(&sb, store, SAMPLE_INO, &sample)?;

        let mut data: Block = [0u8; BLOCK_SIZE];
        data[..SAMPLE_FILE_TEXT.len()].copy_from_slice(SAMPLE_FILE_TEXT);
        store.write_block(sample_block, &data)?;
    }
    for (i, entry) in entries.iter().enumerate() {
        entry.serialize(&mut dir[i * DIR_ENTRY_SIZE..(i + 1) * DIR_ENTRY_SIZE]);
    }
    store.write_block(root_block, &dir)?;
    put_inode(&sb, store, ROOT_INO, &root)?;
    store.flush()?;

    info!(
        "format: {} zones, {} inodes, first data zone {}",
        sb.zone_count, sb.inode_count, sb.first_data_zone
    );
    Ok(sb)
}

/// A freshly formatted, mounted in-memory filesystem for unit tests.
#[cfg(test)]
pub(crate) fn scratch_fs(inodes: u32, data_zones: u32) -> crate::fs::FileSystem<crate::fs::MemStore> {
    use crate::fs::{FileSystem, MemStore, MountOptions};
    let geometry = Geometry::with_data_zones(inodes, data_zones).unwrap();
    let mut store = MemStore::new(geometry.zone_count);
    format(&mut store, &FormatOptions::new(geometry)).unwrap();
    FileSystem::mount(store, MountOptions::default()).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileSystem, MemStore, MountOptions};

    #[test]
    fn fresh_filesystem_accounting() {
        let fs = scratch_fs(16, 8);
        let sb = *fs.superblock();
        assert_eq!(fs.free_inode_count(), 16 - 2);
        assert_eq!(
            fs.free_block_count(),
            sb.zone_count as u32 - sb.first_data_zone as u32 - 1
        );
        let st = fs.statfs();
        assert_eq!(st.total_blocks, 7);
        assert_eq!(st.max_name_len, 50);
    }

    #[test]
    fn sample_file_is_readable() {
        let geometry = Geometry::with_data_zones(16, 8).unwrap();
        let mut store = MemStore::new(geometry.zone_count);
        format(&mut store, &FormatOptions::new(geometry).with_sample_file()).unwrap();
        let mut fs = FileSystem::mount(store, MountOptions::default()).unwrap();
        let ino = fs.lookup(ROOT_INO, SAMPLE_FILE_NAME.as_bytes()).unwrap();
        assert_eq!(ino, SAMPLE_INO);
        assert_eq!(fs.read_bytes(ino, 0, 100).unwrap(), SAMPLE_FILE_TEXT);
        assert_eq!(fs.free_inode_count(), 13);
        assert_eq!(fs.free_block_count(), 6);
    }

    #[test]
    fn sample_file_needs_a_spare_inode() {
        let geometry = Geometry::with_data_zones(2, 8).unwrap();
        let mut store = MemStore::new(geometry.zone_count);
        assert!(matches!(
            format(&mut store, &FormatOptions::new(geometry).with_sample_file()),
            Err(FsError::InvalidArgument(_))
        ));
        format(&mut store, &FormatOptions::new(geometry)).unwrap();
    }

    #[test]
    fn store_too_small_is_rejected() {
        let geometry = Geometry::with_data_zones(16, 8).unwrap();
        let mut store = MemStore::new(geometry.zone_count - 1);
        assert!(matches!(
            format(&mut store, &FormatOptions::new(geometry)),
            Err(FsError::InvalidArgument(_))
        ));
    }
}
