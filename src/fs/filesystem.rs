use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{info, warn};

use crate::fs::bitmap::{Allocator, Bitmap, MapKind};
use crate::fs::cache::BlockCache;
use crate::fs::config::MountOptions;
use crate::fs::consts::{BLOCK_SIZE, FS_MAGIC, NAME_LEN, ROOT_INO, SUPERBLOCK_BLOCK};
use crate::fs::error::{FsError, Result};
use crate::fs::io::BlockStore;
use crate::fs::layout::{FileKind, PERM_MASK};
use crate::fs::superblock::Superblock;

/// Seconds since the epoch, truncated to the on-disk width.
pub(crate) fn now() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatFs {
    pub magic: u16,
    pub block_size: u32,
    pub total_blocks: u32,
    pub free_blocks: u32,
    pub total_inodes: u32,
    pub free_inodes: u32,
    pub max_name_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attributes {
    pub ino: u32,
    pub kind: FileKind,
    pub perm: u16,
    pub nlinks: u16,
    pub uid: u16,
    pub gid: u16,
    pub size: u32,
    pub atime: u32,
    pub mtime: u32,
    pub ctime: u32,
    pub rdev: u16,
    /// 512-byte units covered by whole blocks of data.
    pub blocks: u32,
}

/// Attribute changes applied by [`FileSystem::set_attr`]; `None` leaves a field alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetAttr {
    pub perm: Option<u16>,
    pub uid: Option<u16>,
    pub gid: Option<u16>,
    pub atime: Option<u32>,
    pub mtime: Option<u32>,
}

/// A mounted filesystem: the superblock, the cached bitmaps and a buffer cache
/// over the block store.
///
/// Every call except allocation assumes a single writer; wrap the handle in a
/// lock to share it.
pub struct FileSystem<S: BlockStore> {
    pub(crate) cache: BlockCache<S>,
    pub(crate) sb: Superblock,
    pub(crate) alloc: Allocator,
    pub(crate) options: MountOptions,
    // open references per inode; freeing of unlinked inodes waits for zero
    pub(crate) pinned: HashMap<u32, u32>,
}

impl<S: BlockStore> FileSystem<S> {
    pub fn mount(mut store: S, options: MountOptions) -> Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        store.read_block(SUPERBLOCK_BLOCK, &mut block)?;
        let sb = Superblock::deserialize(&block);
        if let Err(e) = sb.validate(store.block_count()) {
            warn!("mount: rejecting superblock: {e}");
            return Err(e);
        }

        let inodes = Bitmap::load(
            &mut store,
            sb.imap_start(),
            sb.imap_blocks as u32,
            sb.inode_count as u32,
        )?;
        let zones = Bitmap::load(
            &mut store,
            sb.zmap_start(),
            sb.zmap_blocks as u32,
            sb.tracked_zones(),
        )?;

        let mut fs = Self {
            cache: BlockCache::new(store, options.cache_blocks),
            sb,
            alloc: Allocator::new(inodes, zones),
            options,
            pinned: HashMap::new(),
        };

        let root = fs.read_inode(ROOT_INO)?;
        if !root.record().is_dir() {
            return Err(FsError::Corrupt("root inode is not a directory".into()));
        }

        info!(
            "mount: {} zones, {} inodes, first data zone {}{}",
            sb.zone_count,
            sb.inode_count,
            sb.first_data_zone,
            if options.read_only { " (read-only)" } else { "" }
        );
        Ok(fs)
    }

    /// Flushes everything (unless read-only) and hands the store back.
    pub fn unmount(mut self) -> Result<S> {
        if !self.pinned.is_empty() {
            warn!("unmount: {} inodes still open", self.pinned.len());
        }
        if self.options.read_only {
            self.cache.discard();
        } else {
            // open references die with the mount
            let open: Vec<u32> = self.pinned.drain().map(|(ino, _)| ino).collect();
            for ino in open {
                self.reap(ino)?;
            }
            self.sync()?;
        }
        info!("unmount: done");
        Ok(self.cache.into_inner())
    }

    /// Writes the superblock, dirty bitmap blocks and dirty cached blocks, then
    /// flushes the store.
    pub fn sync(&mut self) -> Result<()> {
        if self.options.read_only {
            return Ok(());
        }
        let sb = self.sb;
        sb.serialize(self.cache.modify(SUPERBLOCK_BLOCK)?);
        self.alloc.write_back(self.cache.store_mut())?;
        self.cache.sync()
    }

    pub fn superblock(&self) -> &Superblock {
        &self.sb
    }

    pub fn allocator(&self) -> &Allocator {
        &self.alloc
    }

    pub fn options(&self) -> &MountOptions {
        &self.options
    }

    pub fn root(&self) -> u32 {
        ROOT_INO
    }

    pub fn store(&self) -> &S {
        self.cache.store()
    }

    pub fn free_block_count(&self) -> u32 {
        self.alloc.free_count(MapKind::Zone)
    }

    pub fn free_inode_count(&self) -> u32 {
        self.alloc.free_count(MapKind::Inode)
    }

    pub fn statfs(&self) -> StatFs {
        StatFs {
            magic: FS_MAGIC,
            block_size: BLOCK_SIZE as u32,
            total_blocks: self.sb.tracked_zones(),
            free_blocks: self.free_block_count(),
            total_inodes: self.sb.inode_count as u32,
            free_inodes: self.free_inode_count(),
            max_name_len: NAME_LEN as u32,
        }
    }

    pub fn stat(&mut self, ino: u32) -> Result<Attributes> {
        let inode = self.live_inode(ino)?;
        let rec = inode.record();
        Ok(Attributes {
            ino,
            kind: inode.kind().ok_or(FsError::InvalidInode(ino))?,
            perm: rec.perm(),
            nlinks: rec.nlinks,
            uid: rec.uid,
            gid: rec.gid,
            size: rec.size,
            atime: rec.atime,
            mtime: rec.mtime,
            ctime: rec.ctime,
            rdev: rec.rdev,
            blocks: (BLOCK_SIZE as u32 / 512) * (rec.size / BLOCK_SIZE as u32),
        })
    }

    pub fn set_attr(&mut self, ino: u32, attr: SetAttr) -> Result<Attributes> {
        self.ensure_writable()?;
        let mut inode = self.live_inode(ino)?;
        let rec = inode.record_mut();
        if let Some(perm) = attr.perm {
            rec.mode = (rec.mode & !PERM_MASK) | (perm & PERM_MASK);
        }
        if let Some(uid) = attr.uid {
            rec.uid = uid;
        }
        if let Some(gid) = attr.gid {
            rec.gid = gid;
        }
        if let Some(atime) = attr.atime {
            rec.atime = atime;
        }
        if let Some(mtime) = attr.mtime {
            rec.mtime = mtime;
        }
        rec.ctime = now();
        self.write_inode(&mut inode)?;
        self.stat(ino)
    }

    /// Takes an open reference on `ino`; an unlinked inode is only freed after
    /// its last [`close`](Self::close).
    pub fn open(&mut self, ino: u32) -> Result<()> {
        self.live_inode(ino)?;
        *self.pinned.entry(ino).or_insert(0) += 1;
        Ok(())
    }

    pub fn close(&mut self, ino: u32) -> Result<()> {
        let Some(count) = self.pinned.get_mut(&ino) else {
            return Err(FsError::InvalidArgument("inode is not open"));
        };
        *count -= 1;
        if *count > 0 {
            return Ok(());
        }
        self.pinned.remove(&ino);
        if self.options.read_only {
            return Ok(());
        }
        self.reap(ino)
    }

    pub fn is_open(&self, ino: u32) -> bool {
        self.pinned.contains_key(&ino)
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.options.read_only {
            return Err(FsError::ReadOnly);
        }
        Ok(())
    }
}
