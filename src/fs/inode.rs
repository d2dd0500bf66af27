//! Inode table access and in-memory inode lifecycle.

use log::{debug, warn};

use crate::fs::bitmap::MapKind;
use crate::fs::consts::{INODE_SIZE, INODES_PER_BLOCK, ROOT_INO};
use crate::fs::error::{FsError, Result};
use crate::fs::filesystem::{FileSystem, now};
use crate::fs::io::BlockStore;
use crate::fs::layout::{FileKind, InodeRecord};

/// In-memory copy of one on-disk inode record.
///
/// Changes stay local until [`FileSystem::write_inode`] stores the record back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    ino: u32,
    record: InodeRecord,
    dirty: bool,
}

impl Inode {
    pub fn ino(&self) -> u32 {
        self.ino
    }

    pub fn record(&self) -> &InodeRecord {
        &self.record
    }

    /// Mutable access; marks the inode dirty.
    pub fn record_mut(&mut self) -> &mut InodeRecord {
        self.dirty = true;
        &mut self.record
    }

    pub fn kind(&self) -> Option<FileKind> {
        self.record.kind()
    }

    pub fn size(&self) -> u32 {
        self.record.size
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn touch_changed(&mut self) {
        self.record_mut().ctime = now();
    }

    pub(crate) fn touch_modified(&mut self) {
        let t = now();
        let rec = self.record_mut();
        rec.mtime = t;
        rec.ctime = t;
    }
}

impl<S: BlockStore> FileSystem<S> {
    /// Inode table block and byte offset holding `ino`.
    pub fn locate(&self, ino: u32) -> Result<(u32, usize)> {
        if ino == 0 || ino >= self.sb.inode_count as u32 {
            return Err(FsError::InvalidInode(ino));
        }
        let per_block = INODES_PER_BLOCK as u32;
        let block = self.sb.inode_table_start() + ino / per_block;
        let offset = (ino % per_block) as usize * INODE_SIZE;
        Ok((block, offset))
    }

    pub fn read_inode(&mut self, ino: u32) -> Result<Inode> {
        let (block, offset) = self.locate(ino)?;
        let data = self.cache.read(block)?;
        Ok(Inode {
            ino,
            record: InodeRecord::deserialize(&data[offset..offset + INODE_SIZE]),
            dirty: false,
        })
    }

    /// Reads `ino` and fails unless it holds a live inode of a known kind.
    pub(crate) fn live_inode(&mut self, ino: u32) -> Result<Inode> {
        let inode = self.read_inode(ino)?;
        if inode.kind().is_none() {
            return Err(FsError::InvalidInode(ino));
        }
        Ok(inode)
    }

    /// Overwrites the on-disk record of `ino`.
    pub fn write_record(&mut self, ino: u32, record: &InodeRecord) -> Result<()> {
        self.ensure_writable()?;
        let (block, offset) = self.locate(ino)?;
        let data = self.cache.modify(block)?;
        record.serialize(&mut data[offset..offset + INODE_SIZE]);
        Ok(())
    }

    /// Stores `inode` if it is dirty.
    pub fn write_inode(&mut self, inode: &mut Inode) -> Result<()> {
        if !inode.dirty {
            return Ok(());
        }
        self.write_record(inode.ino, &inode.record)?;
        inode.dirty = false;
        Ok(())
    }

    /// Claims a free inode and returns a fresh dirty record for it with one
    /// link; nothing points at it yet.
    pub fn allocate_inode(&mut self, kind: FileKind, perm: u16) -> Result<Inode> {
        self.ensure_writable()?;
        let mut ino = self.alloc.allocate(MapKind::Inode)?;
        if ino == 0 {
            warn!("imap: reserved inode 0 was marked free");
            ino = self.alloc.allocate(MapKind::Inode)?;
        }
        let t = now();
        let record = InodeRecord {
            nlinks: 1,
            uid: self.options.uid,
            gid: self.options.gid,
            atime: t,
            mtime: t,
            ctime: t,
            ..InodeRecord::new(kind, perm)
        };
        debug!("inode: allocated {ino} as {kind:?}");
        Ok(Inode {
            ino,
            record,
            dirty: true,
        })
    }

    /// Zeroes the record and releases the inode number.
    ///
    /// Link count and data zones are not checked; callers truncate and unlink first.
    pub fn free_inode(&mut self, ino: u32) -> Result<()> {
        self.locate(ino)?;
        if ino == ROOT_INO {
            return Err(FsError::InvalidInode(ino));
        }
        self.write_record(ino, &InodeRecord::default())?;
        self.alloc.release(MapKind::Inode, ino)?;
        debug!("inode: freed {ino}");
        Ok(())
    }

    /// Frees an inode whose last link is gone, unless it is still open.
    pub(crate) fn reap(&mut self, ino: u32) -> Result<()> {
        if self.pinned.contains_key(&ino) {
            debug!("inode: {ino} unlinked while open, freeing on close");
            return Ok(());
        }
        let mut inode = self.read_inode(ino)?;
        if inode.record().nlinks != 0 {
            return Ok(());
        }
        self.truncate_blocks(&mut inode)?;
        self.free_inode(ino)
    }
}
