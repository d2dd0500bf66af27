//! File data through the ten direct zone pointers.

use log::{debug, warn};

use crate::fs::bitmap::MapKind;
use crate::fs::consts::{BLOCK_SIZE, DIRECT_ZONES, MAX_FILE_SIZE};
use crate::fs::error::{FsError, Result};
use crate::fs::filesystem::FileSystem;
use crate::fs::inode::Inode;
use crate::fs::io::BlockStore;
use crate::fs::layout::FileKind;

impl<S: BlockStore> FileSystem<S> {
    /// Claims a data zone and returns its block number, zero-filled.
    pub(crate) fn allocate_zone(&mut self) -> Result<u32> {
        self.ensure_writable()?;
        let index = self.alloc.allocate(MapKind::Zone)?;
        let block = self.sb.zone_block(index);
        if let Err(e) = self.cache.zeroed(block) {
            warn!("zone: could not initialise block {block}, releasing it");
            let _ = self.alloc.release(MapKind::Zone, index);
            return Err(e);
        }
        Ok(block)
    }

    pub(crate) fn release_zone(&mut self, block: u32) -> Result<()> {
        let index = self
            .sb
            .zone_index(block)
            .ok_or_else(|| FsError::Corrupt(format!("zone pointer {block} outside data area")))?;
        self.alloc.release(MapKind::Zone, index)
    }

    /// Physical block behind `logical` in `inode`.
    ///
    /// With `create` an unmapped slot gets a fresh zero-filled zone and the
    /// inode is marked dirty; the caller writes it back.
    pub fn map_block(&mut self, inode: &mut Inode, logical: u32, create: bool) -> Result<u32> {
        if logical as usize >= DIRECT_ZONES {
            return Err(FsError::OutOfRange(logical));
        }
        let current = inode.record().zones[logical as usize];
        if current != 0 {
            return Ok(current);
        }
        if !create {
            return Err(FsError::HoleNotAllocated(logical));
        }
        let block = self.allocate_zone()?;
        inode.record_mut().zones[logical as usize] = block;
        debug!("data: inode {} block {logical} -> zone {block}", inode.ino());
        Ok(block)
    }

    /// Releases every data zone and sets the size to zero.
    ///
    /// Pointers at or below the first data zone are never released.
    pub(crate) fn truncate_blocks(&mut self, inode: &mut Inode) -> Result<()> {
        let first = self.sb.first_data_zone as u32;
        for logical in 0..DIRECT_ZONES {
            let zone = inode.record().zones[logical];
            if zone > first {
                self.release_zone(zone)?;
                inode.record_mut().zones[logical] = 0;
            }
        }
        inode.record_mut().size = 0;
        inode.touch_modified();
        self.write_inode(inode)
    }

    /// Reads up to `len` bytes at `offset`, stopping at the file size.
    /// Unmapped blocks read as zeros.
    pub fn read_bytes(&mut self, ino: u32, offset: u64, len: usize) -> Result<Vec<u8>> {
        let inode = self.live_inode(ino)?;
        match inode.kind() {
            Some(FileKind::Regular | FileKind::Symlink) => {}
            Some(FileKind::Directory) => return Err(FsError::IsDirectory),
            _ => return Err(FsError::InvalidArgument("inode carries no data")),
        }
        let size = inode.size() as u64;
        if offset >= size || len == 0 {
            return Ok(Vec::new());
        }
        let end = size.min(offset.saturating_add(len as u64));
        let mut out = Vec::with_capacity((end - offset) as usize);
        let mut pos = offset;
        while pos < end {
            let logical = (pos / BLOCK_SIZE as u64) as usize;
            let within = (pos % BLOCK_SIZE as u64) as usize;
            let n = (BLOCK_SIZE - within).min((end - pos) as usize);
            match inode.record().zones.get(logical).copied() {
                Some(0) => out.resize(out.len() + n, 0),
                Some(zone) => {
                    let block = self.cache.read(zone)?;
                    out.extend_from_slice(&block[within..within + n]);
                }
                None => return Err(FsError::OutOfRange(logical as u32)),
            }
            pos += n as u64;
        }
        Ok(out)
    }

    /// Writes `data` at `offset` into a regular file, growing it as needed.
    ///
    /// Writes that would end past the ten direct zones fail before touching
    /// anything. On a mid-write failure the blocks already written and the
    /// grown size are kept.
    pub fn write_bytes(&mut self, ino: u32, offset: u64, data: &[u8]) -> Result<usize> {
        self.ensure_writable()?;
        let mut inode = self.live_inode(ino)?;
        match inode.kind() {
            Some(FileKind::Regular) => {}
            Some(FileKind::Directory) => return Err(FsError::IsDirectory),
            _ => return Err(FsError::InvalidArgument("not a regular file")),
        }
        let end = offset.saturating_add(data.len() as u64);
        if end > MAX_FILE_SIZE as u64 {
            let logical = (end - 1) / BLOCK_SIZE as u64;
            return Err(FsError::OutOfRange(u32::try_from(logical).unwrap_or(u32::MAX)));
        }
        if data.is_empty() {
            return Ok(0);
        }

        let mut written = 0usize;
        let outcome = loop {
            if written == data.len() {
                break Ok(());
            }
            let pos = offset + written as u64;
            let logical = (pos / BLOCK_SIZE as u64) as u32;
            let within = (pos % BLOCK_SIZE as u64) as usize;
            let n = (BLOCK_SIZE - within).min(data.len() - written);
            let zone = match self.map_block(&mut inode, logical, true) {
                Ok(zone) => zone,
                Err(e) => break Err(e),
            };
            match self.cache.modify(zone) {
                Ok(block) => block[within..within + n].copy_from_slice(&data[written..written + n]),
                Err(e) => break Err(e),
            }
            written += n;
        };

        let reached = offset + written as u64;
        if reached > inode.size() as u64 {
            inode.record_mut().size = reached as u32;
        }
        if written > 0 {
            inode.touch_modified();
        }
        self.write_inode(&mut inode)?;
        if let Err(e) = outcome {
            warn!("data: write to inode {ino} stopped after {written} bytes: {e}");
            return Err(e);
        }
        Ok(written)
    }

    /// Drops all data of a regular file.
    pub fn truncate(&mut self, ino: u32) -> Result<()> {
        self.ensure_writable()?;
        let mut inode = self.live_inode(ino)?;
        match inode.kind() {
            Some(FileKind::Regular) => self.truncate_blocks(&mut inode),
            Some(FileKind::Directory) => Err(FsError::IsDirectory),
            _ => Err(FsError::InvalidArgument("not a regular file")),
        }
    }
}
