//! Directory blocks: arrays of fixed-size entries that keep tombstones in place.
//!
//! A directory's data is the sequence of its non-zero zone pointers; the first
//! zero pointer ends it. Cursors are byte offsets `block * 1024 + slot * 52`
//! into that sequence, and a tombstone still advances the cursor so saved
//! cursors stay valid across deletions.

use std::borrow::Cow;
use std::ops::Range;

use log::debug;

use crate::fs::consts::{BLOCK_SIZE, DIR_ENTRY_SIZE, DIRECT_ZONES, ENTRIES_PER_BLOCK, NAME_LEN};
use crate::fs::error::{FsError, Result};
use crate::fs::filesystem::FileSystem;
use crate::fs::inode::Inode;
use crate::fs::io::BlockStore;
use crate::fs::layout::{DirEntry, is_dot_or_dotdot};

/// Physical position of one directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySlot {
    pub block: u32,
    pub index: usize,
}

impl EntrySlot {
    fn range(&self) -> Range<usize> {
        let start = self.index * DIR_ENTRY_SIZE;
        start..start + DIR_ENTRY_SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub ino: u32,
    pub name: Vec<u8>,
    /// Cursor that resumes right after this entry.
    pub next_cursor: u64,
}

impl ListedEntry {
    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirListing {
    pub entries: Vec<ListedEntry>,
    pub next_cursor: u64,
    /// No entries remain after `next_cursor`.
    pub end: bool,
}

fn cursor_at(block: usize, slot: usize) -> u64 {
    if slot >= ENTRIES_PER_BLOCK {
        return ((block + 1) * BLOCK_SIZE) as u64;
    }
    (block * BLOCK_SIZE + slot * DIR_ENTRY_SIZE) as u64
}

impl<S: BlockStore> FileSystem<S> {
    /// Reads `ino` and fails with `NotDirectory` unless it is one.
    pub(crate) fn dir_inode(&mut self, ino: u32) -> Result<Inode> {
        let inode = self.live_inode(ino)?;
        if !inode.record().is_dir() {
            return Err(FsError::NotDirectory);
        }
        Ok(inode)
    }

    fn entries_in(&mut self, block: u32) -> Result<Vec<DirEntry>> {
        let data = self.cache.read(block)?;
        Ok(data
            .chunks_exact(DIR_ENTRY_SIZE)
            .take(ENTRIES_PER_BLOCK)
            .map(DirEntry::deserialize)
            .collect())
    }

    fn dir_blocks(dir: &Inode) -> impl Iterator<Item = u32> + '_ {
        dir.record().zones.iter().copied().take_while(|&z| z != 0)
    }

    pub fn read_entry(&mut self, slot: EntrySlot) -> Result<DirEntry> {
        let data = self.cache.read(slot.block)?;
        Ok(DirEntry::deserialize(&data[slot.range()]))
    }

    fn write_entry(&mut self, slot: EntrySlot, entry: &DirEntry) -> Result<()> {
        self.ensure_writable()?;
        let data = self.cache.modify(slot.block)?;
        entry.serialize(&mut data[slot.range()]);
        Ok(())
    }

    /// Finds the live entry called `name` in `dir`.
    pub fn find_entry(&mut self, dir: &Inode, name: &[u8]) -> Result<Option<(DirEntry, EntrySlot)>> {
        if name.len() > NAME_LEN {
            return Err(FsError::NameTooLong);
        }
        let blocks: Vec<u32> = Self::dir_blocks(dir).collect();
        for block in blocks {
            let entries = self.entries_in(block)?;
            if let Some(index) = entries.iter().position(|e| e.matches(name)) {
                return Ok(Some((entries[index], EntrySlot { block, index })));
            }
        }
        Ok(None)
    }

    /// Adds `name -> ino` to `dir`, reusing the first tombstone or claiming a
    /// new block. The directory inode is grown and written back.
    pub fn insert_entry(&mut self, dir: &mut Inode, name: &[u8], ino: u32) -> Result<EntrySlot> {
        self.ensure_writable()?;
        let entry = DirEntry::new(name, ino)?;
        let mut free = None;
        let blocks: Vec<u32> = Self::dir_blocks(dir).collect();
        for &block in &blocks {
            let entries = self.entries_in(block)?;
            for (index, existing) in entries.iter().enumerate() {
                if existing.matches(name) {
                    return Err(FsError::NameExists);
                }
                if free.is_none() && existing.is_free() {
                    free = Some(EntrySlot { block, index });
                }
            }
        }

        let slot = match free {
            Some(slot) => slot,
            None => {
                let logical = blocks.len();
                if logical >= DIRECT_ZONES {
                    return Err(FsError::NoSpace);
                }
                let block = self.map_block(dir, logical as u32, true)?;
                EntrySlot { block, index: 0 }
            }
        };
        self.write_entry(slot, &entry)?;
        dir.record_mut().size += DIR_ENTRY_SIZE as u32;
        dir.touch_modified();
        self.write_inode(dir)?;
        debug!(
            "dir: {} += {:?} at block {} slot {}",
            dir.ino(),
            entry,
            slot.block,
            slot.index
        );
        Ok(slot)
    }

    /// Turns the entry at `slot` into a tombstone and shrinks `dir`.
    pub fn delete_entry(&mut self, dir: &mut Inode, slot: EntrySlot) -> Result<()> {
        self.write_entry(slot, &DirEntry::empty())?;
        let rec = dir.record_mut();
        rec.size = rec.size.saturating_sub(DIR_ENTRY_SIZE as u32);
        dir.touch_modified();
        self.write_inode(dir)?;
        debug!("dir: {} -= slot {} of block {}", dir.ino(), slot.index, slot.block);
        Ok(())
    }

    /// Points an existing entry at another inode, keeping its name.
    pub(crate) fn set_entry_inode(&mut self, slot: EntrySlot, ino: u32) -> Result<()> {
        let mut entry = self.read_entry(slot)?;
        entry.inode = u16::try_from(ino).map_err(|_| FsError::InvalidInode(ino))?;
        self.write_entry(slot, &entry)
    }

    /// The ".." entry: always slot 1 of the first block.
    pub fn dotdot(&mut self, dir: &Inode) -> Result<(DirEntry, EntrySlot)> {
        let block = dir.record().zones[0];
        if block == 0 {
            return Err(FsError::Corrupt(format!("directory {} has no blocks", dir.ino())));
        }
        let slot = EntrySlot { block, index: 1 };
        Ok((self.read_entry(slot)?, slot))
    }

    /// Walks the live entries of `dir` from `cursor`, handing each one and the
    /// cursor just past it to `emit`. Returns the resume cursor and whether
    /// the directory is exhausted; when `emit` returns `false` the rejected
    /// entry is where the next call resumes.
    pub fn enumerate<F>(&mut self, dir: &Inode, cursor: u64, mut emit: F) -> Result<(u64, bool)>
    where
        F: FnMut(&DirEntry, u64) -> bool,
    {
        let mut block = (cursor / BLOCK_SIZE as u64) as usize;
        let mut slot = (cursor % BLOCK_SIZE as u64) as usize / DIR_ENTRY_SIZE;
        if slot >= ENTRIES_PER_BLOCK {
            block += 1;
            slot = 0;
        }
        if block >= DIRECT_ZONES {
            return Err(FsError::Corrupt(format!(
                "cursor {cursor} past the last direct block"
            )));
        }

        while block < DIRECT_ZONES {
            let zone = dir.record().zones[block];
            if zone == 0 {
                return Ok((cursor_at(block, 0), true));
            }
            let entries = self.entries_in(zone)?;
            for (index, entry) in entries.iter().enumerate().skip(slot) {
                if entry.is_free() {
                    continue;
                }
                if !emit(entry, cursor_at(block, index + 1)) {
                    return Ok((cursor_at(block, index), false));
                }
            }
            block += 1;
            slot = 0;
        }
        Ok((cursor_at(DIRECT_ZONES, 0), true))
    }

    /// True when `dir` holds nothing but "." and "..".
    pub fn is_empty_dir(&mut self, dir: &Inode) -> Result<bool> {
        let blocks: Vec<u32> = Self::dir_blocks(dir).collect();
        for block in blocks {
            let entries = self.entries_in(block)?;
            if entries
                .iter()
                .any(|e| !e.is_free() && !is_dot_or_dotdot(e.name_bytes()))
            {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::consts::ROOT_INO;
    use crate::fs::format::scratch_fs;

    #[test]
    fn names_are_unique_and_tombstones_are_reused() {
        let mut fs = scratch_fs(16, 8);
        let mut root = fs.dir_inode(ROOT_INO).unwrap();
        let first = fs.insert_entry(&mut root, b"a", 5).unwrap();
        assert_eq!(first.index, 2);
        assert!(matches!(
            fs.insert_entry(&mut root, b"a", 6),
            Err(FsError::NameExists)
        ));
        fs.insert_entry(&mut root, b"b", 7).unwrap();

        fs.delete_entry(&mut root, first).unwrap();
        assert!(fs.find_entry(&root, b"a").unwrap().is_none());
        let again = fs.insert_entry(&mut root, b"a", 6).unwrap();
        assert_eq!(again, first);
        let (entry, _) = fs.find_entry(&root, b"a").unwrap().unwrap();
        assert_eq!(entry.ino(), 6);
        assert_eq!(root.size(), 4 * DIR_ENTRY_SIZE as u32);
    }

    #[test]
    fn full_block_spills_into_a_new_one() {
        let mut fs = scratch_fs(16, 8);
        let mut root = fs.dir_inode(ROOT_INO).unwrap();
        for i in 0..ENTRIES_PER_BLOCK - 2 {
            fs.insert_entry(&mut root, format!("n{i}").as_bytes(), 3).unwrap();
        }
        assert_eq!(root.record().zones[1], 0);
        let slot = fs.insert_entry(&mut root, b"spill", 3).unwrap();
        assert_eq!(slot.index, 0);
        assert_eq!(slot.block, root.record().zones[1]);
    }

    #[test]
    fn cursor_walks_past_block_end() {
        assert_eq!(cursor_at(0, 2), 104);
        assert_eq!(cursor_at(0, ENTRIES_PER_BLOCK), 1024);
        assert_eq!(cursor_at(3, 1), 3 * 1024 + 52);
    }

    #[test]
    fn dotdot_of_root_is_root() {
        let mut fs = scratch_fs(16, 8);
        let root = fs.dir_inode(ROOT_INO).unwrap();
        let (entry, slot) = fs.dotdot(&root).unwrap();
        assert_eq!(entry.ino(), ROOT_INO);
        assert_eq!(entry.name_bytes(), b"..");
        assert_eq!(slot.index, 1);
        assert!(fs.is_empty_dir(&root).unwrap());
    }
}
