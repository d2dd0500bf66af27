//! Write-back buffer cache between the engine and its block store.
//!
//! Bitmap blocks never pass through here; the allocator keeps its own copies.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::debug;

use crate::fs::consts::BLOCK_SIZE;
use crate::fs::error::{FsError, Result};
use crate::fs::io::{Block, BlockStore};

struct CachedBlock {
    data: Box<Block>,
    dirty: bool,
}

pub struct BlockCache<S: BlockStore> {
    store: S,
    blocks: HashMap<u32, CachedBlock>,
    limit: usize,
}

impl<S: BlockStore> BlockCache<S> {
    pub fn new(store: S, limit: usize) -> Self {
        Self {
            store,
            blocks: HashMap::new(),
            limit: limit.max(1),
        }
    }

    pub fn read(&mut self, index: u32) -> Result<&Block> {
        let slot = self.slot(index, true)?;
        Ok(&slot.data)
    }

    /// Loads the block and marks it dirty.
    pub fn modify(&mut self, index: u32) -> Result<&mut Block> {
        let slot = self.slot(index, true)?;
        slot.dirty = true;
        Ok(&mut slot.data)
    }

    /// Installs an all-zero dirty block without reading the old contents.
    pub fn zeroed(&mut self, index: u32) -> Result<&mut Block> {
        let slot = self.slot(index, false)?;
        slot.data.fill(0);
        slot.dirty = true;
        Ok(&mut slot.data)
    }

    /// Writes back every dirty block and flushes the store.
    pub fn sync(&mut self) -> Result<()> {
        self.write_back()?;
        self.store.flush()
    }

    /// Drops every cached copy without writing anything.
    pub fn discard(&mut self) {
        self.blocks.clear();
    }

    pub fn dirty_count(&self) -> usize {
        self.blocks.values().filter(|b| b.dirty).count()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_inner(self) -> S {
        self.store
    }

    fn write_back(&mut self) -> Result<()> {
        for (&index, block) in self.blocks.iter_mut().filter(|(_, b)| b.dirty) {
            self.store.write_block(index, &block.data)?;
            block.dirty = false;
        }
        Ok(())
    }

    fn slot(&mut self, index: u32, fill: bool) -> Result<&mut CachedBlock> {
        if index >= self.store.block_count() {
            return Err(FsError::Corrupt(format!(
                "block {index} beyond end of store ({} blocks)",
                self.store.block_count()
            )));
        }
        if !self.blocks.contains_key(&index) && self.blocks.len() >= self.limit {
            debug!("cache: limit {} reached, writing back", self.limit);
            self.write_back()?;
            self.blocks.clear();
        }
        match self.blocks.entry(index) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(v) => {
                let mut data = Box::new([0u8; BLOCK_SIZE]);
                if fill {
                    self.store.read_block(index, &mut data)?;
                }
                Ok(v.insert(CachedBlock { data, dirty: false }))
            }
        }
    }
}
