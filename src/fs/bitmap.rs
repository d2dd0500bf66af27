//! Byte-per-entry allocation maps for inodes and data zones.
//!
//! A non-zero byte marks an allocated entry. Both maps sit behind a single
//! lock; allocation throughput is not a goal.

use log::debug;
use spin::Mutex;

use crate::fs::consts::{BLOCK_SIZE, MAP_ENTRIES_PER_BLOCK};
use crate::fs::error::{FsError, Result};
use crate::fs::io::{Block, BlockStore};

struct MapBlock {
    location: u32,
    bytes: Box<Block>,
    dirty: bool,
}

/// One bitmap spread across consecutive blocks, tracking `capacity` entries.
pub struct Bitmap {
    blocks: Vec<MapBlock>,
    capacity: u32,
}

impl Bitmap {
    /// Reads `count` bitmap blocks starting at `start`.
    pub fn load<S: BlockStore>(store: &mut S, start: u32, count: u32, capacity: u32) -> Result<Self> {
        let mut blocks = Vec::with_capacity(count as usize);
        for location in start..start + count {
            let mut bytes = Box::new([0u8; BLOCK_SIZE]);
            store.read_block(location, &mut bytes)?;
            blocks.push(MapBlock {
                location,
                bytes,
                dirty: false,
            });
        }
        Self::checked(blocks, capacity)
    }

    /// An all-free bitmap whose blocks will be written at `start..start + count`.
    pub fn zeroed(start: u32, count: u32, capacity: u32) -> Result<Self> {
        let blocks = (start..start + count)
            .map(|location| MapBlock {
                location,
                bytes: Box::new([0u8; BLOCK_SIZE]),
                dirty: true,
            })
            .collect();
        Self::checked(blocks, capacity)
    }

    fn checked(blocks: Vec<MapBlock>, capacity: u32) -> Result<Self> {
        if capacity > blocks.len() as u32 * MAP_ENTRIES_PER_BLOCK {
            return Err(FsError::Corrupt(format!(
                "bitmap of {} blocks cannot track {capacity} entries",
                blocks.len()
            )));
        }
        Ok(Self { blocks, capacity })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn position(&self, index: u32) -> Result<(usize, usize)> {
        if index >= self.capacity {
            return Err(FsError::BitmapRange(index));
        }
        Ok((
            (index / MAP_ENTRIES_PER_BLOCK) as usize,
            (index % MAP_ENTRIES_PER_BLOCK) as usize,
        ))
    }

    pub fn is_set(&self, index: u32) -> Result<bool> {
        let (block, offset) = self.position(index)?;
        Ok(self.blocks[block].bytes[offset] != 0)
    }

    /// Marks `index` allocated regardless of its previous state.
    pub fn set(&mut self, index: u32) -> Result<()> {
        let (block, offset) = self.position(index)?;
        let map = &mut self.blocks[block];
        map.bytes[offset] = 1;
        map.dirty = true;
        Ok(())
    }

    /// Claims the first free entry in (block, offset) order.
    fn claim_first_free(&mut self) -> Option<u32> {
        let mut remaining = self.capacity as usize;
        for (i, map) in self.blocks.iter_mut().enumerate() {
            let span = remaining.min(BLOCK_SIZE);
            if let Some(offset) = map.bytes[..span].iter().position(|&b| b == 0) {
                map.bytes[offset] = 1;
                map.dirty = true;
                return Some(i as u32 * MAP_ENTRIES_PER_BLOCK + offset as u32);
            }
            remaining -= span;
            if remaining == 0 {
                break;
            }
        }
        None
    }

    fn clear(&mut self, index: u32) -> Result<()> {
        let (block, offset) = self.position(index)?;
        let map = &mut self.blocks[block];
        if map.bytes[offset] == 0 {
            return Err(FsError::AlreadyFree(index));
        }
        map.bytes[offset] = 0;
        map.dirty = true;
        Ok(())
    }

    /// Free entries within capacity; trailing bitmap bytes are not counted.
    pub fn free_count(&self) -> u32 {
        let mut remaining = self.capacity as usize;
        let mut free = 0;
        for map in &self.blocks {
            let span = remaining.min(BLOCK_SIZE);
            free += map.bytes[..span].iter().filter(|&&b| b == 0).count() as u32;
            remaining -= span;
        }
        free
    }

    pub fn write_back<S: BlockStore>(&mut self, store: &mut S) -> Result<()> {
        for map in self.blocks.iter_mut().filter(|m| m.dirty) {
            store.write_block(map.location, &map.bytes)?;
            map.dirty = false;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapKind {
    Inode,
    Zone,
}

struct Maps {
    inodes: Bitmap,
    zones: Bitmap,
}

impl Maps {
    fn get(&mut self, kind: MapKind) -> &mut Bitmap {
        match kind {
            MapKind::Inode => &mut self.inodes,
            MapKind::Zone => &mut self.zones,
        }
    }
}

/// The inode and zone bitmaps behind one global allocation lock.
pub struct Allocator {
    maps: Mutex<Maps>,
}

impl Allocator {
    pub fn new(inodes: Bitmap, zones: Bitmap) -> Self {
        Self {
            maps: Mutex::new(Maps { inodes, zones }),
        }
    }

    /// Claims the first free entry of `kind`.
    pub fn allocate(&self, kind: MapKind) -> Result<u32> {
        let index = self.maps.lock().get(kind).claim_first_free();
        match index {
            Some(index) => {
                debug!("alloc: {kind:?} {index} claimed");
                Ok(index)
            }
            None => Err(FsError::NoSpace),
        }
    }

    /// Returns an entry to the free pool; out-of-range or free entries are errors.
    pub fn release(&self, kind: MapKind, index: u32) -> Result<()> {
        self.maps.lock().get(kind).clear(index)?;
        debug!("alloc: {kind:?} {index} released");
        Ok(())
    }

    pub fn mark(&self, kind: MapKind, index: u32) -> Result<()> {
        self.maps.lock().get(kind).set(index)
    }

    pub fn is_allocated(&self, kind: MapKind, index: u32) -> Result<bool> {
        self.maps.lock().get(kind).is_set(index)
    }

    pub fn free_count(&self, kind: MapKind) -> u32 {
        self.maps.lock().get(kind).free_count()
    }

    pub fn capacity(&self, kind: MapKind) -> u32 {
        self.maps.lock().get(kind).capacity()
    }

    /// Writes every dirty bitmap block to `store`.
    pub fn write_back<S: BlockStore>(&self, store: &mut S) -> Result<()> {
        let mut maps = self.maps.lock();
        maps.inodes.write_back(store)?;
        maps.zones.write_back(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::io::MemStore;
    use std::collections::HashSet;

    fn allocator(inodes: u32, zones: u32) -> Allocator {
        Allocator::new(
            Bitmap::zeroed(2, 1, inodes).unwrap(),
            Bitmap::zeroed(3, zones.div_ceil(MAP_ENTRIES_PER_BLOCK).max(1), zones).unwrap(),
        )
    }

    #[test]
    fn allocation_returns_first_free_index() {
        let alloc = allocator(8, 8);
        alloc.mark(MapKind::Inode, 0).unwrap();
        alloc.mark(MapKind::Inode, 1).unwrap();
        assert_eq!(alloc.allocate(MapKind::Inode).unwrap(), 2);
        assert_eq!(alloc.allocate(MapKind::Inode).unwrap(), 3);
        alloc.release(MapKind::Inode, 2).unwrap();
        assert_eq!(alloc.allocate(MapKind::Inode).unwrap(), 2);
        assert_eq!(alloc.allocate(MapKind::Zone).unwrap(), 0);
    }

    #[test]
    fn exhaustion_is_no_space() {
        let alloc = allocator(4, 3);
        for expected in 0..3 {
            assert_eq!(alloc.allocate(MapKind::Zone).unwrap(), expected);
        }
        assert!(matches!(alloc.allocate(MapKind::Zone), Err(FsError::NoSpace)));
        assert_eq!(alloc.free_count(MapKind::Zone), 0);
    }

    #[test]
    fn bad_releases_are_reported() {
        let alloc = allocator(4, 4);
        assert!(matches!(
            alloc.release(MapKind::Zone, 4),
            Err(FsError::BitmapRange(4))
        ));
        assert!(matches!(
            alloc.release(MapKind::Zone, 1),
            Err(FsError::AlreadyFree(1))
        ));
    }

    #[test]
    fn scan_crosses_block_boundaries() {
        let alloc = allocator(4, MAP_ENTRIES_PER_BLOCK + 2);
        for _ in 0..MAP_ENTRIES_PER_BLOCK {
            alloc.allocate(MapKind::Zone).unwrap();
        }
        assert_eq!(alloc.allocate(MapKind::Zone).unwrap(), MAP_ENTRIES_PER_BLOCK);
        assert_eq!(alloc.free_count(MapKind::Zone), 1);
    }

    #[test]
    fn free_count_ignores_trailing_capacity() {
        let alloc = allocator(10, 5);
        assert_eq!(alloc.free_count(MapKind::Inode), 10);
        assert_eq!(alloc.free_count(MapKind::Zone), 5);
    }

    #[test]
    fn concurrent_allocations_are_exclusive() {
        let alloc = allocator(4, 2000);
        let claimed: Vec<u32> = std::thread::scope(|s| {
            let workers: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        (0..200)
                            .map(|_| alloc.allocate(MapKind::Zone).unwrap())
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            workers
                .into_iter()
                .flat_map(|w| w.join().unwrap())
                .collect()
        });
        let unique: HashSet<_> = claimed.iter().copied().collect();
        assert_eq!(unique.len(), claimed.len());
        assert_eq!(alloc.free_count(MapKind::Zone), 2000 - 1600);
    }

    #[test]
    fn dirty_blocks_are_written_back() {
        let mut store = MemStore::new(4);
        let alloc = allocator(4, 4);
        alloc.mark(MapKind::Inode, 1).unwrap();
        alloc.allocate(MapKind::Zone).unwrap();
        alloc.write_back(&mut store).unwrap();

        let reloaded = Bitmap::load(&mut store, 2, 1, 4).unwrap();
        assert!(reloaded.is_set(1).unwrap());
        assert!(!reloaded.is_set(0).unwrap());
        let zones = Bitmap::load(&mut store, 3, 1, 4).unwrap();
        assert_eq!(zones.free_count(), 3);
    }
}
