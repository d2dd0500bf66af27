use crate::fs::consts::{
    BLOCK_SIZE, DEFAULT_INODE_COUNT, FS_MAGIC, IMAP_START, INODES_PER_BLOCK,
    MAP_ENTRIES_PER_BLOCK, MIN_INODE_COUNT,
};
use crate::fs::error::{FsError, Result};

pub const SUPERBLOCK_SIZE: usize = 12;

// Superblock stored in block 1 - 12 B
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub inode_count: u16,     // 2 B (offset 0)
    pub zone_count: u16,      // 2 B (offset 2), every block of the device
    pub imap_blocks: u16,     // 2 B (offset 4)
    pub zmap_blocks: u16,     // 2 B (offset 6)
    pub first_data_zone: u16, // 2 B (offset 8)
    pub magic: u16,           // 2 B (offset 10)
}

impl Superblock {
    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= SUPERBLOCK_SIZE);
        out[0..2].copy_from_slice(&self.inode_count.to_le_bytes());
        out[2..4].copy_from_slice(&self.zone_count.to_le_bytes());
        out[4..6].copy_from_slice(&self.imap_blocks.to_le_bytes());
        out[6..8].copy_from_slice(&self.zmap_blocks.to_le_bytes());
        out[8..10].copy_from_slice(&self.first_data_zone.to_le_bytes());
        out[10..12].copy_from_slice(&self.magic.to_le_bytes());
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert!(inp.len() >= SUPERBLOCK_SIZE);
        let field = |at: usize| u16::from_le_bytes([inp[at], inp[at + 1]]);
        Self {
            inode_count: field(0),
            zone_count: field(2),
            imap_blocks: field(4),
            zmap_blocks: field(6),
            first_data_zone: field(8),
            magic: field(10),
        }
    }

    /// Checks the magic and every layout invariant against a store of `store_blocks` blocks.
    pub fn validate(&self, store_blocks: u32) -> Result<()> {
        if self.magic != FS_MAGIC {
            return Err(FsError::Corrupt(format!("bad magic {}", self.magic)));
        }
        if self.imap_blocks == 0 || self.zmap_blocks == 0 {
            return Err(FsError::Corrupt("empty bitmap region".into()));
        }
        if u32::from(self.inode_count) < 2
            || u32::from(self.inode_count) > self.imap_blocks as u32 * MAP_ENTRIES_PER_BLOCK
        {
            return Err(FsError::Corrupt(format!(
                "inode count {} does not fit {} imap blocks",
                self.inode_count, self.imap_blocks
            )));
        }
        let metadata = IMAP_START + self.imap_blocks as u32 + self.zmap_blocks as u32;
        let first = self.first_data_zone as u32;
        if first < metadata
            || (first - metadata) * (INODES_PER_BLOCK as u32) < self.inode_count as u32
        {
            return Err(FsError::Corrupt(format!(
                "first data zone {first} leaves no room for {} inodes",
                self.inode_count
            )));
        }
        if self.zone_count as u32 <= first {
            return Err(FsError::Corrupt(format!(
                "zone count {} ends before first data zone {first}",
                self.zone_count
            )));
        }
        if self.tracked_zones() > self.zmap_blocks as u32 * MAP_ENTRIES_PER_BLOCK {
            return Err(FsError::Corrupt(format!(
                "{} data zones do not fit {} zmap blocks",
                self.tracked_zones(),
                self.zmap_blocks
            )));
        }
        if self.zone_count as u32 > store_blocks {
            return Err(FsError::Corrupt(format!(
                "zone count {} exceeds store size {store_blocks}",
                self.zone_count
            )));
        }
        Ok(())
    }

    pub fn imap_start(&self) -> u32 {
        IMAP_START
    }

    pub fn zmap_start(&self) -> u32 {
        IMAP_START + self.imap_blocks as u32
    }

    pub fn inode_table_start(&self) -> u32 {
        self.zmap_start() + self.zmap_blocks as u32
    }

    pub fn inode_table_blocks(&self) -> u32 {
        self.first_data_zone as u32 - self.inode_table_start()
    }

    /// Zones the zone bitmap tracks: everything after the root directory zone.
    pub fn tracked_zones(&self) -> u32 {
        (self.zone_count as u32).saturating_sub(self.first_data_zone as u32 + 1)
    }

    /// Block number tracked by zone bitmap index `index`.
    pub fn zone_block(&self, index: u32) -> u32 {
        self.first_data_zone as u32 + 1 + index
    }

    /// Zone bitmap index of `block`, if the bitmap tracks it.
    pub fn zone_index(&self, block: u32) -> Option<u32> {
        let first = self.first_data_zone as u32 + 1;
        (block >= first && block < self.zone_count as u32).then(|| block - first)
    }
}

/// Device shape requested at format time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub inode_count: u32,
    pub zone_count: u32,
}

impl Geometry {
    pub fn new(inode_count: u32, zone_count: u32) -> Self {
        Self {
            inode_count,
            zone_count,
        }
    }

    /// Derives a geometry from a device size in bytes: one inode per two zones,
    /// clamped to a sane range.
    pub fn for_capacity(bytes: u64) -> Result<Self> {
        let zones = bytes / BLOCK_SIZE as u64;
        if zones > u16::MAX as u64 {
            return Err(FsError::InvalidArgument("device too large"));
        }
        let zones = zones as u32;
        let inodes = (zones / 2).clamp(MIN_INODE_COUNT, DEFAULT_INODE_COUNT);
        Ok(Self::new(inodes, zones))
    }

    /// Sizes a device so that exactly `data_zones` zones follow the metadata,
    /// the root directory zone included.
    pub fn with_data_zones(inode_count: u32, data_zones: u32) -> Result<Self> {
        let mut geometry = Self::new(inode_count, data_zones);
        // zmap size depends on the total, so settle it by iterating.
        for _ in 0..4 {
            let layout = geometry.metadata_blocks();
            geometry.zone_count = layout + data_zones;
        }
        geometry.layout()?;
        Ok(geometry)
    }

    fn metadata_blocks(&self) -> u32 {
        let imap = self.inode_count.div_ceil(MAP_ENTRIES_PER_BLOCK);
        let zmap = self.zone_count.div_ceil(MAP_ENTRIES_PER_BLOCK).max(1);
        let itable = self.inode_count.div_ceil(INODES_PER_BLOCK as u32);
        IMAP_START + imap + zmap + itable
    }

    /// Computes the superblock for this geometry.
    pub fn layout(&self) -> Result<Superblock> {
        if self.inode_count < 2 {
            return Err(FsError::InvalidArgument("at least two inodes are required"));
        }
        if self.inode_count > u16::MAX as u32 || self.zone_count > u16::MAX as u32 {
            return Err(FsError::InvalidArgument("counts must fit 16 bits"));
        }
        let imap_blocks = self.inode_count.div_ceil(MAP_ENTRIES_PER_BLOCK);
        let zmap_blocks = self.zone_count.div_ceil(MAP_ENTRIES_PER_BLOCK).max(1);
        let first_data_zone = self.metadata_blocks();
        if self.zone_count <= first_data_zone {
            return Err(FsError::InvalidArgument("device too small for its metadata"));
        }
        Ok(Superblock {
            inode_count: self.inode_count as u16,
            zone_count: self.zone_count as u16,
            imap_blocks: imap_blocks as u16,
            zmap_blocks: zmap_blocks as u16,
            first_data_zone: first_data_zone as u16,
            magic: FS_MAGIC,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_places_first_data_zone_after_metadata() {
        let sb = Geometry::new(1024, 2048).layout().unwrap();
        assert_eq!(sb.imap_blocks, 1);
        assert_eq!(sb.zmap_blocks, 2);
        // 1024 inodes at 15 per block
        assert_eq!(sb.inode_table_blocks(), 69);
        assert_eq!(
            sb.first_data_zone as u32,
            2 + sb.imap_blocks as u32 + sb.zmap_blocks as u32 + sb.inode_table_blocks()
        );
        assert!(sb.validate(2048).is_ok());
    }

    #[test]
    fn superblock_survives_serialization() {
        let sb = Geometry::new(16, 20).layout().unwrap();
        let mut block = [0u8; BLOCK_SIZE];
        sb.serialize(&mut block);
        assert_eq!(&block[10..12], &FS_MAGIC.to_le_bytes());
        assert_eq!(Superblock::deserialize(&block), sb);
    }

    #[test]
    fn wrong_magic_is_corrupt() {
        let mut sb = Geometry::new(16, 20).layout().unwrap();
        sb.magic = 0xBEEF;
        assert!(matches!(sb.validate(20), Err(FsError::Corrupt(_))));
    }

    #[test]
    fn superblock_larger_than_store_is_corrupt() {
        let sb = Geometry::new(16, 20).layout().unwrap();
        assert!(matches!(sb.validate(19), Err(FsError::Corrupt(_))));
    }

    #[test]
    fn with_data_zones_leaves_requested_zones() {
        let geometry = Geometry::with_data_zones(16, 8).unwrap();
        let sb = geometry.layout().unwrap();
        assert_eq!(sb.zone_count - sb.first_data_zone, 8);
        assert_eq!(sb.tracked_zones(), 7);
        assert_eq!(sb.zone_block(0), sb.first_data_zone as u32 + 1);
        assert_eq!(sb.zone_index(sb.first_data_zone as u32), None);
        assert_eq!(sb.zone_index(sb.first_data_zone as u32 + 3), Some(2));
    }

    #[test]
    fn tiny_devices_are_rejected() {
        assert!(matches!(
            Geometry::new(16, 5).layout(),
            Err(FsError::InvalidArgument(_))
        ));
        assert!(Geometry::for_capacity(128 * 1024 * 1024).is_err());
    }

    #[test]
    fn capacity_scales_inode_count() {
        let small = Geometry::for_capacity(64 * 1024).unwrap();
        assert_eq!(small.zone_count, 64);
        assert_eq!(small.inode_count, 32);
        let big = Geometry::for_capacity(8 * 1024 * 1024).unwrap();
        assert_eq!(big.inode_count, DEFAULT_INODE_COUNT);
    }
}
