use crate::fs::consts::DEFAULT_CACHE_BLOCKS;

/// Per-mount settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountOptions {
    pub read_only: bool,
    /// Owner given to inodes created through this mount.
    pub uid: u16,
    pub gid: u16,
    /// Buffer cache size in blocks, bitmaps excluded.
    pub cache_blocks: usize,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            read_only: false,
            uid: 0,
            gid: 0,
            cache_blocks: DEFAULT_CACHE_BLOCKS,
        }
    }
}

impl MountOptions {
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn with_owner(mut self, uid: u16, gid: u16) -> Self {
        self.uid = uid;
        self.gid = gid;
        self
    }

    pub fn with_cache_blocks(mut self, blocks: usize) -> Self {
        self.cache_blocks = blocks;
        self
    }
}
