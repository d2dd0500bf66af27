pub const FS_MAGIC: u16 = 2020;
pub const BLOCK_SIZE: usize = 1024;

pub const SUPERBLOCK_BLOCK: u32 = 1;
pub const IMAP_START: u32 = 2;

pub const ROOT_INO: u32 = 1;

// One byte per tracked item, so a bitmap block covers BLOCK_SIZE items.
pub const MAP_ENTRIES_PER_BLOCK: u32 = BLOCK_SIZE as u32;

pub const INODE_SIZE: usize = 68;
pub const INODES_PER_BLOCK: usize = BLOCK_SIZE / INODE_SIZE; // 15
pub const DIRECT_ZONES: usize = 10;
pub const MAX_FILE_SIZE: u64 = (DIRECT_ZONES * BLOCK_SIZE) as u64;

pub const NAME_LEN: usize = 50;
pub const DIR_ENTRY_SIZE: usize = 2 + NAME_LEN; // 52
pub const ENTRIES_PER_BLOCK: usize = BLOCK_SIZE / DIR_ENTRY_SIZE; // 19
pub const MAX_SYMLINK_LEN: usize = NAME_LEN - 1;

pub const DEFAULT_INODE_COUNT: u32 = 1024;
pub const MIN_INODE_COUNT: u32 = 16;
pub const DEFAULT_CACHE_BLOCKS: usize = 256;
