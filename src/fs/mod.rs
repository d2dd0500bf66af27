pub mod bitmap;
pub mod cache;
pub mod config;
pub mod consts;
pub mod data;
pub mod dir;
pub mod error;
pub mod filesystem;
pub mod format;
pub mod inode;
pub mod io;
pub mod layout;
pub mod ops;
pub mod superblock;

pub use bitmap::{Allocator, Bitmap, MapKind};
pub use config::MountOptions;
pub use dir::{DirListing, EntrySlot, ListedEntry};
pub use error::{FsError, Result};
pub use filesystem::{Attributes, FileSystem, SetAttr, StatFs};
pub use format::{FormatOptions, format};
pub use inode::Inode;
pub use io::{Block, BlockStore, FileStore, MemStore};
pub use layout::{DirEntry, FileKind, InodeRecord};
pub use superblock::{Geometry, Superblock};
