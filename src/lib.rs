//! mzfs - a minimal block-addressed filesystem engine.
//!
//! Disk layout (1 KiB blocks):
//!   boot | superblock | imap | zmap | inode table | root dir zone | data zones
//!
//! The engine reads and writes through a [`fs::BlockStore`] and exposes
//! inode-level operations; mapping user paths onto them is left to the caller
//! (see the `mzfs` shell binary).

pub mod fs;
