#![allow(dead_code)]

use mzfs::fs::{FileSystem, FormatOptions, Geometry, MemStore, MountOptions, format};

pub const ROOT: u32 = 1;

/// A freshly formatted RAM disk with `data_zones` zones after the metadata.
pub fn formatted(inodes: u32, data_zones: u32) -> MemStore {
    let geometry = Geometry::with_data_zones(inodes, data_zones).unwrap();
    let mut store = MemStore::new(geometry.zone_count);
    format(&mut store, &FormatOptions::new(geometry)).unwrap();
    store
}

pub fn mounted(inodes: u32, data_zones: u32) -> FileSystem<MemStore> {
    FileSystem::mount(formatted(inodes, data_zones), MountOptions::default()).unwrap()
}

pub fn remount(fs: FileSystem<MemStore>) -> FileSystem<MemStore> {
    let store = fs.unmount().unwrap();
    FileSystem::mount(store, MountOptions::default()).unwrap()
}

/// Entry names of `dir` in on-disk order, "." and ".." included.
pub fn names(fs: &mut FileSystem<MemStore>, dir: u32) -> Vec<String> {
    fs.readdir(dir, 0)
        .unwrap()
        .entries
        .iter()
        .map(|e| e.name_str().into_owned())
        .collect()
}

/// Deterministic non-repeating-per-block test payload.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + i / 1024) as u8).collect()
}
