//! `format` command.
//!
//! Usage:
//!   format <SIZE>
//!
//! SIZE takes a B, KB or MB suffix (powers of 1024), e.g. `600KB`, `20MB`.
//!
//! Output:
//!   OK
//!   CANNOT CREATE FILE
//!
//! Recreates the image file at the requested size, lays out a fresh
//! filesystem on it and mounts it. The working directory goes back to `/`.
use anyhow::{anyhow, bail};
use log::info;
use mzfs::fs::consts::BLOCK_SIZE;
use mzfs::fs::{FileStore, FileSystem, FormatOptions, MountOptions, format};

use crate::context::Context;

pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [size] = argv else {
        bail!("usage: format <SIZE>");
    };
    let bytes = parse_size(size).ok_or_else(|| anyhow!("CANNOT CREATE FILE"))?;
    let path = context
        .fs_path()
        .map(|p| p.to_path_buf())
        .ok_or_else(|| anyhow!("CANNOT CREATE FILE"))?;

    // flush and drop the old mount before the file is truncated under it
    context.close_fs()?;

    let options = FormatOptions::for_capacity(bytes).map_err(|_| anyhow!("CANNOT CREATE FILE"))?;
    let mut store = FileStore::create(&path, options.geometry.zone_count)
        .map_err(|_| anyhow!("CANNOT CREATE FILE"))?;
    let sb = format(&mut store, &options).map_err(|e| {
        info!("format of {} failed: {e}", path.display());
        anyhow!("CANNOT CREATE FILE")
    })?;
    info!(
        "{}: {} blocks of {BLOCK_SIZE} B, {} inodes",
        path.display(),
        sb.zone_count,
        sb.inode_count
    );
    context.attach(FileSystem::mount(store, MountOptions::default())?);
    println!("OK");
    Ok(())
}

/// Parses a size like "600KB", "20MB" or "65536B".
fn parse_size(s: &str) -> Option<u64> {
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num, unit) = s.split_at(split);
    let base: u64 = num.parse().ok()?;
    let mul = match unit.to_ascii_uppercase().as_str() {
        "" | "B" => 1,
        "KB" => 1_024,
        "MB" => 1_024 * 1_024,
        "GB" => 1_024 * 1_024 * 1_024,
        _ => return None,
    };
    base.checked_mul(mul)
}
