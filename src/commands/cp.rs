use anyhow::bail;
use mzfs::fs::consts::MAX_FILE_SIZE;

use super::incp::{store_file, target_in};
use crate::context::Context;

/// `cp s1 s2`
///
/// Copies a file inside the filesystem. `s2` may name a new file, an existing
/// file (overwritten) or a directory.
///
/// Outputs: `OK`, `FILE NOT FOUND`, `PATH NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [source, dest] = argv else {
        bail!("usage: cp <source> <dest>");
    };
    let src = context.resolve(source)?;
    let data = context.fs_mut()?.read_bytes(src, 0, MAX_FILE_SIZE as usize)?;
    let (parent, name) = target_in(context, dest, source)?;
    let fs = context.fs_mut()?;
    if fs.lookup(parent, name.as_bytes()).ok() == Some(src) {
        bail!("source and destination are the same file");
    }
    store_file(fs, parent, &name, &data)?;
    println!("OK");
    Ok(())
}
