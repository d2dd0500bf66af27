use std::io::{self, Write};

use anyhow::bail;
use mzfs::fs::consts::MAX_FILE_SIZE;

use crate::context::Context;

/// `cat s1`
///
/// Prints the content of a file (symlinks are followed), decoded as lossy
/// UTF-8.
///
/// Outputs: the content, `FILE NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [path] = argv else {
        bail!("usage: cat <path>");
    };
    let ino = context.resolve(path)?;
    let data = context.fs_mut()?.read_bytes(ino, 0, MAX_FILE_SIZE as usize)?;
    let mut out = io::stdout().lock();
    out.write_all(String::from_utf8_lossy(&data).as_bytes())?;
    if !data.ends_with(b"\n") {
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}
