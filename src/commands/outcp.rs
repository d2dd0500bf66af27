use anyhow::{Context as _, bail};
use mzfs::fs::consts::MAX_FILE_SIZE;

use crate::context::Context;

/// `outcp s1 s2`
///
/// Copies the filesystem file `s1` out to the host path `s2`.
///
/// Outputs: `OK`, `FILE NOT FOUND`, `PATH NOT FOUND` (host path not writable).
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [source, host] = argv else {
        bail!("usage: outcp <path> <host file>");
    };
    let ino = context.resolve(source)?;
    let data = context.fs_mut()?.read_bytes(ino, 0, MAX_FILE_SIZE as usize)?;
    std::fs::write(host, &data).with_context(|| format!("PATH NOT FOUND: {host}"))?;
    println!("OK");
    Ok(())
}
