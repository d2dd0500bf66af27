use anyhow::bail;
use mzfs::fs::{FileKind, FsError};

use crate::context::Context;

/// `cd a1`
///
/// Changes the working directory. Symlinks along the way are followed.
///
/// Outputs: `OK`, `PATH NOT FOUND`.
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let path = match argv {
        [] => "/",
        [path] => *path,
        _ => bail!("usage: cd [path]"),
    };
    let ino = context.resolve(path)?;
    if context.fs_mut()?.stat(ino)?.kind != FileKind::Directory {
        return Err(FsError::NotDirectory.into());
    }
    context.set_cwd(ino);
    println!("OK");
    Ok(())
}
