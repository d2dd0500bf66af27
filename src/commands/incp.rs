use anyhow::{Context as _, bail};
use mzfs::fs::consts::MAX_FILE_SIZE;
use mzfs::fs::{FileStore, FileSystem, FsError};

use crate::context::Context;

/// `incp s1 s2`
///
/// Copies the host file `s1` into the filesystem as `s2`. An existing regular
/// file `s2` is overwritten; a directory `s2` receives the file under its host
/// name.
///
/// Outputs:
///   OK
///   FILE NOT FOUND  (s1 unreadable)
///   PATH NOT FOUND  (parent of s2 missing)
///   FILE TOO LARGE  (more than ten blocks)
pub fn handle_argv(argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let [host, dest] = argv else {
        bail!("usage: incp <host file> <path>");
    };
    let data = std::fs::read(host)
        .map_err(|_| FsError::NotFound)
        .with_context(|| format!("cannot read {host}"))?;
    let (parent, name) = target_in(context, dest, host)?;
    store_file(context.fs_mut()?, parent, &name, &data)?;
    println!("OK");
    Ok(())
}

/// Parent directory and name for a copy into `dest`; a directory `dest` keeps
/// the source's basename.
pub fn target_in(context: &mut Context, dest: &str, source: &str) -> anyhow::Result<(u32, String)> {
    if let Ok(ino) = context.resolve(dest) {
        if context.fs_mut()?.stat(ino)?.kind == mzfs::fs::FileKind::Directory {
            let base = source
                .trim_end_matches('/')
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(source);
            return Ok((ino, base.to_string()));
        }
    }
    context.resolve_parent(dest)
}

/// Writes `data` as `dir/name`, replacing the content of an existing file.
pub fn store_file(fs: &mut FileSystem<FileStore>, dir: u32, name: &str, data: &[u8]) -> anyhow::Result<()> {
    if data.len() as u64 > MAX_FILE_SIZE {
        return Err(FsError::OutOfRange((data.len() / mzfs::fs::consts::BLOCK_SIZE) as u32).into());
    }
    let ino = match fs.lookup(dir, name.as_bytes()) {
        Ok(ino) => {
            fs.truncate(ino)?;
            ino
        }
        Err(FsError::NotFound) => fs.create(dir, name.as_bytes(), 0o644)?,
        Err(e) => return Err(e.into()),
    };
    fs.write_bytes(ino, 0, data)?;
    Ok(())
}
