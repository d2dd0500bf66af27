use mzfs::fs::{FileStore, FileSystem};

use crate::context::Context;

// pwd: prints the absolute path of the working directory.
// The path is rebuilt on demand by climbing ".." entries and looking up each
// directory's name in its parent, so `cd` never has to track strings.
pub fn handle_argv(_argv: &[&str], context: &mut Context) -> anyhow::Result<()> {
    let cwd = context.cwd();
    let fs = context.fs_mut()?;
    println!("{}", path_of(fs, cwd)?);
    Ok(())
}

pub fn path_of(fs: &mut FileSystem<FileStore>, ino: u32) -> anyhow::Result<String> {
    let root = fs.root();
    let mut components = Vec::new();
    let mut current = ino;
    while current != root {
        let parent = fs.lookup(current, b"..")?;
        let name = fs
            .readdir(parent, 0)?
            .entries
            .into_iter()
            .find(|e| e.ino == current && e.name != b"." && e.name != b"..")
            .map(|e| e.name_str().into_owned())
            .ok_or_else(|| anyhow::anyhow!("directory {current} is not linked from {parent}"))?;
        components.push(name);
        if components.len() > fs.superblock().inode_count as usize {
            anyhow::bail!("directory tree loops above {ino}");
        }
        current = parent;
    }
    components.reverse();
    Ok(format!("/{}", components.join("/")))
}
