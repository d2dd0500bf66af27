use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, anyhow};
use log::{info, warn};
use mzfs::fs::{FileKind, FileStore, FileSystem, FsError, MountOptions};

/// Symlinks followed while resolving one path.
const MAX_SYMLINK_DEPTH: u32 = 16;

pub struct Context {
    pub(crate) fs: Option<FileSystem<FileStore>>,
    pub(crate) fs_path: Option<PathBuf>,
    cwd: u32,
}

impl Context {
    pub fn new() -> Self {
        Self {
            fs: None,
            fs_path: None,
            cwd: 0,
        }
    }

    /// Remembers the image at `path` (creating an empty file if needed) and
    /// mounts it when it already holds a filesystem.
    pub fn open_fs<P: AsRef<Path>>(&mut self, path: P) -> anyhow::Result<bool> {
        let path = path.as_ref();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("cannot open image {}", path.display()))?;
        self.fs_path = Some(path.to_path_buf());

        let store = FileStore::open(path)?;
        match FileSystem::mount(store, MountOptions::default()) {
            Ok(fs) => {
                self.attach(fs);
                Ok(true)
            }
            Err(e) => {
                warn!("{} is not mountable ({e}), format it first", path.display());
                Ok(false)
            }
        }
    }

    /// Makes `fs` the current filesystem, starting in its root.
    pub fn attach(&mut self, fs: FileSystem<FileStore>) {
        self.cwd = fs.root();
        self.fs = Some(fs);
    }

    /// Unmounts the current filesystem, writing everything back.
    pub fn close_fs(&mut self) -> anyhow::Result<()> {
        if let Some(fs) = self.fs.take() {
            fs.unmount()?;
            info!("image closed");
        }
        self.cwd = 0;
        Ok(())
    }

    pub fn fs_mut(&mut self) -> anyhow::Result<&mut FileSystem<FileStore>> {
        self.fs
            .as_mut()
            .ok_or_else(|| anyhow!("filesystem is not formatted"))
    }

    pub fn fs_path(&self) -> Option<&Path> {
        self.fs_path.as_deref()
    }

    pub fn cwd(&self) -> u32 {
        self.cwd
    }

    pub fn set_cwd(&mut self, ino: u32) {
        self.cwd = ino;
    }

    /// Resolves `path` to an inode, following every symlink.
    pub fn resolve(&mut self, path: &str) -> anyhow::Result<u32> {
        let cwd = self.cwd;
        let fs = self.fs_mut()?;
        Ok(walk(fs, cwd, path, true, 0)?)
    }

    /// Like [`resolve`](Self::resolve) but a symlink in the last component is
    /// returned itself.
    pub fn resolve_nofollow(&mut self, path: &str) -> anyhow::Result<u32> {
        let cwd = self.cwd;
        let fs = self.fs_mut()?;
        Ok(walk(fs, cwd, path, false, 0)?)
    }

    /// Splits `path` into its resolved parent directory and the final name.
    pub fn resolve_parent(&mut self, path: &str) -> anyhow::Result<(u32, String)> {
        let trimmed = path.trim_end_matches('/');
        let (dir, name) = match trimmed.rsplit_once('/') {
            Some(("", name)) => ("/", name),
            Some((dir, name)) => (dir, name),
            None => (".", trimmed),
        };
        if name.is_empty() {
            return Err(FsError::InvalidName.into());
        }
        let parent = self.resolve(dir)?;
        Ok((parent, name.to_string()))
    }
}

fn walk(
    fs: &mut FileSystem<FileStore>,
    start: u32,
    path: &str,
    follow_last: bool,
    depth: u32,
) -> Result<u32, FsError> {
    let mut current = if path.starts_with('/') { fs.root() } else { start };
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty() && *c != ".").collect();
    for (i, name) in components.iter().enumerate() {
        let dir = current;
        current = fs.lookup(dir, name.as_bytes())?;
        let last = i + 1 == components.len();
        if (!last || follow_last) && fs.stat(current)?.kind == FileKind::Symlink {
            if depth >= MAX_SYMLINK_DEPTH {
                return Err(FsError::InvalidArgument("too many levels of symbolic links"));
            }
            let target = fs.readlink(current)?;
            let target = String::from_utf8_lossy(&target).into_owned();
            current = walk(fs, dir, &target, true, depth + 1)?;
        }
    }
    Ok(current)
}
