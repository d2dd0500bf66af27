//! Name-level operations composed from the inode, directory and data layers.
//!
//! Each operation rolls back what it can when a later step fails; writes that
//! already reached the cache are not undone.

use log::{debug, warn};

use crate::fs::consts::{DIR_ENTRY_SIZE, MAX_SYMLINK_LEN, ROOT_INO};
use crate::fs::dir::{DirListing, ListedEntry};
use crate::fs::error::{FsError, Result};
use crate::fs::filesystem::FileSystem;
use crate::fs::inode::Inode;
use crate::fs::io::BlockStore;
use crate::fs::layout::{DirEntry, FileKind, check_name, is_dot_or_dotdot};

impl<S: BlockStore> FileSystem<S> {
    /// Inode number behind `name` in directory `dir`.
    pub fn lookup(&mut self, dir: u32, name: &[u8]) -> Result<u32> {
        let parent = self.dir_inode(dir)?;
        match self.find_entry(&parent, name)? {
            Some((entry, _)) => Ok(entry.ino()),
            None => Err(FsError::NotFound),
        }
    }

    /// Validates a new name and makes sure `parent` does not hold it yet.
    fn check_new_name(&mut self, parent: &Inode, name: &[u8]) -> Result<()> {
        if is_dot_or_dotdot(name) {
            return Err(FsError::NameExists);
        }
        check_name(name)?;
        if self.find_entry(parent, name)?.is_some() {
            return Err(FsError::NameExists);
        }
        Ok(())
    }

    /// Undoes a half-built inode.
    fn discard_inode(&mut self, inode: &mut Inode, cause: &FsError) {
        warn!("rollback: releasing inode {} after {cause}", inode.ino());
        if let Err(e) = self.truncate_blocks(inode) {
            warn!("rollback: could not release blocks of {}: {e}", inode.ino());
        }
        if let Err(e) = self.free_inode(inode.ino()) {
            warn!("rollback: could not free inode {}: {e}", inode.ino());
        }
    }

    fn adjust_links(&mut self, ino: u32, delta: i32) -> Result<u16> {
        let mut inode = self.live_inode(ino)?;
        let links = i32::from(inode.record().nlinks) + delta;
        let links = u16::try_from(links.max(0)).map_err(|_| FsError::InvalidArgument("too many links"))?;
        inode.record_mut().nlinks = links;
        inode.touch_changed();
        self.write_inode(&mut inode)?;
        Ok(links)
    }

    /// Links a new inode into `parent`, freeing it again when that fails.
    fn attach(&mut self, parent: &mut Inode, name: &[u8], child: &mut Inode) -> Result<u32> {
        if let Err(e) = self.write_inode(child) {
            self.discard_inode(child, &e);
            return Err(e);
        }
        if let Err(e) = self.insert_entry(parent, name, child.ino()) {
            self.discard_inode(child, &e);
            return Err(e);
        }
        Ok(child.ino())
    }

    pub fn create(&mut self, dir: u32, name: &[u8], perm: u16) -> Result<u32> {
        self.mknod(dir, name, FileKind::Regular, perm, 0)
    }

    /// Creates a regular file or special file; `rdev` is kept for devices only.
    pub fn mknod(&mut self, dir: u32, name: &[u8], kind: FileKind, perm: u16, rdev: u16) -> Result<u32> {
        self.ensure_writable()?;
        if matches!(kind, FileKind::Directory | FileKind::Symlink) {
            return Err(FsError::InvalidArgument("use mkdir or symlink"));
        }
        let mut parent = self.dir_inode(dir)?;
        self.check_new_name(&parent, name)?;

        let mut child = self.allocate_inode(kind, perm)?;
        if kind.is_device() {
            child.record_mut().rdev = rdev;
        }
        let ino = self.attach(&mut parent, name, &mut child)?;
        debug!("mknod: {:?} {} in {dir} -> {ino}", kind, String::from_utf8_lossy(name));
        Ok(ino)
    }

    /// Creates a symbolic link whose target is stored in its first block.
    pub fn symlink(&mut self, dir: u32, name: &[u8], target: &[u8]) -> Result<u32> {
        self.ensure_writable()?;
        if target.is_empty() {
            return Err(FsError::InvalidArgument("empty symlink target"));
        }
        if target.len() > MAX_SYMLINK_LEN {
            return Err(FsError::NameTooLong);
        }
        let mut parent = self.dir_inode(dir)?;
        self.check_new_name(&parent, name)?;

        let mut link = self.allocate_inode(FileKind::Symlink, 0o777)?;
        let stored = self.map_block(&mut link, 0, true).and_then(|block| {
            let data = self.cache.modify(block)?;
            data[..target.len()].copy_from_slice(target);
            Ok(())
        });
        if let Err(e) = stored {
            self.discard_inode(&mut link, &e);
            return Err(e);
        }
        link.record_mut().size = target.len() as u32;
        self.attach(&mut parent, name, &mut link)
    }

    pub fn readlink(&mut self, ino: u32) -> Result<Vec<u8>> {
        let inode = self.live_inode(ino)?;
        if inode.kind() != Some(FileKind::Symlink) {
            return Err(FsError::InvalidArgument("not a symlink"));
        }
        self.read_bytes(ino, 0, inode.size() as usize)
    }

    /// Adds another name for `ino` in `dir`. Directories cannot be linked.
    pub fn link(&mut self, ino: u32, dir: u32, name: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        let target = self.live_inode(ino)?;
        if target.record().is_dir() {
            return Err(FsError::IsDirectory);
        }
        if target.record().nlinks == u16::MAX {
            return Err(FsError::InvalidArgument("too many links"));
        }
        let mut parent = self.dir_inode(dir)?;
        self.check_new_name(&parent, name)?;
        self.insert_entry(&mut parent, name, ino)?;
        self.adjust_links(ino, 1)?;
        Ok(())
    }

    /// Removes a non-directory name; the inode goes away with its last link
    /// and last open reference.
    pub fn unlink(&mut self, dir: u32, name: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        if is_dot_or_dotdot(name) {
            return Err(FsError::IsDirectory);
        }
        let mut parent = self.dir_inode(dir)?;
        let (entry, slot) = self.find_entry(&parent, name)?.ok_or(FsError::NotFound)?;
        let target = self.live_inode(entry.ino())?;
        if target.record().is_dir() {
            return Err(FsError::IsDirectory);
        }
        self.delete_entry(&mut parent, slot)?;
        let left = self.adjust_links(entry.ino(), -1)?;
        debug!("unlink: {entry:?} from {dir}, {left} links left");
        if left == 0 {
            self.reap(entry.ino())?;
        }
        Ok(())
    }

    pub fn mkdir(&mut self, dir: u32, name: &[u8], perm: u16) -> Result<u32> {
        self.ensure_writable()?;
        let mut parent = self.dir_inode(dir)?;
        self.check_new_name(&parent, name)?;
        if parent.record().nlinks == u16::MAX {
            return Err(FsError::InvalidArgument("too many links"));
        }

        let mut child = self.allocate_inode(FileKind::Directory, perm)?;
        child.record_mut().nlinks = 2;
        if let Err(e) = self.init_dir(&mut child, dir) {
            self.discard_inode(&mut child, &e);
            return Err(e);
        }
        let ino = self.attach(&mut parent, name, &mut child)?;
        parent.record_mut().nlinks += 1;
        self.write_inode(&mut parent)?;
        debug!("mkdir: {} in {dir} -> {ino}", String::from_utf8_lossy(name));
        Ok(ino)
    }

    /// Writes "." and ".." into the first block of a new directory.
    fn init_dir(&mut self, child: &mut Inode, parent: u32) -> Result<()> {
        let block = self.map_block(child, 0, true)?;
        let dot = DirEntry::new(b".", child.ino())?;
        let dotdot = DirEntry::new(b"..", parent)?;
        let data = self.cache.modify(block)?;
        dot.serialize(&mut data[..DIR_ENTRY_SIZE]);
        dotdot.serialize(&mut data[DIR_ENTRY_SIZE..2 * DIR_ENTRY_SIZE]);
        child.record_mut().size = 2 * DIR_ENTRY_SIZE as u32;
        Ok(())
    }

    pub fn rmdir(&mut self, dir: u32, name: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        if is_dot_or_dotdot(name) {
            return Err(FsError::InvalidArgument("cannot remove . or .."));
        }
        let mut parent = self.dir_inode(dir)?;
        let (entry, slot) = self.find_entry(&parent, name)?.ok_or(FsError::NotFound)?;
        let mut victim = self.dir_inode(entry.ino())?;
        if !self.is_empty_dir(&victim)? {
            return Err(FsError::NotEmpty);
        }
        self.delete_entry(&mut parent, slot)?;
        parent.record_mut().nlinks = parent.record().nlinks.saturating_sub(1);
        self.write_inode(&mut parent)?;
        victim.record_mut().nlinks = 0;
        victim.touch_changed();
        self.write_inode(&mut victim)?;
        debug!("rmdir: {entry:?} from {dir}");
        self.reap(entry.ino())
    }

    /// True when `ancestor` is `dir` or one of its parents.
    fn is_ancestor(&mut self, ancestor: u32, mut dir: u32) -> Result<bool> {
        for _ in 0..self.sb.inode_count {
            if dir == ancestor {
                return Ok(true);
            }
            if dir == ROOT_INO {
                return Ok(false);
            }
            let inode = self.dir_inode(dir)?;
            dir = self.dotdot(&inode)?.0.ino();
        }
        Err(FsError::Corrupt("directory parent chain does not reach the root".into()))
    }

    /// Moves `old_dir/old_name` to `new_dir/new_name`.
    ///
    /// An existing destination is replaced: its entry is pointed at the
    /// source inode and the replaced inode loses that link, so it is freed
    /// once nothing else holds it. A directory may only replace an empty
    /// directory.
    pub fn rename(&mut self, old_dir: u32, old_name: &[u8], new_dir: u32, new_name: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        if is_dot_or_dotdot(old_name) || is_dot_or_dotdot(new_name) {
            return Err(FsError::InvalidArgument("cannot rename . or .."));
        }
        check_name(new_name)?;
        let src_parent = self.dir_inode(old_dir)?;
        let (src, src_slot) = self.find_entry(&src_parent, old_name)?.ok_or(FsError::NotFound)?;
        let src_ino = src.ino();
        let moving_dir = self.live_inode(src_ino)?.record().is_dir();
        let mut dst_parent = self.dir_inode(new_dir)?;

        if moving_dir && old_dir != new_dir && self.is_ancestor(src_ino, new_dir)? {
            return Err(FsError::InvalidArgument("cannot move a directory into itself"));
        }

        let mut replaced = None;
        match self.find_entry(&dst_parent, new_name)? {
            Some((dst, _)) if dst.ino() == src_ino => return Ok(()),
            Some((dst, dst_slot)) => {
                let victim = self.live_inode(dst.ino())?;
                match (moving_dir, victim.record().is_dir()) {
                    (true, false) => return Err(FsError::NotDirectory),
                    (false, true) => return Err(FsError::IsDirectory),
                    (true, true) if !self.is_empty_dir(&victim)? => return Err(FsError::NotEmpty),
                    _ => {}
                }
                self.set_entry_inode(dst_slot, src_ino)?;
                replaced = Some((dst.ino(), victim.record().is_dir()));
            }
            None => {
                self.insert_entry(&mut dst_parent, new_name, src_ino)?;
            }
        }

        if moving_dir && old_dir != new_dir {
            let moved = self.dir_inode(src_ino)?;
            let (_, slot) = self.dotdot(&moved)?;
            self.set_entry_inode(slot, new_dir)?;
            self.adjust_links(old_dir, -1)?;
            self.adjust_links(new_dir, 1)?;
        }

        let mut src_parent = self.dir_inode(old_dir)?;
        self.delete_entry(&mut src_parent, src_slot)?;
        self.adjust_links(src_ino, 0)?;

        if let Some((victim, was_dir)) = replaced {
            if was_dir {
                self.adjust_links(new_dir, -1)?;
                let mut inode = self.live_inode(victim)?;
                inode.record_mut().nlinks = 0;
                self.write_inode(&mut inode)?;
            } else {
                self.adjust_links(victim, -1)?;
            }
            if self.live_inode(victim)?.record().nlinks == 0 {
                self.reap(victim)?;
            }
        }
        debug!(
            "rename: {old_dir}/{} -> {new_dir}/{}",
            String::from_utf8_lossy(old_name),
            String::from_utf8_lossy(new_name)
        );
        Ok(())
    }

    /// Lists the entries of `dir` from `cursor` to the end.
    pub fn readdir(&mut self, dir: u32, cursor: u64) -> Result<DirListing> {
        let mut entries = Vec::new();
        let (next_cursor, end) = self.readdir_with(dir, cursor, |entry| {
            entries.push(entry.clone());
            true
        })?;
        Ok(DirListing {
            entries,
            next_cursor,
            end,
        })
    }

    /// Streams the entries of `dir` from `cursor` into `consumer` until it
    /// returns `false`. Returns the cursor to resume from and whether the end
    /// was reached.
    pub fn readdir_with<F>(&mut self, dir: u32, cursor: u64, mut consumer: F) -> Result<(u64, bool)>
    where
        F: FnMut(&ListedEntry) -> bool,
    {
        let inode = self.dir_inode(dir)?;
        self.enumerate(&inode, cursor, |entry, next_cursor| {
            consumer(&ListedEntry {
                ino: entry.ino(),
                name: entry.name_bytes().to_vec(),
                next_cursor,
            })
        })
    }
}
