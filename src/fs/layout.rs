use crate::fs::consts::{DIR_ENTRY_SIZE, DIRECT_ZONES, INODE_SIZE, NAME_LEN};
use crate::fs::error::{FsError, Result};
use std::borrow::Cow;
use std::fmt;

pub const S_IFMT: u16 = 0o170000;
pub const S_IFSOCK: u16 = 0o140000;
pub const S_IFLNK: u16 = 0o120000;
pub const S_IFREG: u16 = 0o100000;
pub const S_IFBLK: u16 = 0o060000;
pub const S_IFDIR: u16 = 0o040000;
pub const S_IFCHR: u16 = 0o020000;
pub const S_IFIFO: u16 = 0o010000;
pub const PERM_MASK: u16 = 0o7777;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Symlink,
    CharDevice,
    BlockDevice,
    Fifo,
    Socket,
}

impl FileKind {
    pub fn from_mode(mode: u16) -> Option<Self> {
        match mode & S_IFMT {
            S_IFREG => Some(Self::Regular),
            S_IFDIR => Some(Self::Directory),
            S_IFLNK => Some(Self::Symlink),
            S_IFCHR => Some(Self::CharDevice),
            S_IFBLK => Some(Self::BlockDevice),
            S_IFIFO => Some(Self::Fifo),
            S_IFSOCK => Some(Self::Socket),
            _ => None,
        }
    }

    pub fn type_bits(self) -> u16 {
        match self {
            Self::Regular => S_IFREG,
            Self::Directory => S_IFDIR,
            Self::Symlink => S_IFLNK,
            Self::CharDevice => S_IFCHR,
            Self::BlockDevice => S_IFBLK,
            Self::Fifo => S_IFIFO,
            Self::Socket => S_IFSOCK,
        }
    }

    /// Device nodes keep `rdev`; everything else owns data zones.
    pub fn is_device(self) -> bool {
        matches!(self, Self::CharDevice | Self::BlockDevice)
    }

    /// Kinds whose data lives in direct zones.
    pub fn has_data(self) -> bool {
        matches!(self, Self::Regular | Self::Directory | Self::Symlink)
    }
}

// Structure that represents one on-disk inode - 68 B
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InodeRecord {
    pub mode: u16,                   // 2 (offset 0)
    pub nlinks: u16,                 // 2 (offset 2)
    pub uid: u16,                    // 2 (offset 4)
    pub gid: u16,                    // 2 (offset 6)
    pub size: u32,                   // 4 (offset 8)
    pub atime: u32,                  // 4 (offset 12)
    pub mtime: u32,                  // 4 (offset 16)
    pub ctime: u32,                  // 4 (offset 20)
    pub rdev: u16,                   // 2 (offset 24), 2 B padding follows
    pub zones: [u32; DIRECT_ZONES],  // 40 (offset 28..67)
}

impl InodeRecord {
    pub fn new(kind: FileKind, perm: u16) -> Self {
        Self {
            mode: kind.type_bits() | (perm & PERM_MASK),
            ..Self::default()
        }
    }

    pub fn kind(&self) -> Option<FileKind> {
        FileKind::from_mode(self.mode)
    }

    pub fn perm(&self) -> u16 {
        self.mode & PERM_MASK
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == Some(FileKind::Directory)
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), INODE_SIZE);
        out[0..2].copy_from_slice(&self.mode.to_le_bytes());
        out[2..4].copy_from_slice(&self.nlinks.to_le_bytes());
        out[4..6].copy_from_slice(&self.uid.to_le_bytes());
        out[6..8].copy_from_slice(&self.gid.to_le_bytes());
        out[8..12].copy_from_slice(&self.size.to_le_bytes());
        out[12..16].copy_from_slice(&self.atime.to_le_bytes());
        out[16..20].copy_from_slice(&self.mtime.to_le_bytes());
        out[20..24].copy_from_slice(&self.ctime.to_le_bytes());
        out[24..26].copy_from_slice(&self.rdev.to_le_bytes());
        out[26..28].fill(0);
        for (i, zone) in self.zones.iter().enumerate() {
            let at = 28 + i * 4;
            out[at..at + 4].copy_from_slice(&zone.to_le_bytes());
        }
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), INODE_SIZE);
        let u16_at = |at: usize| u16::from_le_bytes([inp[at], inp[at + 1]]);
        let u32_at =
            |at: usize| u32::from_le_bytes([inp[at], inp[at + 1], inp[at + 2], inp[at + 3]]);
        let mut zones = [0u32; DIRECT_ZONES];
        for (i, zone) in zones.iter_mut().enumerate() {
            *zone = u32_at(28 + i * 4);
        }
        Self {
            mode: u16_at(0),
            nlinks: u16_at(2),
            uid: u16_at(4),
            gid: u16_at(6),
            size: u32_at(8),
            atime: u32_at(12),
            mtime: u32_at(16),
            ctime: u32_at(20),
            rdev: u16_at(24),
            zones,
        }
    }
}

/// Validates a single path component for storage in a directory entry.
pub fn check_name(name: &[u8]) -> Result<()> {
    if name.is_empty() || name.contains(&b'/') || name.contains(&0) {
        return Err(FsError::InvalidName);
    }
    if name.len() > NAME_LEN {
        return Err(FsError::NameTooLong);
    }
    Ok(())
}

pub fn is_dot_or_dotdot(name: &[u8]) -> bool {
    name == b"." || name == b".."
}

// Directory record - 52 B
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub inode: u16,
    pub name: [u8; NAME_LEN],
}

impl DirEntry {
    pub fn empty() -> Self {
        Self {
            inode: 0,
            name: [0u8; NAME_LEN],
        }
    }

    pub fn new(name: &[u8], ino: u32) -> Result<Self> {
        check_name(name)?;
        let inode = u16::try_from(ino).map_err(|_| FsError::InvalidInode(ino))?;
        let mut buf = [0u8; NAME_LEN];
        buf[..name.len()].copy_from_slice(name);
        Ok(Self { inode, name: buf })
    }

    /// Tombstone or never-used slot.
    pub fn is_free(&self) -> bool {
        self.inode == 0
    }

    pub fn ino(&self) -> u32 {
        self.inode as u32
    }

    /// Name bytes up to the first NUL; a name filling the buffer has none.
    pub fn name_bytes(&self) -> &[u8] {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(NAME_LEN);
        &self.name[..end]
    }

    pub fn name_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.name_bytes())
    }

    pub fn matches(&self, name: &[u8]) -> bool {
        !self.is_free() && self.name_bytes() == name
    }

    pub fn serialize(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), DIR_ENTRY_SIZE);
        out[0..2].copy_from_slice(&self.inode.to_le_bytes());
        out[2..DIR_ENTRY_SIZE].copy_from_slice(&self.name);
    }

    pub fn deserialize(inp: &[u8]) -> Self {
        debug_assert_eq!(inp.len(), DIR_ENTRY_SIZE);
        let mut name = [0u8; NAME_LEN];
        name.copy_from_slice(&inp[2..DIR_ENTRY_SIZE]);
        Self {
            inode: u16::from_le_bytes([inp[0], inp[1]]),
            name,
        }
    }
}

impl fmt::Debug for DirEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_free() {
            write!(f, "DirEntry(<free>)")
        } else {
            write!(f, "DirEntry({}, inode={})", self.name_str(), self.inode)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inode_record_uses_fixed_offsets() {
        let mut rec = InodeRecord::new(FileKind::Regular, 0o644);
        rec.nlinks = 3;
        rec.size = 0x0102_0304;
        rec.rdev = 0x0A0B;
        rec.zones[0] = 77;
        rec.zones[9] = 0xDEAD_BEEF;

        let mut raw = [0xFFu8; INODE_SIZE];
        rec.serialize(&mut raw);
        assert_eq!(u16::from_le_bytes([raw[0], raw[1]]), S_IFREG | 0o644);
        assert_eq!(&raw[8..12], &0x0102_0304u32.to_le_bytes());
        assert_eq!(&raw[24..28], &[0x0B, 0x0A, 0, 0]);
        assert_eq!(&raw[28..32], &77u32.to_le_bytes());
        assert_eq!(&raw[64..68], &0xDEAD_BEEFu32.to_le_bytes());
        assert_eq!(InodeRecord::deserialize(&raw), rec);
    }

    #[test]
    fn mode_decodes_kind_and_permissions() {
        let rec = InodeRecord::new(FileKind::Directory, 0o40755);
        assert_eq!(rec.kind(), Some(FileKind::Directory));
        assert_eq!(rec.perm(), 0o755);
        assert_eq!(InodeRecord::default().kind(), None);
        assert!(FileKind::CharDevice.is_device());
        assert!(!FileKind::Fifo.has_data());
    }

    #[test]
    fn full_length_name_has_no_terminator() {
        let name = [b'x'; NAME_LEN];
        let entry = DirEntry::new(&name, 5).unwrap();
        let mut raw = [0u8; DIR_ENTRY_SIZE];
        entry.serialize(&mut raw);
        assert_eq!(raw[DIR_ENTRY_SIZE - 1], b'x');
        let back = DirEntry::deserialize(&raw);
        assert_eq!(back.name_bytes().len(), NAME_LEN);
        assert!(back.matches(&name));
    }

    #[test]
    fn name_validation() {
        assert!(matches!(DirEntry::new(b"", 2), Err(FsError::InvalidName)));
        assert!(matches!(DirEntry::new(b"a/b", 2), Err(FsError::InvalidName)));
        assert!(matches!(
            DirEntry::new(&[b'y'; NAME_LEN + 1], 2),
            Err(FsError::NameTooLong)
        ));
        assert!(matches!(
            DirEntry::new(b"big", 70_000),
            Err(FsError::InvalidInode(70_000))
        ));
    }

    #[test]
    fn free_slots_never_match() {
        let mut entry = DirEntry::new(b"a", 3).unwrap();
        assert!(entry.matches(b"a"));
        entry.inode = 0;
        assert!(!entry.matches(b"a"));
        assert_eq!(format!("{entry:?}"), "DirEntry(<free>)");
    }
}
