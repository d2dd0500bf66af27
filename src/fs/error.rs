use thiserror::Error;

use crate::fs::consts::NAME_LEN;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("block store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt filesystem: {0}")]
    Corrupt(String),
    #[error("no space left on device")]
    NoSpace,
    #[error("invalid inode number {0}")]
    InvalidInode(u32),
    #[error("no such file or directory")]
    NotFound,
    #[error("entry already exists")]
    NameExists,
    #[error("name longer than {} bytes", NAME_LEN)]
    NameTooLong,
    #[error("invalid file name")]
    InvalidName,
    #[error("logical block {0} is beyond the direct zone limit")]
    OutOfRange(u32),
    #[error("logical block {0} has no zone allocated")]
    HoleNotAllocated(u32),
    #[error("not a directory")]
    NotDirectory,
    #[error("is a directory")]
    IsDirectory,
    #[error("directory not empty")]
    NotEmpty,
    #[error("bitmap index {0} is out of range")]
    BitmapRange(u32),
    #[error("bitmap index {0} is already free")]
    AlreadyFree(u32),
    #[error("filesystem is mounted read-only")]
    ReadOnly,
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
}

pub type Result<T> = std::result::Result<T, FsError>;
