//! Block store seam: everything the engine knows about the backing medium.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::fs::consts::BLOCK_SIZE;
use crate::fs::error::Result;

pub type Block = [u8; BLOCK_SIZE];

/// A dense array of fixed-size blocks, indexed from 0.
///
/// Every call may block; the engine imposes no timeout or retry of its own.
pub trait BlockStore {
    fn block_count(&self) -> u32;

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()>;

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

fn out_of_bounds(index: u32, count: u32) -> io::Error {
    io::Error::new(
        io::ErrorKind::UnexpectedEof,
        format!("block {index} beyond end of store ({count} blocks)"),
    )
}

/// RAM disk.
#[derive(Debug, Clone)]
pub struct MemStore {
    bytes: Vec<u8>,
}

impl MemStore {
    pub fn new(blocks: u32) -> Self {
        Self {
            bytes: vec![0u8; blocks as usize * BLOCK_SIZE],
        }
    }

    /// Wraps an existing image; a trailing partial block is ignored.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    fn span(&self, index: u32) -> io::Result<std::ops::Range<usize>> {
        if index >= self.block_count() {
            return Err(out_of_bounds(index, self.block_count()));
        }
        let start = index as usize * BLOCK_SIZE;
        Ok(start..start + BLOCK_SIZE)
    }
}

impl BlockStore for MemStore {
    fn block_count(&self) -> u32 {
        (self.bytes.len() / BLOCK_SIZE) as u32
    }

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()> {
        let span = self.span(index)?;
        buf.copy_from_slice(&self.bytes[span]);
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()> {
        let span = self.span(index)?;
        self.bytes[span].copy_from_slice(buf);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Image file on the host filesystem.
#[derive(Debug)]
pub struct FileStore {
    file: File,
    blocks: u32,
}

impl FileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let blocks = (file.metadata()?.len() / BLOCK_SIZE as u64) as u32;
        Ok(Self { file, blocks })
    }

    /// Creates (or truncates) the image and sizes it to `blocks` zeroed blocks.
    pub fn create<P: AsRef<Path>>(path: P, blocks: u32) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.set_len(blocks as u64 * BLOCK_SIZE as u64)?;
        Ok(Self { file, blocks })
    }

    fn seek_to(&mut self, index: u32) -> io::Result<()> {
        if index >= self.blocks {
            return Err(out_of_bounds(index, self.blocks));
        }
        self.file
            .seek(SeekFrom::Start(index as u64 * BLOCK_SIZE as u64))?;
        Ok(())
    }
}

impl BlockStore for FileStore {
    fn block_count(&self) -> u32 {
        self.blocks
    }

    fn read_block(&mut self, index: u32, buf: &mut Block) -> Result<()> {
        self.seek_to(index)?;
        self.file.read_exact(buf)?;
        Ok(())
    }

    fn write_block(&mut self, index: u32, buf: &Block) -> Result<()> {
        self.seek_to(index)?;
        self.file.write_all(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.file.flush()?;
        self.file.sync_data()?;
        Ok(())
    }
}
