//! The ByteStore adapter: a thin façade over a byte-addressable
//! backing store. No tree logic lives here — just absolute-offset
//! byte/word/run reads and writes, fixed big-endian regardless of host.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::error::Result;

/// A byte-addressable store the tree can read and write at absolute
/// offsets. Writes are durable up to the next `sync()` the caller issues.
pub trait ByteStore {
    fn read_byte(&mut self, offset: u64) -> Result<u8>;
    fn write_byte(&mut self, offset: u64, value: u8) -> Result<()>;

    fn read_i32(&mut self, offset: u64) -> Result<i32>;
    fn write_i32(&mut self, offset: u64, value: i32) -> Result<()>;

    fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<()>;
    fn write_exact(&mut self, offset: u64, buf: &[u8]) -> Result<()>;

    /// Flush buffered writes to the underlying medium. The tree calls this
    /// only indirectly, via `PageCache::writeback`; it never fsyncs on its
    /// own (durability across process exit is the store's responsibility).
    fn sync(&mut self) -> Result<()>;

    /// Current length of the backing store, in bytes. `Tree::new` uses
    /// this to tell a first-time bootstrap (store shorter than the root
    /// page) from reopening an existing tree.
    fn len(&mut self) -> Result<u64>;
}

/// Reference `ByteStore` backed by a single `std::fs::File`. A write past
/// the current end of file extends it — resizable storage for free,
/// courtesy of the OS, rather than any tree code.
pub struct FileByteStore {
    file: File,
}

impl FileByteStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        Ok(Self { file })
    }
}

impl ByteStore for FileByteStore {
    fn read_byte(&mut self, offset: u64) -> Result<u8> {
        self.file.seek(SeekFrom::Start(offset))?;
        let value = self.file.read_u8().inspect_err(|e| {
            log::error!("storage read failed at offset {offset}: {e}");
        })?;
        Ok(value)
    }

    fn write_byte(&mut self, offset: u64, value: u8) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_u8(value).inspect_err(|e| {
            log::error!("storage write failed at offset {offset}: {e}");
        })?;
        Ok(())
    }

    fn read_i32(&mut self, offset: u64) -> Result<i32> {
        self.file.seek(SeekFrom::Start(offset))?;
        let value = self.file.read_i32::<BigEndian>().inspect_err(|e| {
            log::error!("storage read failed at offset {offset}: {e}");
        })?;
        Ok(value)
    }

    fn write_i32(&mut self, offset: u64, value: i32) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_i32::<BigEndian>(value).inspect_err(|e| {
            log::error!("storage write failed at offset {offset}: {e}");
        })?;
        Ok(())
    }

    fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.read_exact(buf).inspect_err(|e| {
            log::error!("storage read failed at offset {offset}: {e}");
        })?;
        Ok(())
    }

    fn write_exact(&mut self, offset: u64, buf: &[u8]) -> Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(buf).inspect_err(|e| {
            log::error!("storage write failed at offset {offset}: {e}");
        })?;
        Ok(())
    }

    fn sync(&mut self) -> Result<()> {
        self.file.flush().inspect_err(|e| {
            log::error!("storage sync failed: {e}");
        })?;
        Ok(())
    }

    fn len(&mut self) -> Result<u64> {
        let metadata = self.file.metadata().inspect_err(|e| {
            log::error!("storage metadata read failed: {e}");
        })?;
        Ok(metadata.len())
    }
}

/// A bump allocator handing out fresh, `page_size`-aligned page addresses.
/// This is the external page-allocation callback: the tree only ever
/// calls it through a closure, never touches it directly.
pub struct PageAllocator {
    page_size: i64,
    next_address: i64,
}

impl PageAllocator {
    /// `page_count` is the number of pages already in use (including the
    /// initial root), so the first freshly allocated address lands right
    /// after them.
    pub fn starting_after(page_size: i64, page_count: u32) -> Self {
        Self {
            page_size,
            next_address: page_size * page_count as i64,
        }
    }

    pub fn allocate(&mut self) -> Result<i64> {
        let address = self.next_address;
        self.next_address += self.page_size;
        Ok(address)
    }
}
