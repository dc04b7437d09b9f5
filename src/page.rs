//! PageView: interprets a cached page buffer as a B-tree node —
//! header flags, child count, and an array of packed 8-byte entries — and
//! provides typed getters/setters that go through the `PageCache`.

use byteorder::{BigEndian, ByteOrder};

use crate::cache::PageCache;
use crate::error::{Result, TreeError};
use crate::store::ByteStore;

const HEADER_SIZE: i64 = 8;
const ENTRY_SIZE: i64 = 8;
const LEAF_FLAG: u8 = 0b0000_0001;

/// A cursor seated on a page address. Caches the header fields it reads
/// most often (leaf flag, child count) until the cursor is re-seated on a
/// different address.
pub struct PageView {
    address: i64,
    cached_leaf: Option<bool>,
    cached_child_count: Option<i16>,
}

impl PageView {
    pub fn new(address: i64) -> Self {
        Self {
            address,
            cached_leaf: None,
            cached_child_count: None,
        }
    }

    pub fn address(&self) -> i64 {
        self.address
    }

    /// Re-seat the cursor on a different page. Invalidates cached header
    /// fields; a no-op when re-seating on the same address.
    pub fn seat(&mut self, address: i64) {
        if address != self.address {
            self.address = address;
            self.cached_leaf = None;
            self.cached_child_count = None;
        }
    }

    pub fn flags<S: ByteStore>(&self, cache: &mut PageCache<S>) -> Result<u8> {
        Ok(cache.get_buffer(self.address)?[0])
    }

    pub fn set_flags<S: ByteStore>(&mut self, cache: &mut PageCache<S>, bits: u8) -> Result<()> {
        cache.get_buffer(self.address)?[0] = bits;
        self.cached_leaf = Some(bits & LEAF_FLAG != 0);
        Ok(())
    }

    pub fn is_leaf<S: ByteStore>(&mut self, cache: &mut PageCache<S>) -> Result<bool> {
        if let Some(leaf) = self.cached_leaf {
            return Ok(leaf);
        }
        let flags = self.flags(cache)?;
        if flags & !LEAF_FLAG != 0 {
            log::error!("corrupt page at {}: unexpected flag bits {flags:#04x}", self.address);
            return Err(TreeError::CorruptPage {
                address: self.address,
                reason: format!("unexpected flag bits set: {flags:#04x}"),
            });
        }
        let leaf = flags & LEAF_FLAG != 0;
        self.cached_leaf = Some(leaf);
        Ok(leaf)
    }

    pub fn set_leaf<S: ByteStore>(&mut self, cache: &mut PageCache<S>, leaf: bool) -> Result<()> {
        let bits = if leaf { LEAF_FLAG } else { 0 };
        self.set_flags(cache, bits)
    }

    pub fn child_count<S: ByteStore>(&mut self, cache: &mut PageCache<S>) -> Result<i16> {
        if let Some(n) = self.cached_child_count {
            return Ok(n);
        }
        let buf = cache.get_buffer(self.address)?;
        let n = BigEndian::read_i16(&buf[1..3]);
        if n < 0 {
            log::error!("corrupt page at {}: negative child_count {n}", self.address);
            return Err(TreeError::CorruptPage {
                address: self.address,
                reason: format!("negative child_count: {n}"),
            });
        }
        self.cached_child_count = Some(n);
        Ok(n)
    }

    pub fn set_child_count<S: ByteStore>(&mut self, cache: &mut PageCache<S>, n: i16) -> Result<()> {
        let buf = cache.get_buffer(self.address)?;
        BigEndian::write_i16(&mut buf[1..3], n);
        self.cached_child_count = Some(n);
        Ok(())
    }

    pub fn entry_offset(&self, i: i64) -> i64 {
        self.address + HEADER_SIZE + i * ENTRY_SIZE
    }

    fn local_entry_offset(&self, i: i64) -> usize {
        (HEADER_SIZE + i * ENTRY_SIZE) as usize
    }

    pub fn address_at<S: ByteStore>(&mut self, cache: &mut PageCache<S>, i: i64) -> Result<i32> {
        let off = self.local_entry_offset(i);
        let buf = cache.get_buffer(self.address)?;
        Ok(BigEndian::read_i32(&buf[off..off + 4]))
    }

    pub fn set_address_at<S: ByteStore>(
        &mut self,
        cache: &mut PageCache<S>,
        i: i64,
        value: i32,
    ) -> Result<()> {
        let off = self.local_entry_offset(i);
        let buf = cache.get_buffer(self.address)?;
        BigEndian::write_i32(&mut buf[off..off + 4], value);
        Ok(())
    }

    pub fn key_at<S: ByteStore>(&mut self, cache: &mut PageCache<S>, i: i64) -> Result<i32> {
        let off = self.local_entry_offset(i) + 4;
        let buf = cache.get_buffer(self.address)?;
        Ok(BigEndian::read_i32(&buf[off..off + 4]))
    }

    pub fn set_key_at<S: ByteStore>(
        &mut self,
        cache: &mut PageCache<S>,
        i: i64,
        value: i32,
    ) -> Result<()> {
        let off = self.local_entry_offset(i) + 4;
        let buf = cache.get_buffer(self.address)?;
        BigEndian::write_i32(&mut buf[off..off + 4], value);
        Ok(())
    }

    /// Moves `count` 8-byte entries from `src_index` to `dst_index` within
    /// this page. `copy_within` gives us overlap-safe memmove semantics
    /// without a hand-rolled scratch buffer.
    pub fn copy_entries<S: ByteStore>(
        &mut self,
        cache: &mut PageCache<S>,
        src_index: i64,
        dst_index: i64,
        count: i64,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let src = self.local_entry_offset(src_index);
        let dst = self.local_entry_offset(dst_index);
        let len = (count * ENTRY_SIZE) as usize;
        let buf = cache.get_buffer(self.address)?;
        buf.copy_within(src..src + len, dst);
        Ok(())
    }

    pub fn sync<S: ByteStore>(&self, cache: &mut PageCache<S>) -> Result<()> {
        cache.writeback(self.address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FileByteStore;

    fn new_cache() -> PageCache<FileByteStore> {
        let dir = tempfile::tempdir().unwrap();
        let store = FileByteStore::open(dir.path().join("page.bin")).unwrap();
        std::mem::forget(dir);
        PageCache::new(store, 128, None)
    }

    #[test]
    fn leaf_flag_round_trips_and_caches() {
        let mut cache = new_cache();
        cache.new_buffer(0).unwrap();
        let mut view = PageView::new(0);
        view.set_leaf(&mut cache, true).unwrap();
        assert!(view.is_leaf(&mut cache).unwrap());
        // Corrupt the underlying buffer directly; the cached value must
        // still be returned until the cursor re-seats.
        cache.get_buffer(0).unwrap()[0] = 0;
        assert!(view.is_leaf(&mut cache).unwrap());
        view.seat(0); // same address: cache retained by design
        assert!(view.is_leaf(&mut cache).unwrap());
    }

    #[test]
    fn entries_round_trip() {
        let mut cache = new_cache();
        cache.new_buffer(0).unwrap();
        let mut view = PageView::new(0);
        view.set_address_at(&mut cache, 0, -256).unwrap();
        view.set_key_at(&mut cache, 0, 42).unwrap();
        assert_eq!(view.address_at(&mut cache, 0).unwrap(), -256);
        assert_eq!(view.key_at(&mut cache, 0).unwrap(), 42);
    }

    #[test]
    fn copy_entries_handles_overlap() {
        let mut cache = new_cache();
        cache.new_buffer(0).unwrap();
        let mut view = PageView::new(0);
        for i in 0..4 {
            view.set_key_at(&mut cache, i, (i * 10) as i32).unwrap();
        }
        // Shift entries [0..3) right by one, as insert does.
        view.copy_entries(&mut cache, 0, 1, 3).unwrap();
        assert_eq!(view.key_at(&mut cache, 1).unwrap(), 0);
        assert_eq!(view.key_at(&mut cache, 2).unwrap(), 10);
        assert_eq!(view.key_at(&mut cache, 3).unwrap(), 20);
    }
}
