//! PageCache: maps page address -> an owned, pinned page buffer.
//! Single-threaded, no concurrent access. Unbounded growth is acceptable
//! for correctness; an optional LRU bound (`TreeConfig::cache_capacity`)
//! writes back the evicted page before dropping it, so a bounded cache
//! never silently loses a dirty page.

use lru::LruCache;
use std::num::NonZeroUsize;

use crate::error::Result;
use crate::store::ByteStore;

pub struct PageCache<S: ByteStore> {
    store: S,
    page_size: usize,
    pages: LruCache<i64, Vec<u8>>,
}

impl<S: ByteStore> PageCache<S> {
    pub fn new(store: S, page_size: usize, capacity: Option<usize>) -> Self {
        let pages = match capacity.and_then(NonZeroUsize::new) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        Self {
            store,
            page_size,
            pages,
        }
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Discards cached pages and hands back the underlying store, e.g. to
    /// rebuild this cache with a different capacity.
    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the buffer for an existing page, pulling it from the store
    /// on a miss.
    pub fn get_buffer(&mut self, address: i64) -> Result<&mut Vec<u8>> {
        if !self.pages.contains(&address) {
            log::trace!("page cache miss, reading address {address} from store");
            let mut buf = vec![0u8; self.page_size];
            self.store.read_exact(address as u64, &mut buf)?;
            self.install(address, buf)?;
        } else {
            log::trace!("page cache hit for address {address}");
        }
        Ok(self.pages.get_mut(&address).expect("just ensured present"))
    }

    /// Returns the buffer for a freshly allocated page: zero-filled, never
    /// read from the store (there is nothing there yet for a page the
    /// allocator just handed out).
    pub fn new_buffer(&mut self, address: i64) -> Result<&mut Vec<u8>> {
        let buf = vec![0u8; self.page_size];
        self.install(address, buf)?;
        Ok(self.pages.get_mut(&address).expect("just ensured present"))
    }

    /// Writes the cached buffer for `address` back to the store. Keeps it
    /// cached afterward.
    pub fn writeback(&mut self, address: i64) -> Result<()> {
        log::debug!("writing back page at address {address}");
        let buf = self
            .pages
            .get(&address)
            .expect("writeback of a page not in the cache");
        self.store.write_exact(address as u64, buf)?;
        self.store.sync()?;
        Ok(())
    }

    fn install(&mut self, address: i64, buf: Vec<u8>) -> Result<()> {
        if let Some((evicted_address, evicted_buf)) = self.pages.push(address, buf) {
            if evicted_address != address {
                log::debug!("evicting page at address {evicted_address} from a bounded cache");
                self.store.write_exact(evicted_address as u64, &evicted_buf)?;
                self.store.sync()?;
            }
        }
        Ok(())
    }
}
