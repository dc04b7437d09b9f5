//! Tree: orchestrates descent from the root, owns
//! the root address and the bookkeeping counters, and exposes the
//! public `get`/`put`/`remove` surface.

use crate::cache::PageCache;
use crate::error::{Result, TreeError};
use crate::node::NodeOps;
use crate::page::PageView;
use crate::store::ByteStore;

/// `((page_size - 8) / 8) - 1`, rounded down to the nearest even number.
/// Must be even and fit a signed 16-bit `child_count`.
fn max_interior_children(page_size: i64) -> Result<i16> {
    if page_size <= 0 {
        log::error!("page_size {page_size} must be positive");
        return Err(TreeError::CorruptPage {
            address: 0,
            reason: "page_size must be positive".into(),
        });
    }
    let raw = (page_size - 8) / 8 - 1;
    let even = raw - (raw % 2);
    if even <= 0 || even > i16::MAX as i64 {
        log::error!("page_size {page_size} yields an unusable max_interior_children");
        return Err(TreeError::CorruptPage {
            address: 0,
            reason: format!("page_size {page_size} yields an unusable max_interior_children"),
        });
    }
    Ok(even as i16)
}

pub struct Tree<S: ByteStore> {
    cache: PageCache<S>,
    page_size: i64,
    root_address: i64,
    page_count: u32,
    size: u32,
    max_steps_searched: u32,
    max_interior_children: i16,
    allocate_page: Box<dyn FnMut() -> Result<i64>>,
}

impl<S: ByteStore> Tree<S> {
    /// `root_address` must be a multiple of `page_size` and nonzero: `0`
    /// is reserved as the "no parent" sentinel used internally during
    /// splits (page 0 is never a live tree node, the same way a reserved
    /// file header page is never a data page). If the store is not yet
    /// long enough to contain a page at
    /// `root_address`, this constructs the empty-tree representation
    /// there (a zeroed, leaf-flagged page) before returning; otherwise
    /// the existing page content there is trusted as-is (the "reopen an
    /// existing tree" path).
    pub fn new(
        page_size: i64,
        store: S,
        root_address: i64,
        allocate_page: impl FnMut() -> Result<i64> + 'static,
    ) -> Result<Self> {
        let max_interior_children = max_interior_children(page_size)?;
        if root_address == 0 || root_address % page_size != 0 {
            log::error!(
                "root_address {root_address} must be a nonzero multiple of page_size {page_size}"
            );
            return Err(TreeError::CorruptPage {
                address: root_address,
                reason: "root_address must be a nonzero multiple of page_size".into(),
            });
        }

        let mut cache = PageCache::new(store, page_size as usize, None);
        let existing_len = cache.store_mut().len()?;
        if existing_len <= root_address as u64 {
            cache.new_buffer(root_address)?;
            let mut view = PageView::new(root_address);
            view.set_leaf(&mut cache, true)?;
            view.set_child_count(&mut cache, 0)?;
            view.sync(&mut cache)?;
        }

        Ok(Self {
            cache,
            page_size,
            root_address,
            page_count: 1,
            size: 0,
            max_steps_searched: 0,
            max_interior_children,
            allocate_page: Box::new(allocate_page),
        })
    }

    /// With a bounded page cache (see `TreeConfig::cache_capacity`).
    pub fn with_cache_capacity(
        page_size: i64,
        store: S,
        root_address: i64,
        allocate_page: impl FnMut() -> Result<i64> + 'static,
        cache_capacity: usize,
    ) -> Result<Self> {
        let mut tree = Self::new(page_size, store, root_address, allocate_page)?;
        tree.cache = PageCache::new(tree.cache.into_store(), page_size as usize, Some(cache_capacity));
        Ok(tree)
    }

    fn node_ops(&mut self) -> NodeOps<'_, S> {
        NodeOps {
            cache: &mut self.cache,
            allocate_page: &mut *self.allocate_page,
            max_interior_children: self.max_interior_children,
            root_address: &mut self.root_address,
            page_count: &mut self.page_count,
            max_steps_searched: &mut self.max_steps_searched,
        }
    }

    pub fn get(&mut self, key: i32) -> Result<i32> {
        let (pos, leaf_address) = self.node_ops().locate(key, false)?;
        if pos < 0 {
            return Ok(0);
        }
        let mut leaf = PageView::new(leaf_address);
        leaf.address_at(&mut self.cache, pos)
    }

    pub fn put(&mut self, key: i32, value: i32) -> Result<()> {
        if value == 0 {
            return Err(TreeError::InvalidArgument);
        }
        let (pos, leaf_address) = self.node_ops().locate(key, true)?;
        let mut leaf = PageView::new(leaf_address);
        if pos >= 0 {
            leaf.set_address_at(&mut self.cache, pos, value)?;
            leaf.sync(&mut self.cache)?;
        } else {
            let insert_pos = -pos - 1;
            self.node_ops().insert(&mut leaf, key, value, insert_pos)?;
            self.size += 1;
        }
        Ok(())
    }

    pub fn remove(&mut self, _key: i32) -> Result<()> {
        Err(TreeError::Unsupported)
    }

    pub fn set_root_address(&mut self, address: i64) {
        self.root_address = address;
    }

    pub fn root_address(&self) -> i64 {
        self.root_address
    }

    pub fn max_steps_searched(&self) -> u32 {
        self.max_steps_searched
    }

    pub fn set_max_steps_searched(&mut self, value: u32) {
        self.max_steps_searched = value;
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    pub fn page_size(&self) -> i64 {
        self.page_size
    }

    pub fn max_interior_children(&self) -> i16 {
        self.max_interior_children
    }

    /// Walks the tree depth-first from the root and returns all `(key,
    /// value)` pairs in ascending key order. Exists for tests and for
    /// tooling that wants to inspect a tree, not as a core operation.
    pub fn in_order(&mut self) -> Result<Vec<(i32, i32)>> {
        let mut out = Vec::new();
        let root = self.root_address;
        self.walk(root, &mut out)?;
        Ok(out)
    }

    fn walk(&mut self, address: i64, out: &mut Vec<(i32, i32)>) -> Result<()> {
        let mut view = PageView::new(address);
        let n = view.child_count(&mut self.cache)? as i64;
        if view.is_leaf(&mut self.cache)? {
            for i in 0..n {
                let key = view.key_at(&mut self.cache, i)?;
                let value = view.address_at(&mut self.cache, i)?;
                out.push((key, value));
            }
        } else {
            for i in 0..n {
                let child = -(view.address_at(&mut self.cache, i)?) as i64;
                self.walk(child, out)?;
                let key = view.key_at(&mut self.cache, i)?;
                let _ = key; // separators aren't emitted; only leaf entries are
            }
            let last_child = -(view.address_at(&mut self.cache, n)?) as i64;
            self.walk(last_child, out)?;
        }
        Ok(())
    }
}
