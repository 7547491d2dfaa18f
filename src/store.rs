//! The B-tree descriptor and in-order traversal over it.
//!
//! A `Store` borrows the [`Allocator`] for its whole lifetime (it never
//! outlives it) the same way a [`Block`](crate::block::Block) does, and
//! is constructed by following the well-known `DSDB` table-of-contents
//! entry to the store header block.

use glob::Pattern;

use crate::allocator::Allocator;
use crate::entry::Entry;
use crate::error::{Error, Result};

const STORE_TOC_NAME: &str = "DSDB";

/// The B-tree root descriptor: which block the root node lives in, the
/// tree's depth and record/node counts, and the page size used to decide
/// when a node needs splitting on write (`minUsage = 2 * pageSize`).
pub struct Store<'a> {
    allocator: &'a Allocator,
    root_block_id: u32,
    levels: u32,
    records: u32,
    nodes: u32,
    page_size: u32,
}

impl<'a> Store<'a> {
    /// Look up `DSDB` in the table of contents, read the store header
    /// block, and build a `Store` over it.
    ///
    /// Fails with [`Error::NoStoreRoot`] if no `DSDB` entry exists.
    pub fn open(allocator: &'a Allocator) -> Result<Store<'a>> {
        let block_id = *allocator
            .table_of_contents()
            .get(STORE_TOC_NAME)
            .ok_or(Error::NoStoreRoot)?;
        let mut header = allocator.get_block(block_id)?;

        let root_block_id = header.read_u32()?;
        let levels = header.read_u32()?;
        let records = header.read_u32()?;
        let nodes = header.read_u32()?;
        let page_size = header.read_u32()?;

        Ok(Store {
            allocator,
            root_block_id,
            levels,
            records,
            nodes,
            page_size,
        })
    }

    /// Number of tree levels, per the store descriptor.
    pub fn levels(&self) -> u32 {
        self.levels
    }

    /// Total number of records the tree holds, per the store descriptor.
    /// A well-formed traversal visits exactly this many entries.
    pub fn records(&self) -> u32 {
        self.records
    }

    /// Total number of B-tree nodes, per the store descriptor.
    pub fn nodes(&self) -> u32 {
        self.nodes
    }

    /// The page size used to size nodes on write.
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    /// The minimum node usage before a split/merge would be considered on
    /// write: `2 * page_size`.
    pub fn min_usage(&self) -> u32 {
        2 * self.page_size
    }

    /// Visit every entry in the tree, in non-decreasing `(filename,
    /// code)` order, calling `visit` once per entry.
    ///
    /// If `visit` returns an error, traversal stops immediately and the
    /// error is propagated wrapped in [`Error::TraversalAborted`], per
    /// the crate's no-partial-results error policy.
    pub fn traverse<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(Entry) -> Result<()>,
    {
        self.traverse_node(self.root_block_id, &mut visit)
    }

    fn traverse_node(&self, node_id: u32, visit: &mut dyn FnMut(Entry) -> Result<()>) -> Result<()> {
        // A fresh `get_block` call per node (including every child) is
        // required here: nothing shares a cursor across this recursion,
        // which is what makes it safe to read an internal node's own
        // entry after recursing into that entry's left child.
        let mut node = self.allocator.get_block(node_id)?;
        let next_ptr = node.read_u32()?;
        let count = node.read_u32()?;

        if next_ptr != 0 {
            for _ in 0..count {
                let child_id = node.read_u32()?;
                self.traverse_node(child_id, visit)?;
                let entry = node.read_entry()?;
                visit(entry).map_err(|e| Error::TraversalAborted(Box::new(e)))?;
            }
            self.traverse_node(next_ptr, visit)?;
        } else {
            for _ in 0..count {
                let entry = node.read_entry()?;
                visit(entry).map_err(|e| Error::TraversalAborted(Box::new(e)))?;
            }
        }
        Ok(())
    }

    /// Traverse the tree and collect independent copies of every entry
    /// whose filename matches `pattern`, a shell-style glob
    /// (`*`, `?`, `[...]`). Short-circuits on the first traversal error.
    pub fn find(&self, pattern: &str) -> Result<Vec<Entry>> {
        let pattern = Pattern::new(pattern)?;
        let mut matches = Vec::new();
        self.traverse(|entry| {
            if pattern.matches(&entry.filename) {
                matches.push(entry);
            }
            Ok(())
        })?;
        Ok(matches)
    }
}
