// Chunk: docs/chunks/block_store - Block start offsets with incremental splice

//! Block index: start positions of every block in document coordinates.
//!
//! Keeps position → block lookup at O(log n). Edits splice the entries of the
//! touched blocks and shift the tail, so the index never needs a full rebuild
//! after the initial load.

/// Tracks where each block starts.
#[derive(Debug, Clone)]
pub struct BlockIndex {
    /// Character offsets where each block starts. starts[0] = 0 always.
    starts: Vec<usize>,
}

impl BlockIndex {
    /// Creates an index for a document with a single empty block.
    pub fn new() -> Self {
        Self { starts: vec![0] }
    }

    /// Rebuilds the index from block lengths (separator excluded).
    pub fn rebuild<I>(&mut self, lengths: I)
    where
        I: IntoIterator<Item = usize>,
    {
        self.starts.clear();
        let mut offset = 0;
        for len in lengths {
            self.starts.push(offset);
            offset += len + 1;
        }
        if self.starts.is_empty() {
            self.starts.push(0);
        }
    }

    pub fn block_count(&self) -> usize {
        self.starts.len()
    }

    /// Returns the position where the given block starts.
    pub fn block_start(&self, block: usize) -> Option<usize> {
        self.starts.get(block).copied()
    }

    /// Returns the block containing `position`.
    ///
    /// A separator position belongs to the block it terminates. Positions past
    /// the end map to the last block.
    pub fn block_at(&self, position: usize) -> usize {
        match self.starts.binary_search(&position) {
            Ok(block) => block,
            Err(block) => block.saturating_sub(1),
        }
    }

    /// Replaces the entries of `removed` blocks starting at `first` with
    /// blocks of the given lengths (separator excluded), then shifts every
    /// later block by `delta`.
    pub fn splice(&mut self, first: usize, removed: usize, new_lengths: &[usize], delta: isize) {
        let Some(base) = self.block_start(first) else {
            return;
        };
        let end = (first + removed).min(self.starts.len());

        let mut offset = base;
        let mut replacement = Vec::with_capacity(new_lengths.len());
        for len in new_lengths {
            replacement.push(offset);
            offset += len + 1;
        }
        self.starts.splice(first..end, replacement);

        let tail = first + new_lengths.len();
        for start in self.starts.iter_mut().skip(tail) {
            *start = start.saturating_add_signed(delta);
        }
    }

    /// Returns the raw starts array (for debug validation).
    #[cfg(any(debug_assertions, test))]
    pub fn starts(&self) -> &[usize] {
        &self.starts
    }
}

impl Default for BlockIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_has_one_block() {
        let index = BlockIndex::new();
        assert_eq!(index.block_count(), 1);
        assert_eq!(index.block_start(0), Some(0));
    }

    #[test]
    fn rebuild_counts_separators() {
        let mut index = BlockIndex::new();
        index.rebuild([5, 5, 0]);
        assert_eq!(index.starts(), &[0, 6, 12]);
    }

    #[test]
    fn block_at_maps_separator_to_previous_block() {
        let mut index = BlockIndex::new();
        index.rebuild([5, 5, 3]);
        assert_eq!(index.block_at(0), 0);
        assert_eq!(index.block_at(5), 0); // separator
        assert_eq!(index.block_at(6), 1);
        assert_eq!(index.block_at(12), 2);
        assert_eq!(index.block_at(999), 2);
    }

    #[test]
    fn splice_split_block() {
        let mut index = BlockIndex::new();
        index.rebuild([10, 3]);
        // "helloworld" -> "hello" + "world": one block becomes two, +1 char
        index.splice(0, 1, &[5, 5], 1);
        assert_eq!(index.starts(), &[0, 6, 12]);
    }

    #[test]
    fn splice_join_blocks() {
        let mut index = BlockIndex::new();
        index.rebuild([2, 2, 2]);
        // join blocks 0 and 1 by removing the separator
        index.splice(0, 2, &[4], -1);
        assert_eq!(index.starts(), &[0, 5]);
    }

    #[test]
    fn splice_in_block_edit_shifts_tail() {
        let mut index = BlockIndex::new();
        index.rebuild([2, 2, 2]);
        index.splice(1, 1, &[5], 3);
        assert_eq!(index.starts(), &[0, 3, 9]);
    }
}
