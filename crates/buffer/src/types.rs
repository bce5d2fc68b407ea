// Chunk: docs/chunks/block_store - Block store with per-block formats and user data

/// Stable identity of a block. Never reused within a document, so a stale
/// handle can always be told apart from the block that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

/// Handle to a block: its index at the time the handle was taken plus its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockRef {
    pub index: usize,
    pub id: BlockId,
}

/// A document edit as reported to observers: `chars_removed` characters at
/// `from` were replaced by `chars_added` characters.
///
/// Positions count Unicode scalar values, with one separator character
/// between consecutive blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentsChange {
    pub from: usize,
    pub chars_removed: usize,
    pub chars_added: usize,
}

impl ContentsChange {
    pub fn new(from: usize, chars_removed: usize, chars_added: usize) -> Self {
        Self {
            from,
            chars_removed,
            chars_added,
        }
    }

    /// Signed change in document length.
    pub fn delta(&self) -> isize {
        self.chars_added as isize - self.chars_removed as isize
    }

    /// End of the inserted text in post-edit coordinates.
    pub fn added_end(&self) -> usize {
        self.from + self.chars_added
    }
}

/// Information about which blocks need repainting.
/// Accumulated by the document and drained by the renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtyBlocks {
    /// Nothing to repaint.
    None,
    /// A single block changed (formats replaced, in-block edit).
    Single(usize),
    /// A range of blocks changed [from, to).
    Range { from: usize, to: usize },
    /// Everything from a block to the end of the document changed.
    /// Used when blocks are split or joined and indices shift.
    FromBlockToEnd(usize),
}

impl DirtyBlocks {
    /// Returns true if nothing is dirty.
    pub fn is_none(&self) -> bool {
        matches!(self, DirtyBlocks::None)
    }

    /// Returns the first dirty block, if any.
    pub fn start_block(&self) -> Option<usize> {
        match self {
            DirtyBlocks::None => None,
            DirtyBlocks::Single(block) => Some(*block),
            DirtyBlocks::Range { from, .. } => Some(*from),
            DirtyBlocks::FromBlockToEnd(block) => Some(*block),
        }
    }

    /// Returns true if `block` falls inside the dirty region.
    pub fn contains(&self, block: usize) -> bool {
        match self {
            DirtyBlocks::None => false,
            DirtyBlocks::Single(b) => *b == block,
            DirtyBlocks::Range { from, to } => (*from..*to).contains(&block),
            DirtyBlocks::FromBlockToEnd(b) => block >= *b,
        }
    }

    /// Merges another dirty region into this one, producing the smallest
    /// region that covers both.
    pub fn merge(&mut self, other: DirtyBlocks) {
        *self = match (&*self, &other) {
            (DirtyBlocks::None, _) => other,
            (_, DirtyBlocks::None) => return,

            (DirtyBlocks::FromBlockToEnd(a), other) | (other, DirtyBlocks::FromBlockToEnd(a)) => {
                let b = other.start_block().unwrap_or(*a);
                DirtyBlocks::FromBlockToEnd((*a).min(b))
            }

            (DirtyBlocks::Single(a), DirtyBlocks::Single(b)) => {
                if a == b {
                    DirtyBlocks::Single(*a)
                } else {
                    DirtyBlocks::Range {
                        from: (*a).min(*b),
                        to: (*a).max(*b) + 1,
                    }
                }
            }

            (DirtyBlocks::Single(a), DirtyBlocks::Range { from, to })
            | (DirtyBlocks::Range { from, to }, DirtyBlocks::Single(a)) => DirtyBlocks::Range {
                from: (*from).min(*a),
                to: (*to).max(*a + 1),
            },

            (DirtyBlocks::Range { from: a, to: b }, DirtyBlocks::Range { from: c, to: d }) => {
                DirtyBlocks::Range {
                    from: (*a).min(*c),
                    to: (*b).max(*d),
                }
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== ContentsChange ====================

    #[test]
    fn delta_is_signed() {
        assert_eq!(ContentsChange::new(8, 2, 5).delta(), 3);
        assert_eq!(ContentsChange::new(8, 5, 2).delta(), -3);
        assert_eq!(ContentsChange::new(8, 5, 2).added_end(), 10);
    }

    // ==================== Merge ====================

    #[test]
    fn merge_none_is_identity() {
        let mut d = DirtyBlocks::None;
        d.merge(DirtyBlocks::Single(5));
        assert_eq!(d, DirtyBlocks::Single(5));
        d.merge(DirtyBlocks::None);
        assert_eq!(d, DirtyBlocks::Single(5));
    }

    #[test]
    fn merge_distinct_singles_makes_range() {
        let mut d = DirtyBlocks::Single(10);
        d.merge(DirtyBlocks::Single(3));
        assert_eq!(d, DirtyBlocks::Range { from: 3, to: 11 });
    }

    #[test]
    fn merge_single_into_range() {
        let mut d = DirtyBlocks::Range { from: 5, to: 10 };
        d.merge(DirtyBlocks::Single(15));
        assert_eq!(d, DirtyBlocks::Range { from: 5, to: 16 });
    }

    #[test]
    fn merge_to_end_takes_earliest_start() {
        let mut d = DirtyBlocks::Range { from: 3, to: 7 };
        d.merge(DirtyBlocks::FromBlockToEnd(5));
        assert_eq!(d, DirtyBlocks::FromBlockToEnd(3));

        let mut d = DirtyBlocks::FromBlockToEnd(2);
        d.merge(DirtyBlocks::Single(9));
        assert_eq!(d, DirtyBlocks::FromBlockToEnd(2));
    }

    #[test]
    fn contains_respects_variant() {
        assert!(!DirtyBlocks::None.contains(0));
        assert!(DirtyBlocks::Range { from: 2, to: 4 }.contains(3));
        assert!(!DirtyBlocks::Range { from: 2, to: 4 }.contains(4));
        assert!(DirtyBlocks::FromBlockToEnd(2).contains(400));
    }
}
