// Chunk: docs/chunks/block_user_data - Document-owned mark registry

//! Text marks (bookmarks, breakpoints, diagnostics gutter icons).
//!
//! The document owns every mark in a [`MarkRegistry`]. A block's user data
//! only keeps [`MarkId`]s ordered by priority, so removing a block can never
//! leave a dangling mark: the document drops the registry entries for the
//! block's ids and reports each removal.

use std::collections::HashMap;

use crate::types::BlockId;

/// Stable identifier of a mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkId(pub u64);

/// Paint priority. Higher priorities are painted last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum MarkPriority {
    Low,
    #[default]
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mark {
    pub id: MarkId,
    pub priority: MarkPriority,
    /// Block the mark is attached to.
    pub block: BlockId,
    pub label: String,
}

#[derive(Debug, Default)]
pub struct MarkRegistry {
    marks: HashMap<MarkId, Mark>,
    next_id: u64,
}

impl MarkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn insert(&mut self, block: BlockId, priority: MarkPriority, label: String) -> MarkId {
        let id = MarkId(self.next_id);
        self.next_id += 1;
        self.marks.insert(
            id,
            Mark {
                id,
                priority,
                block,
                label,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: MarkId) -> Option<Mark> {
        self.marks.remove(&id)
    }

    pub fn get(&self, id: MarkId) -> Option<&Mark> {
        self.marks.get(&id)
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_not_reused() {
        let mut registry = MarkRegistry::new();
        let a = registry.insert(BlockId(0), MarkPriority::Normal, "a".into());
        registry.remove(a);
        let b = registry.insert(BlockId(0), MarkPriority::Normal, "b".into());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn priority_orders_low_to_high() {
        assert!(MarkPriority::Low < MarkPriority::Normal);
        assert!(MarkPriority::Normal < MarkPriority::High);
    }
}
