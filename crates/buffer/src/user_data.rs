// Chunk: docs/chunks/block_user_data - Per-block lexer cache, parentheses, marks and suggestions

//! Per-block user data.
//!
//! Everything the incremental lexer needs to resume scanning in the middle of
//! a document lives here, next to things other features attach to a line
//! (marks, an inline suggestion). Each block owns at most one
//! [`BlockUserData`]; it is allocated on the first write and read queries on
//! a block without one return the defaults.

use crate::marks::{MarkId, MarkPriority};

/// Whether a parenthesis opens or closes a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParenthesisKind {
    Opened,
    Closed,
}

/// A bracket character found by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parenthesis {
    /// Offset within the block.
    pub position: usize,
    pub chr: char,
    pub kind: ParenthesisKind,
    /// Producer-defined tag (e.g. syntax vs. semantic brackets).
    pub source: u8,
}

impl Parenthesis {
    pub fn new(kind: ParenthesisKind, chr: char, position: usize) -> Self {
        Self {
            position,
            chr,
            kind,
            source: 0,
        }
    }

    pub fn opened(chr: char, position: usize) -> Self {
        Self::new(ParenthesisKind::Opened, chr, position)
    }

    pub fn closed(chr: char, position: usize) -> Self {
        Self::new(ParenthesisKind::Closed, chr, position)
    }

    pub fn with_source(mut self, source: u8) -> Self {
        self.source = source;
        self
    }
}

pub type Parentheses = Vec<Parenthesis>;

/// Inserts `paren` keeping the list sorted by position.
pub fn insert_parenthesis(list: &mut Parentheses, paren: Parenthesis) {
    let at = list.partition_point(|p| p.position <= paren.position);
    list.insert(at, paren);
}

/// A proposed replacement shown inline after a block's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSuggestion {
    /// Suggested text, one entry per line.
    pub lines: Vec<String>,
    /// Offset in the owning block the suggestion applies at.
    pub current_position: usize,
}

impl InlineSuggestion {
    pub fn new(text: &str, current_position: usize) -> Self {
        Self {
            lines: text.split('\n').map(str::to_owned).collect(),
            current_position,
        }
    }

    /// Lines the suggestion occupies below its block.
    pub fn extra_lines(&self) -> usize {
        self.lines.len().saturating_sub(1)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockUserData {
    /// Sorted by position.
    pub parentheses: Parentheses,
    /// 0 means unset.
    pub folding_indent: i32,
    /// 0 means unset.
    pub lexer_state: i32,
    pub ifdefed_out: bool,
    pub folded: bool,
    /// Weak references into the document's mark registry, by priority.
    pub marks: Vec<(MarkPriority, MarkId)>,
    pub suggestion: Option<InlineSuggestion>,
    pub expected_raw_string_suffix: Option<Vec<u8>>,
}

impl BlockUserData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a mark keeping the list ordered by priority; equal priorities
    /// keep insertion order.
    pub fn add_mark(&mut self, priority: MarkPriority, id: MarkId) {
        let at = self.marks.partition_point(|(p, _)| *p <= priority);
        self.marks.insert(at, (priority, id));
    }

    pub fn remove_mark(&mut self, id: MarkId) -> bool {
        let before = self.marks.len();
        self.marks.retain(|(_, m)| *m != id);
        self.marks.len() != before
    }

    pub fn has_marks(&self) -> bool {
        !self.marks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parentheses_stay_sorted_on_insert() {
        let mut list = Parentheses::new();
        insert_parenthesis(&mut list, Parenthesis::closed(')', 8));
        insert_parenthesis(&mut list, Parenthesis::opened('(', 2));
        insert_parenthesis(&mut list, Parenthesis::opened('{', 5));
        let positions: Vec<usize> = list.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![2, 5, 8]);
    }

    #[test]
    fn defaults_are_unset() {
        let data = BlockUserData::new();
        assert!(data.parentheses.is_empty());
        assert_eq!(data.folding_indent, 0);
        assert_eq!(data.lexer_state, 0);
        assert!(data.suggestion.is_none());
    }

    #[test]
    fn marks_ordered_by_priority() {
        let mut data = BlockUserData::new();
        data.add_mark(MarkPriority::High, MarkId(1));
        data.add_mark(MarkPriority::Low, MarkId(2));
        data.add_mark(MarkPriority::Normal, MarkId(3));
        data.add_mark(MarkPriority::Low, MarkId(4));
        let ids: Vec<u64> = data.marks.iter().map(|(_, id)| id.0).collect();
        assert_eq!(ids, vec![2, 4, 3, 1]);
        assert!(data.remove_mark(MarkId(3)));
        assert!(!data.remove_mark(MarkId(3)));
    }

    #[test]
    fn suggestion_extra_lines() {
        assert_eq!(InlineSuggestion::new("one", 0).extra_lines(), 0);
        assert_eq!(InlineSuggestion::new("one\ntwo\nthree", 0).extra_lines(), 2);
    }
}
