// Chunk: docs/chunks/block_user_data - Bracket matching over per-block parenthesis lists

//! Bracket matching.
//!
//! Matching never rescans text: it walks the sorted parenthesis lists the
//! lexer stored in each block's user data, forward or backward from a given
//! position, with an `ignore` counter absorbing nested pairs. Blocks marked
//! as ifdef'd out are skipped.

use crate::document::Document;
use crate::user_data::{Parenthesis, ParenthesisKind};

/// Outcome of a bracket match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    /// Ran off the document without finding a partner.
    NoMatch,
    Match,
    /// Found a partner with the wrong character.
    Mismatch,
}

/// Result of a bracket match: its kind and the document position of the
/// partner bracket when one was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResult {
    pub kind: MatchType,
    pub position: Option<usize>,
}

impl MatchResult {
    fn none() -> Self {
        Self {
            kind: MatchType::NoMatch,
            position: None,
        }
    }
}

/// Whether `close` is the partner of `open`.
///
/// `+`/`-` are folding markers some lexers emit as bracket pairs.
fn is_pair(open: char, close: char) -> bool {
    matches!(
        (open, close),
        ('{', '}') | ('(', ')') | ('[', ']') | ('+', '-')
    )
}

fn is_brace(chr: char) -> bool {
    matches!(chr, '{' | '}' | '+' | '-')
}

fn searchable(doc: &Document, block: usize) -> bool {
    !doc.parentheses(block).is_empty() && !doc.is_ifdefed_out(block)
}

/// Resolves a document position to `(block, offset)`.
fn locate(doc: &Document, position: usize) -> Option<(usize, usize)> {
    let block = doc.find_block(position)?;
    let offset = position - doc.block_position(block)?;
    Some((block, offset))
}

/// Walks forward from the position just after an entry.
struct Forward<'a> {
    doc: &'a Document,
    block: usize,
    next: usize,
}

impl Forward<'_> {
    fn step(&mut self) -> Option<(usize, Parenthesis)> {
        loop {
            if let Some(paren) = self.doc.parentheses(self.block).get(self.next) {
                self.next += 1;
                return Some((self.block, *paren));
            }
            loop {
                self.block += 1;
                if self.block >= self.doc.block_count() {
                    return None;
                }
                if searchable(self.doc, self.block) {
                    break;
                }
            }
            self.next = 0;
        }
    }
}

/// Walks backward from the position just before an entry.
struct Backward<'a> {
    doc: &'a Document,
    block: usize,
    /// Entries left to visit in the current block.
    remaining: usize,
}

impl Backward<'_> {
    fn step(&mut self) -> Option<(usize, Parenthesis)> {
        loop {
            if self.remaining > 0 {
                self.remaining -= 1;
                let paren = self.doc.parentheses(self.block)[self.remaining];
                return Some((self.block, paren));
            }
            loop {
                if self.block == 0 {
                    return None;
                }
                self.block -= 1;
                if searchable(self.doc, self.block) {
                    break;
                }
            }
            self.remaining = self.doc.parentheses(self.block).len();
        }
    }
}

fn absolute(doc: &Document, block: usize, paren: &Parenthesis) -> Option<usize> {
    doc.block_position(block).map(|p| p + paren.position)
}

/// Matches the opening bracket at `position` against the next unbalanced
/// closing bracket.
pub fn check_open_parenthesis(doc: &Document, position: usize) -> MatchResult {
    let Some((block, offset)) = locate(doc, position) else {
        return MatchResult::none();
    };
    if !searchable(doc, block) {
        return MatchResult::none();
    }
    let list = doc.parentheses(block);
    let Some(at) = list
        .iter()
        .position(|p| p.position == offset && p.kind == ParenthesisKind::Opened)
    else {
        return MatchResult::none();
    };
    let open = list[at].chr;

    let mut walk = Forward {
        doc,
        block,
        next: at + 1,
    };
    let mut ignore = 0usize;
    while let Some((found_block, paren)) = walk.step() {
        match paren.kind {
            ParenthesisKind::Opened => ignore += 1,
            ParenthesisKind::Closed if ignore > 0 => ignore -= 1,
            ParenthesisKind::Closed => {
                let kind = if is_pair(open, paren.chr) {
                    MatchType::Match
                } else {
                    MatchType::Mismatch
                };
                return MatchResult {
                    kind,
                    position: absolute(doc, found_block, &paren),
                };
            }
        }
    }
    MatchResult::none()
}

/// Matches the closing bracket at `position` against the previous unbalanced
/// opening bracket.
pub fn check_closed_parenthesis(doc: &Document, position: usize) -> MatchResult {
    let Some((block, offset)) = locate(doc, position) else {
        return MatchResult::none();
    };
    if !searchable(doc, block) {
        return MatchResult::none();
    }
    let list = doc.parentheses(block);
    let Some(at) = list
        .iter()
        .position(|p| p.position == offset && p.kind == ParenthesisKind::Closed)
    else {
        return MatchResult::none();
    };
    let close = list[at].chr;

    let mut walk = Backward {
        doc,
        block,
        remaining: at,
    };
    let mut ignore = 0usize;
    while let Some((found_block, paren)) = walk.step() {
        match paren.kind {
            ParenthesisKind::Closed => ignore += 1,
            ParenthesisKind::Opened if ignore > 0 => ignore -= 1,
            ParenthesisKind::Opened => {
                let kind = if is_pair(paren.chr, close) {
                    MatchType::Match
                } else {
                    MatchType::Mismatch
                };
                return MatchResult {
                    kind,
                    position: absolute(doc, found_block, &paren),
                };
            }
        }
    }
    MatchResult::none()
}

/// Matches the opening bracket right of a cursor.
pub fn match_cursor_forward(doc: &Document, cursor: usize) -> MatchResult {
    match doc.char_at(cursor) {
        Some('{' | '(' | '[' | '+') => check_open_parenthesis(doc, cursor),
        _ => MatchResult::none(),
    }
}

/// Matches the closing bracket left of a cursor.
pub fn match_cursor_backward(doc: &Document, cursor: usize) -> MatchResult {
    let Some(before) = cursor.checked_sub(1) else {
        return MatchResult::none();
    };
    match doc.char_at(before) {
        Some('}' | ')' | ']' | '-') => check_closed_parenthesis(doc, before),
        _ => MatchResult::none(),
    }
}

/// Position of the innermost unbalanced opening bracket before `cursor`.
pub fn find_previous_open_parenthesis(doc: &Document, cursor: usize) -> Option<usize> {
    let (block, offset) = locate(doc, cursor)?;
    let remaining = if doc.is_ifdefed_out(block) {
        0
    } else {
        doc.parentheses(block)
            .partition_point(|p| p.position < offset)
    };
    let mut walk = Backward {
        doc,
        block,
        remaining,
    };
    let mut ignore = 0usize;
    while let Some((found_block, paren)) = walk.step() {
        match paren.kind {
            ParenthesisKind::Closed => ignore += 1,
            ParenthesisKind::Opened if ignore > 0 => ignore -= 1,
            ParenthesisKind::Opened => return absolute(doc, found_block, &paren),
        }
    }
    None
}

/// Position of the next unbalanced closing bracket at or after `cursor`.
/// With `braces_only`, only `{}` pairs (and folding markers) count.
pub fn find_next_closing_parenthesis(
    doc: &Document,
    cursor: usize,
    braces_only: bool,
) -> Option<usize> {
    let (block, offset) = locate(doc, cursor)?;
    let next = if doc.is_ifdefed_out(block) {
        doc.parentheses(block).len()
    } else {
        doc.parentheses(block)
            .partition_point(|p| p.position < offset)
    };
    let mut walk = Forward { doc, block, next };
    let mut ignore = 0usize;
    while let Some((found_block, paren)) = walk.step() {
        if braces_only && !is_brace(paren.chr) {
            continue;
        }
        match paren.kind {
            ParenthesisKind::Opened => ignore += 1,
            ParenthesisKind::Closed if ignore > 0 => ignore -= 1,
            ParenthesisKind::Closed => return absolute(doc, found_block, &paren),
        }
    }
    None
}
