// Chunk: docs/chunks/block_store - Block store with per-block formats and user data

//! The block store.
//!
//! A [`Document`] is an ordered arena of [`Block`]s. Each block owns its text,
//! its lexer state, its format ranges and at most one [`BlockUserData`].
//! Positions are character offsets across the whole document with one
//! separator between consecutive blocks, the same coordinates a
//! [`ContentsChange`] is reported in.
//!
//! Writers of format ranges go through [`Document::set_formats`] (syntax) and
//! [`Document::set_extra_formats`] (semantic). Each replaces only the ranges of
//! its own origin, skips the write when nothing changed, and otherwise records
//! exactly one [`DocumentEvent::FormatsChanged`] plus a dirty block.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use crate::block_index::BlockIndex;
use crate::buffer_view::{spans_from_chars, BlockView, Style, StyledLine};
use crate::format::{
    adjust_ranges_for_edit, apply_preedit, clip_ranges, remove_preedit, sorted_ranges, Format,
    FormatOrigin, FormatRange, Preedit, StyleResolver, TextStyle,
};
use crate::marks::{Mark, MarkId, MarkPriority, MarkRegistry};
use crate::types::{BlockId, BlockRef, ContentsChange, DirtyBlocks};
use crate::user_data::{BlockUserData, InlineSuggestion, Parenthesis};

static NEXT_DOCUMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentId(u64);

impl DocumentId {
    fn next() -> Self {
        DocumentId(NEXT_DOCUMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Notifications recorded by the document, drained with
/// [`Document::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentEvent {
    /// The format ranges of a block changed; `start..end` is the affected
    /// span in block offsets.
    FormatsChanged { block: usize, start: usize, end: usize },
    ParenthesesChanged { block: usize },
    MarkRemoved { mark: MarkId, block: BlockId },
    SuggestionReleased { block: BlockId },
}

/// One line of the document.
#[derive(Debug, Clone)]
pub struct Block {
    id: BlockId,
    text: String,
    char_len: usize,
    user_state: i32,
    user_data: Option<BlockUserData>,
    formats: Vec<FormatRange>,
    preedit: Option<Preedit>,
    revision: u64,
}

impl Block {
    fn new(id: BlockId, text: String, revision: u64) -> Self {
        let char_len = text.chars().count();
        Self {
            id,
            text,
            char_len,
            user_state: -1,
            user_data: None,
            formats: Vec::new(),
            preedit: None,
            revision,
        }
    }

    pub fn id(&self) -> BlockId {
        self.id
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Character count, separator excluded.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Character count including the separator.
    pub fn length(&self) -> usize {
        self.char_len + 1
    }

    /// Character count as displayed, composition text included.
    pub fn display_len(&self) -> usize {
        self.char_len + self.preedit.as_ref().map_or(0, Preedit::len)
    }

    /// Lexer state id, -1 when unset.
    pub fn user_state(&self) -> i32 {
        self.user_state
    }

    pub fn user_data(&self) -> Option<&BlockUserData> {
        self.user_data.as_ref()
    }

    /// All ranges of both origins, ordered by start.
    pub fn formats(&self) -> &[FormatRange] {
        &self.formats
    }

    pub fn preedit(&self) -> Option<&Preedit> {
        self.preedit.as_ref()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn ranges_of(&self, origin: FormatOrigin) -> Vec<FormatRange> {
        self.formats
            .iter()
            .filter(|r| r.origin == origin)
            .copied()
            .collect()
    }

    fn user_data_mut(&mut self) -> &mut BlockUserData {
        self.user_data.get_or_insert_with(BlockUserData::new)
    }
}

#[derive(Debug)]
pub struct Document {
    id: DocumentId,
    blocks: Vec<Block>,
    index: BlockIndex,
    next_block_id: u64,
    marks: MarkRegistry,
    dirty: DirtyBlocks,
    events: Vec<DocumentEvent>,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates a document with a single empty block.
    pub fn new() -> Self {
        Self {
            id: DocumentId::next(),
            blocks: vec![Block::new(BlockId(0), String::new(), 0)],
            index: BlockIndex::new(),
            next_block_id: 1,
            marks: MarkRegistry::new(),
            dirty: DirtyBlocks::None,
            events: Vec::new(),
            revision: 0,
        }
    }

    /// Creates a document holding `text`, one block per line.
    pub fn from_text(text: &str) -> Self {
        let mut doc = Self::new();
        doc.blocks = text
            .split('\n')
            .enumerate()
            .map(|(i, line)| Block::new(BlockId(i as u64), line.to_owned(), 0))
            .collect();
        doc.next_block_id = doc.blocks.len() as u64;
        doc.index.rebuild(doc.blocks.iter().map(Block::len));
        doc
    }

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Total character count, separators between blocks included.
    pub fn len(&self) -> usize {
        let last = self.blocks.len() - 1;
        self.index.block_start(last).unwrap_or(0) + self.blocks[last].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn text(&self) -> String {
        let mut out = String::with_capacity(self.len());
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&block.text);
        }
        out
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    pub fn block_text(&self, index: usize) -> Option<&str> {
        self.blocks.get(index).map(Block::text)
    }

    pub fn block_ref(&self, index: usize) -> Option<BlockRef> {
        self.blocks.get(index).map(|b| BlockRef { index, id: b.id })
    }

    /// Resolves a handle to a current block index. Returns `None` when the
    /// block the handle was taken from no longer exists at that index.
    pub fn resolve(&self, handle: BlockRef) -> Option<usize> {
        self.blocks
            .get(handle.index)
            .filter(|b| b.id == handle.id)
            .map(|_| handle.index)
    }

    /// Finds the index of the block with `id`, trying `hint` first.
    pub fn index_of(&self, id: BlockId, hint: usize) -> Option<usize> {
        if self.blocks.get(hint).is_some_and(|b| b.id == id) {
            return Some(hint);
        }
        self.blocks.iter().position(|b| b.id == id)
    }

    /// Returns the index of the block containing `position`.
    pub fn find_block(&self, position: usize) -> Option<usize> {
        (position <= self.len()).then(|| self.index.block_at(position))
    }

    pub fn find_block_by_number(&self, number: usize) -> Option<&Block> {
        self.blocks.get(number)
    }

    /// Document position of the first character of a block.
    pub fn block_position(&self, index: usize) -> Option<usize> {
        self.index.block_start(index)
    }

    /// Character at `position`; separators read as `'\n'`.
    pub fn char_at(&self, position: usize) -> Option<char> {
        let index = self.find_block(position)?;
        let offset = position - self.index.block_start(index)?;
        let block = &self.blocks[index];
        if offset == block.len() {
            return (index + 1 < self.blocks.len()).then_some('\n');
        }
        block.text.chars().nth(offset)
    }

    // =========================================================================
    // Editing
    // =========================================================================

    fn next_block_id(&mut self) -> BlockId {
        let id = BlockId(self.next_block_id);
        self.next_block_id += 1;
        id
    }

    /// Replaces `chars_removed` characters at `from` with `text`.
    ///
    /// `'\n'` in `text` splits blocks; removing a separator joins them. The
    /// first touched block keeps its identity, user state and user data,
    /// blocks swallowed by the edit are destroyed, and new blocks start
    /// unset. Out-of-range requests are clamped.
    pub fn apply_edit(&mut self, from: usize, chars_removed: usize, text: &str) -> ContentsChange {
        let len = self.len();
        let from = if from > len {
            debug!(from, len, "edit position past document end; clamping");
            len
        } else {
            from
        };
        let removed = if chars_removed > len - from {
            debug!(from, chars_removed, len, "edit removes past document end; clamping");
            len - from
        } else {
            chars_removed
        };
        let added = text.chars().count();

        let first = self.index.block_at(from);
        let last = self.index.block_at(from + removed);
        let first_off = from - self.index.block_start(first).unwrap_or(0);
        let last_off = from + removed - self.index.block_start(last).unwrap_or(0);

        let prefix: String = self.blocks[first].text.chars().take(first_off).collect();
        let suffix: String = self.blocks[last].text.chars().skip(last_off).collect();
        let combined = format!("{prefix}{text}{suffix}");
        let mut lines = combined.split('\n');
        let first_line = lines.next().unwrap_or_default().to_owned();
        let rest: Vec<String> = lines.map(str::to_owned).collect();
        let single_block = first == last && rest.is_empty();

        self.revision += 1;
        let revision = self.revision;

        let swallowed: Vec<Block> = self.blocks.drain(first + 1..=last).collect();
        for block in swallowed {
            self.destroy_block(block);
        }

        {
            let block = &mut self.blocks[first];
            let old_preedit = block.preedit.take();
            let mut ranges = remove_preedit(std::mem::take(&mut block.formats), old_preedit.as_ref());

            let (removed_here, added_here) = if single_block {
                (removed, added)
            } else {
                let first_line_len = first_line.chars().count();
                (block.char_len - first_off, first_line_len - first_off)
            };
            adjust_ranges_for_edit(&mut ranges, first_off, removed_here, added_here);

            block.text = first_line;
            block.char_len = block.text.chars().count();
            clip_ranges(&mut ranges, block.char_len);

            block.preedit = old_preedit.and_then(|p| {
                if p.position <= first_off {
                    Some(p)
                } else if single_block && p.position >= first_off + removed {
                    Some(Preedit {
                        position: p.position - removed + added,
                        ..p
                    })
                } else {
                    None
                }
            });
            block.formats = sorted_ranges(apply_preedit(ranges, block.preedit.as_ref()));
            block.revision = revision;
        }

        let new_blocks: Vec<Block> = rest
            .into_iter()
            .map(|line| Block::new(self.next_block_id(), line, revision))
            .collect();
        let new_count = new_blocks.len();
        self.blocks.splice(first + 1..first + 1, new_blocks);

        let lengths: Vec<usize> = self.blocks[first..=first + new_count]
            .iter()
            .map(Block::len)
            .collect();
        self.index
            .splice(first, last - first + 1, &lengths, added as isize - removed as isize);

        self.dirty.merge(if single_block {
            DirtyBlocks::Single(first)
        } else {
            DirtyBlocks::FromBlockToEnd(first)
        });

        trace!(from, removed, added, first, last, "applied edit");
        ContentsChange::new(from, removed, added)
    }

    fn destroy_block(&mut self, block: Block) {
        let Some(data) = block.user_data else {
            return;
        };
        for (_, mark) in data.marks {
            if self.marks.remove(mark).is_some() {
                self.events.push(DocumentEvent::MarkRemoved {
                    mark,
                    block: block.id,
                });
            }
        }
        if data.suggestion.is_some() {
            self.events
                .push(DocumentEvent::SuggestionReleased { block: block.id });
        }
    }

    /// Drains accumulated dirty state since last call.
    pub fn take_dirty(&mut self) -> DirtyBlocks {
        std::mem::replace(&mut self.dirty, DirtyBlocks::None)
    }

    pub fn take_events(&mut self) -> Vec<DocumentEvent> {
        std::mem::take(&mut self.events)
    }

    /// A copy for background tokenization: same text, block ids, lexer
    /// states, lexer user data, preedits and syntax ranges. Marks, suggestions
    /// and semantic ranges stay behind.
    pub fn shadow_copy(&self) -> Document {
        let blocks = self
            .blocks
            .iter()
            .map(|b| Block {
                id: b.id,
                text: b.text.clone(),
                char_len: b.char_len,
                user_state: b.user_state,
                user_data: b.user_data.as_ref().map(|d| BlockUserData {
                    marks: Vec::new(),
                    suggestion: None,
                    ..d.clone()
                }),
                formats: b.ranges_of(FormatOrigin::Syntax),
                preedit: b.preedit.clone(),
                revision: b.revision,
            })
            .collect();
        Document {
            id: DocumentId::next(),
            blocks,
            index: self.index.clone(),
            next_block_id: self.next_block_id,
            marks: MarkRegistry::new(),
            dirty: DirtyBlocks::None,
            events: Vec::new(),
            revision: self.revision,
        }
    }

    // =========================================================================
    // Format ranges
    // =========================================================================

    fn replace_ranges(&mut self, index: usize, origin: FormatOrigin, ranges: Vec<FormatRange>) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            debug!(block = index, "format write for missing block ignored");
            return false;
        };

        let mut new: Vec<FormatRange> = ranges
            .into_iter()
            .map(|r| FormatRange { origin, ..r })
            .collect();
        clip_ranges(&mut new, block.display_len());
        let new = sorted_ranges(new);
        let old = sorted_ranges(block.ranges_of(origin));
        if new == old {
            return false;
        }

        let touched = old.iter().chain(new.iter());
        let start = touched.clone().map(|r| r.start).min().unwrap_or(0);
        let end = touched.map(FormatRange::end).max().unwrap_or(0);

        block.formats.retain(|r| r.origin != origin);
        block.formats.extend(new);
        block.formats = sorted_ranges(std::mem::take(&mut block.formats));
        block.revision += 1;

        trace!(block = index, ?origin, start, end, "formats changed");
        self.events
            .push(DocumentEvent::FormatsChanged { block: index, start, end });
        self.dirty.merge(DirtyBlocks::Single(index));
        true
    }

    /// Replaces the syntax ranges of a block. Returns false (and records
    /// nothing) when the sorted ranges equal the stored ones.
    pub fn set_formats(&mut self, index: usize, ranges: Vec<FormatRange>) -> bool {
        self.replace_ranges(index, FormatOrigin::Syntax, ranges)
    }

    /// Replaces the semantic ranges of a block, moving them out of the way of
    /// the block's composition text first.
    pub fn set_extra_formats(&mut self, index: usize, ranges: Vec<FormatRange>) -> bool {
        let Some(block) = self.blocks.get(index) else {
            return false;
        };
        let ranges = apply_preedit(ranges, block.preedit.as_ref());
        self.replace_ranges(index, FormatOrigin::Semantic, ranges)
    }

    pub fn clear_formats(&mut self, index: usize) -> bool {
        self.replace_ranges(index, FormatOrigin::Syntax, Vec::new())
    }

    pub fn clear_extra_formats(&mut self, index: usize) -> bool {
        self.replace_ranges(index, FormatOrigin::Semantic, Vec::new())
    }

    pub fn clear_extra_formats_in<I>(&mut self, blocks: I)
    where
        I: IntoIterator<Item = usize>,
    {
        for index in blocks {
            self.clear_extra_formats(index);
        }
    }

    pub fn clear_all_extra_formats(&mut self) {
        self.clear_extra_formats_in(0..self.blocks.len());
    }

    /// Drops every syntax range and resets lexer states.
    pub fn clear_all_formats(&mut self) {
        for index in 0..self.blocks.len() {
            self.clear_formats(index);
            self.blocks[index].user_state = -1;
        }
    }

    /// All ranges of a block, both origins, ordered by start.
    pub fn formats(&self, index: usize) -> &[FormatRange] {
        self.blocks.get(index).map_or(&[], |b| b.formats.as_slice())
    }

    pub fn syntax_formats(&self, index: usize) -> Vec<FormatRange> {
        self.blocks
            .get(index)
            .map(|b| b.ranges_of(FormatOrigin::Syntax))
            .unwrap_or_default()
    }

    pub fn extra_formats(&self, index: usize) -> Vec<FormatRange> {
        self.blocks
            .get(index)
            .map(|b| b.ranges_of(FormatOrigin::Semantic))
            .unwrap_or_default()
    }

    // =========================================================================
    // Preedit
    // =========================================================================

    /// Shows composition text at `position` in a block. Stored ranges are
    /// moved so the composition never carries a format. Empty text clears.
    pub fn set_preedit(&mut self, index: usize, position: usize, text: &str) {
        let Some(block) = self.blocks.get_mut(index) else {
            return;
        };
        let position = position.min(block.char_len);
        let ranges = remove_preedit(std::mem::take(&mut block.formats), block.preedit.as_ref());
        block.preedit = (!text.is_empty()).then(|| Preedit::new(position, text));
        block.formats = sorted_ranges(apply_preedit(ranges, block.preedit.as_ref()));
        block.revision += 1;
        self.dirty.merge(DirtyBlocks::Single(index));
    }

    pub fn clear_preedit(&mut self, index: usize) {
        self.set_preedit(index, 0, "");
    }

    pub fn preedit(&self, index: usize) -> Option<&Preedit> {
        self.blocks.get(index).and_then(Block::preedit)
    }

    // =========================================================================
    // Lexer state and user data
    // =========================================================================

    pub fn user_state(&self, index: usize) -> i32 {
        self.blocks.get(index).map_or(-1, Block::user_state)
    }

    pub fn set_user_state(&mut self, index: usize, state: i32) {
        if let Some(block) = self.blocks.get_mut(index) {
            block.user_state = state;
        }
    }

    pub fn user_data(&self, index: usize) -> Option<&BlockUserData> {
        self.blocks.get(index).and_then(Block::user_data)
    }

    /// Mutable user data, allocated on first use.
    pub fn user_data_mut(&mut self, index: usize) -> Option<&mut BlockUserData> {
        self.blocks.get_mut(index).map(Block::user_data_mut)
    }

    pub fn parentheses(&self, index: usize) -> &[Parenthesis] {
        self.user_data(index)
            .map_or(&[], |d| d.parentheses.as_slice())
    }

    /// Replaces a block's parenthesis list. Records `ParenthesesChanged` and
    /// returns true when the list differs from the stored one.
    pub fn set_parentheses(&mut self, index: usize, parentheses: Vec<Parenthesis>) -> bool {
        if self.parentheses(index) == parentheses.as_slice() {
            return false;
        }
        let Some(data) = self.user_data_mut(index) else {
            return false;
        };
        data.parentheses = parentheses;
        self.events
            .push(DocumentEvent::ParenthesesChanged { block: index });
        true
    }

    pub fn folding_indent(&self, index: usize) -> i32 {
        self.user_data(index).map_or(0, |d| d.folding_indent)
    }

    pub fn set_folding_indent(&mut self, index: usize, indent: i32) {
        if self.folding_indent(index) == indent {
            return;
        }
        if let Some(data) = self.user_data_mut(index) {
            data.folding_indent = indent;
        }
    }

    pub fn lexer_state(&self, index: usize) -> i32 {
        self.user_data(index).map_or(0, |d| d.lexer_state)
    }

    pub fn set_lexer_state(&mut self, index: usize, state: i32) {
        if self.lexer_state(index) == state {
            return;
        }
        if let Some(data) = self.user_data_mut(index) {
            data.lexer_state = state;
        }
    }

    pub fn is_ifdefed_out(&self, index: usize) -> bool {
        self.user_data(index).is_some_and(|d| d.ifdefed_out)
    }

    pub fn set_ifdefed_out(&mut self, index: usize, ifdefed_out: bool) {
        if self.is_ifdefed_out(index) == ifdefed_out {
            return;
        }
        if let Some(data) = self.user_data_mut(index) {
            data.ifdefed_out = ifdefed_out;
            self.dirty.merge(DirtyBlocks::Single(index));
        }
    }

    pub fn is_folded(&self, index: usize) -> bool {
        self.user_data(index).is_some_and(|d| d.folded)
    }

    pub fn set_folded(&mut self, index: usize, folded: bool) {
        if self.is_folded(index) == folded {
            return;
        }
        if let Some(data) = self.user_data_mut(index) {
            data.folded = folded;
        }
    }

    /// A block can fold when the next block is nested deeper.
    pub fn can_fold(&self, index: usize) -> bool {
        index + 1 < self.blocks.len()
            && self.folding_indent(index + 1) > self.folding_indent(index)
    }

    pub fn expected_raw_string_suffix(&self, index: usize) -> Option<&[u8]> {
        self.user_data(index)
            .and_then(|d| d.expected_raw_string_suffix.as_deref())
    }

    pub fn set_expected_raw_string_suffix(&mut self, index: usize, suffix: Option<Vec<u8>>) {
        if self.expected_raw_string_suffix(index) == suffix.as_deref() {
            return;
        }
        if let Some(data) = self.user_data_mut(index) {
            data.expected_raw_string_suffix = suffix;
        }
    }

    // =========================================================================
    // Marks
    // =========================================================================

    pub fn mark_registry(&self) -> &MarkRegistry {
        &self.marks
    }

    /// Attaches a new mark to a block.
    pub fn add_mark(&mut self, index: usize, priority: MarkPriority, label: &str) -> Option<MarkId> {
        let block_id = self.blocks.get(index)?.id;
        let id = self.marks.insert(block_id, priority, label.to_owned());
        self.blocks[index].user_data_mut().add_mark(priority, id);
        self.dirty.merge(DirtyBlocks::Single(index));
        Some(id)
    }

    pub fn remove_mark(&mut self, id: MarkId) -> bool {
        let Some(mark) = self.marks.remove(id) else {
            return false;
        };
        if let Some(index) = self.blocks.iter().position(|b| b.id == mark.block) {
            if let Some(data) = self.blocks[index].user_data.as_mut() {
                data.remove_mark(id);
            }
            self.dirty.merge(DirtyBlocks::Single(index));
        }
        self.events.push(DocumentEvent::MarkRemoved {
            mark: id,
            block: mark.block,
        });
        true
    }

    /// Marks of a block in paint order.
    pub fn marks(&self, index: usize) -> Vec<&Mark> {
        self.user_data(index)
            .map(|d| d.marks.iter().filter_map(|(_, id)| self.marks.get(*id)).collect())
            .unwrap_or_default()
    }

    // =========================================================================
    // Inline suggestions
    // =========================================================================

    pub fn insert_suggestion(&mut self, index: usize, text: &str, current_position: usize) {
        let released = match self.blocks.get_mut(index) {
            Some(block) => {
                let id = block.id;
                let previous = block
                    .user_data_mut()
                    .suggestion
                    .replace(InlineSuggestion::new(text, current_position));
                previous.map(|_| id)
            }
            None => return,
        };
        if let Some(block) = released {
            self.events.push(DocumentEvent::SuggestionReleased { block });
        }
        self.dirty.merge(DirtyBlocks::FromBlockToEnd(index));
    }

    pub fn clear_suggestion(&mut self, index: usize) -> bool {
        let Some(block) = self.blocks.get_mut(index) else {
            return false;
        };
        let id = block.id;
        let Some(data) = block.user_data.as_mut() else {
            return false;
        };
        if data.suggestion.take().is_none() {
            return false;
        }
        self.events.push(DocumentEvent::SuggestionReleased { block: id });
        self.dirty.merge(DirtyBlocks::FromBlockToEnd(index));
        true
    }

    pub fn suggestion(&self, index: usize) -> Option<&InlineSuggestion> {
        self.user_data(index).and_then(|d| d.suggestion.as_ref())
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Paints a block: syntax ranges first, semantic ranges on top. The
    /// composition text is shown unstyled.
    pub fn styled_line(&self, index: usize, resolver: &dyn StyleResolver) -> Option<StyledLine> {
        let block = self.blocks.get(index)?;
        let mut chars: Vec<char> = block.text.chars().collect();
        let mut composing = 0..0;
        if let Some(preedit) = &block.preedit {
            let at = preedit.position.min(chars.len());
            chars.splice(at..at, preedit.text.chars());
            composing = at..at + preedit.len();
        }

        let base = resolver.resolve(&Format::Named(TextStyle::Text));
        let mut styles = vec![base; chars.len()];
        for origin in [FormatOrigin::Syntax, FormatOrigin::Semantic] {
            for range in block.formats.iter().filter(|r| r.origin == origin) {
                let style = resolver.resolve(&range.format);
                for i in range.start..range.end().min(styles.len()) {
                    if composing.contains(&i) {
                        continue;
                    }
                    styles[i] = match origin {
                        FormatOrigin::Syntax => style,
                        FormatOrigin::Semantic => styles[i].overlay(style),
                    };
                }
            }
        }
        for i in composing {
            styles[i] = Style::default();
        }
        Some(StyledLine::new(spans_from_chars(&chars, &styles)))
    }

    /// Rows an inline suggestion adds below a block.
    pub fn annotation_lines(&self, index: usize) -> usize {
        self.suggestion(index).map_or(0, InlineSuggestion::extra_lines)
    }
}

impl BlockView for Document {
    fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn styled_line(&self, block: usize, resolver: &dyn StyleResolver) -> Option<StyledLine> {
        Document::styled_line(self, block, resolver)
    }

    fn annotation_lines(&self, block: usize) -> usize {
        Document::annotation_lines(self, block)
    }

    fn take_dirty(&mut self) -> DirtyBlocks {
        Document::take_dirty(self)
    }
}
