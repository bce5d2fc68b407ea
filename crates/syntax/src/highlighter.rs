// Chunk: docs/chunks/syntax_highlighting - Incremental highlighter core
// Chunk: docs/chunks/highlight_bursts - Time-bounded reformatting bursts

//! Incremental syntax highlighter.
//!
//! [`SyntaxHighlighter`] keeps the syntax ranges of a [`Document`] current as
//! it is edited. Each [`ContentsChange`] widens a pending range of document
//! positions; a *burst* then walks blocks from the start of that range,
//! running the lexer once per block and writing the coalesced result with
//! [`Document::set_formats`].
//!
//! A block whose exit state changes forces the next block to be processed
//! too, even past the end of the pending range. This is how opening a block
//! comment on one line re-tokenizes the lines below it until the state
//! settles.
//!
//! Bursts are bounded by a [`BurstBudget`]. When it runs out the highlighter
//! records where it stopped, enters [`HighlighterState::PendingRehighlight`]
//! and returns [`BurstOutcome::Yielded`]; the host calls
//! [`SyntaxHighlighter::run_pending`] from its event loop to continue.
//! Edits arriving while a burst is pending only widen the range.
//!
//! Reentrant reformatting cannot happen: every entry point takes
//! `&mut self`, and observers only see [`HighlighterEvent`] values.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_buffer::{
    apply_preedit, coalesce_runs, BlockId, ContentsChange, Document, DocumentId, Format,
    FormatOrigin, TextStyle,
};
use tracing::{debug, trace};

use crate::config::HighlighterConfig;
use crate::events::{HighlighterEvent, Listeners};
use crate::lexer::{BlockContext, BlockLexer};

/// Limits on the work done by one burst.
///
/// A burst always processes at least one block, so a zero budget still makes
/// progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstBudget {
    /// Wall-clock time after which the burst yields.
    pub time: Duration,
    /// Maximum number of blocks per burst; `None` for no limit.
    pub max_blocks: Option<usize>,
}

impl Default for BurstBudget {
    fn default() -> Self {
        Self {
            time: Duration::from_millis(20),
            max_blocks: None,
        }
    }
}

impl BurstBudget {
    /// A budget that never runs out.
    pub fn unlimited() -> Self {
        Self {
            time: Duration::MAX,
            max_blocks: None,
        }
    }

    /// A budget limited only by block count.
    pub fn blocks(max_blocks: usize) -> Self {
        Self {
            time: Duration::MAX,
            max_blocks: Some(max_blocks),
        }
    }

    fn exhausted(&self, started: Instant, processed: usize) -> bool {
        if self.max_blocks.is_some_and(|max| processed >= max) {
            return true;
        }
        self.time != Duration::MAX && started.elapsed() >= self.time
    }
}

/// Where the highlighter is in its reformatting cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HighlighterState {
    #[default]
    Idle,
    /// Work is scheduled but not running; edits only widen its range.
    PendingRehighlight,
    /// A burst is walking blocks.
    Reformatting,
}

/// What one call into the highlighter did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstOutcome {
    /// The pending range was processed to its fixpoint.
    Finished { blocks: usize },
    /// The budget ran out; `next_block` is where the next burst starts.
    Yielded { next_block: usize, blocks: usize },
    /// A burst is already pending; the edit widened its range.
    Deferred,
    /// Nothing to do.
    Idle,
    /// The highlighter is not attached to this document.
    Detached,
    /// The cancel token was set; pending work was dropped.
    Cancelled,
}

/// Shared flag that stops an in-flight or pending run.
///
/// Cancelling never leaves a block half-written: every block is replaced as a
/// whole, so blocks not yet reached keep their previous ranges.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Pending work as an inclusive range of document positions. The blocks
/// containing `start` and `end` bound the burst.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingRange {
    start: usize,
    end: usize,
}

impl PendingRange {
    fn whole_document() -> Self {
        Self {
            start: 0,
            end: usize::MAX,
        }
    }

    fn union(self, other: Self) -> Self {
        Self {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// Moves the range so it keeps covering the same text after `change`.
    fn shifted(self, change: &ContentsChange) -> Self {
        Self {
            start: shift_position(self.start, change),
            end: shift_position(self.end, change),
        }
    }
}

fn shift_position(position: usize, change: &ContentsChange) -> usize {
    let removed_end = change.from + change.chars_removed;
    if position == usize::MAX || position <= change.from {
        position
    } else if position >= removed_end {
        (position - change.chars_removed).saturating_add(change.chars_added)
    } else {
        change.added_end()
    }
}

/// Incremental highlighter driving a [`BlockLexer`] over one document.
pub struct SyntaxHighlighter<L> {
    lexer: L,
    document: Option<DocumentId>,
    categories: Vec<Format>,
    visual_whitespace: Option<Format>,
    budget: BurstBudget,
    state: HighlighterState,
    pending: Option<PendingRange>,
    /// Blocks that must be processed when next reached, whatever the range.
    force_rehighlight: HashSet<BlockId>,
    /// Per-block scratch formats, resized for every block.
    scratch: Vec<Option<Format>>,
    chars: Vec<char>,
    cancel: CancelToken,
    listeners: Listeners,
    /// Blocks re-lexed since the last take, with the index they had then.
    highlighted: Option<Vec<(BlockId, usize)>>,
}

impl<L: BlockLexer> SyntaxHighlighter<L> {
    /// Creates a detached highlighter with the default budget and no
    /// format categories.
    pub fn new(lexer: L) -> Self {
        Self {
            lexer,
            document: None,
            categories: Vec::new(),
            visual_whitespace: Some(Format::Named(TextStyle::VisualWhitespace)),
            budget: BurstBudget::default(),
            state: HighlighterState::Idle,
            pending: None,
            force_rehighlight: HashSet::new(),
            scratch: Vec::new(),
            chars: Vec::new(),
            cancel: CancelToken::new(),
            listeners: Listeners::default(),
            highlighted: None,
        }
    }

    pub fn with_config(lexer: L, config: &HighlighterConfig) -> Self {
        let mut highlighter = Self::new(lexer);
        highlighter.budget = config.burst_budget();
        highlighter.set_visual_whitespace(config.visual_whitespace);
        highlighter
    }

    pub fn state(&self) -> HighlighterState {
        self.state
    }

    pub fn budget(&self) -> BurstBudget {
        self.budget
    }

    pub fn set_budget(&mut self, budget: BurstBudget) {
        self.budget = budget;
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_attached_to(&self, doc: &Document) -> bool {
        self.document == Some(doc.id())
    }

    pub fn lexer(&self) -> &L {
        &self.lexer
    }

    pub fn lexer_mut(&mut self) -> &mut L {
        &mut self.lexer
    }

    pub fn add_listener(&mut self, listener: impl FnMut(&HighlighterEvent) + Send + 'static) {
        self.listeners.add(listener);
    }

    /// Records the id of every block the highlighter re-lexes, for callers
    /// that forward results elsewhere.
    pub fn track_highlighted_blocks(&mut self, enabled: bool) {
        self.highlighted = enabled.then(Vec::new);
    }

    /// Drains the blocks re-lexed since the last call, each with the index
    /// it had when lexed. Empty when tracking is off.
    pub fn take_highlighted_blocks(&mut self) -> Vec<(BlockId, usize)> {
        self.highlighted.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Registers the styles lexer categories map to. Reformats the whole
    /// document on the next burst.
    pub fn set_format_categories(&mut self, categories: Vec<TextStyle>) {
        self.categories = categories.into_iter().map(Format::Named).collect();
        self.schedule_full();
    }

    pub fn set_visual_whitespace(&mut self, enabled: bool) {
        self.visual_whitespace = enabled.then_some(Format::Named(TextStyle::VisualWhitespace));
        self.schedule_full();
    }

    /// The theme behind the format categories changed.
    pub fn set_theme_changed(&mut self) {
        self.schedule_full();
    }

    fn schedule_full(&mut self) {
        if self.document.is_none() {
            return;
        }
        self.pending = Some(PendingRange::whole_document());
        self.state = HighlighterState::PendingRehighlight;
    }

    /// Starts highlighting `doc`. The first pass is scheduled, not run.
    pub fn attach(&mut self, doc: &Document) {
        if let Some(previous) = self.document {
            debug!(?previous, "attach without detach; dropping pending work");
        }
        self.document = Some(doc.id());
        self.cancel.reset();
        self.force_rehighlight.clear();
        self.schedule_full();
    }

    /// Stops highlighting `doc` and drops its syntax ranges.
    pub fn detach(&mut self, doc: &mut Document) {
        if !self.is_attached_to(doc) {
            debug_assert!(
                self.document.is_none(),
                "detach from a document this highlighter is not attached to"
            );
            debug!("detach from a document this highlighter is not attached to");
            return;
        }
        doc.clear_all_formats();
        self.document = None;
        self.pending = None;
        self.force_rehighlight.clear();
        self.state = HighlighterState::Idle;
    }

    /// Reacts to an edit already applied to `doc`.
    pub fn contents_change(&mut self, doc: &mut Document, change: ContentsChange) -> BurstOutcome {
        if !self.is_attached_to(doc) {
            debug_assert!(
                self.document.is_none(),
                "contents change from a document this highlighter is not attached to"
            );
            debug!(from = change.from, "contents change on a detached highlighter");
            return BurstOutcome::Detached;
        }
        let edited = PendingRange {
            start: change.from,
            end: change.added_end(),
        };
        let pending = match self.pending {
            Some(pending) => pending.shifted(&change).union(edited),
            None => edited,
        };
        self.pending = Some(pending);

        if self.state == HighlighterState::PendingRehighlight {
            trace!(start = pending.start, end = pending.end, "widened pending rehighlight");
            return BurstOutcome::Deferred;
        }
        self.run_burst(doc, self.budget)
    }

    /// Runs one burst of scheduled work.
    pub fn run_pending(&mut self, doc: &mut Document) -> BurstOutcome {
        if !self.is_attached_to(doc) {
            return BurstOutcome::Detached;
        }
        self.run_burst(doc, self.budget)
    }

    /// Re-highlights the whole document synchronously.
    pub fn rehighlight(&mut self, doc: &mut Document) -> BurstOutcome {
        if !self.is_attached_to(doc) {
            return BurstOutcome::Detached;
        }
        self.cancel.reset();
        self.pending = Some(PendingRange::whole_document());
        self.run_burst(doc, BurstBudget::unlimited())
    }

    /// Re-highlights one block synchronously, plus whatever its state change
    /// propagates to. Scheduled work elsewhere stays scheduled.
    pub fn rehighlight_block(&mut self, doc: &mut Document, index: usize) -> BurstOutcome {
        if !self.is_attached_to(doc) {
            return BurstOutcome::Detached;
        }
        let Some(position) = doc.block_position(index) else {
            debug!(block = index, "rehighlight of a missing block");
            return BurstOutcome::Idle;
        };
        let saved = self.pending.take();
        self.pending = Some(PendingRange {
            start: position,
            end: position,
        });
        let outcome = self.run_burst(doc, BurstBudget::unlimited());
        if let Some(saved) = saved {
            self.pending = Some(saved);
            self.state = HighlighterState::PendingRehighlight;
        }
        outcome
    }

    fn run_burst(&mut self, doc: &mut Document, budget: BurstBudget) -> BurstOutcome {
        let Some(pending) = self.pending.take() else {
            self.state = HighlighterState::Idle;
            return BurstOutcome::Idle;
        };
        if self.cancel.is_cancelled() {
            return self.cancelled();
        }

        let len = doc.len();
        let first = doc.find_block(pending.start.min(len)).unwrap_or(0);
        let last = doc
            .find_block(pending.end.min(len))
            .unwrap_or_else(|| doc.block_count().saturating_sub(1));

        self.state = HighlighterState::Reformatting;
        let started = Instant::now();
        let mut index = first;
        let mut processed = 0;
        let mut force_next = false;

        while let Some(id) = doc.block(index).map(|b| b.id()) {
            let forced = self.force_rehighlight.remove(&id) || force_next;
            if index > last && !forced {
                break;
            }
            if processed > 0 && budget.exhausted(started, processed) {
                return self.yield_at(doc, index, id, forced, pending, processed);
            }
            if self.cancel.is_cancelled() {
                return self.cancelled();
            }
            force_next = self.highlight_block(doc, index);
            processed += 1;
            index += 1;
        }

        self.force_rehighlight.clear();
        self.state = HighlighterState::Idle;
        debug!(
            first,
            blocks = processed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "highlighting finished"
        );
        self.listeners
            .emit(HighlighterEvent::Finished { blocks: processed });
        BurstOutcome::Finished { blocks: processed }
    }

    fn yield_at(
        &mut self,
        doc: &Document,
        index: usize,
        id: BlockId,
        forced: bool,
        pending: PendingRange,
        processed: usize,
    ) -> BurstOutcome {
        if forced {
            self.force_rehighlight.insert(id);
        }
        let start = doc.block_position(index).unwrap_or(pending.start);
        self.pending = Some(PendingRange {
            start,
            end: pending.end.max(start),
        });
        self.state = HighlighterState::PendingRehighlight;
        trace!(next_block = index, blocks = processed, "burst budget exhausted");
        self.listeners
            .emit(HighlighterEvent::Yielded { next_block: index });
        BurstOutcome::Yielded {
            next_block: index,
            blocks: processed,
        }
    }

    fn cancelled(&mut self) -> BurstOutcome {
        self.pending = None;
        self.force_rehighlight.clear();
        self.state = HighlighterState::Idle;
        debug!("highlighting cancelled");
        self.listeners.emit(HighlighterEvent::Cancelled);
        BurstOutcome::Cancelled
    }

    /// Runs the lexer over one block and stores what it produced. Returns
    /// whether the block's exit state changed.
    fn highlight_block(&mut self, doc: &mut Document, index: usize) -> bool {
        let Some(block) = doc.block(index) else {
            return false;
        };
        if let Some(highlighted) = self.highlighted.as_mut() {
            highlighted.push((block.id(), index));
        }
        let text = block.text();
        let state_before = block.user_state();
        let previous_state = index.checked_sub(1).map_or(-1, |i| doc.user_state(i));
        let previous_suffix = index
            .checked_sub(1)
            .and_then(|i| doc.expected_raw_string_suffix(i));
        let suffix_before = doc.expected_raw_string_suffix(index).map(<[u8]>::to_vec);

        self.chars.clear();
        self.chars.extend(text.chars());
        self.scratch.clear();
        self.scratch.resize(self.chars.len(), None);

        let mut cx = BlockContext::new(
            text,
            &self.chars,
            previous_state,
            state_before,
            previous_suffix,
            &mut self.scratch,
            &self.categories,
            self.visual_whitespace,
        );
        self.lexer.highlight_block(&mut cx);
        let out = cx.finish();

        let ranges = coalesce_runs(&self.scratch, FormatOrigin::Syntax);
        let ranges = apply_preedit(ranges, doc.preedit(index));
        doc.set_formats(index, ranges);

        doc.set_user_state(index, out.state);
        if let Some(parentheses) = out.parentheses {
            doc.set_parentheses(index, parentheses);
        }
        if let Some(indent) = out.folding_indent {
            doc.set_folding_indent(index, indent);
        }
        if let Some(state) = out.lexer_state {
            doc.set_lexer_state(index, state);
        }
        if let Some(ifdefed_out) = out.ifdefed_out {
            doc.set_ifdefed_out(index, ifdefed_out);
        }
        let suffix_changed = match out.raw_string_suffix {
            Some(suffix) => {
                let changed = suffix != suffix_before;
                doc.set_expected_raw_string_suffix(index, suffix);
                changed
            }
            None => false,
        };

        out.state != state_before || suffix_changed
    }
}

impl<L> std::fmt::Debug for SyntaxHighlighter<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxHighlighter")
            .field("document", &self.document)
            .field("state", &self.state)
            .field("pending", &self.pending)
            .field("budget", &self.budget)
            .field("listeners", &self.listeners)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::CLikeLexer;
    use lumen_buffer::{DocumentEvent, FormatRange};
    use std::sync::Mutex;

    fn highlighter() -> SyntaxHighlighter<CLikeLexer> {
        let mut hl = SyntaxHighlighter::new(CLikeLexer::new());
        hl.set_format_categories(CLikeLexer::categories());
        hl.set_visual_whitespace(false);
        hl
    }

    fn attached(text: &str) -> (SyntaxHighlighter<CLikeLexer>, Document) {
        let mut doc = Document::from_text(text);
        let mut hl = highlighter();
        hl.attach(&doc);
        assert!(matches!(hl.run_pending(&mut doc), BurstOutcome::Finished { .. }));
        doc.take_events();
        (hl, doc)
    }

    fn styles(doc: &Document, block: usize) -> Vec<(usize, usize, Format)> {
        doc.syntax_formats(block)
            .into_iter()
            .map(|r| (r.start, r.length, r.format))
            .collect()
    }

    fn is_comment(doc: &Document, block: usize) -> bool {
        let len = doc.block(block).map_or(0, |b| b.len());
        styles(doc, block) == vec![(0, len, Format::Named(TextStyle::Comment))]
    }

    fn formats_changed(events: &[DocumentEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, DocumentEvent::FormatsChanged { .. }))
            .count()
    }

    // ==================== Attach / Detach ====================

    #[test]
    fn test_attach_schedules_full_pass() {
        let doc = Document::from_text("int a;\nint b;");
        let mut hl = highlighter();
        hl.attach(&doc);
        assert_eq!(hl.state(), HighlighterState::PendingRehighlight);
        assert!(doc.syntax_formats(0).is_empty());
    }

    #[test]
    fn test_first_pass_highlights_every_block() {
        let (hl, doc) = attached("int a;\nreturn b;");
        assert_eq!(hl.state(), HighlighterState::Idle);
        assert_eq!(styles(&doc, 0)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
        assert_eq!(styles(&doc, 1)[0], (0, 6, Format::Named(TextStyle::Keyword)));
    }

    #[test]
    fn test_detach_clears_syntax_only() {
        let (mut hl, mut doc) = attached("int a;");
        doc.set_extra_formats(0, vec![FormatRange::semantic(4, 1, TextStyle::Local)]);
        hl.detach(&mut doc);
        assert!(doc.syntax_formats(0).is_empty());
        assert_eq!(doc.extra_formats(0).len(), 1);
        assert_eq!(doc.user_state(0), -1);
    }

    #[test]
    fn test_detached_entry_points_are_noops() {
        let mut doc = Document::from_text("int a;");
        let mut hl = highlighter();
        let change = doc.apply_edit(0, 0, "x");
        assert_eq!(hl.contents_change(&mut doc, change), BurstOutcome::Detached);
        assert_eq!(hl.rehighlight(&mut doc), BurstOutcome::Detached);
        assert_eq!(hl.run_pending(&mut doc), BurstOutcome::Detached);
        assert!(doc.syntax_formats(0).is_empty());
    }

    #[test]
    fn test_other_document_is_not_touched() {
        let (mut hl, _doc) = attached("int a;");
        let mut other = Document::from_text("int b;");
        assert_eq!(hl.rehighlight(&mut other), BurstOutcome::Detached);
        assert!(other.syntax_formats(0).is_empty());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not attached")]
    fn test_detach_from_foreign_document_asserts() {
        let (mut hl, _doc) = attached("int a;");
        let mut other = Document::from_text("int b;");
        hl.detach(&mut other);
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "not attached")]
    fn test_edit_from_foreign_document_asserts() {
        let (mut hl, _doc) = attached("int a;");
        let mut other = Document::from_text("int b;");
        let change = other.apply_edit(0, 0, "x");
        hl.contents_change(&mut other, change);
    }

    // ==================== Edits ====================

    #[test]
    fn test_edit_reformats_only_touched_block() {
        let (mut hl, mut doc) = attached("int a;\nint b;\nint c;");
        let change = doc.apply_edit(8, 0, "x");
        assert_eq!(hl.contents_change(&mut doc, change), BurstOutcome::Finished { blocks: 1 });
    }

    #[test]
    fn test_rehighlight_is_idempotent() {
        let (mut hl, mut doc) = attached("int a;\nfoo(1);");
        hl.rehighlight(&mut doc);
        assert_eq!(formats_changed(&doc.take_events()), 0);
    }

    #[test]
    fn test_open_comment_propagates_until_state_settles() {
        let (mut hl, mut doc) = attached("int a;\nint b;\nint c;\nint d;\nend */ x;\nint f;");
        let line3 = doc.block_position(2).unwrap_or(0);
        let change = doc.apply_edit(line3, 0, "/*");
        assert_eq!(hl.contents_change(&mut doc, change), BurstOutcome::Finished { blocks: 3 });
        assert!(is_comment(&doc, 2));
        assert!(is_comment(&doc, 3));
        assert_eq!(styles(&doc, 4)[0], (0, 6, Format::Named(TextStyle::Comment)));
        assert_eq!(styles(&doc, 5)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
    }

    #[test]
    fn test_closing_comment_restores_following_blocks() {
        let (mut hl, mut doc) = attached("/*\nint a;\nint b;");
        assert!(is_comment(&doc, 1));
        let change = doc.apply_edit(0, 2, "");
        hl.contents_change(&mut doc, change);
        assert_eq!(styles(&doc, 1)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
        assert_eq!(styles(&doc, 2)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
    }

    #[test]
    fn test_split_block_is_highlighted() {
        let (mut hl, mut doc) = attached("int a; int b;");
        let change = doc.apply_edit(6, 1, "\n");
        hl.contents_change(&mut doc, change);
        assert_eq!(doc.block_count(), 2);
        assert_eq!(styles(&doc, 1)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
    }

    #[test]
    fn test_scratch_is_resized_between_blocks() {
        let (_hl, doc) = attached("int aaaaaaaaaaaaaaaa;\n1");
        assert_eq!(styles(&doc, 1), vec![(0, 1, Format::Named(TextStyle::Number))]);
    }

    #[test]
    fn test_preedit_is_never_formatted() {
        let (mut hl, mut doc) = attached("int a;");
        doc.set_preedit(0, 3, "XX");
        hl.rehighlight_block(&mut doc, 0);
        for range in doc.syntax_formats(0) {
            assert!(range.end() <= 3 || range.start >= 5, "{range:?} covers preedit");
        }
        assert_eq!(styles(&doc, 0)[0], (0, 3, Format::Named(TextStyle::PrimitiveType)));
    }

    // ==================== Bursts ====================

    #[test]
    fn test_burst_yields_and_resumes() {
        let mut doc = Document::from_text("int a;\nint b;\nint c;\nint d;\nint e;");
        let mut hl = highlighter();
        hl.set_budget(BurstBudget::blocks(2));
        hl.attach(&doc);

        assert_eq!(
            hl.run_pending(&mut doc),
            BurstOutcome::Yielded { next_block: 2, blocks: 2 }
        );
        assert_eq!(hl.state(), HighlighterState::PendingRehighlight);
        assert!(doc.syntax_formats(2).is_empty());

        assert_eq!(
            hl.run_pending(&mut doc),
            BurstOutcome::Yielded { next_block: 4, blocks: 2 }
        );
        assert_eq!(hl.run_pending(&mut doc), BurstOutcome::Finished { blocks: 1 });
        assert_eq!(hl.run_pending(&mut doc), BurstOutcome::Idle);
        assert!(!doc.syntax_formats(4).is_empty());
    }

    #[test]
    fn test_forced_block_survives_yield() {
        let (mut hl, mut doc) = attached("int a;\nint b;\nint c;\nint d;");
        hl.set_budget(BurstBudget::blocks(1));
        let change = doc.apply_edit(0, 0, "/*");
        assert_eq!(
            hl.contents_change(&mut doc, change),
            BurstOutcome::Yielded { next_block: 1, blocks: 1 }
        );
        while matches!(hl.run_pending(&mut doc), BurstOutcome::Yielded { .. }) {}
        for block in 0..4 {
            assert!(
                doc.syntax_formats(block)
                    .iter()
                    .all(|r| r.format == Format::Named(TextStyle::Comment)),
                "block {block}"
            );
        }
    }

    #[test]
    fn test_edits_while_pending_are_deferred() {
        let mut doc = Document::from_text("int a;\nint b;\nint c;");
        let mut hl = highlighter();
        hl.set_budget(BurstBudget::blocks(1));
        hl.attach(&doc);
        hl.run_pending(&mut doc);
        let change = doc.apply_edit(0, 0, "x");
        assert_eq!(hl.contents_change(&mut doc, change), BurstOutcome::Deferred);
        hl.set_budget(BurstBudget::unlimited());
        assert!(matches!(hl.run_pending(&mut doc), BurstOutcome::Finished { .. }));
        assert_eq!(styles(&doc, 0), vec![(6, 1, Format::Named(TextStyle::Punctuation))]);
    }

    #[test]
    fn test_deleted_blocks_while_pending_are_skipped() {
        let mut doc = Document::from_text("int a;\nint b;\nint c;\nint d;");
        let mut hl = highlighter();
        hl.set_budget(BurstBudget::blocks(2));
        hl.attach(&doc);
        hl.run_pending(&mut doc);
        let len = doc.len();
        let change = doc.apply_edit(3, len - 3, "");
        assert_eq!(hl.contents_change(&mut doc, change), BurstOutcome::Deferred);
        hl.set_budget(BurstBudget::unlimited());
        assert_eq!(hl.run_pending(&mut doc), BurstOutcome::Finished { blocks: 1 });
        assert_eq!(doc.block_count(), 1);
    }

    #[test]
    fn test_rehighlight_block_keeps_pending_work() {
        let mut doc = Document::from_text("int a;\nint b;\nint c;");
        let mut hl = highlighter();
        hl.set_budget(BurstBudget::blocks(1));
        hl.attach(&doc);
        hl.run_pending(&mut doc);
        hl.rehighlight_block(&mut doc, 2);
        assert!(!doc.syntax_formats(2).is_empty());
        assert_eq!(hl.state(), HighlighterState::PendingRehighlight);
    }

    // ==================== Cancellation & events ====================

    #[test]
    fn test_cancel_drops_pending_work() {
        let mut doc = Document::from_text("int a;\nint b;");
        let mut hl = highlighter();
        hl.attach(&doc);
        hl.cancel_token().cancel();
        assert_eq!(hl.run_pending(&mut doc), BurstOutcome::Cancelled);
        assert_eq!(hl.state(), HighlighterState::Idle);
        assert!(doc.syntax_formats(0).is_empty());
        // A fresh rehighlight clears the token.
        assert!(matches!(hl.rehighlight(&mut doc), BurstOutcome::Finished { .. }));
    }

    #[test]
    fn test_listeners_see_yield_and_finish() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut doc = Document::from_text("a\nb\nc");
        let mut hl = highlighter();
        hl.set_budget(BurstBudget::blocks(2));
        let sink = Arc::clone(&seen);
        hl.add_listener(move |event| sink.lock().unwrap().push(*event));
        hl.attach(&doc);
        hl.run_pending(&mut doc);
        hl.run_pending(&mut doc);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                HighlighterEvent::Yielded { next_block: 2 },
                HighlighterEvent::Finished { blocks: 1 },
            ]
        );
    }

    #[test]
    fn test_shift_position_rules() {
        let change = ContentsChange::new(10, 4, 2);
        assert_eq!(shift_position(5, &change), 5);
        assert_eq!(shift_position(10, &change), 10);
        assert_eq!(shift_position(12, &change), 12);
        assert_eq!(shift_position(20, &change), 18);
        assert_eq!(shift_position(usize::MAX, &change), usize::MAX);
    }

    #[test]
    fn test_tracking_reports_relexed_blocks() {
        let mut doc = Document::from_text("a\nb\nc");
        let mut hl = highlighter();
        assert!(hl.take_highlighted_blocks().is_empty());
        hl.track_highlighted_blocks(true);
        hl.attach(&doc);
        hl.run_pending(&mut doc);
        let ids: Vec<_> = (0..3).map(|i| (doc.block(i).unwrap().id(), i)).collect();
        assert_eq!(hl.take_highlighted_blocks(), ids);

        let change = doc.apply_edit(2, 1, "x");
        hl.contents_change(&mut doc, change);
        assert_eq!(hl.take_highlighted_blocks().first(), Some(&ids[1]));
        assert!(hl.take_highlighted_blocks().is_empty());
    }
}
