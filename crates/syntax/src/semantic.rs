// Chunk: docs/chunks/semantic_merge - Semantic result merger

//! Merging semantic analysis results into a document.
//!
//! A semantic producer (a language server, a background indexer) reports
//! [`HighlightingResult`]s by line and column. This module turns them into
//! [`FormatOrigin::Semantic`](lumen_buffer::FormatOrigin) ranges and writes
//! them with [`Document::set_extra_formats`], never touching syntax ranges.
//!
//! Three protocols are supported:
//!
//! - [`incremental_apply_extra_formats`] for producers that stream results
//!   ordered by line. Each window of new results replaces the semantic ranges
//!   of exactly the blocks it covers, clearing blocks in between that got no
//!   result.
//! - [`set_extra_additional_formats`] for one-shot producers: clear
//!   everything, then apply.
//! - [`clear_extra_additional_formats_until_end`] after the last result of an
//!   ordered stream, for blocks past the end of the analysis.
//!
//! [`SemanticMerger`] wraps the incremental protocol around a bounded
//! channel so producers can run on other threads while the merge itself
//! happens on the document owner's thread.

use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use lumen_buffer::{Document, Format, FormatRange, TextStyle};
use tracing::{debug, trace, warn};

use crate::error::Result;

/// One semantic token. Lines and columns are 1-based; `length` counts
/// characters and may run past the end of the line, with each block
/// separator counting as one character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighlightingResult {
    pub line: usize,
    pub column: usize,
    pub length: usize,
    /// Producer-defined kind, looked up in a [`KindStyleMap`].
    pub kind: u32,
    /// A style carried directly by the result; takes precedence over `kind`.
    pub text_style: Option<TextStyle>,
}

impl HighlightingResult {
    pub fn new(line: usize, column: usize, length: usize, kind: u32) -> Self {
        Self {
            line,
            column,
            length,
            kind,
            text_style: None,
        }
    }

    pub fn styled(line: usize, column: usize, length: usize, style: TextStyle) -> Self {
        Self {
            line,
            column,
            length,
            kind: 0,
            text_style: Some(style),
        }
    }
}

/// Maps producer kinds to formats.
#[derive(Debug, Clone, Default)]
pub struct KindStyleMap {
    formats: HashMap<u32, Format>,
}

impl KindStyleMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: u32, format: impl Into<Format>) {
        self.formats.insert(kind, format.into());
    }

    pub fn get(&self, kind: u32) -> Option<Format> {
        self.formats.get(&kind).copied()
    }

    /// The format a result is drawn with, if any.
    pub fn format_for(&self, result: &HighlightingResult) -> Option<Format> {
        result
            .text_style
            .map(Format::Named)
            .or_else(|| self.get(result.kind))
    }
}

impl<F: Into<Format>> FromIterator<(u32, F)> for KindStyleMap {
    fn from_iter<I: IntoIterator<Item = (u32, F)>>(iter: I) -> Self {
        Self {
            formats: iter.into_iter().map(|(k, f)| (k, f.into())).collect(),
        }
    }
}

/// The part of a result that falls in one block. `length` may include the
/// block separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSpan {
    pub block: usize,
    pub start: usize,
    pub length: usize,
}

/// Divides a result into per-block spans.
pub type Splitter = dyn Fn(&Document, &HighlightingResult) -> Vec<BlockSpan> + Send + Sync;

/// A result is usable when its line exists and its column is inside the
/// line or just past its last character.
fn is_well_formed(doc: &Document, result: &HighlightingResult) -> bool {
    let Some(block) = result.line.checked_sub(1).and_then(|i| doc.block(i)) else {
        return false;
    };
    result.column >= 1 && result.column - 1 <= block.len()
}

/// Default splitter: cuts a result at block boundaries.
///
/// Every span but the last ends just after its block's separator, so the
/// spans' lengths add up to the result's length. A result running off the
/// end of the document is truncated there. A malformed result yields no
/// spans.
pub fn split_result(doc: &Document, result: &HighlightingResult) -> Vec<BlockSpan> {
    let mut spans = Vec::new();
    if !is_well_formed(doc, result) {
        return spans;
    }
    let (mut block, mut start) = (result.line - 1, result.column - 1);
    let mut remaining = result.length;
    while remaining > 0 {
        let Some(current) = doc.block(block) else {
            break;
        };
        let available = (current.length() - start.min(current.length())).max(1);
        let length = remaining.min(available);
        spans.push(BlockSpan {
            block,
            start,
            length,
        });
        remaining -= length;
        block += 1;
        start = 0;
    }
    spans
}

/// Resolves one result to block-local semantic ranges. Malformed results
/// (line 0, line past the document, column 0, column past the line end) and
/// results with no format yield nothing.
pub fn ranges_for_result(
    doc: &Document,
    result: &HighlightingResult,
    kinds: &KindStyleMap,
    splitter: Option<&Splitter>,
) -> Vec<(usize, FormatRange)> {
    if !is_well_formed(doc, result) {
        warn!(
            line = result.line,
            column = result.column,
            blocks = doc.block_count(),
            "dropping malformed highlighting result"
        );
        return Vec::new();
    }
    let Some(format) = kinds.format_for(result) else {
        debug!(kind = result.kind, "no format for highlighting result kind");
        return Vec::new();
    };
    let spans = match splitter {
        Some(splitter) => splitter(doc, result),
        None => split_result(doc, result),
    };
    spans
        .into_iter()
        .filter_map(|span| {
            let len = doc.block(span.block)?.len();
            if span.start >= len {
                return None;
            }
            let length = span.length.min(len - span.start);
            Some((span.block, FormatRange::semantic(span.start, length, format)))
        })
        .collect()
}

fn group_by_block<'a>(
    doc: &Document,
    results: impl IntoIterator<Item = &'a HighlightingResult>,
    kinds: &KindStyleMap,
    splitter: Option<&Splitter>,
) -> BTreeMap<usize, Vec<FormatRange>> {
    let mut grouped: BTreeMap<usize, Vec<FormatRange>> = BTreeMap::new();
    for result in results {
        for (block, range) in ranges_for_result(doc, result, kinds, splitter) {
            grouped.entry(block).or_default().push(range);
        }
    }
    grouped
}

/// Applies the window `window` of a line-ordered result stream.
///
/// Results before the window on the same line as its first result are
/// re-applied with it, so a line split across two windows keeps all of its
/// ranges. Blocks from the line after the last earlier result up to the last
/// block with a result are rewritten: blocks with results get exactly those
/// ranges, blocks without are cleared. Blocks outside that span are left
/// alone. Malformed results never move either bound.
pub fn incremental_apply_extra_formats(
    doc: &mut Document,
    results: &[HighlightingResult],
    window: Range<usize>,
    kinds: &KindStyleMap,
    splitter: Option<&Splitter>,
) {
    let end = window.end.min(results.len());
    if window.start >= end {
        return;
    }
    let Some(first_line) = results[window.start..end]
        .iter()
        .find(|r| is_well_formed(doc, r))
        .map(|r| r.line)
    else {
        // Nothing usable; report the malformed results and touch no block.
        group_by_block(doc, &results[window.start..end], kinds, splitter);
        return;
    };

    let mut begin = window.start;
    let mut first_block = 0;
    for (i, earlier) in results[..window.start].iter().enumerate().rev() {
        if !is_well_formed(doc, earlier) {
            continue;
        }
        if earlier.line == first_line {
            begin = i;
        } else if earlier.line < first_line {
            // 1-based line of the earlier result is the 0-based index of the
            // block after it.
            first_block = earlier.line;
            break;
        }
    }

    let window_results = &results[begin..end];
    let last_block = window_results
        .iter()
        .filter(|r| is_well_formed(doc, r))
        .map(|r| r.line - 1)
        .max();
    let grouped = group_by_block(doc, window_results, kinds, splitter);

    if let Some(last_block) = last_block {
        for block in first_block..=last_block {
            if !grouped.contains_key(&block) {
                doc.clear_extra_formats(block);
            }
        }
    }
    trace!(
        first_block,
        ?last_block,
        results = window_results.len(),
        "incremental semantic merge"
    );
    for (block, ranges) in grouped {
        doc.set_extra_formats(block, ranges);
    }
}

/// Replaces every semantic range in the document with `results`, in any
/// order.
pub fn set_extra_additional_formats(
    doc: &mut Document,
    results: &[HighlightingResult],
    kinds: &KindStyleMap,
    splitter: Option<&Splitter>,
) {
    doc.clear_all_extra_formats();
    for (block, ranges) in group_by_block(doc, results, kinds, splitter) {
        doc.set_extra_formats(block, ranges);
    }
}

/// Clears semantic ranges of every block after the one holding the last
/// well-formed result; with none, of every block.
pub fn clear_extra_additional_formats_until_end(doc: &mut Document, results: &[HighlightingResult]) {
    let first = results
        .iter()
        .rev()
        .find(|r| is_well_formed(doc, r))
        .map_or(0, |r| r.line);
    if first >= doc.block_count() {
        return;
    }
    doc.clear_extra_formats_in(first..doc.block_count());
}

/// Messages from a semantic producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SemanticMessage {
    /// The next results of the stream, ordered by line after the previous
    /// batch.
    Results(Vec<HighlightingResult>),
    /// The stream is complete.
    Finished,
}

/// Sending half handed to a semantic producer.
#[derive(Debug, Clone)]
pub struct SemanticProducer {
    tx: Sender<SemanticMessage>,
}

impl SemanticProducer {
    /// Sends a batch, blocking while the queue is full.
    pub fn report(&self, results: Vec<HighlightingResult>) -> Result<()> {
        self.tx.send(SemanticMessage::Results(results))?;
        Ok(())
    }

    pub fn finish(&self) -> Result<()> {
        self.tx.send(SemanticMessage::Finished)?;
        Ok(())
    }
}

/// Owner-side end of a semantic stream.
///
/// Results accumulate across batches so each new window can look back at
/// the ones before it; every batch is applied exactly once.
pub struct SemanticMerger {
    tx: Sender<SemanticMessage>,
    rx: Receiver<SemanticMessage>,
    results: Vec<HighlightingResult>,
    kinds: KindStyleMap,
    splitter: Option<Box<Splitter>>,
}

impl SemanticMerger {
    pub fn new(capacity: usize, kinds: KindStyleMap) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            results: Vec::new(),
            kinds,
            splitter: None,
        }
    }

    pub fn producer(&self) -> SemanticProducer {
        SemanticProducer {
            tx: self.tx.clone(),
        }
    }

    pub fn set_splitter(
        &mut self,
        splitter: impl Fn(&Document, &HighlightingResult) -> Vec<BlockSpan> + Send + Sync + 'static,
    ) {
        self.splitter = Some(Box::new(splitter));
    }

    pub fn kinds_mut(&mut self) -> &mut KindStyleMap {
        &mut self.kinds
    }

    /// Results received in the current stream.
    pub fn results(&self) -> &[HighlightingResult] {
        &self.results
    }

    /// Forgets the current stream, e.g. when a new analysis starts.
    pub fn reset(&mut self) {
        self.results.clear();
        while self.rx.try_recv().is_ok() {}
    }

    /// Applies every message waiting in the queue. Returns the number of
    /// results applied.
    pub fn drain(&mut self, doc: &mut Document) -> usize {
        let mut applied = 0;
        loop {
            match self.rx.try_recv() {
                Ok(SemanticMessage::Results(batch)) => {
                    let from = self.results.len();
                    applied += batch.len();
                    self.results.extend(batch);
                    incremental_apply_extra_formats(
                        doc,
                        &self.results,
                        from..self.results.len(),
                        &self.kinds,
                        self.splitter.as_deref(),
                    );
                }
                Ok(SemanticMessage::Finished) => {
                    clear_extra_additional_formats_until_end(doc, &self.results);
                    debug!(results = self.results.len(), "semantic stream finished");
                    self.results.clear();
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        applied
    }
}

impl std::fmt::Debug for SemanticMerger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SemanticMerger")
            .field("results", &self.results.len())
            .field("kinds", &self.kinds)
            .field("splitter", &self.splitter.is_some())
            .finish()
    }
}
