// Chunk: docs/chunks/highlight_worker - Inline and threaded highlighter runners

//! Scheduling for the highlighter.
//!
//! [`InlineRunner`] drives a [`SyntaxHighlighter`] on the caller's thread;
//! continuation bursts run when the host calls
//! [`InlineRunner::process_pending`] from its event loop.
//!
//! [`ThreadedRunner`] moves tokenization to a worker thread. The worker owns
//! a shadow copy of the document and mirrors every edit and preedit change
//! onto it through a command queue. Neither queue is bounded: the owner's
//! thread never waits on the worker, and the worker never waits on an owner
//! that has stopped draining. After each round of commands it
//! runs a burst and posts a [`FormatBatch`] with every block it re-lexed.
//! Batches are keyed by block id and applied on the owner's thread with
//! [`ThreadedRunner::apply_results`], so the worker never writes to the
//! caller's document.
//!
//! [`HighlighterRunner`] picks one of the two from configuration.

use std::collections::BTreeSet;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use lumen_buffer::{
    apply_preedit, remove_preedit, BlockId, ContentsChange, Document, FormatRange,
    Parenthesis, TextStyle,
};
use tracing::{debug, info, trace, warn};

use crate::config::HighlighterConfig;
use crate::error::{HighlightError, Result};
use crate::highlighter::{BurstOutcome, CancelToken, HighlighterState, SyntaxHighlighter};
use crate::lexer::BlockLexer;

// =============================================================================
// Inline
// =============================================================================

/// Runs the highlighter on the caller's thread.
#[derive(Debug)]
pub struct InlineRunner<L> {
    highlighter: SyntaxHighlighter<L>,
}

impl<L: BlockLexer> InlineRunner<L> {
    /// Wraps a highlighter and attaches it to `doc`.
    pub fn new(mut highlighter: SyntaxHighlighter<L>, doc: &Document) -> Self {
        highlighter.attach(doc);
        Self { highlighter }
    }

    /// Applies an edit and runs the burst it triggers.
    pub fn edit(
        &mut self,
        doc: &mut Document,
        from: usize,
        chars_removed: usize,
        text: &str,
    ) -> (ContentsChange, BurstOutcome) {
        let change = doc.apply_edit(from, chars_removed, text);
        let outcome = self.highlighter.contents_change(doc, change);
        (change, outcome)
    }

    pub fn set_preedit(&mut self, doc: &mut Document, block: usize, position: usize, text: &str) {
        doc.set_preedit(block, position, text);
    }

    /// Runs one continuation burst.
    pub fn process_pending(&mut self, doc: &mut Document) -> BurstOutcome {
        self.highlighter.run_pending(doc)
    }

    /// Runs bursts until nothing is pending.
    pub fn run_until_idle(&mut self, doc: &mut Document) -> BurstOutcome {
        loop {
            match self.highlighter.run_pending(doc) {
                BurstOutcome::Yielded { .. } => continue,
                outcome => return outcome,
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.highlighter.state() == HighlighterState::Idle
    }

    pub fn highlighter(&self) -> &SyntaxHighlighter<L> {
        &self.highlighter
    }

    pub fn highlighter_mut(&mut self) -> &mut SyntaxHighlighter<L> {
        &mut self.highlighter
    }
}

// =============================================================================
// Threaded
// =============================================================================

/// Commands mirrored onto the worker's shadow document.
#[derive(Debug)]
enum WorkerCommand {
    Edit {
        from: usize,
        chars_removed: usize,
        text: String,
    },
    Preedit {
        block: usize,
        position: usize,
        text: String,
    },
    Rehighlight,
    /// Resend the current output of these blocks.
    Refresh(Vec<(BlockId, usize)>),
    /// Replace the shadow document.
    Reset(Box<Document>),
    Shutdown,
}

/// Syntax output for one block, computed on the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockFormats {
    pub id: BlockId,
    /// Index on the worker when the batch was built.
    pub index_hint: usize,
    pub user_state: i32,
    /// Syntax ranges over the committed text, without any preedit shift.
    pub formats: Vec<FormatRange>,
    pub parentheses: Vec<Parenthesis>,
    pub folding_indent: i32,
    pub lexer_state: i32,
    pub ifdefed_out: bool,
    pub expected_raw_string_suffix: Option<Vec<u8>>,
}

/// Results of one worker round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatBatch {
    /// Shadow document revision the formats were computed against.
    pub revision: u64,
    /// Sequence number of the last command the worker had processed.
    pub sequence: u64,
    pub blocks: Vec<BlockFormats>,
    /// The worker has no work left.
    pub finished: bool,
}

/// Runs the highlighter on a worker thread against a shadow document.
///
/// A batch is only applied when its revision matches the document's. A
/// batch that lost the race against a newer edit is dropped and its blocks
/// are requested again, so the document converges once edits stop.
pub struct ThreadedRunner {
    commands: Sender<(u64, WorkerCommand)>,
    /// Dropped before joining so the worker's next send fails and it exits.
    results: Option<Receiver<FormatBatch>>,
    cancel: CancelToken,
    handle: Option<JoinHandle<()>>,
    sent: u64,
    /// Batches older than the last reset belong to another document.
    reset_sequence: u64,
    finished_sequence: Option<u64>,
}

impl ThreadedRunner {
    /// Spawns the worker with a shadow copy of `doc`.
    pub fn spawn<L>(
        mut highlighter: SyntaxHighlighter<L>,
        doc: &Document,
        config: &HighlighterConfig,
    ) -> Result<Self>
    where
        L: BlockLexer + Send + 'static,
    {
        let (commands, rx_cmd) = unbounded();
        let (tx_evt, results) = unbounded();
        let cancel = highlighter.cancel_token();
        let shadow = doc.shadow_copy();
        highlighter.track_highlighted_blocks(true);
        highlighter.attach(&shadow);
        let worker = Worker {
            highlighter,
            shadow,
            refresh: Vec::new(),
            sequence: 0,
        };

        let handle = thread::Builder::new()
            .name(config.worker.thread_name.clone())
            .spawn(move || worker.run(rx_cmd, tx_evt))
            .map_err(HighlightError::WorkerSpawn)?;

        info!(
            target: "lumen_syntax::worker",
            thread = config.worker.thread_name.as_str(),
            "highlight worker started"
        );
        Ok(Self {
            commands,
            results: Some(results),
            cancel,
            handle: Some(handle),
            sent: 0,
            reset_sequence: 0,
            finished_sequence: None,
        })
    }

    fn send(&mut self, command: WorkerCommand) -> Result<()> {
        self.sent += 1;
        self.finished_sequence = None;
        self.commands.send((self.sent, command))?;
        Ok(())
    }

    /// Applies an edit to `doc` and mirrors it onto the worker.
    pub fn edit(
        &mut self,
        doc: &mut Document,
        from: usize,
        chars_removed: usize,
        text: &str,
    ) -> Result<ContentsChange> {
        let change = doc.apply_edit(from, chars_removed, text);
        self.send(WorkerCommand::Edit {
            from: change.from,
            chars_removed: change.chars_removed,
            text: text.to_owned(),
        })?;
        Ok(change)
    }

    pub fn set_preedit(
        &mut self,
        doc: &mut Document,
        block: usize,
        position: usize,
        text: &str,
    ) -> Result<()> {
        doc.set_preedit(block, position, text);
        self.send(WorkerCommand::Preedit {
            block,
            position,
            text: text.to_owned(),
        })
    }

    pub fn rehighlight(&mut self) -> Result<()> {
        self.send(WorkerCommand::Rehighlight)
    }

    /// Cancels in-flight work and restarts the worker on a copy of `doc`.
    pub fn reset(&mut self, doc: &Document) -> Result<()> {
        self.cancel.cancel();
        self.send(WorkerCommand::Reset(Box::new(doc.shadow_copy())))?;
        self.reset_sequence = self.sent;
        Ok(())
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Whether the worker reported finishing everything sent so far.
    pub fn is_idle(&self) -> bool {
        self.finished_sequence == Some(self.sent)
    }

    /// Applies every batch waiting in the queue. Returns the number of
    /// blocks updated.
    pub fn apply_results(&mut self, doc: &mut Document) -> Result<usize> {
        let mut applied = 0;
        while let Some(batch) = self.results.as_ref().and_then(|rx| rx.try_recv().ok()) {
            applied += self.apply_batch(doc, batch)?;
        }
        Ok(applied)
    }

    /// Applies batches as they arrive until the worker has finished every
    /// command sent so far, or `timeout` passes. Returns whether it finished.
    pub fn wait_until_idle(&mut self, doc: &mut Document, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        while !self.is_idle() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let Some(rx) = self.results.as_ref() else {
                return Err(HighlightError::Disconnected);
            };
            match rx.recv_timeout(remaining) {
                Ok(batch) => {
                    self.apply_batch(doc, batch)?;
                }
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => return Err(HighlightError::Disconnected),
            }
        }
        Ok(true)
    }

    fn apply_batch(&mut self, doc: &mut Document, batch: FormatBatch) -> Result<usize> {
        if batch.sequence < self.reset_sequence {
            trace!(sequence = batch.sequence, "dropping batch from before reset");
            return Ok(0);
        }
        if batch.revision != doc.revision() {
            trace!(
                batch = batch.revision,
                document = doc.revision(),
                blocks = batch.blocks.len(),
                "stale batch; requesting refresh"
            );
            if !batch.blocks.is_empty() {
                let ids = batch.blocks.iter().map(|b| (b.id, b.index_hint)).collect();
                self.send(WorkerCommand::Refresh(ids))?;
            }
            return Ok(0);
        }
        if batch.finished {
            self.finished_sequence = Some(batch.sequence);
        }
        let mut applied = 0;
        for block in batch.blocks {
            let Some(index) = doc.index_of(block.id, block.index_hint) else {
                trace!(block = ?block.id, "batch block no longer exists");
                continue;
            };
            let formats = apply_preedit(block.formats, doc.preedit(index));
            doc.set_formats(index, formats);
            doc.set_parentheses(index, block.parentheses);
            doc.set_folding_indent(index, block.folding_indent);
            doc.set_lexer_state(index, block.lexer_state);
            doc.set_ifdefed_out(index, block.ifdefed_out);
            doc.set_expected_raw_string_suffix(index, block.expected_raw_string_suffix);
            doc.set_user_state(index, block.user_state);
            applied += 1;
        }
        Ok(applied)
    }
}

impl Drop for ThreadedRunner {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.results.take();
        let _ = self.commands.send((self.sent + 1, WorkerCommand::Shutdown));
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "lumen_syntax::worker", "highlight worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for ThreadedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThreadedRunner")
            .field("sent", &self.sent)
            .field("finished_sequence", &self.finished_sequence)
            .finish_non_exhaustive()
    }
}

/// State owned by the worker thread.
struct Worker<L> {
    highlighter: SyntaxHighlighter<L>,
    shadow: Document,
    /// Blocks to include in the next batch whether or not they changed.
    refresh: Vec<(BlockId, usize)>,
    /// Last command processed.
    sequence: u64,
}

impl<L: BlockLexer> Worker<L> {
    fn run(mut self, commands: Receiver<(u64, WorkerCommand)>, results: Sender<FormatBatch>) {
        loop {
            let first = if self.highlighter.state() == HighlighterState::PendingRehighlight {
                match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                }
            } else {
                match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                }
            };

            let started = Instant::now();
            let mut shutdown = false;
            // Apply the whole backlog before tokenizing.
            let backlog = first
                .into_iter()
                .chain(std::iter::from_fn(|| commands.try_recv().ok()));
            for (sequence, command) in backlog {
                self.sequence = sequence;
                if !self.apply(command) {
                    shutdown = true;
                    break;
                }
            }
            if shutdown {
                break;
            }

            let outcome = self.highlighter.run_pending(&mut self.shadow);
            let batch = self.collect_batch();
            trace!(
                target: "lumen_syntax::worker",
                ?outcome,
                blocks = batch.blocks.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "worker round"
            );
            if results.send(batch).is_err() {
                break;
            }
        }
        debug!(target: "lumen_syntax::worker", "highlight worker stopped");
    }

    /// Returns false on shutdown.
    fn apply(&mut self, command: WorkerCommand) -> bool {
        let shadow = &mut self.shadow;
        match command {
            WorkerCommand::Edit {
                from,
                chars_removed,
                text,
            } => {
                let change = shadow.apply_edit(from, chars_removed, &text);
                self.highlighter.contents_change(shadow, change);
            }
            WorkerCommand::Preedit {
                block,
                position,
                text,
            } => shadow.set_preedit(block, position, &text),
            WorkerCommand::Rehighlight => {
                self.highlighter.rehighlight(shadow);
            }
            WorkerCommand::Refresh(blocks) => self.refresh.extend(blocks),
            WorkerCommand::Reset(document) => {
                self.highlighter.detach(shadow);
                *shadow = *document;
                shadow.take_events();
                self.refresh.clear();
                self.highlighter.attach(shadow);
            }
            WorkerCommand::Shutdown => return false,
        }
        true
    }

    fn collect_batch(&mut self) -> FormatBatch {
        let shadow = &mut self.shadow;
        shadow.take_dirty();
        shadow.take_events();
        let touched: BTreeSet<usize> = self
            .highlighter
            .take_highlighted_blocks()
            .into_iter()
            .chain(self.refresh.drain(..))
            .filter_map(|(id, hint)| shadow.index_of(id, hint))
            .collect();
        let blocks = touched
            .into_iter()
            .filter_map(|index| {
                let block = shadow.block(index)?;
                Some(BlockFormats {
                    id: block.id(),
                    index_hint: index,
                    user_state: block.user_state(),
                    formats: remove_preedit(shadow.syntax_formats(index), shadow.preedit(index)),
                    parentheses: shadow.parentheses(index).to_vec(),
                    folding_indent: shadow.folding_indent(index),
                    lexer_state: shadow.lexer_state(index),
                    ifdefed_out: shadow.is_ifdefed_out(index),
                    expected_raw_string_suffix: shadow
                        .expected_raw_string_suffix(index)
                        .map(<[u8]>::to_vec),
                })
            })
            .collect();
        FormatBatch {
            revision: shadow.revision(),
            sequence: self.sequence,
            blocks,
            finished: self.highlighter.state() == HighlighterState::Idle,
        }
    }
}

// =============================================================================
// Runner selection
// =============================================================================

/// A highlighter driven inline or on a worker, chosen by
/// [`WorkerConfig::enabled`](crate::config::WorkerConfig).
#[derive(Debug)]
pub enum HighlighterRunner<L> {
    Inline(InlineRunner<L>),
    Threaded(ThreadedRunner),
}

impl<L: BlockLexer + Send + 'static> HighlighterRunner<L> {
    /// Builds a highlighter for `lexer` with the given categories and starts
    /// it on `doc`.
    pub fn start(
        lexer: L,
        categories: Vec<TextStyle>,
        doc: &Document,
        config: &HighlighterConfig,
    ) -> Result<Self> {
        let mut highlighter = SyntaxHighlighter::with_config(lexer, config);
        highlighter.set_format_categories(categories);
        if config.worker.enabled {
            ThreadedRunner::spawn(highlighter, doc, config).map(Self::Threaded)
        } else {
            Ok(Self::Inline(InlineRunner::new(highlighter, doc)))
        }
    }

    pub fn edit(
        &mut self,
        doc: &mut Document,
        from: usize,
        chars_removed: usize,
        text: &str,
    ) -> Result<ContentsChange> {
        match self {
            Self::Inline(runner) => Ok(runner.edit(doc, from, chars_removed, text).0),
            Self::Threaded(runner) => runner.edit(doc, from, chars_removed, text),
        }
    }

    pub fn set_preedit(
        &mut self,
        doc: &mut Document,
        block: usize,
        position: usize,
        text: &str,
    ) -> Result<()> {
        match self {
            Self::Inline(runner) => {
                runner.set_preedit(doc, block, position, text);
                Ok(())
            }
            Self::Threaded(runner) => runner.set_preedit(doc, block, position, text),
        }
    }

    /// Host event loop hook: runs a continuation burst or applies worker
    /// results.
    pub fn process(&mut self, doc: &mut Document) -> Result<()> {
        match self {
            Self::Inline(runner) => {
                runner.process_pending(doc);
            }
            Self::Threaded(runner) => {
                runner.apply_results(doc)?;
            }
        }
        Ok(())
    }

    pub fn is_idle(&self) -> bool {
        match self {
            Self::Inline(runner) => runner.is_idle(),
            Self::Threaded(runner) => runner.is_idle(),
        }
    }
}
