// Chunk: docs/chunks/syntax_highlighting - Incremental highlighter and semantic merger

//! lumen-syntax: incremental two-layer highlighting for lumen documents.
//!
//! Edits never force a whole-document rescan. The syntax layer re-tokenizes
//! from the edited block forward and stops as soon as a block's exit state is
//! unchanged; the semantic layer merges out-of-band analysis results into the
//! blocks they cover. The two layers write separately tagged ranges and never
//! clobber each other.
//!
//! # Overview
//!
//! - [`SyntaxHighlighter`]: drives a [`BlockLexer`] over a
//!   [`Document`](lumen_buffer::Document) in time-bounded bursts, writing
//!   syntax ranges.
//! - [`semantic`]: incremental, full-replace and tail-clear merges of
//!   [`HighlightingResult`]s into semantic ranges, plus the channel-fed
//!   [`SemanticMerger`].
//! - [`InlineRunner`] / [`ThreadedRunner`]: run the highlighter on the
//!   caller's thread or on a worker holding a shadow document.
//! - [`SyntaxTheme`]: resolves [`TextStyle`](lumen_buffer::TextStyle)s to
//!   Catppuccin Mocha styles at paint time.
//! - [`HighlighterConfig`]: TOML configuration.
//!
//! # Example
//!
//! ```
//! use lumen_buffer::{Document, Format, TextStyle};
//! use lumen_syntax::{BurstOutcome, CLikeLexer, SyntaxHighlighter};
//!
//! let mut doc = Document::from_text("int x;\nfoo(x);");
//! let mut highlighter = SyntaxHighlighter::new(CLikeLexer::new());
//! highlighter.set_format_categories(CLikeLexer::categories());
//! highlighter.attach(&doc);
//! highlighter.run_pending(&mut doc);
//!
//! let change = doc.apply_edit(0, 0, "/*");
//! let outcome = highlighter.contents_change(&mut doc, change);
//! assert_eq!(outcome, BurstOutcome::Finished { blocks: 2 });
//! assert_eq!(doc.syntax_formats(1)[0].format, Format::Named(TextStyle::Comment));
//! ```

pub mod config;
mod error;
mod events;
mod highlighter;
mod lexer;
mod runner;
pub mod semantic;
mod theme;

pub use config::{HighlighterConfig, WorkerConfig};
pub use error::{HighlightError, Result};
pub use events::HighlighterEvent;
pub use highlighter::{BurstBudget, BurstOutcome, CancelToken, HighlighterState, SyntaxHighlighter};
pub use lexer::{category, BlockContext, BlockLexer, CLikeLexer};
pub use runner::{BlockFormats, FormatBatch, HighlighterRunner, InlineRunner, ThreadedRunner};
pub use semantic::{
    clear_extra_additional_formats_until_end, incremental_apply_extra_formats,
    ranges_for_result, set_extra_additional_formats, split_result, BlockSpan, HighlightingResult,
    KindStyleMap, SemanticMerger, SemanticMessage, SemanticProducer, Splitter,
};
pub use theme::SyntaxTheme;
