// Chunk: docs/chunks/block_store - Block store with per-block formats and user data
// Chunk: docs/chunks/render_boundary - Render-facing style types and BlockView trait

//! lumen-buffer: the block store the highlighting engine runs against.
//!
//! A [`Document`] is an ordered sequence of blocks (lines). Each block carries
//! its text, an integer lexer state, an optional [`BlockUserData`] and a list of
//! [`FormatRange`]s tagged with the producer that wrote them.
//!
//! # Overview
//!
//! - [`Document::apply_edit`] performs an edit and reports it as a
//!   [`ContentsChange`], the single notification a highlighter consumes.
//! - [`Document::set_formats`] / [`Document::set_extra_formats`] replace the
//!   syntax or semantic ranges of one block, never both.
//! - [`parentheses`] matches brackets by walking the per-block parenthesis
//!   lists the lexer stored.
//! - [`BlockView`] is what a renderer reads: styled spans per block.
//!
//! # Example
//!
//! ```
//! use lumen_buffer::{Document, DirtyBlocks, FormatRange, TextStyle};
//!
//! let mut doc = Document::from_text("foo(bar)");
//! doc.set_formats(0, vec![FormatRange::syntax(0, 3, TextStyle::Keyword)]);
//! doc.set_extra_formats(0, vec![FormatRange::semantic(4, 3, TextStyle::Error)]);
//!
//! // Clearing semantic ranges leaves syntax ranges alone
//! doc.clear_extra_formats(0);
//! assert_eq!(doc.syntax_formats(0), vec![FormatRange::syntax(0, 3, TextStyle::Keyword)]);
//!
//! let change = doc.apply_edit(3, 0, "\n");
//! assert_eq!(change.chars_added, 1);
//! assert_eq!(doc.block_count(), 2);
//! assert_eq!(doc.take_dirty(), DirtyBlocks::FromBlockToEnd(0));
//! ```

mod block_index;
mod buffer_view;
mod document;
mod format;
mod marks;
pub mod parentheses;
mod types;
mod user_data;

pub use buffer_view::{BlockView, Color, NamedColor, Span, Style, StyledLine, UnderlineStyle};
pub use document::{Block, Document, DocumentEvent, DocumentId};
pub use format::{
    adjust_range_for_edit, adjust_ranges_for_edit, apply_preedit, clip_ranges, coalesce_runs,
    remove_preedit, sorted_ranges, Format, FormatOrigin, FormatRange, Preedit, StyleResolver,
    TextStyle,
};
pub use marks::{Mark, MarkId, MarkPriority, MarkRegistry};
pub use parentheses::{MatchResult, MatchType};
pub use types::{BlockId, BlockRef, ContentsChange, DirtyBlocks};
pub use user_data::{
    insert_parenthesis, BlockUserData, InlineSuggestion, Parentheses, Parenthesis, ParenthesisKind,
};
