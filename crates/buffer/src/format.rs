// Chunk: docs/chunks/format_ranges - Per-block format range values and edit adjustment

//! Format ranges: the per-block `(start, length, format, origin)` tuples that
//! make up a block's styling.
//!
//! Two independent producers write ranges into the same block. Ranges written
//! by the syntax highlighter carry [`FormatOrigin::Syntax`], ranges written by
//! the semantic merger carry [`FormatOrigin::Semantic`]. Every mutation on the
//! document replaces the ranges of one origin and leaves the other alone.
//!
//! The free functions in this module are the pure parts of the table:
//! coalescing a per-character scratch buffer into runs, shifting ranges around
//! a preedit region, and adjusting offsets when text is edited.

use std::cmp::Ordering;

use crate::buffer_view::Style;

/// Which producer owns a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatOrigin {
    /// Written by the synchronous highlighter.
    Syntax,
    /// Written by the semantic result merger.
    Semantic,
}

/// Abstract text categories, resolved against a theme at paint time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TextStyle {
    Text,
    Keyword,
    PrimitiveType,
    Type,
    String,
    Number,
    Comment,
    DocComment,
    Preprocessor,
    Operator,
    Punctuation,
    Function,
    Field,
    Parameter,
    Local,
    Macro,
    Label,
    Enumeration,
    Error,
    Warning,
    VisualWhitespace,
    Disabled,
    Parentheses,
}

impl TextStyle {
    pub const ALL: [TextStyle; 23] = [
        TextStyle::Text,
        TextStyle::Keyword,
        TextStyle::PrimitiveType,
        TextStyle::Type,
        TextStyle::String,
        TextStyle::Number,
        TextStyle::Comment,
        TextStyle::DocComment,
        TextStyle::Preprocessor,
        TextStyle::Operator,
        TextStyle::Punctuation,
        TextStyle::Function,
        TextStyle::Field,
        TextStyle::Parameter,
        TextStyle::Local,
        TextStyle::Macro,
        TextStyle::Label,
        TextStyle::Enumeration,
        TextStyle::Error,
        TextStyle::Warning,
        TextStyle::VisualWhitespace,
        TextStyle::Disabled,
        TextStyle::Parentheses,
    ];
}

/// A format payload: either a named text style or a literal style.
///
/// Both are opaque to the table; only a [`StyleResolver`] looks inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Named(TextStyle),
    Raw(Style),
}

impl From<TextStyle> for Format {
    fn from(style: TextStyle) -> Self {
        Format::Named(style)
    }
}

/// Turns abstract formats into concrete styles. Implemented by themes.
pub trait StyleResolver {
    fn resolve(&self, format: &Format) -> Style;
}

/// A styled span inside one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FormatRange {
    /// Offset within the block, in characters.
    pub start: usize,
    pub length: usize,
    pub format: Format,
    pub origin: FormatOrigin,
}

impl FormatRange {
    pub fn new(start: usize, length: usize, format: Format, origin: FormatOrigin) -> Self {
        Self {
            start,
            length,
            format,
            origin,
        }
    }

    pub fn syntax(start: usize, length: usize, format: impl Into<Format>) -> Self {
        Self::new(start, length, format.into(), FormatOrigin::Syntax)
    }

    pub fn semantic(start: usize, length: usize, format: impl Into<Format>) -> Self {
        Self::new(start, length, format.into(), FormatOrigin::Semantic)
    }

    /// One past the last covered character.
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Transient input-method composition text inside a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preedit {
    /// Offset within the block where the composition is shown.
    pub position: usize,
    pub text: String,
}

impl Preedit {
    pub fn new(position: usize, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
        }
    }

    /// Composition length in characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

fn range_order(a: &FormatRange, b: &FormatRange) -> Ordering {
    a.start.cmp(&b.start).then(a.length.cmp(&b.length))
}

/// Drops zero-length ranges and sorts the rest by start.
pub fn sorted_ranges(mut ranges: Vec<FormatRange>) -> Vec<FormatRange> {
    ranges.retain(|r| r.length > 0);
    ranges.sort_by(range_order);
    ranges
}

/// Trims ranges to a block of `len` characters, dropping what falls outside.
pub fn clip_ranges(ranges: &mut Vec<FormatRange>, len: usize) {
    ranges.retain_mut(|r| {
        if r.start >= len {
            return false;
        }
        r.length = r.length.min(len - r.start);
        r.length > 0
    });
}

/// Coalesces a per-character scratch buffer into maximal runs of equal
/// format. Characters without a format produce no range.
pub fn coalesce_runs(scratch: &[Option<Format>], origin: FormatOrigin) -> Vec<FormatRange> {
    let mut ranges: Vec<FormatRange> = Vec::new();
    let mut i = 0;
    while i < scratch.len() {
        let Some(format) = scratch[i] else {
            i += 1;
            continue;
        };
        let start = i;
        while i < scratch.len() && scratch[i] == Some(format) {
            i += 1;
        }
        ranges.push(FormatRange::new(start, i - start, format, origin));
    }
    ranges
}

/// Moves ranges out of the way of a preedit region.
///
/// Ranges ending at or before the composition start are kept, ranges starting
/// at or after it are shifted right by the composition length, and a range
/// straddling it is split into a before-part and a shifted after-part. The
/// composition text itself is never covered.
pub fn apply_preedit(ranges: Vec<FormatRange>, preedit: Option<&Preedit>) -> Vec<FormatRange> {
    let Some(preedit) = preedit.filter(|p| !p.is_empty()) else {
        return ranges;
    };
    let pos = preedit.position;
    let shift = preedit.len();

    let mut out = Vec::with_capacity(ranges.len() + 1);
    for range in ranges {
        if range.end() <= pos {
            out.push(range);
        } else if range.start >= pos {
            out.push(FormatRange {
                start: range.start + shift,
                ..range
            });
        } else {
            out.push(FormatRange {
                length: pos - range.start,
                ..range
            });
            out.push(FormatRange {
                start: pos + shift,
                length: range.end() - pos,
                ..range
            });
        }
    }
    out
}

/// Inverse of [`apply_preedit`]: drops coverage of the composition text,
/// shifts later ranges back and rejoins pieces split at the composition.
pub fn remove_preedit(ranges: Vec<FormatRange>, preedit: Option<&Preedit>) -> Vec<FormatRange> {
    let Some(preedit) = preedit.filter(|p| !p.is_empty()) else {
        return ranges;
    };
    let pos = preedit.position;
    let shift = preedit.len();
    let pre_end = pos + shift;

    let mut out: Vec<FormatRange> = Vec::with_capacity(ranges.len());
    for range in sorted_ranges(ranges) {
        let start = if range.start >= pre_end {
            range.start - shift
        } else {
            range.start.min(pos)
        };
        let end = if range.end() >= pre_end {
            range.end() - shift
        } else {
            range.end().min(pos)
        };
        if end <= start {
            continue;
        }
        let piece = FormatRange {
            start,
            length: end - start,
            ..range
        };
        match out.last_mut() {
            Some(prev)
                if prev.end() == pos
                    && piece.start == pos
                    && prev.format == piece.format
                    && prev.origin == piece.origin =>
            {
                prev.length += piece.length;
            }
            _ => out.push(piece),
        }
    }
    out
}

/// Adjusts one range for an edit that replaced `removed` characters at `from`
/// with `added` characters (block-local offsets).
///
/// - A range ending at or before `from` is untouched.
/// - A range starting at or after the removed region shifts by the delta.
/// - A range straddling `from` keeps its start and grows or shrinks with the
///   edit.
/// - A range starting inside the removed region keeps only its surviving
///   tail, which now begins right after the inserted text.
///
/// Returns `None` when nothing of the range survives.
pub fn adjust_range_for_edit(
    range: FormatRange,
    from: usize,
    removed: usize,
    added: usize,
) -> Option<FormatRange> {
    let removed_end = from + removed;
    let (start, end) = if range.end() <= from {
        (range.start, range.end())
    } else if range.start >= removed_end {
        (range.start - removed + added, range.end() - removed + added)
    } else if range.start < from {
        let end = if range.end() >= removed_end {
            range.end() - removed + added
        } else {
            from + added
        };
        (range.start, end)
    } else {
        if range.end() <= removed_end {
            return None;
        }
        (from + added, range.end() - removed + added)
    };
    (end > start).then(|| FormatRange {
        start,
        length: end - start,
        ..range
    })
}

/// Applies [`adjust_range_for_edit`] to every range in a block.
pub fn adjust_ranges_for_edit(
    ranges: &mut Vec<FormatRange>,
    from: usize,
    removed: usize,
    added: usize,
) {
    let adjusted: Vec<FormatRange> = ranges
        .drain(..)
        .filter_map(|r| adjust_range_for_edit(r, from, removed, added))
        .collect();
    *ranges = adjusted;
}
