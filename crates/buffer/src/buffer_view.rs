// Chunk: docs/chunks/render_boundary - Render-facing style types and BlockView trait
//!
//! Render-facing view of a document.
//!
//! The highlighting layers never talk about concrete colors: they store
//! [`Format`](crate::Format) values. A renderer asks for a block through the
//! [`BlockView`] trait and hands in a [`StyleResolver`](crate::StyleResolver)
//! that turns abstract formats into the concrete [`Style`] values defined
//! here.
//!
//! - [`Color`]: Named (16 ANSI), indexed (256), and RGB
//! - [`Style`]: Full terminal attributes (fg/bg, bold, italic, underline variants, etc.)
//! - [`Span`]: A run of text with uniform styling
//! - [`StyledLine`]: A sequence of spans comprising a single block

use crate::format::StyleResolver;
use crate::types::DirtyBlocks;

// =============================================================================
// Color Types
// =============================================================================

/// The 16 standard ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    BrightBlack,
    BrightRed,
    BrightGreen,
    BrightYellow,
    BrightBlue,
    BrightMagenta,
    BrightCyan,
    BrightWhite,
}

/// Color of a raw style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Default foreground/background (the theme decides).
    #[default]
    Default,
    /// Named ANSI colors (0-15).
    Named(NamedColor),
    /// 256-color palette index.
    Indexed(u8),
    /// 24-bit RGB color.
    Rgb { r: u8, g: u8, b: u8 },
}

/// Underline rendering style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnderlineStyle {
    #[default]
    None,
    Single,
    Double,
    /// Curly/wavy underline (diagnostics).
    Curly,
    Dotted,
    Dashed,
}

// =============================================================================
// Style
// =============================================================================

/// Concrete text attributes: the "raw style" payload of a format, and the
/// output of theme resolution.
///
/// # Example
///
/// ```
/// use lumen_buffer::{Style, Color, NamedColor, UnderlineStyle};
///
/// let error_style = Style {
///     underline: UnderlineStyle::Curly,
///     underline_color: Some(Color::Named(NamedColor::Red)),
///     ..Style::default()
/// };
/// assert!(!error_style.bold);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub bold: bool,
    pub italic: bool,
    pub dim: bool,
    pub underline: UnderlineStyle,
    /// Underline color (None = use fg color).
    pub underline_color: Option<Color>,
    pub strikethrough: bool,
}

impl Style {
    /// Returns a copy with `other`'s non-default attributes painted on top.
    ///
    /// Used to layer semantic formats over syntax formats.
    pub fn overlay(self, other: Style) -> Style {
        Style {
            fg: if other.fg == Color::Default { self.fg } else { other.fg },
            bg: if other.bg == Color::Default { self.bg } else { other.bg },
            bold: self.bold || other.bold,
            italic: self.italic || other.italic,
            dim: self.dim || other.dim,
            underline: if other.underline == UnderlineStyle::None {
                self.underline
            } else {
                other.underline
            },
            underline_color: other.underline_color.or(self.underline_color),
            strikethrough: self.strikethrough || other.strikethrough,
        }
    }
}

// =============================================================================
// Span and StyledLine
// =============================================================================

/// A contiguous run of text with uniform styling.
#[derive(Debug, Clone, PartialEq)]
pub struct Span {
    pub text: String,
    pub style: Style,
}

impl Span {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }

    /// Creates an unstyled span (default style).
    pub fn plain(text: impl Into<String>) -> Self {
        Self::new(text, Style::default())
    }
}

/// A block as the renderer sees it: a sequence of styled spans.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledLine {
    pub spans: Vec<Span>,
}

impl StyledLine {
    pub fn new(spans: Vec<Span>) -> Self {
        Self { spans }
    }

    pub fn empty() -> Self {
        Self { spans: vec![] }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns the total character count across all spans.
    pub fn char_count(&self) -> usize {
        self.spans.iter().map(|s| s.text.chars().count()).sum()
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Builds spans from per-character styles, merging adjacent equal styles.
pub(crate) fn spans_from_chars(chars: &[char], styles: &[Style]) -> Vec<Span> {
    let mut spans: Vec<Span> = Vec::new();
    for (ch, style) in chars.iter().zip(styles) {
        match spans.last_mut() {
            Some(last) if last.style == *style => last.text.push(*ch),
            _ => spans.push(Span::new(ch.to_string(), *style)),
        }
    }
    spans
}

// =============================================================================
// BlockView Trait
// =============================================================================

/// A document as seen by the renderer.
///
/// This trait is object-safe: it can be used as `&dyn BlockView`.
pub trait BlockView {
    /// Number of blocks available for display.
    fn block_count(&self) -> usize;

    /// Styled representation of a block: syntax formats with semantic
    /// formats painted on top. Returns `None` for an out-of-range block.
    fn styled_line(&self, block: usize, resolver: &dyn StyleResolver) -> Option<StyledLine>;

    /// Extra annotation lines rendered below the block (inline suggestions).
    fn annotation_lines(&self, block: usize) -> usize;

    /// Drains accumulated dirty state since last call.
    fn take_dirty(&mut self) -> DirtyBlocks;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_keeps_base_where_top_is_default() {
        let base = Style {
            fg: Color::Named(NamedColor::Blue),
            bold: true,
            ..Style::default()
        };
        let top = Style {
            underline: UnderlineStyle::Curly,
            ..Style::default()
        };
        let merged = base.overlay(top);
        assert_eq!(merged.fg, Color::Named(NamedColor::Blue));
        assert!(merged.bold);
        assert_eq!(merged.underline, UnderlineStyle::Curly);
    }

    #[test]
    fn overlay_replaces_colors() {
        let base = Style {
            fg: Color::Named(NamedColor::Blue),
            ..Style::default()
        };
        let top = Style {
            fg: Color::Indexed(9),
            ..Style::default()
        };
        assert_eq!(base.overlay(top).fg, Color::Indexed(9));
    }

    #[test]
    fn spans_merge_equal_neighbours() {
        let red = Style {
            fg: Color::Named(NamedColor::Red),
            ..Style::default()
        };
        let chars: Vec<char> = "abcd".chars().collect();
        let styles = [red, red, Style::default(), Style::default()];
        let spans = spans_from_chars(&chars, &styles);
        assert_eq!(spans, vec![Span::new("ab", red), Span::plain("cd")]);
    }

    #[test]
    fn styled_line_char_count() {
        let line = StyledLine::new(vec![Span::plain("héllo"), Span::plain(" wörld")]);
        assert_eq!(line.char_count(), 11);
        assert_eq!(line.text(), "héllo wörld");
    }
}
