// Chunk: docs/chunks/syntax_highlighting - Catppuccin Mocha theme for text styles

//! Theme mapping abstract text styles to concrete styles.
//!
//! The highlighter and the semantic merger only ever store
//! [`Format::Named`] values; a [`SyntaxTheme`] resolves them at paint time
//! using the Catppuccin Mocha palette. Raw formats pass through untouched.

use std::collections::HashMap;

use lumen_buffer::{Format, Style, StyleResolver, TextStyle, UnderlineStyle};

/// Catppuccin Mocha color palette constants.
mod catppuccin {
    use lumen_buffer::Color;

    const fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color::Rgb { r, g, b }
    }

    pub const MAUVE: Color = rgb(0xcb, 0xa6, 0xf7);
    pub const BLUE: Color = rgb(0x89, 0xb4, 0xfa);
    pub const SAPPHIRE: Color = rgb(0x74, 0xc7, 0xec);
    pub const GREEN: Color = rgb(0xa6, 0xe3, 0xa1);
    pub const PINK: Color = rgb(0xf5, 0xc2, 0xe7);
    pub const PEACH: Color = rgb(0xfa, 0xb3, 0x87);
    pub const YELLOW: Color = rgb(0xf9, 0xe2, 0xaf);
    pub const MAROON: Color = rgb(0xeb, 0xa0, 0xac);
    pub const RED: Color = rgb(0xf3, 0x8b, 0xa8);
    pub const LAVENDER: Color = rgb(0xb4, 0xbe, 0xfe);
    pub const SKY: Color = rgb(0x89, 0xdc, 0xeb);
    pub const TEAL: Color = rgb(0x94, 0xe2, 0xd5);
    pub const TEXT: Color = rgb(0xcd, 0xd6, 0xf4);

    // Surface/text colors
    pub const SURFACE2: Color = rgb(0x58, 0x5b, 0x70);
    pub const OVERLAY0: Color = rgb(0x6c, 0x70, 0x86);
    pub const SUBTEXT0: Color = rgb(0xa6, 0xad, 0xc8);
}

fn fg(color: lumen_buffer::Color) -> Style {
    Style {
        fg: color,
        ..Style::default()
    }
}

/// A mapping from text styles to concrete styles.
#[derive(Debug, Clone)]
pub struct SyntaxTheme {
    styles: HashMap<TextStyle, Style>,
}

impl SyntaxTheme {
    /// Creates the Catppuccin Mocha theme.
    pub fn catppuccin_mocha() -> Self {
        use catppuccin::*;

        let italic = |color| Style {
            italic: true,
            ..fg(color)
        };
        let squiggle = |color| Style {
            underline: UnderlineStyle::Curly,
            underline_color: Some(color),
            ..Style::default()
        };

        let styles = HashMap::from([
            (TextStyle::Text, fg(TEXT)),
            (TextStyle::Keyword, fg(MAUVE)),
            (TextStyle::PrimitiveType, fg(YELLOW)),
            (TextStyle::Type, fg(YELLOW)),
            (TextStyle::String, fg(GREEN)),
            (TextStyle::Number, fg(PEACH)),
            (TextStyle::Comment, italic(OVERLAY0)),
            (TextStyle::DocComment, italic(SUBTEXT0)),
            (TextStyle::Preprocessor, fg(PINK)),
            (TextStyle::Operator, fg(SKY)),
            (TextStyle::Punctuation, fg(SUBTEXT0)),
            (TextStyle::Function, fg(BLUE)),
            (TextStyle::Field, fg(LAVENDER)),
            (TextStyle::Parameter, italic(MAROON)),
            (TextStyle::Local, fg(TEXT)),
            (TextStyle::Macro, fg(MAUVE)),
            (TextStyle::Label, fg(SAPPHIRE)),
            (TextStyle::Enumeration, fg(TEAL)),
            (TextStyle::Error, squiggle(RED)),
            (TextStyle::Warning, squiggle(YELLOW)),
            (
                TextStyle::VisualWhitespace,
                Style {
                    dim: true,
                    ..fg(SURFACE2)
                },
            ),
            (
                TextStyle::Disabled,
                Style {
                    dim: true,
                    ..fg(OVERLAY0)
                },
            ),
            (
                TextStyle::Parentheses,
                Style {
                    bold: true,
                    ..fg(PEACH)
                },
            ),
        ]);
        Self { styles }
    }

    /// Returns the style for a text style, falling back to plain text.
    pub fn style_for(&self, style: TextStyle) -> Style {
        self.styles
            .get(&style)
            .or_else(|| self.styles.get(&TextStyle::Text))
            .copied()
            .unwrap_or_default()
    }

    /// Overrides one entry (user customization).
    pub fn set_style(&mut self, text_style: TextStyle, style: Style) {
        self.styles.insert(text_style, style);
    }
}

impl Default for SyntaxTheme {
    fn default() -> Self {
        Self::catppuccin_mocha()
    }
}

impl StyleResolver for SyntaxTheme {
    fn resolve(&self, format: &Format) -> Style {
        match format {
            Format::Named(style) => self.style_for(*style),
            Format::Raw(style) => *style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_buffer::{Color, NamedColor};

    #[test]
    fn test_all_text_styles_have_styles() {
        let theme = SyntaxTheme::catppuccin_mocha();
        for style in TextStyle::ALL {
            assert!(theme.styles.contains_key(&style), "missing {style:?}");
        }
    }

    #[test]
    fn test_keyword_is_mauve() {
        let theme = SyntaxTheme::catppuccin_mocha();
        assert_eq!(theme.style_for(TextStyle::Keyword).fg, catppuccin::MAUVE);
    }

    #[test]
    fn test_comment_is_italic_overlay0() {
        let style = SyntaxTheme::catppuccin_mocha().style_for(TextStyle::Comment);
        assert_eq!(style.fg, catppuccin::OVERLAY0);
        assert!(style.italic);
    }

    #[test]
    fn test_error_is_curly_underline_without_fg() {
        let style = SyntaxTheme::catppuccin_mocha().style_for(TextStyle::Error);
        assert_eq!(style.underline, UnderlineStyle::Curly);
        assert_eq!(style.fg, Color::Default);
    }

    #[test]
    fn test_raw_format_passes_through() {
        let raw = Style {
            fg: Color::Named(NamedColor::Red),
            ..Style::default()
        };
        assert_eq!(SyntaxTheme::default().resolve(&Format::Raw(raw)), raw);
    }

    #[test]
    fn test_override_entry() {
        let mut theme = SyntaxTheme::catppuccin_mocha();
        theme.set_style(TextStyle::Keyword, Style::default());
        assert_eq!(theme.resolve(&Format::Named(TextStyle::Keyword)), Style::default());
    }
}
