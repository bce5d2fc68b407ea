// Chunk: docs/chunks/syntax_highlighting - Lexer callback interface and C-like lexer

//! The lexer callback.
//!
//! The highlighter calls [`BlockLexer::highlight_block`] once per block it
//! reformats. The lexer reads the block text and the previous block's exit
//! state from the [`BlockContext`], records formats with
//! [`BlockContext::set_format`] and leaves its own exit state with
//! [`BlockContext::set_current_block_state`]. Everything it writes lands in
//! per-highlighter scratch storage; the highlighter turns that into format
//! ranges and user data afterwards.
//!
//! [`CLikeLexer`] is a small lexer for C-family sources used by the tests and
//! as a reference for writing others.

use lumen_buffer::{insert_parenthesis, Format, Parentheses, Parenthesis, TextStyle};

/// Tokenizes one block at a time.
///
/// Implementations must be total: every input produces some output, and
/// lexer states written to user data never use 0, which means "unset".
pub trait BlockLexer {
    fn highlight_block(&mut self, cx: &mut BlockContext<'_>);
}

impl<F> BlockLexer for F
where
    F: FnMut(&mut BlockContext<'_>),
{
    fn highlight_block(&mut self, cx: &mut BlockContext<'_>) {
        self(cx)
    }
}

/// What a lexer left behind for one block, besides formats.
#[derive(Debug, Default)]
pub(crate) struct BlockOutput {
    pub state: i32,
    pub parentheses: Option<Parentheses>,
    pub folding_indent: Option<i32>,
    pub lexer_state: Option<i32>,
    pub ifdefed_out: Option<bool>,
    pub raw_string_suffix: Option<Option<Vec<u8>>>,
}

/// The view a lexer gets of the block being highlighted.
pub struct BlockContext<'a> {
    text: &'a str,
    chars: &'a [char],
    previous_state: i32,
    previous_raw_string_suffix: Option<&'a [u8]>,
    formats: &'a mut [Option<Format>],
    categories: &'a [Format],
    visual_whitespace: Option<Format>,
    out: BlockOutput,
}

impl<'a> BlockContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        text: &'a str,
        chars: &'a [char],
        previous_state: i32,
        current_state: i32,
        previous_raw_string_suffix: Option<&'a [u8]>,
        formats: &'a mut [Option<Format>],
        categories: &'a [Format],
        visual_whitespace: Option<Format>,
    ) -> Self {
        debug_assert_eq!(chars.len(), formats.len());
        Self {
            text,
            chars,
            previous_state,
            previous_raw_string_suffix,
            formats,
            categories,
            visual_whitespace,
            out: BlockOutput {
                state: current_state,
                ..BlockOutput::default()
            },
        }
    }

    pub(crate) fn finish(self) -> BlockOutput {
        self.out
    }

    pub fn text(&self) -> &str {
        self.text
    }

    pub fn chars(&self) -> &[char] {
        self.chars
    }

    /// Block length in characters.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Exit state of the previous block, -1 for the first block or when unset.
    pub fn previous_block_state(&self) -> i32 {
        self.previous_state
    }

    /// This block's state; starts as the value stored before this pass.
    pub fn current_block_state(&self) -> i32 {
        self.out.state
    }

    pub fn set_current_block_state(&mut self, state: i32) {
        self.out.state = state;
    }

    pub fn previous_raw_string_suffix(&self) -> Option<&[u8]> {
        self.previous_raw_string_suffix
    }

    /// The format registered for a lexer category; plain text when the
    /// category was never registered.
    pub fn format_for_category(&self, category: usize) -> Format {
        self.categories
            .get(category)
            .copied()
            .unwrap_or(Format::Named(TextStyle::Text))
    }

    /// Formats `count` characters from `start`. Out-of-range requests are
    /// clipped; a start past the end is ignored.
    pub fn set_format(&mut self, start: usize, count: usize, format: Format) {
        let len = self.formats.len();
        if start >= len {
            return;
        }
        let end = start.saturating_add(count).min(len);
        for slot in &mut self.formats[start..end] {
            *slot = Some(format);
        }
    }

    /// Like [`set_format`](Self::set_format), but whitespace runs inside the
    /// span get the visual whitespace format instead.
    pub fn set_format_with_spaces(&mut self, start: usize, count: usize, format: Format) {
        let Some(space_format) = self.visual_whitespace else {
            self.set_format(start, count, format);
            return;
        };
        let end = start.saturating_add(count).min(self.chars.len());
        let mut index = start;
        while index < end {
            let is_space = self.chars[index].is_whitespace();
            let run_start = index;
            while index < end && self.chars[index].is_whitespace() == is_space {
                index += 1;
            }
            let run_format = if is_space { space_format } else { format };
            self.set_format(run_start, index - run_start, run_format);
        }
    }

    /// Applies the visual whitespace format to whitespace runs in a span,
    /// leaving other characters as they are.
    pub fn format_spaces(&mut self, start: usize, count: usize) {
        let Some(space_format) = self.visual_whitespace else {
            return;
        };
        let end = start.saturating_add(count).min(self.chars.len());
        for index in start..end {
            if self.chars[index].is_whitespace() {
                self.formats[index] = Some(space_format);
            }
        }
    }

    pub fn set_parentheses(&mut self, parentheses: Parentheses) {
        self.out.parentheses = Some(parentheses);
    }

    pub fn set_folding_indent(&mut self, indent: i32) {
        self.out.folding_indent = Some(indent);
    }

    /// Stores the lexer's own state in user data. 0 means unset.
    pub fn set_lexer_state(&mut self, state: i32) {
        self.out.lexer_state = Some(state);
    }

    pub fn set_ifdefed_out(&mut self, ifdefed_out: bool) {
        self.out.ifdefed_out = Some(ifdefed_out);
    }

    pub fn set_expected_raw_string_suffix(&mut self, suffix: Option<Vec<u8>>) {
        self.out.raw_string_suffix = Some(suffix);
    }
}

// =============================================================================
// C-like lexer
// =============================================================================

/// Categories the C-like lexer formats with; indices into the category table.
pub mod category {
    pub const KEYWORD: usize = 0;
    pub const PRIMITIVE_TYPE: usize = 1;
    pub const STRING: usize = 2;
    pub const NUMBER: usize = 3;
    pub const COMMENT: usize = 4;
    pub const DOC_COMMENT: usize = 5;
    pub const PREPROCESSOR: usize = 6;
    pub const OPERATOR: usize = 7;
    pub const PUNCTUATION: usize = 8;
    pub const FUNCTION: usize = 9;
    pub const PARENTHESES: usize = 10;
    pub const DISABLED: usize = 11;
}

const KEYWORDS: &[&str] = &[
    "break", "case", "const", "continue", "default", "do", "else", "enum", "extern", "for",
    "goto", "if", "inline", "return", "sizeof", "static", "struct", "switch", "typedef", "union",
    "volatile", "while", "class", "namespace", "template", "typename", "public", "private",
    "protected", "virtual", "new", "delete", "true", "false", "nullptr", "auto",
];

const PRIMITIVE_TYPES: &[&str] = &[
    "void", "bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
];

/// Lexer state packed into the block state: the low byte is the scanner
/// state, the rest is the brace depth at the end of the block.
const NORMAL: i32 = 0;
const IN_COMMENT: i32 = 1;
const IN_RAW_STRING: i32 = 2;
/// Inside `#if 0 ... #endif`.
const DISABLED_FLAG: i32 = 0x10;

fn pack(depth: i32, scan: i32) -> i32 {
    (depth << 8) | scan
}

fn unpack(state: i32) -> (i32, i32) {
    if state < 0 {
        (0, NORMAL)
    } else {
        (state >> 8, state & 0xff)
    }
}

fn find(chars: &[char], from: usize, needle: &[char]) -> Option<usize> {
    if needle.is_empty() || chars.len() < needle.len() {
        return None;
    }
    (from..=chars.len() - needle.len()).find(|&i| chars[i..i + needle.len()] == *needle)
}

/// Lexer for C-family sources: comments (line, block, doc), strings,
/// character and raw string literals, numbers, keywords, preprocessor lines
/// with `#if 0` blocks, brackets and brace-based folding.
#[derive(Debug, Default, Clone)]
pub struct CLikeLexer;

impl CLikeLexer {
    pub fn new() -> Self {
        Self
    }

    /// Category table matching the constants in [`category`].
    pub fn categories() -> Vec<TextStyle> {
        vec![
            TextStyle::Keyword,
            TextStyle::PrimitiveType,
            TextStyle::String,
            TextStyle::Number,
            TextStyle::Comment,
            TextStyle::DocComment,
            TextStyle::Preprocessor,
            TextStyle::Operator,
            TextStyle::Punctuation,
            TextStyle::Function,
            TextStyle::Parentheses,
            TextStyle::Disabled,
        ]
    }
}

impl BlockLexer for CLikeLexer {
    fn highlight_block(&mut self, cx: &mut BlockContext<'_>) {
        let chars = cx.chars;
        let len = chars.len();
        let (mut depth, previous) = unpack(cx.previous_block_state());
        let mut disabled = previous & DISABLED_FLAG != 0;
        let mut scan = previous & !DISABLED_FLAG;
        let start_depth = depth;
        let mut min_depth = depth;
        let mut parens = Parentheses::new();
        let mut raw_suffix: Option<Vec<u8>> = if scan == IN_RAW_STRING {
            cx.previous_raw_string_suffix().map(<[u8]>::to_vec)
        } else {
            None
        };

        let first_non_space = chars.iter().position(|c| !c.is_whitespace());
        let directive: String = first_non_space
            .filter(|&i| chars[i] == '#')
            .map(|i| {
                chars[i + 1..]
                    .iter()
                    .skip_while(|c| c.is_whitespace())
                    .collect()
            })
            .unwrap_or_default();

        if disabled {
            if directive.starts_with("endif") {
                disabled = false;
                cx.set_format(0, len, cx.format_for_category(category::PREPROCESSOR));
            } else {
                cx.set_format(0, len, cx.format_for_category(category::DISABLED));
            }
            cx.set_ifdefed_out(disabled);
            cx.set_parentheses(parens);
            cx.set_folding_indent(depth);
            cx.set_lexer_state(scan + 1);
            let flag = if disabled { DISABLED_FLAG } else { 0 };
            cx.set_current_block_state(pack(depth, scan | flag));
            return;
        }
        cx.set_ifdefed_out(false);

        if !directive.is_empty() && scan == NORMAL {
            let directive = directive.split_whitespace().collect::<Vec<_>>().join(" ");
            if directive == "if 0" {
                disabled = true;
            }
            cx.set_format(0, len, cx.format_for_category(category::PREPROCESSOR));
            cx.set_parentheses(parens);
            cx.set_folding_indent(depth);
            cx.set_lexer_state(scan + 1);
            let flag = if disabled { DISABLED_FLAG } else { 0 };
            cx.set_current_block_state(pack(depth, scan | flag));
            return;
        }

        let mut i = 0;
        while i < len {
            match scan {
                IN_COMMENT => {
                    let end = find(chars, i, &['*', '/']).map(|e| e + 2);
                    let stop = end.unwrap_or(len);
                    cx.set_format_with_spaces(i, stop - i, cx.format_for_category(category::COMMENT));
                    i = stop;
                    if end.is_some() {
                        scan = NORMAL;
                    }
                    continue;
                }
                IN_RAW_STRING => {
                    let mut closer = vec![')'];
                    if let Some(suffix) = &raw_suffix {
                        closer.extend(String::from_utf8_lossy(suffix).chars());
                    }
                    closer.push('"');
                    let end = find(chars, i, &closer).map(|e| e + closer.len());
                    let stop = end.unwrap_or(len);
                    cx.set_format(i, stop - i, cx.format_for_category(category::STRING));
                    i = stop;
                    if end.is_some() {
                        scan = NORMAL;
                        raw_suffix = None;
                    }
                    continue;
                }
                _ => {}
            }

            let c = chars[i];
            let next = chars.get(i + 1).copied();
            if c.is_whitespace() {
                i += 1;
            } else if c == '/' && next == Some('/') {
                let doc = chars.get(i + 2) == Some(&'/');
                let cat = if doc {
                    category::DOC_COMMENT
                } else {
                    category::COMMENT
                };
                cx.set_format_with_spaces(i, len - i, cx.format_for_category(cat));
                i = len;
            } else if c == '/' && next == Some('*') {
                scan = IN_COMMENT;
                cx.set_format(i, 2, cx.format_for_category(category::COMMENT));
                i += 2;
            } else if c == 'R' && next == Some('"') {
                let open = find(chars, i + 2, &['(']);
                match open {
                    Some(open) => {
                        let delimiter: String = chars[i + 2..open].iter().collect();
                        cx.set_format(i, open + 1 - i, cx.format_for_category(category::STRING));
                        raw_suffix = Some(delimiter.into_bytes());
                        scan = IN_RAW_STRING;
                        i = open + 1;
                    }
                    None => {
                        cx.set_format(i, len - i, cx.format_for_category(category::STRING));
                        i = len;
                    }
                }
            } else if c == '"' || c == '\'' {
                let mut j = i + 1;
                while j < len && chars[j] != c {
                    j += if chars[j] == '\\' { 2 } else { 1 };
                }
                let stop = (j + 1).min(len);
                cx.set_format(i, stop - i, cx.format_for_category(category::STRING));
                i = stop;
            } else if c.is_ascii_digit() {
                let mut j = i;
                while j < len && (chars[j].is_ascii_alphanumeric() || chars[j] == '.') {
                    j += 1;
                }
                cx.set_format(i, j - i, cx.format_for_category(category::NUMBER));
                i = j;
            } else if c.is_alphabetic() || c == '_' {
                let mut j = i;
                while j < len && (chars[j].is_alphanumeric() || chars[j] == '_') {
                    j += 1;
                }
                let word: String = chars[i..j].iter().collect();
                let cat = if KEYWORDS.contains(&word.as_str()) {
                    Some(category::KEYWORD)
                } else if PRIMITIVE_TYPES.contains(&word.as_str()) {
                    Some(category::PRIMITIVE_TYPE)
                } else if chars[j..].iter().find(|c| !c.is_whitespace()) == Some(&'(') {
                    Some(category::FUNCTION)
                } else {
                    None
                };
                if let Some(cat) = cat {
                    cx.set_format(i, j - i, cx.format_for_category(cat));
                }
                i = j;
            } else if matches!(c, '(' | '[' | '{') {
                insert_parenthesis(&mut parens, Parenthesis::opened(c, i));
                cx.set_format(i, 1, cx.format_for_category(category::PARENTHESES));
                if c == '{' {
                    depth += 1;
                }
                i += 1;
            } else if matches!(c, ')' | ']' | '}') {
                insert_parenthesis(&mut parens, Parenthesis::closed(c, i));
                cx.set_format(i, 1, cx.format_for_category(category::PARENTHESES));
                if c == '}' {
                    depth = (depth - 1).max(0);
                    min_depth = min_depth.min(depth);
                }
                i += 1;
            } else if matches!(c, ';' | ',' | '.') {
                cx.set_format(i, 1, cx.format_for_category(category::PUNCTUATION));
                i += 1;
            } else {
                cx.set_format(i, 1, cx.format_for_category(category::OPERATOR));
                i += 1;
            }
        }

        cx.set_parentheses(parens);
        cx.set_folding_indent(min_depth.min(start_depth));
        cx.set_lexer_state(scan + 1);
        cx.set_expected_raw_string_suffix(if scan == IN_RAW_STRING { raw_suffix } else { None });
        cx.set_current_block_state(pack(depth, scan));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Run {
        formats: Vec<Option<Format>>,
        out: BlockOutput,
    }

    fn run_line(text: &str, previous_state: i32, previous_suffix: Option<&[u8]>) -> Run {
        let chars: Vec<char> = text.chars().collect();
        let mut formats = vec![None; chars.len()];
        let categories: Vec<Format> = CLikeLexer::categories()
            .into_iter()
            .map(Format::Named)
            .collect();
        let mut cx = BlockContext::new(
            text,
            &chars,
            previous_state,
            -1,
            previous_suffix,
            &mut formats,
            &categories,
            None,
        );
        CLikeLexer::new().highlight_block(&mut cx);
        let out = cx.finish();
        Run { formats, out }
    }

    fn style_at(run: &Run, i: usize) -> Option<TextStyle> {
        match run.formats[i] {
            Some(Format::Named(style)) => Some(style),
            _ => None,
        }
    }

    // ==================== BlockContext ====================

    #[test]
    fn set_format_clips_and_ignores_out_of_range() {
        let chars: Vec<char> = "abc".chars().collect();
        let mut formats = vec![None; 3];
        let mut cx = BlockContext::new("abc", &chars, -1, -1, None, &mut formats, &[], None);
        let kw = Format::Named(TextStyle::Keyword);
        cx.set_format(1, 10, kw);
        cx.set_format(5, 1, kw);
        drop(cx);
        assert_eq!(formats, vec![None, Some(kw), Some(kw)]);
    }

    #[test]
    fn set_format_with_spaces_splits_whitespace() {
        let chars: Vec<char> = "a  b".chars().collect();
        let mut formats = vec![None; 4];
        let ws = Format::Named(TextStyle::VisualWhitespace);
        let com = Format::Named(TextStyle::Comment);
        let mut cx = BlockContext::new("a  b", &chars, -1, -1, None, &mut formats, &[], Some(ws));
        cx.set_format_with_spaces(0, 4, com);
        drop(cx);
        assert_eq!(formats, vec![Some(com), Some(ws), Some(ws), Some(com)]);
    }

    #[test]
    fn unknown_category_is_plain_text() {
        let chars: Vec<char> = Vec::new();
        let mut formats = Vec::new();
        let cx = BlockContext::new("", &chars, -1, -1, None, &mut formats, &[], None);
        assert_eq!(cx.format_for_category(99), Format::Named(TextStyle::Text));
    }

    // ==================== C-like lexer ====================

    #[test]
    fn keywords_types_and_functions() {
        let run = run_line("int main() { return 0; }", -1, None);
        assert_eq!(style_at(&run, 0), Some(TextStyle::PrimitiveType));
        assert_eq!(style_at(&run, 4), Some(TextStyle::Function));
        assert_eq!(style_at(&run, 13), Some(TextStyle::Keyword));
        assert_eq!(style_at(&run, 20), Some(TextStyle::Number));
        assert_eq!(style_at(&run, 3), None);
    }

    #[test]
    fn open_block_comment_carries_state() {
        let run = run_line("x = 1; /* start", -1, None);
        assert_eq!(unpack(run.out.state).1, IN_COMMENT);
        assert_eq!(style_at(&run, 7), Some(TextStyle::Comment));

        let next = run_line("still comment */ y", run.out.state, None);
        assert_eq!(unpack(next.out.state).1, NORMAL);
        assert_eq!(style_at(&next, 0), Some(TextStyle::Comment));
        assert_eq!(style_at(&next, 17), None);
    }

    #[test]
    fn line_and_doc_comments() {
        let run = run_line("a; // note", -1, None);
        assert_eq!(style_at(&run, 5), Some(TextStyle::Comment));
        let run = run_line("/// docs", -1, None);
        assert_eq!(style_at(&run, 0), Some(TextStyle::DocComment));
    }

    #[test]
    fn strings_with_escapes() {
        let run = run_line(r#"s = "a\"b"; t"#, -1, None);
        for i in 4..10 {
            assert_eq!(style_at(&run, i), Some(TextStyle::String), "at {i}");
        }
        assert_eq!(style_at(&run, 12), None);
    }

    #[test]
    fn raw_string_spans_blocks() {
        let run = run_line(r#"auto s = R"xy(first"#, -1, None);
        assert_eq!(unpack(run.out.state).1, IN_RAW_STRING);
        let suffix = run.out.raw_string_suffix.clone().flatten();
        assert_eq!(suffix.as_deref(), Some(b"xy".as_slice()));

        let next = run_line(r#"still )" not yet )xy" done"#, run.out.state, suffix.as_deref());
        assert_eq!(unpack(next.out.state).1, NORMAL);
        assert_eq!(style_at(&next, 0), Some(TextStyle::String));
        assert_eq!(style_at(&next, 20), Some(TextStyle::String));
        assert_eq!(style_at(&next, 22), None);
    }

    #[test]
    fn braces_drive_depth_and_folding() {
        let run = run_line("void f() {", -1, None);
        assert_eq!(unpack(run.out.state).0, 1);
        assert_eq!(run.out.folding_indent, Some(0));
        let body = run_line("  g();", run.out.state, None);
        assert_eq!(body.out.folding_indent, Some(1));
        let close = run_line("}", body.out.state, None);
        assert_eq!(close.out.folding_indent, Some(0));
        assert_eq!(unpack(close.out.state).0, 0);
    }

    #[test]
    fn parentheses_are_recorded_sorted() {
        let run = run_line("f(a[1]) {", -1, None);
        let parens = run.out.parentheses.unwrap_or_default();
        let chars: Vec<char> = parens.iter().map(|p| p.chr).collect();
        assert_eq!(chars, vec!['(', '[', ']', ')', '{']);
    }

    #[test]
    fn if_zero_disables_until_endif() {
        let open = run_line("#if 0", -1, None);
        assert_eq!(style_at(&open, 0), Some(TextStyle::Preprocessor));
        let body = run_line("int dead;", open.out.state, None);
        assert_eq!(body.out.ifdefed_out, Some(true));
        assert_eq!(style_at(&body, 0), Some(TextStyle::Disabled));
        let close = run_line("#endif", body.out.state, None);
        assert_eq!(close.out.ifdefed_out, Some(false));
        let after = run_line("int live;", close.out.state, None);
        assert_eq!(after.out.ifdefed_out, Some(false));
        assert_eq!(style_at(&after, 0), Some(TextStyle::PrimitiveType));
    }

    #[test]
    fn lexer_state_is_never_zero() {
        for line in ["", "/* open", "x", "R\"d(raw"] {
            let run = run_line(line, -1, None);
            assert_ne!(run.out.lexer_state, Some(0), "{line:?}");
        }
    }
}
