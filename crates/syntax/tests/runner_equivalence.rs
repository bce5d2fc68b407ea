//! Inline and threaded runners converge on the same formats

use std::time::Duration;

use lumen_buffer::{Document, FormatRange, Parenthesis};
use lumen_syntax::{
    BurstBudget, CLikeLexer, HighlighterConfig, InlineRunner, SyntaxHighlighter, ThreadedRunner,
};

const WAIT: Duration = Duration::from_secs(10);

fn highlighter() -> SyntaxHighlighter<CLikeLexer> {
    let mut hl = SyntaxHighlighter::new(CLikeLexer::new());
    hl.set_format_categories(CLikeLexer::categories());
    hl.set_budget(BurstBudget::blocks(2));
    hl
}

fn threaded_config() -> HighlighterConfig {
    let mut config = HighlighterConfig::default();
    config.worker.enabled = true;
    config
}

/// Formats, lexer state, parentheses, lexer user state and raw-string suffix.
type BlockSnapshot = (Vec<FormatRange>, i32, Vec<Parenthesis>, i32, Option<Vec<u8>>);

fn snapshot(doc: &Document) -> Vec<BlockSnapshot> {
    (0..doc.block_count())
        .map(|i| {
            (
                doc.syntax_formats(i),
                doc.user_state(i),
                doc.parentheses(i).to_vec(),
                doc.lexer_state(i),
                doc.expected_raw_string_suffix(i).map(<[u8]>::to_vec),
            )
        })
        .collect()
}

const SOURCE: &str =
    "int main() {\n    return 0;\n}\n\nauto s = R\"xy(raw\ntext)xy\";\nvoid f(int a) {\n    g(a);\n}\n";

const EDITS: &[(usize, usize, &str)] = &[
    (0, 0, "/* "),
    (16, 0, "\n// note\n"),
    (0, 3, ""),
    (30, 2, "\"str"),
    (5, 0, " */"),
    (40, 1, "{(\n)}"),
];

#[test]
fn threaded_and_inline_runners_agree() {
    let mut inline_doc = Document::from_text(SOURCE);
    let mut inline = InlineRunner::new(highlighter(), &inline_doc);
    inline.run_until_idle(&mut inline_doc);

    let mut threaded_doc = Document::from_text(SOURCE);
    let mut threaded =
        ThreadedRunner::spawn(highlighter(), &threaded_doc, &threaded_config()).unwrap();

    for &(from, removed, text) in EDITS {
        inline.edit(&mut inline_doc, from, removed, text);
        inline.run_until_idle(&mut inline_doc);

        threaded.edit(&mut threaded_doc, from, removed, text).unwrap();
        threaded.apply_results(&mut threaded_doc).unwrap();
    }

    assert!(threaded.wait_until_idle(&mut threaded_doc, WAIT).unwrap());
    assert_eq!(threaded_doc.text(), inline_doc.text());
    assert_eq!(snapshot(&threaded_doc), snapshot(&inline_doc));
}

#[test]
fn threaded_runner_survives_edits_between_batches() {
    let mut doc = Document::from_text(SOURCE);
    let mut runner = ThreadedRunner::spawn(highlighter(), &doc, &threaded_config()).unwrap();

    // Edits land while earlier batches are still in flight
    for i in 0..20 {
        let position = (i * 7) % (doc.len() + 1);
        runner.edit(&mut doc, position, 0, if i % 3 == 0 { "\n" } else { "x" }).unwrap();
    }
    assert!(runner.wait_until_idle(&mut doc, WAIT).unwrap());

    let mut fresh = Document::from_text(&doc.text());
    let mut inline = InlineRunner::new(highlighter(), &fresh);
    inline.run_until_idle(&mut fresh);
    assert_eq!(snapshot(&doc), snapshot(&fresh));
}
