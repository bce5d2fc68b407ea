//! Property-based tests for format range adjustment and preedit handling

use lumen_buffer::{
    adjust_range_for_edit, apply_preedit, remove_preedit, Document, FormatRange, Preedit,
    TextStyle,
};
use proptest::prelude::*;

fn range(start: usize, length: usize) -> FormatRange {
    FormatRange::syntax(start, length, TextStyle::Keyword)
}

proptest! {
    // Ranges at or after the removed region shift by the edit delta
    #[test]
    fn ranges_after_edit_shift_by_delta(
        from in 0usize..100,
        removed in 0usize..20,
        added in 0usize..20,
        gap in 0usize..50,
        len in 1usize..30,
    ) {
        let r = range(from + removed + gap, len);
        let out = adjust_range_for_edit(r, from, removed, added);
        prop_assert_eq!(out, Some(range(r.start + added - removed, len)));
    }

    // Pure insertions at or before a range start shift it without resizing
    #[test]
    fn insert_before_range_shifts(start in 0usize..100, back in 0usize..100, len in 1usize..30, added in 1usize..20) {
        let from = start.saturating_sub(back);
        let out = adjust_range_for_edit(range(start, len), from, 0, added);
        prop_assert_eq!(out, Some(range(start + added, len)));
    }

    // A range enclosing the whole edit keeps its start and changes length by delta
    #[test]
    fn straddling_range_length_tracks_delta(
        start in 0usize..50,
        into in 1usize..20,
        removed in 0usize..10,
        tail in 1usize..20,
        added in 0usize..20,
    ) {
        let from = start + into;
        let len = into + removed + tail;
        let out = adjust_range_for_edit(range(start, len), from, removed, added);
        prop_assert_eq!(out, Some(range(start, len + added - removed)));
    }

    // Ranges ending at or before the edit are untouched
    #[test]
    fn ranges_before_edit_untouched(start in 0usize..50, len in 1usize..20, gap in 0usize..20, removed in 0usize..10, added in 0usize..10) {
        let r = range(start, len);
        prop_assert_eq!(adjust_range_for_edit(r, r.end() + gap, removed, added), Some(r));
    }

    // The composition text never carries a range, and removal restores the input
    #[test]
    fn preedit_is_never_covered(start in 0usize..40, len in 1usize..40, pos in 0usize..60, plen in 1usize..6) {
        let preedit = Preedit::new(pos, "x".repeat(plen));
        let shifted = apply_preedit(vec![range(start, len)], Some(&preedit));
        for r in &shifted {
            prop_assert!(r.end() <= pos || r.start >= pos + plen);
        }
        let covered: usize = shifted.iter().map(|r| r.length).sum();
        prop_assert_eq!(covered, len);
        prop_assert_eq!(remove_preedit(shifted, Some(&preedit)), vec![range(start, len)]);
    }

    // Setting the same ranges twice records a single change
    #[test]
    fn set_formats_twice_is_one_change(starts in proptest::collection::vec(0usize..30, 1..6)) {
        let mut doc = Document::from_text(&"x".repeat(40));
        let ranges: Vec<FormatRange> = starts.iter().map(|s| range(*s, 2)).collect();
        doc.set_formats(0, ranges.clone());
        let first = doc.take_events().len();
        let mut reversed = ranges;
        reversed.reverse();
        doc.set_formats(0, reversed);
        prop_assert_eq!(first, 1);
        prop_assert!(doc.take_events().is_empty());
    }
}
