// src/filter/planner.rs - Merging overlapping replacements and rewriting text

use crate::types::Replacement;

/// Merge raw replacement spans into a sorted, non-overlapping set.
///
/// Spans are ordered by start, longer first on a tie. An overlapping span that
/// reaches further extends the previous one and its text takes over; a span
/// lying inside the previous one is absorbed.
pub fn merge_replacements(mut replacements: Vec<Replacement>) -> Vec<Replacement> {
    replacements.sort_by(|a, b| a.start.cmp(&b.start).then(b.end.cmp(&a.end)));

    let mut merged: Vec<Replacement> = Vec::with_capacity(replacements.len());
    for current in replacements {
        match merged.last_mut() {
            Some(last) if current.start <= last.end => {
                if current.end > last.end {
                    last.end = current.end;
                    last.text = current.text;
                }
            }
            _ => merged.push(current),
        }
    }
    merged
}

/// Apply merged spans to `text` in one left-to-right pass.
///
/// Inserted replacement text is copied verbatim and never rescanned.
pub fn apply_replacements(text: &str, merged: &[Replacement]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;

    for replacement in merged {
        debug_assert!(replacement.start >= cursor, "spans must be merged and sorted");
        let start = replacement.start.min(chars.len());
        result.extend(&chars[cursor.min(start)..start]);
        result.push_str(&replacement.text);
        cursor = (replacement.end + 1).min(chars.len());
    }

    result.extend(&chars[cursor..]);
    result
}

/// Merge then apply
pub fn rewrite(text: &str, replacements: Vec<Replacement>) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }
    apply_replacements(text, &merge_replacements(replacements))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_merge_later_text_wins() {
        let merged = merge_replacements(vec![
            Replacement::new(2, 6, "BBBBB"),
            Replacement::new(0, 4, "AAAA"),
        ]);
        assert_eq!(merged, vec![Replacement::new(0, 6, "BBBBB")]);
    }

    #[test]
    fn test_same_start_longer_sorts_first() {
        let merged = merge_replacements(vec![
            Replacement::new(0, 1, "short"),
            Replacement::new(0, 3, "long"),
        ]);
        assert_eq!(merged, vec![Replacement::new(0, 3, "long")]);
    }

    #[test]
    fn test_nested_span_keeps_outer_text() {
        let merged = merge_replacements(vec![
            Replacement::new(0, 5, "outer"),
            Replacement::new(2, 3, "inner"),
            Replacement::new(5, 7, "tail"),
        ]);
        assert_eq!(merged, vec![Replacement::new(0, 7, "tail")]);
    }

    #[test]
    fn test_adjacent_spans_stay_separate() {
        let merged = merge_replacements(vec![
            Replacement::new(4, 5, "y"),
            Replacement::new(0, 3, "x"),
        ]);
        assert_eq!(merged, vec![Replacement::new(0, 3, "x"), Replacement::new(4, 5, "y")]);
    }

    #[test]
    fn test_apply_copies_untouched_code_points() {
        let text = "this is a badword here";
        let out = apply_replacements(text, &[Replacement::new(10, 16, "***")]);
        assert_eq!(out, "this is a *** here");
    }

    #[test]
    fn test_apply_handles_multibyte_text_and_tail() {
        let text = "前缀敏感词后缀";
        let out = apply_replacements(
            text,
            &[Replacement::new(0, 1, "[x]"), Replacement::new(2, 4, "")],
        );
        assert_eq!(out, "[x]后缀");
    }

    #[test]
    fn test_rewrite_does_not_rescan_inserted_text() {
        // The replacement contains the matched text again; it is left as-is.
        let out = rewrite("ab", vec![Replacement::new(0, 1, "abab")]);
        assert_eq!(out, "abab");
    }

    #[test]
    fn test_rewrite_without_replacements_is_identity() {
        assert_eq!(rewrite("unchanged", Vec::new()), "unchanged");
    }
}
