//! String normalization used by the matcher stages.

use std::collections::BTreeSet;

/// Characters removed by the `Cleaned` stage.
const SEPARATORS: [char; 3] = [' ', '_', '-'];

/// Lowercases, strips punctuation and collapses internal whitespace.
pub(crate) fn normalize(s: &str) -> String {
    let stripped: String = s
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercases and removes separator characters.
pub(crate) fn clean(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| !SEPARATORS.contains(c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercased alphanumeric word set.
pub(crate) fn words(s: &str) -> BTreeSet<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// `|intersection| / max(|a|, |b|)`, zero when either side is empty.
pub(crate) fn word_overlap(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let denom = a.len().max(b.len());
    if denom == 0 {
        return 0.0;
    }
    let common = a.intersection(b).count();
    #[allow(clippy::cast_precision_loss)]
    let score = common as f64 / denom as f64;
    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_collapses_and_strips() {
        assert_eq!(normalize("  Foundation   Thickness (mm) "), "foundation thickness mm");
        assert_eq!(normalize("Top-Offset"), "topoffset");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_clean_removes_separators_only() {
        assert_eq!(clean("Bar_Spacing - Top"), "barspacingtop");
        assert_eq!(clean("Thickness (mm)"), "thickness(mm)");
    }

    #[test]
    fn test_words_tokenizes_on_non_alphanumeric() {
        let w = words("Foundation Thickness (mm)");
        let expected: BTreeSet<String> = ["foundation", "thickness", "mm"]
            .into_iter()
            .map(String::from)
            .collect();
        assert_eq!(w, expected);
    }

    #[test]
    fn test_word_overlap_uses_larger_set() {
        let a = words("bar spacing top");
        let b = words("spacing");
        assert!((word_overlap(&a, &b) - 1.0 / 3.0).abs() < 1e-12);
        assert!(word_overlap(&words(""), &b).abs() < f64::EPSILON);
    }
}
