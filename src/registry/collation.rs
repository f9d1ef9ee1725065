//! Locale-aware ordering of connection descriptions.
//!
//! Approximates a default-strength collator for Latin scripts:
//!
//! 1. **Primary**: letters compared case-insensitively with accents folded
//!    (`é` sorts with `e`).
//! 2. **Secondary**: unaccented before accented.
//! 3. **Tertiary**: lowercase before uppercase.
//! 4. Raw code points, so distinct strings never compare equal.

// ============================================================================
// Imports
// ============================================================================

use std::cmp::Ordering;

// ============================================================================
// Public API
// ============================================================================

/// Compares two descriptions for display order.
#[must_use]
pub fn compare(a: &str, b: &str) -> Ordering {
    primary(a)
        .cmp(primary(b))
        .then_with(|| secondary(a).cmp(secondary(b)))
        .then_with(|| tertiary(a).cmp(tertiary(b)))
        .then_with(|| a.cmp(b))
}

// ============================================================================
// Strength levels
// ============================================================================

fn primary(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().map(fold_accent).flat_map(char::to_lowercase)
}

fn secondary(s: &str) -> impl Iterator<Item = bool> + '_ {
    s.chars().map(|c| fold_accent(c) != c)
}

fn tertiary(s: &str) -> impl Iterator<Item = bool> + '_ {
    s.chars().map(char::is_uppercase)
}

/// Maps Latin-1 accented letters to their base letter.
fn fold_accent(c: char) -> char {
    match c {
        'À'..='Å' => 'A',
        'à'..='å' => 'a',
        'Ç' => 'C',
        'ç' => 'c',
        'È'..='Ë' => 'E',
        'è'..='ë' => 'e',
        'Ì'..='Ï' => 'I',
        'ì'..='ï' => 'i',
        'Ñ' => 'N',
        'ñ' => 'n',
        'Ò'..='Ö' | 'Ø' => 'O',
        'ò'..='ö' | 'ø' => 'o',
        'Ù'..='Ü' => 'U',
        'ù'..='ü' => 'u',
        'Ý' => 'Y',
        'ý' | 'ÿ' => 'y',
        _ => c,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut items: Vec<&str>) -> Vec<&str> {
        items.sort_by(|a, b| compare(a, b));
        items
    }

    #[test]
    fn test_case_insensitive_primary() {
        assert_eq!(sorted(vec!["beta", "Alpha", "alpha2"]), vec!["Alpha", "alpha2", "beta"]);
    }

    #[test]
    fn test_lowercase_before_uppercase() {
        assert_eq!(compare("desc", "Desc"), Ordering::Less);
    }

    #[test]
    fn test_accents_sort_with_base_letter() {
        assert_eq!(sorted(vec!["f", "é", "e"]), vec!["e", "é", "f"]);
        assert_eq!(compare("Örebro", "Oslo"), Ordering::Less);
    }

    #[test]
    fn test_equal_only_when_identical() {
        assert_eq!(compare("Desc A", "Desc A"), Ordering::Equal);
        assert_ne!(compare("Desc A", "Desc a"), Ordering::Equal);
    }

    #[test]
    fn test_example_descriptions() {
        assert_eq!(compare("Desc A", "Desc B"), Ordering::Less);
    }
}
