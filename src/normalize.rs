//! Deterministic name cleaning for folder names and collision handling.
//!
//! Maps a raw file or folder name to its canonical form: numbering suffixes
//! and glued digit runs are stripped, boundary punctuation is trimmed and
//! whitespace is normalized. The same algorithm generates target folder names
//! for restored files and canonical sibling-folder names, so it has to be
//! deterministic and idempotent.

use std::sync::LazyLock;

use regex::Regex;

/// Sentinel returned when cleaning leaves nothing usable behind.
pub const FALLBACK_NAME: &str = "UNKNOWN";

/// Trailing parenthesized copy number, e.g. "photo (3)".
static PAREN_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*\(\d+\)$").expect("invalid regex"));

/// Trailing underscore counter, e.g. "photo_12".
static UNDERSCORE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_\d+$").expect("invalid regex"));

/// Digit run glued to the final letter, e.g. "photo42".
static TRAILING_GLUED_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\p{L})\d+$").expect("invalid regex"));

/// Digit run glued to the first letter, e.g. "42photo".
static LEADING_GLUED_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+(\p{L})").expect("invalid regex"));

/// Leading/trailing characters outside letters, digits, `+ - _ ' ( )` and space.
/// Boundary only: interior punctuation is left alone.
static BOUNDARY_JUNK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\p{L}\p{N}+\-_'() ]+|[^\p{L}\p{N}+\-_'() ]+$").expect("invalid regex"));

static WHITESPACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("invalid regex"));

/// Clean a raw file or folder name into its canonical form.
///
/// Never fails and never returns an empty string: unusable input collapses
/// to [`FALLBACK_NAME`]. The result is a fixed point, so applying `normalize`
/// to its own output is a no-op.
#[must_use]
pub fn normalize(raw_name: &str) -> String {
    // One cleaning pass can expose new strippable suffixes ("a (2).png" loses
    // the extension first, the copy number only on the next look), so iterate
    // the whole pipeline until it stabilizes.
    let mut name = raw_name.to_string();
    loop {
        let cleaned = clean_once(&name);
        if cleaned == name {
            break;
        }
        name = cleaned;
    }

    if name.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        name
    }
}

/// A single pass of the cleaning pipeline.
fn clean_once(raw_name: &str) -> String {
    let mut name = strip_extension(raw_name).trim().to_string();

    // Peel numbering suffixes until nothing changes; order matters since
    // "_0012 (3)" only exposes the underscore counter after the parenthesized
    // suffix is gone.
    loop {
        let before = name.clone();
        name = PAREN_SUFFIX.replace(&name, "").into_owned();
        name = UNDERSCORE_SUFFIX.replace(&name, "").into_owned();
        name = TRAILING_GLUED_DIGITS.replace(&name, "$1").into_owned();
        name = LEADING_GLUED_DIGITS.replace(&name, "$1").into_owned();
        name = name.trim().to_string();
        if name == before {
            break;
        }
    }

    name = BOUNDARY_JUNK.replace_all(&name, "").into_owned();

    // Unicode space variants that sneak in from copy-pasted names:
    // no-break space, figure space and narrow no-break space.
    name = name.replace(['\u{00A0}', '\u{2007}', '\u{202F}'], " ");

    WHITESPACE_RUN.replace_all(name.trim(), " ").trim().to_string()
}

/// Drop the extension part after the last dot, if any.
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(index) => &name[..index],
        None => name,
    }
}

#[cfg(test)]
mod normalize_tests {
    use super::*;

    #[test]
    fn test_strips_extension_and_copy_number() {
        assert_eq!(normalize("photo (3).png"), "photo");
        assert_eq!(normalize("holiday_12.jpeg"), "holiday");
    }

    #[test]
    fn test_camera_name_scenario() {
        // "IMG_0012 (3).png": extension, copy number, underscore counter and
        // the dangling underscore all come off, leaving just "IMG".
        assert_eq!(normalize("IMG_0012 (3).png"), "IMG");
    }

    #[test]
    fn test_glued_digit_runs() {
        assert_eq!(normalize("photo42"), "photo");
        assert_eq!(normalize("42photo"), "photo");
        assert_eq!(normalize("42photo42"), "photo");
    }

    #[test]
    fn test_interior_digits_are_preserved() {
        // Boundary-aware variant: digits inside a word stay.
        assert_eq!(normalize("area51 base"), "area51 base");
        assert_eq!(normalize("top2bottom"), "top2bottom");
    }

    #[test]
    fn test_boundary_punctuation_trim() {
        assert_eq!(normalize("***hello***"), "hello");
        assert_eq!(normalize("[draft] notes"), "draft] notes".to_string());
        // Allowed punctuation survives at the boundary.
        assert_eq!(normalize("'quoted'"), "'quoted'");
        assert_eq!(normalize("+plus-minus-"), "+plus-minus-");
    }

    #[test]
    fn test_interior_punctuation_is_preserved() {
        assert_eq!(normalize("rock & roll"), "rock & roll");
    }

    #[test]
    fn test_unicode_spaces_become_ascii() {
        assert_eq!(normalize("a\u{00A0}b"), "a b");
        assert_eq!(normalize("a\u{2007}b"), "a b");
        assert_eq!(normalize("a\u{202F}b"), "a b");
    }

    #[test]
    fn test_whitespace_collapses() {
        assert_eq!(normalize("  too   many\tspaces  "), "too many spaces");
    }

    #[test]
    fn test_empty_results_fall_back() {
        assert_eq!(normalize(""), FALLBACK_NAME);
        assert_eq!(normalize("   "), FALLBACK_NAME);
        assert_eq!(normalize("...."), FALLBACK_NAME);
        assert_eq!(normalize("§§§"), FALLBACK_NAME);
    }

    #[test]
    fn test_plain_digits_survive() {
        // No letter to glue onto, so the digits are the name.
        assert_eq!(normalize("2024"), "2024");
    }

    #[test]
    fn test_accented_letters() {
        assert_eq!(normalize("été12.jpg"), "été");
        assert_eq!(normalize("12über.png"), "über");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "IMG_0012 (3).png",
            "photo42.jpg",
            "a.b.c",
            "x.png (3)",
            "***hello***",
            "  spaced   out  ",
            "2024",
            "",
            "UNKNOWN",
            "été_7 (2).jpeg",
            "[draft] notes.txt",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_totality() {
        let samples = ["", ".", "..", "()", "_1", " (2)", "\u{00A0}", "a", "1"];
        for sample in samples {
            assert!(!normalize(sample).is_empty(), "empty result for {sample:?}");
        }
    }
}
