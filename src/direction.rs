//! Text direction detection for chat bubbles

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Hebrew (U+0590–U+05FF) and Arabic (U+0600–U+06FF) blocks
static RTL_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{0590}-\x{05FF}\x{0600}-\x{06FF}]").expect("static RTL pattern is valid")
});

/// Base direction of a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Ltr,
    Rtl,
}

impl Direction {
    pub fn is_rtl(self) -> bool {
        matches!(self, Direction::Rtl)
    }
}

/// Classify `text` as right-to-left if it contains any Hebrew or Arabic character.
pub fn detect_direction(text: &str) -> Direction {
    if RTL_SCRIPT.is_match(text) {
        Direction::Rtl
    } else {
        Direction::Ltr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_ltr() {
        assert_eq!(detect_direction(""), Direction::Ltr);
    }

    #[test]
    fn test_latin_is_ltr() {
        assert_eq!(detect_direction("Hello, world 123"), Direction::Ltr);
        assert_eq!(detect_direction("Привет"), Direction::Ltr);
        assert_eq!(detect_direction("日本語"), Direction::Ltr);
    }

    #[test]
    fn test_hebrew_is_rtl() {
        assert_eq!(detect_direction("שלום"), Direction::Rtl);
        assert_eq!(detect_direction("AI מדפורם"), Direction::Rtl);
    }

    #[test]
    fn test_arabic_is_rtl() {
        assert_eq!(detect_direction("مرحبا"), Direction::Rtl);
    }

    #[test]
    fn test_single_rtl_char_anywhere() {
        assert!(detect_direction("mostly english but one א").is_rtl());
        assert!(detect_direction("\u{0590}").is_rtl());
        assert!(detect_direction("\u{06FF}").is_rtl());
        assert!(!detect_direction("\u{0700}").is_rtl());
    }
}
