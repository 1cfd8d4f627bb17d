//! Language profiles and script heuristics.
//!
//! - `registry`: the immutable list of language/region profiles driving fan-out
//! - `script`: Unicode script classes and the comment language-match heuristic

mod registry;
mod script;

pub use registry::{LanguageProfile, LanguageRegistry};
pub use script::{is_informative, is_language_match, looks_chinese};

/// True for "zh", "zh-CN", "zh-TW", "ZH-Hans" and similar codes.
pub fn is_chinese_family(code: &str) -> bool {
    code.trim().to_lowercase().starts_with("zh")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_chinese_family() {
        assert!(is_chinese_family("zh"));
        assert!(is_chinese_family("zh-CN"));
        assert!(is_chinese_family("ZH-Hans"));
        assert!(!is_chinese_family("ja"));
        assert!(!is_chinese_family("auto"));
        assert!(!is_chinese_family(""));
    }
}
