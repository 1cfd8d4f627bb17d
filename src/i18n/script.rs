//! Unicode script classification and the language-match heuristic used by
//! the comment filter.

/// CJK unified ideographs (U+4E00..U+9FFF)
pub fn is_cjk(ch: char) -> bool {
    ('\u{4e00}'..='\u{9fff}').contains(&ch)
}

/// Hiragana and Katakana (U+3040..U+30FF)
pub fn is_kana(ch: char) -> bool {
    ('\u{3040}'..='\u{30ff}').contains(&ch)
}

/// Hangul syllables (U+AC00..U+D7AF)
pub fn is_hangul(ch: char) -> bool {
    ('\u{ac00}'..='\u{d7af}').contains(&ch)
}

fn is_cyrillic(ch: char) -> bool {
    ('\u{0400}'..='\u{04ff}').contains(&ch)
}

/// East Asian scripts counted as informative text.
pub fn is_east_asian(ch: char) -> bool {
    is_cjk(ch) || is_kana(ch) || is_hangul(ch)
}

/// Characters that carry information: alphanumerics in any script, or CJK/Kana/Hangul.
pub fn is_informative(ch: char) -> bool {
    ch.is_alphanumeric() || is_east_asian(ch)
}

/// Scripts that signal a comment written in an unrelated, non-Latin language.
fn is_non_latin(ch: char) -> bool {
    is_east_asian(ch) || is_cyrillic(ch)
}

/// Han ideographs present and no Kana or Hangul: already Chinese text.
pub fn looks_chinese(text: &str) -> bool {
    text.chars().any(is_cjk) && !text.chars().any(|c| is_kana(c) || is_hangul(c))
}

/// Heuristic check that `text` is plausibly written in the language `key`.
///
/// Japanese needs Kana, or CJK without Hangul. Chinese needs CJK, Korean
/// needs Hangul. Latin-script targets pass short text (< 6 chars) and reject
/// only text with at least 3 non-Latin glyphs and at most 2 ASCII letters.
pub fn is_language_match(key: &str, text: &str) -> bool {
    let sample = text.trim();
    if sample.is_empty() {
        return true;
    }

    match key {
        "ja" => {
            sample.chars().any(is_kana)
                || (sample.chars().any(is_cjk) && !sample.chars().any(is_hangul))
        }
        "zh" => sample.chars().any(is_cjk),
        "ko" => sample.chars().any(is_hangul),
        _ => {
            if sample.chars().count() < 6 {
                return true;
            }
            let non_latin = sample.chars().filter(|c| is_non_latin(*c)).count();
            let latin = sample.chars().filter(|c| c.is_ascii_alphabetic()).count();
            !(non_latin >= 3 && latin <= 2)
        }
    }
}
