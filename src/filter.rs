//! Comment filtering: drop spam, link-bearing, low-information and
//! (optionally) wrong-language comments, then keep the most liked.

use crate::i18n::{is_informative, is_language_match};
use crate::models::Comment;
use regex::Regex;
use std::sync::OnceLock;
use tracing::debug;

const MIN_TEXT_CHARS: usize = 5;
const MIN_INFORMATIVE_CHARS: usize = 5;

static LINK_REGEX: OnceLock<Regex> = OnceLock::new();

fn link_regex() -> &'static Regex {
    LINK_REGEX.get_or_init(|| {
        Regex::new(r"(?i)(https?://|www\.|\b\w+\.\w{2,})").expect("link pattern is valid")
    })
}

/// Phrases rejected in every language (matched against lowercased text).
const GLOBAL_KEYWORDS: &[&str] = &[
    "promo",
    "promotion",
    "discount",
    "coupon",
    "free",
    "giveaway",
    "deal",
    "sale",
    "subscribe",
    "follow",
    "link in bio",
    "contact me",
    "dm me",
    "whatsapp",
    "telegram",
    "wechat",
    "line",
];

fn language_keywords(key: &str) -> &'static [&'static str] {
    match key {
        "zh" => &[
            "代购", "返利", "优惠", "折扣", "领券", "福利", "加群", "加我", "微信", "VX", "私信",
            "联系方式", "关注我", "点赞收藏", "点我主页", "点链接",
        ],
        "en" => &[
            "promo code",
            "coupon code",
            "follow me",
            "subscribe",
            "check my channel",
            "my link",
            "link",
        ],
        "ja" => &[
            "割引",
            "クーポン",
            "無料",
            "フォローして",
            "チャンネル登録",
            "登録して",
            "リンク",
            "公式ライン",
            "LINE",
        ],
        "de" => &[
            "rabatt",
            "gutschein",
            "gratis",
            "folge",
            "abonniere",
            "abonnieren",
            "link",
            "angebot",
        ],
        "fr" => &[
            "promo",
            "réduction",
            "coupon",
            "gratuit",
            "abonnez",
            "abonne-toi",
            "lien",
            "offre",
        ],
        "es" => &[
            "oferta",
            "descuento",
            "cupón",
            "gratis",
            "sígueme",
            "suscríbete",
            "enlace",
            "promo",
        ],
        "pt" => &[
            "oferta",
            "desconto",
            "cupom",
            "grátis",
            "siga",
            "inscreva-se",
            "link",
            "promoção",
        ],
        "ko" => &[
            "할인", "쿠폰", "무료", "구독", "팔로우", "링크", "카톡", "카카오", "문의", "프로모션",
        ],
        _ => &[],
    }
}

pub fn contains_link(text: &str) -> bool {
    link_regex().is_match(text)
}

/// Fewer than 5 characters, or fewer than 5 informative characters.
pub fn is_low_information(text: &str) -> bool {
    let stripped = text.trim();
    if stripped.chars().count() < MIN_TEXT_CHARS {
        return true;
    }
    stripped.chars().filter(|c| is_informative(*c)).count() < MIN_INFORMATIVE_CHARS
}

/// ASCII keywords match case-insensitively, others as exact substrings.
pub fn contains_spam_keyword(text: &str, lang_key: &str) -> bool {
    let lowered = text.to_lowercase();
    if GLOBAL_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        return true;
    }
    language_keywords(lang_key).iter().any(|keyword| {
        if keyword.is_ascii() {
            lowered.contains(&keyword.to_lowercase())
        } else {
            text.contains(keyword)
        }
    })
}

fn keep(text: &str, lang_key: &str, enforce_language_match: bool) -> bool {
    let text = text.trim();
    !text.is_empty()
        && !contains_link(text)
        && !is_low_information(text)
        && !contains_spam_keyword(text, lang_key)
        && (!enforce_language_match || is_language_match(lang_key, text))
}

/// Run every rejection stage, then sort by like count (descending, stable)
/// and keep at most `limit` comments.
pub fn filter_comments(
    comments: Vec<Comment>,
    lang_key: &str,
    limit: usize,
    enforce_language_match: bool,
) -> Vec<Comment> {
    let total = comments.len();
    let mut kept: Vec<Comment> = comments
        .into_iter()
        .filter(|c| keep(&c.original, lang_key, enforce_language_match))
        .collect();

    kept.sort_by(|a, b| b.like_count.cmp(&a.like_count));
    debug!(
        lang = lang_key,
        "Comment filter kept {}/{} (limit {})",
        kept.len(),
        total,
        limit
    );
    kept.truncate(limit);
    kept
}
