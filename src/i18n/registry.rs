//! Language registry: the fixed set of language/region profiles the pipeline
//! fans out over.
//!
//! Profiles are immutable and initialized once behind a `OnceLock`; every
//! concurrent language task reads from the same `&'static` slice.

use serde::Serialize;
use std::sync::OnceLock;

/// Locale parameters for one branch of the fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageProfile {
    /// Short key used in results and keyword lookups (e.g. "ja")
    pub key: &'static str,

    /// Display label in the native language (e.g. "日本語")
    pub label: &'static str,

    /// Flag emoji shown next to the label
    pub emoji: &'static str,

    /// `relevanceLanguage` for video search (e.g. "zh-Hans")
    pub relevance_language: &'static str,

    /// `regionCode` for video search (e.g. "JP")
    pub region: &'static str,

    /// Language code sent to the translation backend (e.g. "zh-CN")
    pub translation_code: &'static str,
}

/// Global registry of language profiles, in declared order.
pub struct LanguageRegistry {
    profiles: Vec<LanguageProfile>,
}

static REGISTRY: OnceLock<LanguageRegistry> = OnceLock::new();

impl LanguageRegistry {
    /// Get the global registry instance.
    pub fn get() -> &'static LanguageRegistry {
        REGISTRY.get_or_init(|| LanguageRegistry {
            profiles: default_profiles(),
        })
    }

    /// All profiles, in the order results are reported.
    pub fn profiles(&self) -> &[LanguageProfile] {
        &self.profiles
    }

    /// Look up a profile by its short key.
    pub fn get_by_key(&self, key: &str) -> Option<&LanguageProfile> {
        self.profiles.iter().find(|p| p.key == key)
    }
}

fn default_profiles() -> Vec<LanguageProfile> {
    vec![
        LanguageProfile {
            key: "zh",
            label: "中文",
            emoji: "🇨🇳",
            relevance_language: "zh-Hans",
            region: "CN",
            translation_code: "zh-CN",
        },
        LanguageProfile {
            key: "en",
            label: "English",
            emoji: "🇺🇸",
            relevance_language: "en",
            region: "US",
            translation_code: "en",
        },
        LanguageProfile {
            key: "ja",
            label: "日本語",
            emoji: "🇯🇵",
            relevance_language: "ja",
            region: "JP",
            translation_code: "ja",
        },
        LanguageProfile {
            key: "de",
            label: "Deutsch",
            emoji: "🇩🇪",
            relevance_language: "de",
            region: "DE",
            translation_code: "de",
        },
        LanguageProfile {
            key: "fr",
            label: "Français",
            emoji: "🇫🇷",
            relevance_language: "fr",
            region: "FR",
            translation_code: "fr",
        },
        LanguageProfile {
            key: "es",
            label: "Español",
            emoji: "🇪🇸",
            relevance_language: "es",
            region: "ES",
            translation_code: "es",
        },
        LanguageProfile {
            key: "pt",
            label: "Português",
            emoji: "🇧🇷",
            relevance_language: "pt",
            region: "BR",
            translation_code: "pt",
        },
    ]
}
