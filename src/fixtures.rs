//! Offline fixture mode: serve canned comments instead of calling upstreams.

use crate::i18n::LanguageRegistry;
use crate::models::{LanguageRecord, VideoWithComments};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixtureFile {
    #[serde(default)]
    videos_by_language: HashMap<String, Vec<VideoWithComments>>,
}

/// Build one record per registered language from `{"videosByLanguage": {key: [video]}}`.
/// Languages missing from the file get an empty success record.
pub fn load_records(path: &Path) -> Result<Vec<LanguageRecord>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture file {}", path.display()))?;
    let mut fixture: FixtureFile = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse fixture file {}", path.display()))?;

    let records: Vec<LanguageRecord> = LanguageRegistry::get()
        .profiles()
        .iter()
        .map(|profile| {
            let videos = fixture
                .videos_by_language
                .remove(profile.key)
                .unwrap_or_default();
            LanguageRecord::from_videos(profile, videos, true)
        })
        .collect();

    info!(
        "Loaded fixture records for {} languages from {}",
        records.len(),
        path.display()
    );
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_records_in_registry_order() {
        let file = fixture(
            r#"{
                "videosByLanguage": {
                    "ja": [
                        {"videoId": "j1", "title": "動画", "comments": [
                            {"original": "すごい", "translated": "厉害", "likeCount": 9},
                            {"original": "いいね", "likeCount": 2}
                        ]},
                        {"videoId": "j2", "title": "もう一つ"}
                    ],
                    "xx": [{"videoId": "ignored"}]
                }
            }"#,
        );

        let records = load_records(file.path()).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["zh", "en", "ja", "de", "fr", "es", "pt"]);

        let ja = records[2].result().unwrap();
        assert!(ja.mock);
        assert_eq!(ja.video_count, 2);
        assert_eq!(ja.comment_count, 2);
        assert_eq!(ja.comments[0].display_text(), "厉害");

        let zh = records[0].result().unwrap();
        assert_eq!(zh.video_count, 0);
        assert!(zh.comments.is_empty());
    }

    #[test]
    fn test_mock_flag_is_serialized() {
        let file = fixture(r#"{"videosByLanguage": {}}"#);
        let records = load_records(file.path()).unwrap();
        let json = serde_json::to_value(&records[0]).unwrap();
        assert_eq!(json["mock"], true);
        assert_eq!(json["key"], "zh");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_records(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let file = fixture("{not json");
        assert!(load_records(file.path()).is_err());
    }
}
