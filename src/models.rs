use crate::i18n::LanguageProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A video returned by a search call.
///
/// Stats are `None` when the source could not provide them; ranking treats
/// missing values as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoCandidate {
    pub video_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub view_count: Option<u64>,
    #[serde(default)]
    pub comment_count: Option<u64>,
    /// 0-based position in the raw search response
    #[serde(default)]
    pub search_rank: usize,
    #[serde(default)]
    pub score: f64,
}

impl VideoCandidate {
    pub fn new(video_id: &str, title: &str, channel: &str, search_rank: usize) -> Self {
        Self {
            video_id: video_id.to_string(),
            title: title.to_string(),
            channel: channel.to_string(),
            url: watch_url(video_id),
            published_at: None,
            view_count: None,
            comment_count: None,
            search_rank,
            score: 0.0,
        }
    }
}

/// Canonical watch URL for a video id.
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub original: String,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

impl Comment {
    pub fn new(original: impl Into<String>, like_count: u64) -> Self {
        Self {
            original: original.into(),
            like_count,
            translated: None,
        }
    }

    /// Attach a translation, falling back to the original for empty output.
    pub fn with_translation(mut self, translated: String) -> Self {
        self.translated = if translated.trim().is_empty() {
            Some(self.original.clone())
        } else {
            Some(translated)
        };
        self
    }

    /// Translated text when present, otherwise the original.
    pub fn display_text(&self) -> &str {
        self.translated.as_deref().unwrap_or(&self.original)
    }
}

/// A selected video together with its surviving comments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoWithComments {
    #[serde(flatten)]
    pub video: VideoCandidate,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageResult {
    #[serde(default)]
    pub videos: Vec<VideoWithComments>,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub comment_count: usize,
    #[serde(default)]
    pub video_count: usize,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mock: bool,
}

/// Either the aggregated content or the reason it could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordOutcome {
    Failed { error: String },
    Success(LanguageResult),
}

/// Per-language output of one aggregation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageRecord {
    pub key: String,
    pub label: String,
    pub emoji: String,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

impl LanguageRecord {
    pub fn success(profile: &LanguageProfile, videos: Vec<VideoWithComments>) -> Self {
        Self::from_videos(profile, videos, false)
    }

    pub(crate) fn from_videos(
        profile: &LanguageProfile,
        videos: Vec<VideoWithComments>,
        mock: bool,
    ) -> Self {
        let comments: Vec<Comment> = videos
            .iter()
            .flat_map(|v| v.comments.iter().cloned())
            .collect();

        Self {
            key: profile.key.to_string(),
            label: profile.label.to_string(),
            emoji: profile.emoji.to_string(),
            outcome: RecordOutcome::Success(LanguageResult {
                comment_count: comments.len(),
                video_count: videos.len(),
                videos,
                comments,
                mock,
            }),
        }
    }

    pub fn failure(profile: &LanguageProfile, error: impl Into<String>) -> Self {
        Self {
            key: profile.key.to_string(),
            label: profile.label.to_string(),
            emoji: profile.emoji.to_string(),
            outcome: RecordOutcome::Failed {
                error: error.into(),
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RecordOutcome::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            RecordOutcome::Failed { error } => Some(error),
            RecordOutcome::Success(_) => None,
        }
    }

    pub fn result(&self) -> Option<&LanguageResult> {
        match &self.outcome {
            RecordOutcome::Success(result) => Some(result),
            RecordOutcome::Failed { .. } => None,
        }
    }
}
