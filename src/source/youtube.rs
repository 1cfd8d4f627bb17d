use super::ContentSource;
use crate::error::{PipelineError, PipelineResult};
use crate::i18n::LanguageProfile;
use crate::models::{Comment, VideoCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, warn};

const MAX_SEARCH_RESULTS: usize = 50;
const MAX_COMMENT_RESULTS: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    #[serde(default)]
    id: SearchId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VideosResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    id: String,
    #[serde(default)]
    statistics: Statistics,
    #[serde(default)]
    snippet: Snippet,
}

/// The Data API encodes counters as strings.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    view_count: Option<String>,
    comment_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    snippet: ThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadSnippet {
    top_level_comment: TopLevelComment,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    text_display: Option<String>,
    text_original: Option<String>,
    #[serde(default)]
    like_count: u64,
}

fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    value
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Content source backed by the authenticated YouTube Data API v3.
pub struct YouTubeDataSource {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YouTubeDataSource {
    pub fn new(client: reqwest::Client, base_url: &str, api_key: String) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> PipelineResult<T> {
        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .get(&url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(format!("YouTube {}: {}", endpoint, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::SourceUnavailable(format!(
                "YouTube {} returned HTTP {}",
                endpoint, status
            )));
        }

        response
            .json()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(format!("YouTube {} body: {}", endpoint, e)))
    }

    /// Attach view/comment counts and publish times. Best effort: the
    /// candidates are returned unchanged if the stats call fails.
    async fn attach_stats(&self, candidates: &mut [VideoCandidate]) {
        if candidates.is_empty() {
            return;
        }
        let ids = candidates
            .iter()
            .map(|c| c.video_id.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let params = [("part", "statistics,snippet".to_string()), ("id", ids)];
        let stats = match self.get_json::<VideosResponse>("videos", &params).await {
            Ok(response) => response.items,
            Err(e) => {
                warn!("Video statistics unavailable, ranking without them: {}", e);
                return;
            }
        };

        let by_id: HashMap<&str, &VideoItem> = stats.iter().map(|v| (v.id.as_str(), v)).collect();
        for candidate in candidates.iter_mut() {
            if let Some(item) = by_id.get(candidate.video_id.as_str()) {
                candidate.view_count = item
                    .statistics
                    .view_count
                    .as_deref()
                    .and_then(|v| v.parse().ok());
                candidate.comment_count = item
                    .statistics
                    .comment_count
                    .as_deref()
                    .and_then(|v| v.parse().ok());
                if candidate.published_at.is_none() {
                    candidate.published_at = parse_timestamp(item.snippet.published_at.as_deref());
                }
            }
        }
    }
}

#[async_trait]
impl ContentSource for YouTubeDataSource {
    fn name(&self) -> &'static str {
        "youtube"
    }

    async fn search(
        &self,
        query: &str,
        profile: &LanguageProfile,
        limit: usize,
    ) -> PipelineResult<Vec<VideoCandidate>> {
        let params = [
            ("part", "snippet".to_string()),
            ("maxResults", limit.clamp(1, MAX_SEARCH_RESULTS).to_string()),
            ("q", query.to_string()),
            ("type", "video".to_string()),
            ("order", "relevance".to_string()),
            ("relevanceLanguage", profile.relevance_language.to_string()),
            ("regionCode", profile.region.to_string()),
        ];
        let response: SearchResponse = self.get_json("search", &params).await?;

        let mut candidates: Vec<VideoCandidate> = response
            .items
            .into_iter()
            .enumerate()
            .filter_map(|(rank, item)| {
                let video_id = item.id.video_id?;
                let mut candidate = VideoCandidate::new(
                    &video_id,
                    &item.snippet.title,
                    &item.snippet.channel_title,
                    rank,
                );
                candidate.published_at = parse_timestamp(item.snippet.published_at.as_deref());
                Some(candidate)
            })
            .collect();

        debug!(lang = profile.key, "YouTube search returned {} videos", candidates.len());
        self.attach_stats(&mut candidates).await;
        Ok(candidates)
    }

    async fn fetch_comments(
        &self,
        video_id: &str,
        _profile: &LanguageProfile,
        max_results: usize,
    ) -> PipelineResult<Vec<Comment>> {
        let url = format!("{}/commentThreads", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("part", "snippet"),
                ("videoId", video_id),
                ("order", "relevance"),
                ("textFormat", "plainText"),
                ("key", self.api_key.as_str()),
            ])
            .query(&[("maxResults", max_results.clamp(1, MAX_COMMENT_RESULTS))])
            .send()
            .await
            .map_err(|e| PipelineError::SourceUnavailable(format!("YouTube commentThreads: {}", e)))?;

        // Comments disabled on this video
        if response.status() == StatusCode::FORBIDDEN {
            debug!("Comments disabled for {}", video_id);
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(PipelineError::SourceUnavailable(format!(
                "YouTube commentThreads returned HTTP {} for {}",
                response.status(),
                video_id
            )));
        }

        let threads: CommentThreadsResponse = response.json().await.map_err(|e| {
            PipelineError::SourceUnavailable(format!("YouTube commentThreads body: {}", e))
        })?;

        Ok(threads
            .items
            .into_iter()
            .filter_map(|thread| {
                let snippet = thread.snippet.top_level_comment.snippet;
                let text = snippet
                    .text_display
                    .filter(|t| !t.is_empty())
                    .or(snippet.text_original)?;
                Some(Comment::new(text, snippet.like_count))
            })
            .collect())
    }
}
