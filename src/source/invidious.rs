use super::ContentSource;
use crate::error::{PipelineError, PipelineResult};
use crate::i18n::LanguageProfile;
use crate::models::{Comment, VideoCandidate};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::OnceLock;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    #[serde(rename = "type")]
    kind: Option<String>,
    video_id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: String,
    view_count: Option<i64>,
    /// Unix seconds
    published: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct CommentsResponse {
    #[serde(default)]
    comments: Vec<MirrorComment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MirrorComment {
    content: Option<String>,
    content_html: Option<String>,
    #[serde(default)]
    like_count: i64,
}

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

/// Reduce comment HTML to plain text: drop tags, decode common entities,
/// collapse whitespace. A `<` not followed by a tag name is kept as text.
pub(crate) fn strip_html(html: &str) -> String {
    let tags = TAG_REGEX.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("tag pattern is valid"));
    let text = tags.replace_all(html, " ");
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

enum MirrorOutcome<T> {
    Ok(T),
    /// The mirror answered but had nothing for us
    Empty,
    Failed(String),
}

/// Community mirror pool. Tries each configured instance in order, moving on
/// after transport errors or HTTP status >= 400.
pub struct InvidiousSource {
    client: reqwest::Client,
    instances: Vec<String>,
}

impl InvidiousSource {
    pub fn new(client: reqwest::Client, instances: Vec<String>) -> Self {
        Self {
            client,
            instances: instances
                .into_iter()
                .map(|i| i.trim_end_matches('/').to_string())
                .collect(),
        }
    }

    async fn try_instance<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, String> {
        let response = self
            .client
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.as_u16() >= 400 {
            return Err(format!("HTTP {}", status));
        }
        response.json::<T>().await.map_err(|e| e.to_string())
    }

    /// Walk the mirror list until one produces a non-empty answer.
    async fn first_success<T, F>(
        &self,
        operation: &str,
        path: &str,
        params: &[(&str, &str)],
        is_empty: F,
    ) -> PipelineResult<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let mut answered_empty = false;
        let mut last_error: Option<String> = None;

        for instance in &self.instances {
            let url = format!("{}{}", instance, path);
            let outcome = match self.try_instance::<T>(&url, params).await {
                Ok(value) if is_empty(&value) => MirrorOutcome::Empty,
                Ok(value) => MirrorOutcome::Ok(value),
                Err(e) => MirrorOutcome::Failed(e),
            };

            match outcome {
                MirrorOutcome::Ok(value) => {
                    debug!("{} served by {}", operation, instance);
                    return Ok(Some(value));
                }
                MirrorOutcome::Empty => {
                    debug!("{}: {} returned nothing, trying next mirror", operation, instance);
                    answered_empty = true;
                }
                MirrorOutcome::Failed(e) => {
                    warn!("{}: mirror {} failed ({}), trying next", operation, instance, e);
                    last_error = Some(format!("{}: {}", instance, e));
                }
            }
        }

        if answered_empty {
            return Ok(None);
        }
        Err(PipelineError::SourceUnavailable(format!(
            "all {} mirrors failed for {} (last: {})",
            self.instances.len(),
            operation,
            last_error.unwrap_or_else(|| "no mirrors configured".to_string())
        )))
    }
}

#[async_trait]
impl ContentSource for InvidiousSource {
    fn name(&self) -> &'static str {
        "invidious"
    }

    async fn search(
        &self,
        query: &str,
        profile: &LanguageProfile,
        limit: usize,
    ) -> PipelineResult<Vec<VideoCandidate>> {
        let params = [
            ("q", query),
            ("type", "video"),
            ("sort_by", "relevance"),
            ("region", profile.region),
        ];
        let items: Vec<SearchItem> = self
            .first_success("search", "/api/v1/search", &params, |items: &Vec<SearchItem>| {
                !items.iter().any(|i| i.video_id.is_some())
            })
            .await?
            .unwrap_or_default();

        Ok(items
            .into_iter()
            .enumerate()
            .filter(|(_, item)| item.kind.as_deref().map_or(true, |k| k == "video"))
            .filter_map(|(rank, item)| {
                let video_id = item.video_id?;
                let mut candidate = VideoCandidate::new(&video_id, &item.title, &item.author, rank);
                candidate.view_count = item.view_count.and_then(|v| u64::try_from(v).ok());
                candidate.published_at = item
                    .published
                    .filter(|ts| *ts > 0)
                    .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0));
                Some(candidate)
            })
            .take(limit)
            .collect())
    }

    async fn fetch_comments(
        &self,
        video_id: &str,
        _profile: &LanguageProfile,
        max_results: usize,
    ) -> PipelineResult<Vec<Comment>> {
        let path = format!("/api/v1/comments/{}", video_id);
        let response: Option<CommentsResponse> = self
            .first_success("comments", &path, &[("sort_by", "top")], |_| false)
            .await?;

        Ok(response
            .map(|r| r.comments)
            .unwrap_or_default()
            .into_iter()
            .take(max_results)
            .filter_map(|c| {
                let text = match c.content.filter(|t| !t.trim().is_empty()) {
                    Some(plain) => plain.split_whitespace().collect::<Vec<_>>().join(" "),
                    None => strip_html(&c.content_html?),
                };
                if text.is_empty() {
                    return None;
                }
                Some(Comment::new(text, c.like_count.max(0) as u64))
            })
            .collect())
    }
}
