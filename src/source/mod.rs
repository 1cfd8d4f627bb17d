//! Video/comment sources.
//!
//! Two implementations of [`ContentSource`]: the quota-limited YouTube Data
//! API (with view/publish metadata) and a best-effort Invidious mirror pool.
//! The variant is chosen once from configuration, never per call.

mod invidious;
mod youtube;

pub use invidious::InvidiousSource;
pub use youtube::YouTubeDataSource;

use crate::config::Config;
use crate::error::PipelineResult;
use crate::i18n::LanguageProfile;
use crate::models::{Comment, VideoCandidate};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::info;

#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Search videos in the profile's locale. Candidates come back in the
    /// upstream relevance order with `search_rank` set; zero matches is `Ok(vec![])`.
    async fn search(
        &self,
        query: &str,
        profile: &LanguageProfile,
        limit: usize,
    ) -> PipelineResult<Vec<VideoCandidate>>;

    /// Fetch top-level comments for one video. Disabled comments yield an empty list.
    async fn fetch_comments(
        &self,
        video_id: &str,
        profile: &LanguageProfile,
        max_results: usize,
    ) -> PipelineResult<Vec<Comment>>;
}

/// Pick the authenticated source when a YouTube API key is configured,
/// otherwise the mirror pool.
pub fn build_source(config: &Config, client: reqwest::Client) -> Arc<dyn ContentSource> {
    match &config.youtube_api_key {
        Some(key) => {
            info!("Using YouTube Data API content source");
            Arc::new(YouTubeDataSource::new(
                client,
                &config.youtube_api_url,
                key.clone(),
            ))
        }
        None => {
            info!(
                "No YOUTUBE_API_KEY set, using {} Invidious mirrors",
                config.invidious_instances.len()
            );
            Arc::new(InvidiousSource::new(
                client,
                config.invidious_instances.clone(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_source_prefers_api_key() {
        let config = Config {
            youtube_api_key: Some("key".to_string()),
            ..Config::default()
        };
        assert_eq!(build_source(&config, reqwest::Client::new()).name(), "youtube");
    }

    #[test]
    fn test_build_source_falls_back_to_mirrors() {
        let config = Config::default();
        assert_eq!(build_source(&config, reqwest::Client::new()).name(), "invidious");
    }
}
