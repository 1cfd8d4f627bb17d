//! Per-language fan-out: localize the query, search and rank videos, fetch
//! comments under a shared semaphore, filter, translate, assemble a record.
//!
//! Each language runs as its own task. Whatever happens inside one task ends
//! up as an error string on that language's record and nowhere else.

use crate::config::Config;
use crate::error::{PipelineError, PipelineResult};
use crate::filter::filter_comments;
use crate::i18n::{is_language_match, LanguageProfile, LanguageRegistry};
use crate::models::{Comment, LanguageRecord, VideoCandidate, VideoWithComments};
use crate::ranking::rank_videos;
use crate::source::ContentSource;
use crate::translation::Translator;
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[derive(Clone)]
pub struct Aggregator {
    config: Arc<Config>,
    source: Arc<dyn ContentSource>,
    translator: Arc<dyn Translator>,
    /// Bounds in-flight comment fetches across every language task
    fetch_permits: Arc<Semaphore>,
}

impl Aggregator {
    pub fn new(
        config: Arc<Config>,
        source: Arc<dyn ContentSource>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        let fetch_permits = Arc::new(Semaphore::new(config.max_concurrency.max(1)));
        Self {
            config,
            source,
            translator,
            fetch_permits,
        }
    }

    /// One record per registered language, in registry order.
    pub async fn aggregate(&self, query: &str) -> Vec<LanguageRecord> {
        self.aggregate_profiles(query, LanguageRegistry::get().profiles())
            .await
    }

    /// Fan out over `profiles` and wait for all of them. Output order matches
    /// `profiles`, independent of completion order.
    pub async fn aggregate_profiles(
        &self,
        query: &str,
        profiles: &[LanguageProfile],
    ) -> Vec<LanguageRecord> {
        info!(
            "Aggregating '{}' across {} languages via {} / {}",
            query,
            profiles.len(),
            self.source.name(),
            self.translator.name()
        );

        let deadline = self.config.language_timeout;
        let handles: Vec<_> = profiles
            .iter()
            .cloned()
            .map(|profile| {
                let worker = self.clone();
                let query = query.to_string();
                tokio::spawn(async move {
                    match tokio::time::timeout(deadline, worker.run_language(&query, &profile)).await
                    {
                        Ok(Ok(videos)) => LanguageRecord::success(&profile, videos),
                        Ok(Err(e)) => {
                            warn!(lang = profile.key, "Language failed: {}", e);
                            LanguageRecord::failure(&profile, e.to_string())
                        }
                        Err(_) => {
                            warn!(lang = profile.key, "Language timed out after {:?}", deadline);
                            LanguageRecord::failure(
                                &profile,
                                format!("timed out after {}s", deadline.as_secs()),
                            )
                        }
                    }
                })
            })
            .collect();

        let records: Vec<LanguageRecord> = join_all(handles)
            .await
            .into_iter()
            .zip(profiles)
            .map(|(joined, profile)| {
                joined.unwrap_or_else(|e| {
                    error!(lang = profile.key, "Language task aborted: {}", e);
                    LanguageRecord::failure(profile, format!("language task aborted: {}", e))
                })
            })
            .collect();

        let succeeded = records.iter().filter(|r| r.is_success()).count();
        info!("Aggregated {}/{} languages", succeeded, records.len());
        records
    }

    async fn run_language(
        &self,
        query: &str,
        profile: &LanguageProfile,
    ) -> PipelineResult<Vec<VideoWithComments>> {
        let localized = self.localize_query(query, profile).await;
        debug!(lang = profile.key, "Searching for '{}'", localized);

        let candidates = self
            .source
            .search(&localized, profile, self.config.search_limit)
            .await?;
        if candidates.is_empty() {
            return Err(PipelineError::NoResults(format!(
                "no videos found for '{}'",
                localized
            )));
        }

        let ranked = rank_videos(
            candidates,
            &self.config.ranking,
            Utc::now(),
            self.config.search_limit,
        );
        let collected = self.collect_comments(&ranked, profile).await?;

        let mut selected = select_videos(
            collected,
            self.config.comments_per_video,
            self.config.target_videos,
        );
        if selected.is_empty() {
            return Err(PipelineError::NoResults(
                "no usable comments found".to_string(),
            ));
        }

        self.translate_selected(&mut selected, profile).await;
        info!(
            lang = profile.key,
            "Selected {} videos with {} comments",
            selected.len(),
            selected.iter().map(|v| v.comments.len()).sum::<usize>()
        );
        Ok(selected)
    }

    /// Translate the query into the profile's language, keeping the original
    /// on any failure.
    async fn localize_query(&self, query: &str, profile: &LanguageProfile) -> String {
        match self
            .translator
            .translate_one(query, "auto", profile.translation_code)
            .await
        {
            Ok(localized) if !localized.trim().is_empty() => localized,
            Ok(_) => query.to_string(),
            Err(e) => {
                warn!(
                    lang = profile.key,
                    "Query localization failed, searching with the original: {}", e
                );
                query.to_string()
            }
        }
    }

    /// Fetch and filter comments for every ranked candidate, preserving rank
    /// order. Failed fetches are skipped; when nothing survives, the first
    /// failure becomes the language's error.
    async fn collect_comments(
        &self,
        ranked: &[VideoCandidate],
        profile: &LanguageProfile,
    ) -> PipelineResult<Vec<VideoWithComments>> {
        let results = join_all(ranked.iter().map(|c| self.fetch_for(c, profile))).await;

        let mut first_error = None;
        let mut collected = Vec::new();
        for result in results {
            match result {
                Ok(Some(video)) => collected.push(video),
                Ok(None) => {}
                Err(e) => {
                    debug!(lang = profile.key, "Skipping video: {}", e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) if collected.is_empty() => Err(e),
            _ => Ok(collected),
        }
    }

    async fn fetch_for(
        &self,
        candidate: &VideoCandidate,
        profile: &LanguageProfile,
    ) -> PipelineResult<Option<VideoWithComments>> {
        let strict = self.config.enforce_language_match;
        if strict
            && (candidate.comment_count == Some(0)
                || !is_language_match(profile.key, &candidate.title))
        {
            return Ok(None);
        }

        let raw = {
            let _permit = self.fetch_permits.acquire().await.map_err(|_| {
                PipelineError::SourceUnavailable("comment fetch limiter closed".to_string())
            })?;
            self.source
                .fetch_comments(&candidate.video_id, profile, self.config.comment_fetch_size)
                .await?
        };

        let comments = filter_comments(raw, profile.key, self.config.comments_per_video, strict);
        if comments.is_empty() {
            return Ok(None);
        }
        Ok(Some(VideoWithComments {
            video: candidate.clone(),
            comments,
        }))
    }

    /// One `translate_many` call for every surviving comment of the language.
    async fn translate_selected(&self, selected: &mut [VideoWithComments], profile: &LanguageProfile) {
        let originals: Vec<String> = selected
            .iter()
            .flat_map(|v| v.comments.iter().map(|c| c.original.clone()))
            .collect();

        let translations = self
            .translator
            .translate_many(
                &originals,
                profile.translation_code,
                &self.config.output_language,
            )
            .await;
        if translations.len() != originals.len() {
            warn!(
                lang = profile.key,
                "Translator returned {} of {} items, keeping originals for the rest",
                translations.len(),
                originals.len()
            );
        }

        attach_translations(selected, translations);
    }
}

/// Prefer videos with a full set of comments, stopping once `target` of them
/// are found, then backfill with partial ones up to `target`.
pub fn select_videos(
    collected: Vec<VideoWithComments>,
    per_video: usize,
    target: usize,
) -> Vec<VideoWithComments> {
    let mut full = Vec::new();
    let mut partial = Vec::new();
    for video in collected {
        if full.len() >= target {
            break;
        }
        if video.comments.len() >= per_video {
            full.push(video);
        } else {
            partial.push(video);
        }
    }

    let backfill = target.saturating_sub(full.len());
    full.extend(partial.into_iter().take(backfill));
    full
}

/// Attach translations in flattened comment order. Missing entries leave the
/// comment with its original text.
pub fn attach_translations(selected: &mut [VideoWithComments], translations: Vec<String>) {
    let mut translations = translations.into_iter();
    for video in selected.iter_mut() {
        let comments = std::mem::take(&mut video.comments);
        video.comments = comments
            .into_iter()
            .map(|comment| {
                let translated = translations
                    .next()
                    .unwrap_or_else(|| comment.original.clone());
                comment.with_translation(translated)
            })
            .collect::<Vec<Comment>>();
    }
}
