use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Which translation backend `translate_many` goes through first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslateProvider {
    /// One MyMemory request per text.
    MyMemory,
    /// One chat-completion request per batch, MyMemory as fallback.
    DeepSeek,
}

impl TranslateProvider {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "mymemory" => Ok(Self::MyMemory),
            "deepseek" | "chat" => Ok(Self::DeepSeek),
            other => bail!("Unsupported translation provider: {}", other),
        }
    }
}

/// Weights for the video ranking score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    pub views: f64,
    pub recency: f64,
    pub position: f64,
    pub comment_bonus: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            views: 0.35,
            recency: 0.25,
            position: 0.40,
            comment_bonus: 0.05,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    // YouTube Data API (authenticated source)
    pub youtube_api_key: Option<String>,
    pub youtube_api_url: String,

    // Invidious mirrors (fallback source)
    pub invidious_instances: Vec<String>,

    // Translation
    pub translate_provider: TranslateProvider,
    pub mymemory_url: String,
    pub mymemory_email: Option<String>,
    pub output_language: String,

    // Chat completion (DeepSeek / OpenAI-compatible)
    pub deepseek_api_key: Option<String>,
    pub deepseek_base_url: String,
    pub deepseek_model: String,

    // Networking
    pub http_timeout: Duration,
    pub max_concurrency: usize,
    pub language_timeout: Duration,

    // Pipeline sizing
    pub search_limit: usize,
    pub comments_per_video: usize,
    pub target_videos: usize,
    pub comment_fetch_size: usize,
    pub enforce_language_match: bool,
    pub ranking: RankingWeights,

    // Offline fixtures
    pub force_local_comments: bool,
    pub mock_data_path: String,

    // Web server
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            youtube_api_key: None,
            youtube_api_url: "https://www.googleapis.com/youtube/v3".to_string(),
            invidious_instances: default_invidious_instances(),
            translate_provider: TranslateProvider::MyMemory,
            mymemory_url: "https://api.mymemory.translated.net/get".to_string(),
            mymemory_email: None,
            output_language: "zh-CN".to_string(),
            deepseek_api_key: None,
            deepseek_base_url: "https://api.deepseek.com".to_string(),
            deepseek_model: "deepseek-chat".to_string(),
            http_timeout: Duration::from_secs(18),
            max_concurrency: 6,
            language_timeout: Duration::from_secs(90),
            search_limit: 20,
            comments_per_video: 5,
            target_videos: 10,
            comment_fetch_size: 60,
            enforce_language_match: false,
            ranking: RankingWeights::default(),
            force_local_comments: false,
            mock_data_path: "data/mock_comments.json".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let translate_provider = match std::env::var("TRANSLATE_PROVIDER") {
            Ok(value) => TranslateProvider::parse(&value).context("Invalid TRANSLATE_PROVIDER")?,
            Err(_) => defaults.translate_provider,
        };

        let invidious_instances = std::env::var("INVIDIOUS_INSTANCES")
            .ok()
            .map(|v| parse_list(&v))
            .filter(|list| !list.is_empty())
            .unwrap_or(defaults.invidious_instances);

        let max_concurrency: usize = env_or("MAX_CONCURRENCY", defaults.max_concurrency);
        if max_concurrency == 0 {
            bail!("MAX_CONCURRENCY must be at least 1");
        }

        let http_timeout = Duration::try_from_secs_f64(env_or(
            "HTTP_TIMEOUT",
            defaults.http_timeout.as_secs_f64(),
        ))
        .context("Invalid HTTP_TIMEOUT")?;

        Ok(Self {
            // YouTube
            youtube_api_key: non_empty_env("YOUTUBE_API_KEY"),
            youtube_api_url: std::env::var("YOUTUBE_API_URL").unwrap_or(defaults.youtube_api_url),

            invidious_instances,

            // Translation
            translate_provider,
            mymemory_url: std::env::var("MYMEMORY_URL").unwrap_or(defaults.mymemory_url),
            mymemory_email: non_empty_env("MYMEMORY_EMAIL"),
            output_language: std::env::var("OUTPUT_LANGUAGE").unwrap_or(defaults.output_language),

            // Chat completion
            deepseek_api_key: non_empty_env("DEEPSEEK_API_KEY"),
            deepseek_base_url: std::env::var("DEEPSEEK_BASE_URL")
                .unwrap_or(defaults.deepseek_base_url),
            deepseek_model: std::env::var("DEEPSEEK_MODEL").unwrap_or(defaults.deepseek_model),

            // Networking
            http_timeout,
            max_concurrency,
            language_timeout: Duration::from_secs(env_or(
                "LANGUAGE_TIMEOUT",
                defaults.language_timeout.as_secs(),
            )),

            // Pipeline sizing
            search_limit: env_or("SEARCH_LIMIT", defaults.search_limit),
            comments_per_video: env_or("COMMENTS_PER_VIDEO", defaults.comments_per_video),
            target_videos: env_or("TARGET_VIDEOS", defaults.target_videos),
            comment_fetch_size: env_or("COMMENT_FETCH_SIZE", defaults.comment_fetch_size),
            enforce_language_match: env_flag("ENFORCE_LANGUAGE_MATCH"),
            ranking: RankingWeights {
                views: env_or("RANK_VIEW_WEIGHT", defaults.ranking.views),
                recency: env_or("RANK_RECENCY_WEIGHT", defaults.ranking.recency),
                position: env_or("RANK_POSITION_WEIGHT", defaults.ranking.position),
                comment_bonus: env_or("RANK_COMMENT_BONUS", defaults.ranking.comment_bonus),
            },

            // Offline fixtures
            force_local_comments: env_flag("FORCE_LOCAL_COMMENTS"),
            mock_data_path: std::env::var("MOCK_DATA_PATH").unwrap_or(defaults.mock_data_path),

            port: env_or("PORT", defaults.port),
        })
    }

    /// Shared HTTP client for every upstream: one timeout, one user agent.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")
    }
}

fn default_invidious_instances() -> Vec<String> {
    parse_list(
        "https://yewtu.be,https://vid.puffyan.us,https://inv.nadeko.net,https://invidious.fdn.fr",
    )
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str) -> bool {
    std::env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: &[&str] = &[
        "YOUTUBE_API_KEY",
        "INVIDIOUS_INSTANCES",
        "TRANSLATE_PROVIDER",
        "MAX_CONCURRENCY",
        "HTTP_TIMEOUT",
        "RANK_VIEW_WEIGHT",
        "ENFORCE_LANGUAGE_MATCH",
        "FORCE_LOCAL_COMMENTS",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().expect("defaults should load");

        assert!(config.youtube_api_key.is_none());
        assert_eq!(config.invidious_instances.len(), 4);
        assert_eq!(config.translate_provider, TranslateProvider::MyMemory);
        assert_eq!(config.max_concurrency, 6);
        assert_eq!(config.http_timeout, Duration::from_secs(18));
        assert_eq!(config.language_timeout, Duration::from_secs(90));
        assert_eq!(config.ranking, RankingWeights::default());
        assert!(!config.enforce_language_match);
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("YOUTUBE_API_KEY", "yt-key");
        std::env::set_var("INVIDIOUS_INSTANCES", "https://a.example/, https://b.example,,");
        std::env::set_var("TRANSLATE_PROVIDER", "DeepSeek");
        std::env::set_var("MAX_CONCURRENCY", "2");
        std::env::set_var("HTTP_TIMEOUT", "2.5");
        std::env::set_var("RANK_VIEW_WEIGHT", "0.5");
        std::env::set_var("ENFORCE_LANGUAGE_MATCH", "true");

        let config = Config::from_env().expect("should load");
        clear_env();

        assert_eq!(config.youtube_api_key.as_deref(), Some("yt-key"));
        assert_eq!(
            config.invidious_instances,
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
        assert_eq!(config.translate_provider, TranslateProvider::DeepSeek);
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.http_timeout, Duration::from_millis(2500));
        assert!((config.ranking.views - 0.5).abs() < f64::EPSILON);
        assert!(config.enforce_language_match);
    }

    #[test]
    #[serial]
    fn test_unknown_provider_is_an_error() {
        clear_env();
        std::env::set_var("TRANSLATE_PROVIDER", "babelfish");
        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_invalid_http_timeout_rejected() {
        for bad in ["-1", "NaN", "inf"] {
            clear_env();
            std::env::set_var("HTTP_TIMEOUT", bad);
            assert!(Config::from_env().is_err(), "HTTP_TIMEOUT={} accepted", bad);
        }
        clear_env();
    }

    #[test]
    #[serial]
    fn test_zero_concurrency_rejected() {
        clear_env();
        std::env::set_var("MAX_CONCURRENCY", "0");
        let result = Config::from_env();
        clear_env();

        assert!(result.is_err());
    }

    #[test]
    fn test_blank_youtube_key_is_none() {
        assert!(non_empty_env("PERSPECTIVE_ENGINE_UNSET_VAR").is_none());
    }

    #[test]
    fn test_provider_parse() {
        assert_eq!(TranslateProvider::parse("mymemory").unwrap(), TranslateProvider::MyMemory);
        assert_eq!(TranslateProvider::parse(" chat ").unwrap(), TranslateProvider::DeepSeek);
        assert!(TranslateProvider::parse("").is_err());
    }
}
