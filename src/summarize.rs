//! Cross-language comment summaries over the chat client.

use crate::chat::{ChatClient, Message};
use crate::models::LanguageRecord;
use serde::Deserialize;
use tracing::{info, warn};

/// Comments sampled per language
const COMMENTS_PER_LANGUAGE: usize = 12;

/// Characters kept per sampled comment
const COMMENT_CLIP: usize = 200;

pub const EMPTY_SUMMARY: &str = "No comments available to summarize.";
pub const UNAVAILABLE_SUMMARY: &str =
    "The AI summary is temporarily unavailable (rate limit or API key problem). Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryScope {
    /// One language: main opinions within that audience
    Local,
    /// Several languages: compare attitudes between audiences
    Global,
}

impl SummaryScope {
    /// Local for a single record, Global otherwise.
    pub fn default_for(record_count: usize) -> Self {
        if record_count == 1 {
            SummaryScope::Local
        } else {
            SummaryScope::Global
        }
    }
}

/// Collapse whitespace and cut to `max_chars` characters, marking the cut with "…".
pub fn clip_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }
    let mut clipped: String = cleaned.chars().take(max_chars).collect();
    clipped.push('…');
    clipped
}

/// One "label: c1 / c2 / ..." line per record that has comments.
pub fn build_comments_payload(records: &[LanguageRecord]) -> String {
    records
        .iter()
        .filter_map(|record| {
            let result = record.result()?;
            let joined = result
                .comments
                .iter()
                .take(COMMENTS_PER_LANGUAGE)
                .map(|c| clip_text(c.display_text(), COMMENT_CLIP))
                .filter(|t| !t.is_empty())
                .collect::<Vec<_>>()
                .join(" / ");
            (!joined.is_empty()).then(|| format!("{}: {}", record.label, joined))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn build_prompt(scope: SummaryScope, query: &str, payload: &str, output_language: &str) -> Vec<Message> {
    let (system, instructions) = match scope {
        SummaryScope::Local => (
            "You are a public opinion analyst who distills what one audience thinks.",
            "Write a structured report on these comments:\n\
             1) Overall sentiment\n\
             2) Main viewpoints (3-5 points)\n\
             3) Notable minority opinions",
        ),
        SummaryScope::Global => (
            "You are a cross-language public opinion analyst who compares attitudes \
             between language and regional audiences.",
            "Write a structured report on these multi-language comments:\n\
             1) Overall sentiment\n\
             2) Main viewpoints per language/region (1-2 each)\n\
             3) Differences between groups and likely reasons",
        ),
    };

    let user = format!(
        "{instructions}\n\
         Keep a neutral tone and a clear structure. Write in: {output_language}\n\
         Topic: {query}\n\
         Comments:\n{payload}"
    );
    vec![Message::system(system), Message::user(user)]
}

/// Summarize the sampled comments. Never fails: chat errors become a fixed
/// apology message.
pub async fn summarize_comments(
    chat: &ChatClient,
    query: &str,
    records: &[LanguageRecord],
    scope: Option<SummaryScope>,
    output_language: &str,
) -> String {
    let payload = build_comments_payload(records);
    if payload.is_empty() {
        return EMPTY_SUMMARY.to_string();
    }

    if !chat.is_configured() {
        warn!("Comment summary requested but DEEPSEEK_API_KEY is not set");
        return UNAVAILABLE_SUMMARY.to_string();
    }

    let scope = scope.unwrap_or_else(|| SummaryScope::default_for(records.len()));
    info!("Summarizing comments for '{}' ({:?} scope)", query, scope);

    match chat
        .complete(&build_prompt(scope, query, &payload, output_language), 0.3, 700)
        .await
    {
        Ok(summary) => summary,
        Err(e) => {
            warn!("Comment summary failed: {}", e);
            UNAVAILABLE_SUMMARY.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::i18n::LanguageRegistry;
    use crate::models::{Comment, VideoCandidate, VideoWithComments};
    use crate::retry::RetryConfig;
    use std::time::Duration;
    use wiremock::{
        matchers::{body_string_contains, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn record(key: &str, comments: Vec<Comment>) -> LanguageRecord {
        let profile = LanguageRegistry::get().get_by_key(key).unwrap();
        LanguageRecord::success(
            profile,
            vec![VideoWithComments {
                video: VideoCandidate::new("v1", "title", "channel", 0),
                comments,
            }],
        )
    }

    fn chat_for(server: &MockServer, key: Option<&str>) -> ChatClient {
        let config = Config {
            deepseek_api_key: key.map(str::to_string),
            deepseek_base_url: server.uri(),
            ..Config::default()
        };
        ChatClient::new(&config, reqwest::Client::new())
            .with_retry_config(RetryConfig::new(1, Duration::from_millis(1)))
    }

    #[test]
    fn test_clip_text() {
        assert_eq!(clip_text("  a \n  b\tc ", 10), "a b c");
        assert_eq!(clip_text("abcdef", 3), "abc…");
        assert_eq!(clip_text("日本語のテキスト", 3), "日本語…");
        assert_eq!(clip_text("", 5), "");
    }

    #[test]
    fn test_payload_uses_translation_and_label() {
        let records = vec![
            record(
                "de",
                vec![
                    Comment::new("Sehr gut", 3).with_translation("很好".to_string()),
                    Comment::new("Toll", 1),
                ],
            ),
            LanguageRecord::failure(LanguageRegistry::get().get_by_key("fr").unwrap(), "boom"),
        ];

        assert_eq!(build_comments_payload(&records), "Deutsch: 很好 / Toll");
    }

    #[test]
    fn test_payload_samples_and_clips() {
        let comments: Vec<Comment> = (0..20)
            .map(|i| Comment::new(format!("{}{}", i, "x".repeat(300)), 0))
            .collect();
        let payload = build_comments_payload(&[record("en", comments)]);

        assert_eq!(payload.matches(" / ").count(), COMMENTS_PER_LANGUAGE - 1);
        assert_eq!(payload.matches('…').count(), COMMENTS_PER_LANGUAGE);
    }

    #[test]
    fn test_default_scope() {
        assert_eq!(SummaryScope::default_for(1), SummaryScope::Local);
        assert_eq!(SummaryScope::default_for(7), SummaryScope::Global);
        assert_eq!(SummaryScope::default_for(0), SummaryScope::Global);
    }

    #[tokio::test]
    async fn test_summarize_global() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_string_contains("Differences between groups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "  report  "}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let records = vec![
            record("de", vec![Comment::new("Sehr gut", 3)]),
            record("en", vec![Comment::new("Great", 3)]),
        ];
        let summary =
            summarize_comments(&chat_for(&server, Some("k")), "topic", &records, None, "zh-CN").await;
        assert_eq!(summary, "report");
    }

    #[tokio::test]
    async fn test_summarize_failure_apologizes() {
        let server = MockServer::start().await;
        let records = vec![record("de", vec![Comment::new("Sehr gut", 3)])];

        let summary = summarize_comments(
            &chat_for(&server, None),
            "topic",
            &records,
            Some(SummaryScope::Local),
            "zh-CN",
        )
        .await;
        assert_eq!(summary, UNAVAILABLE_SUMMARY);
    }

    #[tokio::test]
    async fn test_summarize_without_comments() {
        let server = MockServer::start().await;
        let summary = summarize_comments(&chat_for(&server, Some("k")), "topic", &[], None, "zh-CN").await;
        assert_eq!(summary, EMPTY_SUMMARY);
    }
}
