use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::Client;
use serde_json::Value;

use crate::github::GitHubClient;
use crate::traits::ContextSource;
use crate::types::{ExternalContext, StandupRequest};

/// Reads the N most recent messages of the channel the mention came from,
/// via the Slack `conversations.history` API. Pure read; the orchestrator
/// drops this source's contribution on any error.
pub struct ChannelHistorySource {
    http: Client,
    bot_token: String,
    limit: u64,
}

impl ChannelHistorySource {
    pub fn new(bot_token: &str, limit: u64) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("failed to build HTTP client"),
            bot_token: bot_token.to_string(),
            limit: limit.clamp(1, 200),
        }
    }

    async fn fetch_history(&self, channel_id: &str) -> anyhow::Result<Vec<Value>> {
        let resp = self
            .http
            .get("https://slack.com/api/conversations.history")
            .bearer_auth(&self.bot_token)
            .query(&[
                ("channel", channel_id.to_string()),
                ("limit", self.limit.to_string()),
            ])
            .send()
            .await?;

        let body: Value = resp.json().await?;
        if body["ok"].as_bool() != Some(true) {
            let err = body["error"].as_str().unwrap_or("unknown error");
            let hint = match err {
                "channel_not_found" | "not_in_channel" => {
                    "The bot may not be a member of this channel."
                }
                "missing_scope" => "The Slack app is missing the 'channels:history' OAuth scope.",
                "invalid_auth" | "token_revoked" => {
                    "The Slack bot token is invalid or revoked. Check config.toml."
                }
                _ => "An unexpected Slack API error occurred.",
            };
            anyhow::bail!("Slack conversations.history failed: {}. {}", err, hint);
        }

        Ok(body["messages"].as_array().cloned().unwrap_or_default())
    }
}

#[async_trait]
impl ContextSource for ChannelHistorySource {
    fn name(&self) -> &str {
        "channel_history"
    }

    async fn fetch(&self, request: &StandupRequest) -> anyhow::Result<ExternalContext> {
        let messages = self.fetch_history(&request.channel).await?;

        // Slack returns newest-first; reverse for chronological reading.
        let mut history = Vec::with_capacity(messages.len());
        for msg in messages.iter().rev() {
            // Skip system messages (joins, topic changes, ...).
            if msg["subtype"].as_str().is_some() {
                continue;
            }
            if let Some(line) = format_history_line(msg) {
                history.push(line);
            }
        }

        Ok(ExternalContext {
            history,
            ..Default::default()
        })
    }
}

/// Format one Slack message as "[time] user: text" with mention tags made
/// readable.
fn format_history_line(msg: &Value) -> Option<String> {
    let text = msg["text"].as_str()?;
    if text.is_empty() {
        return None;
    }
    let user = msg["user"].as_str().unwrap_or("unknown");
    let text = humanize_mentions(text);

    let timestamp = msg["ts"]
        .as_str()
        .and_then(|ts| ts.split('.').next())
        .and_then(|s| s.parse::<i64>().ok())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string());

    Some(match timestamp {
        Some(when) => format!("[{}] {}: {}", when, user, text),
        None => format!("{}: {}", user, text),
    })
}

/// Rewrite `<@U123ABC>` mention tags as `@U123ABC`.
fn humanize_mentions(text: &str) -> String {
    let re = regex::Regex::new(r"<@(U[A-Z0-9]+)>").unwrap();
    re.replace_all(text, "@$1").into_owned()
}

/// Pulls open issues, open pull requests, and recent comments from the
/// linked repository.
pub struct RepoActivitySource {
    client: Arc<GitHubClient>,
}

impl RepoActivitySource {
    pub fn new(client: Arc<GitHubClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContextSource for RepoActivitySource {
    fn name(&self) -> &str {
        "repo_activity"
    }

    async fn fetch(&self, _request: &StandupRequest) -> anyhow::Result<ExternalContext> {
        let issues = self.client.list_open_issues().await?;
        let pulls = self.client.list_open_pulls().await?;
        let comments = self.client.recent_comments().await?;

        Ok(ExternalContext {
            history: Vec::new(),
            issues: issues.as_array().cloned().unwrap_or_default(),
            pull_requests: pulls.as_array().cloned().unwrap_or_default(),
            comments: comments.as_array().cloned().unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn history_line_formatting() {
        let msg = json!({
            "user": "U02XYZ",
            "text": "shipped the importer",
            "ts": "1705312200.000100",
        });
        let line = format_history_line(&msg).unwrap();
        assert!(line.contains("U02XYZ: shipped the importer"));
        assert!(line.starts_with("[2024-01-15"));
    }

    #[test]
    fn history_line_without_timestamp() {
        let msg = json!({"user": "U1", "text": "hello", "ts": "garbage"});
        assert_eq!(format_history_line(&msg).unwrap(), "U1: hello");
    }

    #[test]
    fn empty_text_skipped() {
        let msg = json!({"user": "U1", "text": "", "ts": "1"});
        assert!(format_history_line(&msg).is_none());
    }

    #[test]
    fn mention_tags_humanized() {
        assert_eq!(
            humanize_mentions("ping <@U04ABC99> about <@U04DEF11>"),
            "ping @U04ABC99 about @U04DEF11"
        );
        assert_eq!(humanize_mentions("no mentions"), "no mentions");
    }

    #[test]
    fn limit_is_clamped() {
        let source = ChannelHistorySource::new("xoxb-test", 0);
        assert_eq!(source.limit, 1);
        let source = ChannelHistorySource::new("xoxb-test", 10_000);
        assert_eq!(source.limit, 200);
    }
}
