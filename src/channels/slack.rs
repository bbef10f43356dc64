use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::StreamExt;
use futures::SinkExt;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::formatting::{markdown_to_slack_mrkdwn, split_message};
use crate::standup::StandupOrchestrator;
use crate::traits::UserDirectory;
use crate::types::StandupRequest;

/// Maximum message length for Slack (actual limit is 40,000 but leave margin).
const MAX_MESSAGE_LEN: usize = 39_000;

/// Slack channel adapter using Socket Mode (WebSocket) for receiving
/// mention events and the Web API (HTTP) for sending replies.
pub struct SlackChannel {
    app_token: String,
    bot_token: String,
    allowed_user_ids: Vec<String>,
    use_threads: bool,
    orchestrator: Arc<StandupOrchestrator>,
    http: reqwest::Client,
    /// Our own bot user ID, resolved on first connection.
    bot_user_id: Mutex<Option<String>>,
}

impl SlackChannel {
    pub fn new(
        app_token: &str,
        bot_token: &str,
        allowed_user_ids: Vec<String>,
        use_threads: bool,
        orchestrator: Arc<StandupOrchestrator>,
    ) -> Self {
        Self {
            app_token: app_token.to_string(),
            bot_token: bot_token.to_string(),
            allowed_user_ids,
            use_threads,
            orchestrator,
            http: reqwest::Client::new(),
            bot_user_id: Mutex::new(None),
        }
    }

    /// Start the Slack Socket Mode client with automatic retry on crash.
    pub async fn start_with_retry(self: Arc<Self>) {
        let initial_backoff = Duration::from_secs(5);
        let max_backoff = Duration::from_secs(60);
        let stable_threshold = Duration::from_secs(60);
        let mut backoff = initial_backoff;

        loop {
            info!("Starting Slack Socket Mode client");
            let started = tokio::time::Instant::now();
            if let Err(e) = self.clone().start().await {
                warn!("Slack client error: {}", e);
            }
            let ran_for = started.elapsed();

            if ran_for >= stable_threshold {
                backoff = initial_backoff;
            }

            warn!(
                backoff_secs = backoff.as_secs(),
                ran_for_secs = ran_for.as_secs(),
                "Slack client stopped, restarting"
            );
            tokio::time::sleep(backoff).await;
            backoff = std::cmp::min(backoff * 2, max_backoff);
        }
    }

    /// Open a Socket Mode connection and process events.
    async fn start(self: Arc<Self>) -> anyhow::Result<()> {
        // Resolve our own bot user ID (for filtering self-messages)
        self.resolve_bot_info().await;

        // Request a WebSocket URL from Slack
        let wss_url = self.open_connection().await?;
        info!(url = %wss_url, "Slack Socket Mode connection URL obtained");

        let (ws_stream, _) = tokio_tungstenite::connect_async(&wss_url)
            .await
            .map_err(|e| anyhow::anyhow!("WebSocket connect failed: {}", e))?;

        info!("Slack WebSocket connected");

        let (mut ws_tx, mut ws_rx) = ws_stream.split();

        while let Some(msg) = ws_rx.next().await {
            let msg = match msg {
                Ok(m) => m,
                Err(e) => {
                    warn!("WebSocket read error: {}", e);
                    break;
                }
            };

            match msg {
                tokio_tungstenite::tungstenite::Message::Text(text) => {
                    let envelope: Value = match serde_json::from_str(&text) {
                        Ok(v) => v,
                        Err(e) => {
                            warn!("Failed to parse Slack envelope: {}", e);
                            continue;
                        }
                    };

                    // Acknowledge the envelope immediately
                    if let Some(envelope_id) = envelope.get("envelope_id").and_then(|v| v.as_str())
                    {
                        let ack = serde_json::json!({ "envelope_id": envelope_id });
                        let ack_msg =
                            tokio_tungstenite::tungstenite::Message::Text(ack.to_string().into());
                        if let Err(e) = ws_tx.send(ack_msg).await {
                            warn!("Failed to ack envelope: {}", e);
                        }
                    }

                    // Handle disconnect events
                    if envelope.get("type").and_then(|v| v.as_str()) == Some("disconnect") {
                        let reason = envelope
                            .get("reason")
                            .and_then(|v| v.as_str())
                            .unwrap_or("unknown");
                        info!(reason, "Slack requested disconnect");
                        break;
                    }

                    let channel = Arc::clone(&self);
                    tokio::spawn(async move {
                        channel.handle_envelope(envelope).await;
                    });
                }
                tokio_tungstenite::tungstenite::Message::Ping(data) => {
                    let pong = tokio_tungstenite::tungstenite::Message::Pong(data);
                    let _ = ws_tx.send(pong).await;
                }
                tokio_tungstenite::tungstenite::Message::Close(_) => {
                    info!("Slack WebSocket closed by server");
                    break;
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Call `apps.connections.open` to get a WebSocket URL.
    async fn open_connection(&self) -> anyhow::Result<String> {
        let resp = self
            .http
            .post("https://slack.com/api/apps.connections.open")
            .header("Authorization", format!("Bearer {}", self.app_token))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await?;

        let body: Value = resp.json().await?;
        if body.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = body.get("error").and_then(|v| v.as_str()).unwrap_or("unknown");
            anyhow::bail!("apps.connections.open failed: {}", error);
        }

        body.get("url")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("No URL in apps.connections.open response"))
    }

    /// Resolve the bot's own user ID via `auth.test`.
    async fn resolve_bot_info(&self) {
        let resp = self
            .http
            .post("https://slack.com/api/auth.test")
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .send()
            .await;

        match resp {
            Ok(r) => match r.json::<Value>().await {
                Ok(body) if body["ok"].as_bool() == Some(true) => {
                    if let Some(user_id) = body["user_id"].as_str() {
                        let mut guard = self.bot_user_id.lock().await;
                        *guard = Some(user_id.to_string());
                        info!(bot_user_id = user_id, "Resolved Slack bot identity");
                    }
                }
                Ok(body) => {
                    let error = body["error"].as_str().unwrap_or("unknown");
                    warn!(error, "auth.test failed");
                }
                Err(e) => warn!("Failed to parse auth.test response: {}", e),
            },
            Err(e) => warn!("Failed to resolve bot info: {}", e),
        }
    }

    /// Handle a Socket Mode envelope.
    async fn handle_envelope(&self, envelope: Value) {
        let envelope_type = match envelope.get("type").and_then(|v| v.as_str()) {
            Some(t) => t,
            None => return,
        };

        match envelope_type {
            "events_api" => {
                if let Some(payload) = envelope.get("payload") {
                    self.handle_events_api(payload).await;
                }
            }
            "hello" => {
                info!("Slack Socket Mode hello received");
            }
            _ => {
                debug!(envelope_type, "Unhandled Slack envelope type");
            }
        }
    }

    /// Handle an Events API payload. Only `app_mention` events start a
    /// standup turn; everything else is ignored.
    async fn handle_events_api(&self, payload: &Value) {
        let event = match payload.get("event") {
            Some(e) => e,
            None => return,
        };

        if event["type"].as_str() != Some("app_mention") {
            return;
        }
        // Ignore message subtypes (edits, bot messages, etc.)
        if event.get("subtype").is_some() {
            return;
        }

        let user = match event["user"].as_str() {
            Some(u) => u.to_string(),
            None => return,
        };

        // Ignore our own messages
        {
            let bot_id = self.bot_user_id.lock().await;
            if bot_id.as_deref() == Some(&user) {
                return;
            }
        }

        if !self.allowed_user_ids.is_empty() && !self.allowed_user_ids.contains(&user) {
            debug!(user_id = %user, "Ignoring mention from non-allowed user");
            return;
        }

        let channel_id = match event["channel"].as_str() {
            Some(c) => c.to_string(),
            None => return,
        };
        let raw_text = event["text"].as_str().unwrap_or("").to_string();
        let ts = event["ts"].as_str().unwrap_or("").to_string();
        let thread_ts = event["thread_ts"].as_str().map(|s| s.to_string());

        // Strip the bot @mention tag from the text before processing
        let text = {
            let bot_id = self.bot_user_id.lock().await;
            match bot_id.as_deref() {
                Some(bid) => raw_text.replace(&format!("<@{}>", bid), "").trim().to_string(),
                None => raw_text.trim().to_string(),
            }
        };

        let reply_thread = self.reply_thread_ts(&ts, thread_ts.as_deref());

        info!(user_id = %user, channel = %channel_id, "Received standup mention");

        let request = StandupRequest {
            user,
            text,
            channel: channel_id.clone(),
            ts: ts.clone(),
        };

        // Typing indicator via reaction while the turn runs
        let typing = self.api_handle();
        let typing_channel = channel_id.clone();
        let typing_ts = ts.clone();
        let typing_cancel = tokio_util::sync::CancellationToken::new();
        let typing_token = typing_cancel.clone();
        tokio::spawn(async move {
            let _ = typing
                .add_reaction(&typing_channel, &typing_ts, "hourglass_flowing_sand")
                .await;
            typing_token.cancelled().await;
            let _ = typing
                .remove_reaction(&typing_channel, &typing_ts, "hourglass_flowing_sand")
                .await;
        });

        let orchestrator = Arc::clone(&self.orchestrator);
        let replies = self.api_handle();
        tokio::spawn(async move {
            let response = orchestrator.handle_turn(request).await;
            typing_cancel.cancel();

            let mrkdwn = markdown_to_slack_mrkdwn(response.text());
            for chunk in split_message(&mrkdwn, MAX_MESSAGE_LEN) {
                if let Err(e) = replies
                    .post_message(&channel_id, &chunk, reply_thread.as_deref())
                    .await
                {
                    warn!("Failed to post Slack reply: {}", e);
                }
            }
        });
    }

    /// Determine the thread_ts to use when replying.
    fn reply_thread_ts(&self, message_ts: &str, existing_thread_ts: Option<&str>) -> Option<String> {
        if self.use_threads {
            Some(existing_thread_ts.unwrap_or(message_ts).to_string())
        } else {
            existing_thread_ts.map(|s| s.to_string())
        }
    }

    /// Lightweight handle for making Web API calls from spawned tasks.
    fn api_handle(&self) -> SlackApiHandle {
        SlackApiHandle {
            http: self.http.clone(),
            bot_token: self.bot_token.clone(),
        }
    }
}

/// Lightweight handle for making Slack API calls from spawned tasks.
struct SlackApiHandle {
    http: reqwest::Client,
    bot_token: String,
}

impl SlackApiHandle {
    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> anyhow::Result<Value> {
        let mut body = serde_json::json!({
            "channel": channel,
            "text": text,
        });
        if let Some(ts) = thread_ts {
            body["thread_ts"] = Value::String(ts.to_string());
        }
        let resp = self
            .http
            .post("https://slack.com/api/chat.postMessage")
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .json(&body)
            .send()
            .await?;
        let result: Value = resp.json().await?;
        if result.get("ok").and_then(|v| v.as_bool()) != Some(true) {
            let error = result.get("error").and_then(|v| v.as_str()).unwrap_or("unknown");
            anyhow::bail!("chat.postMessage failed: {}", error);
        }
        Ok(result)
    }

    async fn add_reaction(&self, channel: &str, ts: &str, name: &str) -> anyhow::Result<()> {
        self.reaction("reactions.add", channel, ts, name).await
    }

    async fn remove_reaction(&self, channel: &str, ts: &str, name: &str) -> anyhow::Result<()> {
        self.reaction("reactions.remove", channel, ts, name).await
    }

    async fn reaction(
        &self,
        method: &str,
        channel: &str,
        ts: &str,
        name: &str,
    ) -> anyhow::Result<()> {
        let body = serde_json::json!({
            "channel": channel,
            "timestamp": ts,
            "name": name,
        });
        let url = format!("https://slack.com/api/{}", method);
        let _ = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.bot_token))
            .json(&body)
            .send()
            .await;
        Ok(())
    }
}

/// Resolves Slack user IDs to display names via `users.info`, with an
/// in-process cache. Lookup failures fall back to the caller's placeholder.
pub struct SlackUserDirectory {
    http: reqwest::Client,
    bot_token: String,
    cache: RwLock<HashMap<String, String>>,
}

impl SlackUserDirectory {
    pub fn new(bot_token: &str) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(15))
                .build()
                .expect("failed to build HTTP client"),
            bot_token: bot_token.to_string(),
            cache: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl UserDirectory for SlackUserDirectory {
    async fn display_name(&self, user_id: &str) -> anyhow::Result<String> {
        {
            let cache = self.cache.read().await;
            if let Some(name) = cache.get(user_id) {
                return Ok(name.clone());
            }
        }

        let resp = self
            .http
            .get("https://slack.com/api/users.info")
            .bearer_auth(&self.bot_token)
            .query(&[("user", user_id)])
            .send()
            .await?;

        let body: Value = resp.json().await?;
        if body["ok"].as_bool() != Some(true) {
            let error = body["error"].as_str().unwrap_or("unknown");
            anyhow::bail!("users.info failed: {}", error);
        }

        let name = body["user"]["profile"]["display_name"]
            .as_str()
            .filter(|s| !s.is_empty())
            .or_else(|| body["user"]["real_name"].as_str())
            .or_else(|| body["user"]["name"].as_str())
            .ok_or_else(|| anyhow::anyhow!("No usable name in users.info response"))?
            .to_string();

        let mut cache = self.cache.write().await;
        cache.insert(user_id.to_string(), name.clone());
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SnapshotStore;
    use crate::testing::{MockDirectory, MockProvider};

    fn channel(use_threads: bool) -> SlackChannel {
        let orchestrator = Arc::new(StandupOrchestrator::new(
            Arc::new(MockProvider::new()),
            "mock-model".to_string(),
            vec![],
            std::collections::HashMap::new(),
            Arc::new(MockDirectory::named("Ada")),
            vec![],
            SnapshotStore::new("unused"),
            8,
        ));
        SlackChannel::new("xapp-test", "xoxb-test", vec![], use_threads, orchestrator)
    }

    #[test]
    fn reply_goes_to_new_thread_when_threads_enabled() {
        let ch = channel(true);
        assert_eq!(ch.reply_thread_ts("1700.1", None), Some("1700.1".to_string()));
    }

    #[test]
    fn reply_stays_in_existing_thread() {
        let ch = channel(true);
        assert_eq!(
            ch.reply_thread_ts("1700.2", Some("1700.1")),
            Some("1700.1".to_string())
        );
    }

    #[test]
    fn reply_skips_thread_when_disabled() {
        let ch = channel(false);
        assert_eq!(ch.reply_thread_ts("1700.1", None), None);
        assert_eq!(
            ch.reply_thread_ts("1700.2", Some("1700.1")),
            Some("1700.1".to_string())
        );
    }
}
