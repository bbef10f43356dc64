use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::cache::SnapshotStore;
use crate::prompt;
use crate::providers::ProviderError;
use crate::tools::SnapshotField;
use crate::traits::{ContextSource, ModelProvider, Tool, UserDirectory};
use crate::types::{
    CachedSnapshot, ExternalContext, StandupPhase, StandupRequest, StandupResponse,
};

/// Display name used when the lookup fails. Never surfaced as an error.
const FALLBACK_NAME: &str = "User";

const FALLBACK_REPLY: &str =
    "I wasn't able to put together a reply this time. Please try again.";

/// Drives one standup turn: resolve the user, gather context, compose the
/// prompt, run the model (with tools), and write back the snapshot.
///
/// Turns are stateless across calls except through the snapshot store;
/// turns for the same user are serialized by a keyed lock so a slow turn
/// cannot race its own cache write.
pub struct StandupOrchestrator {
    provider: Arc<dyn ModelProvider>,
    model: String,
    tools: Vec<Arc<dyn Tool>>,
    snapshot_fields: HashMap<String, SnapshotField>,
    directory: Arc<dyn UserDirectory>,
    sources: Vec<Arc<dyn ContextSource>>,
    store: SnapshotStore,
    max_tool_iterations: u32,
    user_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StandupOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn ModelProvider>,
        model: String,
        tools: Vec<Arc<dyn Tool>>,
        snapshot_fields: HashMap<String, SnapshotField>,
        directory: Arc<dyn UserDirectory>,
        sources: Vec<Arc<dyn ContextSource>>,
        store: SnapshotStore,
        max_tool_iterations: u32,
    ) -> Self {
        Self {
            provider,
            model,
            tools,
            snapshot_fields,
            directory,
            sources,
            store,
            max_tool_iterations: max_tool_iterations.max(1),
            user_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Handle one turn. Never fails past this boundary: any unrecoverable
    /// error becomes a user-visible error reply, and the channel always
    /// gets some text back.
    pub async fn handle_turn(&self, request: StandupRequest) -> StandupResponse {
        let lock = self.user_lock(&request.user).await;
        let _turn = lock.lock().await;

        match self.run_turn(&request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(user = %request.user, error = %e, "Standup turn failed");
                // Classified provider errors carry a channel-ready message;
                // the raw error (status, response body) stays in the logs.
                let reply = match e.downcast_ref::<ProviderError>() {
                    Some(provider_err) => provider_err.user_message(),
                    None => format!("Sorry, I couldn't process your standup update: {}", e),
                };
                StandupResponse::Plain(reply)
            }
        }
    }

    async fn run_turn(&self, request: &StandupRequest) -> anyhow::Result<StandupResponse> {
        // 1. Display name — fails soft to a placeholder.
        let name = match self.directory.display_name(&request.user).await {
            Ok(n) if !n.trim().is_empty() => n,
            Ok(_) => FALLBACK_NAME.to_string(),
            Err(e) => {
                warn!(user = %request.user, error = %e, "Name lookup failed, using placeholder");
                FALLBACK_NAME.to_string()
            }
        };

        // 2. Phase and cached snapshot. A completed round reads as fresh.
        let phase = match self.store.load_phase(&request.user) {
            StandupPhase::Complete => StandupPhase::default(),
            p => p,
        };
        let cached = self.store.load(&request.user);

        // 3. Context — each source degrades to nothing on failure.
        let mut context = ExternalContext::default();
        for source in &self.sources {
            match source.fetch(request).await {
                Ok(part) => context.merge(part),
                Err(e) => {
                    warn!(
                        source = source.name(),
                        error = %e,
                        "Context fetch failed, continuing without it"
                    );
                }
            }
        }

        // 4. Compose and run the model, executing tool calls in between.
        let system = prompt::compose_system(&name, phase, &context);
        let human = prompt::compose_human(&request.text, &cached);
        let mut messages = vec![
            json!({ "role": "system", "content": system }),
            json!({ "role": "user", "content": human }),
        ];
        let tool_defs: Vec<Value> = self
            .tools
            .iter()
            .map(|t| json!({ "type": "function", "function": t.schema() }))
            .collect();

        let mut gathered = CachedSnapshot::default();
        let mut touched = false;
        let mut final_text: Option<String> = None;

        for iteration in 0..self.max_tool_iterations {
            let response = self
                .provider
                .chat(&self.model, &messages, &tool_defs)
                .await?;

            if response.tool_calls.is_empty() {
                final_text = response
                    .content
                    .filter(|content| !content.trim().is_empty());
                break;
            }

            info!(
                user = %request.user,
                iteration,
                calls = response.tool_calls.len(),
                "Model requested tool calls"
            );

            messages.push(json!({
                "role": "assistant",
                "content": response.content,
                "tool_calls": response.tool_calls.iter().map(|call| json!({
                    "id": call.id,
                    "type": "function",
                    "function": { "name": call.name, "arguments": call.arguments },
                })).collect::<Vec<Value>>(),
            }));

            for call in &response.tool_calls {
                let result = match self.tools.iter().find(|t| t.name() == call.name) {
                    Some(tool) => match tool.call(&call.arguments).await {
                        Ok(output) => {
                            if let Some(field) = self.snapshot_fields.get(call.name.as_str()) {
                                absorb(&mut gathered, *field, &output);
                                touched = true;
                            }
                            output
                        }
                        // Feed the failure back to the model rather than
                        // aborting the turn.
                        Err(e) => format!("Error: {}", e),
                    },
                    None => format!("Unknown tool: {}", call.name),
                };
                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }
        }

        let text = final_text.unwrap_or_else(|| FALLBACK_REPLY.to_string());

        // 5. Write-back and phase advance. Cache I/O failures are logged,
        // never surfaced — the reply is already in hand.
        if touched {
            if let Err(e) = self.store.store(&request.user, &gathered) {
                warn!(user = %request.user, error = %e, "Snapshot write failed");
            }
        }
        if let Err(e) = self.store.store_phase(&request.user, phase.next()) {
            warn!(user = %request.user, error = %e, "Phase write failed");
        }

        Ok(if touched {
            StandupResponse::ToolAugmented {
                text,
                snapshot: gathered,
            }
        } else {
            StandupResponse::Plain(text)
        })
    }

    async fn user_lock(&self, user_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(
            locks
                .entry(user_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }
}

/// Fold a tool result into the snapshot being gathered this turn.
///
/// Read tools return either a bare JSON array for their bucket or an
/// object whose keys name the buckets (e.g. `get_issue` returns the issue
/// plus its comments).
fn absorb(snapshot: &mut CachedSnapshot, field: SnapshotField, raw: &str) {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(_) => return, // non-JSON tool output carries no snapshot data
    };

    if let Some(obj) = value.as_object() {
        let mut keyed = false;
        if let Some(items) = obj.get("issues").and_then(|v| v.as_array()) {
            snapshot.issues.extend(items.iter().cloned());
            keyed = true;
        }
        if let Some(items) = obj.get("pull_requests").and_then(|v| v.as_array()) {
            snapshot.pull_requests.extend(items.iter().cloned());
            keyed = true;
        }
        if let Some(items) = obj.get("comments").and_then(|v| v.as_array()) {
            snapshot.comments.extend(items.iter().cloned());
            keyed = true;
        }
        if let Some(item) = obj.get("issue") {
            snapshot.issues.push(item.clone());
            keyed = true;
        }
        if let Some(item) = obj.get("pull_request") {
            snapshot.pull_requests.push(item.clone());
            keyed = true;
        }
        if keyed {
            return;
        }
    }

    let bucket = match field {
        SnapshotField::Issues => &mut snapshot.issues,
        SnapshotField::PullRequests => &mut snapshot.pull_requests,
        SnapshotField::Comments => &mut snapshot.comments,
    };
    match value {
        Value::Array(items) => bucket.extend(items),
        other => bucket.push(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn absorb_array_into_bucket() {
        let mut snap = CachedSnapshot::default();
        absorb(
            &mut snap,
            SnapshotField::Issues,
            r#"[{"id": 1}, {"id": 2}]"#,
        );
        assert_eq!(snap.issues.len(), 2);
    }

    #[test]
    fn absorb_keyed_object_splits_buckets() {
        let mut snap = CachedSnapshot::default();
        absorb(
            &mut snap,
            SnapshotField::Issues,
            r#"{"issue": {"id": 7}, "comments": [{"id": 1}, {"id": 2}]}"#,
        );
        assert_eq!(snap.issues, vec![json!({"id": 7})]);
        assert_eq!(snap.comments.len(), 2);
        assert!(snap.pull_requests.is_empty());
    }

    #[test]
    fn absorb_single_object_into_bucket() {
        let mut snap = CachedSnapshot::default();
        absorb(&mut snap, SnapshotField::Comments, r#"{"id": 9, "body": "x"}"#);
        assert_eq!(snap.comments.len(), 1);
    }

    #[test]
    fn absorb_ignores_non_json() {
        let mut snap = CachedSnapshot::default();
        absorb(&mut snap, SnapshotField::Issues, "plain file content");
        assert!(snap.is_empty());
    }

    #[test]
    fn absorb_pull_request_object() {
        let mut snap = CachedSnapshot::default();
        absorb(
            &mut snap,
            SnapshotField::PullRequests,
            r#"{"pull_request": {"number": 3}}"#,
        );
        assert_eq!(snap.pull_requests, vec![json!({"number": 3})]);
    }
}
