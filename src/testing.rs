//! Test infrastructure: MockProvider, mock directory/context sources, and
//! an orchestrator harness wired against a temp-dir snapshot store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::SnapshotStore;
use crate::providers::ProviderError;
use crate::standup::StandupOrchestrator;
use crate::tools::{SnapshotField, ToolRegistry};
use crate::traits::{
    ContextSource, ModelProvider, ProviderResponse, TokenUsage, Tool, ToolCall, UserDirectory,
};
use crate::types::{ExternalContext, StandupRequest};

// ---------------------------------------------------------------------------
// MockProvider
// ---------------------------------------------------------------------------

/// A recorded call to `MockProvider::chat()`.
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct MockChatCall {
    pub model: String,
    pub messages: Vec<Value>,
    pub tools: Vec<Value>,
}

/// How a failing MockProvider fails.
enum MockFailure {
    /// A bare anyhow error, as from a JSON parse failure.
    Generic,
    /// A classified `ProviderError` built from an HTTP status and body.
    Provider(u16, String),
}

/// Mock LLM provider that returns scripted responses.
pub struct MockProvider {
    responses: Mutex<Vec<ProviderResponse>>,
    failure: Option<MockFailure>,
    pub call_log: Mutex<Vec<MockChatCall>>,
}

impl MockProvider {
    /// Create a provider that always returns "Mock response".
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: None,
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider with a FIFO queue of scripted responses.
    pub fn with_responses(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses),
            failure: None,
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose every `chat()` call fails.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: Some(MockFailure::Generic),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Create a provider whose every `chat()` call fails with a classified
    /// `ProviderError` for the given HTTP status and response body.
    pub fn failing_with_status(status: u16, body: &str) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            failure: Some(MockFailure::Provider(status, body.to_string())),
            call_log: Mutex::new(Vec::new()),
        }
    }

    /// Helper: build a text-only ProviderResponse.
    pub fn text_response(text: &str) -> ProviderResponse {
        ProviderResponse {
            content: Some(text.to_string()),
            tool_calls: vec![],
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                model: "mock".to_string(),
            }),
        }
    }

    /// Helper: build a tool-call ProviderResponse.
    pub fn tool_call_response(tool_name: &str, args: &str) -> ProviderResponse {
        static NEXT_ID: AtomicUsize = AtomicUsize::new(0);
        ProviderResponse {
            content: None,
            tool_calls: vec![ToolCall {
                id: format!("call_{}", NEXT_ID.fetch_add(1, Ordering::Relaxed)),
                name: tool_name.to_string(),
                arguments: args.to_string(),
            }],
            usage: Some(TokenUsage {
                input_tokens: 10,
                output_tokens: 5,
                model: "mock".to_string(),
            }),
        }
    }

    /// How many times `chat()` was called.
    pub async fn call_count(&self) -> usize {
        self.call_log.lock().await.len()
    }

    /// The system message of the recorded call at `index`.
    pub async fn system_text(&self, index: usize) -> String {
        let calls = self.call_log.lock().await;
        message_text(&calls[index].messages, "system")
    }

    /// The user message of the recorded call at `index`.
    pub async fn user_text(&self, index: usize) -> String {
        let calls = self.call_log.lock().await;
        message_text(&calls[index].messages, "user")
    }
}

fn message_text(messages: &[Value], role: &str) -> String {
    messages
        .iter()
        .find(|m| m["role"].as_str() == Some(role))
        .and_then(|m| m["content"].as_str())
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ModelProvider for MockProvider {
    async fn chat(
        &self,
        model: &str,
        messages: &[Value],
        tools: &[Value],
    ) -> anyhow::Result<ProviderResponse> {
        self.call_log.lock().await.push(MockChatCall {
            model: model.to_string(),
            messages: messages.to_vec(),
            tools: tools.to_vec(),
        });

        match &self.failure {
            Some(MockFailure::Generic) => anyhow::bail!("mock provider failure"),
            Some(MockFailure::Provider(status, body)) => {
                return Err(ProviderError::from_status(*status, body).into());
            }
            None => {}
        }

        let mut responses = self.responses.lock().await;
        if responses.is_empty() {
            Ok(MockProvider::text_response("Mock response"))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn list_models(&self) -> anyhow::Result<Vec<String>> {
        Ok(vec!["mock-model".to_string()])
    }
}

// ---------------------------------------------------------------------------
// MockTool
// ---------------------------------------------------------------------------

/// A tool with a fixed name and a scripted result, recording its calls.
pub struct MockTool {
    name: String,
    result: anyhow::Result<String>,
    pub calls: Mutex<Vec<String>>,
}

impl MockTool {
    pub fn returning(name: &str, result: &str) -> Self {
        Self {
            name: name.to_string(),
            result: Ok(result.to_string()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &str, error: &str) -> Self {
        Self {
            name: name.to_string(),
            result: Err(anyhow::anyhow!("{}", error.to_string())),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Tool for MockTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "mock tool"
    }

    fn schema(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "description": "mock tool",
            "parameters": { "type": "object", "properties": {}, "required": [] },
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        self.calls.lock().await.push(arguments.to_string());
        match &self.result {
            Ok(text) => Ok(text.clone()),
            Err(e) => Err(anyhow::anyhow!("{}", e)),
        }
    }
}

// ---------------------------------------------------------------------------
// MockDirectory
// ---------------------------------------------------------------------------

/// User directory that returns a fixed name, or fails every lookup.
pub struct MockDirectory {
    name: Option<String>,
}

impl MockDirectory {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_string()),
        }
    }

    pub fn failing() -> Self {
        Self { name: None }
    }
}

#[async_trait]
impl UserDirectory for MockDirectory {
    async fn display_name(&self, _user_id: &str) -> anyhow::Result<String> {
        match &self.name {
            Some(name) => Ok(name.clone()),
            None => anyhow::bail!("mock directory failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// MockContextSource
// ---------------------------------------------------------------------------

/// Context source that returns a fixed context, or fails every fetch.
pub struct MockContextSource {
    context: Option<ExternalContext>,
}

impl MockContextSource {
    pub fn with_history(lines: &[&str]) -> Self {
        Self {
            context: Some(ExternalContext {
                history: lines.iter().map(|s| s.to_string()).collect(),
                ..Default::default()
            }),
        }
    }

    pub fn failing() -> Self {
        Self { context: None }
    }
}

#[async_trait]
impl ContextSource for MockContextSource {
    fn name(&self) -> &str {
        "mock_source"
    }

    async fn fetch(&self, _request: &StandupRequest) -> anyhow::Result<ExternalContext> {
        match &self.context {
            Some(context) => Ok(context.clone()),
            None => anyhow::bail!("mock context source failure"),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A fully wired orchestrator over a temp-dir store, with handles kept for
/// assertions. Dropping the harness removes the cache directory.
pub struct TestHarness {
    pub orchestrator: StandupOrchestrator,
    pub provider: Arc<MockProvider>,
    pub store: SnapshotStore,
    cache_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn cache_dir(&self) -> &std::path::Path {
        self.cache_dir.path()
    }
}

pub struct HarnessBuilder {
    provider: Arc<MockProvider>,
    tools: Vec<Arc<dyn Tool>>,
    snapshot_fields: HashMap<String, SnapshotField>,
    directory: Arc<dyn UserDirectory>,
    sources: Vec<Arc<dyn ContextSource>>,
}

impl HarnessBuilder {
    pub fn provider(mut self, provider: MockProvider) -> Self {
        self.provider = Arc::new(provider);
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn directory(mut self, directory: impl UserDirectory + 'static) -> Self {
        self.directory = Arc::new(directory);
        self
    }

    pub fn source(mut self, source: impl ContextSource + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    pub fn build(self) -> TestHarness {
        let cache_dir = tempfile::TempDir::new().expect("temp cache dir");
        let store = SnapshotStore::new(cache_dir.path());
        let orchestrator = StandupOrchestrator::new(
            Arc::clone(&self.provider) as Arc<dyn ModelProvider>,
            "mock-model".to_string(),
            self.tools,
            self.snapshot_fields,
            self.directory,
            self.sources,
            SnapshotStore::new(cache_dir.path()),
            8,
        );
        TestHarness {
            orchestrator,
            provider: self.provider,
            store,
            cache_dir,
        }
    }
}

pub fn harness() -> HarnessBuilder {
    HarnessBuilder {
        provider: Arc::new(MockProvider::new()),
        tools: Vec::new(),
        snapshot_fields: ToolRegistry::snapshot_fields(),
        directory: Arc::new(MockDirectory::named("Ada")),
        sources: Vec::new(),
    }
}

/// A StandupRequest with the boilerplate filled in.
pub fn request(user: &str, text: &str) -> StandupRequest {
    StandupRequest {
        user: user.to_string(),
        text: text.to_string(),
        channel: "C01TEST".to_string(),
        ts: "1700000000.000100".to_string(),
    }
}
