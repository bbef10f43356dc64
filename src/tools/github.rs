use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::github::GitHubClient;
use crate::tools::registry::ToolDescriptor;
use crate::traits::Tool;

/// One exposed GitHub action: a descriptor row bound to the shared client.
pub struct GitHubTool {
    descriptor: &'static ToolDescriptor,
    client: Arc<GitHubClient>,
}

impl GitHubTool {
    pub fn new(descriptor: &'static ToolDescriptor, client: Arc<GitHubClient>) -> Self {
        Self { descriptor, client }
    }
}

#[async_trait]
impl Tool for GitHubTool {
    fn name(&self) -> &str {
        self.descriptor.exposed_name
    }

    fn description(&self) -> &str {
        self.descriptor.description
    }

    fn schema(&self) -> Value {
        json!({
            "name": self.descriptor.exposed_name,
            "description": self.descriptor.description,
            "parameters": self.descriptor.parameters(),
        })
    }

    async fn call(&self, arguments: &str) -> anyhow::Result<String> {
        let args: Value = serde_json::from_str(arguments).unwrap_or(json!({}));
        self.client.execute(self.descriptor.catalog_name, &args).await
    }
}
