use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use crate::github::GitHubClient;
use crate::tools::GitHubTool;
use crate::traits::Tool;

/// Which cached-snapshot bucket a tool's output feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotField {
    Issues,
    PullRequests,
    Comments,
}

/// One row of the static tool table: a platform catalog action, the stable
/// snake_case identifier it is exposed under, and its invocation contract.
///
/// The exposed names are API surface — they must stay stable across
/// releases so cached data extraction keeps working.
pub struct ToolDescriptor {
    pub catalog_name: &'static str,
    pub exposed_name: &'static str,
    pub description: &'static str,
    pub snapshot_field: Option<SnapshotField>,
}

impl ToolDescriptor {
    /// JSON-schema parameter block for the OpenAI function format.
    pub fn parameters(&self) -> Value {
        match self.exposed_name {
            "get_issue" => params(
                json!({
                    "issue_number": { "type": "integer", "description": "Issue number" }
                }),
                &["issue_number"],
            ),
            "comment_on_issue" => params(
                json!({
                    "issue_number": { "type": "integer", "description": "Issue number" },
                    "body": { "type": "string", "description": "Comment text" }
                }),
                &["issue_number", "body"],
            ),
            "get_pull_request" | "list_pull_request_files" => params(
                json!({
                    "pr_number": { "type": "integer", "description": "Pull request number" }
                }),
                &["pr_number"],
            ),
            "create_pull_request" => params(
                json!({
                    "title": { "type": "string", "description": "Pull request title" },
                    "body": { "type": "string", "description": "Pull request description" }
                }),
                &["title"],
            ),
            "create_file" | "update_file" => params(
                json!({
                    "path": { "type": "string", "description": "File path in the repository" },
                    "content": { "type": "string", "description": "Full file content" },
                    "message": { "type": "string", "description": "Commit message" }
                }),
                &["path", "content"],
            ),
            "read_file" => params(
                json!({
                    "path": { "type": "string", "description": "File path in the repository" }
                }),
                &["path"],
            ),
            "delete_file" => params(
                json!({
                    "path": { "type": "string", "description": "File path in the repository" },
                    "message": { "type": "string", "description": "Commit message" }
                }),
                &["path"],
            ),
            "set_active_branch" | "create_branch" => params(
                json!({
                    "branch": { "type": "string", "description": "Branch name" }
                }),
                &["branch"],
            ),
            "get_files_from_directory" => params(
                json!({
                    "path": { "type": "string", "description": "Directory path in the repository" }
                }),
                &["path"],
            ),
            "search_issues_and_prs" | "search_code" => params(
                json!({
                    "query": { "type": "string", "description": "Search query" }
                }),
                &["query"],
            ),
            "create_review_request" => params(
                json!({
                    "pr_number": { "type": "integer", "description": "Pull request number" },
                    "reviewers": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "GitHub logins to request a review from"
                    }
                }),
                &["pr_number", "reviewers"],
            ),
            // No-argument listings.
            _ => params(json!({}), &[]),
        }
    }
}

fn params(properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
        "additionalProperties": false,
    })
}

/// The fixed allow-list. Anything the platform offers beyond these rows is
/// never exposed to the model.
pub const DESCRIPTORS: &[ToolDescriptor] = &[
    ToolDescriptor {
        catalog_name: "Get Issues",
        exposed_name: "get_issues",
        description: "List open issues in the repository.",
        snapshot_field: Some(SnapshotField::Issues),
    },
    ToolDescriptor {
        catalog_name: "Get Issue",
        exposed_name: "get_issue",
        description: "Fetch one issue by number, including its comments.",
        snapshot_field: Some(SnapshotField::Issues),
    },
    ToolDescriptor {
        catalog_name: "Comment on Issue",
        exposed_name: "comment_on_issue",
        description: "Post a comment on an issue.",
        snapshot_field: Some(SnapshotField::Comments),
    },
    ToolDescriptor {
        catalog_name: "List open pull requests (PRs)",
        exposed_name: "list_open_pull_requests",
        description: "List open pull requests in the repository.",
        snapshot_field: Some(SnapshotField::PullRequests),
    },
    ToolDescriptor {
        catalog_name: "Get Pull Request",
        exposed_name: "get_pull_request",
        description: "Fetch one pull request by number.",
        snapshot_field: Some(SnapshotField::PullRequests),
    },
    ToolDescriptor {
        catalog_name: "Overview of files included in PR",
        exposed_name: "list_pull_request_files",
        description: "List the files changed by a pull request.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Create Pull Request",
        exposed_name: "create_pull_request",
        description: "Open a pull request from the active branch into the base branch.",
        snapshot_field: Some(SnapshotField::PullRequests),
    },
    ToolDescriptor {
        catalog_name: "Create File",
        exposed_name: "create_file",
        description: "Create a new file on the active branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Read File",
        exposed_name: "read_file",
        description: "Read a file from the active branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Update File",
        exposed_name: "update_file",
        description: "Replace the content of an existing file on the active branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Delete File",
        exposed_name: "delete_file",
        description: "Delete a file from the active branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Overview of existing files in Main branch",
        exposed_name: "list_files_in_main_branch",
        description: "List all file paths on the base branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Overview of files in current working branch",
        exposed_name: "list_files_in_bot_branch",
        description: "List all file paths on the active working branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "List branches in this repo",
        exposed_name: "list_branches_in_repo",
        description: "List branch names in the repository.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Set active branch",
        exposed_name: "set_active_branch",
        description: "Switch the active branch used by file operations.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Create a new branch",
        exposed_name: "create_branch",
        description: "Create a branch from the base branch and make it active.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Get files from a directory",
        exposed_name: "get_files_from_directory",
        description: "List the entries of a directory on the active branch.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Search issues and pull requests",
        exposed_name: "search_issues_and_prs",
        description: "Search issues and pull requests in the repository.",
        snapshot_field: Some(SnapshotField::Issues),
    },
    ToolDescriptor {
        catalog_name: "Search code",
        exposed_name: "search_code",
        description: "Search code in the repository.",
        snapshot_field: None,
    },
    ToolDescriptor {
        catalog_name: "Create review request",
        exposed_name: "create_review_request",
        description: "Request reviewers on a pull request.",
        snapshot_field: None,
    },
];

pub struct ToolRegistry;

impl ToolRegistry {
    /// Bind the descriptor table to a client, checking it against the live
    /// catalog first. Every allow-listed action must exist in the catalog
    /// (fail loud at startup); catalog entries outside the allow-list are
    /// never exposed.
    pub fn build(
        client: Arc<GitHubClient>,
        catalog: &[&str],
    ) -> anyhow::Result<Vec<Arc<dyn Tool>>> {
        let catalog_set: HashSet<&str> = catalog.iter().copied().collect();

        let missing: Vec<&str> = DESCRIPTORS
            .iter()
            .map(|d| d.catalog_name)
            .filter(|name| !catalog_set.contains(name))
            .collect();
        if !missing.is_empty() {
            anyhow::bail!(
                "GitHub action catalog is missing expected entries: {}. \
                 The tool table and the client are out of sync.",
                missing.join(", ")
            );
        }

        let allowed: HashSet<&str> = DESCRIPTORS.iter().map(|d| d.catalog_name).collect();
        for extra in catalog.iter().filter(|name| !allowed.contains(*name)) {
            debug!(action = extra, "Catalog action not on the allow-list, not exposing");
        }

        let tools: Vec<Arc<dyn Tool>> = DESCRIPTORS
            .iter()
            .map(|d| Arc::new(GitHubTool::new(d, Arc::clone(&client))) as Arc<dyn Tool>)
            .collect();
        info!(count = tools.len(), "Tool registry built");
        Ok(tools)
    }

    /// Exposed-name → snapshot bucket, for extraction after tool calls.
    pub fn snapshot_fields() -> HashMap<String, SnapshotField> {
        DESCRIPTORS
            .iter()
            .filter_map(|d| {
                d.snapshot_field
                    .map(|field| (d.exposed_name.to_string(), field))
            })
            .collect()
    }
}
