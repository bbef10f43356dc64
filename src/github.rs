use std::time::Duration;

use base64::Engine;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

/// Full catalog of repository actions this client can execute, in the
/// platform's human-readable naming. The tool registry exposes a strict
/// subset of these to the model under stable snake_case identifiers.
pub const CATALOG: &[&str] = &[
    "Get Issues",
    "Get Issue",
    "Comment on Issue",
    "List open pull requests (PRs)",
    "Get Pull Request",
    "Overview of files included in PR",
    "Create Pull Request",
    "Create File",
    "Read File",
    "Update File",
    "Delete File",
    "Overview of existing files in Main branch",
    "Overview of files in current working branch",
    "List branches in this repo",
    "Set active branch",
    "Create a new branch",
    "Get files from a directory",
    "Search issues and pull requests",
    "Search code",
    "Create review request",
    // Internal-only: used for context fetching, never exposed as a tool.
    "Get recent comments",
];

const API_BASE: &str = "https://api.github.com";

/// GitHub REST client scoped to one repository.
///
/// File and branch operations act on a mutable "active branch" that
/// defaults to the configured base branch, mirroring how a reviewer
/// would check out a working branch before touching files.
pub struct GitHubClient {
    http: Client,
    token: String,
    owner: String,
    repo: String,
    base_branch: String,
    active_branch: RwLock<String>,
}

impl Drop for GitHubClient {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

impl GitHubClient {
    pub fn new(token: &str, repository: &str, base_branch: &str) -> anyhow::Result<Self> {
        let (owner, repo) = match repository.split_once('/') {
            Some((o, r)) if !o.is_empty() && !r.is_empty() && !r.contains('/') => (o, r),
            _ => anyhow::bail!("Repository '{}' is not an owner/name slug", repository),
        };

        let http = Client::builder()
            .timeout(Duration::from_secs(20))
            .user_agent(concat!("standupd/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            token: token.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            base_branch: base_branch.to_string(),
            active_branch: RwLock::new(base_branch.to_string()),
        })
    }

    pub fn catalog(&self) -> &'static [&'static str] {
        CATALOG
    }

    pub async fn active_branch(&self) -> String {
        self.active_branch.read().await.clone()
    }

    /// Execute a catalog action by its platform name. Returns the result
    /// serialized as JSON text (or plain text for file reads) so it can be
    /// fed straight back to the model as a tool result.
    pub async fn execute(&self, catalog_name: &str, args: &Value) -> anyhow::Result<String> {
        debug!(action = catalog_name, "Executing GitHub action");
        let result = match catalog_name {
            "Get Issues" => json_text(&self.list_open_issues().await?),
            "Get Issue" => {
                let number = req_u64(args, "issue_number")?;
                json_text(&self.get_issue(number).await?)
            }
            "Comment on Issue" => {
                let number = req_u64(args, "issue_number")?;
                let body = req_str(args, "body")?;
                json_text(&self.comment_on_issue(number, &body).await?)
            }
            "List open pull requests (PRs)" => json_text(&self.list_open_pulls().await?),
            "Get Pull Request" => {
                let number = req_u64(args, "pr_number")?;
                json_text(&self.get_pull(number).await?)
            }
            "Overview of files included in PR" => {
                let number = req_u64(args, "pr_number")?;
                json_text(&self.list_pull_files(number).await?)
            }
            "Create Pull Request" => {
                let title = req_str(args, "title")?;
                let body = opt_str(args, "body").unwrap_or_default();
                json_text(&self.create_pull(&title, &body).await?)
            }
            "Create File" => {
                let path = req_str(args, "path")?;
                let content = req_str(args, "content")?;
                let message = opt_str(args, "message");
                json_text(&self.create_file(&path, &content, message.as_deref()).await?)
            }
            "Read File" => {
                let path = req_str(args, "path")?;
                self.read_file(&path).await?
            }
            "Update File" => {
                let path = req_str(args, "path")?;
                let content = req_str(args, "content")?;
                let message = opt_str(args, "message");
                json_text(&self.update_file(&path, &content, message.as_deref()).await?)
            }
            "Delete File" => {
                let path = req_str(args, "path")?;
                let message = opt_str(args, "message");
                json_text(&self.delete_file(&path, message.as_deref()).await?)
            }
            "Overview of existing files in Main branch" => {
                let branch = self.base_branch.clone();
                json_text(&self.list_files_on_branch(&branch).await?)
            }
            "Overview of files in current working branch" => {
                let branch = self.active_branch().await;
                json_text(&self.list_files_on_branch(&branch).await?)
            }
            "List branches in this repo" => json_text(&self.list_branches().await?),
            "Set active branch" => {
                let branch = req_str(args, "branch")?;
                self.set_active_branch(&branch).await?
            }
            "Create a new branch" => {
                let branch = req_str(args, "branch")?;
                self.create_branch(&branch).await?
            }
            "Get files from a directory" => {
                let path = req_str(args, "path")?;
                json_text(&self.get_files_from_directory(&path).await?)
            }
            "Search issues and pull requests" => {
                let query = req_str(args, "query")?;
                json_text(&self.search_issues(&query).await?)
            }
            "Search code" => {
                let query = req_str(args, "query")?;
                json_text(&self.search_code(&query).await?)
            }
            "Create review request" => {
                let number = req_u64(args, "pr_number")?;
                let reviewers = req_str_list(args, "reviewers")?;
                json_text(&self.create_review_request(number, &reviewers).await?)
            }
            "Get recent comments" => json_text(&self.recent_comments().await?),
            other => anyhow::bail!("Unknown GitHub action: {}", other),
        };
        Ok(result)
    }

    // ---- issues ----------------------------------------------------------

    pub async fn list_open_issues(&self) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/issues", self.owner, self.repo),
                &[("state", "open".into()), ("per_page", "20".into())],
            )
            .await?;
        Ok(Value::Array(project_issues(&raw)))
    }

    pub async fn get_issue(&self, number: u64) -> anyhow::Result<Value> {
        let issue = self
            .api_get(
                &format!("/repos/{}/{}/issues/{}", self.owner, self.repo, number),
                &[],
            )
            .await?;
        let comments = self
            .api_get(
                &format!(
                    "/repos/{}/{}/issues/{}/comments",
                    self.owner, self.repo, number
                ),
                &[("per_page", "20".into())],
            )
            .await?;
        let comments = comments
            .as_array()
            .map(|arr| arr.iter().map(project_comment).collect::<Vec<Value>>())
            .unwrap_or_default();
        Ok(json!({
            "issue": project_issue(&issue),
            "comments": comments,
        }))
    }

    pub async fn comment_on_issue(&self, number: u64, body: &str) -> anyhow::Result<Value> {
        let created = self
            .api_send(
                reqwest::Method::POST,
                &format!(
                    "/repos/{}/{}/issues/{}/comments",
                    self.owner, self.repo, number
                ),
                Some(json!({ "body": body })),
            )
            .await?;
        Ok(project_comment(&created))
    }

    pub async fn recent_comments(&self) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/issues/comments", self.owner, self.repo),
                &[
                    ("sort", "created".into()),
                    ("direction", "desc".into()),
                    ("per_page", "20".into()),
                ],
            )
            .await?;
        let comments = raw
            .as_array()
            .map(|arr| arr.iter().map(project_comment).collect::<Vec<Value>>())
            .unwrap_or_default();
        Ok(Value::Array(comments))
    }

    // ---- pull requests ---------------------------------------------------

    pub async fn list_open_pulls(&self) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/pulls", self.owner, self.repo),
                &[("state", "open".into()), ("per_page", "20".into())],
            )
            .await?;
        let pulls = raw
            .as_array()
            .map(|arr| arr.iter().map(project_pull).collect::<Vec<Value>>())
            .unwrap_or_default();
        Ok(Value::Array(pulls))
    }

    pub async fn get_pull(&self, number: u64) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/pulls/{}", self.owner, self.repo, number),
                &[],
            )
            .await?;
        Ok(json!({ "pull_request": project_pull(&raw) }))
    }

    pub async fn list_pull_files(&self, number: u64) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!(
                    "/repos/{}/{}/pulls/{}/files",
                    self.owner, self.repo, number
                ),
                &[("per_page", "50".into())],
            )
            .await?;
        let files = raw
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|f| {
                        json!({
                            "filename": f["filename"],
                            "status": f["status"],
                            "additions": f["additions"],
                            "deletions": f["deletions"],
                        })
                    })
                    .collect::<Vec<Value>>()
            })
            .unwrap_or_default();
        Ok(Value::Array(files))
    }

    pub async fn create_pull(&self, title: &str, body: &str) -> anyhow::Result<Value> {
        let head = self.active_branch().await;
        if head == self.base_branch {
            anyhow::bail!(
                "Cannot open a pull request from '{}' into itself. \
                 Create and switch to a working branch first.",
                head
            );
        }
        let created = self
            .api_send(
                reqwest::Method::POST,
                &format!("/repos/{}/{}/pulls", self.owner, self.repo),
                Some(json!({
                    "title": title,
                    "body": body,
                    "head": head,
                    "base": self.base_branch,
                })),
            )
            .await?;
        Ok(json!({ "pull_request": project_pull(&created) }))
    }

    pub async fn create_review_request(
        &self,
        number: u64,
        reviewers: &[String],
    ) -> anyhow::Result<Value> {
        let resp = self
            .api_send(
                reqwest::Method::POST,
                &format!(
                    "/repos/{}/{}/pulls/{}/requested_reviewers",
                    self.owner, self.repo, number
                ),
                Some(json!({ "reviewers": reviewers })),
            )
            .await?;
        Ok(json!({ "pull_request": project_pull(&resp) }))
    }

    // ---- files -----------------------------------------------------------

    pub async fn read_file(&self, path: &str) -> anyhow::Result<String> {
        let branch = self.active_branch().await;
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                &[("ref", branch)],
            )
            .await?;
        decode_file_content(&raw)
    }

    pub async fn create_file(
        &self,
        path: &str,
        content: &str,
        message: Option<&str>,
    ) -> anyhow::Result<Value> {
        let branch = self.active_branch().await;
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let resp = self
            .api_send(
                reqwest::Method::PUT,
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                Some(json!({
                    "message": message.unwrap_or("Create file"),
                    "content": encoded,
                    "branch": branch,
                })),
            )
            .await?;
        Ok(json!({
            "path": path,
            "commit": resp["commit"]["sha"],
        }))
    }

    pub async fn update_file(
        &self,
        path: &str,
        content: &str,
        message: Option<&str>,
    ) -> anyhow::Result<Value> {
        let branch = self.active_branch().await;
        let sha = self.file_sha(path, &branch).await?;
        let encoded = base64::engine::general_purpose::STANDARD.encode(content);
        let resp = self
            .api_send(
                reqwest::Method::PUT,
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                Some(json!({
                    "message": message.unwrap_or("Update file"),
                    "content": encoded,
                    "sha": sha,
                    "branch": branch,
                })),
            )
            .await?;
        Ok(json!({
            "path": path,
            "commit": resp["commit"]["sha"],
        }))
    }

    pub async fn delete_file(&self, path: &str, message: Option<&str>) -> anyhow::Result<Value> {
        let branch = self.active_branch().await;
        let sha = self.file_sha(path, &branch).await?;
        let resp = self
            .api_send(
                reqwest::Method::DELETE,
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                Some(json!({
                    "message": message.unwrap_or("Delete file"),
                    "sha": sha,
                    "branch": branch,
                })),
            )
            .await?;
        Ok(json!({
            "path": path,
            "commit": resp["commit"]["sha"],
        }))
    }

    async fn file_sha(&self, path: &str, branch: &str) -> anyhow::Result<String> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                &[("ref", branch.to_string())],
            )
            .await?;
        raw["sha"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("No sha in contents response for '{}'", path))
    }

    pub async fn list_files_on_branch(&self, branch: &str) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/git/trees/{}", self.owner, self.repo, branch),
                &[("recursive", "1".into())],
            )
            .await?;
        let files = raw["tree"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter(|entry| entry["type"].as_str() == Some("blob"))
                    .filter_map(|entry| entry["path"].as_str())
                    .map(|p| Value::String(p.to_string()))
                    .collect::<Vec<Value>>()
            })
            .unwrap_or_default();
        Ok(Value::Array(files))
    }

    pub async fn get_files_from_directory(&self, path: &str) -> anyhow::Result<Value> {
        let branch = self.active_branch().await;
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/contents/{}", self.owner, self.repo, path),
                &[("ref", branch)],
            )
            .await?;
        let entries = raw
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|e| {
                        json!({
                            "name": e["name"],
                            "path": e["path"],
                            "type": e["type"],
                        })
                    })
                    .collect::<Vec<Value>>()
            })
            .unwrap_or_default();
        Ok(Value::Array(entries))
    }

    // ---- branches --------------------------------------------------------

    pub async fn list_branches(&self) -> anyhow::Result<Value> {
        let raw = self
            .api_get(
                &format!("/repos/{}/{}/branches", self.owner, self.repo),
                &[("per_page", "50".into())],
            )
            .await?;
        let names = raw
            .as_array()
            .map(|arr| {
                arr.iter()
                    .filter_map(|b| b["name"].as_str())
                    .map(|n| Value::String(n.to_string()))
                    .collect::<Vec<Value>>()
            })
            .unwrap_or_default();
        Ok(Value::Array(names))
    }

    pub async fn set_active_branch(&self, branch: &str) -> anyhow::Result<String> {
        // Verify it exists before switching.
        self.api_get(
            &format!("/repos/{}/{}/branches/{}", self.owner, self.repo, branch),
            &[],
        )
        .await?;
        *self.active_branch.write().await = branch.to_string();
        info!(branch, "Switched active branch");
        Ok(format!("Active branch is now '{}'", branch))
    }

    pub async fn create_branch(&self, branch: &str) -> anyhow::Result<String> {
        let base_ref = self
            .api_get(
                &format!(
                    "/repos/{}/{}/git/ref/heads/{}",
                    self.owner, self.repo, self.base_branch
                ),
                &[],
            )
            .await?;
        let sha = base_ref["object"]["sha"]
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("No sha for base branch '{}'", self.base_branch))?;

        self.api_send(
            reqwest::Method::POST,
            &format!("/repos/{}/{}/git/refs", self.owner, self.repo),
            Some(json!({
                "ref": format!("refs/heads/{}", branch),
                "sha": sha,
            })),
        )
        .await?;

        *self.active_branch.write().await = branch.to_string();
        info!(branch, "Created branch and switched to it");
        Ok(format!(
            "Created branch '{}' from '{}' and made it active",
            branch, self.base_branch
        ))
    }

    // ---- search ----------------------------------------------------------

    pub async fn search_issues(&self, query: &str) -> anyhow::Result<Value> {
        let scoped = format!("{} repo:{}/{}", query, self.owner, self.repo);
        let raw = self
            .api_get(
                "/search/issues",
                &[("q", scoped), ("per_page", "20".into())],
            )
            .await?;
        Ok(Value::Array(project_issues(&raw["items"])))
    }

    pub async fn search_code(&self, query: &str) -> anyhow::Result<Value> {
        let scoped = format!("{} repo:{}/{}", query, self.owner, self.repo);
        let raw = self
            .api_get("/search/code", &[("q", scoped), ("per_page", "20".into())])
            .await?;
        let hits = raw["items"]
            .as_array()
            .map(|arr| {
                arr.iter()
                    .map(|h| {
                        json!({
                            "path": h["path"],
                            "html_url": h["html_url"],
                        })
                    })
                    .collect::<Vec<Value>>()
            })
            .unwrap_or_default();
        Ok(Value::Array(hits))
    }

    // ---- transport -------------------------------------------------------

    async fn api_get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let url = format!("{}{}", API_BASE, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json")
            .query(query)
            .send()
            .await?;
        self.read_response(resp, path).await
    }

    async fn api_send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<Value>,
    ) -> anyhow::Result<Value> {
        let url = format!("{}{}", API_BASE, path);
        let mut req = self
            .http
            .request(method, &url)
            .bearer_auth(&self.token)
            .header("Accept", "application/vnd.github+json");
        if let Some(body) = &body {
            req = req.json(body);
        }
        let resp = req.send().await?;
        self.read_response(resp, path).await
    }

    async fn read_response(
        &self,
        resp: reqwest::Response,
        path: &str,
    ) -> anyhow::Result<Value> {
        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            warn!(status = %status, path, "GitHub API error");
            let hint = match status.as_u16() {
                401 => "The GitHub token is invalid or expired. Check github.token in config.toml.",
                403 => "Access denied — the token may lack the required scope, or the rate limit is exhausted.",
                404 => "Not found. Check the repository slug and that the token can see it.",
                422 => "GitHub rejected the request as invalid (e.g. branch already exists or reviewer not a collaborator).",
                _ => "An unexpected GitHub API error occurred.",
            };
            let detail = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v["message"].as_str().map(|s| s.to_string()))
                .unwrap_or_else(|| truncate(&text, 200));
            anyhow::bail!("GitHub API {} failed ({}): {}. {}", path, status, detail, hint);
        }

        if text.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

// ---- helpers -------------------------------------------------------------

/// Project a raw issues listing to the fields worth caching and prompting
/// with, dropping pull requests (the issues endpoint mixes them in).
fn project_issues(raw: &Value) -> Vec<Value> {
    raw.as_array()
        .map(|arr| {
            arr.iter()
                .filter(|item| item.get("pull_request").is_none())
                .map(project_issue)
                .collect()
        })
        .unwrap_or_default()
}

fn project_issue(issue: &Value) -> Value {
    json!({
        "id": issue["id"],
        "number": issue["number"],
        "title": issue["title"],
        "state": issue["state"],
        "html_url": issue["html_url"],
        "body": issue["body"].as_str().map(|b| truncate(b, 500)),
    })
}

fn project_pull(pull: &Value) -> Value {
    json!({
        "id": pull["id"],
        "number": pull["number"],
        "title": pull["title"],
        "state": pull["state"],
        "html_url": pull["html_url"],
        "head": pull["head"]["ref"],
        "base": pull["base"]["ref"],
    })
}

fn project_comment(comment: &Value) -> Value {
    json!({
        "id": comment["id"],
        "user": comment["user"]["login"],
        "body": comment["body"].as_str().map(|b| truncate(b, 500)),
        "html_url": comment["html_url"],
    })
}

/// Decode a contents-API payload (base64 with embedded newlines).
fn decode_file_content(raw: &Value) -> anyhow::Result<String> {
    let encoding = raw["encoding"].as_str().unwrap_or("base64");
    let content = raw["content"]
        .as_str()
        .ok_or_else(|| anyhow::anyhow!("No content in contents response"))?;
    if encoding != "base64" {
        return Ok(content.to_string());
    }
    let cleaned: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(cleaned)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}

fn json_text(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
}

fn req_str(args: &Value, key: &str) -> anyhow::Result<String> {
    args[key]
        .as_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required string argument '{}'", key))
}

fn opt_str(args: &Value, key: &str) -> Option<String> {
    args[key].as_str().map(|s| s.to_string())
}

fn req_u64(args: &Value, key: &str) -> anyhow::Result<u64> {
    args[key]
        .as_u64()
        .or_else(|| args[key].as_str().and_then(|s| s.parse().ok()))
        .ok_or_else(|| anyhow::anyhow!("Missing required integer argument '{}'", key))
}

fn req_str_list(args: &Value, key: &str) -> anyhow::Result<Vec<String>> {
    args[key]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .ok_or_else(|| anyhow::anyhow!("Missing required list argument '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GitHubClient {
        GitHubClient::new("ghp_test", "acme/widgets", "main").unwrap()
    }

    #[test]
    fn slug_parsing() {
        assert!(GitHubClient::new("t", "acme/widgets", "main").is_ok());
        assert!(GitHubClient::new("t", "widgets", "main").is_err());
        assert!(GitHubClient::new("t", "acme/", "main").is_err());
        assert!(GitHubClient::new("t", "a/b/c", "main").is_err());
    }

    #[tokio::test]
    async fn active_branch_defaults_to_base() {
        let c = client();
        assert_eq!(c.active_branch().await, "main");
    }

    #[tokio::test]
    async fn unknown_action_rejected() {
        let c = client();
        let err = c
            .execute("Delete Repository", &serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Unknown GitHub action"));
    }

    #[tokio::test]
    async fn missing_argument_rejected() {
        let c = client();
        let err = c.execute("Get Issue", &serde_json::json!({})).await.unwrap_err();
        assert!(err.to_string().contains("issue_number"));
    }

    #[test]
    fn issues_projection_drops_pull_requests() {
        let raw = serde_json::json!([
            {"id": 1, "number": 10, "title": "bug", "state": "open", "html_url": "u", "body": "b"},
            {"id": 2, "number": 11, "title": "pr", "state": "open", "html_url": "u",
             "pull_request": {"url": "x"}},
        ]);
        let projected = project_issues(&raw);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0]["number"], 10);
    }

    #[test]
    fn issue_body_truncated() {
        let raw = serde_json::json!({
            "id": 1, "number": 1, "title": "t", "state": "open", "html_url": "u",
            "body": "x".repeat(2000),
        });
        let projected = project_issue(&raw);
        let body = projected["body"].as_str().unwrap();
        assert!(body.len() < 600);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn file_content_decoding() {
        let raw = serde_json::json!({
            "encoding": "base64",
            "content": "aGVsbG8g\nd29ybGQ=\n",
        });
        assert_eq!(decode_file_content(&raw).unwrap(), "hello world");
    }

    #[test]
    fn file_content_missing_rejected() {
        let raw = serde_json::json!({"encoding": "base64"});
        assert!(decode_file_content(&raw).is_err());
    }

    #[test]
    fn argument_helpers() {
        let args = serde_json::json!({"n": 7, "s": "text", "m": "42", "list": ["a", "b"]});
        assert_eq!(req_u64(&args, "n").unwrap(), 7);
        assert_eq!(req_u64(&args, "m").unwrap(), 42);
        assert_eq!(req_str(&args, "s").unwrap(), "text");
        assert_eq!(req_str_list(&args, "list").unwrap(), vec!["a", "b"]);
        assert!(req_u64(&args, "missing").is_err());
        assert!(req_str(&args, "missing").is_err());
    }

    #[test]
    fn catalog_has_no_duplicates() {
        let mut seen = std::collections::HashSet::new();
        for name in CATALOG {
            assert!(seen.insert(name), "duplicate catalog entry: {}", name);
        }
    }
}
