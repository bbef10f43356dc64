//! Startup wiring: build the provider, GitHub client, tool registry,
//! context sources, and orchestrator from the validated config, then run
//! the Slack channel until the process is stopped.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cache::SnapshotStore;
use crate::channels::{SlackChannel, SlackUserDirectory};
use crate::config::AppConfig;
use crate::context::{ChannelHistorySource, RepoActivitySource};
use crate::github::GitHubClient;
use crate::providers::OpenAiCompatibleProvider;
use crate::standup::StandupOrchestrator;
use crate::tools::ToolRegistry;
use crate::traits::{ContextSource, ModelProvider, Tool};

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let provider: Arc<dyn ModelProvider> = Arc::new(
        OpenAiCompatibleProvider::new(&config.provider.base_url, &config.provider.api_key)
            .map_err(|e| anyhow::anyhow!(e))?,
    );

    // Sanity-check the configured model against the provider's catalog.
    // Not every OpenAI-compatible server implements the models endpoint,
    // so a failed listing is logged and skipped, not fatal.
    match provider.list_models().await {
        Ok(models) if !models.is_empty() => {
            if !models.iter().any(|m| m == &config.provider.model) {
                warn!(
                    model = %config.provider.model,
                    "Configured model is not in the provider's model list"
                );
            }
        }
        Ok(_) => {}
        Err(e) => debug!(error = %e, "Could not list provider models, skipping model check"),
    }

    // GitHub is optional: without a configured repository the bot collects
    // standups conversationally, with no tools and no repo context.
    let mut tools: Vec<Arc<dyn Tool>> = Vec::new();
    let mut sources: Vec<Arc<dyn ContextSource>> = Vec::new();
    if config.github.repository.is_empty() {
        info!("No github.repository configured, running without GitHub enrichment");
    } else {
        let client = Arc::new(GitHubClient::new(
            &config.github.token,
            &config.github.repository,
            &config.github.base_branch,
        )?);
        // Fatal on a catalog/allow-list mismatch.
        tools = ToolRegistry::build(Arc::clone(&client), client.catalog())?;
        if config.standup.include_repo_activity {
            sources.push(Arc::new(RepoActivitySource::new(client)));
        }
        info!(
            repository = %config.github.repository,
            tools = tools.len(),
            "GitHub enrichment enabled"
        );
    }

    if config.standup.include_channel_history {
        sources.push(Arc::new(ChannelHistorySource::new(
            &config.slack.bot_token,
            config.standup.history_limit,
        )));
    }

    let store = SnapshotStore::new(&config.cache.dir);
    let orchestrator = Arc::new(StandupOrchestrator::new(
        provider,
        config.provider.model.clone(),
        tools,
        ToolRegistry::snapshot_fields(),
        Arc::new(SlackUserDirectory::new(&config.slack.bot_token)),
        sources,
        store,
        config.standup.max_tool_iterations,
    ));

    if config.slack.allowed_user_ids.is_empty() {
        warn!("slack.allowed_user_ids is empty, any workspace member can start a standup");
    }

    let channel = Arc::new(SlackChannel::new(
        &config.slack.app_token,
        &config.slack.bot_token,
        config.slack.allowed_user_ids.clone(),
        config.slack.use_threads,
        orchestrator,
    ));

    info!(model = %config.provider.model, "standupd starting");
    channel.start_with_retry().await;
    Ok(())
}
