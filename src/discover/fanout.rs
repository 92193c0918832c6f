use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::{Config, ConfigError, Tool};
use crate::external::runner;
use crate::external::template::TemplateKey;
use crate::external::tools::ToolCommand;
use crate::workspace::RunContext;

/// Upper bound on concurrently running discovery processes.
pub const MAX_DISCOVERY_WORKERS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    pub tool: Tool,
    pub output: Option<PathBuf>,
    pub succeeded: bool,
}

/// Render one command per discovery tool, each writing `<tool>_<domain>.txt`.
pub fn plan_discovery(config: &Config, run: &RunContext) -> Result<Vec<ToolCommand>, ConfigError> {
    let paths = run.paths();
    Tool::DISCOVERY
        .iter()
        .map(|&tool| {
            let output = paths.tool_output(tool);
            let ctx = run
                .invocation_context()
                .with(TemplateKey::OutputFile, output.display().to_string());
            ToolCommand::build(tool, config.tool(tool), &ctx, &run.tools_dir, Some(output))
        })
        .collect()
}

/// Run every command concurrently and return once all of them have exited.
///
/// Individual failures are logged and reported in the outcome, never propagated.
/// Outcomes are ordered by tool, not by completion.
pub async fn run_discovery(commands: Vec<ToolCommand>) -> Vec<DiscoveryOutcome> {
    let permits = Arc::new(Semaphore::new(MAX_DISCOVERY_WORKERS));
    let mut tasks = JoinSet::new();

    for cmd in commands {
        let permits = permits.clone();
        tasks.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let succeeded = runner::run_tool_logged(&cmd).await;
            DiscoveryOutcome { tool: cmd.tool, output: cmd.output, succeeded }
        });
    }

    let mut outcomes = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => tracing::error!(error=%e, "discovery task did not complete"),
        }
    }
    outcomes.sort_by_key(|o| o.tool);
    outcomes
}
