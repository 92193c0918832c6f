pub mod driver;
pub mod stage;

pub use driver::{FailurePolicy, PipelineReport, PipelineState, SequentialDriver, StageReport, StageStatus};
pub use stage::{plan_stages, PipelineStage, StageAction, StageKind};

use crate::config::{Config, ConfigError};
use crate::discover::{crtsh, fanout};
use crate::error::Result;
use crate::external::tools::ToolCommand;
use crate::output::merge;
use crate::workspace::RunContext;

/// Every invocation of a run, rendered up front so configuration errors surface
/// before the first process is spawned.
#[derive(Debug, Clone)]
pub struct Plan {
    pub discovery: Vec<ToolCommand>,
    pub crtsh_url: url::Url,
    pub crtsh_timeout: Option<std::time::Duration>,
    pub stages: Vec<PipelineStage>,
    pub policy: FailurePolicy,
}

impl Plan {
    pub fn build(config: &Config, run: &RunContext) -> std::result::Result<Self, ConfigError> {
        Ok(Self {
            discovery: fanout::plan_discovery(config, run)?,
            crtsh_url: config.crtsh_url(&run.domain)?,
            crtsh_timeout: config.tools.crtsh.timeout(),
            stages: plan_stages(config, run)?,
            policy: FailurePolicy::from_fail_fast(config.pipeline.fail_fast),
        })
    }
}

/// Execute a planned run: discovery fan-out, crt.sh, merge, then the sequential stages.
pub async fn execute(plan: Plan, run: &RunContext) -> Result<PipelineReport> {
    let paths = run.paths();

    println!("[*] Finding subdomains with {} tools...", plan.discovery.len());
    let outcomes = fanout::run_discovery(plan.discovery).await;
    for o in &outcomes {
        let mark = if o.succeeded { "+" } else { "!" };
        let out = o.output.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        println!("[{}] {} -> {}", mark, o.tool, out);
    }

    println!("[*] Scanning crt.sh...");
    let client = crtsh::build_client(plan.crtsh_timeout)?;
    let crt_out = paths.crt();
    crtsh::collect(&client, &plan.crtsh_url, &crt_out).await?;
    println!("[+] crt.sh results written to: {}", crt_out.display());

    println!("[*] Combining subdomains...");
    let subdomains = paths.subdomains();
    let summary = merge::merge_files(&paths.merge_inputs(), &subdomains)?;
    tracing::info!(unique = summary.unique, read = summary.read.len(), skipped = summary.skipped.len(), "subdomains merged");
    println!("[+] Combined {} subdomains written to: {}", summary.unique, subdomains.display());

    let driver = SequentialDriver::new(plan.stages, subdomains, plan.policy);
    driver.run().await
}
