use std::fmt;
use std::path::PathBuf;

use crate::config::{Config, ConfigError, Tool};
use crate::error::Result;
use crate::external::runner;
use crate::external::template::TemplateKey;
use crate::external::tools::ToolCommand;
use crate::probe::normalize;
use crate::workspace::RunContext;

/// The sequential stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageKind {
    ResolveIps,
    ProbeLiveness,
    NormalizeProbe,
    ScanPorts,
    ScanVulnerabilities,
}

impl StageKind {
    pub const ORDER: [StageKind; 5] = [
        StageKind::ResolveIps,
        StageKind::ProbeLiveness,
        StageKind::NormalizeProbe,
        StageKind::ScanPorts,
        StageKind::ScanVulnerabilities,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StageKind::ResolveIps => "resolve-ips",
            StageKind::ProbeLiveness => "probe-liveness",
            StageKind::NormalizeProbe => "normalize-probe",
            StageKind::ScanPorts => "scan-ports",
            StageKind::ScanVulnerabilities => "scan-vulnerabilities",
        }
    }

    /// Operator-facing progress text.
    pub fn describe(self) -> &'static str {
        match self {
            StageKind::ResolveIps => "Now finding IPs for subdomains",
            StageKind::ProbeLiveness => "Scanning subdomains with httpx",
            StageKind::NormalizeProbe => "Sorting httpx results",
            StageKind::ScanPorts => "Scanning subdomains with naabu",
            StageKind::ScanVulnerabilities => "Scanning subdomains with nuclei",
        }
    }

    /// External tool backing this stage; `None` for in-process steps.
    pub fn tool(self) -> Option<Tool> {
        match self {
            StageKind::ResolveIps => Some(Tool::Massdns),
            StageKind::ProbeLiveness => Some(Tool::Httpx),
            StageKind::NormalizeProbe => None,
            StageKind::ScanPorts => Some(Tool::Naabu),
            StageKind::ScanVulnerabilities => Some(Tool::Nuclei),
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageAction {
    External(ToolCommand),
    NormalizeProbe,
}

/// One unit of the sequential pipeline: reads `input`, writes `output`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    pub kind: StageKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub action: StageAction,
}

impl PipelineStage {
    pub fn external(kind: StageKind, cmd: ToolCommand, input: PathBuf, output: PathBuf) -> Self {
        Self { kind, input, output, action: StageAction::External(cmd) }
    }

    /// Process errors come back as `ProcessLaunch`/`ProcessExit`, normalizer failures as `Io`.
    pub async fn execute(&self) -> Result<()> {
        match &self.action {
            StageAction::External(cmd) => runner::run_tool(cmd).await,
            StageAction::NormalizeProbe => {
                let n = normalize::normalize_file(&self.input, &self.output)?;
                tracing::info!(hosts = n, "probe results normalized");
                Ok(())
            }
        }
    }
}

/// Render every sequential stage for `run`.
pub fn plan_stages(config: &Config, run: &RunContext) -> std::result::Result<Vec<PipelineStage>, ConfigError> {
    let paths = run.paths();
    let subdomains = paths.subdomains();
    let httpx_out = paths.tool_output(Tool::Httpx);
    let sorted = paths.sorted_httpx();

    let mut stages = Vec::with_capacity(StageKind::ORDER.len());
    for kind in StageKind::ORDER {
        let (input, output) = match kind {
            StageKind::ResolveIps => (subdomains.clone(), paths.ips()),
            StageKind::ProbeLiveness => (subdomains.clone(), httpx_out.clone()),
            StageKind::NormalizeProbe => (httpx_out.clone(), sorted.clone()),
            StageKind::ScanPorts => (sorted.clone(), paths.tool_output(Tool::Naabu)),
            StageKind::ScanVulnerabilities => (sorted.clone(), paths.tool_output(Tool::Nuclei)),
        };
        let stage = match kind.tool() {
            Some(tool) => {
                let ctx = run
                    .invocation_context()
                    .with(TemplateKey::InputFile, input.display().to_string())
                    .with(TemplateKey::OutputFile, output.display().to_string());
                let cmd = ToolCommand::build(tool, config.tool(tool), &ctx, &run.tools_dir, Some(output.clone()))?;
                PipelineStage::external(kind, cmd, input, output)
            }
            None => PipelineStage { kind, input, output, action: StageAction::NormalizeProbe },
        };
        stages.push(stage);
    }
    Ok(stages)
}
