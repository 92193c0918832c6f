use std::path::PathBuf;

use crate::error::Result;
use crate::output::atomic;
use crate::pipeline::stage::{PipelineStage, StageAction, StageKind};

/// How the sequential stages react to a failed tool or an empty dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Log and keep going with whatever output exists.
    #[default]
    Tolerant,
    /// Stop at the first failure.
    FailFast,
}

impl FailurePolicy {
    pub fn from_fail_fast(fail_fast: bool) -> Self {
        if fail_fast {
            FailurePolicy::FailFast
        } else {
            FailurePolicy::Tolerant
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    /// Ran despite an empty or missing dependency.
    CompletedWithoutInput,
    ToolFailed(String),
    NotRun,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub kind: StageKind,
    pub output: PathBuf,
    pub status: StageStatus,
    pub lines: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineState {
    Success,
    FailedFast { stage: StageKind, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    pub fn print_summary(&self) {
        println!("\n{}", "-".repeat(60));
        match &self.state {
            PipelineState::Success => println!("[+] Pipeline finished"),
            PipelineState::FailedFast { stage, reason } => {
                println!("[!] Pipeline stopped at {}: {}", stage, reason)
            }
        }
        for s in &self.stages {
            let lines = s.lines.map(|n| n.to_string()).unwrap_or_else(|| "-".into());
            let status = match &s.status {
                StageStatus::Completed => "ok".to_string(),
                StageStatus::CompletedWithoutInput => "ok (no input)".to_string(),
                StageStatus::ToolFailed(e) => format!("failed: {}", e),
                StageStatus::NotRun => "not run".to_string(),
            };
            println!("    {:<22} {:>6} lines  {}  [{}]", s.kind.name(), lines, s.output.display(), status);
        }
        println!("{}\n", "-".repeat(60));
    }
}

/// Runs stages strictly in order, each gated on the previous stage's output.
pub struct SequentialDriver {
    stages: Vec<PipelineStage>,
    entry: PathBuf,
    policy: FailurePolicy,
}

impl SequentialDriver {
    /// `entry` is the file gating the first stage (the merged subdomain list).
    pub fn new(stages: Vec<PipelineStage>, entry: PathBuf, policy: FailurePolicy) -> Self {
        Self { stages, entry, policy }
    }

    /// Returns `Err` only when the normalizer cannot produce its target list; that ends
    /// the run regardless of policy.
    pub async fn run(&self) -> Result<PipelineReport> {
        let mut reports: Vec<StageReport> = Vec::with_capacity(self.stages.len());
        let mut previous = self.entry.clone();

        for (idx, stage) in self.stages.iter().enumerate() {
            let has_input = atomic::is_non_empty(&previous);
            if !has_input {
                println!("[!] {}: dependency {} is missing or empty", stage.kind, previous.display());
                tracing::warn!(stage=%stage.kind, dependency=%previous.display(), "missing dependency");
                if self.policy == FailurePolicy::FailFast {
                    let reason = format!("dependency {} is missing or empty", previous.display());
                    return Ok(self.stopped(reports, stage.kind, idx, reason));
                }
            }

            println!("[*] {}...", stage.kind.describe());
            tracing::info!(stage=%stage.kind, input=%stage.input.display(), "stage starting");
            let status = match stage.execute().await {
                Ok(()) if has_input => StageStatus::Completed,
                Ok(()) => StageStatus::CompletedWithoutInput,
                Err(e) if stage.action == StageAction::NormalizeProbe => {
                    tracing::error!(stage=%stage.kind, error=%e, "could not write target list");
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(stage=%stage.kind, output=%stage.output.display(), error=%e, "stage tool failed");
                    if self.policy == FailurePolicy::FailFast {
                        reports.push(self.report(stage, StageStatus::ToolFailed(e.to_string())));
                        return Ok(self.stopped(reports, stage.kind, idx + 1, e.to_string()));
                    }
                    StageStatus::ToolFailed(e.to_string())
                }
            };
            let report = self.report(stage, status);
            println!("[+] {} results written to: {}", stage.kind, stage.output.display());
            reports.push(report);
            previous = stage.output.clone();
        }

        Ok(PipelineReport { state: PipelineState::Success, stages: reports })
    }

    fn report(&self, stage: &PipelineStage, status: StageStatus) -> StageReport {
        StageReport {
            kind: stage.kind,
            output: stage.output.clone(),
            status,
            lines: atomic::count_lines(&stage.output),
        }
    }

    /// Terminal `FailedFast` report; stages from index `rest` onwards are marked not run.
    fn stopped(&self, mut reports: Vec<StageReport>, stage: StageKind, rest: usize, reason: String) -> PipelineReport {
        for s in &self.stages[rest..] {
            reports.push(StageReport { kind: s.kind, output: s.output.clone(), status: StageStatus::NotRun, lines: None });
        }
        PipelineReport { state: PipelineState::FailedFast { stage, reason }, stages: reports }
    }
}
