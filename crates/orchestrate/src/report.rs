//! The run report: the ordered, persisted record of every step.
//!
//! The report is the sole authority for what a re-run must re-attempt.
//! It is rewritten to disk after every step so that an aborted run
//! still leaves a complete account of what happened, and it is always
//! emitted, including on partial failure.

use std::fmt;
use std::path::Path;

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum StepKind {
    Deploy,
    Wire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum StepStatus {
    Success,
    Skipped,
    Failed,
}

/// Outcome of one deploy or wiring step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepResult {
    pub kind: StepKind,
    /// Component name for deploys; edge label for wiring steps.
    pub target: String,
    pub status: StepStatus,
    /// Human-readable cause or diagnostic for the status.
    pub detail: String,
    /// Resolved address, recorded on successful deploys for auditing
    /// and re-run diffing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// RFC 3339 completion time.
    pub completed_at: String,
}

impl StepResult {
    fn new(kind: StepKind, target: &str, status: StepStatus, detail: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.to_string(),
            status,
            detail: detail.into(),
            address: None,
            completed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn deployed(target: &str, address: Address) -> Self {
        let mut step = Self::new(
            StepKind::Deploy,
            target,
            StepStatus::Success,
            format!("deployed at {}", address),
        );
        step.address = Some(address);
        step
    }

    pub fn wired(target: &str, detail: impl Into<String>) -> Self {
        Self::new(StepKind::Wire, target, StepStatus::Success, detail)
    }

    pub fn skipped(kind: StepKind, target: &str, detail: impl Into<String>) -> Self {
        Self::new(kind, target, StepStatus::Skipped, detail)
    }

    pub fn failed(kind: StepKind, target: &str, detail: impl Into<String>) -> Self {
        Self::new(kind, target, StepStatus::Failed, detail)
    }
}

/// Tallies for one phase of the current run, separate from the
/// accumulated report so exit codes reflect this run only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseOutcome {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl PhaseOutcome {
    pub fn tally(&mut self, status: StepStatus) {
        match status {
            StepStatus::Success => self.succeeded += 1,
            StepStatus::Skipped => self.skipped += 1,
            StepStatus::Failed => self.failed += 1,
        }
    }
}

/// Append-only audit log of every step across runs of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub network: String,
    pub steps: Vec<StepResult>,
}

impl RunReport {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            steps: Vec::new(),
        }
    }

    /// Load the persisted report for an environment, or start fresh.
    pub fn load_or_create(path: &Path, network: &str) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(network));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read run report from {}", path.display()))?;
        serde_json::from_str(&content).context("Failed to parse run report")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize run report")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write run report to {}", path.display()))?;
        Ok(())
    }

    pub fn push(&mut self, step: StepResult) {
        match step.status {
            StepStatus::Success => tracing::info!(
                kind = %step.kind,
                target = %step.target,
                detail = %step.detail,
                "Step succeeded"
            ),
            StepStatus::Skipped => tracing::warn!(
                kind = %step.kind,
                target = %step.target,
                detail = %step.detail,
                "Step skipped"
            ),
            StepStatus::Failed => tracing::error!(
                kind = %step.kind,
                target = %step.target,
                detail = %step.detail,
                "Step failed"
            ),
        }
        self.steps.push(step);
    }

    /// Whether a wiring edge already completed successfully in this or
    /// any previous run.
    pub fn wire_succeeded(&self, label: &str) -> bool {
        self.steps.iter().any(|s| {
            s.kind == StepKind::Wire && s.status == StepStatus::Success && s.target == label
        })
    }

    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == StepStatus::Failed)
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run report for {}", self.network)?;
        for step in &self.steps {
            writeln!(
                f,
                "  {} {:6} {} - {}",
                status_icon(step.status),
                step.kind,
                step.target,
                step.detail
            )?;
        }
        Ok(())
    }
}

fn status_icon(status: StepStatus) -> &'static str {
    match status {
        StepStatus::Success => "[ok]",
        StepStatus::Skipped => "[skip]",
        StepStatus::Failed => "[FAIL]",
    }
}
