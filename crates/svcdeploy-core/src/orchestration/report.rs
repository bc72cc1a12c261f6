//! Per-step, per-definition and per-run outcome records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DeployError, Severity};
use crate::service::CommandOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunAction {
    Install,
    Remove,
}

impl RunAction {
    pub fn as_str(self) -> &'static str {
        match self {
            RunAction::Install => "install",
            RunAction::Remove => "remove",
        }
    }
}

/// A single action taken against one definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    CheckSource,
    Stage,
    Query,
    Stop,
    Unregister,
    Register,
    SetAppDirectory,
    SetAutoStart,
    Start,
    DeleteFiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub ok: bool,
    /// Command line or short note describing what was done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// An error or warning, tagged with how much it counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub severity: Severity,
    #[serde(flatten)]
    pub error: DeployError,
}

impl Issue {
    pub fn warning(error: DeployError) -> Self {
        Self {
            severity: Severity::Warning,
            error,
        }
    }

    pub fn error(error: DeployError) -> Self {
        Self {
            severity: Severity::Error,
            error,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Everything that happened to one service definition during a run.
#[derive(Debug, Clone, Serialize)]
pub struct DefinitionReport {
    pub name: String,
    pub steps: Vec<StepRecord>,
    pub issues: Vec<Issue>,
    /// True when a hard failure ended processing of this definition early.
    pub skipped: bool,
}

impl DefinitionReport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            issues: Vec::new(),
            skipped: false,
        }
    }

    pub fn record(&mut self, step: Step, ok: bool, detail: Option<String>) {
        self.steps.push(StepRecord { step, ok, detail });
    }

    /// Record a command-backed step; returns whether it succeeded.
    pub fn record_command(&mut self, step: Step, outcome: &CommandOutcome) -> bool {
        self.record(step, outcome.success, Some(outcome.command.clone()));
        outcome.success
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Stop processing this definition with a hard failure.
    pub fn skip(&mut self, error: DeployError) {
        self.issues.push(Issue::error(error));
        self.skipped = true;
    }

    pub fn ran(&self, step: Step) -> bool {
        self.steps.iter().any(|record| record.step == step)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| issue.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(|issue| !issue.is_error())
    }

    /// Reached its target state: not skipped and no error-severity issue.
    pub fn succeeded(&self) -> bool {
        !self.skipped && self.errors().next().is_none()
    }
}

/// Outcome of an install-all or remove-all run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub action: RunAction,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub definitions: Vec<DefinitionReport>,
    /// Issues not tied to one definition (wrapper provisioning, base dir).
    pub issues: Vec<Issue>,
    pub succeeded: bool,
}

impl RunReport {
    pub fn start(action: RunAction) -> Self {
        Self {
            action,
            started_at: Utc::now(),
            finished_at: None,
            definitions: Vec::new(),
            issues: Vec::new(),
            succeeded: false,
        }
    }

    pub fn push(&mut self, issue: Issue) {
        self.issues.push(issue);
    }

    /// Stamp the end time and compute the overall outcome: the AND of every
    /// definition outcome and the absence of run-level errors.
    pub fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self.succeeded = self.definitions.iter().all(DefinitionReport::succeeded)
            && !self.issues.iter().any(Issue::is_error);
        self
    }

    pub fn definition(&self, name: &str) -> Option<&DefinitionReport> {
        self.definitions.iter().find(|def| def.name == name)
    }

    pub fn failed_definitions(&self) -> impl Iterator<Item = &DefinitionReport> {
        self.definitions.iter().filter(|def| !def.succeeded())
    }

    /// Every error-severity issue, run-level first.
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_error()).count()
            + self
                .definitions
                .iter()
                .map(|def| def.errors().count())
                .sum::<usize>()
    }

    pub fn warning_count(&self) -> usize {
        self.issues.iter().filter(|i| !i.is_error()).count()
            + self
                .definitions
                .iter()
                .map(|def| def.warnings().count())
                .sum::<usize>()
    }
}
