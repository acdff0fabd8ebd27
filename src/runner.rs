//! Aggregated results of a verification run.

use chrono::{DateTime, Utc};
use std::fmt::Write as _;

use crate::harness::types::{
    Artifact, CheckOutcome, CheckResult, HarnessError, Interaction, RunOutcome, Verdict,
};

/// The hard failure that ended a run early
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// Label of the step that raised
    pub step: String,
    pub error: String,
}

/// Everything a run observed, in execution order
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Page under test
    pub url: String,

    pub started_at: DateTime<Utc>,

    pub finished_at: Option<DateTime<Utc>>,

    /// Check results in the order they ran
    pub checks: Vec<CheckResult>,

    /// Interaction simulator outcome, if the run got that far
    pub interaction: Option<Interaction>,

    /// Screenshots in capture order
    pub artifacts: Vec<Artifact>,

    /// Set when a hard failure aborted the run
    pub failure: Option<StepFailure>,
}

impl RunReport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            checks: Vec::new(),
            interaction: None,
            artifacts: Vec::new(),
            failure: None,
        }
    }

    pub fn record_check(&mut self, result: CheckResult) {
        self.checks.push(result);
    }

    pub fn record_artifact(&mut self, artifact: Artifact) {
        self.artifacts.push(artifact);
    }

    /// Record the hard failure that stops the run
    pub fn abort(&mut self, err: &HarnessError) {
        self.failure = Some(StepFailure {
            step: err.step_label().to_string(),
            error: err.to_string(),
        });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn check(&self, label: &str) -> Option<&CheckResult> {
        self.checks.iter().find(|c| c.label == label)
    }

    /// Soft failures recorded so far, interaction included
    pub fn soft_failures(&self) -> usize {
        let checks = self
            .checks
            .iter()
            .filter(|c| c.verdict() == Verdict::Soft)
            .count();
        let interaction = usize::from(self.interaction.is_some_and(|i| !i.performed()));
        checks + interaction
    }

    pub fn outcome(&self) -> RunOutcome {
        match &self.failure {
            None => RunOutcome::Success,
            Some(failure) => RunOutcome::Failure {
                step: failure.step.clone(),
                error: failure.error.clone(),
            },
        }
    }

    /// Human-readable summary, one line per step
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Verification of {}", self.url);

        for check in &self.checks {
            let detail = match &check.outcome {
                CheckOutcome::Observed(observation) => observation.to_string(),
                CheckOutcome::NotFound => "Not found".to_string(),
                CheckOutcome::Error(err) => err.clone(),
            };
            let note = check
                .note
                .as_ref()
                .filter(|_| !matches!(check.outcome, CheckOutcome::NotFound))
                .map(|n| format!(" ({})", n))
                .unwrap_or_default();
            let _ = writeln!(out, "  [{}] {}: {}{}", check.verdict(), check.label, detail, note);
        }

        if let Some(interaction) = &self.interaction {
            let line = match interaction {
                Interaction::Performed(g) => format!("[PASS] Drag: {} -> {}", g.start, g.end),
                Interaction::TargetMissing => "[SOFT] Drag: no target element found".to_string(),
                Interaction::NoGeometry => {
                    "[SOFT] Drag: target found but no bounding box".to_string()
                }
            };
            let _ = writeln!(out, "  {}", line);
        }

        if !self.artifacts.is_empty() {
            let _ = writeln!(out, "Screenshots saved:");
            for artifact in &self.artifacts {
                let _ = writeln!(out, "  - {}: {}", artifact.profile, artifact.path.display());
            }
        }

        let elapsed = self
            .finished_at
            .map(|end| (end - self.started_at).num_milliseconds() as f64 / 1000.0)
            .unwrap_or_default();
        match &self.failure {
            None => {
                let _ = writeln!(
                    out,
                    "Completed in {:.1}s with {} soft failure(s)",
                    elapsed,
                    self.soft_failures()
                );
            }
            Some(failure) => {
                let _ = writeln!(
                    out,
                    "Aborted at '{}' after {:.1}s: {}",
                    failure.step, elapsed, failure.error
                );
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, Point};
    use crate::harness::types::{Gesture, Observation};
    use std::path::PathBuf;

    fn check(label: &str, outcome: CheckOutcome, note: Option<&str>) -> CheckResult {
        CheckResult {
            label: label.to_string(),
            outcome,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn test_soft_failures_do_not_fail_the_run() {
        let mut report = RunReport::new("http://127.0.0.1:8083/");
        report.record_check(check("Header", CheckOutcome::NotFound, Some("not found")));
        report.interaction = Some(Interaction::TargetMissing);
        report.finish();

        assert_eq!(report.soft_failures(), 2);
        assert_eq!(report.outcome(), RunOutcome::Success);
    }

    #[test]
    fn test_abort_sets_failure_outcome() {
        let mut report = RunReport::new("http://127.0.0.1:8083/");
        report.abort(&HarnessError::step("navigate", EngineError::Injected("navigate")));

        match report.outcome() {
            RunOutcome::Failure { step, .. } => assert_eq!(step, "navigate"),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_summary_lines() {
        let mut report = RunReport::new("http://127.0.0.1:8083/");
        report.record_check(check(
            "Dial containers",
            CheckOutcome::Observed(Observation::Count(1)),
            None,
        ));
        report.record_check(check("Rotation display", CheckOutcome::NotFound, Some("not found")));
        report.interaction = Some(Interaction::Performed(Gesture {
            start: Point::new(300.0, 300.0),
            end: Point::new(350.0, 300.0),
        }));
        report.record_artifact(Artifact {
            profile: "desktop".into(),
            path: PathBuf::from("test-screenshot.png"),
            dimensions: Some((1200, 800)),
        });
        report.finish();

        let summary = report.summary();
        assert!(summary.contains("[PASS] Dial containers: 1"));
        assert!(summary.contains("[SOFT] Rotation display: Not found\n"));
        assert!(summary.contains("[PASS] Drag: (300, 300) -> (350, 300)"));
        assert!(summary.contains("  - desktop: test-screenshot.png"));
        assert!(summary.contains("with 1 soft failure(s)"));
    }
}
