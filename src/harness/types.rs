use std::path::PathBuf;

use crate::engine::{BoundingBox, EngineError, Locator, Point};

/// What a check reads from the page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservationKind {
    /// The document title
    Title,
    /// Number of matching elements
    Count,
    /// Text content of the first match
    Text,
    /// A computed style property of the first match, optionally classified by
    /// whether the raw value contains `marker`
    Style {
        property: String,
        marker: Option<String>,
    },
    /// Bounding box of the first match
    Geometry,
}

/// What a check expects to observe. A miss is a soft failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Anything observed is fine
    Any,
    Exactly(usize),
    AtLeast(usize),
    /// Text must contain something other than whitespace
    NonEmpty,
    /// Text or style must contain the given substring
    Contains(String),
}

/// Static description of a single verification step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckSpec {
    /// Human-readable label used in logs and the summary
    pub label: String,
    pub locator: Locator,
    pub kind: ObservationKind,
    pub expect: Expect,
}

impl CheckSpec {
    pub fn title(label: &str) -> Self {
        Self {
            label: label.to_string(),
            locator: Locator::css("title"),
            kind: ObservationKind::Title,
            expect: Expect::NonEmpty,
        }
    }

    pub fn count(label: &str, locator: Locator, expect: Expect) -> Self {
        Self {
            label: label.to_string(),
            locator,
            kind: ObservationKind::Count,
            expect,
        }
    }

    pub fn text(label: &str, locator: Locator) -> Self {
        Self {
            label: label.to_string(),
            locator,
            kind: ObservationKind::Text,
            expect: Expect::NonEmpty,
        }
    }

    pub fn style(label: &str, locator: Locator, property: &str) -> Self {
        Self {
            label: label.to_string(),
            locator,
            kind: ObservationKind::Style {
                property: property.to_string(),
                marker: None,
            },
            expect: Expect::Any,
        }
    }

    /// Classify the style value by `marker` and expect the marker to be present
    pub fn with_marker(mut self, marker: &str) -> Self {
        if let ObservationKind::Style { marker: m, .. } = &mut self.kind {
            *m = Some(marker.to_string());
            self.expect = Expect::Contains(marker.to_string());
        }
        self
    }

    pub fn geometry(label: &str, locator: Locator) -> Self {
        Self {
            label: label.to_string(),
            locator,
            kind: ObservationKind::Geometry,
            expect: Expect::Any,
        }
    }

    pub fn expect(mut self, expect: Expect) -> Self {
        self.expect = expect;
        self
    }
}

/// A value read from the page
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    Count(usize),
    Text(String),
    Style {
        value: String,
        /// Whether the value contains the classification marker, when one is set
        has_marker: Option<bool>,
    },
    Geometry(BoundingBox),
}

impl std::fmt::Display for Observation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Observation::Count(n) => write!(f, "{}", n),
            Observation::Text(text) => write!(f, "{:?}", text),
            Observation::Style {
                value,
                has_marker: Some(has),
            } => write!(f, "{:?} (marker: {})", value, if *has { "yes" } else { "no" }),
            Observation::Style { value, .. } => write!(f, "{:?}", value),
            Observation::Geometry(b) => {
                write!(f, "{}x{} at ({}, {})", b.width, b.height, b.x, b.y)
            }
        }
    }
}

/// Outcome tag of a single check
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    Observed(Observation),
    /// No element matched the locator
    NotFound,
    /// The engine raised while running the check
    Error(String),
}

/// Step verdict as reported in the summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Soft,
    Hard,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Verdict::Pass => "PASS",
            Verdict::Soft => "SOFT",
            Verdict::Hard => "FAIL",
        })
    }
}

/// Result of running one [`CheckSpec`]
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub label: String,
    pub outcome: CheckOutcome,
    /// Why the check is a soft failure, if it is one
    pub note: Option<String>,
}

impl CheckResult {
    pub fn verdict(&self) -> Verdict {
        match (&self.outcome, &self.note) {
            (CheckOutcome::Error(_), _) => Verdict::Hard,
            (CheckOutcome::NotFound, _) | (_, Some(_)) => Verdict::Soft,
            (CheckOutcome::Observed(_), None) => Verdict::Pass,
        }
    }

    pub fn observation(&self) -> Option<&Observation> {
        match &self.outcome {
            CheckOutcome::Observed(observation) => Some(observation),
            _ => None,
        }
    }
}

/// A synthetic drag: press at `start`, move to `end`, release at `end`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gesture {
    pub start: Point,
    pub end: Point,
}

impl Gesture {
    /// Horizontal drag from the center of `bbox` by `offset`
    pub fn horizontal_drag(bbox: &BoundingBox, offset: f64) -> Self {
        let start = bbox.center();
        Self {
            start,
            end: Point::new(start.x + offset, start.y),
        }
    }
}

/// Outcome of the interaction simulator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Interaction {
    Performed(Gesture),
    /// Nothing matched the target locator
    TargetMissing,
    /// The target matched but has no usable bounding box
    NoGeometry,
}

impl Interaction {
    pub fn performed(&self) -> bool {
        matches!(self, Interaction::Performed(_))
    }
}

/// A named viewport and the screenshot taken under it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportProfile {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub artifact: PathBuf,
}

impl ViewportProfile {
    pub fn new(name: &str, width: u32, height: u32, artifact: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            artifact: artifact.into(),
        }
    }
}

/// A screenshot written during the run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub profile: String,
    pub path: PathBuf,
    /// Pixel dimensions read back from the file, when readable
    pub dimensions: Option<(u32, u32)>,
}

/// Terminal state of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step executed; soft failures may have been recorded
    Success,
    /// A hard failure aborted the run
    Failure { step: String, error: String },
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Success => 0,
            RunOutcome::Failure { .. } => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }
}

/// Result type for harness operations
pub type HarnessResult<T> = Result<T, HarnessError>;

/// Error types for harness operations
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    /// The engine raised during a named step
    #[error("step '{step}' failed: {source}")]
    Step {
        step: String,
        #[source]
        source: EngineError,
    },

    /// A check came back tagged as an engine error
    #[error("check '{step}' failed: {message}")]
    Check { step: String, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    pub fn step(step: impl Into<String>, source: EngineError) -> Self {
        HarnessError::Step {
            step: step.into(),
            source,
        }
    }

    /// Label of the step that failed, or "configuration"
    pub fn step_label(&self) -> &str {
        match self {
            HarnessError::Step { step, .. } | HarnessError::Check { step, .. } => step,
            HarnessError::Config(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gesture_from_canvas_box() {
        let bbox = BoundingBox::new(100.0, 100.0, 400.0, 400.0);
        let gesture = Gesture::horizontal_drag(&bbox, 50.0);
        assert_eq!(gesture.start, Point::new(300.0, 300.0));
        assert_eq!(gesture.end, Point::new(350.0, 300.0));
    }

    #[test]
    fn test_verdicts() {
        let pass = CheckResult {
            label: "a".into(),
            outcome: CheckOutcome::Observed(Observation::Count(1)),
            note: None,
        };
        let missing = CheckResult {
            label: "b".into(),
            outcome: CheckOutcome::NotFound,
            note: Some("not found".into()),
        };
        let mismatch = CheckResult {
            label: "c".into(),
            outcome: CheckOutcome::Observed(Observation::Count(2)),
            note: Some("expected exactly 0".into()),
        };
        let hard = CheckResult {
            label: "d".into(),
            outcome: CheckOutcome::Error("boom".into()),
            note: None,
        };
        assert_eq!(pass.verdict(), Verdict::Pass);
        assert_eq!(missing.verdict(), Verdict::Soft);
        assert_eq!(mismatch.verdict(), Verdict::Soft);
        assert_eq!(hard.verdict(), Verdict::Hard);
    }

    #[test]
    fn test_marker_sets_expectation() {
        let spec = CheckSpec::style("bg", Locator::css("h1"), "background").with_marker("gradient");
        assert_eq!(spec.expect, Expect::Contains("gradient".into()));
        assert_eq!(
            spec.kind,
            ObservationKind::Style {
                property: "background".into(),
                marker: Some("gradient".into())
            }
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(RunOutcome::Success.exit_code(), 0);
        let failure = RunOutcome::Failure {
            step: "navigate".into(),
            error: "refused".into(),
        };
        assert_eq!(failure.exit_code(), 1);
        assert!(!failure.is_success());
    }
}
