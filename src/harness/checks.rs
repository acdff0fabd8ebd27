//! The check suite and the logic that runs a single check.
//!
//! Checks never raise: whatever happens is folded into a [`CheckResult`]
//! whose outcome tag tells the orchestrator how to proceed.

use tracing::{error, info, warn};

use crate::engine::{EngineResult, Locator, PageSession};
use crate::harness::types::{
    CheckOutcome, CheckResult, CheckSpec, Expect, Observation, ObservationKind,
};

// ============================================================================
// Target application selectors
// ============================================================================

pub const HEADER: &str = "h1";
pub const DIAL_CONTAINER: &str = ".dial-container";
pub const DIAL_CANVAS: &str = "canvas.astrology-dial";
pub const LOADING_SPINNER: &str = ".loading-spinner";
pub const ERROR_DISPLAY: &str = ".error-display";
pub const DIAL_INFO: &str = ".dial-info";
pub const DIAL_INFO_LINE: &str = ".dial-info p";
pub const INSTRUCTIONS: &str = ".instructions";
pub const DIAL_WRAPPER: &str = ".dial-wrapper";

// ============================================================================
// Suite
// ============================================================================

/// Page metadata checks
pub fn metadata_checks() -> Vec<CheckSpec> {
    vec![CheckSpec::title("Page title")]
}

/// Structural presence checks, run right after the page settles
pub fn structural_checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::text("Header", Locator::css(HEADER)),
        CheckSpec::count("Dial containers", Locator::css(DIAL_CONTAINER), Expect::AtLeast(1)),
        CheckSpec::count("Canvas elements", Locator::css(DIAL_CANVAS), Expect::AtLeast(1)),
        CheckSpec::count("Loading spinners", Locator::css(LOADING_SPINNER), Expect::Exactly(0)),
        CheckSpec::count("Error displays", Locator::css(ERROR_DISPLAY), Expect::Exactly(0)),
        CheckSpec::count("Dial info panels", Locator::css(DIAL_INFO), Expect::AtLeast(1)),
        CheckSpec::count("Instruction panels", Locator::css(INSTRUCTIONS), Expect::AtLeast(1)),
        CheckSpec::geometry("Canvas geometry", Locator::css(DIAL_CANVAS)),
    ]
}

/// Text that changes as the dial is manipulated
pub fn dynamic_text_checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::text(
            "Rotation display",
            Locator::css(DIAL_INFO_LINE).with_text("Current Rotation"),
        ),
        CheckSpec::text(
            "Alignments display",
            Locator::css(DIAL_INFO_LINE).with_text("Active Alignments"),
        ),
    ]
}

/// Computed-style checks confirming the stylesheet loaded
pub fn style_checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::style("Header gradient background", Locator::css(HEADER), "background")
            .with_marker("gradient"),
        CheckSpec::style("Dial wrapper border radius", Locator::css(DIAL_WRAPPER), "border-radius")
            .expect(Expect::NonEmpty),
    ]
}

// ============================================================================
// Execution
// ============================================================================

/// Run one check against the session
pub async fn run_check<S: PageSession>(session: &mut S, spec: &CheckSpec) -> CheckResult {
    let (outcome, note) = match observe(session, spec).await {
        Ok(Some(observation)) => {
            let note = unmet_expectation(&spec.expect, &observation);
            (CheckOutcome::Observed(observation), note)
        }
        Ok(None) => (CheckOutcome::NotFound, Some("not found".to_string())),
        Err(err) => (CheckOutcome::Error(err.to_string()), None),
    };

    let result = CheckResult {
        label: spec.label.clone(),
        outcome,
        note,
    };
    log_result(spec, &result);
    result
}

async fn observe<S: PageSession>(
    session: &mut S,
    spec: &CheckSpec,
) -> EngineResult<Option<Observation>> {
    let locator = &spec.locator;

    // Content and geometry are only read once something is known to match
    let needs_element = !matches!(spec.kind, ObservationKind::Title | ObservationKind::Count);
    if needs_element && session.count(locator).await? == 0 {
        return Ok(None);
    }

    let observation = match &spec.kind {
        ObservationKind::Title => Some(Observation::Text(session.title().await?)),
        ObservationKind::Count => Some(Observation::Count(session.count(locator).await?)),
        ObservationKind::Text => session.text_content(locator).await?.map(Observation::Text),
        ObservationKind::Style { property, marker } => {
            let value = session.computed_style(locator, property).await?;
            let has_marker = marker.as_deref().map(|m| value.contains(m));
            Some(Observation::Style { value, has_marker })
        }
        ObservationKind::Geometry => session
            .bounding_box(locator)
            .await?
            .map(Observation::Geometry),
    };
    Ok(observation)
}

/// Describe how `observation` misses `expect`, if it does
fn unmet_expectation(expect: &Expect, observation: &Observation) -> Option<String> {
    let value = match observation {
        Observation::Text(text) => Some(text.as_str()),
        Observation::Style { value, .. } => Some(value.as_str()),
        _ => None,
    };

    match (expect, observation) {
        (Expect::Exactly(n), Observation::Count(found)) if found != n => {
            Some(format!("expected exactly {}, found {}", n, found))
        }
        (Expect::AtLeast(n), Observation::Count(found)) if found < n => {
            Some(format!("expected at least {}, found {}", n, found))
        }
        (Expect::NonEmpty, _) if value.is_some_and(|v| v.trim().is_empty()) => {
            Some("empty".to_string())
        }
        (Expect::Contains(marker), _) if value.is_some_and(|v| !v.contains(marker.as_str())) => {
            Some(format!("does not contain '{}'", marker))
        }
        _ => None,
    }
}

fn log_result(spec: &CheckSpec, result: &CheckResult) {
    let selector = spec.locator.to_string();
    match (&result.outcome, &result.note) {
        (CheckOutcome::Error(err), _) => {
            error!(label = %result.label, %selector, error = %err, "check raised");
        }
        (CheckOutcome::Observed(observation), None) => {
            info!(label = %result.label, %selector, "{}: {}", result.label, observation);
        }
        (CheckOutcome::Observed(observation), Some(note)) => {
            warn!(label = %result.label, %selector, "{}: {} ({})", result.label, observation, note);
        }
        (CheckOutcome::NotFound, _) => {
            warn!(label = %result.label, %selector, "{}: not found", result.label);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        AutomationEngine, FailPoint, FakeElement, FakeEngine, FakePage, LaunchOptions, PageEvent,
    };

    async fn session_for(page: FakePage) -> (FakeEngine, crate::engine::FakeSession) {
        let mut engine = FakeEngine::new(page);
        let session = engine.launch(&LaunchOptions::default()).await.unwrap();
        (engine, session)
    }

    #[tokio::test]
    async fn test_text_check_missing_element_is_soft() {
        let (_engine, mut session) = session_for(FakePage::new("t")).await;
        let spec = CheckSpec::text("Header", Locator::css(HEADER));
        let result = run_check(&mut session, &spec).await;

        assert_eq!(result.outcome, CheckOutcome::NotFound);
        assert_eq!(result.note.as_deref(), Some("not found"));
    }

    #[tokio::test]
    async fn test_existence_is_checked_before_content() {
        let (engine, mut session) = session_for(FakePage::new("t")).await;
        let spec = CheckSpec::style("bg", Locator::css(HEADER), "background");
        run_check(&mut session, &spec).await;

        // A single count query, no style read
        let queries: Vec<_> = engine
            .events()
            .into_iter()
            .filter(|e| matches!(e, PageEvent::Queried(_)))
            .collect();
        assert_eq!(queries.len(), 1);
    }

    #[tokio::test]
    async fn test_count_expectation_mismatch() {
        let page = FakePage::new("t").element(FakeElement::new(LOADING_SPINNER));
        let (_engine, mut session) = session_for(page).await;
        let spec = CheckSpec::count("Spinners", Locator::css(LOADING_SPINNER), Expect::Exactly(0));
        let result = run_check(&mut session, &spec).await;

        assert_eq!(result.observation(), Some(&Observation::Count(1)));
        assert_eq!(result.note.as_deref(), Some("expected exactly 0, found 1"));
    }

    #[tokio::test]
    async fn test_zero_count_is_observed() {
        let (_engine, mut session) = session_for(FakePage::new("t")).await;
        let spec = CheckSpec::count("Errors", Locator::css(ERROR_DISPLAY), Expect::Exactly(0));
        let result = run_check(&mut session, &spec).await;

        assert_eq!(result.observation(), Some(&Observation::Count(0)));
        assert!(result.note.is_none());
    }

    #[tokio::test]
    async fn test_style_marker_classification() {
        let page = FakePage::new("t").element(
            FakeElement::new(HEADER)
                .text("Astrology")
                .style("background", "linear-gradient(135deg, #667eea 0%, #764ba2 100%)"),
        );
        let (_engine, mut session) = session_for(page).await;
        let result = run_check(&mut session, &style_checks()[0]).await;

        match result.observation() {
            Some(Observation::Style { has_marker, .. }) => assert_eq!(*has_marker, Some(true)),
            other => panic!("unexpected observation: {:?}", other),
        }
        assert!(result.note.is_none());
    }

    #[tokio::test]
    async fn test_empty_text_is_soft() {
        let page = FakePage::new("t").element(FakeElement::new(HEADER).text("   "));
        let (_engine, mut session) = session_for(page).await;
        let spec = CheckSpec::text("Header", Locator::css(HEADER));
        let result = run_check(&mut session, &spec).await;

        assert_eq!(result.note.as_deref(), Some("empty"));
    }

    #[tokio::test]
    async fn test_engine_error_is_tagged() {
        let mut engine = FakeEngine::new(FakePage::new("t")).fail_at(FailPoint::Query);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();
        let result = run_check(&mut session, &metadata_checks()[0]).await;

        assert!(matches!(result.outcome, CheckOutcome::Error(_)));
    }
}
