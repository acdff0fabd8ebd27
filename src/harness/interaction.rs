//! Pointer interaction simulator.

use tracing::{info, warn};

use crate::engine::{EngineResult, Locator, PageSession};
use crate::harness::types::{Gesture, Interaction};

/// Drag horizontally across the center of the first element matching `target`.
///
/// Emits press, move and release as three separate pointer events so the
/// target observes a drag rather than a click. A missing target or one
/// without usable geometry is reported without touching the pointer.
pub async fn simulate<S: PageSession>(
    session: &mut S,
    target: &Locator,
    offset: f64,
) -> EngineResult<Interaction> {
    if session.count(target).await? == 0 {
        warn!(selector = %target, "no interaction target found");
        return Ok(Interaction::TargetMissing);
    }

    let bbox = match session.bounding_box(target).await? {
        Some(bbox) if !bbox.is_empty() => bbox,
        _ => {
            warn!(selector = %target, "interaction target found but has no bounding box");
            return Ok(Interaction::NoGeometry);
        }
    };
    info!(
        selector = %target,
        "Target dimensions: {}x{} at ({}, {})",
        bbox.width, bbox.height, bbox.x, bbox.y
    );

    let gesture = Gesture::horizontal_drag(&bbox, offset);
    session.pointer_down(gesture.start).await?;
    session.pointer_move(gesture.end).await?;
    session.pointer_up(gesture.end).await?;
    info!("Dragged from {} to {}", gesture.start, gesture.end);

    Ok(Interaction::Performed(gesture))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{
        AutomationEngine, FailPoint, FakeElement, FakeEngine, FakePage, LaunchOptions, PageEvent,
        Point,
    };

    const CANVAS: &str = "canvas.astrology-dial";

    #[tokio::test]
    async fn test_drag_emits_three_pointer_events() {
        let page = FakePage::new("t")
            .element(FakeElement::new(CANVAS).bounding_box(100.0, 100.0, 400.0, 400.0));
        let mut engine = FakeEngine::new(page);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();

        let interaction = simulate(&mut session, &Locator::css(CANVAS), 50.0).await.unwrap();

        assert!(interaction.performed());
        assert_eq!(
            engine.pointer_events(),
            vec![
                PageEvent::PointerDown(Point::new(300.0, 300.0)),
                PageEvent::PointerMove(Point::new(350.0, 300.0)),
                PageEvent::PointerUp(Point::new(350.0, 300.0)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_target_emits_nothing() {
        let mut engine = FakeEngine::new(FakePage::new("t"));
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();

        let interaction = simulate(&mut session, &Locator::css(CANVAS), 50.0).await.unwrap();

        assert_eq!(interaction, Interaction::TargetMissing);
        assert!(engine.pointer_events().is_empty());
    }

    #[tokio::test]
    async fn test_zero_size_target_has_no_geometry() {
        let page = FakePage::new("t")
            .element(FakeElement::new(CANVAS).bounding_box(10.0, 10.0, 0.0, 0.0));
        let mut engine = FakeEngine::new(page);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();

        let interaction = simulate(&mut session, &Locator::css(CANVAS), 50.0).await.unwrap();

        assert_eq!(interaction, Interaction::NoGeometry);
        assert!(engine.pointer_events().is_empty());
    }

    #[tokio::test]
    async fn test_pointer_failure_propagates() {
        let page = FakePage::new("t")
            .element(FakeElement::new(CANVAS).bounding_box(0.0, 0.0, 10.0, 10.0));
        let mut engine = FakeEngine::new(page).fail_at(FailPoint::Pointer);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();

        assert!(simulate(&mut session, &Locator::css(CANVAS), 50.0).await.is_err());
    }
}
