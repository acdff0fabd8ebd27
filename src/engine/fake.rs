//! Scripted in-memory engine for testing.
//!
//! A [`FakePage`] is a flat list of selector-addressed elements. Every call a
//! session receives is appended to a shared event log, which stays readable
//! after the session is closed. Any primitive can be made to fail with a
//! [`FailPoint`].

use async_trait::async_trait;
use image::RgbImage;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    AutomationEngine, BoundingBox, EngineError, EngineResult, LaunchOptions, Locator, PageSession,
    Point, Readiness, WaitPolicy,
};

/// A single element on a fake page
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    /// Selector this element answers to (matched literally)
    pub selector: String,
    pub text: String,
    pub bounding_box: Option<BoundingBox>,
    pub styles: HashMap<String, String>,
}

impl FakeElement {
    pub fn new(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            ..Self::default()
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox::new(x, y, width, height));
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    fn matches(&self, locator: &Locator) -> bool {
        self.selector == locator.selector
            && locator
                .has_text
                .as_deref()
                .is_none_or(|needle| self.text.contains(needle))
    }
}

/// The page a fake session renders
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub title: String,
    pub elements: Vec<FakeElement>,
    /// Answer returned for readiness predicates
    pub ready: bool,
}

impl FakePage {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            elements: Vec::new(),
            ready: true,
        }
    }

    pub fn element(mut self, element: FakeElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn never_ready(mut self) -> Self {
        self.ready = false;
        self
    }

    fn matching<'a>(&'a self, locator: &'a Locator) -> impl Iterator<Item = &'a FakeElement> + 'a {
        self.elements.iter().filter(move |el| el.matches(locator))
    }
}

/// Primitive at which a fake session raises an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Launch,
    Navigate,
    Query,
    Screenshot,
    Pointer,
    Viewport,
    Close,
}

impl FailPoint {
    fn name(self) -> &'static str {
        match self {
            FailPoint::Launch => "launch",
            FailPoint::Navigate => "navigate",
            FailPoint::Query => "query",
            FailPoint::Screenshot => "screenshot",
            FailPoint::Pointer => "pointer",
            FailPoint::Viewport => "viewport",
            FailPoint::Close => "close",
        }
    }
}

/// Everything a fake session was asked to do, in order
#[derive(Debug, Clone, PartialEq)]
pub enum PageEvent {
    Launched { width: u32, height: u32 },
    Navigated { url: String, wait: WaitPolicy },
    WaitedReady(Readiness),
    Queried(Locator),
    Viewport { width: u32, height: u32 },
    Screenshot { path: PathBuf, full_page: bool },
    PointerDown(Point),
    PointerMove(Point),
    PointerUp(Point),
    Closed,
}

/// Engine handing out sessions over a [`FakePage`]
#[derive(Debug, Clone)]
pub struct FakeEngine {
    page: FakePage,
    fail_at: Option<FailPoint>,
    events: Arc<Mutex<Vec<PageEvent>>>,
}

impl FakeEngine {
    pub fn new(page: FakePage) -> Self {
        Self {
            page,
            fail_at: None,
            events: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn fail_at(mut self, point: FailPoint) -> Self {
        self.fail_at = Some(point);
        self
    }

    /// Snapshot of the event log
    pub fn events(&self) -> Vec<PageEvent> {
        lock(&self.events).clone()
    }

    pub fn pointer_events(&self) -> Vec<PageEvent> {
        self.events()
            .into_iter()
            .filter(|e| {
                matches!(
                    e,
                    PageEvent::PointerDown(_) | PageEvent::PointerMove(_) | PageEvent::PointerUp(_)
                )
            })
            .collect()
    }

    pub fn close_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, PageEvent::Closed))
            .count()
    }
}

/// A session over a fake page
#[derive(Debug)]
pub struct FakeSession {
    page: FakePage,
    fail_at: Option<FailPoint>,
    events: Arc<Mutex<Vec<PageEvent>>>,
    viewport: (u32, u32),
}

impl FakeSession {
    fn record(&self, event: PageEvent) {
        lock(&self.events).push(event);
    }

    fn check(&self, point: FailPoint) -> EngineResult<()> {
        if self.fail_at == Some(point) {
            return Err(EngineError::Injected(point.name()));
        }
        Ok(())
    }

    fn query(&self, locator: &Locator) -> EngineResult<Option<&FakeElement>> {
        self.record(PageEvent::Queried(locator.clone()));
        self.check(FailPoint::Query)?;
        Ok(self.page.elements.iter().find(|el| el.matches(locator)))
    }
}

fn lock(events: &Mutex<Vec<PageEvent>>) -> MutexGuard<'_, Vec<PageEvent>> {
    // A panicking test thread must not hide the log from the assertions
    events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl AutomationEngine for FakeEngine {
    type Session = FakeSession;

    async fn launch(&mut self, options: &LaunchOptions) -> EngineResult<FakeSession> {
        if self.fail_at == Some(FailPoint::Launch) {
            return Err(EngineError::Injected(FailPoint::Launch.name()));
        }
        lock(&self.events).push(PageEvent::Launched {
            width: options.viewport_width,
            height: options.viewport_height,
        });
        Ok(FakeSession {
            page: self.page.clone(),
            fail_at: self.fail_at,
            events: Arc::clone(&self.events),
            viewport: (options.viewport_width, options.viewport_height),
        })
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> EngineResult<()> {
        self.record(PageEvent::Navigated {
            url: url.to_string(),
            wait,
        });
        self.check(FailPoint::Navigate)
    }

    async fn wait_ready(&mut self, readiness: &Readiness) -> EngineResult<bool> {
        self.record(PageEvent::WaitedReady(readiness.clone()));
        Ok(match readiness {
            Readiness::Delay(_) => true,
            Readiness::Predicate { .. } => self.page.ready,
        })
    }

    async fn title(&mut self) -> EngineResult<String> {
        self.check(FailPoint::Query)?;
        Ok(self.page.title.clone())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> EngineResult<()> {
        self.record(PageEvent::Viewport { width, height });
        self.check(FailPoint::Viewport)?;
        self.viewport = (width, height);
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> EngineResult<()> {
        self.record(PageEvent::Screenshot {
            path: path.to_path_buf(),
            full_page,
        });
        self.check(FailPoint::Screenshot)?;

        let io_err = |source: std::io::Error| EngineError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let (width, height) = self.viewport;
        RgbImage::new(width, height)
            .save(path)
            .map_err(|err| io_err(std::io::Error::other(err.to_string())))
    }

    async fn count(&mut self, locator: &Locator) -> EngineResult<usize> {
        self.record(PageEvent::Queried(locator.clone()));
        self.check(FailPoint::Query)?;
        Ok(self.page.matching(locator).count())
    }

    async fn text_content(&mut self, locator: &Locator) -> EngineResult<Option<String>> {
        Ok(self.query(locator)?.map(|el| el.text.clone()))
    }

    async fn bounding_box(&mut self, locator: &Locator) -> EngineResult<Option<BoundingBox>> {
        Ok(self.query(locator)?.and_then(|el| el.bounding_box))
    }

    async fn computed_style(&mut self, locator: &Locator, property: &str) -> EngineResult<String> {
        Ok(self
            .query(locator)?
            .and_then(|el| el.styles.get(property).cloned())
            .unwrap_or_default())
    }

    async fn pointer_move(&mut self, to: Point) -> EngineResult<()> {
        self.check(FailPoint::Pointer)?;
        self.record(PageEvent::PointerMove(to));
        Ok(())
    }

    async fn pointer_down(&mut self, at: Point) -> EngineResult<()> {
        self.check(FailPoint::Pointer)?;
        self.record(PageEvent::PointerDown(at));
        Ok(())
    }

    async fn pointer_up(&mut self, at: Point) -> EngineResult<()> {
        self.check(FailPoint::Pointer)?;
        self.record(PageEvent::PointerUp(at));
        Ok(())
    }

    async fn close(self) -> EngineResult<()> {
        self.record(PageEvent::Closed);
        self.check(FailPoint::Close)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_text_filter_matches_substring() {
        let page = FakePage::new("t")
            .element(FakeElement::new(".dial-info p").text("Current Rotation: 12°"))
            .element(FakeElement::new(".dial-info p").text("Active Alignments: 3"));
        let mut engine = FakeEngine::new(page);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();

        let locator = Locator::css(".dial-info p").with_text("Active Alignments");
        assert_eq!(session.count(&locator).await.unwrap(), 1);
        assert_eq!(
            session.text_content(&locator).await.unwrap().as_deref(),
            Some("Active Alignments: 3")
        );
        assert_eq!(session.count(&Locator::css(".dial-info p")).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_query_result_outlives_locator() {
        let page = FakePage::new("t").element(FakeElement::new("h1").text("Astrology"));
        let mut engine = FakeEngine::new(page);
        let session = engine.launch(&LaunchOptions::default()).await.unwrap();

        let found = {
            let locator = Locator::css("h1");
            session.query(&locator).unwrap()
        };
        assert_eq!(found.map(|el| el.text.as_str()), Some("Astrology"));
    }

    #[tokio::test]
    async fn test_events_survive_close() {
        let mut engine = FakeEngine::new(FakePage::new("t"));
        let session = engine.launch(&LaunchOptions::default()).await.unwrap();
        session.close().await.unwrap();

        assert_eq!(engine.close_count(), 1);
        assert_eq!(
            engine.events(),
            vec![
                PageEvent::Launched {
                    width: 1200,
                    height: 800
                },
                PageEvent::Closed
            ]
        );
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let mut engine = FakeEngine::new(FakePage::new("t")).fail_at(FailPoint::Navigate);
        let mut session = engine.launch(&LaunchOptions::default()).await.unwrap();
        let err = session
            .navigate("http://localhost", WaitPolicy::NetworkIdle)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Injected("navigate")));
    }
}
