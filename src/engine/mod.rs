//! Automation engine abstraction.
//!
//! The orchestrator never talks to a browser directly. Everything it needs
//! from the outside world goes through two traits:
//! - [`AutomationEngine`] launches a browser and hands out one [`PageSession`]
//! - [`PageSession`] exposes page, element, input and capture primitives
//!
//! Implementations:
//! - [`ChromiumEngine`] drives Chromium over the DevTools protocol
//! - [`FakeEngine`] is a scripted in-memory page for tests

pub mod chromium;
pub mod fake;

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub use chromium::{ChromiumEngine, ChromiumSession};
pub use fake::{FailPoint, FakeElement, FakeEngine, FakePage, FakeSession, PageEvent};

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised by the automation engine. Every one of these is a hard failure.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("devtools protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("invalid protocol parameters: {0}")]
    Protocol(String),

    #[error("page script returned unexpected data: {0}")]
    Script(#[from] serde_json::Error),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("injected failure at {0}")]
    Injected(&'static str),
}

/// Options used when launching a browser session
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    /// Run without a visible window
    pub headless: bool,
    /// Disable the Chromium sandbox (required in most containers)
    pub disable_sandbox: bool,
    /// Initial viewport width in CSS pixels
    pub viewport_width: u32,
    /// Initial viewport height in CSS pixels
    pub viewport_height: u32,
    /// Per-operation timeout enforced by the engine
    pub operation_timeout: Duration,
    /// Explicit browser executable, auto-detected when `None`
    pub executable: Option<PathBuf>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: true,
            disable_sandbox: true,
            viewport_width: 1200,
            viewport_height: 800,
            operation_timeout: Duration::from_secs(30),
            executable: None,
        }
    }
}

/// When navigation is considered finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitPolicy {
    /// The load event fired
    Load,
    /// The load event fired and no request has been in flight for a short window
    NetworkIdle,
}

/// How to wait for the target application to settle
#[derive(Debug, Clone, PartialEq)]
pub enum Readiness {
    /// Block for a fixed duration
    Delay(Duration),
    /// Poll a boolean page expression until it holds or the timeout elapses
    Predicate {
        script: String,
        timeout: Duration,
        poll_interval: Duration,
    },
}

impl Readiness {
    pub fn delay_ms(ms: u64) -> Self {
        Readiness::Delay(Duration::from_millis(ms))
    }

    pub fn predicate(script: impl Into<String>, timeout: Duration) -> Self {
        Readiness::Predicate {
            script: script.into(),
            timeout,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Addresses zero or more elements: a CSS selector plus an optional text filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    pub selector: String,
    pub has_text: Option<String>,
}

impl Locator {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            has_text: None,
        }
    }

    /// Keep only matches whose text content contains `text`
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.has_text = Some(text.into());
        self
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.has_text {
            Some(text) => write!(f, "{} [has text {:?}]", self.selector, text),
            None => f.write_str(&self.selector),
        }
    }
}

/// A point in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Element geometry in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Detached or collapsed elements report an empty box
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Launches browser sessions
#[async_trait]
pub trait AutomationEngine: Send {
    type Session: PageSession;

    /// Start a browser with a single page context
    async fn launch(&mut self, options: &LaunchOptions) -> EngineResult<Self::Session>;
}

/// One live browser plus one page. Consumed by [`PageSession::close`].
#[async_trait]
pub trait PageSession: Send + Sized {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> EngineResult<()>;

    /// Wait for the page to settle; `false` means a predicate timed out
    async fn wait_ready(&mut self, readiness: &Readiness) -> EngineResult<bool>;

    async fn title(&mut self) -> EngineResult<String>;

    async fn set_viewport(&mut self, width: u32, height: u32) -> EngineResult<()>;

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> EngineResult<()>;

    async fn count(&mut self, locator: &Locator) -> EngineResult<usize>;

    /// Text of the first match, `None` when nothing matches
    async fn text_content(&mut self, locator: &Locator) -> EngineResult<Option<String>>;

    /// Geometry of the first match, `None` when nothing matches
    async fn bounding_box(&mut self, locator: &Locator) -> EngineResult<Option<BoundingBox>>;

    /// Computed style property of the first match
    async fn computed_style(&mut self, locator: &Locator, property: &str) -> EngineResult<String>;

    async fn pointer_move(&mut self, to: Point) -> EngineResult<()>;

    async fn pointer_down(&mut self, at: Point) -> EngineResult<()>;

    async fn pointer_up(&mut self, at: Point) -> EngineResult<()>;

    /// Release the browser. The session cannot be used afterwards.
    async fn close(self) -> EngineResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_center() {
        let bbox = BoundingBox::new(100.0, 100.0, 400.0, 400.0);
        assert_eq!(bbox.center(), Point::new(300.0, 300.0));
        assert!(!bbox.is_empty());
        assert!(BoundingBox::new(10.0, 10.0, 0.0, 20.0).is_empty());
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("h1").to_string(), "h1");
        assert_eq!(
            Locator::css(".dial-info p").with_text("Current Rotation").to_string(),
            ".dial-info p [has text \"Current Rotation\"]"
        );
    }
}
