//! Chromium backend over the DevTools protocol.
//!
//! DOM observations are small generated scripts evaluated in the page. The
//! selector and text filter are JSON-encoded into the script, and every
//! script answers with `{ count, value }` so an absent element (`value: null`)
//! is never confused with an evaluation failure.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::network::{
    EventLoadingFailed, EventLoadingFinished, EventRequestWillBeSent,
};
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::listeners::EventStream;
use chromiumoxide::page::{Page, ScreenshotParams};
use futures::StreamExt;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{
    AutomationEngine, BoundingBox, EngineError, EngineResult, LaunchOptions, Locator, PageSession,
    Point, Readiness, WaitPolicy,
};

/// How long no request may be in flight to call the network idle
const NETWORK_IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Viewports narrower than this are emulated as mobile devices
const MOBILE_BREAKPOINT: u32 = 600;

/// Launches headless Chromium
#[derive(Debug, Default)]
pub struct ChromiumEngine;

impl ChromiumEngine {
    pub fn new() -> Self {
        Self
    }
}

/// A running Chromium process and the single page the run works against
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    operation_timeout: Duration,
    pointer_pressed: bool,
}

#[derive(Debug, Deserialize)]
struct Probe<T> {
    count: usize,
    value: Option<T>,
}

#[async_trait]
impl AutomationEngine for ChromiumEngine {
    type Session = ChromiumSession;

    async fn launch(&mut self, options: &LaunchOptions) -> EngineResult<ChromiumSession> {
        let mut builder = BrowserConfig::builder()
            .window_size(options.viewport_width, options.viewport_height)
            .viewport(Viewport {
                width: options.viewport_width,
                height: options.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(options.operation_timeout);

        if options.disable_sandbox {
            builder = builder.no_sandbox().arg("--disable-setuid-sandbox");
        }
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(executable) = &options.executable {
            builder = builder.chrome_executable(executable);
        }

        let config = builder.build().map_err(EngineError::Launch)?;
        let (browser, mut handler) = Browser::launch(config).await?;

        // The handler stream must be polled for any command to make progress
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "browser handler stopped");
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        debug!(
            width = options.viewport_width,
            height = options.viewport_height,
            headless = options.headless,
            "chromium session started"
        );

        Ok(ChromiumSession {
            browser,
            page,
            handler,
            operation_timeout: options.operation_timeout,
            pointer_pressed: false,
        })
    }
}

impl ChromiumSession {
    async fn dispatch_mouse(
        &mut self,
        kind: DispatchMouseEventType,
        at: Point,
    ) -> EngineResult<()> {
        let buttons = if self.pointer_pressed { 1 } else { 0 };
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(at.x)
            .y(at.y)
            .button(MouseButton::Left)
            .buttons(buttons)
            .click_count(1)
            .build()
            .map_err(EngineError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }
}

async fn evaluate<T: DeserializeOwned>(page: &Page, script: String) -> EngineResult<T> {
    let result = page.evaluate(script).await?;
    Ok(result.into_value::<T>()?)
}

async fn probe<T: DeserializeOwned>(
    page: &Page,
    locator: &Locator,
    body: &str,
) -> EngineResult<Probe<T>> {
    let script = locate_script(locator, body)?;
    evaluate(page, script).await
}

/// In-flight request tracking over the Network domain events
struct NetworkTracker {
    sent: EventStream<EventRequestWillBeSent>,
    finished: EventStream<EventLoadingFinished>,
    failed: EventStream<EventLoadingFailed>,
}

impl NetworkTracker {
    /// Subscribe before navigating so requests issued during the load are seen
    async fn attach(page: &Page) -> EngineResult<Self> {
        Ok(Self {
            sent: page.event_listener::<EventRequestWillBeSent>().await?,
            finished: page.event_listener::<EventLoadingFinished>().await?,
            failed: page.event_listener::<EventLoadingFailed>().await?,
        })
    }

    /// Resolve once no request has been in flight for [`NETWORK_IDLE_WINDOW`]
    async fn wait_idle(mut self, timeout: Duration) -> EngineResult<()> {
        let deadline = Instant::now() + timeout;
        let mut in_flight = IdleState::default();

        loop {
            let now = Instant::now();
            if in_flight.is_idle(now) {
                return Ok(());
            }
            if now >= deadline {
                return Err(EngineError::Timeout(timeout));
            }
            let wake = in_flight.idle_at().map_or(deadline, |at| at.min(deadline));

            tokio::select! {
                Some(event) = self.sent.next() => in_flight.started(event.request_id.inner()),
                Some(event) = self.finished.next() => {
                    in_flight.ended(event.request_id.inner(), Instant::now())
                }
                Some(event) = self.failed.next() => {
                    in_flight.ended(event.request_id.inner(), Instant::now())
                }
                _ = tokio::time::sleep_until(wake) => {}
            }
        }
    }
}

/// Requests still pending and when the page last went quiet
#[derive(Debug)]
struct IdleState {
    pending: HashSet<String>,
    quiet_since: Instant,
}

impl Default for IdleState {
    fn default() -> Self {
        Self {
            pending: HashSet::new(),
            quiet_since: Instant::now(),
        }
    }
}

impl IdleState {
    fn started(&mut self, request_id: &str) {
        // Redirects reuse the request id
        self.pending.insert(request_id.to_string());
    }

    fn ended(&mut self, request_id: &str, at: Instant) {
        if self.pending.remove(request_id) && self.pending.is_empty() {
            self.quiet_since = at;
        }
    }

    /// When the idle window elapses, if nothing is pending
    fn idle_at(&self) -> Option<Instant> {
        self.pending
            .is_empty()
            .then(|| self.quiet_since + NETWORK_IDLE_WINDOW)
    }

    fn is_idle(&self, now: Instant) -> bool {
        self.idle_at().is_some_and(|at| now >= at)
    }
}

/// Build a script that resolves `locator` and evaluates `body` against the
/// first match, bound to `el` (or `null`).
fn locate_script(locator: &Locator, body: &str) -> EngineResult<String> {
    let selector = serde_json::to_string(&locator.selector)?;
    let has_text = serde_json::to_string(&locator.has_text)?;
    Ok(format!(
        r#"(() => {{
    const hasText = {has_text};
    const matches = Array.from(document.querySelectorAll({selector}))
        .filter((node) => hasText === null || (node.textContent || '').includes(hasText));
    const el = matches.length > 0 ? matches[0] : null;
    return {{ count: matches.length, value: {body} }};
}})()"#
    ))
}

#[async_trait]
impl PageSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, wait: WaitPolicy) -> EngineResult<()> {
        debug!(url, ?wait, "navigating");
        let tracker = match wait {
            WaitPolicy::NetworkIdle => Some(NetworkTracker::attach(&self.page).await?),
            WaitPolicy::Load => None,
        };
        self.page.goto(url).await?;
        if let Some(tracker) = tracker {
            tracker.wait_idle(self.operation_timeout).await?;
        }
        Ok(())
    }

    async fn wait_ready(&mut self, readiness: &Readiness) -> EngineResult<bool> {
        match readiness {
            Readiness::Delay(duration) => {
                tokio::time::sleep(*duration).await;
                Ok(true)
            }
            Readiness::Predicate {
                script,
                timeout,
                poll_interval,
            } => {
                let started = Instant::now();
                let check = format!("Boolean({})", script);
                loop {
                    let ready: bool = evaluate(&self.page, check.clone()).await?;
                    if ready {
                        return Ok(true);
                    }
                    if started.elapsed() >= *timeout {
                        return Ok(false);
                    }
                    tokio::time::sleep(*poll_interval).await;
                }
            }
        }
    }

    async fn title(&mut self) -> EngineResult<String> {
        Ok(self.page.get_title().await?.unwrap_or_default())
    }

    async fn set_viewport(&mut self, width: u32, height: u32) -> EngineResult<()> {
        let params = SetDeviceMetricsOverrideParams::builder()
            .width(i64::from(width))
            .height(i64::from(height))
            .device_scale_factor(1.0)
            .mobile(width < MOBILE_BREAKPOINT)
            .build()
            .map_err(EngineError::Protocol)?;
        self.page.execute(params).await?;
        Ok(())
    }

    async fn screenshot(&mut self, path: &Path, full_page: bool) -> EngineResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| EngineError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        let params = ScreenshotParams::builder().full_page(full_page).build();
        let bytes = self.page.save_screenshot(params, path).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "screenshot saved");
        Ok(())
    }

    async fn count(&mut self, locator: &Locator) -> EngineResult<usize> {
        let probe: Probe<serde_json::Value> = probe(&self.page, locator, "null").await?;
        Ok(probe.count)
    }

    async fn text_content(&mut self, locator: &Locator) -> EngineResult<Option<String>> {
        let probe: Probe<String> = probe(&self.page, locator, "el ? el.textContent : null").await?;
        Ok(probe.value)
    }

    async fn bounding_box(&mut self, locator: &Locator) -> EngineResult<Option<BoundingBox>> {
        let body = "el ? (() => { const r = el.getBoundingClientRect(); \
                    return { x: r.x, y: r.y, width: r.width, height: r.height }; })() : null";
        let probe: Probe<BoundingBox> = probe(&self.page, locator, body).await?;
        Ok(probe.value)
    }

    async fn computed_style(&mut self, locator: &Locator, property: &str) -> EngineResult<String> {
        let property = serde_json::to_string(property)?;
        let body = format!("el ? getComputedStyle(el).getPropertyValue({}) : null", property);
        let probe: Probe<String> = probe(&self.page, locator, &body).await?;
        Ok(probe.value.unwrap_or_default())
    }

    async fn pointer_move(&mut self, to: Point) -> EngineResult<()> {
        self.dispatch_mouse(DispatchMouseEventType::MouseMoved, to).await
    }

    async fn pointer_down(&mut self, at: Point) -> EngineResult<()> {
        self.pointer_pressed = true;
        self.dispatch_mouse(DispatchMouseEventType::MousePressed, at).await
    }

    async fn pointer_up(&mut self, at: Point) -> EngineResult<()> {
        self.pointer_pressed = false;
        self.dispatch_mouse(DispatchMouseEventType::MouseReleased, at).await
    }

    async fn close(mut self) -> EngineResult<()> {
        let closed = self.browser.close().await;
        if let Err(err) = self.browser.wait().await {
            warn!(error = %err, "browser process did not exit cleanly");
        }
        self.handler.abort();
        closed?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_script_escapes_selector_and_filter() {
        let locator = Locator::css("a[title=\"x\"]").with_text("it's");
        let script = locate_script(&locator, "null").unwrap();
        assert!(script.contains(r#"document.querySelectorAll("a[title=\"x\"]")"#));
        assert!(script.contains(r#"const hasText = "it's";"#));
    }

    #[test]
    fn test_locate_script_without_filter() {
        let script = locate_script(&Locator::css("h1"), "el ? el.textContent : null").unwrap();
        assert!(script.contains("const hasText = null;"));
        assert!(script.contains("value: el ? el.textContent : null"));
    }

    #[test]
    fn test_idle_once_quiet_window_elapses() {
        let state = IdleState::default();
        let start = state.quiet_since;
        assert!(!state.is_idle(start));
        assert!(state.is_idle(start + NETWORK_IDLE_WINDOW));
    }

    #[test]
    fn test_pending_request_is_never_idle() {
        let mut state = IdleState::default();
        let start = state.quiet_since;
        state.started("wasm-bundle");
        assert_eq!(state.idle_at(), None);
        assert!(!state.is_idle(start + Duration::from_secs(60)));
    }

    #[test]
    fn test_last_request_end_restarts_quiet_window() {
        let mut state = IdleState::default();
        let start = state.quiet_since;
        state.started("a");
        state.started("b");

        let first_done = start + Duration::from_secs(1);
        state.ended("a", first_done);
        assert!(!state.is_idle(first_done + NETWORK_IDLE_WINDOW));

        let all_done = start + Duration::from_secs(2);
        state.ended("b", all_done);
        assert!(!state.is_idle(all_done));
        assert!(state.is_idle(all_done + NETWORK_IDLE_WINDOW));
    }

    #[test]
    fn test_unknown_request_end_is_ignored() {
        let mut state = IdleState::default();
        let start = state.quiet_since;
        state.ended("from-before-subscribe", start + Duration::from_secs(5));
        assert_eq!(state.idle_at(), Some(start + NETWORK_IDLE_WINDOW));
    }

    #[test]
    fn test_probe_accepts_null_value() {
        let probe: Probe<String> = serde_json::from_str(r#"{"count":0,"value":null}"#).unwrap();
        assert_eq!(probe.count, 0);
        assert!(probe.value.is_none());
    }
}
