//! Configuration management with environment variable support.
//!
//! This module provides centralized configuration for ui-verify, supporting:
//! - Environment variables for all configurable values
//! - Defaults matching the target application's local dev server
//! - Builder-style overrides from the command line
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `UI_VERIFY_URL` | Page under test | `http://127.0.0.1:8083/` |
//! | `UI_VERIFY_DESKTOP_SCREENSHOT` | Desktop screenshot path | `test-screenshot.png` |
//! | `UI_VERIFY_MOBILE_SCREENSHOT` | Mobile screenshot path | `test-screenshot-mobile.png` |
//! | `UI_VERIFY_DESKTOP_SIZE` | Initial viewport | `desktop` (1200x800) |
//! | `UI_VERIFY_MOBILE_SIZE` | Responsive campaign viewport | `mobile` (375x667) |
//! | `UI_VERIFY_SETTLE_MS` | Budget for the page to become ready | `3000` |
//! | `UI_VERIFY_INTERACTION_SETTLE_MS` | Wait after the drag gesture | `1000` |
//! | `UI_VERIFY_VIEWPORT_SETTLE_MS` | Wait after resizing | `1000` |
//! | `UI_VERIFY_NAV_TIMEOUT_SECS` | Engine operation timeout | `30` |
//! | `UI_VERIFY_DRAG_OFFSET` | Horizontal drag distance (CSS px) | `50` |
//! | `UI_VERIFY_CHROME` | Chromium executable | auto-detect |
//! | `UI_VERIFY_HEADED` | `1` to show the browser window | unset |

use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::engine::{LaunchOptions, Locator, Readiness, WaitPolicy};
use crate::harness::checks::DIAL_CANVAS;
use crate::harness::types::ViewportProfile;

// ============================================================================
// Default Values
// ============================================================================

pub const DEFAULT_URL: &str = "http://127.0.0.1:8083/";

pub const DEFAULT_DESKTOP_SCREENSHOT: &str = "test-screenshot.png";

pub const DEFAULT_MOBILE_SCREENSHOT: &str = "test-screenshot-mobile.png";

/// Default readiness budget after navigation (milliseconds)
pub const DEFAULT_SETTLE_MS: u64 = 3000;

/// Default wait after the drag gesture (milliseconds)
pub const DEFAULT_INTERACTION_SETTLE_MS: u64 = 1000;

/// Default wait after a viewport resize (milliseconds)
pub const DEFAULT_VIEWPORT_SETTLE_MS: u64 = 1000;

/// Default engine operation timeout (seconds)
pub const DEFAULT_NAV_TIMEOUT_SECS: u64 = 30;

/// Default horizontal drag distance (CSS pixels)
pub const DEFAULT_DRAG_OFFSET: f64 = 50.0;

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_URL: &str = "UI_VERIFY_URL";

pub const ENV_DESKTOP_SCREENSHOT: &str = "UI_VERIFY_DESKTOP_SCREENSHOT";

pub const ENV_MOBILE_SCREENSHOT: &str = "UI_VERIFY_MOBILE_SCREENSHOT";

pub const ENV_DESKTOP_SIZE: &str = "UI_VERIFY_DESKTOP_SIZE";

pub const ENV_MOBILE_SIZE: &str = "UI_VERIFY_MOBILE_SIZE";

pub const ENV_SETTLE_MS: &str = "UI_VERIFY_SETTLE_MS";

pub const ENV_INTERACTION_SETTLE_MS: &str = "UI_VERIFY_INTERACTION_SETTLE_MS";

pub const ENV_VIEWPORT_SETTLE_MS: &str = "UI_VERIFY_VIEWPORT_SETTLE_MS";

pub const ENV_NAV_TIMEOUT_SECS: &str = "UI_VERIFY_NAV_TIMEOUT_SECS";

pub const ENV_DRAG_OFFSET: &str = "UI_VERIFY_DRAG_OFFSET";

pub const ENV_CHROME: &str = "UI_VERIFY_CHROME";

pub const ENV_HEADED: &str = "UI_VERIFY_HEADED";

/// The page is ready once the document finished loading, the app has mounted
/// either the dial canvas or its error display, and the spinner is gone
pub const READY_SCRIPT: &str = "document.readyState === 'complete' \
    && document.querySelector('canvas.astrology-dial, .error-display') !== null \
    && !document.querySelector('.loading-spinner')";

// ============================================================================
// Configuration
// ============================================================================

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Get the global configuration (initialized from environment on first access)
pub fn get() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Everything a run needs to know
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Page under test
    pub url: String,
    pub desktop_screenshot: PathBuf,
    pub mobile_screenshot: PathBuf,
    /// Initial viewport (width, height)
    pub desktop_size: (u32, u32),
    /// Responsive campaign viewport (width, height)
    pub mobile_size: (u32, u32),
    pub settle_ms: u64,
    pub interaction_settle_ms: u64,
    pub viewport_settle_ms: u64,
    pub nav_timeout_secs: u64,
    pub drag_offset: f64,
    pub chrome: Option<PathBuf>,
    pub headed: bool,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = Self::defaults();
        Self {
            url: env::var(ENV_URL).unwrap_or(defaults.url),
            desktop_screenshot: env::var(ENV_DESKTOP_SCREENSHOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.desktop_screenshot),
            mobile_screenshot: env::var(ENV_MOBILE_SCREENSHOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.mobile_screenshot),
            desktop_size: env::var(ENV_DESKTOP_SIZE)
                .ok()
                .and_then(|s| parse_viewport_size(&s))
                .unwrap_or(defaults.desktop_size),
            mobile_size: env::var(ENV_MOBILE_SIZE)
                .ok()
                .and_then(|s| parse_viewport_size(&s))
                .unwrap_or(defaults.mobile_size),
            settle_ms: env_parse(ENV_SETTLE_MS).unwrap_or(defaults.settle_ms),
            interaction_settle_ms: env_parse(ENV_INTERACTION_SETTLE_MS)
                .unwrap_or(defaults.interaction_settle_ms),
            viewport_settle_ms: env_parse(ENV_VIEWPORT_SETTLE_MS)
                .unwrap_or(defaults.viewport_settle_ms),
            nav_timeout_secs: env_parse(ENV_NAV_TIMEOUT_SECS).unwrap_or(defaults.nav_timeout_secs),
            drag_offset: env_parse(ENV_DRAG_OFFSET).unwrap_or(defaults.drag_offset),
            chrome: env::var(ENV_CHROME).ok().map(PathBuf::from),
            headed: env::var(ENV_HEADED).is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            desktop_screenshot: PathBuf::from(DEFAULT_DESKTOP_SCREENSHOT),
            mobile_screenshot: PathBuf::from(DEFAULT_MOBILE_SCREENSHOT),
            desktop_size: (1200, 800),
            mobile_size: (375, 667),
            settle_ms: DEFAULT_SETTLE_MS,
            interaction_settle_ms: DEFAULT_INTERACTION_SETTLE_MS,
            viewport_settle_ms: DEFAULT_VIEWPORT_SETTLE_MS,
            nav_timeout_secs: DEFAULT_NAV_TIMEOUT_SECS,
            drag_offset: DEFAULT_DRAG_OFFSET,
            chrome: None,
            headed: false,
        }
    }

    pub fn launch_options(&self) -> LaunchOptions {
        let (width, height) = self.desktop_size;
        LaunchOptions {
            headless: !self.headed,
            disable_sandbox: true,
            viewport_width: width,
            viewport_height: height,
            operation_timeout: Duration::from_secs(self.nav_timeout_secs),
            executable: self.chrome.clone(),
        }
    }

    pub fn desktop_profile(&self) -> ViewportProfile {
        let (width, height) = self.desktop_size;
        ViewportProfile::new("desktop", width, height, &self.desktop_screenshot)
    }

    pub fn mobile_profile(&self) -> ViewportProfile {
        let (width, height) = self.mobile_size;
        ViewportProfile::new("mobile", width, height, &self.mobile_screenshot)
    }

    /// Everything the orchestrator consumes, resolved from this configuration
    pub fn run_plan(&self) -> RunPlan {
        RunPlan {
            url: self.url.clone(),
            wait: WaitPolicy::NetworkIdle,
            launch: self.launch_options(),
            initial_ready: Readiness::predicate(
                READY_SCRIPT,
                Duration::from_millis(self.settle_ms),
            ),
            interaction_settle: Readiness::delay_ms(self.interaction_settle_ms),
            viewport_settle: Readiness::delay_ms(self.viewport_settle_ms),
            interaction_target: Locator::css(DIAL_CANVAS),
            drag_offset: self.drag_offset,
            desktop: self.desktop_profile(),
            mobile: self.mobile_profile(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Resolved inputs of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct RunPlan {
    pub url: String,
    pub wait: WaitPolicy,
    pub launch: LaunchOptions,
    /// Readiness after navigation, before any check
    pub initial_ready: Readiness,
    /// Settle after the drag gesture
    pub interaction_settle: Readiness,
    /// Settle after a viewport resize
    pub viewport_settle: Readiness,
    pub interaction_target: Locator,
    pub drag_offset: f64,
    pub desktop: ViewportProfile,
    pub mobile: ViewportProfile,
}

// ============================================================================
// Helper Functions
// ============================================================================

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

/// Parse a viewport size string into (width, height)
/// Supports: "desktop" (1200x800), "tablet" (768x1024), "mobile" (375x667), or "WxH"
pub fn parse_viewport_size(size: &str) -> Option<(u32, u32)> {
    match size.trim().to_lowercase().as_str() {
        "desktop" => Some((1200, 800)),
        "tablet" => Some((768, 1024)),
        "mobile" => Some((375, 667)),
        custom => {
            let (w, h) = custom.split_once('x')?;
            let w: u32 = w.parse().ok()?;
            let h: u32 = h.parse().ok()?;
            (w > 0 && h > 0).then_some((w, h))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::checks::{DIAL_CANVAS, ERROR_DISPLAY, LOADING_SPINNER};

    #[test]
    fn test_parse_viewport_size_presets() {
        assert_eq!(parse_viewport_size("desktop"), Some((1200, 800)));
        assert_eq!(parse_viewport_size("Tablet"), Some((768, 1024)));
        assert_eq!(parse_viewport_size("mobile"), Some((375, 667)));
    }

    #[test]
    fn test_parse_viewport_size_custom() {
        assert_eq!(parse_viewport_size("1920x1080"), Some((1920, 1080)));
        assert_eq!(parse_viewport_size("375x667"), Some((375, 667)));
    }

    #[test]
    fn test_parse_viewport_size_invalid() {
        assert_eq!(parse_viewport_size("huge"), None);
        assert_eq!(parse_viewport_size("100"), None);
        assert_eq!(parse_viewport_size("0x100"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = Config::defaults();
        assert_eq!(config.url, DEFAULT_URL);
        assert_eq!(config.desktop_size, (1200, 800));
        assert_eq!(config.mobile_size, (375, 667));
        assert!(!config.headed);
    }

    #[test]
    fn test_run_plan_from_defaults() {
        let plan = Config::defaults().run_plan();
        assert_eq!(plan.launch.viewport_width, 1200);
        assert!(plan.launch.headless);
        assert_eq!(plan.mobile.width, 375);
        assert_eq!(plan.mobile.artifact, PathBuf::from(DEFAULT_MOBILE_SCREENSHOT));
        assert_eq!(plan.interaction_settle, Readiness::delay_ms(1000));
        assert!(READY_SCRIPT.contains(LOADING_SPINNER));
    }

    #[test]
    fn test_ready_script_requires_mounted_app() {
        // An empty body has no spinner either, so absence alone is not enough
        let mount = format!(
            "document.querySelector('{}, {}') !== null",
            DIAL_CANVAS, ERROR_DISPLAY
        );
        assert!(READY_SCRIPT.contains(&mount));
        assert!(READY_SCRIPT.starts_with("document.readyState === 'complete'"));
    }
}
