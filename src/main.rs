use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use ui_verify::config::{self, Config, parse_viewport_size};
use ui_verify::engine::ChromiumEngine;
use ui_verify::harness::{HarnessError, HarnessResult, Orchestrator};

/// UI Verify - scripted verification of a live web application
#[derive(Parser, Debug)]
#[command(
    name = "ui-verify",
    about = "Verify a live web app with structural checks, a drag and responsive screenshots",
    after_help = "ENVIRONMENT VARIABLES:\n\
        UI_VERIFY_URL                     Page under test\n\
        UI_VERIFY_DESKTOP_SCREENSHOT      Desktop screenshot path\n\
        UI_VERIFY_MOBILE_SCREENSHOT       Mobile screenshot path\n\
        UI_VERIFY_DESKTOP_SIZE            Initial viewport size\n\
        UI_VERIFY_MOBILE_SIZE             Responsive campaign viewport size\n\
        UI_VERIFY_SETTLE_MS               Readiness budget after navigation (ms)\n\
        UI_VERIFY_INTERACTION_SETTLE_MS   Wait after the drag (ms)\n\
        UI_VERIFY_VIEWPORT_SETTLE_MS      Wait after resizing (ms)\n\
        UI_VERIFY_NAV_TIMEOUT_SECS        Engine operation timeout (s)\n\
        UI_VERIFY_DRAG_OFFSET             Horizontal drag distance (px)\n\
        UI_VERIFY_CHROME                  Chromium executable\n\
        UI_VERIFY_HEADED                  Set to 1 to show the browser\n\
        RUST_LOG                          Log filter (default: info)"
)]
struct Args {
    /// Page under test
    #[arg(long)]
    url: Option<String>,

    /// Desktop screenshot path
    #[arg(long)]
    desktop_screenshot: Option<PathBuf>,

    /// Mobile screenshot path
    #[arg(long)]
    mobile_screenshot: Option<PathBuf>,

    /// Initial viewport: desktop (1200x800), tablet (768x1024), mobile (375x667), or WxH
    #[arg(long)]
    desktop_size: Option<String>,

    /// Responsive campaign viewport: desktop, tablet, mobile, or WxH
    #[arg(long)]
    mobile_size: Option<String>,

    /// Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headed: bool,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn apply_args(mut config: Config, args: Args) -> HarnessResult<Config> {
    if let Some(url) = args.url {
        config.url = url;
    }
    if let Some(path) = args.desktop_screenshot {
        config.desktop_screenshot = path;
    }
    if let Some(path) = args.mobile_screenshot {
        config.mobile_screenshot = path;
    }
    if let Some(size) = args.desktop_size {
        config.desktop_size = parse_viewport_size(&size).ok_or_else(|| invalid_size(&size))?;
    }
    if let Some(size) = args.mobile_size {
        config.mobile_size = parse_viewport_size(&size).ok_or_else(|| invalid_size(&size))?;
    }
    if args.chrome.is_some() {
        config.chrome = args.chrome;
    }
    config.headed |= args.headed;
    Ok(config)
}

fn invalid_size(size: &str) -> HarnessError {
    HarnessError::Config(format!(
        "viewport size '{}' is not one of desktop, tablet, mobile, or WxH (e.g., 1280x720)",
        size
    ))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = match apply_args(config::get().clone(), args) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(step = err.step_label(), error = %err, "Refusing to start");
            return ExitCode::from(2);
        }
    };

    let orchestrator = Orchestrator::new(config.run_plan());
    let mut engine = ChromiumEngine::new();
    let report = orchestrator.run(&mut engine).await;

    println!("{}", report.summary());
    ExitCode::from(report.outcome().exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_arguments_keeps_config() {
        let args = Args::parse_from(["ui-verify"]);
        let config = apply_args(Config::defaults(), args).unwrap();
        assert_eq!(config, Config::defaults());
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "ui-verify",
            "--url",
            "http://localhost:3000/",
            "--mobile-size",
            "tablet",
            "--headed",
        ]);
        let config = apply_args(Config::defaults(), args).unwrap();
        assert_eq!(config.url, "http://localhost:3000/");
        assert_eq!(config.mobile_size, (768, 1024));
        assert!(config.headed);
    }

    #[test]
    fn test_invalid_size_rejected() {
        let args = Args::parse_from(["ui-verify", "--desktop-size", "big"]);
        let err = apply_args(Config::defaults(), args).unwrap_err();
        assert!(matches!(err, HarnessError::Config(ref msg) if msg.contains("'big'")));
        assert_eq!(err.step_label(), "configuration");
    }
}
