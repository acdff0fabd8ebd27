//! UI Verify - scripted verification of a live web application.
//!
//! This crate provides:
//! - An automation engine abstraction with a headless Chromium backend
//! - A fixed, ordered suite of structural, text and style checks
//! - A pointer drag simulator for canvas-style interactive surfaces
//! - A responsive-layout campaign that re-captures under a mobile viewport
//! - An orchestrator that separates soft failures from hard ones and always
//!   releases the browser session
//!
//! # Example
//!
//! ```rust,no_run
//! use ui_verify::config::Config;
//! use ui_verify::engine::ChromiumEngine;
//! use ui_verify::harness::Orchestrator;
//!
//! # async fn run() {
//! let plan = Config::from_env().run_plan();
//! let mut engine = ChromiumEngine::new();
//! let report = Orchestrator::new(plan).run(&mut engine).await;
//! println!("{}", report.summary());
//! std::process::exit(i32::from(report.outcome().exit_code()));
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod harness;
pub mod runner;
pub mod session;

// Re-export configuration
pub use config::{Config, RunPlan};

// Re-export engine types
pub use engine::{
    AutomationEngine, BoundingBox, ChromiumEngine, EngineError, EngineResult, LaunchOptions,
    Locator, PageSession, Point, Readiness, WaitPolicy,
};

// Re-export harness types
pub use harness::{
    CheckOutcome, CheckResult, CheckSpec, HarnessError, HarnessResult, Interaction, Orchestrator,
    RunOutcome, Verdict, ViewportProfile,
};

// Re-export run aggregation and session lifecycle
pub use runner::{RunReport, StepFailure};
pub use session::with_session;
