//! Run orchestration.
//!
//! Steps run strictly in order against one session:
//! 1. page metadata checks
//! 2. structural presence checks
//! 3. desktop screenshot
//! 4. drag interaction
//! 5. dynamic text checks
//! 6. computed-style checks
//! 7. mobile viewport campaign with its own screenshot
//!
//! Soft failures are recorded and the run moves on. The first engine error
//! aborts the remaining steps. Either way the session is released before
//! the report is returned.

use tracing::{error, info, warn};

use crate::config::RunPlan;
use crate::engine::{AutomationEngine, PageSession, Readiness};
use crate::harness::checks::{self, run_check};
use crate::harness::interaction::simulate;
use crate::harness::types::{CheckOutcome, CheckSpec, HarnessError, HarnessResult};
use crate::harness::viewport::{capture, run_profile};
use crate::runner::RunReport;
use crate::session::with_session;

/// Sequences a whole verification run
#[derive(Debug, Clone)]
pub struct Orchestrator {
    plan: RunPlan,
}

impl Orchestrator {
    pub fn new(plan: RunPlan) -> Self {
        Self { plan }
    }

    /// Run every step against a fresh session from `engine`
    pub async fn run<E: AutomationEngine>(&self, engine: &mut E) -> RunReport {
        let mut report = RunReport::new(&self.plan.url);

        let result = with_session(engine, &self.plan.launch, async |session| {
            self.execute(session, &mut report).await
        })
        .await
        .and_then(|steps| steps);

        if let Err(err) = result {
            error!(step = err.step_label(), error = %err, "Run aborted");
            report.abort(&err);
        }
        report.finish();
        report
    }

    async fn execute<S: PageSession>(
        &self,
        session: &mut S,
        report: &mut RunReport,
    ) -> HarnessResult<()> {
        let plan = &self.plan;

        info!(url = %plan.url, "Navigating to target page");
        session
            .navigate(&plan.url, plan.wait)
            .await
            .map_err(|err| HarnessError::step("navigate", err))?;
        settle(session, &plan.initial_ready, "page load").await?;

        info!("Checking page metadata");
        self.run_checks(session, report, &checks::metadata_checks()).await?;

        info!("Checking for key elements");
        self.run_checks(session, report, &checks::structural_checks()).await?;

        info!("Taking desktop screenshot");
        let artifact = capture(session, &plan.desktop)
            .await
            .map_err(|err| HarnessError::step("desktop screenshot", err))?;
        report.record_artifact(artifact);

        info!("Testing pointer interaction");
        let interaction = simulate(session, &plan.interaction_target, plan.drag_offset)
            .await
            .map_err(|err| HarnessError::step("pointer interaction", err))?;
        report.interaction = Some(interaction);
        if interaction.performed() {
            settle(session, &plan.interaction_settle, "interaction").await?;
        }

        info!("Checking dynamic content");
        self.run_checks(session, report, &checks::dynamic_text_checks()).await?;

        info!("Checking visual styling");
        self.run_checks(session, report, &checks::style_checks()).await?;

        info!("Testing responsive layout");
        let artifact = run_profile(session, &plan.mobile, &plan.viewport_settle)
            .await
            .map_err(|err| HarnessError::step("mobile viewport", err))?;
        report.record_artifact(artifact);

        Ok(())
    }

    async fn run_checks<S: PageSession>(
        &self,
        session: &mut S,
        report: &mut RunReport,
        specs: &[CheckSpec],
    ) -> HarnessResult<()> {
        for spec in specs {
            let result = run_check(session, spec).await;
            let raised = match &result.outcome {
                CheckOutcome::Error(message) => Some(message.clone()),
                _ => None,
            };
            report.record_check(result);

            if let Some(message) = raised {
                return Err(HarnessError::Check {
                    step: spec.label.clone(),
                    message,
                });
            }
        }
        Ok(())
    }
}

async fn settle<S: PageSession>(
    session: &mut S,
    readiness: &Readiness,
    what: &str,
) -> HarnessResult<()> {
    let ready = session
        .wait_ready(readiness)
        .await
        .map_err(|err| HarnessError::step(format!("{} settle", what), err))?;
    if !ready {
        warn!(stage = what, "page did not signal readiness in time, continuing");
    }
    Ok(())
}
