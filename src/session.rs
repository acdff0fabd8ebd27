//! Scoped browser session lifecycle.
//!
//! A run owns exactly one session. [`with_session`] acquires it, hands it to
//! the run body, and releases it once the body returns, whatever the body's
//! outcome. Release happens in one place only; the body never closes the
//! session itself.

use tracing::{info, warn};

use crate::engine::{AutomationEngine, LaunchOptions, PageSession};
use crate::harness::types::{HarnessError, HarnessResult};

/// Launch a session, run `body` against it, then close it.
///
/// Fails only when the session cannot be launched. A close error is logged
/// and does not override the body's output.
pub async fn with_session<E, T, F>(
    engine: &mut E,
    options: &LaunchOptions,
    body: F,
) -> HarnessResult<T>
where
    E: AutomationEngine,
    F: AsyncFnOnce(&mut E::Session) -> T,
{
    let mut session = engine
        .launch(options)
        .await
        .map_err(|err| HarnessError::step("launch browser", err))?;
    info!(
        width = options.viewport_width,
        height = options.viewport_height,
        headless = options.headless,
        "Browser session acquired"
    );

    let output = body(&mut session).await;

    match session.close().await {
        Ok(()) => info!("Browser session released"),
        Err(err) => warn!(error = %err, "Browser session did not close cleanly"),
    }
    Ok(output)
}
