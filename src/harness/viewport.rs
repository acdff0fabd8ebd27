//! Screenshot capture and the responsive-layout campaign.

use std::path::Path;
use tracing::{info, warn};

use crate::engine::{EngineResult, PageSession, Readiness};
use crate::harness::types::{Artifact, ViewportProfile};

/// Capture a full-page screenshot to the profile's artifact path at the
/// current viewport
pub async fn capture<S: PageSession>(
    session: &mut S,
    profile: &ViewportProfile,
) -> EngineResult<Artifact> {
    session.screenshot(&profile.artifact, true).await?;

    let dimensions = probe_dimensions(&profile.artifact);
    match dimensions {
        Some((width, height)) => info!(
            profile = %profile.name,
            path = %profile.artifact.display(),
            width,
            height,
            "Screenshot saved"
        ),
        None => warn!(
            profile = %profile.name,
            path = %profile.artifact.display(),
            "Screenshot written but could not be read back"
        ),
    }

    Ok(Artifact {
        profile: profile.name.clone(),
        path: profile.artifact.clone(),
        dimensions,
    })
}

/// Resize to `profile`, wait for the layout to re-flow, then capture.
///
/// Only a successful capture is verified here; the check suite is not re-run.
pub async fn run_profile<S: PageSession>(
    session: &mut S,
    profile: &ViewportProfile,
    settle: &Readiness,
) -> EngineResult<Artifact> {
    info!(
        profile = %profile.name,
        width = profile.width,
        height = profile.height,
        "Resizing viewport"
    );
    session.set_viewport(profile.width, profile.height).await?;
    if !session.wait_ready(settle).await? {
        warn!(profile = %profile.name, "layout did not report ready after resize");
    }
    capture(session, profile).await
}

fn probe_dimensions(path: &Path) -> Option<(u32, u32)> {
    image::image_dimensions(path).ok()
}
