pub mod checks;
pub mod interaction;
pub mod orchestrator;
pub mod types;
pub mod viewport;

pub use checks::run_check;
pub use interaction::simulate;
pub use orchestrator::Orchestrator;
pub use types::{
    Artifact, CheckOutcome, CheckResult, CheckSpec, Expect, Gesture, HarnessError, HarnessResult,
    Interaction, Observation, ObservationKind, RunOutcome, Verdict, ViewportProfile,
};
pub use viewport::{capture, run_profile};
