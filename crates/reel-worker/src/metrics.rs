//! Pipeline metrics.

use metrics::{counter, histogram};

pub mod names {
    /// Stage wall time in seconds by stage and outcome.
    pub const STAGE_DURATION_SECONDS: &str = "reel_stage_duration_seconds";

    /// Pipeline runs by outcome (`completed`, `empty`, `failed`).
    pub const RUNS_TOTAL: &str = "reel_runs_total";
}

pub fn record_stage(stage: &'static str, ok: bool, seconds: f64) {
    histogram!(
        names::STAGE_DURATION_SECONDS,
        "stage" => stage,
        "outcome" => if ok { "ok" } else { "error" }
    )
    .record(seconds);
}

pub fn record_run(outcome: &'static str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
}
