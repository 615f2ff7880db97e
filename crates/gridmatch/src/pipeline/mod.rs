//! The `matchGrid` stage pipeline.
//!
//! Linear state machine, each state timed in the report:
//! load -> sort -> estimate -> walk -> index -> partition -> calibrate -> undistort.
//!
//! Failures before calibration abort the stage with every independent cause
//! joined into one message. Calibration failures are reported the same way
//! and skip undistortion; the diagnostics gathered so far stay in the report.

mod candidates;
mod config;
mod error;
mod result;
mod run;

pub use candidates::load_candidates;
pub use config::MatchGridConfig;
pub use error::MatchGridError;
pub use result::{CalibrationReport, MatchGridReport, MatchedRect, StageTiming, TimingBreakdown};

pub(crate) use run::run;
