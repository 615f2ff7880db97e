use crate::calibrate::CalibrationError;
use crate::matcher::AxisEstimationError;

/// Reasons the stage stops before producing a calibration.
#[derive(Debug, Clone, PartialEq)]
pub enum MatchGridError {
    /// `model` is empty.
    MissingModelName,
    /// The named stage is absent from the model (or not an object).
    StageNotInModel,
    /// The named stage has no `rects` array.
    MissingRects,
    /// Fewer than two rect entries.
    TooFewRects,
    /// Fewer than two entries with finite numeric `x` and `y`.
    TooFewPoints,
    InvalidConfig(String),
    /// One entry per failing axis, columns first.
    Estimation(Vec<AxisEstimationError>),
    Calibration(CalibrationError),
}

impl std::fmt::Display for MatchGridError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingModelName => {
                write!(f, "matchGrid model: expected name of stage with rects")
            }
            Self::StageNotInModel => write!(f, "Named stage is not in model"),
            Self::MissingRects => write!(f, "Expected array of rects to match"),
            Self::TooFewRects => write!(f, "Expected array of at least 2 rects to match"),
            Self::TooFewPoints => write!(f, "Expected at least 2 rects with numeric x and y"),
            Self::InvalidConfig(msg) => write!(f, "invalid matchGrid config: {}", msg),
            Self::Estimation(errors) => {
                for (i, e) in errors.iter().enumerate() {
                    if i > 0 {
                        f.write_str("; ")?;
                    }
                    write!(f, "{}", e)?;
                }
                Ok(())
            }
            Self::Calibration(e) => write!(f, "calibrateImage(FAILED) {}", e),
        }
    }
}

impl std::error::Error for MatchGridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Calibration(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CalibrationError> for MatchGridError {
    fn from(e: CalibrationError) -> Self {
        Self::Calibration(e)
    }
}
