use serde_json::Value;

use super::MatchGridError;

/// Candidate points from `model[stage]["rects"]`.
///
/// Entries without finite numeric `x` and `y` are skipped; at least two
/// usable points must remain.
pub fn load_candidates(model: &Value, stage: &str) -> Result<Vec<[f64; 2]>, MatchGridError> {
    if stage.is_empty() {
        return Err(MatchGridError::MissingModelName);
    }
    let stage_model = model
        .get(stage)
        .filter(|v| v.is_object())
        .ok_or(MatchGridError::StageNotInModel)?;
    let rects = stage_model
        .get("rects")
        .and_then(Value::as_array)
        .ok_or(MatchGridError::MissingRects)?;
    if rects.len() < 2 {
        return Err(MatchGridError::TooFewRects);
    }

    let points: Vec<[f64; 2]> = rects
        .iter()
        .filter_map(|r| {
            let x = r.get("x")?.as_f64()?;
            let y = r.get("y")?.as_f64()?;
            (x.is_finite() && y.is_finite()).then_some([x, y])
        })
        .collect();

    tracing::debug!(
        stage,
        rects = rects.len(),
        usable = points.len(),
        "candidates loaded"
    );
    if points.len() < 2 {
        return Err(MatchGridError::TooFewPoints);
    }
    Ok(points)
}
