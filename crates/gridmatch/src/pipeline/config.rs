use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::calibrate::CalibrationConfig;
use crate::matcher::SubViewConfig;

/// Stage configuration, keyed the way pipeline JSON spells it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct MatchGridConfig {
    /// Name of the upstream stage whose `rects` are matched.
    pub model: String,
    /// Object-space z of the target plane, reported on every rect.
    pub obj_z: f64,
    /// Object units between neighbouring columns.
    pub sep_x: f64,
    /// Object units between neighbouring rows.
    pub sep_y: f64,
    /// Accepted relative deviation from the median gap.
    pub tolerance: f64,
    pub sub_view: SubViewConfig,
    pub calibration: CalibrationConfig,
}

impl Default for MatchGridConfig {
    fn default() -> Self {
        Self {
            model: String::new(),
            obj_z: 0.0,
            sep_x: 5.0,
            sep_y: 5.0,
            tolerance: 0.35,
            sub_view: SubViewConfig::default(),
            calibration: CalibrationConfig::default(),
        }
    }
}

impl MatchGridConfig {
    /// Config for candidates from `model` with all other fields defaulted.
    pub fn for_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Check numeric ranges. The model name is checked when the stage runs.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.sep_x.is_finite() && self.sep_x > 0.0) {
            return Err(format!("sepX must be positive, got {}", self.sep_x));
        }
        if !(self.sep_y.is_finite() && self.sep_y > 0.0) {
            return Err(format!("sepY must be positive, got {}", self.sep_y));
        }
        if !(self.tolerance > 0.0 && self.tolerance < 1.0) {
            return Err(format!("tolerance must be in (0, 1), got {}", self.tolerance));
        }
        if !self.obj_z.is_finite() {
            return Err(format!("objZ must be finite, got {}", self.obj_z));
        }
        if self.sub_view.rows == 0 || self.sub_view.cols == 0 {
            return Err(format!(
                "subView window must be non-empty, got {}x{}",
                self.sub_view.rows, self.sub_view.cols
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_stage_defaults() {
        let cfg = MatchGridConfig::default();
        assert_eq!(cfg.sep_x, 5.0);
        assert_eq!(cfg.sep_y, 5.0);
        assert_eq!(cfg.tolerance, 0.35);
        assert_eq!(cfg.obj_z, 0.0);
        assert_eq!(cfg.sub_view.rows, 7);
        assert_eq!(cfg.sub_view.cols, 8);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn camel_case_keys_with_partial_input() {
        let cfg: MatchGridConfig = serde_json::from_str(
            r#"{"model":"rects","objZ":1.5,"sepX":4,"subView":{"rows":5,"cols":5,"minPoints":9}}"#,
        )
        .unwrap();
        assert_eq!(cfg.model, "rects");
        assert_eq!(cfg.obj_z, 1.5);
        assert_eq!(cfg.sep_x, 4.0);
        assert_eq!(cfg.sep_y, 5.0);
        assert_eq!(cfg.sub_view.min_points, Some(9));
        assert_eq!(cfg.calibration, CalibrationConfig::default());

        let json = serde_json::to_value(MatchGridConfig::default()).unwrap();
        assert!(json.get("sepX").is_some());
        assert!(json["calibration"].get("fixK3").is_some());
    }

    #[test]
    fn validation_rejects_bad_ranges() {
        let bad = [
            MatchGridConfig {
                sep_x: 0.0,
                ..Default::default()
            },
            MatchGridConfig {
                sep_y: -1.0,
                ..Default::default()
            },
            MatchGridConfig {
                tolerance: 1.0,
                ..Default::default()
            },
            MatchGridConfig {
                tolerance: f64::NAN,
                ..Default::default()
            },
            MatchGridConfig {
                sub_view: SubViewConfig {
                    rows: 0,
                    ..Default::default()
                },
                ..Default::default()
            },
        ];
        for cfg in bad {
            assert!(cfg.validate().is_err(), "{:?}", cfg);
        }
    }

    #[test]
    fn unknown_keys_are_rejected_at_every_level() {
        for json in [
            r#"{"sepx":4}"#,
            r#"{"subView":{"rows":5,"colz":5}}"#,
            r#"{"calibration":{"maxIter":10}}"#,
        ] {
            let res: Result<MatchGridConfig, _> = serde_json::from_str(json);
            let err = res.expect_err(json).to_string();
            assert!(err.contains("unknown field"), "{json}: {err}");
        }
    }
}
