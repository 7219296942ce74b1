//! Calibration profiles: the thresholds, weights and directions the scorer
//! applies, kept as data so historical calibration rounds can be swapped in
//! by name.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{ClassifyError, Result};
use crate::core::model::{GeometryFeatures, Language};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    HeightStd,
    AvgHeight,
    TextDensity,
    AvgWidth,
    NumComponents,
    AvgAspectRatio,
    LayoutTransitions,
    NumColumns,
    NumLines,
}

impl Feature {
    /// Value of this feature, or `None` when it was not measured.
    pub fn value(&self, geometry: &GeometryFeatures, line_count: Option<usize>) -> Option<f64> {
        match self {
            Feature::HeightStd => Some(geometry.height_std),
            Feature::AvgHeight => Some(geometry.avg_height),
            Feature::TextDensity => Some(geometry.text_density),
            Feature::AvgWidth => Some(geometry.avg_width),
            Feature::NumComponents => Some(geometry.num_components as f64),
            Feature::AvgAspectRatio => Some(geometry.avg_aspect_ratio),
            Feature::LayoutTransitions => Some(geometry.layout_transitions as f64),
            Feature::NumColumns => geometry.num_columns.map(|c| c as f64),
            Feature::NumLines => line_count.map(|c| c as f64),
        }
    }

    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (Feature::HeightStd, Language::En) => "component height std-dev",
            (Feature::HeightStd, Language::Pt) => "desvio da altura dos componentes",
            (Feature::AvgHeight, Language::En) => "average component height",
            (Feature::AvgHeight, Language::Pt) => "altura média dos componentes",
            (Feature::TextDensity, Language::En) => "text density",
            (Feature::TextDensity, Language::Pt) => "densidade de texto",
            (Feature::AvgWidth, Language::En) => "average component width",
            (Feature::AvgWidth, Language::Pt) => "largura média dos componentes",
            (Feature::NumComponents, Language::En) => "component count",
            (Feature::NumComponents, Language::Pt) => "número de componentes",
            (Feature::AvgAspectRatio, Language::En) => "average aspect ratio",
            (Feature::AvgAspectRatio, Language::Pt) => "proporção média",
            (Feature::LayoutTransitions, Language::En) => "layout transitions",
            (Feature::LayoutTransitions, Language::Pt) => "transições de layout",
            (Feature::NumColumns, Language::En) => "detected columns",
            (Feature::NumColumns, Language::Pt) => "colunas detectadas",
            (Feature::NumLines, Language::En) => "detected lines",
            (Feature::NumLines, Language::Pt) => "linhas detectadas",
        }
    }
}

/// Which side of the threshold votes "advertisement".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// `value > threshold` pushes toward advertisement.
    Above,
    /// `value < threshold` pushes toward advertisement.
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub feature: Feature,
    pub threshold: f64,
    pub weight: f64,
    pub direction: Direction,
}

impl Rule {
    pub fn new(feature: Feature, threshold: f64, weight: f64, direction: Direction) -> Self {
        Self {
            feature,
            threshold,
            weight,
            direction,
        }
    }

    pub fn votes_advertisement(&self, value: f64) -> bool {
        match self.direction {
            Direction::Above => value > self.threshold,
            Direction::Below => value < self.threshold,
        }
    }

    /// Signed contribution: `+weight` toward advertisement, `-weight` otherwise.
    pub fn contribution(&self, value: f64) -> f64 {
        if self.votes_advertisement(value) {
            self.weight
        } else {
            -self.weight
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub rules: Vec<Rule>,
    /// Fixed confidence normalizer. When absent, the weights of the rules
    /// actually applied are summed instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalizer: Option<f64>,
}

pub const CANONICAL_PROFILE: &str = "final-v3";

impl CalibrationProfile {
    /// Identifier used for lookups, e.g. `final-v3`.
    pub fn id(&self) -> String {
        format!("{}-v{}", self.name, self.version)
    }

    /// Earliest calibration: five geometry rules, no structural features.
    pub fn geometry_v1() -> Self {
        Self {
            name: "geometry".to_string(),
            version: 1,
            description: "Five geometry rules from the first calibration round".to_string(),
            rules: vec![
                Rule::new(Feature::HeightStd, 42.51, 4.0, Direction::Above),
                Rule::new(Feature::AvgHeight, 16.34, 3.0, Direction::Above),
                Rule::new(Feature::TextDensity, 0.18, 3.0, Direction::Above),
                Rule::new(Feature::AvgWidth, 17.30, 3.0, Direction::Above),
                Rule::new(Feature::NumComponents, 181.92, 2.0, Direction::Below),
            ],
            normalizer: None,
        }
    }

    /// Weights derived from per-feature separability, columns included.
    pub fn separability_v2() -> Self {
        Self {
            name: "separability".to_string(),
            version: 2,
            description: "Weights proportional to class separability of each feature".to_string(),
            rules: vec![
                Rule::new(Feature::HeightStd, 42.51, 2.0, Direction::Above),
                Rule::new(Feature::AvgHeight, 16.34, 2.0, Direction::Above),
                Rule::new(Feature::TextDensity, 0.18, 1.0, Direction::Above),
                Rule::new(Feature::AvgWidth, 17.30, 1.0, Direction::Above),
                Rule::new(Feature::NumComponents, 181.92, 1.0, Direction::Below),
                Rule::new(Feature::NumColumns, 1.51, 1.0, Direction::Above),
            ],
            normalizer: None,
        }
    }

    /// The reference table: six geometry rules normalized by 16, plus the
    /// optional line-count rule.
    pub fn final_v3() -> Self {
        Self {
            name: "final".to_string(),
            version: 3,
            description: "Reference calibration with optional line-count rule".to_string(),
            rules: vec![
                Rule::new(Feature::HeightStd, 42.51, 4.0, Direction::Above),
                Rule::new(Feature::AvgHeight, 16.34, 3.0, Direction::Above),
                Rule::new(Feature::TextDensity, 0.18, 3.0, Direction::Above),
                Rule::new(Feature::AvgWidth, 17.30, 3.0, Direction::Above),
                Rule::new(Feature::NumComponents, 181.92, 2.0, Direction::Below),
                Rule::new(Feature::NumColumns, 1.51, 1.0, Direction::Above),
                Rule::new(Feature::NumLines, 26.5, 2.42, Direction::Below),
            ],
            normalizer: Some(16.0),
        }
    }

    pub fn canonical() -> Self {
        Self::final_v3()
    }

    pub fn builtin() -> Vec<Self> {
        vec![Self::geometry_v1(), Self::separability_v2(), Self::final_v3()]
    }

    /// Resolves `name-vN` exactly, or a bare family name to its latest version.
    pub fn lookup(selector: &str) -> Result<Self> {
        let selector = selector.trim();
        let builtin = Self::builtin();
        if let Some(profile) = builtin.iter().find(|p| p.id() == selector) {
            return Ok(profile.clone());
        }
        builtin
            .into_iter()
            .filter(|p| p.name == selector)
            .max_by_key(|p| p.version)
            .ok_or_else(|| ClassifyError::Profile(format!("unknown profile '{selector}'")))
    }

    pub fn from_json(data: &str) -> Result<Self> {
        let profile: Self = serde_json::from_str(data)
            .map_err(|err| ClassifyError::Profile(format!("invalid profile JSON: {err}")))?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|err| {
            ClassifyError::Profile(format!("cannot read {}: {err}", path.display()))
        })?;
        Self::from_json(&data)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rules.is_empty() {
            return Err(ClassifyError::Profile(format!(
                "profile '{}' has no rules",
                self.id()
            )));
        }
        for rule in &self.rules {
            if !rule.threshold.is_finite() || !rule.weight.is_finite() || rule.weight <= 0.0 {
                return Err(ClassifyError::Profile(format!(
                    "profile '{}' has an invalid rule on {:?}",
                    self.id(),
                    rule.feature
                )));
            }
        }
        if let Some(normalizer) = self.normalizer {
            if !normalizer.is_finite() || normalizer <= 0.0 {
                return Err(ClassifyError::Profile(format!(
                    "profile '{}' has a non-positive normalizer",
                    self.id()
                )));
            }
        }
        Ok(())
    }

    pub fn uses(&self, feature: Feature) -> bool {
        self.rules.iter().any(|rule| rule.feature == feature)
    }
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self::canonical()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn canonical_profile_is_final_v3() {
        let profile = CalibrationProfile::canonical();
        assert_eq!(profile.id(), CANONICAL_PROFILE);
        assert!(profile.uses(Feature::NumLines));
        assert_eq!(profile.normalizer, Some(16.0));
    }

    #[test]
    fn resolves_exact_id_and_family() {
        assert_eq!(CalibrationProfile::lookup("geometry-v1").unwrap().version, 1);
        assert_eq!(CalibrationProfile::lookup("final").unwrap().id(), "final-v3");
        assert!(matches!(
            CalibrationProfile::lookup("nope"),
            Err(ClassifyError::Profile(_))
        ));
    }

    #[test]
    fn builtin_profiles_validate() {
        for profile in CalibrationProfile::builtin() {
            profile.validate().unwrap();
        }
    }

    #[test]
    fn loads_profile_from_json() {
        let json = r#"{
            "name": "custom",
            "version": 7,
            "rules": [
                {"feature": "text_density", "threshold": 0.2, "weight": 1.5, "direction": "above"},
                {"feature": "num_lines", "threshold": 30.0, "weight": 1.0, "direction": "below"}
            ]
        }"#;
        let profile = CalibrationProfile::from_json(json).unwrap();
        assert_eq!(profile.id(), "custom-v7");
        assert_eq!(profile.rules.len(), 2);
        assert_eq!(profile.normalizer, None);
        assert_eq!(profile.rules[1].direction, Direction::Below);
    }

    #[test]
    fn rejects_non_positive_weights() {
        let json = r#"{
            "name": "broken",
            "version": 1,
            "rules": [{"feature": "avg_width", "threshold": 1.0, "weight": 0.0, "direction": "above"}]
        }"#;
        assert!(CalibrationProfile::from_json(json).is_err());
    }

    #[test]
    fn rule_direction_decides_vote() {
        let above = Rule::new(Feature::AvgHeight, 10.0, 3.0, Direction::Above);
        assert_eq!(above.contribution(10.5), 3.0);
        assert_eq!(above.contribution(10.0), -3.0);
        let below = Rule::new(Feature::NumComponents, 100.0, 2.0, Direction::Below);
        assert_eq!(below.contribution(99.0), 2.0);
        assert_eq!(below.contribution(100.0), -2.0);
    }
}
