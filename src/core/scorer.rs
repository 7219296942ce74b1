use crate::core::confidence::score_confidence;
use crate::core::model::{Classification, GeometryFeatures, RuleContribution, ScoreResult};
use crate::core::profile::CalibrationProfile;

/// Signed weighted vote of a calibration profile over page geometry.
#[derive(Debug, Clone)]
pub struct HeuristicScorer {
    profile: CalibrationProfile,
}

impl HeuristicScorer {
    pub fn new(profile: CalibrationProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &CalibrationProfile {
        &self.profile
    }

    /// Rules whose feature was not measured (no line count, columns not
    /// detected) are skipped and do not count toward the normalizer.
    pub fn score(&self, geometry: &GeometryFeatures, line_count: Option<usize>) -> ScoreResult {
        let mut score = 0.0;
        let mut applied_weight = 0.0;
        let mut contributions = Vec::with_capacity(self.profile.rules.len());

        for rule in &self.profile.rules {
            let Some(value) = rule.feature.value(geometry, line_count) else {
                continue;
            };
            let delta = rule.contribution(value);
            score += delta;
            applied_weight += rule.weight;
            contributions.push(RuleContribution {
                feature: rule.feature,
                value,
                threshold: rule.threshold,
                delta,
            });
        }

        let normalizer = self.profile.normalizer.unwrap_or(applied_weight);
        ScoreResult {
            score,
            classification: label_for(score),
            confidence: score_confidence(score, normalizer),
            contributions,
        }
    }
}

impl Default for HeuristicScorer {
    fn default() -> Self {
        Self::new(CalibrationProfile::canonical())
    }
}

/// A score of exactly zero is a scientific article.
pub fn label_for(score: f64) -> Classification {
    if score > 0.0 {
        Classification::Advertisement
    } else {
        Classification::ScientificArticle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::profile::{Direction, Feature, Rule};
    use pretty_assertions::assert_eq;

    fn advertisement_geometry() -> GeometryFeatures {
        GeometryFeatures {
            num_components: 50,
            avg_height: 20.0,
            height_std: 60.0,
            avg_width: 25.0,
            avg_aspect_ratio: 0.8,
            text_density: 0.3,
            layout_transitions: 12,
            num_columns: Some(2),
        }
    }

    fn article_geometry() -> GeometryFeatures {
        GeometryFeatures {
            num_components: 400,
            avg_height: 8.0,
            height_std: 10.0,
            avg_width: 10.0,
            avg_aspect_ratio: 0.8,
            text_density: 0.05,
            layout_transitions: 90,
            num_columns: Some(1),
        }
    }

    #[test]
    fn empty_geometry_scores_else_branches() {
        let result = HeuristicScorer::default().score(&GeometryFeatures::default(), None);
        assert_eq!(result.score, -11.0);
        assert_eq!(result.confidence, 0.6875);
        assert_eq!(result.classification, Classification::ScientificArticle);
        assert_eq!(result.contributions.len(), 5);
    }

    #[test]
    fn all_rules_vote_advertisement() {
        let result = HeuristicScorer::default().score(&advertisement_geometry(), None);
        assert_eq!(result.score, 16.0);
        assert_eq!(result.classification, Classification::Advertisement);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn all_rules_vote_article() {
        let result = HeuristicScorer::default().score(&article_geometry(), None);
        assert_eq!(result.score, -16.0);
        assert_eq!(result.classification, Classification::ScientificArticle);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn line_count_rule_applies_only_when_present() {
        let scorer = HeuristicScorer::default();
        let geometry = article_geometry();
        let with_lines = scorer.score(&geometry, Some(60));
        assert!((with_lines.score - (-18.42)).abs() < 1e-9);
        assert_eq!(with_lines.confidence, 1.0);
        let few_lines = scorer.score(&geometry, Some(3));
        assert!((few_lines.score - (-13.58)).abs() < 1e-9);
    }

    #[test]
    fn zero_score_is_scientific_article() {
        let profile = CalibrationProfile {
            name: "tie".to_string(),
            version: 1,
            description: String::new(),
            rules: vec![
                Rule::new(Feature::AvgHeight, 10.0, 2.0, Direction::Above),
                Rule::new(Feature::AvgWidth, 10.0, 2.0, Direction::Above),
            ],
            normalizer: None,
        };
        let geometry = GeometryFeatures {
            avg_height: 20.0,
            avg_width: 5.0,
            ..GeometryFeatures::default()
        };
        let result = HeuristicScorer::new(profile).score(&geometry, None);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.classification, Classification::ScientificArticle);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(label_for(0.0), Classification::ScientificArticle);
        assert_eq!(label_for(0.01), Classification::Advertisement);
    }

    #[test]
    fn normalizer_defaults_to_applied_weights() {
        let result =
            HeuristicScorer::new(CalibrationProfile::geometry_v1()).score(&article_geometry(), None);
        assert_eq!(result.score, -15.0);
        assert_eq!(result.confidence, 1.0);

        let mixed = GeometryFeatures {
            height_std: 50.0,
            ..article_geometry()
        };
        let result = HeuristicScorer::new(CalibrationProfile::geometry_v1()).score(&mixed, None);
        assert_eq!(result.score, -7.0);
        assert_eq!(result.confidence, 7.0 / 15.0);
    }
}
