/// Maps a signed score onto `[0, 1]` relative to the profile normalizer.
pub fn score_confidence(score: f64, normalizer: f64) -> f64 {
    if normalizer <= 0.0 || !score.is_finite() {
        return 0.0;
    }
    (score.abs() / normalizer).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_at_normalizer() {
        assert_eq!(score_confidence(16.0, 16.0), 1.0);
        assert_eq!(score_confidence(-20.0, 16.0), 1.0);
        assert_eq!(score_confidence(-11.0, 16.0), 0.6875);
    }

    #[test]
    fn monotonic_in_magnitude() {
        let mut previous = 0.0;
        for step in 0..40 {
            let score = step as f64 * 0.5;
            let confidence = score_confidence(-score, 16.0);
            assert!(confidence >= previous);
            previous = confidence;
        }
        assert_eq!(previous, 1.0);
    }

    #[test]
    fn zero_normalizer_yields_zero() {
        assert_eq!(score_confidence(5.0, 0.0), 0.0);
    }
}
