// lib/src/risk/categorizer.rs

use models::medical::RiskLevel;

use crate::config::config_defaults::{default_high_threshold, default_medium_threshold};
use crate::risk::ClassifierError;

/// Buckets a probability into `High`/`Medium`/`Low`.
///
/// `p >= high` is High, `medium <= p < high` is Medium, anything lower is Low.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskCategorizer {
    high: f64,
    medium: f64,
}

impl RiskCategorizer {
    /// Requires `0 < medium < high <= 1`.
    pub fn new(high: f64, medium: f64) -> Result<Self, ClassifierError> {
        if !(medium > 0.0 && medium < high && high <= 1.0) {
            return Err(ClassifierError::InvalidThresholds(format!(
                "expected 0 < medium < high <= 1, got medium={} high={}",
                medium, high
            )));
        }
        Ok(RiskCategorizer { high, medium })
    }

    pub fn high_threshold(&self) -> f64 {
        self.high
    }

    pub fn medium_threshold(&self) -> f64 {
        self.medium
    }

    pub fn categorize(&self, probability: f64) -> Result<RiskLevel, ClassifierError> {
        if probability.is_nan() || !(0.0..=1.0).contains(&probability) {
            return Err(ClassifierError::InvalidScore(probability));
        }
        Ok(if probability >= self.high {
            RiskLevel::High
        } else if probability >= self.medium {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        })
    }
}

impl Default for RiskCategorizer {
    fn default() -> Self {
        RiskCategorizer {
            high: default_high_threshold(),
            medium: default_medium_threshold(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds() {
        let c = RiskCategorizer::default();
        assert_eq!(c.categorize(0.82).unwrap(), RiskLevel::High);
        assert_eq!(c.categorize(0.7).unwrap(), RiskLevel::High);
        assert_eq!(c.categorize(0.69999).unwrap(), RiskLevel::Medium);
        assert_eq!(c.categorize(0.4).unwrap(), RiskLevel::Medium);
        assert_eq!(c.categorize(0.39999).unwrap(), RiskLevel::Low);
        assert_eq!(c.categorize(0.0).unwrap(), RiskLevel::Low);
        assert_eq!(c.categorize(1.0).unwrap(), RiskLevel::High);
    }

    #[test]
    fn total_and_monotonic_over_unit_interval() {
        let c = RiskCategorizer::default();
        let mut previous = RiskLevel::Low;
        for i in 0..=1000 {
            let p = i as f64 / 1000.0;
            let level = c.categorize(p).unwrap();
            assert!(level >= previous, "{} dropped from {:?} to {:?}", p, previous, level);
            assert_eq!(level, c.categorize(p).unwrap());
            previous = level;
        }
    }

    #[test]
    fn rejects_invalid_scores() {
        let c = RiskCategorizer::default();
        assert!(matches!(c.categorize(f64::NAN), Err(ClassifierError::InvalidScore(_))));
        assert_eq!(c.categorize(-0.01), Err(ClassifierError::InvalidScore(-0.01)));
        assert_eq!(c.categorize(1.5), Err(ClassifierError::InvalidScore(1.5)));
    }

    #[test]
    fn rejects_unordered_thresholds() {
        assert!(RiskCategorizer::new(0.4, 0.7).is_err());
        assert!(RiskCategorizer::new(0.7, 0.7).is_err());
        assert!(RiskCategorizer::new(1.2, 0.4).is_err());
        assert!(RiskCategorizer::new(0.7, 0.0).is_err());
        let custom = RiskCategorizer::new(0.5, 0.2).unwrap();
        assert_eq!(custom.categorize(0.3).unwrap(), RiskLevel::Medium);
    }
}
