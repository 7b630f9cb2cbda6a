use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discrete stroke-risk category derived from a model score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }

    /// Clinical follow-up wording shown next to the label.
    pub fn recommendation(&self) -> &'static str {
        match self {
            RiskLevel::High => "Further evaluation recommended",
            RiskLevel::Medium => "Follow-up and risk factor management advised",
            RiskLevel::Low => "Routine monitoring",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("unknown risk level: {}", other)),
        }
    }
}

/// Output of one scoring run. A patient holds at most one of these; a new
/// run replaces the previous result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Positive-class probability in [0, 1].
    pub score: f64,
    pub risk_level: RiskLevel,
    /// `score >= optimal_threshold` of the model that produced it.
    pub prediction: bool,
    pub predicted_at: DateTime<Utc>,
}

impl PredictionResult {
    /// Score as a whole percentage, the unit the dashboard reports.
    pub fn risk_percentage(&self) -> f64 {
        (self.score * 100.0).round()
    }
}
