use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identifiers::PatientCode;
use crate::medical::{Gender, Patient, RiskLevel};

/// The three headline counts. Computed on demand, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub total_patients: u64,
    pub high_risk_count: u64,
    /// Patients whose prediction timestamp falls on the current calendar day.
    pub predictions_today: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskDistribution {
    #[serde(rename = "High")]
    pub high: u64,
    #[serde(rename = "Medium")]
    pub medium: u64,
    #[serde(rename = "Low")]
    pub low: u64,
    /// Patients that were never scored.
    #[serde(rename = "Unknown")]
    pub unknown: u64,
}

impl RiskDistribution {
    pub fn record(&mut self, level: Option<RiskLevel>) {
        match level {
            Some(RiskLevel::High) => self.high += 1,
            Some(RiskLevel::Medium) => self.medium += 1,
            Some(RiskLevel::Low) => self.low += 1,
            None => self.unknown += 1,
        }
    }
}

/// Row of the "recent patients" panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPatient {
    pub id: Uuid,
    pub patient_code: PatientCode,
    pub name: Option<String>,
    pub age: f64,
    pub gender: Gender,
    pub risk_score: Option<f64>,
    pub risk_level: Option<RiskLevel>,
    pub created_at: DateTime<Utc>,
}

impl From<&Patient> for RecentPatient {
    fn from(p: &Patient) -> Self {
        RecentPatient {
            id: p.id,
            patient_code: p.patient_code.clone(),
            name: p.name.clone(),
            age: p.age,
            gender: p.gender,
            risk_score: p.prediction.as_ref().map(|r| r.risk_percentage()),
            risk_level: p.risk_level(),
            created_at: p.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

/// Full payload of `GET /dashboard/stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub summary: DashboardSnapshot,
    /// Patients registered (not scored) today.
    pub todays_patients: u64,
    pub stroke_cases: u64,
    pub risk_distribution: RiskDistribution,
    pub recent_patients: Vec<RecentPatient>,
    pub monthly_trend: Vec<MonthlyCount>,
    pub gender_distribution: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgeBucket {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
    /// Mean risk percentage of the scored patients in the bucket.
    pub average_risk_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BmiCategory {
    pub label: String,
    pub lower: f64,
    pub upper: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactorCounts {
    pub hypertension: u64,
    pub heart_disease: u64,
    pub smoking: u64,
}

/// Payload of `GET /dashboard/analytics`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analytics {
    /// Mean risk percentage over scored patients, two decimals.
    pub average_risk_score: f64,
    pub age_distribution: Vec<AgeBucket>,
    pub bmi_categories: Vec<BmiCategory>,
    pub risk_factors: RiskFactorCounts,
}
