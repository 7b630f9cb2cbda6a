// lib/src/dashboard.rs
// Read-only aggregates over the patient store, computed on every call.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use log::debug;

use models::dashboard::{
    AgeBucket, Analytics, BmiCategory, DashboardSnapshot, DashboardStats, MonthlyCount,
    RecentPatient, RiskDistribution, RiskFactorCounts,
};
use models::medical::{Patient, RiskLevel, SmokingStatus};
use models::validation::AGE_RANGE;

use crate::config::DashboardConfig;
use crate::errors::{Result, StrokeError};
use crate::storage_engine::PatientStorageEngine;

const AGE_BOUNDARIES: [f64; 8] = [0.0, 18.0, 30.0, 40.0, 50.0, 60.0, 70.0, 100.0];
const BMI_CATEGORIES: [(&str, f64, f64); 4] = [
    ("Underweight", 0.0, 18.5),
    ("Normal", 18.5, 25.0),
    ("Overweight", 25.0, 30.0),
    ("Obese", 30.0, 100.0),
];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

#[derive(Clone)]
pub struct DashboardAggregator {
    store: Arc<dyn PatientStorageEngine>,
    offset: FixedOffset,
    recent_limit: usize,
    trend_months: u32,
}

impl DashboardAggregator {
    pub fn new(store: Arc<dyn PatientStorageEngine>, config: &DashboardConfig) -> Result<Self> {
        let offset = config
            .utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                StrokeError::ConfigurationError(format!(
                    "invalid UTC offset: {} minutes",
                    config.utc_offset_minutes
                ))
            })?;
        Ok(DashboardAggregator {
            store,
            offset,
            recent_limit: config.recent_limit,
            trend_months: config.trend_months,
        })
    }

    fn local_date(&self, ts: DateTime<Utc>) -> NaiveDate {
        ts.with_timezone(&self.offset).date_naive()
    }

    /// The three headline counts as of now.
    pub async fn summarize(&self) -> Result<DashboardSnapshot> {
        self.summarize_at(Utc::now()).await
    }

    /// Counts as of `now`. "Today" is `now`'s calendar day at the
    /// configured offset.
    pub async fn summarize_at(&self, now: DateTime<Utc>) -> Result<DashboardSnapshot> {
        let patients = self.store.all_patients().await?;
        Ok(self.snapshot(&patients, self.local_date(now)))
    }

    fn snapshot(&self, patients: &[Patient], today: NaiveDate) -> DashboardSnapshot {
        DashboardSnapshot {
            total_patients: patients.len() as u64,
            high_risk_count: patients
                .iter()
                .filter(|p| p.risk_level() == Some(RiskLevel::High))
                .count() as u64,
            predictions_today: patients
                .iter()
                .filter_map(Patient::predicted_at)
                .filter(|ts| self.local_date(*ts) == today)
                .count() as u64,
        }
    }

    pub async fn stats(&self) -> Result<DashboardStats> {
        self.stats_at(Utc::now()).await
    }

    pub async fn stats_at(&self, now: DateTime<Utc>) -> Result<DashboardStats> {
        let patients = self.store.all_patients().await?;
        let today = self.local_date(now);

        let mut risk_distribution = RiskDistribution::default();
        let mut gender_distribution: BTreeMap<String, u64> = BTreeMap::new();
        for patient in &patients {
            risk_distribution.record(patient.risk_level());
            *gender_distribution
                .entry(patient.gender.as_str().to_string())
                .or_insert(0) += 1;
        }

        let stats = DashboardStats {
            summary: self.snapshot(&patients, today),
            todays_patients: patients
                .iter()
                .filter(|p| self.local_date(p.created_at) == today)
                .count() as u64,
            stroke_cases: patients.iter().filter(|p| p.stroke).count() as u64,
            risk_distribution,
            // The store already lists newest first.
            recent_patients: patients
                .iter()
                .take(self.recent_limit)
                .map(RecentPatient::from)
                .collect(),
            monthly_trend: self.monthly_trend(&patients, today),
            gender_distribution,
        };
        debug!("Dashboard stats computed over {} patients", patients.len());
        Ok(stats)
    }

    /// Registrations per month for the last `trend_months` months, oldest
    /// first, including the current month.
    fn monthly_trend(&self, patients: &[Patient], today: NaiveDate) -> Vec<MonthlyCount> {
        let current = today.year() * 12 + today.month0() as i32;
        let first = current - self.trend_months as i32 + 1;
        let mut counts: BTreeMap<i32, u64> = (first..=current).map(|m| (m, 0)).collect();
        for patient in patients {
            let created = self.local_date(patient.created_at);
            let month = created.year() * 12 + created.month0() as i32;
            if let Some(count) = counts.get_mut(&month) {
                *count += 1;
            }
        }
        counts
            .into_iter()
            .map(|(m, count)| MonthlyCount {
                month: format!("{:04}-{:02}", m.div_euclid(12), m.rem_euclid(12) + 1),
                count,
            })
            .collect()
    }

    pub async fn analytics(&self) -> Result<Analytics> {
        let patients = self.store.all_patients().await?;

        let scores: Vec<f64> = patients
            .iter()
            .filter_map(|p| p.prediction.as_ref())
            .map(|r| r.score * 100.0)
            .collect();

        let mut age_distribution: Vec<AgeBucket> = AGE_BOUNDARIES
            .windows(2)
            .map(|w| {
                let in_bucket: Vec<&Patient> =
                    patients.iter().filter(|p| p.age >= w[0] && p.age < w[1]).collect();
                age_bucket(format!("{}-{}", w[0], w[1] - 1.0), w[0], w[1], &in_bucket)
            })
            .collect();
        let last = AGE_BOUNDARIES[AGE_BOUNDARIES.len() - 1];
        let beyond: Vec<&Patient> = patients.iter().filter(|p| p.age >= last).collect();
        if !beyond.is_empty() {
            age_distribution.push(age_bucket(format!("{}+", last), last, *AGE_RANGE.end(), &beyond));
        }

        let bmi_categories = BMI_CATEGORIES
            .iter()
            .map(|(label, lower, upper)| BmiCategory {
                label: label.to_string(),
                lower: *lower,
                upper: *upper,
                count: patients
                    .iter()
                    .filter(|p| p.bmi >= *lower && p.bmi < *upper)
                    .count() as u64,
            })
            .collect();

        let risk_factors = RiskFactorCounts {
            hypertension: patients.iter().filter(|p| p.hypertension).count() as u64,
            heart_disease: patients.iter().filter(|p| p.heart_disease).count() as u64,
            smoking: patients
                .iter()
                .filter(|p| p.smoking_status == SmokingStatus::Smokes)
                .count() as u64,
        };

        Ok(Analytics {
            average_risk_score: mean(&scores).map(round2).unwrap_or(0.0),
            age_distribution,
            bmi_categories,
            risk_factors,
        })
    }
}

fn age_bucket(label: String, lower: f64, upper: f64, patients: &[&Patient]) -> AgeBucket {
    let scores: Vec<f64> = patients
        .iter()
        .filter_map(|p| p.prediction.as_ref())
        .map(|r| r.score * 100.0)
        .collect();
    AgeBucket {
        label,
        lower,
        upper,
        count: patients.len() as u64,
        average_risk_score: mean(&scores).map(round2),
    }
}
