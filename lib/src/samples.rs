// lib/src/samples.rs
// Demo records loaded into an empty store by `seed`.

use models::medical::PatientInput;

struct Sample {
    name: &'static str,
    age: f64,
    gender: &'static str,
    hypertension: bool,
    heart_disease: bool,
    ever_married: &'static str,
    work_type: &'static str,
    residence_type: &'static str,
    avg_glucose_level: f64,
    bmi: f64,
    smoking_status: &'static str,
    stroke: bool,
    notes: &'static str,
}

const SAMPLES: [Sample; 5] = [
    Sample {
        name: "John Smith",
        age: 65.0,
        gender: "Male",
        hypertension: true,
        heart_disease: false,
        ever_married: "Yes",
        work_type: "Private",
        residence_type: "Urban",
        avg_glucose_level: 185.5,
        bmi: 28.3,
        smoking_status: "formerly smoked",
        stroke: false,
        notes: "High glucose levels, former smoker",
    },
    Sample {
        name: "Mary Johnson",
        age: 45.0,
        gender: "Female",
        hypertension: false,
        heart_disease: false,
        ever_married: "Yes",
        work_type: "Self-employed",
        residence_type: "Rural",
        avg_glucose_level: 120.0,
        bmi: 24.5,
        smoking_status: "never smoked",
        stroke: false,
        notes: "Healthy lifestyle",
    },
    Sample {
        name: "Robert Chen",
        age: 58.0,
        gender: "Male",
        hypertension: true,
        heart_disease: true,
        ever_married: "Yes",
        work_type: "Govt_job",
        residence_type: "Urban",
        avg_glucose_level: 210.0,
        bmi: 32.1,
        smoking_status: "smokes",
        stroke: true,
        notes: "Previous stroke patient, multiple risk factors",
    },
    Sample {
        name: "Sarah Williams",
        age: 72.0,
        gender: "Female",
        hypertension: false,
        heart_disease: false,
        ever_married: "No",
        work_type: "Never_worked",
        residence_type: "Urban",
        avg_glucose_level: 95.0,
        bmi: 22.8,
        smoking_status: "never smoked",
        stroke: false,
        notes: "Elderly but healthy",
    },
    Sample {
        name: "David Brown",
        age: 50.0,
        gender: "Male",
        hypertension: true,
        heart_disease: false,
        ever_married: "Yes",
        work_type: "Private",
        residence_type: "Urban",
        avg_glucose_level: 160.0,
        bmi: 31.5,
        smoking_status: "smokes",
        stroke: false,
        notes: "Hypertension with smoking habit",
    },
];

/// The demo patients as API-shaped input.
pub fn sample_inputs() -> Vec<PatientInput> {
    SAMPLES
        .iter()
        .map(|s| PatientInput {
            name: Some(s.name.to_string()),
            age: Some(s.age),
            gender: Some(s.gender.to_string()),
            hypertension: Some(s.hypertension),
            heart_disease: Some(s.heart_disease),
            ever_married: Some(s.ever_married.to_string()),
            work_type: Some(s.work_type.to_string()),
            residence_type: Some(s.residence_type.to_string()),
            avg_glucose_level: Some(s.avg_glucose_level),
            bmi: Some(s.bmi),
            smoking_status: Some(s.smoking_status.to_string()),
            stroke: Some(s.stroke),
            notes: Some(s.notes.to_string()),
        })
        .collect()
}
