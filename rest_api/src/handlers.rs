// rest_api/src/handlers.rs

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use lib::errors::StrokeError;
use models::dashboard::{Analytics, DashboardSnapshot, DashboardStats};
use models::medical::{Login, NewUser, Patient, PatientInput, UserProfile};
use security::roles::{DASHBOARD_READ, PATIENTS_READ, PATIENTS_WRITE, USERS_MANAGE};
use security::{AuthenticatedUser, LoginResponse};

use crate::{AppState, RestApiError};

type ApiResult<T> = Result<T, RestApiError>;

/// Mistyped fields come back as a 400 with per-field details.
fn patient_input(payload: Result<Json<Value>, JsonRejection>) -> ApiResult<PatientInput> {
    let Json(body) = payload?;
    PatientInput::from_json(body).map_err(|e| RestApiError::Service(StrokeError::Validation(e)))
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| RestApiError::PatientNotFound)
}

/// Query string of the patient listing. Unparseable numbers fall back to the
/// defaults rather than failing the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    page: Option<String>,
    per_page: Option<String>,
    search: Option<String>,
}

impl ListParams {
    fn number(value: &Option<String>) -> Option<usize> {
        value.as_deref().and_then(|v| v.trim().parse().ok())
    }
}

pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let patients = state.ctx.storage.patients.count_patients().await?;
    Ok(Json(json!({
        "status": "healthy",
        "storage": state.ctx.storage.patients.get_type(),
        "scorer": state.ctx.patients.risk().scorer_name(),
        "patients": patients,
    })))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<Login>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let Json(login) = payload?;
    if login.email.trim().is_empty() || login.password.is_empty() {
        return Err(RestApiError::InvalidInput("Email and password required".to_string()));
    }
    Ok(Json(state.auth.login(&login).await?))
}

pub async fn register(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require(&state.auth, USERS_MANAGE)?;
    let Json(new_user) = payload?;
    let profile = state.auth.register(new_user).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User created successfully",
            "user_id": profile.id,
            "user": profile,
        })),
    ))
}

pub async fn me(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<UserProfile>> {
    Ok(Json(state.auth.current_user(user.claims()).await?))
}

pub async fn logout(_user: AuthenticatedUser) -> Json<Value> {
    Json(json!({ "message": "Logged out successfully" }))
}

pub async fn list_patients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Value>> {
    user.require(&state.auth, PATIENTS_READ)?;
    let page = state
        .ctx
        .patients
        .list(
            ListParams::number(&params.page),
            ListParams::number(&params.per_page),
            params.search.as_deref(),
        )
        .await?;
    Ok(Json(json!(page)))
}

pub async fn all_patients(State(state): State<AppState>, user: AuthenticatedUser) -> ApiResult<Json<Value>> {
    user.require(&state.auth, PATIENTS_READ)?;
    let patients = state.ctx.patients.all().await?;
    Ok(Json(json!({
        "total": patients.len(),
        "patients": patients,
    })))
}

pub async fn create_patient(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require(&state.auth, PATIENTS_WRITE)?;
    let input = patient_input(payload)?;
    let patient = state.ctx.patients.create(input).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Patient created successfully",
            "patient_id": patient.id,
            "patient_code": patient.patient_code,
            "patient": patient,
        })),
    ))
}

pub async fn bulk_create_patients(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    user.require(&state.auth, PATIENTS_WRITE)?;
    let Json(body) = payload?;
    let Value::Array(items) = body else {
        return Err(RestApiError::InvalidInput("Expected array of patients".to_string()));
    };
    let inputs = items.into_iter().map(PatientInput::from_json).collect();
    let report = state.ctx.patients.bulk_create_decoded(inputs).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("Successfully created {} patients", report.created_count),
            "created_count": report.created_count,
            "errors": if report.errors.is_empty() { Value::Null } else { json!(report.errors) },
        })),
    ))
}

pub async fn get_patient(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Patient>> {
    user.require(&state.auth, PATIENTS_READ)?;
    let id = parse_id(&id)?;
    Ok(Json(state.ctx.patients.get(&id).await?))
}

pub async fn update_patient(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    user.require(&state.auth, PATIENTS_WRITE)?;
    let id = parse_id(&id)?;
    let input = patient_input(payload)?;
    let patient = state.ctx.patients.update(&id, input).await?;
    Ok(Json(json!({
        "message": "Patient updated successfully",
        "patient": patient,
    })))
}

pub async fn delete_patient(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    user.require(&state.auth, PATIENTS_WRITE)?;
    let id = parse_id(&id)?;
    state.ctx.patients.delete(&id).await?;
    Ok(Json(json!({ "message": "Patient deleted successfully" })))
}

pub async fn predict_patient(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    user.require(&state.auth, PATIENTS_WRITE)?;
    let id = parse_id(&id)?;
    let patient = state.ctx.patients.predict(&id).await?;
    let prediction = match &patient.prediction {
        Some(prediction) => json!({
            "risk_score": prediction.score,
            "risk_percentage": prediction.risk_percentage(),
            "risk_level": prediction.risk_level,
            "prediction": prediction.prediction,
            "recommendation": prediction.risk_level.recommendation(),
            "predicted_at": prediction.predicted_at,
        }),
        None => Value::Null,
    };
    Ok(Json(json!({
        "patient_id": patient.id,
        "patient_code": patient.patient_code,
        "result": prediction,
    })))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<DashboardStats>> {
    user.require(&state.auth, DASHBOARD_READ)?;
    Ok(Json(state.ctx.dashboard.stats().await?))
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<DashboardSnapshot>> {
    user.require(&state.auth, DASHBOARD_READ)?;
    Ok(Json(state.ctx.dashboard.summarize().await?))
}

pub async fn dashboard_analytics(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Analytics>> {
    user.require(&state.auth, DASHBOARD_READ)?;
    Ok(Json(state.ctx.dashboard.analytics().await?))
}
