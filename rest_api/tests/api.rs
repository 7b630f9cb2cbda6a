// rest_api/tests/api.rs
// Drives the router over real HTTP on an ephemeral port.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use lib::config::AppConfig;
use lib::risk::ClinicalPointsScorer;
use lib::storage_engine::Storage;
use lib::ServiceContext;
use rest_api::{build_router, serve, AppState};
use security::{AuthService, JwtManager, RolesConfig};

struct TestServer {
    base: String,
    client: Client,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> TestServer {
        let config = AppConfig::default();
        let storage = Storage::in_memory();
        let ctx = ServiceContext::with_parts(&config, storage.clone(), Arc::new(ClinicalPointsScorer)).unwrap();
        let auth = AuthService::new(
            storage.users.clone(),
            JwtManager::new(&config.auth.jwt_secret, config.auth.token_ttl_hours),
            RolesConfig::builtin(),
        );
        auth.ensure_default_admin(&config.auth).await.unwrap();
        let app = build_router(AppState::new(ctx, auth, config));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}/api", listener.local_addr().unwrap());
        let (tx, rx) = oneshot::channel();
        tokio::spawn(serve(listener, app, rx));

        TestServer {
            base,
            client: Client::new(),
            shutdown: Some(tx),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        body["token"].as_str().unwrap().to_string()
    }

    async fn admin_token(&self) -> String {
        self.login("admin@hospital.com", "admin123").await
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

fn high_risk_patient() -> Value {
    json!({
        "name": "Walter <b>Grey</b>",
        "age": 72,
        "gender": "Male",
        "hypertension": 1,
        "heart_disease": 1,
        "ever_married": "Yes",
        "work_type": "Private",
        "Residence_type": "Urban",
        "avg_glucose_level": 210.0,
        "bmi": 31.0,
        "smoking_status": "smokes"
    })
}

fn low_risk_patient() -> Value {
    json!({
        "name": "Ana Lima",
        "age": 30,
        "gender": "Female",
        "hypertension": 0,
        "heart_disease": 0,
        "avg_glucose_level": 90.0,
        "bmi": 22.0,
        "smoking_status": "never smoked"
    })
}

#[tokio::test]
async fn health_is_public() {
    let server = TestServer::start().await;
    let response = server.client.get(server.url("/health")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["scorer"], "clinical-points");
}

#[tokio::test]
async fn protected_routes_need_a_valid_token() {
    let server = TestServer::start().await;

    let response = server.client.get(server.url("/patients")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "error");

    let response = server
        .client
        .get(server.url("/dashboard/summary"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_password_is_unauthorized() {
    let server = TestServer::start().await;
    let response = server
        .client
        .post(server.url("/auth/login"))
        .json(&json!({ "email": "admin@hospital.com", "password": "wrong-one" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid credentials");
}

#[tokio::test]
async fn patient_lifecycle() {
    let server = TestServer::start().await;
    let token = server.admin_token().await;

    let response = server
        .client
        .post(server.url("/patients"))
        .bearer_auth(&token)
        .json(&high_risk_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    let id = body["patient_id"].as_str().unwrap().to_string();
    assert_eq!(body["patient_code"], "PT00001");
    assert_eq!(body["patient"]["name"], "Walter bGrey/b");
    assert_eq!(body["patient"]["prediction"]["risk_level"], "High");

    let fetched: Value = server
        .client
        .get(server.url(&format!("/patients/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["age"], 72.0);
    assert_eq!(fetched["smoking_status"], "smokes");

    let response = server
        .client
        .put(server.url(&format!("/patients/{}", id)))
        .bearer_auth(&token)
        .json(&json!({ "notes": "follow-up in two weeks" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["patient"]["notes"], "follow-up in two weeks");

    let response = server
        .client
        .post(server.url(&format!("/patients/{}/predict", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["risk_level"], "High");
    assert_eq!(body["result"]["risk_score"], 1.0);

    let response = server
        .client
        .delete(server.url(&format!("/patients/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .get(server.url(&format!("/patients/{}", id)))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Patient not found");
}

#[tokio::test]
async fn invalid_patient_reports_every_field() {
    let server = TestServer::start().await;
    let token = server.admin_token().await;

    let response = server
        .client
        .post(server.url("/patients/create"))
        .bearer_auth(&token)
        .json(&json!({ "age": 150, "gender": "Male", "bmi": 5.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"age"));
    assert!(fields.contains(&"bmi"));
    assert!(fields.contains(&"avg_glucose_level"));
}

#[tokio::test]
async fn mistyped_fields_are_reported_per_field() {
    let server = TestServer::start().await;
    let token = server.admin_token().await;

    let mut patient = low_risk_patient();
    patient["age"] = json!("abc");
    patient["hypertension"] = json!(2);
    let response = server
        .client
        .post(server.url("/patients"))
        .bearer_auth(&token)
        .json(&patient)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["details"][0]["field"], "age");
    assert_eq!(body["details"][1]["field"], "hypertension");

    let response = server
        .client
        .post(server.url("/patients/bulk"))
        .bearer_auth(&token)
        .json(&json!([patient, low_risk_patient()]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["created_count"], 1);
    assert!(body["errors"][0].as_str().unwrap().starts_with("Patient 0: age:"));
}

#[tokio::test]
async fn bulk_create_and_dashboard() {
    let server = TestServer::start().await;
    let token = server.admin_token().await;

    let response = server
        .client
        .post(server.url("/patients/bulk"))
        .bearer_auth(&token)
        .json(&json!([high_risk_patient(), { "age": 40 }, low_risk_patient()]))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["created_count"], 2);
    let errors = body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].as_str().unwrap().starts_with("Patient 1:"));

    let summary: Value = server
        .client
        .get(server.url("/dashboard/summary"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["total_patients"], 2);
    assert_eq!(summary["high_risk_count"], 1);
    assert_eq!(summary["predictions_today"], 2);

    let page: Value = server
        .client
        .get(server.url("/patients?page=1&per_page=1&search=ana"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 1);
    assert_eq!(page["patients"][0]["name"], "Ana Lima");

    let response = server
        .client
        .post(server.url("/patients/bulk"))
        .bearer_auth(&token)
        .json(&high_risk_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn nurses_read_but_cannot_write() {
    let server = TestServer::start().await;
    let admin = server.admin_token().await;

    let response = server
        .client
        .post(server.url("/auth/register"))
        .bearer_auth(&admin)
        .json(&json!({
            "email": "nurse@hospital.com",
            "password": "nurse-pass",
            "name": "Nurse Joy",
            "role": "nurse"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let nurse = server.login("nurse@hospital.com", "nurse-pass").await;
    let me: Value = server
        .client
        .get(server.url("/auth/me"))
        .bearer_auth(&nurse)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["role"], "nurse");

    let response = server
        .client
        .get(server.url("/patients/all"))
        .bearer_auth(&nurse)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = server
        .client
        .post(server.url("/patients"))
        .bearer_auth(&nurse)
        .json(&low_risk_patient())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .post(server.url("/auth/register"))
        .bearer_auth(&nurse)
        .json(&json!({ "email": "x@hospital.com", "password": "whatever", "name": "X" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = server
        .client
        .post(server.url("/auth/register"))
        .bearer_auth(&admin)
        .json(&json!({ "email": "nurse@hospital.com", "password": "another", "name": "Dup" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}
