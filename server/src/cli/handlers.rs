// server/src/cli/handlers.rs

use anyhow::{Context, Result};
use log::{info, warn};
use tokio::signal;
use tokio::sync::oneshot;

use lib::config::AppConfig;
use lib::storage_engine::create_storage;
use lib::{DashboardAggregator, ServiceContext};
use models::medical::{NewUser, Role};
use rest_api::{build_state, run_server};
use security::AuthService;

pub async fn handle_serve(config: AppConfig, seed: bool) -> Result<()> {
    let state = build_state(config).await?;
    if seed {
        let added = state.ctx.patients.seed_samples().await.context("Failed to seed sample patients")?;
        info!("Seeded {} sample patients", added);
    }

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
        let _ = shutdown_tx.send(());
    });

    run_server(state, shutdown_rx).await
}

pub async fn handle_seed(config: &AppConfig) -> Result<()> {
    let ctx = ServiceContext::open(config).context("Failed to open service context")?;
    let added = ctx.patients.seed_samples().await?;
    ctx.storage.patients.flush().await?;
    if added == 0 {
        println!("Patient store is not empty, nothing seeded.");
    } else {
        println!("Seeded {} sample patients.", added);
    }
    Ok(())
}

pub async fn handle_create_user(
    config: &AppConfig,
    email: String,
    password: String,
    name: String,
    role: Role,
) -> Result<()> {
    let storage = create_storage(&config.storage).context("Failed to open storage")?;
    let auth = AuthService::from_config(storage.users.clone(), &config.auth)?;
    let profile = auth
        .register(NewUser {
            email,
            password,
            name,
            role: Some(role),
        })
        .await?;
    println!("Created {} user {} ({}).", profile.role, profile.email, profile.id);
    Ok(())
}

pub async fn handle_rescore(config: &AppConfig) -> Result<()> {
    let ctx = ServiceContext::open(config).context("Failed to open service context")?;
    let report = ctx.patients.rescore_all().await?;
    println!(
        "Rescored {} patients with the {} scorer ({} failed).",
        report.scored,
        ctx.patients.risk().scorer_name(),
        report.failed
    );
    Ok(())
}

/// Reads the store only, so no model artifact is needed.
pub async fn handle_stats(config: &AppConfig, analytics: bool) -> Result<()> {
    let storage = create_storage(&config.storage).context("Failed to open storage")?;
    let dashboard = DashboardAggregator::new(storage.patients.clone(), &config.dashboard)?;
    let output = if analytics {
        serde_json::to_string_pretty(&dashboard.analytics().await?)?
    } else {
        serde_json::to_string_pretty(&dashboard.stats().await?)?
    };
    println!("{}", output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use lib::config::{ScorerKind, StorageEngineType};
    use tempfile::TempDir;

    use super::*;

    fn sled_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.storage.engine_type = StorageEngineType::Sled;
        config.storage.data_directory = dir.path().to_path_buf();
        config.model.scorer = ScorerKind::Points;
        config
    }

    #[tokio::test]
    async fn seed_then_rescore_persists() {
        let dir = TempDir::new().unwrap();
        let config = sled_config(&dir);

        handle_seed(&config).await.unwrap();
        handle_rescore(&config).await.unwrap();

        let storage = create_storage(&config.storage).unwrap();
        let patients = storage.patients.all_patients().await.unwrap();
        assert_eq!(patients.len(), 5);
        assert!(patients.iter().all(|p| p.prediction.is_some()));
    }

    #[tokio::test]
    async fn create_user_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let config = sled_config(&dir);
        let create = || {
            handle_create_user(
                &config,
                "nurse@hospital.com".into(),
                "nurse-pass".into(),
                "Nurse Joy".into(),
                Role::Nurse,
            )
        };
        create().await.unwrap();
        assert!(create().await.is_err());
    }
}
