//! Rolegate configuration reconciliation commands.

#![forbid(unsafe_code)]

use std::env;
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use rolegate_application::{
    ChangeKind, ConfigSyncService, ItemChange, PermissionSeedReport, RoleSeedReport,
};
use rolegate_core::{AppError, AppResult};
use rolegate_domain::AccessConfig;
use rolegate_infrastructure::PostgresRoleDirectoryRepository;
use sqlx::postgres::PgPoolOptions;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: rolegate-cli <roles:seed|roles:sync|permissions:seed|permissions:sync>";

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    init_tracing();

    let Some(command) = env::args().nth(1) else {
        error!("{USAGE}");
        return ExitCode::FAILURE;
    };

    match run(command.as_str()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(command = %command, %error, "command failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: &str) -> AppResult<()> {
    if !matches!(
        command,
        "roles:seed" | "roles:sync" | "permissions:seed" | "permissions:sync"
    ) {
        return Err(AppError::Validation(format!(
            "unknown command '{command}'; {USAGE}"
        )));
    }

    let config_path =
        env::var("ROLEGATE_CONFIG").unwrap_or_else(|_| "config/roles.json".to_owned());
    let config = load_config(config_path.as_ref())?;

    let database_url = required_env("DATABASE_URL")?;
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))?;

    sqlx::migrate!("../../crates/infrastructure/migrations")
        .run(&pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to run migrations: {error}")))?;

    let sync = ConfigSyncService::new(Arc::new(PostgresRoleDirectoryRepository::new(pool)));

    match command {
        "roles:seed" => {
            let report = sync.seed_roles(&config).await?;
            log_role_seed(&report);
        }
        "roles:sync" => {
            let report = sync.sync_roles(&config).await?;
            log_role_seed(&report.seeded);
            info!(
                removed_roles = report.removed_roles,
                removed_permissions = report.removed_permissions,
                "undeclared rows removed"
            );
        }
        "permissions:seed" => {
            let report = sync.seed_permissions(&config).await?;
            log_permission_seed(&report);
        }
        "permissions:sync" => {
            let report = sync.sync_permissions(&config).await?;
            log_permission_seed(&report.seeded);
            info!(removed = report.removed, "undeclared permissions removed");
        }
        _ => {}
    }

    Ok(())
}

fn load_config(path: &Path) -> AppResult<AccessConfig> {
    let raw = fs::read_to_string(path).map_err(|error| {
        AppError::Validation(format!(
            "failed to read configuration '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(raw.as_str()).map_err(|error| {
        AppError::Validation(format!(
            "failed to parse configuration '{}': {error}",
            path.display()
        ))
    })
}

fn log_role_seed(report: &RoleSeedReport) {
    log_changes("role", &report.role_changes);
    log_permission_seed(&report.permissions);
    info!(
        added = report.role_count(ChangeKind::Added),
        updated = report.role_count(ChangeKind::Updated),
        unchanged = report.role_count(ChangeKind::Unchanged),
        skipped = report.role_count(ChangeKind::Skipped),
        "roles reconciled"
    );
}

fn log_permission_seed(report: &PermissionSeedReport) {
    log_changes("permission", &report.changes);
    info!(
        added = report.count(ChangeKind::Added),
        updated = report.count(ChangeKind::Updated),
        restored = report.count(ChangeKind::Restored),
        unchanged = report.count(ChangeKind::Unchanged),
        "permissions reconciled"
    );
}

fn log_changes(kind: &str, changes: &[ItemChange]) {
    for change in changes {
        match change.kind {
            ChangeKind::Added => {
                info!(slug = %change.slug, name = %change.name, "{kind} created");
            }
            ChangeKind::Updated => {
                info!(slug = %change.slug, name = %change.name, "{kind} renamed");
            }
            ChangeKind::Restored => {
                info!(slug = %change.slug, name = %change.name, "{kind} restored");
            }
            ChangeKind::Unchanged => {}
            ChangeKind::Skipped => {
                warn!(slug = %change.slug, "{kind} declaration skipped: missing display name");
            }
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}
