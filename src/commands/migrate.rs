//! Migrate command - Schema management for the users and products tables.

use crate::cli::args::{MigrateAction, MigrateArgs};
use crate::config::Config;
use crate::errors::{AppError, AppResult};
use crate::infra::Database;

/// Execute the migrate command
pub async fn execute(args: MigrateArgs, config: Config) -> AppResult<()> {
    let db = Database::connect_without_migrations(&config.database_url)
        .await
        .map_err(|e| AppError::internal(format!("Database connection failed: {}", e)))?;

    match args.action {
        MigrateAction::Up => {
            let before = pending(&db).await?;
            db.run_migrations().await?;
            tracing::info!(applied = before.len(), tables = ?before, "schema up to date");
        }
        MigrateAction::Down => {
            let last = applied(&db).await?.pop();
            db.rollback_migration().await?;
            match last {
                Some(table) => tracing::info!(table, "last migration reverted"),
                None => tracing::info!("nothing to revert"),
            }
        }
        MigrateAction::Status => {
            for (name, is_applied) in db.migration_status().await? {
                println!(
                    "{:<48} {:<8} {}",
                    name,
                    if is_applied { "applied" } else { "pending" },
                    table_of(&name)
                );
            }
        }
        MigrateAction::Fresh => {
            tracing::warn!("dropping every table before re-creating the schema");
            db.fresh_migrations().await?;
            tracing::info!(tables = ?applied(&db).await?, "schema recreated");
        }
    }

    Ok(())
}

/// Table a migration creates, taken from its `..._create_<table>_table` name.
fn table_of(migration: &str) -> &str {
    migration
        .split_once("_create_")
        .and_then(|(_, rest)| rest.strip_suffix("_table"))
        .unwrap_or(migration)
}

async fn pending(db: &Database) -> AppResult<Vec<String>> {
    tables_where(db, false).await
}

async fn applied(db: &Database) -> AppResult<Vec<String>> {
    tables_where(db, true).await
}

async fn tables_where(db: &Database, is_applied: bool) -> AppResult<Vec<String>> {
    Ok(db
        .migration_status()
        .await?
        .into_iter()
        .filter(|(_, applied)| *applied == is_applied)
        .map(|(name, _)| table_of(&name).to_string())
        .collect())
}
