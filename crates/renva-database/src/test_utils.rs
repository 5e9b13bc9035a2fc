//! Test utilities for database integration tests
//!
//! Provides a shared PostgreSQL testcontainer plus helpers to run migrations,
//! reused by integration tests across the renva crates.

use crate::DbConnection;
use renva_migrations::Migrator;
use sea_orm::*;
use sea_orm_migration::MigratorTrait;
use std::sync::Arc;
use testcontainers::{runners::AsyncRunner, ContainerAsync, GenericImage, ImageExt};
use tokio::sync::{Mutex, OnceCell};

/// Shared test database container that lives for the duration of the test run
static TEST_CONTAINER: OnceCell<Arc<Mutex<SharedContainer>>> = OnceCell::const_new();

/// Serializes migration runs; parallel tests must not race table creation
static MIGRATION_LOCK: OnceCell<Arc<Mutex<()>>> = OnceCell::const_new();

/// Shared container wrapper that holds the database container and connection details
struct SharedContainer {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    database_url: String,
}

impl SharedContainer {
    async fn new() -> anyhow::Result<Self> {
        let db_name = "test_db";
        let username = "test_user";
        let password = "test_password";

        let postgres_container = GenericImage::new("postgres", "16-alpine")
            .with_env_var("POSTGRES_DB", db_name)
            .with_env_var("POSTGRES_USER", username)
            .with_env_var("POSTGRES_PASSWORD", password)
            .with_env_var("POSTGRES_HOST_AUTH_METHOD", "trust")
            .start()
            .await?;

        let port = postgres_container.get_host_port_ipv4(5432).await?;
        let database_url = format!(
            "postgresql://{}:{}@localhost:{}/{}",
            username, password, port, db_name
        );

        // Wait for the database to be ready
        tokio::time::sleep(tokio::time::Duration::from_secs(3)).await;

        Ok(Self {
            container: postgres_container,
            database_url,
        })
    }
}

/// Test database handle backed by the shared container
pub struct TestDatabase {
    pub db: Arc<DbConnection>,
    pub database_url: String,
}

impl TestDatabase {
    async fn get_or_create_container() -> anyhow::Result<Arc<Mutex<SharedContainer>>> {
        TEST_CONTAINER
            .get_or_try_init(|| async {
                let container = SharedContainer::new().await?;
                Ok(Arc::new(Mutex::new(container)))
            })
            .await
            .map(Arc::clone)
    }

    /// Create a new connection to the shared test container
    pub async fn new() -> anyhow::Result<Self> {
        let container = Self::get_or_create_container().await?;
        let database_url = container.lock().await.database_url.clone();

        let db = Self::connect_with_retry(&database_url, 20).await?;

        Ok(TestDatabase {
            db: Arc::new(db),
            database_url,
        })
    }

    /// Create a test database and run all migrations
    pub async fn with_migrations() -> anyhow::Result<Self> {
        let test_db = Self::new().await?;

        let lock = MIGRATION_LOCK
            .get_or_init(|| async { Arc::new(Mutex::new(())) })
            .await;
        let _guard = lock.lock().await;

        Migrator::up(test_db.db.as_ref(), None)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;

        Ok(test_db)
    }

    /// Truncate all inbox tables for test isolation
    pub async fn truncate_inbox_tables(&self) -> anyhow::Result<()> {
        for table in [
            "email_delivery_logs",
            "email_attachments",
            "email_raw_messages",
            "email_messages",
            "email_threads",
            "email_addresses",
            "processed_emails",
            "workflow_logs",
            "email_workflows",
            "subscriptions",
            "properties",
            "team_members",
            "teams",
            "users",
        ] {
            self.db
                .execute(Statement::from_string(
                    DatabaseBackend::Postgres,
                    format!("TRUNCATE TABLE {} CASCADE", table),
                ))
                .await?;
        }
        Ok(())
    }

    async fn connect_with_retry(database_url: &str, retries: u32) -> anyhow::Result<DbConnection> {
        let mut remaining = retries;
        loop {
            match Database::connect(database_url).await {
                Ok(db) => return Ok(db),
                Err(e) if remaining > 0 => {
                    remaining -= 1;
                    tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
                    if remaining == 0 {
                        return Err(anyhow::anyhow!(
                            "Failed to connect to database after retries: {}",
                            e
                        ));
                    }
                }
                Err(e) => return Err(anyhow::anyhow!("Failed to connect to database: {}", e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_migrations_apply_cleanly() -> anyhow::Result<()> {
        let test_db = TestDatabase::with_migrations().await?;

        let result = test_db
            .db
            .query_one(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT COUNT(*) AS n FROM email_threads".to_owned(),
            ))
            .await?;

        assert!(result.is_some());
        Ok(())
    }
}
