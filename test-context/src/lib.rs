#![allow(clippy::expect_used)]

pub mod auth;
pub mod call;

use magna_common::{config, db::Database, time::now};
use magna_entity::user;
use sea_orm::{ActiveModelTrait, Set};
use std::env;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tracing::instrument;

#[allow(dead_code)]
pub struct MagnaContext {
    pub db: Database,
    tempdir: Option<TempDir>,
}

impl MagnaContext {
    /// Create a user, using the id as username.
    pub async fn create_user(&self, id: &str) -> Result<user::Model, anyhow::Error> {
        let now = now();
        Ok(user::ActiveModel {
            id: Set(id.to_string()),
            username: Set(id.to_string()),
            avatar_url: Set(None),
            bio: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?)
    }

    pub async fn create_users<'a, I>(&self, ids: I) -> Result<Vec<user::Model>, anyhow::Error>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut result = Vec::new();
        for id in ids {
            result.push(self.create_user(id).await?);
        }
        Ok(result)
    }
}

impl AsyncTestContext for MagnaContext {
    #[instrument]
    async fn setup() -> MagnaContext {
        if env::var("EXTERNAL_TEST_DB").is_ok() {
            log::warn!("Using external database from 'DB_*' env vars");
            let config = config::Database::from_env().expect("DB config from env");

            let db = if env::var("EXTERNAL_TEST_DB_BOOTSTRAP").is_ok() {
                Database::bootstrap(&config).await
            } else {
                Database::with_external_config(&config, config::CreationMode::RefreshSchema)
                    .await
            }
            .expect("Configuring the database");

            return MagnaContext { db, tempdir: None };
        }

        let tempdir = tempfile::tempdir().expect("Create a temporary directory");
        let config = config::Database::sqlite(tempdir.path().join("magna.db").display());
        log::debug!("Using test database: {}", config.to_url());

        let db = Database::new(&config)
            .await
            .expect("Create a test database");
        db.migrate().await.expect("Apply migrations");

        MagnaContext {
            db,
            tempdir: Some(tempdir),
        }
    }

    async fn teardown(self) {
        if let Err(err) = self.db.close().await {
            log::warn!("Failed to close test database: {err}");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use sea_orm::{EntityTrait, PaginatorTrait};
    use test_context::test_context;
    use test_log::test;

    #[test_context(MagnaContext)]
    #[test(tokio::test)]
    async fn create_users(ctx: &MagnaContext) -> Result<(), anyhow::Error> {
        ctx.create_users(["u1", "u2"]).await?;

        assert_eq!(user::Entity::find().count(&ctx.db).await?, 2);
        assert!(ctx.create_user("u1").await.is_err());

        Ok(())
    }
}
