use magna_common::{
    config::{CreationMode, Database},
    db,
};
use std::process::ExitCode;

#[derive(clap::Args, Debug)]
pub struct Run {
    #[command(subcommand)]
    pub(crate) command: Command,
    #[command(flatten)]
    pub(crate) database: Database,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Create the database, dropping an existing one, and apply all migrations
    Create,
    /// Apply pending migrations
    Migrate,
    /// Roll back all migrations and re-apply them
    Refresh,
}

impl Run {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        use Command::*;
        match self.command {
            Create => self.config(CreationMode::Bootstrap).await,
            Migrate => self.config(CreationMode::Default).await,
            Refresh => self.config(CreationMode::RefreshSchema).await,
        }
    }

    async fn config(self, mode: CreationMode) -> anyhow::Result<ExitCode> {
        let db = db::Database::with_external_config(&self.database, mode).await?;
        log::info!("Database {} is ready ({mode})", self.database.name);
        db.close().await?;
        Ok(ExitCode::SUCCESS)
    }
}
