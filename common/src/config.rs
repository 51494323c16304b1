use std::fmt::{Display, Formatter};

#[derive(clap::Args, Debug, Clone)]
#[command(next_help_heading = "Database")]
#[group(id = "database")]
pub struct Database {
    /// Full connection URL, overrides all other connection settings
    #[arg(id = "db-url", long, env = "DB_URL")]
    pub url: Option<String>,
    #[arg(id = "db-user", long, env = "DB_USER", default_value = "magna")]
    pub username: String,
    #[arg(id = "db-password", long, env = "DB_PASSWORD", default_value = "magna")]
    pub password: String,
    #[arg(id = "db-host", long, env = "DB_HOST", default_value = "localhost")]
    pub host: String,
    #[arg(id = "db-port", long, env = "DB_PORT", default_value_t = 5432)]
    pub port: u16,
    #[arg(id = "db-name", long, env = "DB_NAME", default_value = "magna")]
    pub name: String,
    #[arg(id = "db-max-conn", long, env = "DB_MAX_CONN", default_value_t = 75)]
    pub max_conn: u32,
    #[arg(id = "db-min-conn", long, env = "DB_MIN_CONN", default_value_t = 25)]
    pub min_conn: u32,
    /// Connect timeout, in seconds
    #[arg(
        id = "db-connect-timeout",
        long,
        env = "DB_CONNECT_TIMEOUT",
        default_value_t = 8
    )]
    pub connect_timeout: u64,
    /// Acquire timeout, in seconds
    #[arg(
        id = "db-acquire-timeout",
        long,
        env = "DB_ACQUIRE_TIMEOUT",
        default_value_t = 8
    )]
    pub acquire_timeout: u64,
}

impl Default for Database {
    fn default() -> Self {
        Self {
            url: None,
            username: "magna".into(),
            password: "magna".into(),
            host: "localhost".into(),
            port: 5432,
            name: "magna".into(),
            max_conn: 75,
            min_conn: 25,
            connect_timeout: 8,
            acquire_timeout: 8,
        }
    }
}

impl Database {
    /// The connection URL, either the explicit one or the one assembled from its parts.
    pub fn to_url(&self) -> String {
        match &self.url {
            Some(url) => url.clone(),
            None => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.name
            ),
        }
    }

    /// Configuration for a SQLite database file, created if missing.
    pub fn sqlite(path: impl Display) -> Self {
        Self {
            url: Some(format!("sqlite:{path}?mode=rwc")),
            max_conn: 5,
            min_conn: 1,
            ..Default::default()
        }
    }

    pub fn is_sqlite(&self) -> bool {
        self.to_url().starts_with("sqlite:")
    }

    /// Read the configuration from the `DB_*` environment variables.
    pub fn from_env() -> Result<Database, anyhow::Error> {
        #[derive(clap::Parser)]
        struct Cli {
            #[command(flatten)]
            database: Database,
        }

        Ok(<Cli as clap::Parser>::try_parse_from(["magna"])?.database)
    }
}

/// How to treat the database schema on startup
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum CreationMode {
    /// Apply pending migrations
    #[default]
    Default,
    /// Drop and re-create the database, then migrate
    Bootstrap,
    /// Roll back all migrations and re-apply them
    RefreshSchema,
}

impl Display for CreationMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Bootstrap => write!(f, "bootstrap"),
            Self::RefreshSchema => write!(f, "refresh-schema"),
        }
    }
}
