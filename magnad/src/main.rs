use clap::Parser;
use magna_auth::auth::AuthConfigArguments;
use magna_infrastructure::tracing::init_tracing;
use std::process::{ExitCode, Termination};

mod db;

#[allow(clippy::large_enum_variant)]
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Run the API server
    Api(magna_server::Run),
    /// Manage the database
    Db(db::Run),
    /// Issue an access token for a user
    Token(Token),
}

#[derive(clap::Args, Debug)]
pub struct Token {
    /// The id of the user
    pub user_id: String,

    #[command(flatten)]
    pub auth: AuthConfigArguments,
}

impl Token {
    fn run(self) -> anyhow::Result<ExitCode> {
        let authenticator = self.auth.authenticator()?;
        println!("{}", authenticator.issue(&self.user_id));
        Ok(ExitCode::SUCCESS)
    }
}

#[derive(clap::Parser, Debug)]
#[command(
    author,
    version = env!("CARGO_PKG_VERSION"),
    about = "magnad",
    long_about = None
)]
pub struct Magnad {
    #[command(subcommand)]
    pub(crate) command: Command,
}

impl Magnad {
    async fn run(self) -> ExitCode {
        match self.run_command().await {
            Ok(code) => code,
            Err(err) => {
                log::error!("Error: {err}");
                for (n, err) in err.chain().skip(1).enumerate() {
                    if n == 0 {
                        log::error!("Caused by:");
                    }
                    log::error!("\t{err}");
                }

                ExitCode::FAILURE
            }
        }
    }

    async fn run_command(self) -> anyhow::Result<ExitCode> {
        init_tracing();

        match self.command {
            Command::Api(run) => run.run().await,
            Command::Db(run) => run.run().await,
            Command::Token(token) => token.run(),
        }
    }
}

#[actix_web::main]
async fn main() -> impl Termination {
    Magnad::parse().run().await
}
