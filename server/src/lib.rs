
use magna_auth::{auth::AuthConfigArguments, authenticator::Authenticator};
use magna_common::{
    config::{self, CreationMode},
    db::Database,
};
use magna_infrastructure::{
    app::{
        http::{HttpServerBuilder, HttpServerConfig},
        new_auth,
    },
    health::check_fn,
    Infrastructure, InfrastructureConfig, InitContext, MainContext,
};
use std::{process::ExitCode, sync::Arc};
use utoipa::openapi::{Info, InfoBuilder};

/// Run the API server
#[derive(clap::Args, Debug)]
pub struct Run {
    /// The database creation mode
    #[arg(long, env, value_enum, default_value_t = CreationMode::Default)]
    pub creation: CreationMode,

    #[command(flatten)]
    pub database: config::Database,

    #[command(flatten)]
    pub auth: AuthConfigArguments,

    #[command(flatten)]
    pub http: HttpServerConfig,

    #[command(flatten)]
    pub infra: InfrastructureConfig,
}

impl Run {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        let Self {
            creation,
            database,
            auth,
            http,
            infra,
        } = self;

        Infrastructure::from(infra)
            .run(
                |context| InitData::new(context, creation, database, auth),
                |context: MainContext<InitData>| context.init_data.run(http),
            )
            .await?;

        Ok(ExitCode::SUCCESS)
    }
}

struct InitData {
    db: Database,
    authenticator: Arc<Authenticator>,
}

impl InitData {
    async fn new(
        context: InitContext,
        creation: CreationMode,
        database: config::Database,
        auth: AuthConfigArguments,
    ) -> anyhow::Result<Self> {
        let authenticator = Arc::new(auth.authenticator()?);

        log::info!("Using database: {} ({creation})", database.name);
        let db = Database::with_external_config(&database, creation).await?;

        let check = db.clone();
        context.health.readiness.register(
            "database",
            check_fn(move || {
                let db = check.clone();
                async move { db.ping().await }
            }),
        );

        Ok(Self { db, authenticator })
    }

    async fn run(self, http: HttpServerConfig) -> anyhow::Result<()> {
        let Self { db, authenticator } = self;

        HttpServerBuilder::try_from(http)?
            .openapi_info(openapi_info())
            .configure(move |svc| configure(svc, db.clone(), authenticator.clone()))
            .run()
            .await
    }
}

/// Mount the API, every endpoint below `/api` requires a bearer token.
pub fn configure(
    svc: &mut utoipa_actix_web::service_config::ServiceConfig,
    db: Database,
    authenticator: Arc<Authenticator>,
) {
    svc.service(
        utoipa_actix_web::scope("/api")
            .wrap(new_auth(authenticator))
            .configure(|svc| magna_module_fundamental::configure(svc, db.clone())),
    );
}

pub fn openapi_info() -> Info {
    InfoBuilder::new()
        .title("Magna")
        .description(Some("Social messaging API"))
        .version(env!("CARGO_PKG_VERSION"))
        .build()
}
