use crate::authenticator::Authenticator;
use anyhow::bail;

#[derive(Clone, Debug, Default, clap::Args)]
#[command(
    rename_all_env = "SCREAMING_SNAKE_CASE",
    next_help_heading = "Authentication"
)]
#[group(id = "auth")]
pub struct AuthConfigArguments {
    /// Flag to disable token validation, default is on.
    ///
    /// When disabled, the bearer token is taken as the user id. Never use this in production.
    #[arg(
        id = "auth-disabled",
        default_value_t = false,
        long = "auth-disabled",
        env = "AUTH_DISABLED"
    )]
    pub disabled: bool,

    /// The secret used to sign and validate access tokens
    #[arg(
        id = "auth-token-secret",
        long = "auth-token-secret",
        env = "AUTH_TOKEN_SECRET"
    )]
    pub token_secret: Option<String>,
}

impl AuthConfigArguments {
    /// Create the authenticator for this configuration.
    pub fn authenticator(&self) -> Result<Authenticator, anyhow::Error> {
        if self.disabled {
            log::warn!("Authentication is disabled, accepting any bearer token as user id");
            return Ok(Authenticator::insecure());
        }

        match self.token_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(Authenticator::new(secret.as_bytes())),
            _ => bail!("Authentication requires a token secret (use --auth-token-secret)"),
        }
    }
}
