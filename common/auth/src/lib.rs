pub mod auth;
pub mod authenticator;
pub mod utoipa;
