mod infra;

pub mod app;
pub mod health;
pub mod tracing;

pub use infra::*;

// re-export extras
pub use actix_web_httpauth as httpauth;
