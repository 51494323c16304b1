pub mod chat;
pub mod endpoints;
pub mod error;
pub mod friend;
pub mod user;

pub use endpoints::configure;
pub use error::Error;
