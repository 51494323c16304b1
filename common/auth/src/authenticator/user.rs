use super::error::AuthenticationError;
use actix_web::{dev::Payload, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};

/// Details of an authenticated user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserDetails {
    /// The user's id, as issued in the access token
    pub id: String,
}

/// Extract the details of an authenticated user, failing with `401` for anonymous requests.
impl FromRequest for UserDetails {
    type Error = AuthenticationError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserDetails>()
                .cloned()
                .ok_or(AuthenticationError::Unauthorized),
        )
    }
}
