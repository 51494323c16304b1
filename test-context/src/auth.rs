use actix_http::{HttpMessage, Request};
use magna_auth::authenticator::user::UserDetails;

/// Convenient way of adding (authenticated) user information to the request.
pub trait TestAuthentication: Sized {
    /// Make the request an authenticated request with the provided user details
    fn test_auth_details(self, details: UserDetails) -> Self;

    /// Make the request an authenticated request with the provided user id
    fn test_auth(self, id: impl Into<String>) -> Self {
        self.test_auth_details(UserDetails { id: id.into() })
    }
}

impl TestAuthentication for Request {
    fn test_auth_details(self, details: UserDetails) -> Self {
        self.extensions_mut().insert(details);
        self
    }
}
