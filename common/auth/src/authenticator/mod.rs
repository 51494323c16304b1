pub mod actix;
pub mod error;
pub mod user;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use error::AuthenticationError;
use ring::hmac;
use user::UserDetails;

/// Issues and validates access tokens.
///
/// A token has the form `<base64url(user id)>.<base64url(HMAC-SHA256 of the first part)>`.
pub struct Authenticator {
    key: Option<hmac::Key>,
}

impl Authenticator {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: Some(hmac::Key::new(hmac::HMAC_SHA256, secret)),
        }
    }

    /// An authenticator which accepts any bearer token, using it verbatim as the user id.
    pub fn insecure() -> Self {
        Self { key: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    /// Issue a token for the user.
    pub fn issue(&self, user_id: &str) -> String {
        match &self.key {
            Some(key) => {
                let payload = URL_SAFE_NO_PAD.encode(user_id);
                let tag = hmac::sign(key, payload.as_bytes());
                format!("{payload}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref()))
            }
            None => user_id.to_string(),
        }
    }

    /// Validate a token, returning the user it was issued for.
    pub fn validate(&self, token: &str) -> Result<UserDetails, AuthenticationError> {
        let id = match &self.key {
            Some(key) => {
                let (payload, signature) =
                    token.split_once('.').ok_or(AuthenticationError::Failed)?;
                let signature = URL_SAFE_NO_PAD
                    .decode(signature)
                    .map_err(|_| AuthenticationError::Failed)?;
                hmac::verify(key, payload.as_bytes(), &signature)
                    .map_err(|_| AuthenticationError::Failed)?;

                let id = URL_SAFE_NO_PAD
                    .decode(payload)
                    .map_err(|_| AuthenticationError::Failed)?;
                String::from_utf8(id).map_err(|_| AuthenticationError::Failed)?
            }
            None => token.to_string(),
        };

        if id.trim().is_empty() {
            return Err(AuthenticationError::Failed);
        }

        Ok(UserDetails { id })
    }
}
