use super::Authenticator;
use actix_web::{dev::ServiceRequest, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use std::sync::Arc;

/// Validate the bearer token of a request, attaching the user details on success.
pub async fn bearer_validator(
    req: ServiceRequest,
    auth: BearerAuth,
    authenticator: Arc<Authenticator>,
) -> Result<ServiceRequest, (actix_web::Error, ServiceRequest)> {
    match authenticator.validate(auth.token()) {
        Ok(details) => {
            log::debug!("Authenticated user: {}", details.id);
            req.extensions_mut().insert(details);
            Ok(req)
        }
        Err(err) => {
            log::debug!("Rejecting bearer token: {err}");
            Err((err.into(), req))
        }
    }
}
