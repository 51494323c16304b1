use actix_web::{
    http::{header, StatusCode},
    HttpResponse, ResponseError,
};
use magna_common::error::ErrorInformation;

#[derive(Debug, thiserror::Error)]
pub enum AuthenticationError {
    #[error("Authentication failed")]
    Failed,
    #[error("Authentication required")]
    Unauthorized,
}

impl ResponseError for AuthenticationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::WWW_AUTHENTICATE, "Bearer"))
            .json(ErrorInformation::new("Unauthorized", self))
    }
}
