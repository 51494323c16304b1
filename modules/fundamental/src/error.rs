use actix_web::{body::BoxBody, http::StatusCode, HttpResponse, ResponseError};
use magna_common::{db::DatabaseErrors, error::ErrorInformation};
use sea_orm::DbErr;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Database(anyhow::Error),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<DbErr> for Error {
    fn from(value: DbErr) -> Self {
        Self::Database(value.into())
    }
}

impl DatabaseErrors for Error {
    fn is_duplicate(&self) -> bool {
        self.db_err().is_some_and(DbErr::is_duplicate)
    }

    fn is_busy(&self) -> bool {
        self.db_err().is_some_and(DbErr::is_busy)
    }
}

impl Error {
    fn db_err(&self) -> Option<&DbErr> {
        match self {
            Self::Database(err) => err.downcast_ref(),
            _ => None,
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Database(_) | Self::Any(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::BadRequest(msg) => {
                HttpResponse::BadRequest().json(ErrorInformation::new("BadRequest", msg))
            }
            Self::Forbidden(msg) => {
                HttpResponse::Forbidden().json(ErrorInformation::new("Forbidden", msg))
            }
            Self::NotFound(msg) => {
                HttpResponse::NotFound().json(ErrorInformation::new("NotFound", msg))
            }
            Self::Conflict(msg) => {
                HttpResponse::Conflict().json(ErrorInformation::new("Conflict", msg))
            }
            Self::Database(err) => {
                log::error!("Database error: {err}");
                HttpResponse::InternalServerError()
                    .json(ErrorInformation::new("Database error", err))
            }
            Self::Any(err) => {
                log::error!("Internal error: {err}");
                HttpResponse::InternalServerError()
                    .json(ErrorInformation::new("System unknown", err))
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Error::bad_request("x"), StatusCode::BAD_REQUEST)]
    #[case(Error::Forbidden("x".into()), StatusCode::FORBIDDEN)]
    #[case(Error::not_found("x"), StatusCode::NOT_FOUND)]
    #[case(Error::Conflict("x".into()), StatusCode::CONFLICT)]
    #[case(Error::from(DbErr::Custom("x".into())), StatusCode::INTERNAL_SERVER_ERROR)]
    fn error_status(#[case] err: Error, #[case] status: StatusCode) {
        assert_eq!(err.status_code(), status);
        assert_eq!(err.error_response().status(), status);
    }

    #[test]
    fn database_errors_pass_through() {
        let err = Error::from(DbErr::RecordNotFound("x".into()));
        assert!(err.db_err().is_some());
        assert!(!err.is_duplicate());
        assert!(!Error::Conflict("x".into()).is_busy());
    }
}
