use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::users::{dto::Envelope, validation::ValidationErrors};

pub const MSG_NOT_FOUND: &str = "No se ha encontrado el usuario";
pub const MSG_EMAIL_UNKNOWN: &str = "El email es incorrecto";
pub const MSG_WRONG_PASSWORD: &str = "La contraseña es incorrecta";
pub const MSG_MALFORMED: &str = "La solicitud no es válida";

#[derive(Debug, Error)]
pub enum UserError {
    #[error("validation failed")]
    Validation(ValidationErrors),

    #[error("user not found")]
    NotFound,

    /// Login with an email no user has.
    #[error("unknown email")]
    UnknownEmail,

    #[error("incorrect password")]
    IncorrectPassword,

    /// The store's unique constraint rejected the email after validation passed.
    #[error("email already registered")]
    EmailTaken,

    #[error("malformed request: {0}")]
    Malformed(String),

    /// A store or hasher failure, reported with an operation specific message.
    #[error("{message}: {source}")]
    Failed {
        status: StatusCode,
        message: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn failed(message: &'static str, source: impl Into<anyhow::Error>) -> Self {
        UserError::Failed {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            UserError::NotFound | UserError::UnknownEmail => StatusCode::NOT_FOUND,
            UserError::Validation(_)
            | UserError::IncorrectPassword
            | UserError::EmailTaken
            | UserError::Malformed(_) => StatusCode::BAD_REQUEST,
            UserError::Failed { status, .. } => *status,
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            UserError::Validation(errors) => Envelope::invalid(errors),
            UserError::NotFound => Envelope::error(MSG_NOT_FOUND),
            UserError::UnknownEmail => Envelope::error(MSG_EMAIL_UNKNOWN),
            UserError::IncorrectPassword => Envelope::error(MSG_WRONG_PASSWORD),
            UserError::EmailTaken => {
                let mut errors = ValidationErrors::new();
                errors.add_taken("email");
                Envelope::invalid(errors)
            }
            UserError::Malformed(_) => Envelope::error(MSG_MALFORMED),
            UserError::Failed {
                message, source, ..
            } => {
                error!(error = %source, %status, "{message}");
                Envelope::error(message)
            }
        };
        (status, Json(body)).into_response()
    }
}
