use log::{debug, error};
use rocket::{
    http::{Status, StatusClass},
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    logging::{redact, RequestId},
    mail::MailError,
    storage::StoreError,
    Config,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to clients whenever a backend dependency fails.
pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Validation(String),
    /// Covers both "never issued" and "already used".
    #[error("Invalid or expired Secret ID.")]
    InvalidToken,
    #[error("Failed to send email: {0}")]
    MailDelivery(#[from] MailError),
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> Status {
        match self {
            Self::Validation(_) | Self::InvalidToken => Status::BadRequest,
            Self::MailDelivery(_) | Self::Storage(_) => Status::InternalServerError,
            Self::NotFound(_) => Status::NotFound,
            Self::Forbidden(_) => Status::Forbidden,
        }
    }

    /// The message that is safe to show to a client.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::InvalidToken => self.to_string(),
            Self::MailDelivery(_) => "Failed to send email.".to_string(),
            Self::Storage(_) => SERVER_ERROR_MESSAGE.to_string(),
            Self::NotFound(what) => format!("{what} not found"),
            Self::Forbidden(_) => "Not available in production".to_string(),
        }
    }
}

/// JSON body of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let server_error = status.class() == StatusClass::ServerError;
        let id = RequestId::of(req);
        if server_error {
            let path = redact(req.uri().path().as_str());
            error!("{id} {path} failed: {self}");
        } else {
            debug!("{id} rejected: {self}");
        }

        let expose = req
            .rocket()
            .state::<Config>()
            .map(Config::expose_errors)
            .unwrap_or(false);
        let body = ErrorBody {
            message: self.public_message(),
            error: (server_error && expose).then(|| self.to_string()),
        };
        (status, Json(body)).respond_to(req)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dependency_errors_hide_detail() {
        let err = Error::Storage(StoreError::Kv("connection reset".to_string()));
        assert_eq!(err.status(), Status::InternalServerError);
        assert_eq!(err.public_message(), SERVER_ERROR_MESSAGE);
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn invalid_token_is_client_error() {
        assert_eq!(Error::InvalidToken.status(), Status::BadRequest);
        assert_eq!(
            Error::InvalidToken.public_message(),
            "Invalid or expired Secret ID."
        );
    }
}
