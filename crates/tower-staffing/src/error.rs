use crate::config::ConfigError;
use crate::relay::RelayError;
use crate::telemetry::TelemetryError;
use crate::workflows::import::ImportError;
use crate::workflows::roster::service::RosterServiceError;
use crate::workflows::roster::RosterError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Roster(RosterServiceError),
    Relay(RelayError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Roster(err) => roster_status(err),
            AppError::Relay(err) => relay_status(err),
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn roster_status(err: &RosterServiceError) -> StatusCode {
    match err {
        RosterServiceError::Roster(RosterError::DuplicateName { .. }) => StatusCode::CONFLICT,
        RosterServiceError::Roster(
            RosterError::ResidentNotFound(_)
            | RosterError::ShopNotFound(_)
            | RosterError::UnknownName { .. },
        ) => StatusCode::NOT_FOUND,
        RosterServiceError::Roster(_)
        | RosterServiceError::Optimizer(_)
        | RosterServiceError::Import(ImportError::Malformed { .. }) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RosterServiceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn relay_status(err: &RelayError) -> StatusCode {
    match err {
        RelayError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        RelayError::InvalidRequest(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RelayError::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
        RelayError::Api { .. } | RelayError::Http(_) | RelayError::EmptyResponse => {
            StatusCode::BAD_GATEWAY
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Roster(err) => write!(f, "{}", err),
            AppError::Relay(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Roster(err) => Some(err),
            AppError::Relay(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<RosterServiceError> for AppError {
    fn from(value: RosterServiceError) -> Self {
        Self::Roster(value)
    }
}

impl From<RosterError> for AppError {
    fn from(value: RosterError) -> Self {
        Self::Roster(RosterServiceError::Roster(value))
    }
}

impl From<ImportError> for AppError {
    fn from(value: ImportError) -> Self {
        Self::Roster(RosterServiceError::Import(value))
    }
}

impl From<RelayError> for AppError {
    fn from(value: RelayError) -> Self {
        Self::Relay(value)
    }
}
