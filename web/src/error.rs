//! Error types for web handlers.
//!
//! [`AppError`] bridges [`ReservationError`] and HTTP responses. Every
//! failure leaves the server as a JSON body of the same shape:
//!
//! ```json
//! { "kind": "INSUFFICIENT_SEATS", "detail": "Not enough seats available on train 3: requested 4, available 2" }
//! ```
//!
//! Clients display `detail` verbatim and branch on `kind`.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use railbook_core::{ErrorKind, ReservationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Detail sent to clients for server-side faults.
const INTERNAL_DETAIL: &str = "An internal error occurred";

/// Application error type for web handlers.
///
/// # Examples
///
/// ```ignore
/// async fn handler(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Train>, AppError> {
///     let train = state.system.train(TrainId::new(id))
///         .ok_or_else(|| AppError::not_found("Train", id))?;
///     Ok(Json(train))
/// }
/// ```
#[derive(Debug)]
pub struct AppError {
    /// HTTP status code
    status: StatusCode,
    /// Machine-readable kind
    kind: String,
    /// Human-readable detail (user-facing)
    detail: String,
    /// Internal error (for logging, not exposed to client)
    source: Option<anyhow::Error>,
}

impl AppError {
    /// Create a new application error.
    #[must_use]
    pub fn new(status: StatusCode, kind: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            status,
            kind: kind.into(),
            detail: detail.into(),
            source: None,
        }
    }

    /// Attach the underlying error for logging.
    #[must_use]
    pub fn with_source(mut self, source: anyhow::Error) -> Self {
        self.source = Some(source);
        self
    }

    /// Create a 400 Bad Request error.
    #[must_use]
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation.as_str(),
            detail,
        )
    }

    /// Create a 401 Unauthorized error.
    #[must_use]
    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", detail)
    }

    /// Create a 403 Forbidden error.
    #[must_use]
    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, ErrorKind::Forbidden.as_str(), detail)
    }

    /// Create a 404 Not Found error.
    #[must_use]
    pub fn not_found(resource: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            ErrorKind::NotFound.as_str(),
            format!("{resource} {id} not found"),
        )
    }

    /// Create a 500 Internal Server Error.
    #[must_use]
    pub fn internal(detail: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Internal.as_str(),
            detail,
        )
    }

    /// HTTP status this error renders with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Machine-readable kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Client-facing detail.
    #[must_use]
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

/// HTTP status for each core error kind.
#[must_use]
pub const fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::InsufficientSeats
        | ErrorKind::CapacityBelowBooked
        | ErrorKind::AlreadyCancelled
        | ErrorKind::HasActiveBookings
        | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.detail)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Error response body (JSON).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable kind
    pub kind: String,
    /// Human-readable detail
    pub detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            if let Some(source) = &self.source {
                tracing::error!(
                    status = %self.status,
                    kind = %self.kind,
                    detail = %self.detail,
                    error = %source,
                    "Internal server error"
                );
            } else {
                tracing::error!(
                    status = %self.status,
                    kind = %self.kind,
                    detail = %self.detail,
                    "Internal server error"
                );
            }
        }

        let body = ErrorBody {
            kind: self.kind,
            detail: self.detail,
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        let kind = err.kind();
        let status = status_for(kind);
        if status.is_server_error() {
            return Self::new(status, kind.as_str(), INTERNAL_DETAIL)
                .with_source(anyhow::Error::new(err));
        }
        Self::new(status, kind.as_str(), err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

/// Convert `anyhow::Error` to `AppError`.
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(INTERNAL_DETAIL).with_source(err)
    }
}
