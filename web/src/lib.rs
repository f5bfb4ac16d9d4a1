//! Axum integration for the Railbook reservation core.
//!
//! The core returns typed [`ReservationError`](railbook_core::ReservationError)s
//! and knows nothing about HTTP. This crate is the thin shell between the two:
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              Axum shell                 │  ← JSON, headers, status codes
//! │  - Caller identity (X-User-Id/Role)     │  ← Correlation ids, tracing spans
//! │  - Request rejection → AppError         │
//! ├─────────────────────────────────────────┤
//! │           railbook-core                 │
//! │  - Seat inventory, booking ledger       │  ← Synchronous, lock-per-train
//! │  - Typed errors with an ErrorKind       │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Request Flow
//!
//! 1. [`correlation_id_layer`] opens an `http_request` span
//! 2. Extractors parse the body, query and [`Caller`]
//! 3. The handler calls into the core
//! 4. Errors convert into [`AppError`] and render as `{"kind", "detail"}`

#![forbid(unsafe_code)]

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;

pub use error::{AppError, ErrorBody, status_for};
pub use extractors::{
    AdminCaller, ApiJson, ApiPath, ApiQuery, Caller, CorrelationId, USER_ID_HEADER,
    USER_ROLE_HEADER,
};
pub use middleware::{CORRELATION_ID_HEADER, CorrelationIdExt, correlation_id_layer};

/// Result type alias for web handlers.
pub type WebResult<T> = Result<T, AppError>;
