//! Custom Axum extractors.
//!
//! - [`CorrelationId`]: request correlation id (set by the middleware)
//! - [`Caller`]: identity forwarded by the gateway in `X-User-Id` / `X-User-Role`
//! - [`AdminCaller`]: a [`Caller`] that must hold the admin role
//! - [`ApiJson`], [`ApiQuery`], [`ApiPath`]: the stock extractors with
//!   rejections rendered as [`AppError`] bodies
//!
//! # Examples
//!
//! ```ignore
//! async fn cancel(
//!     State(state): State<AppState>,
//!     caller: Caller,
//!     ApiPath(booking_id): ApiPath<u64>,
//! ) -> Result<Json<BookingView>, AppError> {
//!     let booking = state.system.engine()
//!         .cancel_booking(BookingId::new(booking_id), &caller.requester())?;
//!     Ok(Json(booking.into()))
//! }
//! ```

use crate::error::AppError;
use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::{HeaderMap, request::Parts},
};
use railbook_core::{Requester, Role, UserId};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Header carrying the authenticated user id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the caller's role (`user` or `admin`).
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Correlation ID for request tracing.
///
/// Reads the id stored by
/// [`correlation_id_layer`](crate::middleware::correlation_id_layer), then the
/// `X-Correlation-ID` header, and generates a fresh UUID v4 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Uuid>()
            .copied()
            .or_else(|| {
                parts
                    .headers
                    .get(crate::middleware::CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// Authenticated caller.
///
/// Authentication happens upstream; this extractor only trusts the
/// identity headers. A missing or malformed `X-User-Id` is a 401. A
/// missing role defaults to `user`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    /// User id
    pub user_id: UserId,
    /// Role
    pub role: Role,
}

impl Caller {
    /// Core view of this caller.
    #[must_use]
    pub const fn requester(&self) -> Requester {
        Requester {
            user_id: self.user_id,
            role: self.role,
        }
    }

    /// Whether the caller holds the admin role.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fails with 403 unless the caller is an admin.
    ///
    /// # Errors
    ///
    /// Returns a forbidden [`AppError`] for non-admin callers.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin role required"))
        }
    }
}

fn caller_from_headers(headers: &HeaderMap) -> Result<Caller, AppError> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .ok_or_else(|| AppError::unauthorized(format!("Missing {USER_ID_HEADER} header")))?
        .to_str()
        .ok()
        .and_then(|raw| raw.trim().parse::<UserId>().ok())
        .ok_or_else(|| AppError::unauthorized(format!("Malformed {USER_ID_HEADER} header")))?;

    let role = match headers.get(USER_ROLE_HEADER) {
        None => Role::User,
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|raw| raw.trim().parse::<Role>().ok())
            .ok_or_else(|| AppError::unauthorized(format!("Malformed {USER_ROLE_HEADER} header")))?,
    };

    Ok(Caller { user_id, role })
}

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = caller_from_headers(&parts.headers)?;
        tracing::Span::current().record("user_id", caller.user_id.get());
        Ok(caller)
    }
}

/// Caller that holds the admin role; anyone else gets a 403.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminCaller(pub Caller);

#[async_trait]
impl<S> FromRequestParts<S> for AdminCaller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let caller = Caller::from_request_parts(parts, state).await?;
        caller.require_admin()?;
        Ok(Self(caller))
    }
}

/// JSON body whose rejections render as 400 [`AppError`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string whose rejections render as 400 [`AppError`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Path parameters whose rejections render as 400 [`AppError`]s.
#[derive(Debug, Clone, Copy)]
pub struct ApiPath<T>(pub T);

#[async_trait]
impl<S, T> FromRequestParts<S> for ApiPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use axum::http::{HeaderValue, StatusCode};

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn test_caller_defaults_to_user_role() {
        let caller = caller_from_headers(&headers(&[(USER_ID_HEADER, "7")])).unwrap();
        assert_eq!(caller.user_id, UserId::new(7));
        assert_eq!(caller.role, Role::User);
        assert!(caller.require_admin().is_err());
    }

    #[test]
    fn test_admin_role_parsed() {
        let caller =
            caller_from_headers(&headers(&[(USER_ID_HEADER, "1"), (USER_ROLE_HEADER, "admin")]))
                .unwrap();
        assert!(caller.is_admin());
        assert!(caller.requester().is_admin());
    }

    #[test]
    fn test_missing_user_is_unauthorized() {
        let err = caller_from_headers(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_malformed_headers_are_unauthorized() {
        let bad_id = caller_from_headers(&headers(&[(USER_ID_HEADER, "seven")])).unwrap_err();
        assert_eq!(bad_id.status(), StatusCode::UNAUTHORIZED);

        let bad_role =
            caller_from_headers(&headers(&[(USER_ID_HEADER, "7"), (USER_ROLE_HEADER, "root")]))
                .unwrap_err();
        assert_eq!(bad_role.status(), StatusCode::UNAUTHORIZED);
    }
}
