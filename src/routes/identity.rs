//! Caller identity extracted from request headers.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user id in `X-User-Id` and the role in `X-User-Role`. These values are
//! trusted as-is.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::booking::Requester;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";

const ADMIN_ROLE: &str = "admin";

fn rejection(status: StatusCode, kind: &str, message: &str) -> Response {
    let body = Json(json!({
        "error": {
            "kind": kind,
            "message": message,
            "retryable": false,
        }
    }));
    (status, body).into_response()
}

fn requester_from_headers(headers: &HeaderMap) -> Option<Requester> {
    let user_id = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())?;
    let is_admin = headers
        .get(USER_ROLE_HEADER)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|role| role.eq_ignore_ascii_case(ADMIN_ROLE));
    Some(Requester {
        user_id: user_id.to_string(),
        is_admin,
    })
}

impl<S> FromRequestParts<S> for Requester
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        requester_from_headers(&parts.headers).ok_or_else(|| {
            rejection(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                "missing X-User-Id header",
            )
        })
    }
}

/// A requester holding the admin role.
#[derive(Debug, Clone)]
pub struct Admin(pub Requester);

impl<S> FromRequestParts<S> for Admin
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let requester = Requester::from_request_parts(parts, state).await?;
        if !requester.is_admin {
            return Err(rejection(
                StatusCode::FORBIDDEN,
                "forbidden",
                "administrator role required",
            ));
        }
        Ok(Admin(requester))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_reads_user_and_role() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("member-1"));
        assert_eq!(requester_from_headers(&headers), Some(Requester::member("member-1")));

        headers.insert(USER_ROLE_HEADER, HeaderValue::from_static("Admin"));
        assert_eq!(requester_from_headers(&headers), Some(Requester::admin("member-1")));
    }

    #[test]
    fn test_blank_user_is_rejected() {
        let mut headers = HeaderMap::new();
        assert_eq!(requester_from_headers(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(requester_from_headers(&headers), None);
    }
}
