//! HTTP route handlers.

pub mod bookings;
pub mod internal;
pub mod ops;
pub mod payments;
pub mod webhook;

use std::str::FromStr;

use axum::http::HeaderMap;
use chrono::{NaiveDate, NaiveTime};
use common::UserId;

use crate::error::ApiError;

/// Header carrying the authenticated caller's user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Reads the caller's user id from [`USER_ID_HEADER`].
pub(crate) fn user_id(headers: &HeaderMap) -> Result<UserId, ApiError> {
    let raw = headers
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::BadRequest(format!("missing {USER_ID_HEADER} header")))?;
    parse_id(raw, "user id")
}

pub(crate) fn parse_id<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid {what}: {e}")))
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|e| ApiError::BadRequest(format!("Invalid date {raw:?}: {e}")))
}

/// Accepts `HH:MM` and `HH:MM:SS`.
pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M"))
        .map_err(|e| ApiError::BadRequest(format!("Invalid time {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn time_accepts_both_forms() {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(parse_time("09:00").unwrap(), nine);
        assert_eq!(parse_time("09:00:00").unwrap(), nine);
        assert!(parse_time("9am").is_err());
    }

    #[test]
    fn missing_or_bad_user_header_is_rejected() {
        let mut headers = HeaderMap::new();
        assert!(matches!(user_id(&headers), Err(ApiError::BadRequest(_))));

        headers.insert(USER_ID_HEADER, HeaderValue::from_static("nope"));
        assert!(matches!(user_id(&headers), Err(ApiError::BadRequest(_))));

        let id = UserId::new();
        headers.insert(USER_ID_HEADER, HeaderValue::from_str(&id.to_string()).unwrap());
        assert_eq!(user_id(&headers).unwrap(), id);
    }
}
