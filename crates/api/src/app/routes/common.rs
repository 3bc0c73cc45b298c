use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;

use storefront_core::DomainError;

use crate::app::errors;

/// Parse a path id, answering 400 on malformed input.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}

/// Map a JSON body rejection into the common error body.
pub fn bad_body(rejection: JsonRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}
