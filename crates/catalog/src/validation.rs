use storefront_core::{DomainError, DomainResult};

/// Require a present, non-blank name. The value is stored as given.
pub(crate) fn required_name(field: &str, value: Option<String>) -> DomainResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}

pub(crate) fn price(value: f64) -> DomainResult<f64> {
    if !value.is_finite() {
        return Err(DomainError::validation("price must be a finite number"));
    }
    if value < 0.0 {
        return Err(DomainError::validation("price must not be negative"));
    }
    Ok(value)
}

pub(crate) fn stock(value: i32) -> DomainResult<i32> {
    if value < 0 {
        return Err(DomainError::validation("stock must not be negative"));
    }
    Ok(value)
}
