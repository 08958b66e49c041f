use crate::error::ApiError;
use crate::money::Amount;

pub fn required<T>(field: &str, value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::validation(format!("The {} field is required.", field)))
}

/// Trimmed, non-empty text.
pub fn text(field: &str, value: String) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ApiError::validation(format!("The {} field is required.", field)));
    }
    Ok(trimmed.to_string())
}

pub fn optional_text(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    value.map(|v| text(field, v)).transpose()
}

/// Absolute http(s) URL.
pub fn link(field: &str, value: String) -> Result<String, ApiError> {
    let value = text(field, value)?;
    match url::Url::parse(&value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            Ok(value)
        }
        _ => Err(ApiError::validation(format!("The {} field must be a valid URL.", field))),
    }
}

/// Any amount whose magnitude is within [`Amount::LIMIT`].
pub fn amount(field: &str, value: Amount) -> Result<Amount, ApiError> {
    if !value.within_limit() {
        return Err(ApiError::validation(format!(
            "The {} field must be between -{} and {}.",
            field,
            Amount::LIMIT,
            Amount::LIMIT
        )));
    }
    Ok(value)
}

pub fn non_negative(field: &str, value: Amount) -> Result<Amount, ApiError> {
    let value = amount(field, value)?;
    if value.is_negative() {
        return Err(ApiError::validation(format!("The {} field must be at least 0.", field)));
    }
    Ok(value)
}
