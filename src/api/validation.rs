use super::ApiError;

pub fn validate_limit(limit: u64) -> Result<u64, ApiError> {
    const MAX_LIMIT: u64 = 1000;
    const MIN_LIMIT: u64 = 1;

    if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
        return Err(ApiError::validation(format!(
            "Invalid limit: {}. Limit must be between {} and {}",
            limit, MIN_LIMIT, MAX_LIMIT
        )));
    }
    Ok(limit)
}

pub fn validate_entity_id(id: i32, what: &str) -> Result<i32, ApiError> {
    if id <= 0 {
        return Err(ApiError::validation(format!(
            "Invalid {} ID: {}. ID must be a positive integer",
            what, id
        )));
    }
    Ok(id)
}

/// Missing amounts default to one unit.
pub fn validate_amount(amount: Option<f64>) -> Result<f64, ApiError> {
    let amount = amount.unwrap_or(1.0);
    if !amount.is_finite() || amount < 0.0 {
        return Err(ApiError::validation(
            "Amount must be a non-negative number",
        ));
    }
    Ok(amount)
}

pub fn validate_timestamp(value: Option<i64>, field: &str) -> Result<Option<i64>, ApiError> {
    match value {
        Some(ts) if ts < 0 => Err(ApiError::validation(format!(
            "{} must be a unix timestamp in seconds",
            field
        ))),
        other => Ok(other),
    }
}
