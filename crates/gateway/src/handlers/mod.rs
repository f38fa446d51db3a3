//! API handlers module

pub mod articles;
pub mod health;
pub mod summaries;

use tubescribe_common::errors::AppError;
use validator::Validate;

/// Run derive-based validation, surfacing the first failing field
pub(crate) fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request.validate().map_err(|e| {
        let field = e.field_errors().keys().next().map(|k| k.to_string());
        AppError::Validation {
            message: e.to_string(),
            field,
        }
    })
}
