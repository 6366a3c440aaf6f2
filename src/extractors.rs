//! # Request Extraction Helpers
//!
//! Handlers take `Result<Json<T>, JsonRejection>` and pass it through
//! [`extract_validated_json`], which normalizes body-parse failures to 400
//! and runs the payload's [`Validate`] implementation (failures map to 422).

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Field-level validation for request payloads.
pub trait Validate {
    fn validate(&self) -> Result<(), String>;
}

/// Unwrap a JSON body, mapping parse failures to 400 and validation
/// failures to 422.
pub fn extract_validated_json<T: Validate>(
    body: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let Json(value) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
    value.validate().map_err(AppError::Validation)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Payload {
        name: String,
    }

    impl Validate for Payload {
        fn validate(&self) -> Result<(), String> {
            if self.name.trim().is_empty() {
                return Err("name is required".to_string());
            }
            Ok(())
        }
    }

    #[test]
    fn valid_payload_passes_through() {
        let body = Ok(Json(Payload {
            name: "Admin".to_string(),
        }));
        assert!(extract_validated_json(body).is_ok());
    }

    #[test]
    fn invalid_payload_maps_to_validation_error() {
        let body = Ok(Json(Payload {
            name: "   ".to_string(),
        }));
        match extract_validated_json(body) {
            Err(AppError::Validation(msg)) => assert!(msg.contains("name is required")),
            other => panic!("expected Validation, got {other:?}"),
        }
    }
}
