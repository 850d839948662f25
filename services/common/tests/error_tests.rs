//! Tests for `PreconditionError` display formatting and classification.

use rstest::*;
use services_common::PreconditionError;
use std::error::Error;

#[rstest]
#[test]
fn unknown_route_display_names_both_fields() {
    let error = PreconditionError::UnknownRoute {
        exchange: "okx".to_string(),
        account_type: "unified".to_string(),
    };
    assert_eq!(error.to_string(), "no venue routing entry for okx/unified");
}

#[rstest]
#[test]
fn missing_connector_display_names_exchange() {
    let error = PreconditionError::MissingConnector("bybit".to_string());
    assert_eq!(error.to_string(), "no connector configured for exchange bybit");
}

#[rstest]
#[test]
fn implements_std_error() {
    let error = PreconditionError::MissingConnector("binance".to_string());
    assert!(Error::source(&error).is_none());
    assert!(!error.to_string().is_empty());
}

#[rstest]
#[test]
fn variants_are_distinguishable_by_discriminant() {
    let a = PreconditionError::UnknownRoute {
        exchange: "okx".to_string(),
        account_type: "demo".to_string(),
    };
    let b = PreconditionError::MissingConnector("okx".to_string());
    assert_ne!(std::mem::discriminant(&a), std::mem::discriminant(&b));
}

#[rstest]
#[test]
fn converts_into_anyhow_error() {
    fn fails() -> Result<(), PreconditionError> {
        Err(PreconditionError::MissingConnector("bybit".to_string()))
    }

    let err = anyhow::Error::from(fails().unwrap_err());
    assert!(err.to_string().contains("bybit"));
}
