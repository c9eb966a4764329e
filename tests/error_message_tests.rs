//! Tests for error message quality
//!
//! Verifies that error messages name the offending field and value.

use spot_optimizer::error::{ConfigError, OptimizerError};
use spot_optimizer::request::OptimizationRequest;
use spot_optimizer::result::{ErrorKind, ErrorResult, NO_SUITABLE_INSTANCE};
use spot_optimizer::validation;

#[test]
fn test_invalid_request_message_names_field() {
    let err = OptimizerError::invalid("memory", "Memory must be positive, got: -4");
    let msg = format!("{}", err);
    assert!(msg.contains("memory"));
    assert!(msg.contains("-4"));
}

#[test]
fn test_no_candidate_message_is_bare() {
    let err = OptimizerError::NoCandidate {
        message: NO_SUITABLE_INSTANCE.to_string(),
    };
    assert_eq!(err.to_string(), "No suitable instance type found.");
}

#[test]
fn test_catalog_load_message_includes_path() {
    let err = OptimizerError::CatalogLoad {
        path: "/etc/spot/catalog.json".to_string(),
        reason: "unsupported schema version 7".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("/etc/spot/catalog.json"));
    assert!(msg.contains("schema version 7"));
}

#[test]
fn test_config_error_messages() {
    let err = ConfigError::InvalidValue {
        field: "advisor.max_attempts".to_string(),
        reason: "must be at least 1".to_string(),
    };
    let msg = OptimizerError::from(err).to_string();
    assert!(msg.contains("Configuration error"));
    assert!(msg.contains("advisor.max_attempts"));
}

#[test]
fn test_region_validation_error_includes_value() {
    match validation::validate_region("uswest2") {
        Err(OptimizerError::InvalidRequest { field, reason }) => {
            assert_eq!(field, "region");
            assert!(reason.contains("uswest2"));
        }
        other => panic!("Expected InvalidRequest error, got {:?}", other.err()),
    }
}

#[test]
fn test_request_errors_become_error_results() {
    let err = OptimizationRequest::builder(-2, 8).build().unwrap_err();
    let result = ErrorResult::from(err);
    assert_eq!(result.kind, ErrorKind::InvalidRequest);
    assert!(result.error.contains("Cores must be positive"));

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json.as_object().unwrap().len(), 1);
    assert!(json["error"].as_str().unwrap().contains("-2"));
}

#[test]
fn test_unknown_mode_lists_valid_modes() {
    let err = OptimizationRequest::builder(8, 32)
        .mode_name("fastest")
        .build()
        .unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("fastest"));
    assert!(msg.contains("latency"));
    assert!(msg.contains("fault_tolerance"));
    assert!(msg.contains("balanced"));
}
