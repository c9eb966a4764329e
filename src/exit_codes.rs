//! Exit codes for the spot-optimizer CLI
//!
//! - `0` = Success
//! - `1` = User error (invalid request, no suitable instance type)
//! - `2` = System error (I/O, unreadable catalog, serialization)
//! - `3` = Configuration error

use crate::error::OptimizerError;
use crate::result::{ErrorKind, ErrorResult};

pub mod codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 1;
    pub const SYSTEM_ERROR: i32 = 2;
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map an `OptimizerError` to an exit code
pub fn exit_code_for_error(error: &OptimizerError) -> i32 {
    use OptimizerError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        InvalidRequest { .. } => codes::USER_ERROR,
        NoCandidate { .. } => codes::USER_ERROR,

        CatalogLoad { .. } => codes::SYSTEM_ERROR,
        RateFetch { .. } => codes::SYSTEM_ERROR,
        Retryable { .. } => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an `optimize` that returned an error result
pub fn exit_code_for_result(error: &ErrorResult) -> i32 {
    match error.kind {
        ErrorKind::InvalidRequest | ErrorKind::NoCandidate => codes::USER_ERROR,
    }
}

/// Exit code for a top-level `anyhow` error, looking through its chain
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<OptimizerError>())
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}
