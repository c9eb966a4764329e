//! spot-optimizer library
//!
//! Recommends an EC2 spot instance type and node count for a resource
//! request, ranked by interruption likelihood from the AWS Spot Advisor feed.

pub mod advisor;
pub mod catalog;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod optimizer;
pub mod query;
pub mod request;
pub mod result;
pub mod retry;
pub mod selection;
pub mod utils;
pub mod validation;

// Re-export commonly used types
pub use catalog::Catalog;
pub use error::{OptimizerError, Result};
pub use optimizer::SpotOptimizer;
pub use request::{Mode, OptimizationRequest};
pub use result::{ErrorResult, OptimizationOutcome, OptimizationResult};
