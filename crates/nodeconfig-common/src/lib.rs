//! Common types for NodeConfig: the resource model, fingerprinting, and validation
//!
//! A `NodeConfig` describes how an autoscaler should provision compute nodes.
//! This crate is the pure core consumed by controllers and admission gates:
//!
//! - [`crd`] - The `NodeConfig` custom resource and its supporting types
//! - [`fingerprint`] - Stable, order-independent digests used for drift detection
//! - [`validation`] - Field and cross-field validators plus the aggregator
//! - [`yaml`] - YAML to `serde_json::Value` bridge for manifest decoding
//! - [`error`] - Error types
//!
//! Nothing here performs I/O or holds state between calls.

#![deny(missing_docs)]

pub mod crd;
pub mod error;
pub mod fingerprint;
pub mod validation;
pub mod yaml;

pub use error::Error;
pub use fingerprint::{DriftStatus, SpecFingerprint, StoredFingerprint, HASH_VERSION};
pub use validation::{FieldPath, ValidationResult, Violation, ViolationReason};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;

/// API group for NodeConfig resources
pub const API_GROUP: &str = "nodeconfig.dev";

/// Annotation holding the spec fingerprint recorded at provisioning time
pub const SPEC_HASH_ANNOTATION: &str = "nodeconfig.dev/spec-hash";

/// Annotation holding the hash version the recorded fingerprint was computed under
pub const SPEC_HASH_VERSION_ANNOTATION: &str = "nodeconfig.dev/spec-hash-version";
