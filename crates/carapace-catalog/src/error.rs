//! Catalog and schema-validation errors.

use thiserror::Error;

/// Failure registering a tool declaration .
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistrationError {
    /// Name is in the reserved set.
    #[error("tool name '{0}' is reserved")]
    ReservedName(String),
    /// Name does not match the tool-name regex.
    #[error("tool name '{0}' is not a valid identifier")]
    InvalidName(String),
    /// Name is already registered (catalog names are globally unique).
    #[error("tool '{0}' is already registered")]
    DuplicateName(String),
    /// Schema failed the complexity budget.
    #[error("tool '{name}' schema rejected: {reason}")]
    SchemaRejected {
        /// Offending tool name.
        name: String,
        /// Why the schema was rejected.
        reason: SchemaViolation,
    },
}

/// Specific way a schema failed the  complexity budget.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaViolation {
    /// Root type was not `"object"`.
    #[error("schema root must have type \"object\"")]
    RootNotObject,
    /// `additionalProperties: false` was missing.
    #[error("schema must set additionalProperties: false")]
    AdditionalPropertiesNotForbidden,
    /// Schema contains a `$ref`.
    #[error("schema must not contain $ref")]
    ContainsRef,
    /// Nesting exceeded the depth budget.
    #[error("schema nesting depth {depth} exceeds budget of {max}")]
    TooDeep {
        /// Observed depth.
        depth: usize,
        /// Configured maximum.
        max: usize,
    },
    /// Summed property count across nested objects exceeded the budget.
    #[error("schema property count {count} exceeds budget of {max}")]
    TooManyProperties {
        /// Observed count.
        count: usize,
        /// Configured maximum.
        max: usize,
    },
    /// A `pattern` regex looked vulnerable to catastrophic backtracking.
    #[error("schema pattern at {path} looks vulnerable to catastrophic backtracking")]
    UnsafePattern {
        /// JSON path of the offending `pattern` keyword.
        path: String,
    },
}

/// Failure validating call-time arguments against a tool's schema (stage 3).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("validation failed at {field}: {reason}")]
pub struct ValidationFailure {
    /// Name of the first offending field — bare at the top level, dotted
    /// (or bracketed for array indices) when nested under it.
    pub field: String,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationFailure {
    /// Construct a failure at the given field path.
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { field: field.into(), reason: reason.into() }
    }
}
