//! Error types for operator registration and dispatch.

use crate::backend::DispatchKey;
use thiserror::Error;

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// Errors raised by the registry.
///
/// Every variant is reported synchronously at the point of violation and
/// none of them is retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Two different kernels were registered for the same operator and key.
    #[error("found multiple definitions of operator {operator} with dispatch key {key}")]
    ConflictingRegistration {
        /// Operator being registered.
        operator: String,
        /// Key that already holds a different kernel.
        key: DispatchKey,
    },

    /// Dispatch was requested for an operator that was never defined.
    #[error("cannot find operator {operator}")]
    UnknownOperator {
        /// Requested operator name.
        operator: String,
    },

    /// The operator exists but has neither an exact kernel nor a fallback.
    #[error("cannot find kernel with dispatch key {key} of operator {operator}")]
    NoKernelForKey {
        /// Requested operator name.
        operator: String,
        /// Requested dispatch key.
        key: DispatchKey,
    },

    /// The caller's expected signature differs from the registered one.
    #[error(
        "signature mismatch for operator {operator} with dispatch key {key}: \
         registered `{registered}`, requested `{requested}`"
    )]
    SignatureMismatch {
        /// Requested operator name.
        operator: String,
        /// Key the kernel was resolved for.
        key: DispatchKey,
        /// Signature captured at registration.
        registered: String,
        /// Signature the caller asked for.
        requested: String,
    },

    /// A dispatch key name did not match any known key.
    #[error("unknown dispatch key `{name}`")]
    UnknownDispatchKey {
        /// The name that failed to parse.
        name: String,
    },
}

impl DispatchError {
    /// Operator name the error refers to, if any.
    pub fn operator(&self) -> Option<&str> {
        match self {
            Self::ConflictingRegistration { operator, .. }
            | Self::UnknownOperator { operator }
            | Self::NoKernelForKey { operator, .. }
            | Self::SignatureMismatch { operator, .. } => Some(operator),
            Self::UnknownDispatchKey { .. } => None,
        }
    }
}
