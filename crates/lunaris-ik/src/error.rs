//! Error types for the FABRIK solver.

use thiserror::Error;

/// Errors raised by the FABRIK solver's public API.
///
/// Every validation failure is synchronous and leaves the offending object
/// unmodified; the solver itself has no recoverable errors once a chain has
/// passed construction-time validation, every solve completes and returns
/// a distance.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IkError {
    /// A zero-magnitude direction/axis, non-positive length, out-of-range
    /// constraint angle, non-perpendicular hinge axis/reference, or
    /// wrong-sized argument array was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation is not valid in the object's current state (e.g.
    /// `addConsecutiveBone` before any basebone exists, embedded-target API
    /// used while embedded mode is off, disabling fixed-base on a connected
    /// chain or one with a global basebone constraint).
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A chain or bone index was beyond the current collection size.
    #[error("index {index} out of range (len {len})")]
    OutOfRange {
        /// The index that was requested.
        index: i64,
        /// The number of elements actually present.
        len: usize,
    },

    /// The requested combination is not supported by the solver (a
    /// `LocalHinge` basebone constraint, for example).
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// A hinge-only field was read on a ball joint, or a ball-only field
    /// was read on a hinge joint.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

/// Result alias used throughout `lunaris-ik`.
pub type Result<T> = std::result::Result<T, IkError>;
