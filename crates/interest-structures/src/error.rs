// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Error type shared across the pipeline crates.

/// Common error type for interestingness pipeline operations.
///
/// Per-frame and per-record failures (`Decode`, `ShapeMismatch`) are
/// recoverable: the offending item is logged and dropped. `Checkpoint`
/// failures are fatal at startup.
///
/// # Examples
/// ```
/// use interest_structures::InterestError;
///
/// fn check_stride(stride: u32) -> Result<(), InterestError> {
///     if stride == 0 {
///         return Err(InterestError::InvalidParameter("stride must be >= 1".into()));
///     }
///     Ok(())
/// }
///
/// assert!(check_stride(0).is_err());
/// assert!(check_stride(3).is_ok());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum InterestError {
    /// The frame's pixel buffer could not be interpreted in the expected channel layout
    #[error("Failed to decode frame: {0}")]
    Decode(String),

    /// A vector's shape does not match what the receiver expects
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// The model checkpoint could not be read or is malformed
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Invalid parameters provided to a function
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An outbound or inbound channel failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The pipeline has been shut down and no longer accepts input
    #[error("Pipeline is shut down")]
    ShutDown,
}

impl From<serde_json::Error> for InterestError {
    fn from(err: serde_json::Error) -> Self {
        InterestError::Transport(err.to_string())
    }
}

/// Result type for pipeline operations
pub type InterestResult<T> = Result<T, InterestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message_names_both_shapes() {
        let err = InterestError::ShapeMismatch {
            expected: vec![3, 8, 8],
            actual: vec![10],
        };
        let msg = err.to_string();
        assert!(msg.contains("[3, 8, 8]"));
        assert!(msg.contains("[10]"));
    }
}
