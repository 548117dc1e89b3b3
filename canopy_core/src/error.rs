//! Error types for canopy_core operations.
//!
//! Provides a simple error enum with no external dependencies for no_std
//! compatibility.

use core::fmt;

/// Errors that can occur in the stateless kernels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// An element index was outside the element buffer.
    ElementOutOfBounds {
        /// The requested element index.
        index: usize,
        /// Number of elements in the buffer.
        count: usize,
    },
    /// A vertex index referenced data outside the vertex buffer.
    VertexOutOfBounds {
        /// The requested vertex index.
        index: usize,
        /// Number of vertices in the buffer.
        count: usize,
    },
    /// The output slice was too short for the requested operation.
    InsufficientCapacity {
        /// The capacity that was required.
        required: usize,
        /// The capacity that was provided.
        provided: usize,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::ElementOutOfBounds { index, count } => {
                write!(f, "element index {} exceeds element count {}", index, count)
            }
            CoreError::VertexOutOfBounds { index, count } => {
                write!(f, "vertex index {} exceeds vertex count {}", index, count)
            }
            CoreError::InsufficientCapacity { required, provided } => {
                write!(
                    f,
                    "insufficient capacity: required {}, provided {}",
                    required, provided
                )
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CoreError {}
