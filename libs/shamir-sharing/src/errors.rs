//! Errors raised by share generation and reconstruction.

use basic_types::NodeId;
use math_lib::InterpolationError;
use thiserror::Error;

/// An error during share generation, combination or reconstruction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShareError {
    /// The polynomial threshold is out of range.
    #[error("invalid threshold {0}")]
    InvalidThreshold(u32),

    /// A share was requested for, or presented with, the reserved index 0.
    #[error("share index 0 is reserved for the secret")]
    ZeroIndex,

    /// Two shares carried the same evaluation index.
    #[error("duplicate share index {0}")]
    DuplicateIndex(u32),

    /// Fewer shares than the polynomial degree requires.
    #[error("not enough shares: have {have}, need {need}")]
    NotEnoughShares {
        /// How many shares were presented.
        have: usize,
        /// How many shares are required.
        need: usize,
    },

    /// Two shares with different indices were combined.
    #[error("cannot combine shares with indices {left} and {right}")]
    IndexMismatch {
        /// Index of the left operand.
        left: NodeId,
        /// Index of the right operand.
        right: NodeId,
    },

    /// The underlying interpolation failed.
    #[error(transparent)]
    Interpolation(#[from] InterpolationError),
}
