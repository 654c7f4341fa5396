//! Errors for field operations.

use thiserror::Error;

/// The modulus handed to a field constructor cannot parameterize a prime field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid field modulus {0}")]
pub struct InvalidModulus(pub u64);

/// Attempted to invert or divide by zero.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("division by zero")]
pub struct DivByZero;

/// An interpolation over a set of points failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InterpolationError {
    /// No points were supplied.
    #[error("no points to interpolate")]
    NoPoints,

    /// An abscissa was zero, which would place a point on top of the secret itself.
    #[error("abscissa 0 is not allowed")]
    ZeroAbscissa,

    /// The same abscissa appeared more than once.
    #[error("duplicate abscissa {0}")]
    DuplicateAbscissa(u64),

    /// A denominator was not invertible, typically because the modulus is not prime.
    #[error(transparent)]
    DivByZero(#[from] DivByZero),
}
