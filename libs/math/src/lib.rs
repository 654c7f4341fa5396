//! Prime field arithmetic for secret sharing.

#![deny(missing_docs)]
#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::unimplemented,
    clippy::todo
)]

pub mod errors;
pub mod field;
pub mod lagrange;

pub use errors::{DivByZero, InterpolationError, InvalidModulus};
pub use field::PrimeField;
