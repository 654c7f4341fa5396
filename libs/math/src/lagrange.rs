//! Lagrange interpolation in a prime field.

use crate::{errors::InterpolationError, field::PrimeField};
use std::collections::HashSet;

/// Interpolates the polynomial through the given `(x, y)` points and evaluates it at zero.
///
/// This is the reconstruction step of Shamir secret sharing: the constant coefficient of the
/// sharing polynomial is the secret. The classic O(n^2) formula is used:
///
/// `f(0) = sum_j y_j * prod_{k != j} (-x_k) / (x_j - x_k) mod p`
///
/// with divisions performed as Fermat inversions. Zero and duplicate abscissas are rejected
/// before any arithmetic happens.
pub fn interpolate_at_zero(
    field: &PrimeField,
    points: &[(u64, u64)],
) -> Result<u64, InterpolationError> {
    if points.is_empty() {
        return Err(InterpolationError::NoPoints);
    }
    let mut seen = HashSet::with_capacity(points.len());
    for (x, _) in points {
        let x = field.element(*x);
        if x == 0 {
            return Err(InterpolationError::ZeroAbscissa);
        }
        if !seen.insert(x) {
            return Err(InterpolationError::DuplicateAbscissa(x));
        }
    }

    let mut secret = 0u64;
    for (xj, yj) in points {
        let mut numerator = 1u64;
        let mut denominator = 1u64;
        for (xk, _) in points {
            if xk == xj {
                continue;
            }
            numerator = field.mul(numerator, field.neg(*xk));
            denominator = field.mul(denominator, field.sub(*xj, *xk));
        }
        let coefficient = field.mul(numerator, field.inv(denominator)?);
        secret = field.add(secret, field.mul(*yj, coefficient));
    }
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn field() -> PrimeField {
        PrimeField::new(2147483647).unwrap()
    }

    #[test]
    fn constant_polynomial() {
        let points = vec![(1, 42), (2, 42), (3, 42)];
        assert_eq!(interpolate_at_zero(&field(), &points).unwrap(), 42);
    }

    #[test]
    fn linear_polynomial() {
        // f(x) = 5 + 3x.
        let points = vec![(1, 8), (2, 11)];
        assert_eq!(interpolate_at_zero(&field(), &points).unwrap(), 5);
    }

    #[test]
    fn quadratic_polynomial() {
        // f(x) = 7 + 2x + x^2.
        let points = vec![(1, 10), (2, 15), (3, 22)];
        assert_eq!(interpolate_at_zero(&field(), &points).unwrap(), 7);
    }

    #[rstest]
    #[case(vec![], InterpolationError::NoPoints)]
    #[case(vec![(0, 5), (1, 6)], InterpolationError::ZeroAbscissa)]
    #[case(vec![(1, 5), (1, 6)], InterpolationError::DuplicateAbscissa(1))]
    fn rejects_bad_points(#[case] points: Vec<(u64, u64)>, #[case] expected: InterpolationError) {
        assert_eq!(interpolate_at_zero(&field(), &points), Err(expected));
    }

    #[test]
    fn abscissas_congruent_to_zero_rejected() {
        let field = field();
        let points = vec![(field.prime(), 5), (1, 6)];
        assert_eq!(
            interpolate_at_zero(&field, &points),
            Err(InterpolationError::ZeroAbscissa)
        );
    }
}
