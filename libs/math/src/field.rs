//! A prime field whose modulus is picked at runtime.

use crate::errors::{DivByZero, InvalidModulus};
use rand::Rng;

/// A prime field `F_p` for a runtime modulus `p`.
///
/// Elements are plain `u64` values normalized into `[0, p)`; every operation reduces through a
/// 128-bit intermediate so any `p` below `2^63` is safe. The modulus is typically a Mersenne
/// prime `2^s - 1`, in which case [bits][PrimeField::bits] is the `s` used by the bit-oriented
/// protocols.
///
/// Primality is not verified beyond cheap sanity checks; a composite modulus surfaces later as a
/// failed inversion during interpolation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrimeField {
    prime: u64,
    bits: u32,
}

impl PrimeField {
    /// Constructs a field for the given modulus.
    pub fn new(prime: u64) -> Result<Self, InvalidModulus> {
        if prime < 2 || (prime > 2 && prime % 2 == 0) {
            return Err(InvalidModulus(prime));
        }
        let bits = u64::BITS - prime.leading_zeros();
        Ok(Self { prime, bits })
    }

    /// The modulus of this field.
    pub fn prime(&self) -> u64 {
        self.prime
    }

    /// The bit length of the modulus.
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Normalize a value into the field.
    pub fn element(&self, value: u64) -> u64 {
        value % self.prime
    }

    /// Modular addition.
    pub fn add(&self, left: u64, right: u64) -> u64 {
        ((u128::from(left) + u128::from(right)) % u128::from(self.prime)) as u64
    }

    /// Modular subtraction.
    pub fn sub(&self, left: u64, right: u64) -> u64 {
        let right = self.element(right);
        ((u128::from(left) + u128::from(self.prime - right)) % u128::from(self.prime)) as u64
    }

    /// Modular negation.
    pub fn neg(&self, value: u64) -> u64 {
        self.sub(0, value)
    }

    /// Modular multiplication.
    pub fn mul(&self, left: u64, right: u64) -> u64 {
        ((u128::from(left) * u128::from(right)) % u128::from(self.prime)) as u64
    }

    /// Modular exponentiation by squaring.
    pub fn pow(&self, base: u64, mut exponent: u64) -> u64 {
        let mut base = self.element(base);
        let mut result = 1u64 % self.prime;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = self.mul(result, base);
            }
            base = self.mul(base, base);
            exponent >>= 1;
        }
        result
    }

    /// Modular inverse via Fermat's little theorem: `a^(p-2) mod p`.
    pub fn inv(&self, value: u64) -> Result<u64, DivByZero> {
        if self.element(value) == 0 {
            return Err(DivByZero);
        }
        Ok(self.pow(value, self.prime - 2))
    }

    /// Sample a uniform field element.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        rng.gen_range(0..self.prime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const MERSENNE_31: u64 = 2147483647;

    fn field() -> PrimeField {
        PrimeField::new(MERSENNE_31).unwrap()
    }

    #[test]
    fn rejects_degenerate_moduli() {
        assert!(PrimeField::new(0).is_err());
        assert!(PrimeField::new(1).is_err());
        assert!(PrimeField::new(10).is_err());
        assert!(PrimeField::new(2).is_ok());
    }

    #[test]
    fn bit_length_of_mersenne_modulus() {
        assert_eq!(field().bits(), 31);
        assert_eq!(PrimeField::new(2305843009213693951).unwrap().bits(), 61);
    }

    #[rstest]
    #[case(0, 0, 0)]
    #[case(1, MERSENNE_31 - 1, 0)]
    #[case(MERSENNE_31 - 1, MERSENNE_31 - 1, MERSENNE_31 - 2)]
    #[case(12345, 67890, 80235)]
    fn addition(#[case] left: u64, #[case] right: u64, #[case] expected: u64) {
        assert_eq!(field().add(left, right), expected);
    }

    #[rstest]
    #[case(5, 3, 2)]
    #[case(3, 5, MERSENNE_31 - 2)]
    #[case(0, 1, MERSENNE_31 - 1)]
    fn subtraction(#[case] left: u64, #[case] right: u64, #[case] expected: u64) {
        assert_eq!(field().sub(left, right), expected);
    }

    #[test]
    fn multiplication_reduces() {
        let field = field();
        assert_eq!(field.mul(42, 58), 2436);
        let big = MERSENNE_31 - 1;
        // (p - 1)^2 = p^2 - 2p + 1 = 1 mod p.
        assert_eq!(field.mul(big, big), 1);
    }

    #[rstest]
    #[case(1)]
    #[case(2)]
    #[case(31337)]
    #[case(MERSENNE_31 - 1)]
    fn inverse_round_trips(#[case] value: u64) {
        let field = field();
        let inverse = field.inv(value).unwrap();
        assert_eq!(field.mul(value, inverse), 1);
    }

    #[test]
    fn zero_has_no_inverse() {
        assert_eq!(field().inv(0), Err(DivByZero));
        assert_eq!(field().inv(MERSENNE_31), Err(DivByZero));
    }

    #[test]
    fn sampling_stays_in_range() {
        let field = field();
        let mut rng = rand::thread_rng();
        for _ in 0..100 {
            assert!(field.sample(&mut rng) < field.prime());
        }
    }
}
