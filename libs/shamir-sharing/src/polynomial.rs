//! Random sharing polynomials.

use crate::{errors::ShareError, share::Share};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::Rng;

/// A random polynomial hiding a single secret in its constant coefficient.
///
/// For a threshold `t` the polynomial has degree `t - 1`, so any `t` evaluations determine it
/// and any fewer reveal nothing about the secret. The polynomial can be queried at any non-zero
/// index, which keeps it independent of the participant set.
#[derive(Clone, Debug)]
pub struct SharePolynomial {
    field: PrimeField,
    // coefficients[0] is the secret, the rest are uniform.
    coefficients: Vec<u64>,
}

impl SharePolynomial {
    /// Build a random sharing polynomial for the given secret and threshold.
    pub fn random<R: Rng + ?Sized>(
        field: PrimeField,
        secret: u64,
        threshold: u32,
        rng: &mut R,
    ) -> Result<Self, ShareError> {
        if threshold < 1 {
            return Err(ShareError::InvalidThreshold(threshold));
        }
        let mut coefficients = Vec::with_capacity(threshold as usize);
        coefficients.push(field.element(secret));
        for _ in 1..threshold {
            coefficients.push(field.sample(rng));
        }
        Ok(Self { field, coefficients })
    }

    /// The secret this polynomial hides.
    pub fn secret(&self) -> u64 {
        self.coefficients.first().copied().unwrap_or(0)
    }

    /// Evaluate the polynomial at the given index.
    ///
    /// Evaluation is Horner's rule with a reduction at every step, so intermediate values never
    /// leave the field.
    pub fn share_at(&self, index: NodeId) -> Result<Share, ShareError> {
        let x = index.abscissa();
        if self.field.element(x) == 0 {
            return Err(ShareError::ZeroIndex);
        }
        let mut value = 0u64;
        for coefficient in self.coefficients.iter().rev() {
            value = self.field.add(self.field.mul(value, x), *coefficient);
        }
        Ok(Share::new(index, value, Some(self.secret())))
    }

    /// Evaluate the polynomial at every index in the given participant set.
    pub fn shares_for(&self, nodes: &[NodeId]) -> Result<Vec<(NodeId, Share)>, ShareError> {
        nodes.iter().map(|node| Ok((*node, self.share_at(*node)?))).collect()
    }
}

/// Independently sampled sharing polynomials for a vector of secrets.
#[derive(Clone, Debug)]
pub struct BatchSharePolynomial {
    polynomials: Vec<SharePolynomial>,
}

impl BatchSharePolynomial {
    /// Build one random polynomial per secret.
    pub fn random<R: Rng + ?Sized>(
        field: PrimeField,
        secrets: &[u64],
        threshold: u32,
        rng: &mut R,
    ) -> Result<Self, ShareError> {
        let polynomials = secrets
            .iter()
            .map(|secret| SharePolynomial::random(field, *secret, threshold, rng))
            .collect::<Result<_, _>>()?;
        Ok(Self { polynomials })
    }

    /// How many secrets this batch covers.
    pub fn len(&self) -> usize {
        self.polynomials.len()
    }

    /// Whether the batch is empty.
    pub fn is_empty(&self) -> bool {
        self.polynomials.is_empty()
    }

    /// Evaluate every polynomial at the given index, aligned with the input secrets.
    pub fn shares_at(&self, index: NodeId) -> Result<Vec<Share>, ShareError> {
        self.polynomials.iter().map(|polynomial| polynomial.share_at(index)).collect()
    }
}

#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use rstest::rstest;

    fn field() -> PrimeField {
        PrimeField::new(2147483647).unwrap()
    }

    fn rng() -> ChaCha20Rng {
        ChaCha20Rng::seed_from_u64(0xfeed)
    }

    #[test]
    fn threshold_must_be_positive() {
        assert_eq!(
            SharePolynomial::random(field(), 5, 0, &mut rng()).err(),
            Some(ShareError::InvalidThreshold(0))
        );
    }

    #[test]
    fn index_zero_rejected() {
        let polynomial = SharePolynomial::random(field(), 5, 3, &mut rng()).unwrap();
        assert_eq!(polynomial.share_at(NodeId::new(0)).err(), Some(ShareError::ZeroIndex));
    }

    #[rstest]
    #[case(0, 1, 3)]
    #[case(42, 3, 5)]
    #[case(2147483646, 5, 10)]
    fn shares_reconstruct_the_secret(#[case] secret: u64, #[case] threshold: u32, #[case] nodes: u32) {
        let field = field();
        let polynomial = SharePolynomial::random(field, secret, threshold, &mut rng()).unwrap();
        let nodes: Vec<_> = (1..=nodes).map(NodeId::new).collect();
        let shares: Vec<_> =
            polynomial.shares_for(&nodes).unwrap().into_iter().map(|(_, share)| share).collect();

        // Any threshold-sized subset is enough.
        let subset = &shares[..threshold as usize];
        assert_eq!(reconstruct(&field, subset, threshold).unwrap(), secret);
        assert_eq!(reconstruct(&field, &shares, threshold).unwrap(), secret);
    }

    #[test]
    fn too_few_shares_look_random() {
        let field = field();
        let secret = 1234567;
        let polynomial = SharePolynomial::random(field, secret, 4, &mut rng()).unwrap();
        let shares: Vec<_> = (1..=3)
            .map(|index| polynomial.share_at(NodeId::new(index)).unwrap())
            .collect();
        // Interpolating below the threshold succeeds but yields an unrelated value.
        assert_ne!(reconstruct(&field, &shares, 3).unwrap(), secret);
    }

    #[test]
    fn batch_polynomials_are_independent() {
        let field = field();
        let secrets = [17, 3, 11];
        let batch = BatchSharePolynomial::random(field, &secrets, 2, &mut rng()).unwrap();
        assert_eq!(batch.len(), 3);

        let mut per_secret: Vec<Vec<Share>> = vec![Vec::new(); secrets.len()];
        for index in 1..=3u32 {
            for (slot, share) in batch.shares_at(NodeId::new(index)).unwrap().into_iter().enumerate()
            {
                per_secret[slot].push(share);
            }
        }
        for (secret, shares) in secrets.iter().zip(per_secret) {
            assert_eq!(reconstruct(&field, &shares, 2).unwrap(), *secret);
        }
    }

    #[test]
    fn witness_carries_the_plaintext() {
        let polynomial = SharePolynomial::random(field(), 99, 2, &mut rng()).unwrap();
        let share = polynomial.share_at(NodeId::new(1)).unwrap();
        assert_eq!(share.witness(), Some(99));
    }
}
