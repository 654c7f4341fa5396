//! Pre-distribution: the trusted dealer phase.
//!
//! Before any multiplication or comparison runs, a dealer installs sticky shares of a uniform
//! random mask `r-secret`, of a uniform random key `r-key`, and of every bit of that key under
//! `r-key[b]`. The identifiers are contractual: the protocols reference them by name.

use crate::{errors::ProtocolError, message::SecretId};
use basic_types::NodeId;
use math_lib::PrimeField;
use rand::Rng;
use shamir_sharing::{NodeShares, Share, SharePolynomial};

/// The id of the sticky multiplication mask shares.
pub const MASK_SECRET_ID: &str = "r-secret";

/// The id of the sticky comparison key shares.
pub const KEY_SECRET_ID: &str = "r-key";

/// The id of the sticky shares of bit `bit` of the comparison key.
pub fn key_bit_id(bit: u32) -> SecretId {
    format!("{KEY_SECRET_ID}[{bit}]")
}

/// A trusted dealer handing out shares outside of any protocol run.
///
/// Besides the mandated preprocessing material this doubles as the plain share-dealing helper
/// hosting code and tests use to install inputs out of band.
pub struct Dealer {
    field: PrimeField,
    threshold: u32,
    nodes: Vec<NodeId>,
}

impl Dealer {
    /// Construct a dealer for the given participant set.
    pub fn new(field: PrimeField, threshold: u32, nodes: &[NodeId]) -> Result<Self, ProtocolError> {
        if nodes.is_empty() {
            return Err(ProtocolError::InvalidConfiguration("empty participant set".into()));
        }
        if threshold < 1 || threshold as usize > nodes.len() {
            return Err(ProtocolError::InvalidConfiguration(format!(
                "threshold {threshold} outside [1, {}]",
                nodes.len()
            )));
        }
        Ok(Self { field, threshold, nodes: nodes.to_vec() })
    }

    /// Deal one share of `secret` per node.
    pub fn deal_secret<R: Rng + ?Sized>(
        &self,
        secret: u64,
        rng: &mut R,
    ) -> Result<NodeShares<Share>, ProtocolError> {
        let polynomial = SharePolynomial::random(self.field, secret, self.threshold, rng)?;
        let mut shares = NodeShares::default();
        for (node, share) in polynomial.shares_for(&self.nodes)? {
            shares.insert(node, share);
        }
        Ok(shares)
    }

    /// Deal shares of every value in `values` per node, aligned with the input.
    pub fn deal_vector<R: Rng + ?Sized>(
        &self,
        values: &[u64],
        rng: &mut R,
    ) -> Result<NodeShares<Vec<Share>>, ProtocolError> {
        let mut shares: NodeShares<Vec<Share>> = self
            .nodes
            .iter()
            .map(|node| (*node, Vec::with_capacity(values.len())))
            .collect();
        for value in values {
            for (node, share) in self.deal_secret(*value, rng)? {
                if let Some(bundle) = shares.get_mut(&node) {
                    bundle.push(share);
                }
            }
        }
        Ok(shares)
    }

    /// Produce the sticky preprocessing material for every node: the multiplication mask, the
    /// comparison key and the key's bits, keyed by their contractual ids.
    pub fn preprocess<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<NodeShares<Vec<(SecretId, Share)>>, ProtocolError> {
        let mask = self.field.sample(rng);
        // Drawn below the prime so the key is a field element; for a Mersenne modulus this also
        // keeps the all-ones bit pattern out.
        let key = self.field.sample(rng);

        let mut bundles: NodeShares<Vec<(SecretId, Share)>> =
            self.nodes.iter().map(|node| (*node, Vec::new())).collect();
        let mut deal_into = |id: SecretId, shares: NodeShares<Share>| {
            for (node, share) in shares {
                if let Some(bundle) = bundles.get_mut(&node) {
                    bundle.push((id.clone(), share));
                }
            }
        };
        deal_into(MASK_SECRET_ID.into(), self.deal_secret(mask, rng)?);
        deal_into(KEY_SECRET_ID.into(), self.deal_secret(key, rng)?);
        for bit in 0..self.field.bits() {
            deal_into(key_bit_id(bit), self.deal_secret((key >> bit) & 1, rng)?);
        }
        Ok(bundles)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use shamir_sharing::reconstruct;

    fn field() -> PrimeField {
        PrimeField::new(2147483647).unwrap()
    }

    fn nodes(count: u32) -> Vec<NodeId> {
        (1..=count).map(NodeId::new).collect()
    }

    #[test]
    fn rejects_bad_thresholds() {
        assert!(Dealer::new(field(), 0, &nodes(3)).is_err());
        assert!(Dealer::new(field(), 4, &nodes(3)).is_err());
        assert!(Dealer::new(field(), 3, &[]).is_err());
    }

    #[test]
    fn dealt_secret_reconstructs() {
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let dealer = Dealer::new(field(), 3, &nodes(5)).unwrap();
        let shares: Vec<_> = dealer.deal_secret(424242, &mut rng).unwrap().into_values().collect();
        assert_eq!(reconstruct(&field(), &shares, 3).unwrap(), 424242);
    }

    #[test]
    fn preprocessing_is_consistent() {
        let mut rng = ChaCha20Rng::seed_from_u64(2);
        let field = field();
        let dealer = Dealer::new(field, 2, &nodes(4)).unwrap();
        let bundles = dealer.preprocess(&mut rng).unwrap();
        assert_eq!(bundles.len(), 4);

        // 1 mask + 1 key + one share per key bit.
        let expected = 2 + field.bits() as usize;
        for bundle in bundles.values() {
            assert_eq!(bundle.len(), expected);
        }

        // The key's bits must recompose the key.
        let mut per_id: std::collections::HashMap<SecretId, Vec<Share>> =
            std::collections::HashMap::new();
        for bundle in bundles.into_values() {
            for (id, share) in bundle {
                per_id.entry(id).or_default().push(share);
            }
        }
        let key = reconstruct(&field, per_id.get(KEY_SECRET_ID).unwrap(), 2).unwrap();
        let mut recomposed = 0u64;
        for bit in 0..field.bits() {
            let value = reconstruct(&field, per_id.get(&key_bit_id(bit)).unwrap(), 2).unwrap();
            assert!(value <= 1, "bit share reconstructed to {value}");
            recomposed |= value << bit;
        }
        assert_eq!(recomposed, key);
        assert!(per_id.contains_key(MASK_SECRET_ID));
    }
}
