//! Secret reconstruction from a set of shares.

use crate::{errors::ShareError, share::Share};
use math_lib::{lagrange::interpolate_at_zero, PrimeField};
use std::collections::HashSet;

/// Reconstruct a secret by Lagrange interpolation at zero.
///
/// `required` is the number of shares the secret's polynomial degree demands: the threshold `t`
/// for a plain sharing, or the full participant count for the degree-doubled output of a share
/// multiplication. Shares with index 0 or repeated indices are rejected before interpolating.
pub fn reconstruct(field: &PrimeField, shares: &[Share], required: u32) -> Result<u64, ShareError> {
    if shares.len() < required as usize {
        return Err(ShareError::NotEnoughShares { have: shares.len(), need: required as usize });
    }
    let mut seen = HashSet::with_capacity(shares.len());
    for share in shares {
        let index = share.index().as_u32();
        if index == 0 {
            return Err(ShareError::ZeroIndex);
        }
        if !seen.insert(index) {
            return Err(ShareError::DuplicateIndex(index));
        }
    }
    let points: Vec<_> =
        shares.iter().map(|share| (share.index().abscissa(), share.value())).collect();
    Ok(interpolate_at_zero(field, &points)?)
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use basic_types::NodeId;

    fn field() -> PrimeField {
        PrimeField::new(2147483647).unwrap()
    }

    #[test]
    fn rejects_zero_index() {
        let shares = vec![Share::new(NodeId::new(0), 1, None), Share::new(NodeId::new(1), 2, None)];
        assert_eq!(reconstruct(&field(), &shares, 2).err(), Some(ShareError::ZeroIndex));
    }

    #[test]
    fn rejects_duplicate_index() {
        let shares = vec![Share::new(NodeId::new(1), 1, None), Share::new(NodeId::new(1), 2, None)];
        assert_eq!(reconstruct(&field(), &shares, 2).err(), Some(ShareError::DuplicateIndex(1)));
    }

    #[test]
    fn rejects_too_few_shares() {
        let shares = vec![Share::new(NodeId::new(1), 1, None)];
        assert_eq!(
            reconstruct(&field(), &shares, 3).err(),
            Some(ShareError::NotEnoughShares { have: 1, need: 3 })
        );
    }

    #[test]
    fn interpolates_a_constant() {
        let shares: Vec<_> = (1..=3).map(|i| Share::new(NodeId::new(i), 77, None)).collect();
        assert_eq!(reconstruct(&field(), &shares, 3).unwrap(), 77);
    }
}
