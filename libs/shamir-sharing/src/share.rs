//! A single Shamir share and its linear algebra.

use crate::errors::ShareError;
use basic_types::NodeId;
use math_lib::PrimeField;

/// One evaluation of a sharing polynomial, held by a single node.
///
/// The index is the abscissa the polynomial was evaluated at and by convention equals the id of
/// the node holding the share. The witness is an optional plaintext copy of the secret carried
/// for diagnostics only: shares generated locally have one, shares received over the fabric do
/// not, and protocol logic never reads it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Share {
    index: NodeId,
    value: u64,
    witness: Option<u64>,
}

impl Share {
    /// Construct a share from its parts.
    pub fn new(index: NodeId, value: u64, witness: Option<u64>) -> Self {
        Self { index, value, witness }
    }

    /// Construct a degree-0 share of a public constant.
    ///
    /// A constant is a valid sharing of itself at every index, which is what lets protocols mix
    /// public values into share arithmetic.
    pub fn constant(index: NodeId, value: u64) -> Self {
        Self { index, value, witness: Some(value) }
    }

    /// The evaluation index of this share.
    pub fn index(&self) -> NodeId {
        self.index
    }

    /// The share value.
    pub fn value(&self) -> u64 {
        self.value
    }

    /// The plaintext witness, if this share carries one.
    pub fn witness(&self) -> Option<u64> {
        self.witness
    }

    /// Component-wise modular addition of two shares at the same index.
    pub fn add(&self, other: &Share, field: &PrimeField) -> Result<Share, ShareError> {
        self.check_index(other)?;
        let witness = self.combine_witness(other, field, PrimeField::add);
        Ok(Share { index: self.index, value: field.add(self.value, other.value), witness })
    }

    /// Component-wise modular subtraction of two shares at the same index.
    pub fn sub(&self, other: &Share, field: &PrimeField) -> Result<Share, ShareError> {
        self.check_index(other)?;
        let witness = self.combine_witness(other, field, PrimeField::sub);
        Ok(Share { index: self.index, value: field.sub(self.value, other.value), witness })
    }

    fn check_index(&self, other: &Share) -> Result<(), ShareError> {
        if self.index == other.index {
            Ok(())
        } else {
            Err(ShareError::IndexMismatch { left: self.index, right: other.index })
        }
    }

    // The witness follows the same field operation as the value, but only while both operands
    // still carry one.
    fn combine_witness(
        &self,
        other: &Share,
        field: &PrimeField,
        op: fn(&PrimeField, u64, u64) -> u64,
    ) -> Option<u64> {
        match (self.witness, other.witness) {
            (Some(left), Some(right)) => Some(op(field, left, right)),
            _ => None,
        }
    }
}
