//! Node identifiers.

use std::fmt::{self, Display, Formatter};

/// Identifies a node in the computation network.
///
/// Node ids double as the abscissa at which that node's shares are evaluated, so by convention
/// they fall in `[1, n]` and are never 0.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    /// Construct a node id from its raw value.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// The raw value of this node id.
    pub fn as_u32(&self) -> u32 {
        self.0
    }

    /// The abscissa at which this node's shares are evaluated.
    pub fn abscissa(&self) -> u64 {
        u64::from(self.0)
    }
}

impl From<u32> for NodeId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn abscissa_matches_id() {
        let id = NodeId::new(7);
        assert_eq!(id.as_u32(), 7);
        assert_eq!(id.abscissa(), 7);
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert_eq!(NodeId::from(3), NodeId::new(3));
    }
}
