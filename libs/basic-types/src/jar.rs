//! This module provides [NodeJar], a type that collects one element from each node in a
//! pre-defined set.

use crate::NodeId;

/// A jar where every node puts an element.
///
/// Jars back every counting rule in the protocol catalogue: a protocol that needs "one ACK from
/// each participant" fills a jar and checks [is_full][NodeJar::is_full].
#[derive(Default, Debug, Clone)]
pub struct NodeJar<T> {
    elements: Vec<(NodeId, T)>,
    node_count: usize,
}

impl<T> NodeJar<T> {
    /// Constructs a new jar that expects the given number of nodes.
    pub fn new(node_count: usize) -> Self {
        Self { elements: Vec::with_capacity(node_count), node_count }
    }

    /// Check whether this jar is full.
    ///
    /// A jar becomes full when every expected node has put its element into it.
    pub fn is_full(&self) -> bool {
        self.elements.len() == self.node_count
    }

    /// Check whether this jar is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check how many nodes we have elements for.
    pub fn stored_count(&self) -> usize {
        self.elements.len()
    }

    /// Check whether the given node has already contributed.
    pub fn contains(&self, node: NodeId) -> bool {
        self.elements.binary_search_by(|element| element.0.cmp(&node)).is_ok()
    }

    /// Add an element for a node.
    ///
    /// This returns an error if the node has already provided an element.
    pub fn add_element(&mut self, node: NodeId, element: T) -> Result<(), DuplicateContribution> {
        match self.elements.binary_search_by(|element| element.0.cmp(&node)) {
            Ok(_) => Err(DuplicateContribution(node)),
            Err(index) => {
                self.elements.insert(index, (node, element));
                Ok(())
            }
        }
    }

    /// Consume this jar and take the elements.
    ///
    /// The returned elements are guaranteed to be sorted by node id.
    pub fn into_elements(self) -> impl Iterator<Item = (NodeId, T)> {
        self.elements.into_iter()
    }

    /// Take a reference to the elements in this jar.
    ///
    /// The returned elements are guaranteed to be sorted by node id.
    pub fn elements(&self) -> impl Iterator<Item = &(NodeId, T)> {
        self.elements.iter()
    }
}

/// An error indicating a single node provided more than one element.
#[derive(thiserror::Error, Debug)]
#[error("node {0} already provided element")]
pub struct DuplicateContribution(pub NodeId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_empty() {
        let jar = NodeJar::<u32>::default();
        assert!(jar.is_empty());
        assert_eq!(jar.stored_count(), 0);
    }

    #[test]
    fn duplicate_node_rejected() {
        let node = NodeId::new(1);
        let mut jar = NodeJar::new(2);
        assert!(jar.add_element(node, 1).is_ok());
        assert!(jar.add_element(node, 1).is_err());
    }

    #[test]
    fn fills_up() {
        let mut jar = NodeJar::new(2);
        jar.add_element(NodeId::new(1), 1).unwrap();
        assert!(!jar.is_full());

        jar.add_element(NodeId::new(2), 2).unwrap();
        assert!(jar.is_full());
    }

    #[test]
    fn contains_tracks_insertions() {
        let mut jar = NodeJar::new(3);
        jar.add_element(NodeId::new(2), ()).unwrap();
        assert!(jar.contains(NodeId::new(2)));
        assert!(!jar.contains(NodeId::new(1)));
    }

    #[test]
    fn elements_sorted_by_node() {
        let mut jar = NodeJar::new(3);
        jar.add_element(NodeId::new(3), 30).unwrap();
        jar.add_element(NodeId::new(1), 10).unwrap();
        jar.add_element(NodeId::new(2), 20).unwrap();

        let elements: Vec<_> = jar.into_elements().collect();
        assert_eq!(
            elements,
            vec![(NodeId::new(1), 10), (NodeId::new(2), 20), (NodeId::new(3), 30)]
        );
    }
}
