//! Per-invocation resource map.

use std::collections::HashMap;

use super::Resource;
use crate::graph::NodeId;

/// Resources resolved during one graph invocation, keyed by node and port.
///
/// A fresh map is created for every [`WorkGraph::execute`](crate::WorkGraph::execute)
/// call and handed back inside the execution report.
#[derive(Debug, Clone, Default)]
pub struct ResourceMap {
    ports: HashMap<NodeId, HashMap<String, Resource>>,
}

impl ResourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, node: NodeId, port: &str) -> Option<&Resource> {
        self.ports.get(&node).and_then(|ports| ports.get(port))
    }

    pub fn contains(&self, node: NodeId, port: &str) -> bool {
        self.get(node, port).is_some()
    }

    /// Insert a resource, returning the one it replaced.
    pub fn insert(
        &mut self,
        node: NodeId,
        port: impl Into<String>,
        resource: Resource,
    ) -> Option<Resource> {
        self.ports
            .entry(node)
            .or_default()
            .insert(port.into(), resource)
    }

    /// All resources recorded for one node, inputs and outputs alike.
    pub fn node_entries(&self, node: NodeId) -> impl Iterator<Item = (&str, &Resource)> {
        self.ports
            .get(&node)
            .into_iter()
            .flat_map(|ports| ports.iter().map(|(port, r)| (port.as_str(), r)))
    }

    pub fn len(&self) -> usize {
        self.ports.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ConstantValue;

    #[test]
    fn test_insert_and_get() {
        let node = NodeId::from_raw(10);
        let mut map = ResourceMap::new();
        assert!(map.is_empty());

        assert!(map
            .insert(node, "value", ConstantValue::U32(1).into())
            .is_none());
        let previous = map.insert(node, "value", ConstantValue::U32(2).into());

        assert_eq!(previous, Some(Resource::Constant(ConstantValue::U32(1))));
        assert_eq!(
            map.get(node, "value"),
            Some(&Resource::Constant(ConstantValue::U32(2)))
        );
        assert!(!map.contains(node, "other"));
        assert!(!map.contains(NodeId::from_raw(11), "value"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.node_entries(node).count(), 1);
    }
}
