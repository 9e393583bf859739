//! 通用有向图：节点表、边表与前集/后集索引.
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};

use crate::graph::extension::{Extensible, Extensions};
use crate::graph::{Edge, EdgeKey, GraphError, Node};

#[derive(Debug, Clone)]
struct Slot<N> {
    node: N,
    incoming: IndexSet<EdgeKey>,
    outgoing: IndexSet<EdgeKey>,
}

impl<N> Slot<N> {
    fn new(node: N) -> Self {
        Self {
            node,
            incoming: IndexSet::new(),
            outgoing: IndexSet::new(),
        }
    }
}

/// Directed graph owning its nodes and edges.
///
/// Both tables keep insertion order, so enumeration is stable across calls
/// and removal keeps the relative order of the survivors.
#[derive(Debug, Clone)]
pub struct Graph<N, E> {
    name: String,
    extensions: Extensions,
    nodes: IndexMap<String, Slot<N>>,
    edges: IndexMap<EdgeKey, E>,
}

impl<N, E> Graph<N, E>
where
    N: Node,
    E: Edge,
{
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extensions: Extensions::new(),
            nodes: IndexMap::new(),
            edges: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn insert_node(&mut self, node: N) -> Result<&mut N, GraphError> {
        match self.nodes.entry(node.id().to_owned()) {
            Entry::Occupied(entry) => Err(GraphError::DuplicateNode(entry.key().clone())),
            Entry::Vacant(entry) => Ok(&mut entry.insert(Slot::new(node)).node),
        }
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Result<&N, GraphError> {
        self.slot(id).map(|slot| &slot.node)
    }

    pub fn node_mut(&mut self, id: &str) -> Result<&mut N, GraphError> {
        self.nodes
            .get_mut(id)
            .map(|slot| &mut slot.node)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.nodes.values().map(|slot| &slot.node)
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut N> {
        self.nodes.values_mut().map(|slot| &mut slot.node)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Removes the node together with every incident edge.
    pub fn remove_node(&mut self, id: &str) -> Result<N, GraphError> {
        let slot = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))?;

        for key in slot.incoming.iter().chain(slot.outgoing.iter()) {
            if self.edges.shift_remove(key).is_none() {
                // self-loop, already dropped through the other set
                continue;
            }
            let other = if key.source == id {
                &key.target
            } else {
                &key.source
            };
            if let Some(neighbour) = self.nodes.get_mut(other) {
                neighbour.incoming.shift_remove(key);
                neighbour.outgoing.shift_remove(key);
            }
        }
        Ok(slot.node)
    }

    pub fn insert_edge(&mut self, edge: E) -> Result<&mut E, GraphError> {
        let key = edge.key().clone();
        for endpoint in [&key.source, &key.target] {
            if !self.nodes.contains_key(endpoint.as_str()) {
                return Err(GraphError::NodeNotFound(endpoint.clone()));
            }
        }

        match self.edges.entry(key) {
            Entry::Occupied(entry) => Err(GraphError::DuplicateEdge(entry.key().clone())),
            Entry::Vacant(entry) => {
                let key = entry.key();
                if let Some(slot) = self.nodes.get_mut(key.source.as_str()) {
                    slot.outgoing.insert(key.clone());
                }
                if let Some(slot) = self.nodes.get_mut(key.target.as_str()) {
                    slot.incoming.insert(key.clone());
                }
                Ok(entry.insert(edge))
            }
        }
    }

    pub fn remove_edge(&mut self, key: &EdgeKey) -> Result<E, GraphError> {
        let edge = self
            .edges
            .shift_remove(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.clone()))?;
        if let Some(slot) = self.nodes.get_mut(key.source.as_str()) {
            slot.outgoing.shift_remove(key);
        }
        if let Some(slot) = self.nodes.get_mut(key.target.as_str()) {
            slot.incoming.shift_remove(key);
        }
        Ok(edge)
    }

    pub fn contains_edge(&self, key: &EdgeKey) -> bool {
        self.edges.contains_key(key)
    }

    pub fn edge(&self, key: &EdgeKey) -> Result<&E, GraphError> {
        self.edges
            .get(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.clone()))
    }

    pub fn edge_mut(&mut self, key: &EdgeKey) -> Result<&mut E, GraphError> {
        self.edges
            .get_mut(key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.clone()))
    }

    pub fn edges(&self) -> impl Iterator<Item = &E> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn preset_edges(&self, id: &str) -> Result<Vec<&E>, GraphError> {
        let slot = self.slot(id)?;
        Ok(slot
            .incoming
            .iter()
            .filter_map(|key| self.edges.get(key))
            .collect())
    }

    pub fn postset_edges(&self, id: &str) -> Result<Vec<&E>, GraphError> {
        let slot = self.slot(id)?;
        Ok(slot
            .outgoing
            .iter()
            .filter_map(|key| self.edges.get(key))
            .collect())
    }

    /// Distinct source nodes of the incoming edges, in edge insertion order.
    pub fn preset(&self, id: &str) -> Result<Vec<&N>, GraphError> {
        let slot = self.slot(id)?;
        let sources: IndexSet<&str> = slot
            .incoming
            .iter()
            .map(|key| key.source.as_str())
            .collect();
        Ok(sources
            .into_iter()
            .filter_map(|source| self.nodes.get(source).map(|slot| &slot.node))
            .collect())
    }

    /// Distinct target nodes of the outgoing edges, in edge insertion order.
    pub fn postset(&self, id: &str) -> Result<Vec<&N>, GraphError> {
        let slot = self.slot(id)?;
        let targets: IndexSet<&str> = slot
            .outgoing
            .iter()
            .map(|key| key.target.as_str())
            .collect();
        Ok(targets
            .into_iter()
            .filter_map(|target| self.nodes.get(target).map(|slot| &slot.node))
            .collect())
    }

    fn slot(&self, id: &str) -> Result<&Slot<N>, GraphError> {
        self.nodes
            .get(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_owned()))
    }
}

impl<N, E> Extensible for Graph<N, E> {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ExtensionPolicy, Identified};

    #[derive(Debug, Clone)]
    struct Vertex {
        id: String,
        extensions: Extensions,
    }

    impl Vertex {
        fn new(id: &str) -> Self {
            Self {
                id: id.to_owned(),
                extensions: Extensions::new(),
            }
        }
    }

    impl Identified for Vertex {
        fn id(&self) -> &str {
            &self.id
        }
    }

    impl Extensible for Vertex {
        fn extensions(&self) -> &Extensions {
            &self.extensions
        }

        fn extensions_mut(&mut self) -> &mut Extensions {
            &mut self.extensions
        }
    }

    #[derive(Debug, Clone)]
    struct Link {
        key: EdgeKey,
        extensions: Extensions,
    }

    impl Link {
        fn new(source: &str, target: &str) -> Self {
            Self {
                key: EdgeKey::new(source, target),
                extensions: Extensions::new(),
            }
        }
    }

    impl Extensible for Link {
        fn extensions(&self) -> &Extensions {
            &self.extensions
        }

        fn extensions_mut(&mut self) -> &mut Extensions {
            &mut self.extensions
        }
    }

    impl Edge for Link {
        fn key(&self) -> &EdgeKey {
            &self.key
        }
    }

    fn triangle() -> Graph<Vertex, Link> {
        let mut graph = Graph::new("triangle");
        for id in ["a", "b", "c"] {
            graph.insert_node(Vertex::new(id)).unwrap();
        }
        graph.insert_edge(Link::new("a", "b")).unwrap();
        graph.insert_edge(Link::new("b", "c")).unwrap();
        graph.insert_edge(Link::new("c", "a")).unwrap();
        graph.insert_edge(Link::new("a", "c")).unwrap();
        graph
    }

    #[test]
    fn duplicate_and_missing_nodes_are_rejected() {
        let mut graph = triangle();
        assert_eq!(
            graph.insert_node(Vertex::new("a")).unwrap_err(),
            GraphError::DuplicateNode("a".into())
        );
        assert_eq!(
            graph.node("z").unwrap_err(),
            GraphError::NodeNotFound("z".into())
        );
        assert_eq!(
            graph.insert_edge(Link::new("a", "z")).unwrap_err(),
            GraphError::NodeNotFound("z".into())
        );
        assert!(matches!(
            graph.insert_edge(Link::new("a", "b")),
            Err(GraphError::DuplicateEdge(_))
        ));
    }

    #[test]
    fn preset_and_postset_follow_edges() {
        let graph = triangle();
        let post: Vec<_> = graph.postset("a").unwrap().iter().map(|n| n.id()).collect();
        let pre: Vec<_> = graph.preset("c").unwrap().iter().map(|n| n.id()).collect();

        assert_eq!(post, vec!["b", "c"]);
        assert_eq!(pre, vec!["b", "a"]);
        assert_eq!(graph.preset_edges("a").unwrap().len(), 1);
    }

    #[test]
    fn removing_a_node_drops_incident_edges() {
        let mut graph = triangle();
        graph.insert_edge(Link::new("b", "b")).unwrap();

        let removed = graph.remove_node("b").unwrap();
        assert_eq!(removed.id(), "b");
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.postset("a").unwrap().iter().all(|n| n.id() != "b"));
        assert!(graph.preset("c").unwrap().iter().all(|n| n.id() != "b"));
    }

    #[test]
    fn enumeration_is_stable_after_removal() {
        let mut graph = triangle();
        graph.remove_edge(&EdgeKey::new("b", "c")).unwrap();
        let keys: Vec<_> = graph.edges().map(|edge| edge.key().to_string()).collect();

        assert_eq!(keys, vec!["a -> b", "c -> a", "a -> c"]);
        let ids: Vec<_> = graph.nodes().map(|n| n.id()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn cloning_a_graph_filters_extensions() {
        let mut graph = triangle();
        graph.put_extension("layout", 1u32, ExtensionPolicy::NoCopy);
        graph.put_extension("origin", String::from("test"), ExtensionPolicy::Copy);
        graph
            .node_mut("a")
            .unwrap()
            .put_extension("colour", "red", ExtensionPolicy::NoCopy);

        let copy = graph.clone();
        assert!(copy.extension::<u32>("layout").is_none());
        assert_eq!(copy.extension::<String>("origin").map(String::as_str), Some("test"));
        assert!(copy.node("a").unwrap().extension::<&str>("colour").is_none());
        assert_eq!(graph.node("a").unwrap().extension::<&str>("colour"), Some(&"red"));
    }
}
