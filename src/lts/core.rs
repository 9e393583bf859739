use std::collections::{BTreeSet, VecDeque};

use indexmap::{IndexMap, IndexSet};
use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::graph::{Edge, EdgeKey, Extensible, Extensions, Graph, GraphError, Identified};
use crate::lts::structure::{Arc, State};

/// Labelled transition system with an optional initial state.
#[derive(Debug, Clone)]
pub struct TransitionSystem {
    graph: Graph<State, Arc>,
    initial: Option<String>,
    fresh: usize,
}

impl TransitionSystem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(name),
            initial: None,
            fresh: 0,
        }
    }

    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.graph.set_name(name);
    }

    pub fn graph(&self) -> &Graph<State, Arc> {
        &self.graph
    }

    /// Creates a state. Without an id the next free `s<n>` is used.
    pub fn create_state(&mut self, id: Option<&str>) -> Result<&mut State, GraphError> {
        let id = match id {
            Some(id) => id.to_owned(),
            None => self.fresh_id(),
        };
        self.graph.insert_node(State::new(id))
    }

    fn fresh_id(&mut self) -> String {
        loop {
            let candidate = format!("s{}", self.fresh);
            self.fresh += 1;
            if !self.graph.contains_node(&candidate) {
                return candidate;
            }
        }
    }

    pub fn create_arc(
        &mut self,
        source: &str,
        target: &str,
        label: &str,
    ) -> Result<&mut Arc, GraphError> {
        self.graph.insert_edge(Arc::new(source, target, label))
    }

    pub fn remove_state(&mut self, id: &str) -> Result<State, GraphError> {
        let state = self.graph.remove_node(id)?;
        if self.initial.as_deref() == Some(id) {
            self.initial = None;
        }
        Ok(state)
    }

    pub fn remove_arc(&mut self, source: &str, target: &str, label: &str) -> Result<Arc, GraphError> {
        self.graph
            .remove_edge(&EdgeKey::labelled(source, target, label))
    }

    /// Marks `id` as the only initial state.
    pub fn set_initial_state(&mut self, id: &str) -> Result<(), GraphError> {
        self.graph.node_mut(id)?.set_initial(true);
        if let Some(previous) = self.initial.replace(id.to_owned()) {
            if previous != id {
                if let Ok(state) = self.graph.node_mut(&previous) {
                    state.set_initial(false);
                }
            }
        }
        Ok(())
    }

    pub fn initial_state(&self) -> Option<&State> {
        self.initial
            .as_deref()
            .and_then(|id| self.graph.node(id).ok())
    }

    pub fn state(&self, id: &str) -> Result<&State, GraphError> {
        self.graph.node(id)
    }

    pub fn state_mut(&mut self, id: &str) -> Result<&mut State, GraphError> {
        self.graph.node_mut(id)
    }

    pub fn contains_state(&self, id: &str) -> bool {
        self.graph.contains_node(id)
    }

    pub fn arc(&self, source: &str, target: &str, label: &str) -> Result<&Arc, GraphError> {
        self.graph.edge(&EdgeKey::labelled(source, target, label))
    }

    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.graph.nodes()
    }

    pub fn arcs(&self) -> impl Iterator<Item = &Arc> {
        self.graph.edges()
    }

    pub fn state_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn arc_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn preset(&self, id: &str) -> Result<Vec<&State>, GraphError> {
        self.graph.preset(id)
    }

    pub fn postset(&self, id: &str) -> Result<Vec<&State>, GraphError> {
        self.graph.postset(id)
    }

    pub fn incoming_arcs(&self, id: &str) -> Result<Vec<&Arc>, GraphError> {
        self.graph.preset_edges(id)
    }

    pub fn outgoing_arcs(&self, id: &str) -> Result<Vec<&Arc>, GraphError> {
        self.graph.postset_edges(id)
    }

    /// Labels used by at least one arc, sorted.
    pub fn alphabet(&self) -> BTreeSet<&str> {
        self.arcs().map(Arc::label).collect()
    }

    /// Targets of the `label` arcs leaving `state`.
    pub fn post_by_label(&self, state: &str, label: &str) -> Result<Vec<&State>, GraphError> {
        let targets: Vec<&str> = self
            .outgoing_arcs(state)?
            .into_iter()
            .filter(|arc| arc.label() == label)
            .map(|arc| arc.target())
            .collect();
        targets.into_iter().map(|id| self.graph.node(id)).collect()
    }

    pub fn is_deterministic(&self) -> bool {
        self.nondeterminism_witness().is_none()
    }

    /// First state (in insertion order) with two outgoing arcs carrying the
    /// same label, together with that label.
    pub fn nondeterminism_witness(&self) -> Option<(&State, &str)> {
        self.states().find_map(|state| {
            let mut seen = IndexSet::new();
            self.graph
                .postset_edges(state.id())
                .ok()?
                .into_iter()
                .map(Arc::label)
                .find(|label| !seen.insert(*label))
                .map(|label| (state, label))
        })
    }

    /// States reachable from the initial state, in breadth-first order.
    /// Empty when no initial state is set.
    pub fn reachable_states(&self) -> IndexSet<&str> {
        let mut visited = IndexSet::new();
        let Some(initial) = self.initial_state() else {
            return visited;
        };
        let mut queue = VecDeque::from([initial.id()]);
        visited.insert(initial.id());
        while let Some(id) = queue.pop_front() {
            for arc in self.graph.postset_edges(id).unwrap_or_default() {
                if visited.insert(arc.target()) {
                    queue.push_back(arc.target());
                }
            }
        }
        visited
    }

    /// petgraph view: node weights are state ids, edge weights are labels.
    /// Node indices follow [`TransitionSystem::states`] order.
    pub fn to_petgraph(&self) -> DiGraph<String, String> {
        let mut graph = DiGraph::with_capacity(self.state_count(), self.arc_count());
        let mut index: IndexMap<&str, NodeIndex> = IndexMap::new();
        for state in self.states() {
            index.insert(state.id(), graph.add_node(state.id().to_owned()));
        }
        for arc in self.arcs() {
            if let (Some(&from), Some(&to)) = (index.get(arc.source()), index.get(arc.target())) {
                graph.add_edge(from, to, arc.label().to_owned());
            }
        }
        graph
    }

    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.to_petgraph()))
    }
}

impl Extensible for TransitionSystem {
    fn extensions(&self) -> &Extensions {
        self.graph.extensions()
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        self.graph.extensions_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// s0 -a-> s1 -b-> s0, s1 -b-> s2
    fn branching() -> TransitionSystem {
        let mut ts = TransitionSystem::new("branching");
        for _ in 0..3 {
            ts.create_state(None).unwrap();
        }
        ts.create_arc("s0", "s1", "a").unwrap();
        ts.create_arc("s1", "s0", "b").unwrap();
        ts.create_arc("s1", "s2", "b").unwrap();
        ts.set_initial_state("s0").unwrap();
        ts
    }

    #[test]
    fn fresh_ids_skip_used_names() {
        let mut ts = TransitionSystem::new("ids");
        ts.create_state(Some("s1")).unwrap();
        let first = ts.create_state(None).unwrap().id().to_owned();
        let second = ts.create_state(None).unwrap().id().to_owned();

        assert_eq!(first, "s0");
        assert_eq!(second, "s2");
        assert_eq!(
            ts.create_state(Some("s0")).unwrap_err(),
            GraphError::DuplicateNode("s0".into())
        );
    }

    #[test]
    fn initial_state_is_unique() {
        let mut ts = branching();
        assert_eq!(
            ts.set_initial_state("nowhere").unwrap_err(),
            GraphError::NodeNotFound("nowhere".into())
        );
        assert_eq!(ts.initial_state().map(|s| s.id()), Some("s0"));

        ts.set_initial_state("s1").unwrap();
        let initial: Vec<_> = ts.states().filter(|s| s.is_initial()).map(|s| s.id()).collect();
        assert_eq!(initial, vec!["s1"]);

        ts.remove_state("s1").unwrap();
        assert!(ts.initial_state().is_none());
        assert_eq!(ts.arc_count(), 0);
    }

    #[test]
    fn parallel_arcs_need_distinct_labels() {
        let mut ts = branching();
        ts.create_arc("s0", "s1", "c").unwrap();
        assert!(matches!(
            ts.create_arc("s0", "s1", "a"),
            Err(GraphError::DuplicateEdge(_))
        ));
        assert_eq!(ts.alphabet().into_iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
        assert_eq!(ts.postset("s0").unwrap().len(), 1);
    }

    #[test]
    fn determinism_queries() {
        let ts = branching();
        assert!(!ts.is_deterministic());
        let (state, label) = ts.nondeterminism_witness().unwrap();
        assert_eq!((state.id(), label), ("s1", "b"));

        let targets: Vec<_> = ts
            .post_by_label("s1", "b")
            .unwrap()
            .iter()
            .map(|s| s.id())
            .collect();
        assert_eq!(targets, vec!["s0", "s2"]);

        let mut ts = ts;
        ts.remove_arc("s1", "s2", "b").unwrap();
        assert!(ts.is_deterministic());
    }

    #[test]
    fn reachability_and_export() {
        let mut ts = branching();
        ts.create_state(Some("island")).unwrap();

        let reachable: Vec<_> = ts.reachable_states().into_iter().collect();
        assert_eq!(reachable, vec!["s0", "s1", "s2"]);

        let graph = ts.to_petgraph();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert!(ts.to_dot().contains("digraph"));
    }
}
