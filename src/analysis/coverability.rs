//! 覆盖图构造（Karp–Miller）.
//!
//! 从初始标识出发按工作表探索，每个新标识与其生成树上的全部祖先比较：
//! 若严格支配某个祖先，则把增长的分量置为 ω，并反复比较直到不再变化。
//! 相同标识复用已有节点，因此结果是图而不是树。
//!
//! 无 ω 的标识发生加速时，其祖先路径是真实的发生序列，据此记录
//! [`UnboundedWitness`]：前缀到达祖先，环可无限重复且每次严格增加该库所。
use std::collections::hash_map::Entry;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use cancel_this::is_cancelled;
use log::{debug, trace, warn};

use crate::analysis::AnalysisError;
use crate::config::{AnalysisConfig, ExplorationOrder};
use crate::graph::{ExtensionPolicy, Extensible};
use crate::lts::TransitionSystem;
use crate::net::ids::define_id;
use crate::net::{Idx, IndexVec, Marking, PetriNet, PlaceId, Token, TransitionId};

define_id!(CoverNodeId, "n");

/// Exploration status of a coverability node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    Unexplored,
    Exploring,
    Done,
}

#[derive(Debug, Clone)]
pub struct CoverNode {
    pub marking: Marking,
    /// Spanning-tree parent and the transition that discovered this node.
    pub parent: Option<(CoverNodeId, TransitionId)>,
    pub status: NodeStatus,
    pub enabled: Vec<TransitionId>,
}

impl CoverNode {
    fn new(marking: Marking, parent: Option<(CoverNodeId, TransitionId)>) -> Self {
        Self {
            marking,
            parent,
            status: NodeStatus::Unexplored,
            enabled: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverEdge {
    pub source: CoverNodeId,
    pub target: CoverNodeId,
    pub transition: TransitionId,
}

/// Constructive proof that `place` is unbounded.
///
/// Firing `prefix` from the initial marking reaches `marking_before`; firing
/// `cycle` from there reaches `marking_after`, which covers `marking_before`
/// and holds strictly more tokens on `place`. By monotonicity `cycle` can be
/// repeated forever, gaining [`UnboundedWitness::gain`] tokens each time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnboundedWitness {
    pub place: PlaceId,
    pub place_name: String,
    pub prefix: Vec<TransitionId>,
    pub cycle: Vec<TransitionId>,
    pub marking_before: Marking,
    pub marking_after: Marking,
}

impl UnboundedWitness {
    fn tokens(marking: &Marking, place: PlaceId) -> u64 {
        marking.tokens(place).finite().unwrap_or(u64::MAX)
    }

    /// Tokens added to `place` by one pass through `cycle`.
    pub fn gain(&self) -> u64 {
        Self::tokens(&self.marking_after, self.place)
            .saturating_sub(Self::tokens(&self.marking_before, self.place))
    }

    /// `prefix` followed by enough repetitions of `cycle` to leave more
    /// than `bound` tokens on `place`.
    pub fn sequence_exceeding(&self, bound: u64) -> Vec<TransitionId> {
        let start = Self::tokens(&self.marking_before, self.place);
        let gain = self.gain().max(1);
        let repetitions = if start > bound {
            0
        } else {
            (bound - start) / gain + 1
        };
        let mut sequence = self.prefix.clone();
        for _ in 0..repetitions {
            sequence.extend_from_slice(&self.cycle);
        }
        sequence
    }
}

impl fmt::Display for UnboundedWitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "place `{}` gains {} token(s) with every repetition of {:?} after {:?}",
            self.place_name,
            self.gain(),
            self.cycle,
            self.prefix
        )
    }
}

/// Karp–Miller coverability graph of a Petri net.
#[derive(Debug, Clone)]
pub struct CoverabilityGraph {
    name: String,
    nodes: IndexVec<CoverNodeId, CoverNode>,
    edges: Vec<CoverEdge>,
    labels: IndexVec<TransitionId, String>,
    witnesses: Vec<UnboundedWitness>,
}

impl CoverabilityGraph {
    pub fn build(net: &PetriNet) -> Result<Self, AnalysisError> {
        Self::with_config(net, &AnalysisConfig::default())
    }

    pub fn with_config(net: &PetriNet, config: &AnalysisConfig) -> Result<Self, AnalysisError> {
        let incidence = net.incidence();
        let mut graph = Self {
            name: net.name().to_owned(),
            nodes: IndexVec::new(),
            edges: Vec::new(),
            labels: net.transitions().map(|t| t.label().to_owned()).collect(),
            witnesses: Vec::new(),
        };
        let mut markings: HashMap<Marking, CoverNodeId> = HashMap::new();
        let mut worklist = VecDeque::new();

        let initial_marking = net.initial_marking();
        let initial = graph.nodes.push(CoverNode::new(initial_marking.clone(), None));
        markings.insert(initial_marking, initial);
        worklist.push_back(initial);

        loop {
            is_cancelled!()?;
            let next = match config.exploration_order {
                ExplorationOrder::BreadthFirst => worklist.pop_front(),
                ExplorationOrder::DepthFirst => worklist.pop_back(),
            };
            let Some(current) = next else {
                break;
            };

            graph.nodes[current].status = NodeStatus::Exploring;
            let marking = graph.nodes[current].marking.clone();
            let enabled: Vec<TransitionId> = incidence.enabled(&marking).collect();

            for &transition in &enabled {
                let Some(arcs) = incidence.arcs(transition) else {
                    continue;
                };
                let fired = arcs
                    .fire(&marking)
                    .map_err(|fault| net.fault_to_error(transition, fault, false))?;
                trace!("{current} --{transition}--> {fired}");

                graph.record_witnesses(net, current, transition, &fired);
                let successor = graph.accelerate(current, fired);

                let target = match markings.entry(successor) {
                    Entry::Occupied(entry) => *entry.get(),
                    Entry::Vacant(entry) => {
                        if let Some(limit) = config.state_limit {
                            if graph.nodes.len() >= limit {
                                warn!(
                                    "coverability graph of {} exceeds {} nodes",
                                    graph.name, limit
                                );
                                return Err(AnalysisError::StateLimitExceeded { limit });
                            }
                        }
                        let node = graph
                            .nodes
                            .push(CoverNode::new(entry.key().clone(), Some((current, transition))));
                        entry.insert(node);
                        worklist.push_back(node);
                        node
                    }
                };
                graph.edges.push(CoverEdge {
                    source: current,
                    target,
                    transition,
                });
            }

            let node = &mut graph.nodes[current];
            node.enabled = enabled;
            node.status = NodeStatus::Done;
        }

        debug!(
            "coverability graph of {}: {} nodes, {} edges, {} unboundedness witness(es)",
            graph.name,
            graph.nodes.len(),
            graph.edges.len(),
            graph.witnesses.len()
        );
        Ok(graph)
    }

    /// `from` followed by its spanning-tree ancestors up to the initial node.
    fn ancestors(&self, from: CoverNodeId) -> impl Iterator<Item = CoverNodeId> + '_ {
        std::iter::successors(self.nodes.get(from).map(|_| from), move |&id| {
            self.nodes
                .get(id)
                .and_then(|node| node.parent)
                .map(|(parent, _)| parent)
        })
    }

    /// Replaces every coordinate that grew over a dominated ancestor by ω
    /// until no ancestor is strictly dominated any more.
    fn accelerate(&self, parent: CoverNodeId, mut marking: Marking) -> Marking {
        loop {
            let mut changed = false;
            for ancestor in self.ancestors(parent) {
                let before = &self.nodes[ancestor].marking;
                if !marking.strictly_covers(before) {
                    continue;
                }
                let mut grew = false;
                for (place, tokens) in before.iter() {
                    let current = marking.tokens(place);
                    if !current.is_omega() && current > tokens {
                        marking.set(place, Token::Omega);
                        grew = true;
                    }
                }
                if grew {
                    debug!("accelerated over {ancestor}: {marking}");
                    changed = true;
                }
            }
            if !changed {
                return marking;
            }
        }
    }

    /// Records a witness for every place not yet witnessed that `fired`
    /// grows over an ancestor. Only ω-free successors qualify, so the whole
    /// ancestor path is a real firing sequence.
    fn record_witnesses(
        &mut self,
        net: &PetriNet,
        parent: CoverNodeId,
        transition: TransitionId,
        fired: &Marking,
    ) {
        if fired.has_omega()
            || !self
                .ancestors(parent)
                .any(|ancestor| fired.strictly_covers(&self.nodes[ancestor].marking))
        {
            return;
        }

        let path = self.firing_sequence(parent);
        let mut found: Vec<UnboundedWitness> = Vec::new();
        for (distance, ancestor) in self.ancestors(parent).enumerate() {
            let before = &self.nodes[ancestor].marking;
            if !fired.strictly_covers(before) {
                continue;
            }
            let depth = path.len() - distance;
            for (place, tokens) in before.iter() {
                let witnessed = self
                    .witnesses
                    .iter()
                    .chain(found.iter())
                    .any(|witness| witness.place == place);
                if witnessed || fired.tokens(place) <= tokens {
                    continue;
                }
                let mut cycle = path[depth..].to_vec();
                cycle.push(transition);
                found.push(UnboundedWitness {
                    place,
                    place_name: net.place_name(place),
                    prefix: path[..depth].to_vec(),
                    cycle,
                    marking_before: before.clone(),
                    marking_after: fired.clone(),
                });
            }
        }
        for witness in &found {
            debug!("unbounded: {witness}");
        }
        self.witnesses.extend(found);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn initial(&self) -> CoverNodeId {
        CoverNodeId::new(0)
    }

    pub fn node(&self, id: CoverNodeId) -> Option<&CoverNode> {
        self.nodes.get(id)
    }

    /// Nodes in discovery order.
    pub fn nodes(&self) -> impl Iterator<Item = (CoverNodeId, &CoverNode)> {
        self.nodes.iter_enumerated()
    }

    pub fn edges(&self) -> &[CoverEdge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn label(&self, transition: TransitionId) -> Option<&str> {
        self.labels.get(transition).map(String::as_str)
    }

    /// Nodes in which no transition is enabled.
    pub fn deadlocks(&self) -> Vec<CoverNodeId> {
        self.nodes()
            .filter(|(_, node)| node.enabled.is_empty())
            .map(|(id, _)| id)
            .collect()
    }

    pub fn has_omega(&self) -> bool {
        self.nodes.iter().any(|node| node.marking.has_omega())
    }

    /// Places holding ω in some node, sorted.
    pub fn unbounded_places(&self) -> Vec<PlaceId> {
        let mut places: Vec<PlaceId> = self
            .nodes
            .iter()
            .flat_map(|node| node.marking.omega_places())
            .collect();
        places.sort();
        places.dedup();
        places
    }

    /// Largest token count of `place` over all nodes, ω if unbounded.
    pub fn place_bound(&self, place: PlaceId) -> Token {
        self.nodes
            .iter()
            .map(|node| node.marking.tokens(place))
            .max()
            .unwrap_or(Token::ZERO)
    }

    /// Whether some node covers `marking`. Every reachable marking of the
    /// net is covered.
    pub fn covers(&self, marking: &Marking) -> bool {
        self.nodes.iter().any(|node| node.marking.covers(marking))
    }

    /// Transitions along the spanning tree from the initial node to `node`.
    pub fn firing_sequence(&self, node: CoverNodeId) -> Vec<TransitionId> {
        let mut sequence: Vec<TransitionId> = self
            .ancestors(node)
            .filter_map(|id| self.nodes[id].parent.map(|(_, transition)| transition))
            .collect();
        sequence.reverse();
        sequence
    }

    /// At most one witness per place, in discovery order. Non-empty exactly
    /// when some node carries ω, but a place that only turns ω in a later
    /// acceleration pass, or below a node already carrying ω, has none.
    pub fn witnesses(&self) -> &[UnboundedWitness] {
        &self.witnesses
    }

    pub fn witness_for(&self, place: PlaceId) -> Option<&UnboundedWitness> {
        self.witnesses.iter().find(|witness| witness.place == place)
    }

    /// The graph as a transition system. States are `s<i>` in discovery
    /// order, `s0` is initial, each state carries its marking under the
    /// `"marking"` extension and arcs carry transition labels.
    pub fn to_coverability_lts(&self) -> TransitionSystem {
        let mut ts = TransitionSystem::new(self.name.as_str());
        for (id, node) in self.nodes() {
            if let Ok(state) = ts.create_state(Some(Self::state_id(id).as_str())) {
                state.put_extension("marking", node.marking.clone(), ExtensionPolicy::Copy);
            }
        }
        for edge in &self.edges {
            let label = self.label(edge.transition).unwrap_or_default();
            let source = Self::state_id(edge.source);
            let target = Self::state_id(edge.target);
            // transitions sharing a label between the same markings collapse
            // into a single arc
            if ts.create_arc(&source, &target, label).is_err() {
                trace!("merged parallel `{label}` arc {source} -> {target}");
            }
        }
        if let Err(err) = ts.set_initial_state(&Self::state_id(self.initial())) {
            warn!("{err}");
        }
        ts
    }

    /// Like [`Self::to_coverability_lts`], but only for bounded nets, where
    /// the graph is the exact reachability graph.
    pub fn to_reachability_lts(&self) -> Result<TransitionSystem, AnalysisError> {
        match self.witnesses.first() {
            Some(witness) => Err(AnalysisError::Unbounded(Box::new(witness.clone()))),
            None => Ok(self.to_coverability_lts()),
        }
    }

    fn state_id(node: CoverNodeId) -> String {
        format!("s{}", node.index())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use cancel_this::Cancelled;

    use super::*;
    use crate::graph::Identified;
    use crate::net::Place;
    use crate::net::generators::cycle_net;

    /// `t` feeds `p` from nothing.
    fn producer() -> PetriNet {
        let mut net = PetriNet::new("producer");
        net.create_place("p").unwrap();
        net.create_transition("t").unwrap();
        net.create_flow("t", "p", 1).unwrap();
        net
    }

    /// `t0` moves the token from `p0` to `p1`, then `t1` reads `p1` and
    /// feeds `p2`.
    fn delayed_producer() -> PetriNet {
        let mut net = PetriNet::new("delayed");
        net.add_place(Place::with_tokens("p0", 1)).unwrap();
        net.create_place("p1").unwrap();
        net.create_place("p2").unwrap();
        net.create_transition("t0").unwrap();
        net.create_labelled_transition("t1", "emit").unwrap();
        net.create_flow("p0", "t0", 1).unwrap();
        net.create_flow("t0", "p1", 1).unwrap();
        net.create_flow("p1", "t1", 1).unwrap();
        net.create_flow("t1", "p1", 1).unwrap();
        net.create_flow("t1", "p2", 1).unwrap();
        net
    }

    #[test]
    fn bounded_ring_is_its_reachability_graph() {
        let net = cycle_net(3).unwrap();
        let graph = CoverabilityGraph::build(&net).unwrap();

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert!(!graph.has_omega());
        assert!(graph.deadlocks().is_empty());
        assert!(graph.nodes().all(|(_, node)| node.status == NodeStatus::Done));

        let ts = graph.to_reachability_lts().unwrap();
        assert_eq!(ts.state_count(), 3);
        assert_eq!(ts.initial_state().map(|s| s.id()), Some("s0"));
        assert_eq!(
            ts.state("s0").unwrap().extension::<Marking>("marking"),
            Some(&Marking::from_counts([1, 0, 0]))
        );
        assert!(ts.arc("s0", "s1", "t0").is_ok());
        assert!(ts.arc("s2", "s0", "t2").is_ok());
    }

    #[test]
    fn every_state_is_reached_by_its_firing_sequence() {
        let net = cycle_net(4).unwrap();
        let graph = CoverabilityGraph::build(&net).unwrap();
        let initial = net.initial_marking();

        for (id, node) in graph.nodes() {
            let sequence = graph.firing_sequence(id);
            assert_eq!(net.fire_sequence(&initial, &sequence).unwrap(), node.marking);
        }
    }

    #[test]
    fn producer_is_accelerated_to_omega() {
        let net = producer();
        let graph = CoverabilityGraph::build(&net).unwrap();

        assert!(graph.has_omega());
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.unbounded_places(), vec![PlaceId::new(0)]);
        assert_eq!(graph.place_bound(PlaceId::new(0)), Token::Omega);

        let ts = graph.to_coverability_lts();
        assert_eq!(ts.state_count(), 2);
        assert!(ts.arc("s1", "s1", "t").is_ok());

        match graph.to_reachability_lts() {
            Err(AnalysisError::Unbounded(witness)) => {
                assert_eq!(witness.place_name, "p");
                assert!(witness.prefix.is_empty());
                assert_eq!(witness.cycle, vec![TransitionId::new(0)]);
                assert_eq!(witness.gain(), 1);
            }
            other => panic!("expected unbounded, got {other:?}"),
        }
    }

    #[test]
    fn witness_sequence_exceeds_any_bound() {
        let net = delayed_producer();
        let graph = CoverabilityGraph::build(&net).unwrap();
        let p2 = net.place_index("p2").unwrap();

        assert_eq!(graph.unbounded_places(), vec![p2]);
        assert_eq!(graph.place_bound(net.place_index("p1").unwrap()), Token::Finite(1));

        let witness = graph.witness_for(p2).unwrap();
        assert_eq!(witness.prefix, vec![net.transition_index("t0").unwrap()]);
        assert_eq!(witness.cycle, vec![net.transition_index("t1").unwrap()]);

        for bound in [0, 1, 7] {
            let sequence = witness.sequence_exceeding(bound);
            let reached = net.fire_sequence(&net.initial_marking(), &sequence).unwrap();
            assert!(reached.tokens(p2) > Token::Finite(bound));
        }

        let ts = graph.to_coverability_lts();
        assert!(ts.alphabet().contains("emit"));
    }

    #[test]
    fn coverability_is_sound_for_reachable_markings() {
        let net = producer();
        let graph = CoverabilityGraph::build(&net).unwrap();
        let reached = net
            .fire_sequence(&net.initial_marking(), ["t"; 10])
            .unwrap();
        assert!(graph.covers(&reached));
    }

    #[test]
    fn exploration_order_does_not_change_the_result() {
        let net = delayed_producer();
        let depth_first = AnalysisConfig::default().with_exploration_order(ExplorationOrder::DepthFirst);
        let bfs = CoverabilityGraph::build(&net).unwrap();
        let dfs = CoverabilityGraph::with_config(&net, &depth_first).unwrap();

        assert_eq!(bfs.node_count(), dfs.node_count());
        assert_eq!(bfs.unbounded_places(), dfs.unbounded_places());
    }

    #[test]
    fn deadlocks_and_state_limit() {
        let mut net = PetriNet::new("once");
        net.add_place(Place::with_tokens("p0", 1)).unwrap();
        net.create_place("p1").unwrap();
        net.create_transition("t0").unwrap();
        net.create_flow("p0", "t0", 1).unwrap();
        net.create_flow("t0", "p1", 1).unwrap();

        let graph = CoverabilityGraph::build(&net).unwrap();
        assert_eq!(graph.deadlocks(), vec![CoverNodeId::new(1)]);

        let limited = AnalysisConfig::default().with_state_limit(Some(1));
        assert!(matches!(
            CoverabilityGraph::with_config(&producer(), &limited),
            Err(AnalysisError::StateLimitExceeded { limit: 1 })
        ));
    }

    /// `count` independent switches, each `off<i>` or `on<i>`.
    fn switches(count: usize) -> PetriNet {
        let mut net = PetriNet::new("switches");
        for i in 0..count {
            let (off, on) = (format!("off{i}"), format!("on{i}"));
            let (up, down) = (format!("up{i}"), format!("down{i}"));
            net.add_place(Place::with_tokens(off.as_str(), 1)).unwrap();
            net.create_place(on.as_str()).unwrap();
            net.create_transition(up.as_str()).unwrap();
            net.create_transition(down.as_str()).unwrap();
            net.create_flow(&off, &up, 1).unwrap();
            net.create_flow(&up, &on, 1).unwrap();
            net.create_flow(&on, &down, 1).unwrap();
            net.create_flow(&down, &off, 1).unwrap();
        }
        net
    }

    #[test]
    fn large_exploration_can_be_cancelled() {
        let net = switches(12);
        let outcome = cancel_this::on_timeout(Duration::from_millis(5), || {
            Ok::<_, Cancelled>(CoverabilityGraph::build(&net))
        });
        match outcome {
            Ok(Ok(graph)) => {
                assert_eq!(graph.node_count(), 4096);
                assert!(!graph.has_omega());
            }
            Ok(Err(AnalysisError::Cancelled(_))) | Err(_) => {}
            Ok(Err(other)) => panic!("unexpected error: {other}"),
        }
    }
}
