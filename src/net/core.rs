//! 运行时: 库所/迁移存储、标识、可发生集与（反向）发生语义.
use indexmap::IndexSet;
use log::trace;
use thiserror::Error;

use crate::graph::{Edge, EdgeKey, Extensible, Extensions, Graph, GraphError, Identified};
use crate::net::ids::{PlaceId, TransitionId};
use crate::net::incidence::{Incidence, StepFault, TransitionArcs};
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::marking::{Marking, Token, Weight};
use crate::net::structure::{Flow, Place, PnNode, Transition};

#[derive(Debug, Error)]
pub enum FireError {
    #[error("transition `{0}` does not exist")]
    UnknownTransition(String),
    #[error(
        "transition `{transition}` is not enabled: place `{place}` holds {available} token(s), {required} required"
    )]
    NotEnabled {
        transition: String,
        place: String,
        required: Weight,
        available: Token,
    },
    #[error(
        "transition `{transition}` cannot fire backwards: place `{place}` holds {available} token(s), {required} required"
    )]
    NotReverseEnabled {
        transition: String,
        place: String,
        required: Weight,
        available: Token,
    },
    #[error("marking has {found} entries but the net has {expected} places")]
    MarkingMismatch { expected: usize, found: usize },
    #[error("place `{0}` cannot hold ω tokens in an initial marking")]
    OmegaToken(String),
    #[error("firing `{transition}` overflows the token count of place `{place}`")]
    TokenOverflow { transition: String, place: String },
    #[error("step {position} of the firing sequence failed")]
    InSequence {
        position: usize,
        #[source]
        source: Box<FireError>,
    },
}

/// Anything that names a transition of a net: a dense [`TransitionId`] or
/// the transition's string id.
pub trait TransitionRef {
    fn resolve(&self, net: &PetriNet) -> Result<TransitionId, FireError>;
}

impl TransitionRef for TransitionId {
    fn resolve(&self, net: &PetriNet) -> Result<TransitionId, FireError> {
        if self.index() < net.transition_count() {
            Ok(*self)
        } else {
            Err(FireError::UnknownTransition(self.to_string()))
        }
    }
}

impl TransitionRef for str {
    fn resolve(&self, net: &PetriNet) -> Result<TransitionId, FireError> {
        net.transitions
            .get_index_of(self)
            .map(TransitionId::from_usize)
            .ok_or_else(|| FireError::UnknownTransition(self.to_owned()))
    }
}

impl TransitionRef for String {
    fn resolve(&self, net: &PetriNet) -> Result<TransitionId, FireError> {
        self.as_str().resolve(net)
    }
}

impl<T> TransitionRef for &T
where
    T: TransitionRef + ?Sized,
{
    fn resolve(&self, net: &PetriNet) -> Result<TransitionId, FireError> {
        (**self).resolve(net)
    }
}

/// Place/transition net stored in a [`Graph`].
///
/// Places and transitions share one id namespace. Their insertion order
/// defines the dense [`PlaceId`]/[`TransitionId`] numbering used by
/// [`Marking`]; markings taken before a place is removed no longer fit the net.
#[derive(Debug, Clone)]
pub struct PetriNet {
    graph: Graph<PnNode, Flow>,
    places: IndexSet<String>,
    transitions: IndexSet<String>,
}

impl PetriNet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            graph: Graph::new(name),
            places: IndexSet::new(),
            transitions: IndexSet::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.graph.name()
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.graph.set_name(name);
    }

    pub fn graph(&self) -> &Graph<PnNode, Flow> {
        &self.graph
    }

    pub fn create_place(&mut self, id: impl Into<String>) -> Result<PlaceId, GraphError> {
        self.add_place(Place::new(id))
    }

    pub fn add_place(&mut self, place: Place) -> Result<PlaceId, GraphError> {
        let id = place.id().to_owned();
        self.graph.insert_node(PnNode::Place(place))?;
        let (index, _) = self.places.insert_full(id);
        Ok(PlaceId::from_usize(index))
    }

    /// Creates a transition labelled with its id.
    pub fn create_transition(&mut self, id: impl Into<String>) -> Result<TransitionId, GraphError> {
        self.add_transition(Transition::new(id))
    }

    pub fn create_labelled_transition(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
    ) -> Result<TransitionId, GraphError> {
        self.add_transition(Transition::with_label(id, label))
    }

    pub fn add_transition(&mut self, transition: Transition) -> Result<TransitionId, GraphError> {
        let id = transition.id().to_owned();
        self.graph.insert_node(PnNode::Transition(transition))?;
        let (index, _) = self.transitions.insert_full(id);
        Ok(TransitionId::from_usize(index))
    }

    /// Connects a place and a transition (either direction).
    pub fn create_flow(
        &mut self,
        source: &str,
        target: &str,
        weight: Weight,
    ) -> Result<&mut Flow, GraphError> {
        if weight == 0 {
            return Err(GraphError::InvalidWeight {
                from: source.to_owned(),
                to: target.to_owned(),
                weight,
            });
        }
        let from = self.graph.node(source)?;
        let to = self.graph.node(target)?;
        if from.is_place() == to.is_place() {
            return Err(GraphError::IllegalFlow {
                from: source.to_owned(),
                to: target.to_owned(),
            });
        }
        self.graph.insert_edge(Flow::new(source, target, weight))
    }

    pub fn remove_flow(&mut self, source: &str, target: &str) -> Result<Flow, GraphError> {
        self.graph.remove_edge(&EdgeKey::new(source, target))
    }

    /// Removes a place or transition and every flow touching it. Dense ids of
    /// the nodes created after it shift down by one.
    pub fn remove_node(&mut self, id: &str) -> Result<PnNode, GraphError> {
        let node = self.graph.remove_node(id)?;
        match &node {
            PnNode::Place(_) => self.places.shift_remove(id),
            PnNode::Transition(_) => self.transitions.shift_remove(id),
        };
        Ok(node)
    }

    pub fn node(&self, id: &str) -> Result<&PnNode, GraphError> {
        self.graph.node(id)
    }

    pub fn place(&self, id: &str) -> Result<&Place, GraphError> {
        self.graph
            .node(id)?
            .as_place()
            .ok_or_else(|| GraphError::NotAPlace(id.to_owned()))
    }

    pub fn place_mut(&mut self, id: &str) -> Result<&mut Place, GraphError> {
        self.graph
            .node_mut(id)?
            .as_place_mut()
            .ok_or_else(|| GraphError::NotAPlace(id.to_owned()))
    }

    pub fn transition(&self, id: &str) -> Result<&Transition, GraphError> {
        self.graph
            .node(id)?
            .as_transition()
            .ok_or_else(|| GraphError::NotATransition(id.to_owned()))
    }

    pub fn transition_mut(&mut self, id: &str) -> Result<&mut Transition, GraphError> {
        self.graph
            .node_mut(id)?
            .as_transition_mut()
            .ok_or_else(|| GraphError::NotATransition(id.to_owned()))
    }

    pub fn flow(&self, source: &str, target: &str) -> Result<&Flow, GraphError> {
        self.graph.edge(&EdgeKey::new(source, target))
    }

    pub fn flow_mut(&mut self, source: &str, target: &str) -> Result<&mut Flow, GraphError> {
        self.graph.edge_mut(&EdgeKey::new(source, target))
    }

    pub fn place_at(&self, place: PlaceId) -> Option<&Place> {
        let id = self.places.get_index(place.index())?;
        self.graph.node(id).ok()?.as_place()
    }

    pub fn transition_at(&self, transition: TransitionId) -> Option<&Transition> {
        let id = self.transitions.get_index(transition.index())?;
        self.graph.node(id).ok()?.as_transition()
    }

    /// Places in [`PlaceId`] order.
    pub fn places(&self) -> impl Iterator<Item = &Place> {
        self.places
            .iter()
            .filter_map(|id| self.graph.node(id).ok().and_then(PnNode::as_place))
    }

    /// Transitions in [`TransitionId`] order.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition> {
        self.transitions
            .iter()
            .filter_map(|id| self.graph.node(id).ok().and_then(PnNode::as_transition))
    }

    pub fn flows(&self) -> impl Iterator<Item = &Flow> {
        self.graph.edges()
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    pub fn flow_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn place_index(&self, id: &str) -> Result<PlaceId, GraphError> {
        match self.places.get_index_of(id) {
            Some(index) => Ok(PlaceId::from_usize(index)),
            None if self.graph.contains_node(id) => Err(GraphError::NotAPlace(id.to_owned())),
            None => Err(GraphError::NodeNotFound(id.to_owned())),
        }
    }

    pub fn transition_index(&self, id: &str) -> Result<TransitionId, GraphError> {
        match self.transitions.get_index_of(id) {
            Some(index) => Ok(TransitionId::from_usize(index)),
            None if self.graph.contains_node(id) => {
                Err(GraphError::NotATransition(id.to_owned()))
            }
            None => Err(GraphError::NodeNotFound(id.to_owned())),
        }
    }

    pub fn place_name(&self, place: PlaceId) -> String {
        self.places
            .get_index(place.index())
            .cloned()
            .unwrap_or_else(|| place.to_string())
    }

    pub fn transition_name(&self, transition: TransitionId) -> String {
        self.transitions
            .get_index(transition.index())
            .cloned()
            .unwrap_or_else(|| transition.to_string())
    }

    pub fn preset(&self, id: &str) -> Result<Vec<&PnNode>, GraphError> {
        self.graph.preset(id)
    }

    pub fn postset(&self, id: &str) -> Result<Vec<&PnNode>, GraphError> {
        self.graph.postset(id)
    }

    pub fn preset_flows(&self, id: &str) -> Result<Vec<&Flow>, GraphError> {
        self.graph.preset_edges(id)
    }

    pub fn postset_flows(&self, id: &str) -> Result<Vec<&Flow>, GraphError> {
        self.graph.postset_edges(id)
    }

    pub fn initial_marking(&self) -> Marking {
        Marking::from_counts(self.places().map(|place| place.initial_tokens))
    }

    pub fn set_initial_tokens(&mut self, place: &str, tokens: Weight) -> Result<(), GraphError> {
        self.place_mut(place)?.initial_tokens = tokens;
        Ok(())
    }

    pub fn set_initial_marking(&mut self, marking: &Marking) -> Result<(), FireError> {
        self.check_marking(marking)?;
        // all-or-nothing: an ω anywhere leaves the net untouched
        let counts = marking
            .iter()
            .map(|(place, tokens)| {
                let name = self.place_name(place);
                match tokens.finite() {
                    Some(count) => Ok((name, count)),
                    None => Err(FireError::OmegaToken(name)),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        for (name, count) in counts {
            if let Ok(place) = self.place_mut(&name) {
                place.initial_tokens = count;
            }
        }
        Ok(())
    }

    /// Builds a marking from `(place, tokens)` pairs; unlisted places are empty.
    pub fn marking_from<'a, I>(&self, tokens: I) -> Result<Marking, GraphError>
    where
        I: IntoIterator<Item = (&'a str, Weight)>,
    {
        let mut marking = Marking::zero(self.place_count());
        for (place, count) in tokens {
            marking.set(self.place_index(place)?, Token::Finite(count));
        }
        Ok(marking)
    }

    pub fn tokens(&self, marking: &Marking, place: &str) -> Result<Token, GraphError> {
        Ok(marking.tokens(self.place_index(place)?))
    }

    pub fn arcs(&self, transition: impl TransitionRef) -> Result<TransitionArcs, FireError> {
        let transition = transition.resolve(self)?;
        Ok(self.compile_arcs(transition))
    }

    /// Compiles the arc table of every transition.
    pub fn incidence(&self) -> Incidence {
        let transitions: IndexVec<TransitionId, TransitionArcs> = (0..self.transition_count())
            .map(|idx| self.compile_arcs(TransitionId::from_usize(idx)))
            .collect();
        Incidence::new(self.place_count(), transitions)
    }

    /// Net token change caused by firing `transition`.
    pub fn effect(&self, transition: impl TransitionRef) -> Result<Vec<(PlaceId, i128)>, FireError> {
        Ok(self.arcs(transition)?.effect().to_vec())
    }

    pub fn is_enabled(
        &self,
        marking: &Marking,
        transition: impl TransitionRef,
    ) -> Result<bool, FireError> {
        self.check_marking(marking)?;
        Ok(self.arcs(transition)?.is_enabled(marking))
    }

    pub fn enabled_transitions(&self, marking: &Marking) -> Vec<TransitionId> {
        (0..self.transition_count())
            .map(TransitionId::from_usize)
            .filter(|&transition| self.compile_arcs(transition).is_enabled(marking))
            .collect()
    }

    pub fn fire(
        &self,
        marking: &Marking,
        transition: impl TransitionRef,
    ) -> Result<Marking, FireError> {
        self.check_marking(marking)?;
        let transition = transition.resolve(self)?;
        let next = self
            .compile_arcs(transition)
            .fire(marking)
            .map_err(|fault| self.fault_to_error(transition, fault, false))?;
        trace!(
            "fired {} in {}: {} -> {}",
            self.transition_name(transition),
            self.name(),
            marking,
            next
        );
        Ok(next)
    }

    /// Fires `sequence` left to right, stopping at the first failure.
    pub fn fire_sequence<I>(&self, marking: &Marking, sequence: I) -> Result<Marking, FireError>
    where
        I: IntoIterator,
        I::Item: TransitionRef,
    {
        let mut current = marking.clone();
        for (position, transition) in sequence.into_iter().enumerate() {
            current = self
                .fire(&current, transition)
                .map_err(|err| FireError::InSequence {
                    position,
                    source: Box::new(err),
                })?;
        }
        Ok(current)
    }

    /// Undoes a firing: requires the postset weights and returns
    /// `marking - post + pre`.
    pub fn reverse_fire(
        &self,
        marking: &Marking,
        transition: impl TransitionRef,
    ) -> Result<Marking, FireError> {
        self.check_marking(marking)?;
        let transition = transition.resolve(self)?;
        self.compile_arcs(transition)
            .reverse_fire(marking)
            .map_err(|fault| self.fault_to_error(transition, fault, true))
    }

    /// The same net with every flow turned around.
    pub fn reversed(&self) -> Result<PetriNet, GraphError> {
        let mut reversed = PetriNet::new(self.name());
        *reversed.graph.extensions_mut() = self.graph.extensions().clone_with_policy();
        for place in self.places() {
            reversed.add_place(place.clone())?;
        }
        for transition in self.transitions() {
            reversed.add_transition(transition.clone())?;
        }
        for flow in self.flows() {
            reversed.graph.insert_edge(flow.reversed())?;
        }
        Ok(reversed)
    }

    fn compile_arcs(&self, transition: TransitionId) -> TransitionArcs {
        let mut arcs = TransitionArcs::default();
        let Some(id) = self.transitions.get_index(transition.index()) else {
            return arcs;
        };
        for flow in self.graph.preset_edges(id).unwrap_or_default() {
            if let Some(place) = self.places.get_index_of(flow.source()) {
                arcs.pre.push((PlaceId::from_usize(place), flow.weight()));
            }
        }
        for flow in self.graph.postset_edges(id).unwrap_or_default() {
            if let Some(place) = self.places.get_index_of(flow.target()) {
                arcs.post.push((PlaceId::from_usize(place), flow.weight()));
            }
        }
        arcs
    }

    fn check_marking(&self, marking: &Marking) -> Result<(), FireError> {
        if marking.len() == self.place_count() {
            Ok(())
        } else {
            Err(FireError::MarkingMismatch {
                expected: self.place_count(),
                found: marking.len(),
            })
        }
    }

    pub(crate) fn fault_to_error(
        &self,
        transition: TransitionId,
        fault: StepFault,
        reverse: bool,
    ) -> FireError {
        let transition = self.transition_name(transition);
        match fault {
            StepFault::Starved {
                place,
                required,
                available,
            } if reverse => FireError::NotReverseEnabled {
                transition,
                place: self.place_name(place),
                required,
                available,
            },
            StepFault::Starved {
                place,
                required,
                available,
            } => FireError::NotEnabled {
                transition,
                place: self.place_name(place),
                required,
                available,
            },
            StepFault::Overflow(place) => FireError::TokenOverflow {
                transition,
                place: self.place_name(place),
            },
        }
    }
}

impl Extensible for PetriNet {
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

    /// p0 --2--> t0 --1--> p1, t1 reads p1 and refills p0
    fn build_weighted_net() -> PetriNet {
        let mut net = PetriNet::new("weighted");
        net.add_place(Place::with_tokens("p0", 3)).unwrap();
        net.create_place("p1").unwrap();
        net.create_transition("t0").unwrap();
        net.create_labelled_transition("t1", "back").unwrap();
        net.create_flow("p0", "t0", 2).unwrap();
        net.create_flow("t0", "p1", 1).unwrap();
        net.create_flow("p1", "t1", 1).unwrap();
        net.create_flow("t1", "p1", 1).unwrap();
        net.create_flow("t1", "p0", 2).unwrap();
        net
    }

    #[test]
    fn flows_must_alternate_node_kinds() {
        let mut net = build_weighted_net();
        assert_eq!(
            net.create_flow("p0", "p1", 1).unwrap_err(),
            GraphError::IllegalFlow {
                from: "p0".into(),
                to: "p1".into()
            }
        );
        assert!(matches!(
            net.create_flow("t0", "t1", 1),
            Err(GraphError::IllegalFlow { .. })
        ));
        assert!(matches!(
            net.create_flow("t0", "p0", 0),
            Err(GraphError::InvalidWeight { weight: 0, .. })
        ));
        assert_eq!(
            net.create_transition("p0").unwrap_err(),
            GraphError::DuplicateNode("p0".into())
        );
        assert!(matches!(
            net.create_flow("p0", "t0", 1),
            Err(GraphError::DuplicateEdge(_))
        ));
        assert_eq!(
            net.place("t0").unwrap_err(),
            GraphError::NotAPlace("t0".into())
        );
    }

    #[test]
    fn firing_subtracts_preset_and_adds_postset() {
        let net = build_weighted_net();
        let m0 = net.initial_marking();
        assert_eq!(m0, Marking::from_counts([3, 0]));
        assert_eq!(net.enabled_transitions(&m0), vec![TransitionId::new(0)]);

        let m1 = net.fire(&m0, "t0").unwrap();
        assert_eq!(m1, Marking::from_counts([1, 1]));
        assert!(net.is_enabled(&m1, "t1").unwrap());
        assert!(!net.is_enabled(&m1, "t0").unwrap());

        // side condition on p1: read and given back
        let m2 = net.fire(&m1, "t1").unwrap();
        assert_eq!(m2, Marking::from_counts([3, 1]));
        assert_eq!(net.transition("t1").unwrap().label(), "back");
    }

    #[test]
    fn disabled_transition_reports_starving_place() {
        let net = build_weighted_net();
        let err = net.fire(&net.initial_marking(), "t1").unwrap_err();
        match err {
            FireError::NotEnabled {
                transition,
                place,
                required,
                available,
            } => {
                assert_eq!(transition, "t1");
                assert_eq!(place, "p1");
                assert_eq!(required, 1);
                assert_eq!(available, Token::ZERO);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            net.fire(&net.initial_marking(), "t9"),
            Err(FireError::UnknownTransition(_))
        ));
        assert!(matches!(
            net.fire(&Marking::from_counts([1]), "t0"),
            Err(FireError::MarkingMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn sequence_stops_at_first_failure() {
        let net = build_weighted_net();
        let m0 = net.initial_marking();
        assert_eq!(
            net.fire_sequence(&m0, ["t0", "t1", "t0"]).unwrap(),
            Marking::from_counts([1, 2])
        );

        let err = net.fire_sequence(&m0, ["t0", "t0", "t1"]).unwrap_err();
        match err {
            FireError::InSequence { position, source } => {
                assert_eq!(position, 1);
                assert!(matches!(*source, FireError::NotEnabled { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reverse_fire_undoes_fire() {
        let net = build_weighted_net();
        let m0 = net.initial_marking();
        let m1 = net.fire(&m0, "t0").unwrap();
        assert_eq!(net.reverse_fire(&m1, "t0").unwrap(), m0);
        assert!(matches!(
            net.reverse_fire(&m0, "t0"),
            Err(FireError::NotReverseEnabled { .. })
        ));

        let reversed = net.reversed().unwrap();
        assert_eq!(reversed.flow("t0", "p0").unwrap().weight(), 2);
        assert!(reversed.flow("p0", "t0").is_err());
        assert_eq!(reversed.fire(&m1, "t0").unwrap(), m0);
    }

    #[test]
    fn removing_a_place_renumbers_and_drops_flows() {
        let mut net = build_weighted_net();
        net.remove_node("p0").unwrap();

        assert_eq!(net.place_count(), 1);
        assert_eq!(net.place_index("p1").unwrap(), PlaceId::new(0));
        assert_eq!(net.flow_count(), 3);
        assert!(net.preset_flows("t0").unwrap().is_empty());
        assert_eq!(
            net.place_index("p0").unwrap_err(),
            GraphError::NodeNotFound("p0".into())
        );
    }

    #[test]
    fn initial_marking_round_trip() {
        let mut net = build_weighted_net();
        let marking = net.marking_from([("p1", 4)]).unwrap();
        net.set_initial_marking(&marking).unwrap();

        assert_eq!(net.initial_marking(), Marking::from_counts([0, 4]));
        assert_eq!(net.tokens(&marking, "p1").unwrap(), Token::Finite(4));

        let mut omega = marking.clone();
        omega.set(PlaceId::new(0), Token::Omega);
        assert!(matches!(
            net.set_initial_marking(&omega),
            Err(FireError::OmegaToken(place)) if place == "p0"
        ));
    }

    #[test]
    fn omega_in_last_place_leaves_initial_tokens_alone() {
        let mut net = build_weighted_net();
        let mut marking = net.marking_from([("p0", 5)]).unwrap();
        marking.set(PlaceId::new(1), Token::Omega);

        assert!(matches!(
            net.set_initial_marking(&marking),
            Err(FireError::OmegaToken(place)) if place == "p1"
        ));
        assert_eq!(net.initial_marking(), Marking::from_counts([3, 0]));
    }
}
