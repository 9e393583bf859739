//! 迁移的稀疏输入/输出弧表，发生规则（正向与反向）在此统一实现.
use smallvec::SmallVec;

use crate::net::ids::{PlaceId, TransitionId};
use crate::net::index_vec::IndexVec;
use crate::net::marking::{Marking, Token, Weight};

type SmallRow<T> = SmallVec<[T; 4]>;

/// Why a marking could not be transformed by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepFault {
    Starved {
        place: PlaceId,
        required: Weight,
        available: Token,
    },
    Overflow(PlaceId),
}

/// Weighted preset (`pre`) and postset (`post`) of one transition.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransitionArcs {
    pub pre: SmallRow<(PlaceId, Weight)>,
    pub post: SmallRow<(PlaceId, Weight)>,
}

impl TransitionArcs {
    pub fn is_enabled(&self, marking: &Marking) -> bool {
        self.starving(&self.pre, marking).is_none()
    }

    pub fn is_reverse_enabled(&self, marking: &Marking) -> bool {
        self.starving(&self.post, marking).is_none()
    }

    /// `marking - pre + post`. Side conditions are handled naturally since
    /// the whole preset is consumed before the postset is produced.
    pub fn fire(&self, marking: &Marking) -> Result<Marking, StepFault> {
        Self::step(&self.pre, &self.post, marking)
    }

    /// `marking - post + pre`, the inverse of [`TransitionArcs::fire`].
    pub fn reverse_fire(&self, marking: &Marking) -> Result<Marking, StepFault> {
        Self::step(&self.post, &self.pre, marking)
    }

    /// Net token change per place, zero entries omitted.
    pub fn effect(&self) -> SmallRow<(PlaceId, i128)> {
        let mut effect: SmallRow<(PlaceId, i128)> = SmallRow::new();
        let mut add = |place: PlaceId, delta: i128| {
            match effect.iter_mut().find(|(p, _)| *p == place) {
                Some((_, total)) => *total += delta,
                None => effect.push((place, delta)),
            }
        };
        for &(place, weight) in &self.pre {
            add(place, -(weight as i128));
        }
        for &(place, weight) in &self.post {
            add(place, weight as i128);
        }
        effect.retain(|(_, delta)| *delta != 0);
        effect.sort_by_key(|(place, _)| *place);
        effect
    }

    fn starving(&self, row: &[(PlaceId, Weight)], marking: &Marking) -> Option<StepFault> {
        row.iter().find_map(|&(place, required)| {
            let available = marking.tokens(place);
            (!available.covers_weight(required)).then_some(StepFault::Starved {
                place,
                required,
                available,
            })
        })
    }

    fn step(
        consume: &[(PlaceId, Weight)],
        produce: &[(PlaceId, Weight)],
        marking: &Marking,
    ) -> Result<Marking, StepFault> {
        let mut next = marking.clone();
        for &(place, weight) in consume {
            let available = next.tokens(place);
            let after = available.checked_sub(weight).ok_or(StepFault::Starved {
                place,
                required: weight,
                available,
            })?;
            next.set(place, after);
        }
        for &(place, weight) in produce {
            let after = next
                .tokens(place)
                .checked_add(weight)
                .ok_or(StepFault::Overflow(place))?;
            next.set(place, after);
        }
        Ok(next)
    }
}

/// Arc table of a whole net, compiled once so exploration loops do not go
/// back to the string-keyed graph for every firing.
#[derive(Debug, Clone, Default)]
pub struct Incidence {
    places: usize,
    transitions: IndexVec<TransitionId, TransitionArcs>,
}

impl Incidence {
    pub fn new(places: usize, transitions: IndexVec<TransitionId, TransitionArcs>) -> Self {
        Self {
            places,
            transitions,
        }
    }

    pub fn places(&self) -> usize {
        self.places
    }

    pub fn transitions(&self) -> usize {
        self.transitions.len()
    }

    pub fn arcs(&self, transition: TransitionId) -> Option<&TransitionArcs> {
        self.transitions.get(transition)
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransitionId, &TransitionArcs)> {
        self.transitions.iter_enumerated()
    }

    pub fn enabled(&self, marking: &Marking) -> impl Iterator<Item = TransitionId> {
        self.transitions
            .iter_enumerated()
            .filter(move |(_, arcs)| arcs.is_enabled(marking))
            .map(|(transition, _)| transition)
    }
}
