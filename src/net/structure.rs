//! P/T 网静态结构元素：库所、迁移与带权流弧.
use std::fmt;

use crate::graph::{Edge, EdgeKey, Extensible, Extensions, Identified};
use crate::net::marking::Weight;

#[derive(Clone)]
pub struct Place {
    id: String,
    pub initial_tokens: Weight,
    extensions: Extensions,
}

impl Place {
    pub fn new(id: impl Into<String>) -> Self {
        Self::with_tokens(id, 0)
    }

    pub fn with_tokens(id: impl Into<String>, initial_tokens: Weight) -> Self {
        Self {
            id: id.into(),
            initial_tokens,
            extensions: Extensions::new(),
        }
    }
}

impl fmt::Debug for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Place")
            .field("id", &self.id)
            .field("initial_tokens", &self.initial_tokens)
            .finish()
    }
}

#[derive(Clone)]
pub struct Transition {
    id: String,
    label: String,
    extensions: Extensions,
}

impl Transition {
    /// A transition labelled with its own id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            extensions: Extensions::new(),
        }
    }

    pub fn with_label(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            extensions: Extensions::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition")
            .field(&self.id)
            .field(&self.label)
            .finish()
    }
}

/// Weighted arc between a place and a transition, in either direction.
#[derive(Clone)]
pub struct Flow {
    key: EdgeKey,
    weight: Weight,
    extensions: Extensions,
}

impl Flow {
    pub(crate) fn new(source: impl Into<String>, target: impl Into<String>, weight: Weight) -> Self {
        Self {
            key: EdgeKey::new(source, target),
            weight,
            extensions: Extensions::new(),
        }
    }

    pub fn weight(&self) -> Weight {
        self.weight
    }

    pub(crate) fn reversed(&self) -> Self {
        Self {
            key: EdgeKey::new(self.key.target.clone(), self.key.source.clone()),
            weight: self.weight,
            extensions: self.extensions.clone_with_policy(),
        }
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("source", &self.key.source)
            .field("target", &self.key.target)
            .field("weight", &self.weight)
            .finish()
    }
}

/// Node of a Petri net graph.
#[derive(Debug, Clone)]
pub enum PnNode {
    Place(Place),
    Transition(Transition),
}

impl PnNode {
    pub fn is_place(&self) -> bool {
        matches!(self, PnNode::Place(_))
    }

    pub fn as_place(&self) -> Option<&Place> {
        match self {
            PnNode::Place(place) => Some(place),
            PnNode::Transition(_) => None,
        }
    }

    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            PnNode::Transition(transition) => Some(transition),
            PnNode::Place(_) => None,
        }
    }

    pub(crate) fn as_place_mut(&mut self) -> Option<&mut Place> {
        match self {
            PnNode::Place(place) => Some(place),
            PnNode::Transition(_) => None,
        }
    }

    pub(crate) fn as_transition_mut(&mut self) -> Option<&mut Transition> {
        match self {
            PnNode::Transition(transition) => Some(transition),
            PnNode::Place(_) => None,
        }
    }
}

macro_rules! impl_identified_extensible {
    ($ty:ty, $id:ident) => {
        impl Identified for $ty {
            fn id(&self) -> &str {
                &self.$id
            }
        }

        impl Extensible for $ty {
            fn extensions(&self) -> &Extensions {
                &self.extensions
            }

            fn extensions_mut(&mut self) -> &mut Extensions {
                &mut self.extensions
            }
        }
    };
}

impl_identified_extensible!(Place, id);
impl_identified_extensible!(Transition, id);

impl Identified for PnNode {
    fn id(&self) -> &str {
        match self {
            PnNode::Place(place) => place.id(),
            PnNode::Transition(transition) => transition.id(),
        }
    }
}

impl Extensible for PnNode {
    fn extensions(&self) -> &Extensions {
        match self {
            PnNode::Place(place) => place.extensions(),
            PnNode::Transition(transition) => transition.extensions(),
        }
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        match self {
            PnNode::Place(place) => place.extensions_mut(),
            PnNode::Transition(transition) => transition.extensions_mut(),
        }
    }
}

impl Extensible for Flow {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl Edge for Flow {
    fn key(&self) -> &EdgeKey {
        &self.key
    }
}
