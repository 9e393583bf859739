use std::fmt;

use crate::graph::{Edge, EdgeKey, Extensible, Extensions, Identified};

#[derive(Clone)]
pub struct State {
    id: String,
    initial: bool,
    extensions: Extensions,
}

impl State {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            initial: false,
            extensions: Extensions::new(),
        }
    }

    /// Maintained by [`super::TransitionSystem::set_initial_state`].
    pub fn is_initial(&self) -> bool {
        self.initial
    }

    pub(crate) fn set_initial(&mut self, initial: bool) {
        self.initial = initial;
    }
}

impl fmt::Debug for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.initial {
            write!(f, "State({}, initial)", self.id)
        } else {
            write!(f, "State({})", self.id)
        }
    }
}

impl Identified for State {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Extensible for State {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

/// Labelled arc. The label is part of the key, so two states may be joined
/// by several arcs as long as their labels differ.
#[derive(Clone)]
pub struct Arc {
    key: EdgeKey,
    extensions: Extensions,
}

impl Arc {
    pub(crate) fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            key: EdgeKey::labelled(source, target, label),
            extensions: Extensions::new(),
        }
    }

    pub fn label(&self) -> &str {
        self.key.label.as_deref().unwrap_or_default()
    }
}

impl fmt::Debug for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Arc({})", self.key)
    }
}

impl Extensible for Arc {
    fn extensions(&self) -> &Extensions {
        &self.extensions
    }

    fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.extensions
    }
}

impl Edge for Arc {
    fn key(&self) -> &EdgeKey {
        &self.key
    }
}
