//! 迁移系统文档格式（JSON/RON）.
use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::graph::{Edge, Extensible, GraphError, Identified};
use crate::lts::core::TransitionSystem;
use crate::net::io::{IoError, export_extensions, import_extensions, read_document};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateDoc {
    pub id: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArcDoc {
    pub from: String,
    pub to: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

/// Serializable form of a [`TransitionSystem`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TsDocument {
    pub name: String,
    #[serde(default)]
    pub states: Vec<StateDoc>,
    #[serde(default)]
    pub arcs: Vec<ArcDoc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl TsDocument {
    pub fn from_ts(ts: &TransitionSystem) -> Self {
        Self {
            name: ts.name().to_owned(),
            states: ts
                .states()
                .map(|state| StateDoc {
                    id: state.id().to_owned(),
                    extensions: export_extensions(state.extensions()),
                })
                .collect(),
            arcs: ts
                .arcs()
                .map(|arc| ArcDoc {
                    from: arc.source().to_owned(),
                    to: arc.target().to_owned(),
                    label: arc.label().to_owned(),
                    extensions: export_extensions(arc.extensions()),
                })
                .collect(),
            initial: ts.initial_state().map(|state| state.id().to_owned()),
            extensions: export_extensions(ts.extensions()),
        }
    }

    pub fn to_ts(&self) -> Result<TransitionSystem, GraphError> {
        let mut ts = TransitionSystem::new(self.name.as_str());
        import_extensions(ts.extensions_mut(), &self.extensions);
        for doc in &self.states {
            let state = ts.create_state(Some(doc.id.as_str()))?;
            import_extensions(state.extensions_mut(), &doc.extensions);
        }
        for doc in &self.arcs {
            let arc = ts.create_arc(&doc.from, &doc.to, &doc.label)?;
            import_extensions(arc.extensions_mut(), &doc.extensions);
        }
        if let Some(initial) = &self.initial {
            ts.set_initial_state(initial)?;
        }
        Ok(ts)
    }
}

pub fn read_ts<P: AsRef<Path>>(path: P) -> Result<TransitionSystem, IoError> {
    let document: TsDocument = read_document(path)?;
    Ok(document.to_ts()?)
}
