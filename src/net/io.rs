//! I/O 支持：JSON、RON 序列化接口与 Petri 网文档格式.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::graph::{Edge, ExtensionPolicy, Extensible, Extensions, GraphError, Identified};
use crate::net::core::PetriNet;
use crate::net::marking::Weight;
use crate::net::structure::{Place, Transition};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid document: {0}")]
    Structure(#[from] GraphError),
    #[error("unsupported document extension `{0}`, expected .json or .ron")]
    UnknownFormat(String),
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_json_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    from_json_str(&read_to_string(path)?)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(ron::ser::to_string_pretty(value, PrettyConfig::default())?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_ron_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_ron<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    from_ron_str(&read_to_string(path)?)
}

/// Reads a JSON or RON document, picking the format from the file extension.
pub fn read_document<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => read_json(path),
        Some("ron") => read_ron(path),
        other => Err(IoError::UnknownFormat(other.unwrap_or_default().to_owned())),
    }
}

fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    Ok(content)
}

/// Persisted extensions rendered as text: strings verbatim, anything else
/// through its `Debug` form.
pub(crate) fn export_extensions(extensions: &Extensions) -> BTreeMap<String, String> {
    extensions
        .persistent()
        .map(|(key, value)| {
            let text = match value.as_any().downcast_ref::<String>() {
                Some(text) => text.clone(),
                None => format!("{value:?}"),
            };
            (key.to_owned(), text)
        })
        .collect()
}

pub(crate) fn import_extensions(target: &mut Extensions, exported: &BTreeMap<String, String>) {
    for (key, value) in exported {
        target.put(key.as_str(), value.clone(), ExtensionPolicy::Persist);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaceDoc {
    pub id: String,
    #[serde(default)]
    pub tokens: Weight,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionDoc {
    pub id: String,
    /// Defaults to the id when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowDoc {
    pub from: String,
    pub to: String,
    #[serde(default = "default_weight")]
    pub weight: Weight,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

fn default_weight() -> Weight {
    1
}

/// Serializable form of a [`PetriNet`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NetDocument {
    pub name: String,
    #[serde(default)]
    pub places: Vec<PlaceDoc>,
    #[serde(default)]
    pub transitions: Vec<TransitionDoc>,
    #[serde(default)]
    pub flows: Vec<FlowDoc>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl NetDocument {
    pub fn from_net(net: &PetriNet) -> Self {
        Self {
            name: net.name().to_owned(),
            places: net
                .places()
                .map(|place| PlaceDoc {
                    id: place.id().to_owned(),
                    tokens: place.initial_tokens,
                    extensions: export_extensions(place.extensions()),
                })
                .collect(),
            transitions: net
                .transitions()
                .map(|transition| TransitionDoc {
                    id: transition.id().to_owned(),
                    label: (transition.label() != transition.id())
                        .then(|| transition.label().to_owned()),
                    extensions: export_extensions(transition.extensions()),
                })
                .collect(),
            flows: net
                .flows()
                .map(|flow| FlowDoc {
                    from: flow.source().to_owned(),
                    to: flow.target().to_owned(),
                    weight: flow.weight(),
                    extensions: export_extensions(flow.extensions()),
                })
                .collect(),
            extensions: export_extensions(net.extensions()),
        }
    }

    /// Builds the net through the regular creation API, so a document
    /// describing an illegal net is rejected with the same [`GraphError`].
    pub fn to_net(&self) -> Result<PetriNet, GraphError> {
        let mut net = PetriNet::new(self.name.as_str());
        import_extensions(net.extensions_mut(), &self.extensions);
        for doc in &self.places {
            let mut place = Place::with_tokens(doc.id.as_str(), doc.tokens);
            import_extensions(place.extensions_mut(), &doc.extensions);
            net.add_place(place)?;
        }
        for doc in &self.transitions {
            let mut transition = match &doc.label {
                Some(label) => Transition::with_label(doc.id.as_str(), label.as_str()),
                None => Transition::new(doc.id.as_str()),
            };
            import_extensions(transition.extensions_mut(), &doc.extensions);
            net.add_transition(transition)?;
        }
        for doc in &self.flows {
            let flow = net.create_flow(&doc.from, &doc.to, doc.weight)?;
            import_extensions(flow.extensions_mut(), &doc.extensions);
        }
        Ok(net)
    }
}

pub fn read_net<P: AsRef<Path>>(path: P) -> Result<PetriNet, IoError> {
    let document: NetDocument = read_document(path)?;
    Ok(document.to_net()?)
}

pub fn write_net_json<P: AsRef<Path>>(path: P, net: &PetriNet) -> Result<(), IoError> {
    write_json(path, &NetDocument::from_net(net))
}
