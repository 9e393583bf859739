//! # 图核心
//!
//! 以字符串标识为键的有向图抽象，节点与边都只通过标识相互引用：
//! 边仅保存 `(source, target, label?)`，解析端点时回到所属图的节点表查询，
//! 因此图本身是唯一的数据来源，克隆与序列化都不会遇到引用环。
//!
//! 节点/边的能力以小 trait 组合表达（[`Identified`]、[`Extensible`]、
//! [`Edge`]），Petri 网与迁移系统分别以具体类型实现它们。

pub mod core;
pub mod extension;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::core::Graph;
pub use extension::{ExtensionPolicy, ExtensionValue, Extensible, Extensions};

/// Identifies an edge inside its graph. Flows leave `label` empty, so a net
/// holds at most one flow per ordered pair; labelled arcs may run in parallel.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeKey {
    pub source: String,
    pub target: String,
    pub label: Option<String>,
}

impl EdgeKey {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: None,
        }
    }

    pub fn labelled(
        source: impl Into<String>,
        target: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            label: Some(label.into()),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} -[{}]-> {}", self.source, label, self.target),
            None => write!(f, "{} -> {}", self.source, self.target),
        }
    }
}

pub trait Identified {
    fn id(&self) -> &str;
}

/// Blanket capability set required of graph nodes.
pub trait Node: Identified + Extensible + Clone {}

impl<T> Node for T where T: Identified + Extensible + Clone {}

pub trait Edge: Extensible + Clone {
    fn key(&self) -> &EdgeKey;

    fn source(&self) -> &str {
        &self.key().source
    }

    fn target(&self) -> &str {
        &self.key().target
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node `{0}` already exists")]
    DuplicateNode(String),
    #[error("node `{0}` does not exist")]
    NodeNotFound(String),
    #[error("edge `{0}` already exists")]
    DuplicateEdge(EdgeKey),
    #[error("edge `{0}` does not exist")]
    EdgeNotFound(EdgeKey),
    #[error("illegal flow `{from}` -> `{to}`: flows must connect a place and a transition")]
    IllegalFlow { from: String, to: String },
    #[error("flow `{from}` -> `{to}` has weight {weight}, expected at least 1")]
    InvalidWeight { from: String, to: String, weight: u64 },
    #[error("node `{0}` is not a place")]
    NotAPlace(String),
    #[error("node `{0}` is not a transition")]
    NotATransition(String),
}
