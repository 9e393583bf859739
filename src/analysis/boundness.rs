//! Petri网有界性分析
//!
//! 基于覆盖图判定：网有界当且仅当覆盖图中不出现 ω。
//! 无界时返回可构造的见证（前缀 + 可重复的环）。

use std::fmt;

use crate::analysis::AnalysisError;
use crate::analysis::coverability::{CoverabilityGraph, UnboundedWitness};
use crate::config::AnalysisConfig;
use crate::net::PetriNet;
use crate::net::ids::PlaceId;
use crate::net::marking::Token;

/// 有界性检查结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoundnessResult {
    /// 网是有界的，`bound` 为所有库所中的最大 token 数
    Bounded { bound: u64 },
    /// 网是无界的
    Unbounded {
        /// 出现 ω 的库所
        unbounded_places: Vec<PlaceId>,
        /// 第一个被发现的无界见证
        witness: Box<UnboundedWitness>,
    },
}

impl BoundnessResult {
    pub fn is_bounded(&self) -> bool {
        matches!(self, BoundnessResult::Bounded { .. })
    }
}

impl fmt::Display for BoundnessResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundnessResult::Bounded { bound } => write!(f, "bounded ({bound}-bounded)"),
            BoundnessResult::Unbounded {
                unbounded_places,
                witness,
            } => write!(
                f,
                "unbounded, places {:?}; witness: {}",
                unbounded_places, witness
            ),
        }
    }
}

/// 单个库所的界
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceBound {
    Bounded(u64),
    /// 若该库所本身在 ω 首次出现时增长，则附带见证
    Unbounded(Option<Box<UnboundedWitness>>),
}

pub fn check_bounded(net: &PetriNet) -> Result<BoundnessResult, AnalysisError> {
    check_bounded_with(net, &AnalysisConfig::default())
}

pub fn check_bounded_with(
    net: &PetriNet,
    config: &AnalysisConfig,
) -> Result<BoundnessResult, AnalysisError> {
    let graph = CoverabilityGraph::with_config(net, config)?;
    Ok(boundness_of(&graph))
}

/// 在已构造的覆盖图上判定有界性
pub fn boundness_of(graph: &CoverabilityGraph) -> BoundnessResult {
    match graph.witnesses().first() {
        Some(witness) => BoundnessResult::Unbounded {
            unbounded_places: graph.unbounded_places(),
            witness: Box::new(witness.clone()),
        },
        None => {
            let bound = graph
                .nodes()
                .flat_map(|(_, node)| node.marking.iter().map(|(_, tokens)| tokens))
                .filter_map(Token::finite)
                .max()
                .unwrap_or(0);
            BoundnessResult::Bounded { bound }
        }
    }
}

pub fn check_place_bounded(net: &PetriNet, place: &str) -> Result<PlaceBound, AnalysisError> {
    check_place_bounded_with(net, place, &AnalysisConfig::default())
}

pub fn check_place_bounded_with(
    net: &PetriNet,
    place: &str,
    config: &AnalysisConfig,
) -> Result<PlaceBound, AnalysisError> {
    let place = net.place_index(place)?;
    let graph = CoverabilityGraph::with_config(net, config)?;
    Ok(match graph.place_bound(place) {
        Token::Finite(bound) => PlaceBound::Bounded(bound),
        Token::Omega => {
            PlaceBound::Unbounded(graph.witness_for(place).cloned().map(Box::new))
        }
    })
}
