//! # 分析
//!
//! * [`coverability`]：Karp–Miller 覆盖图构造，ω 加速与可构造的无界见证；
//! * [`boundness`]：基于覆盖图的有界性判定；
//! * [`cycles`]：迁移系统上的最短环与 Parikh 向量比较。
//!
//! 主循环在每次迭代时轮询 `cancel_this` 的取消信号。

pub mod boundness;
pub mod coverability;
pub mod cycles;

use cancel_this::Cancelled;
use thiserror::Error;

use crate::graph::GraphError;
use crate::net::FireError;

pub use boundness::{
    BoundnessResult, PlaceBound, check_bounded, check_bounded_with, check_place_bounded,
    check_place_bounded_with,
};
pub use coverability::{CoverEdge, CoverNode, CoverNodeId, CoverabilityGraph, NodeStatus, UnboundedWitness};
pub use cycles::{Cycle, SmallestCycles, compute_smallest_cycles};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("net is unbounded: {0}")]
    Unbounded(Box<UnboundedWitness>),
    #[error("analysis cancelled: {0}")]
    Cancelled(Cancelled),
    #[error("state limit of {limit} nodes exceeded")]
    StateLimitExceeded { limit: usize },
    #[error("transition system has no initial state")]
    NoInitialState,
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Fire(#[from] FireError),
}

impl From<Cancelled> for AnalysisError {
    fn from(value: Cancelled) -> Self {
        AnalysisError::Cancelled(value)
    }
}
