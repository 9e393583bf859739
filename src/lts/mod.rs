//! # 带标签迁移系统（LTS）
//!
//! 状态与带标签弧存放在 [`crate::graph::Graph`] 中；弧的键包含标签，
//! 因而同一对状态之间可以存在多条标签不同的弧。至多一个初始状态，
//! 由 [`TransitionSystem::set_initial_state`] 维护，状态上的初始标志与之保持一致。
//!
//! 覆盖图/可达图以本模块的类型输出，环与 Parikh 向量分析也在其上进行。

pub mod core;
pub mod io;
pub mod parikh;
pub mod structure;

pub use self::core::TransitionSystem;
pub use io::TsDocument;
pub use parikh::ParikhVector;
pub use structure::{Arc, State};
