//! # Petri 网核心定义（Place/Transition Net）
//!
//! 设库所集合 `P` 与迁移集合 `T`，输入/输出权重 `Pre, Post ∈ ℕ^{|P|×|T|}`，
//! 迁移效应 `C = Post - Pre`。对任意标识 `M ∈ (ℕ ∪ {ω})^{|P|}`：
//!
//! * 迁移 `t` **可发生** 当且仅当 `∀p ∈ P: M[p] ≥ Pre[p, t]`；
//! * 发生后 `M' = M - Pre[:, t] + Post[:, t]`，`ω` 加减任意有限值仍为 `ω`；
//! * **反向发生** 要求 `M ≥ Post[:, t]`，结果为 `M - Post[:, t] + Pre[:, t]`。
//!
//! 同时出现在前集与后集中的库所（旁路条件）按两侧权重分别结算。
//! 网结构存放在 [`crate::graph::Graph`] 中，库所与迁移共享同一标识空间；
//! 标识是按库所插入顺序排列的稠密向量。
//!
//! ## 示例
//!
//! ```rust
//! use petri_lts::net::*;
//!
//! let mut net = PetriNet::new("handshake");
//! net.add_place(Place::with_tokens("p0", 1)).unwrap();
//! net.create_place("p1").unwrap();
//! let t0 = net.create_transition("t0").unwrap();
//! net.create_flow("p0", "t0", 1).unwrap();
//! net.create_flow("t0", "p1", 1).unwrap();
//!
//! let marking = net.initial_marking();
//! assert_eq!(net.enabled_transitions(&marking), vec![t0]);
//! let next = net.fire(&marking, t0).unwrap();
//! assert_eq!(net.tokens(&next, "p0").unwrap(), Token::ZERO);
//! assert_eq!(net.tokens(&next, "p1").unwrap(), Token::Finite(1));
//! assert_eq!(net.reverse_fire(&next, "t0").unwrap(), marking);
//! ```

pub mod core;
pub mod generators;
pub mod ids;
pub mod incidence;
pub mod index_vec;
pub mod io;
pub mod marking;
pub mod structure;

pub use self::core::{FireError, PetriNet, TransitionRef};
pub use ids::{PlaceId, TransitionId};
pub use incidence::{Incidence, StepFault, TransitionArcs};
pub use index_vec::{Idx, IndexVec};
pub use marking::{Marking, Token, Weight};
pub use structure::{Flow, Place, PnNode, Transition};
