//! Petri 网与带标签迁移系统的覆盖性分析。
//!
//! * [`net`]：库所/迁移网、标记与发射语义；
//! * [`lts`]：带标签迁移系统与 Parikh 向量；
//! * [`analysis`]：Karp–Miller 覆盖图、有界性与最短环。

pub mod analysis;
pub mod config;
pub mod graph;
pub mod lts;
pub mod net;
pub mod options;
