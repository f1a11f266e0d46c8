//! # P/T 网核心（Place/Transition Net）
//!
//! 库所集合 `P` 按声明顺序取得稠密偏移 `0..|P|-1`，标识是向量
//! `M ∈ ℕ^{|P|}`。索引阶段把弧表编译成每个迁移 `t` 的增量行
//! `Δ_t ∈ ℤ^{|P|}`（正分量产出、负分量消耗）与守卫集合 `{(p, w)}`。
//! 对倍数 `k ≥ 1`：
//!
//! * 守卫规则：存在 `(p, w)` 使 `M[p] ≥ k·w` 时迁移被抑制；
//! * 候选结果 `out = M + k·Δ_t`；
//! * `petriNet` 模式：各分量非负且不超容量（0 视为无界）即接受；
//! * `stateMachine` 模式：额外要求 `out` 至多一个正分量且无分量大于 1；
//! * `workflow` 模式：先把负分量截为 0，再按同样的基数规则裁决。
//!
//! 构建路径有两条：声明式 DSL（[`PetriNet::declare`]）和数据式声明
//! （[`io::Declaration`]）。两条路径都要经过 [`PetriNet::index`] 才能发射。
//!
//! ## 示例
//!
//! ```rust
//! use pnflow::net::*;
//!
//! let mut net = PetriNet::declare("demo", NetMode::PetriNet, |b| {
//!     let role = b.role("default");
//!     let p0 = b.place("p0", 1, 0, Position::new(0, 0));
//!     let p1 = b.place("p1", 0, 0, Position::new(100, 0));
//!     let t0 = b.transition("t0", &role, Position::new(50, 0));
//!     p0.tx(b, 1, &t0);
//!     t0.tx(b, 1, &p1);
//! });
//! net.index().unwrap();
//!
//! let mut marking = net.initial_marking();
//! let outcome = net.fire(&mut marking, "t0", 1).unwrap();
//! assert!(outcome.ok);
//! assert_eq!(marking.as_slice(), &[0, 1]);
//! ```

pub mod definition;
pub mod dot;
pub mod firing;
pub mod ids;
pub mod index_vec;
pub mod indexer;
pub mod io;
pub mod structure;
pub mod vector;

pub use definition::{NODE_PROXIMITY, NetBuilder, NodeRef, PetriNet, PlaceRef, TransRef};
pub use firing::{FireOutcome, ModelError};
pub use ids::PlaceId;
pub use index_vec::{Idx, IndexVec};
pub use indexer::{IndexError, IndexIssue};
pub use io::{Declaration, IoError, PlaceSpec, TransitionSpec};
pub use structure::{
    Arc, DEFAULT_ROLE, DeltaRow, Guard, Marking, NetMode, Place, Position, Role, Transition,
    Weight,
};
pub use vector::{AddOutcome, vector_add};
