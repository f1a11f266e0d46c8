//! pnflow：声明式 P/T 网引擎与标识流运行时。
//!
//! 流水线是 定义（库所 / 迁移 / 弧）→ 索引（增量行 + 守卫）→
//! 发射（petriNet / workflow / stateMachine 三种模式）→ 标识流
//! （序号、历史、单槽观察者）。
//!
//! See [`net`] for the core model and [`stream`] for the runtime.

pub mod net;
pub mod options;
pub mod stream;

pub use net::{
    Declaration, FireOutcome, IndexError, Marking, NetMode, PetriNet, PlaceId, Position, Weight,
};
pub use stream::{DispatchEvent, DispatchRequest, HistoryEntry, MarkingStream, StreamError};
