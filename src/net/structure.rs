//! P/T 网静态结构元素：库所、迁移、弧、角色与标识。
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::net::ids::PlaceId;
use crate::net::index_vec::IndexVec;

pub type Weight = u64;

/// 每个迁移的令牌增量行，按库所偏移索引；正值产出、负值消耗。
pub type DeltaRow = SmallVec<[i64; 4]>;

/// 未显式声明角色的迁移挂在这个角色下。
pub const DEFAULT_ROLE: &str = "default";

/// 布局元数据，对发生语义没有影响。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// 发生规则模式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetMode {
    #[default]
    #[serde(rename = "petriNet")]
    PetriNet,
    #[serde(rename = "workflow")]
    Workflow,
    #[serde(rename = "stateMachine")]
    StateMachine,
}

impl fmt::Display for NetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NetMode::PetriNet => "petriNet",
            NetMode::Workflow => "workflow",
            NetMode::StateMachine => "stateMachine",
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Place {
    pub label: String,
    pub offset: PlaceId,
    pub initial: Weight,
    /// 0 表示无上界。
    pub capacity: Weight,
    pub position: Position,
}

impl Place {
    pub fn new(
        label: impl Into<String>,
        offset: PlaceId,
        initial: Weight,
        capacity: Weight,
        position: Position,
    ) -> Self {
        Self {
            label: label.into(),
            offset,
            initial,
            capacity,
            position,
        }
    }

    pub fn unbounded(&self) -> bool {
        self.capacity == 0
    }
}

/// 抑制弧编译结果：`delta` 在守卫库所偏移处持有 `-weight`。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Guard {
    pub label: String,
    pub delta: DeltaRow,
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transition {
    pub label: String,
    pub role: Role,
    pub position: Position,
    /// 由索引器填充；长度等于库所数。
    pub delta: DeltaRow,
    /// 以抑制库所标签为键。
    pub guards: IndexMap<String, Guard>,
}

impl Transition {
    pub fn new(label: impl Into<String>, role: Role, position: Position) -> Self {
        Self {
            label: label.into(),
            role,
            position,
            delta: DeltaRow::new(),
            guards: IndexMap::new(),
        }
    }
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Transition").field(&self.label).finish()
    }
}

/// 访问控制分桶标签，引擎本身不作校验。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
    pub label: String,
}

impl Role {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Self::new(DEFAULT_ROLE)
    }
}

/// 弧以节点标签记录端点，端点解析推迟到索引阶段，
/// 这样结构错误的弧也能被完整表示并报告。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Arc {
    pub source: String,
    pub target: String,
    pub weight: Weight,
    #[serde(default)]
    pub inhibit: bool,
}

impl Arc {
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        weight: Weight,
        inhibit: bool,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            weight,
            inhibit,
        }
    }
}

/// 标识：长度等于库所数的令牌计数向量，按偏移索引。
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Marking(pub IndexVec<PlaceId, Weight>);

impl Marking {
    pub fn new(initial: IndexVec<PlaceId, Weight>) -> Self {
        Self(initial)
    }

    pub fn zeros(count: usize) -> Self {
        Self(IndexVec::from_elem(0, count))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlaceId, &Weight)> {
        self.0.iter_enumerated()
    }

    pub fn tokens(&self, place: PlaceId) -> Weight {
        self.0[place]
    }

    pub fn tokens_mut(&mut self, place: PlaceId) -> &mut Weight {
        &mut self.0[place]
    }

    pub fn as_slice(&self) -> &[Weight] {
        self.0.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [Weight] {
        self.0.as_mut_slice()
    }
}

impl fmt::Debug for Marking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (place, tokens) in self.iter() {
            map.entry(&place, tokens);
        }
        map.finish()
    }
}

impl From<Vec<Weight>> for Marking {
    fn from(value: Vec<Weight>) -> Self {
        Self(IndexVec::from_vec(value))
    }
}
