//! 网定义：标签键控的库所/迁移/弧注册表与声明式构建 DSL。
//!
//! 连接调用只追加 [`Arc`] 记录；编译成增量行/守卫是索引器的职责。
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::net::ids::PlaceId;
use crate::net::index_vec::{Idx, IndexVec};
use crate::net::structure::{Arc, Marking, NetMode, Place, Position, Role, Transition, Weight};

/// UI 命中测试的接近半径（画布坐标）。
pub const NODE_PROXIMITY: f64 = 36.0;

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PetriNet {
    pub schema: String,
    #[serde(rename = "type", default)]
    pub mode: NetMode,
    pub places: IndexMap<String, Place>,
    pub transitions: IndexMap<String, Transition>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
    #[serde(default)]
    pub roles: IndexMap<String, Role>,
    /// 反序列化完整网对象时为 true：增量/守卫已经是编译好的。
    #[serde(default)]
    pub indexed: bool,
}

impl fmt::Debug for PetriNet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PetriNet")
            .field("schema", &self.schema)
            .field("mode", &self.mode)
            .field("places", &self.places)
            .field("transitions", &self.transitions)
            .field("arcs", &self.arcs)
            .field("indexed", &self.indexed)
            .finish()
    }
}

impl PetriNet {
    pub fn empty(schema: impl Into<String>, mode: NetMode) -> Self {
        Self {
            schema: schema.into(),
            mode,
            places: IndexMap::new(),
            transitions: IndexMap::new(),
            arcs: Vec::new(),
            roles: IndexMap::new(),
            indexed: false,
        }
    }

    /// 通过回调驱动的 DSL 声明一个网；索引仍须另行调用。
    pub fn declare(
        schema: impl Into<String>,
        mode: NetMode,
        build: impl FnOnce(&mut NetBuilder<'_>),
    ) -> Self {
        let mut net = Self::empty(schema, mode);
        let mut builder = NetBuilder { net: &mut net };
        build(&mut builder);
        net
    }

    /// 幂等：同名角色返回已有对象。
    pub fn role(&mut self, label: impl Into<String>) -> Role {
        let label = label.into();
        self.roles
            .entry(label.clone())
            .or_insert_with(|| Role::new(label))
            .clone()
    }

    pub fn place(&self, label: &str) -> Option<&Place> {
        self.places.get(label)
    }

    pub fn transition(&self, label: &str) -> Option<&Transition> {
        self.transitions.get(label)
    }

    pub fn place_count(&self) -> usize {
        self.places.len()
    }

    /// 初始标识：每个库所的 `initial`，落在它自己的偏移上。
    pub fn initial_marking(&self) -> Marking {
        let mut tokens = vec![0; self.places.len()];
        for place in self.places.values() {
            if let Some(slot) = tokens.get_mut(place.offset.index()) {
                *slot = place.initial;
            }
        }
        Marking::from(tokens)
    }

    /// 容量向量；分量为 0 的库所无上界。
    pub fn capacity_vector(&self) -> IndexVec<PlaceId, Weight> {
        let mut bounds = vec![0; self.places.len()];
        for place in self.places.values() {
            if let Some(slot) = bounds.get_mut(place.offset.index()) {
                *slot = place.capacity;
            }
        }
        IndexVec::from_vec(bounds)
    }

    /// 渲染器用的零向量，长度等于库所数。
    pub fn empty_vector(&self) -> Marking {
        Marking::zeros(self.places.len())
    }

    /// 距 `(x, y)` 最近且在 [`NODE_PROXIMITY`] 半径内的节点。
    pub fn node_at(&self, x: i64, y: i64) -> Option<NodeRef<'_>> {
        let mut best: Option<(f64, NodeRef<'_>)> = None;
        let nodes = self
            .places
            .values()
            .map(NodeRef::Place)
            .chain(self.transitions.values().map(NodeRef::Transition));
        for node in nodes {
            let position = node.position();
            let dx = (position.x - x) as f64;
            let dy = (position.y - y) as f64;
            let distance = (dx * dx + dy * dy).sqrt();
            if best.as_ref().map_or(true, |(nearest, _)| distance < *nearest) {
                best = Some((distance, node));
            }
        }
        best.and_then(|(distance, node)| (distance <= NODE_PROXIMITY).then_some(node))
    }
}

/// 命中测试结果：库所或迁移的只读引用。
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Place(&'a Place),
    Transition(&'a Transition),
}

impl NodeRef<'_> {
    pub fn label(&self) -> &str {
        match self {
            NodeRef::Place(place) => &place.label,
            NodeRef::Transition(transition) => &transition.label,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            NodeRef::Place(place) => place.position,
            NodeRef::Transition(transition) => transition.position,
        }
    }

    pub fn is_place(&self) -> bool {
        matches!(self, NodeRef::Place(_))
    }
}

/// 声明回调收到的构建器。
pub struct NetBuilder<'a> {
    net: &'a mut PetriNet,
}

impl NetBuilder<'_> {
    /// 注册库所并分配下一个偏移。重复标签是断言层错误。
    pub fn place(
        &mut self,
        label: impl Into<String>,
        initial: Weight,
        capacity: Weight,
        position: Position,
    ) -> PlaceRef {
        let label = label.into();
        assert!(
            !self.net.places.contains_key(&label) && !self.net.transitions.contains_key(&label),
            "duplicate node label {label:?}"
        );
        let offset = PlaceId::new(self.net.places.len() as u32);
        self.net.places.insert(
            label.clone(),
            Place::new(label.clone(), offset, initial, capacity, position),
        );
        self.net.indexed = false;
        PlaceRef { label }
    }

    pub fn transition(
        &mut self,
        label: impl Into<String>,
        role: &Role,
        position: Position,
    ) -> TransRef {
        let label = label.into();
        assert!(
            !self.net.places.contains_key(&label) && !self.net.transitions.contains_key(&label),
            "duplicate node label {label:?}"
        );
        self.net.role(role.label.clone());
        self.net.transitions.insert(
            label.clone(),
            Transition::new(label.clone(), role.clone(), position),
        );
        self.net.indexed = false;
        TransRef { label }
    }

    /// 幂等声明角色。
    pub fn role(&mut self, label: impl Into<String>) -> Role {
        self.net.role(label)
    }

    fn connect(&mut self, source: String, target: String, weight: Weight, inhibit: bool) {
        assert!(
            weight > 0,
            "arc weight must be positive: {source:?} -> {target:?}"
        );
        self.net.arcs.push(Arc::new(source, target, weight, inhibit));
        self.net.indexed = false;
    }
}

/// 库所句柄；连接方法的参数类型保证端点种类正确。
#[derive(Debug, Clone)]
pub struct PlaceRef {
    label: String,
}

impl PlaceRef {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 输入弧：库所 → 迁移（消耗）。
    pub fn tx(&self, b: &mut NetBuilder<'_>, weight: Weight, target: &TransRef) {
        b.connect(self.label.clone(), target.label.clone(), weight, false);
    }

    /// 抑制弧：库所持有至少 `weight` 个令牌时封锁迁移。
    pub fn guard(&self, b: &mut NetBuilder<'_>, weight: Weight, target: &TransRef) {
        b.connect(self.label.clone(), target.label.clone(), weight, true);
    }
}

/// 迁移句柄。
#[derive(Debug, Clone)]
pub struct TransRef {
    label: String,
}

impl TransRef {
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 输出弧：迁移 → 库所（产出）。
    pub fn tx(&self, b: &mut NetBuilder<'_>, weight: Weight, target: &PlaceRef) {
        b.connect(self.label.clone(), target.label.clone(), weight, false);
    }
}
