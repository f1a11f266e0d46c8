//! 索引器：把弧表编译为每个迁移的增量行与守卫集合。
//!
//! 编译失败不短路，所有结构问题一起收集、一起报告。
use indexmap::IndexMap;
use itertools::Itertools;
use thiserror::Error;

use crate::net::definition::PetriNet;
use crate::net::index_vec::Idx;
use crate::net::structure::{DeltaRow, Guard, Place, Transition, Weight};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexIssue {
    #[error("arc {arc}: unknown endpoint {label:?}")]
    UnknownEndpoint { arc: usize, label: String },
    #[error("arc {arc}: connects two {kind}s ({from:?} -> {to:?})")]
    SameKind {
        arc: usize,
        kind: &'static str,
        from: String,
        to: String,
    },
    #[error("arc {arc}: inhibitor must run place -> transition ({from:?} -> {to:?})")]
    BadInhibitor {
        arc: usize,
        from: String,
        to: String,
    },
    #[error("arc {arc}: weight must be positive")]
    ZeroWeight { arc: usize },
    #[error("label {label:?} names both a place and a transition")]
    DuplicateLabel { label: String },
    #[error("place {label:?}: offset {offset} is out of range or duplicated")]
    BadOffset { label: String, offset: u32 },
    #[error("place {label:?}: initial {initial} exceeds capacity {capacity}")]
    InitialExceedsCapacity {
        label: String,
        initial: Weight,
        capacity: Weight,
    },
}

/// 被拒绝的定义连同全部结构问题。
#[derive(Debug, Error)]
#[error("definition rejected: {}", .issues.iter().join("; "))]
pub struct IndexError {
    pub issues: Vec<IndexIssue>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Place,
    Transition,
    Unknown,
}

fn node_kind(
    places: &IndexMap<String, Place>,
    transitions: &IndexMap<String, Transition>,
    label: &str,
) -> NodeKind {
    if transitions.contains_key(label) {
        NodeKind::Transition
    } else if places.contains_key(label) {
        NodeKind::Place
    } else {
        NodeKind::Unknown
    }
}

impl PetriNet {
    /// 标签不得同时命名库所与迁移；偏移必须稠密无重复；
    /// 非零容量下 `initial` 不得超界。
    pub(crate) fn structural_issues(&self) -> Vec<IndexIssue> {
        let mut issues = Vec::new();
        for label in self.places.keys() {
            if self.transitions.contains_key(label) {
                issues.push(IndexIssue::DuplicateLabel {
                    label: label.clone(),
                });
            }
        }
        let mut seen = vec![false; self.places.len()];
        for place in self.places.values() {
            match seen.get_mut(place.offset.index()) {
                Some(slot) if !*slot => *slot = true,
                _ => issues.push(IndexIssue::BadOffset {
                    label: place.label.clone(),
                    offset: place.offset.raw(),
                }),
            }
            if place.capacity > 0 && place.initial > place.capacity {
                issues.push(IndexIssue::InitialExceedsCapacity {
                    label: place.label.clone(),
                    initial: place.initial,
                    capacity: place.capacity,
                });
            }
        }
        issues
    }

    /// 把弧表编译为增量行与守卫。幂等：每次重跑先清零重建。
    /// 任何问题都使定义不可用于发射（`indexed` 保持 false）。
    pub fn index(&mut self) -> Result<(), IndexError> {
        self.indexed = false;
        let place_count = self.places.len();

        for transition in self.transitions.values_mut() {
            transition.delta.clear();
            transition.delta.resize(place_count, 0);
            transition.guards.clear();
        }

        let mut issues = self.structural_issues();

        let places = &self.places;
        let transitions = &mut self.transitions;
        for (pos, arc) in self.arcs.iter().enumerate() {
            if arc.weight == 0 {
                issues.push(IndexIssue::ZeroWeight { arc: pos });
                continue;
            }
            let source = node_kind(places, transitions, &arc.source);
            let target = node_kind(places, transitions, &arc.target);

            if arc.inhibit {
                match (source, target) {
                    (NodeKind::Place, NodeKind::Transition) => {
                        let offset = places[&arc.source].offset;
                        let mut delta = DeltaRow::from_elem(0, place_count);
                        if let Some(entry) = delta.get_mut(offset.index()) {
                            *entry = -(arc.weight as i64);
                        }
                        if let Some(transition) = transitions.get_mut(&arc.target) {
                            transition.guards.insert(
                                arc.source.clone(),
                                Guard {
                                    label: arc.source.clone(),
                                    delta,
                                },
                            );
                        }
                    }
                    (NodeKind::Unknown, _) => issues.push(IndexIssue::UnknownEndpoint {
                        arc: pos,
                        label: arc.source.clone(),
                    }),
                    (_, NodeKind::Unknown) => issues.push(IndexIssue::UnknownEndpoint {
                        arc: pos,
                        label: arc.target.clone(),
                    }),
                    _ => issues.push(IndexIssue::BadInhibitor {
                        arc: pos,
                        from: arc.source.clone(),
                        to: arc.target.clone(),
                    }),
                }
                continue;
            }

            match (source, target) {
                (NodeKind::Transition, NodeKind::Place) => {
                    let offset = places[&arc.target].offset;
                    if let Some(transition) = transitions.get_mut(&arc.source) {
                        if let Some(entry) = transition.delta.get_mut(offset.index()) {
                            *entry = arc.weight as i64;
                        }
                    }
                }
                (NodeKind::Place, NodeKind::Transition) => {
                    let offset = places[&arc.source].offset;
                    if let Some(transition) = transitions.get_mut(&arc.target) {
                        if let Some(entry) = transition.delta.get_mut(offset.index()) {
                            *entry = -(arc.weight as i64);
                        }
                    }
                }
                (NodeKind::Place, NodeKind::Place) => issues.push(IndexIssue::SameKind {
                    arc: pos,
                    kind: "place",
                    from: arc.source.clone(),
                    to: arc.target.clone(),
                }),
                (NodeKind::Transition, NodeKind::Transition) => {
                    issues.push(IndexIssue::SameKind {
                        arc: pos,
                        kind: "transition",
                        from: arc.source.clone(),
                        to: arc.target.clone(),
                    })
                }
                (NodeKind::Unknown, _) => issues.push(IndexIssue::UnknownEndpoint {
                    arc: pos,
                    label: arc.source.clone(),
                }),
                (_, NodeKind::Unknown) => issues.push(IndexIssue::UnknownEndpoint {
                    arc: pos,
                    label: arc.target.clone(),
                }),
            }
        }

        if issues.is_empty() {
            self.indexed = true;
            Ok(())
        } else {
            log::warn!("=== 网 {} 结构诊断 ===", self.schema);
            for issue in &issues {
                log::warn!("  - {issue}");
            }
            log::warn!("共 {} 个问题，定义被拒绝", issues.len());
            Err(IndexError { issues })
        }
    }
}
