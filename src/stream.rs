//! Marking stream: a registry of indexed nets plus their live markings.
//!
//! Every accepted dispatch appends to an in-memory history with a
//! monotonically increasing sequence number. Observers are single-slot
//! callbacks, registering a second one replaces the first.
use std::fmt;
use std::time::SystemTime;

use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::net::definition::PetriNet;
use crate::net::firing::ModelError;
use crate::net::indexer::IndexError;
use crate::net::structure::{DeltaRow, Marking, Role, Weight};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("no net registered under schema {0:?}")]
    UnknownSchema(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("net {schema:?} rejected at registration: {source}")]
    Rejected {
        schema: String,
        #[source]
        source: IndexError,
    },
}

/// 发射请求：目标网、动作标签、倍数。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DispatchRequest {
    pub schema: String,
    pub action: String,
    pub multiplier: Weight,
}

impl DispatchRequest {
    pub fn new(schema: impl Into<String>, action: impl Into<String>, multiplier: Weight) -> Self {
        Self {
            schema: schema.into(),
            action: action.into(),
            multiplier,
        }
    }
}

/// What observers see. `out` is the candidate vector (also present on
/// refusals), `marking` is only filled in after a committed firing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchEvent {
    pub schema: String,
    pub action: String,
    pub multiplier: Weight,
    pub role: Role,
    pub ok: bool,
    pub out: Option<DeltaRow>,
    pub marking: Option<Marking>,
}

/// 历史条目：序号从 0 起，仅记录被接受的发射。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub seq: u64,
    pub schema: String,
    pub action: String,
    pub multiplier: Weight,
    pub marking: Marking,
    pub timestamp: SystemTime,
}

pub type EventHandler = dyn FnMut(&DispatchEvent);
pub type ReloadHandler = dyn FnMut(&str);

#[derive(Default)]
pub struct MarkingStream {
    nets: IndexMap<String, PetriNet>,
    markings: IndexMap<String, Marking>,
    seq: u64,
    history: Vec<HistoryEntry>,
    on_action: IndexMap<String, Box<EventHandler>>,
    on_every: Option<Box<EventHandler>>,
    on_fail: Option<Box<EventHandler>>,
    on_reload: Option<Box<ReloadHandler>>,
}

impl fmt::Debug for MarkingStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkingStream")
            .field("nets", &self.nets.keys().collect::<Vec<_>>())
            .field("seq", &self.seq)
            .field("history", &self.history.len())
            .finish()
    }
}

impl MarkingStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一张网。未索引的网先过索引；预索引对象只做形状与结构校验，
    /// 不重算增量行。同名重注册会丢弃旧网的当前标识。
    pub fn register(&mut self, mut net: PetriNet) -> Result<(), StreamError> {
        if net.indexed {
            let expected = net.place_count();
            for transition in net.transitions.values() {
                if transition.delta.len() != expected {
                    return Err(StreamError::Model(ModelError::ShapeMismatch {
                        expected,
                        found: transition.delta.len(),
                    }));
                }
                for guard in transition.guards.values() {
                    if guard.delta.len() != expected {
                        return Err(StreamError::Model(ModelError::ShapeMismatch {
                            expected,
                            found: guard.delta.len(),
                        }));
                    }
                }
            }
            let issues = net.structural_issues();
            if !issues.is_empty() {
                return Err(StreamError::Rejected {
                    schema: net.schema.clone(),
                    source: IndexError { issues },
                });
            }
        } else {
            net.index().map_err(|source| StreamError::Rejected {
                schema: net.schema.clone(),
                source,
            })?;
        }
        let schema = net.schema.clone();
        debug!(
            "注册网 {}：{} 库所 / {} 迁移",
            schema,
            net.place_count(),
            net.transitions.len()
        );
        self.markings.shift_remove(&schema);
        self.nets.insert(schema, net);
        Ok(())
    }

    /// Fire one action against the named net's current marking.
    ///
    /// Refusals (`ok == false`) are normal outcomes: the marking stays put,
    /// nothing is appended to history and only the failure observer runs.
    /// Unknown schemas or actions are fatal errors instead.
    pub fn dispatch(&mut self, request: DispatchRequest) -> Result<DispatchEvent, StreamError> {
        let DispatchRequest {
            schema,
            action,
            multiplier,
        } = request;
        let net = self
            .nets
            .get(&schema)
            .ok_or_else(|| StreamError::UnknownSchema(schema.clone()))?;
        let marking = self
            .markings
            .entry(schema.clone())
            .or_insert_with(|| net.initial_marking());
        let outcome = net.fire(marking, &action, multiplier)?;

        let mut event = DispatchEvent {
            schema: schema.clone(),
            action,
            multiplier,
            role: outcome.role,
            ok: outcome.ok,
            out: outcome.out,
            marking: None,
        };
        debug!("dispatch {}::{} ok={}", schema, event.action, event.ok);

        if event.ok {
            event.marking = Some(marking.clone());
            self.history.push(HistoryEntry {
                seq: self.seq,
                schema: schema.clone(),
                action: event.action.clone(),
                multiplier,
                marking: marking.clone(),
                timestamp: SystemTime::now(),
            });
            self.seq += 1;

            if let Some(handler) = self.on_every.as_mut() {
                handler(&event);
            }
            if let Some(handler) = self.on_action.get_mut(&event.action) {
                handler(&event);
            }
            if let Some(handler) = self.on_reload.as_mut() {
                handler(&schema);
            }
        } else if let Some(handler) = self.on_fail.as_mut() {
            handler(&event);
        }
        Ok(event)
    }

    /// 回到初始状态：序号清零、历史清空、所有网回到初始标识。
    /// 已注册的网与观察者保留。
    pub fn restart(&mut self) {
        self.seq = 0;
        self.history.clear();
        self.markings.clear();
    }

    /// Observe accepted firings of one specific action.
    pub fn on(&mut self, action: impl Into<String>, handler: impl FnMut(&DispatchEvent) + 'static) {
        self.on_action.insert(action.into(), Box::new(handler));
    }

    /// Observe every accepted firing, before the per-action observer.
    pub fn on_every(&mut self, handler: impl FnMut(&DispatchEvent) + 'static) {
        self.on_every = Some(Box::new(handler));
    }

    /// Observe refused firings. Fatal errors never reach this handler.
    pub fn on_fail(&mut self, handler: impl FnMut(&DispatchEvent) + 'static) {
        self.on_fail = Some(Box::new(handler));
    }

    /// Observe schema names whose marking just changed, after the other
    /// observers.
    pub fn on_reload(&mut self, handler: impl FnMut(&str) + 'static) {
        self.on_reload = Some(Box::new(handler));
    }

    pub fn net(&self, schema: &str) -> Option<&PetriNet> {
        self.nets.get(schema)
    }

    /// Current marking of a net, falling back to its initial marking when
    /// nothing has been dispatched yet.
    pub fn marking(&self, schema: &str) -> Option<Marking> {
        let net = self.nets.get(schema)?;
        Some(
            self.markings
                .get(schema)
                .cloned()
                .unwrap_or_else(|| net.initial_marking()),
        )
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn schemas(&self) -> impl Iterator<Item = &str> {
        self.nets.keys().map(String::as_str)
    }
}
