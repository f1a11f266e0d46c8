//! I/O 支持：数据式声明与完整网对象的 JSON / RON 序列化接口。
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use indexmap::IndexMap;
use ron::ser::PrettyConfig;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use thiserror::Error;

use crate::net::definition::PetriNet;
use crate::net::ids::PlaceId;
use crate::net::structure::{Arc, DEFAULT_ROLE, NetMode, Place, Position, Transition, Weight};

#[derive(Debug, Error)]
pub enum IoError {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 数据式声明：标签键控的规格加弧表，尚未索引。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Declaration {
    #[serde(rename = "type", default)]
    pub mode: NetMode,
    pub places: IndexMap<String, PlaceSpec>,
    pub transitions: IndexMap<String, TransitionSpec>,
    #[serde(default)]
    pub arcs: Vec<Arc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlaceSpec {
    #[serde(default)]
    pub initial: Weight,
    #[serde(default)]
    pub capacity: Weight,
    #[serde(default)]
    pub position: Position,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransitionSpec {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub position: Position,
}

impl PetriNet {
    /// 从数据式声明构建；偏移按 `places` 的插入顺序分配。
    pub fn from_declaration(schema: impl Into<String>, declaration: Declaration) -> Self {
        let mut net = Self::empty(schema, declaration.mode);
        for (label, spec) in declaration.places {
            let offset = PlaceId::new(net.places.len() as u32);
            net.places.insert(
                label.clone(),
                Place::new(label, offset, spec.initial, spec.capacity, spec.position),
            );
        }
        for (label, spec) in declaration.transitions {
            let role = net.role(spec.role.as_deref().unwrap_or(DEFAULT_ROLE));
            net.transitions
                .insert(label.clone(), Transition::new(label, role, spec.position));
        }
        net.arcs = declaration.arcs;
        net
    }

    /// 导出回声明形式。已知局限：从完整网对象反序列化的网
    /// 不会从增量行重建弧，这里导出的弧表可能是空的。
    pub fn to_declaration(&self) -> Declaration {
        Declaration {
            mode: self.mode,
            places: self
                .places
                .iter()
                .map(|(label, place)| {
                    (
                        label.clone(),
                        PlaceSpec {
                            initial: place.initial,
                            capacity: place.capacity,
                            position: place.position,
                        },
                    )
                })
                .collect(),
            transitions: self
                .transitions
                .iter()
                .map(|(label, transition)| {
                    (
                        label.clone(),
                        TransitionSpec {
                            role: Some(transition.role.label.clone()),
                            position: transition.position,
                        },
                    )
                })
                .collect(),
            arcs: self.arcs.clone(),
        }
    }
}

pub fn to_json_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn from_json_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(serde_json::from_str(s)?)
}

pub fn write_json<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_json_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_json<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_json_str(&content)
}

pub fn to_ron_string<T>(value: &T) -> Result<String, IoError>
where
    T: Serialize,
{
    let mut pretty = PrettyConfig::default();
    pretty.new_line = "\n".into();
    Ok(ron::ser::to_string_pretty(value, pretty)?)
}

pub fn from_ron_str<T>(s: &str) -> Result<T, IoError>
where
    T: DeserializeOwned,
{
    Ok(ron::from_str(s).map_err(ron::Error::from)?)
}

pub fn write_ron<P: AsRef<Path>, T: Serialize>(path: P, value: &T) -> Result<(), IoError> {
    let mut file = File::create(path)?;
    let content = to_ron_string(value)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

pub fn read_ron<P: AsRef<Path>, T: DeserializeOwned>(path: P) -> Result<T, IoError> {
    let mut file = File::open(path)?;
    let mut content = String::new();
    file.read_to_string(&mut content)?;
    from_ron_str(&content)
}

/// 按扩展名判断 RON 格式；其余一律当 JSON 处理。
pub fn ron_path<P: AsRef<Path>>(path: P) -> bool {
    path.as_ref()
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("ron"))
        .unwrap_or(false)
}
