// Pinned chart identifiers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A chart a user can pin. Host charts carry no payload; entity charts are keyed by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "camelCase")]
pub enum PinnedItem {
    HostCpu,
    HostMemory,
    HostTemperature,
    HostInfo,
    EntityCpu(String),
    EntityMemory(String),
}

impl PinnedItem {
    /// Stable tag used for persistence.
    pub fn tag(&self) -> &'static str {
        match self {
            PinnedItem::HostCpu => "host_cpu",
            PinnedItem::HostMemory => "host_memory",
            PinnedItem::HostTemperature => "host_temperature",
            PinnedItem::HostInfo => "host_info",
            PinnedItem::EntityCpu(_) => "entity_cpu",
            PinnedItem::EntityMemory(_) => "entity_memory",
        }
    }

    pub fn entity_name(&self) -> Option<&str> {
        match self {
            PinnedItem::EntityCpu(name) | PinnedItem::EntityMemory(name) => Some(name),
            _ => None,
        }
    }

    /// Rebuild from a persisted tag + optional entity name.
    pub fn from_parts(tag: &str, entity_name: Option<&str>) -> Option<Self> {
        match (tag, entity_name) {
            ("host_cpu", _) => Some(PinnedItem::HostCpu),
            ("host_memory", _) => Some(PinnedItem::HostMemory),
            ("host_temperature", _) => Some(PinnedItem::HostTemperature),
            ("host_info", _) => Some(PinnedItem::HostInfo),
            ("entity_cpu", Some(n)) => Some(PinnedItem::EntityCpu(n.to_string())),
            ("entity_memory", Some(n)) => Some(PinnedItem::EntityMemory(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for PinnedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.entity_name() {
            Some(name) => write!(f, "{}:{}", self.tag(), name),
            None => f.write_str(self.tag()),
        }
    }
}

/// A pin resolved against one system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPinnedItem {
    pub system_id: String,
    pub item: PinnedItem,
}

impl ResolvedPinnedItem {
    pub fn new(item: PinnedItem, system_id: impl Into<String>) -> Self {
        Self {
            system_id: system_id.into(),
            item,
        }
    }
}

/// Persistable registry state: instance id -> pins.
pub type PinSnapshot = BTreeMap<String, Vec<ResolvedPinnedItem>>;
