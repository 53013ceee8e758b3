// Raw wire records as returned by the monitored instance's record API.
// The nested `stats` payload is kept as raw JSON so one bad record can be
// dropped without failing the page it arrived in.

use serde::Deserialize;
use std::collections::HashMap;

/// One host sample from the `system_stats` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RawHostRecord {
    pub id: String,
    pub created: String,
    #[serde(default)]
    pub stats: serde_json::Value,
}

/// One container sample set from the `container_stats` collection.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEntityRecord {
    pub id: String,
    pub created: String,
    #[serde(default)]
    pub stats: serde_json::Value,
}

/// Abbreviated host payload. `cpu` and `mp` are required; the rest default to zero.
#[derive(Debug, Clone, Deserialize)]
pub struct HostStatsDetail {
    pub cpu: f64,
    #[serde(rename = "mp")]
    pub memory_percent: f64,
    #[serde(rename = "mu", default)]
    pub memory_used: f64,
    #[serde(rename = "du", default)]
    pub disk_used: f64,
    #[serde(rename = "dp", default)]
    pub disk_percent: f64,
    #[serde(rename = "ns", default)]
    pub net_sent: f64,
    #[serde(rename = "nr", default)]
    pub net_received: f64,
    #[serde(rename = "t", default)]
    pub temperatures: Option<HashMap<String, f64>>,
}

/// One container entry inside an entity record.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityStatDetail {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "c")]
    pub cpu: f64,
    #[serde(rename = "m")]
    pub memory: f64,
    #[serde(rename = "ns", default)]
    pub net_sent: f64,
    #[serde(rename = "nr", default)]
    pub net_received: f64,
}

/// Paged list response of the record API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPage<T> {
    pub page: u32,
    pub per_page: u32,
    #[serde(default)]
    pub total_items: i64,
    #[serde(default)]
    pub total_pages: i64,
    pub items: Vec<T>,
}
