// Monitored systems and fetch-cycle status

use serde::{Deserialize, Serialize};

/// One monitored host within an instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemRef {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

impl SystemRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Outcome of the last applied cycle for one system, as exposed to the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub id: String,
    pub name: String,
    pub ok: bool,
    pub host_points: usize,
    pub entities: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
