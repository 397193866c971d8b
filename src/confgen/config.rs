use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{ConfgenError, Result};

/// Base pipeline configuration (`config.yaml` in the source folder).
///
/// Generated rules are layered on top of it; the pass-through stages are
/// copied into the output untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub description: String,
    pub ingest: PassThroughStage,
    #[serde(default)]
    pub decode: Option<PassThroughStage>,
    #[serde(default)]
    pub transform: ConfigTransform,
    #[serde(default)]
    pub encode: ConfigEncode,
    #[serde(default)]
    pub write: Option<PassThroughStage>,
    #[serde(default)]
    pub visualization: ConfigVisualization,
}

/// A stage section copied verbatim; `type` selects the implementation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassThroughStage {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub settings: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigTransform {
    #[serde(default)]
    pub generic: Option<GenericTransform>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericTransform {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub policy: String,
    #[serde(default)]
    pub rules: Vec<GenericTransformRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenericTransformRule {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigEncode {
    #[serde(default)]
    pub prom: PromSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PromSettings {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ConfigVisualization {
    #[serde(default)]
    pub grafana: GrafanaSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GrafanaSettings {
    #[serde(default)]
    pub dashboards: Vec<DashboardSettings>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DashboardSettings {
    pub name: String,
    pub title: String,
    #[serde(default)]
    pub time_from: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(
        default,
        rename = "schemaVersion",
        deserialize_with = "deserialize_schema_version"
    )]
    pub schema_version: Option<u32>,
}

// Accepts both `schemaVersion: 16` and `schemaVersion: "16"`
fn deserialize_schema_version<'de, D>(deserializer: D) -> std::result::Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Option::<Raw>::deserialize(deserializer)? {
        None => Ok(None),
        Some(Raw::Number(n)) => Ok(Some(n)),
        Some(Raw::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Config {
    /// Load the base config; a missing or unreadable file is fatal for the run
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfgenError::io(path, e))?;
        Self::from_yaml(path, &content)
    }

    pub fn from_yaml(path: &Path, content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|source| ConfgenError::BaseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Metric name prefix added by the prom encoder
    pub fn metrics_prefix(&self) -> &str {
        &self.encode.prom.prefix
    }

    pub fn dashboard_settings(&self, name: &str) -> Option<&DashboardSettings> {
        self.visualization
            .grafana
            .dashboards
            .iter()
            .find(|d| d.name == name)
    }
}
