use serde::{Deserialize, Serialize};

use super::is_valid_duration;
use crate::error::{ConfgenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateOperation {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    RawValues,
}

impl AggregateOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateOperation::Sum => "sum",
            AggregateOperation::Count => "count",
            AggregateOperation::Min => "min",
            AggregateOperation::Max => "max",
            AggregateOperation::Avg => "avg",
            AggregateOperation::RawValues => "raw_values",
        }
    }
}

/// Group flows by `group_by_keys` and fold `operation_key` with `operation_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AggregateDefinition {
    pub name: String,
    #[serde(default)]
    pub group_by_keys: Vec<String>,
    pub operation_type: AggregateOperation,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub operation_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

impl AggregateDefinition {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ConfgenError::validation("aggregate rule needs a name"));
        }
        if self.operation_type != AggregateOperation::Count && self.operation_key.is_empty() {
            return Err(ConfgenError::validation(format!(
                "aggregate {} uses {} but has no operationKey",
                self.name,
                self.operation_type.as_str()
            )));
        }
        if let Some(expiry) = &self.expiry_time {
            if !is_valid_duration(expiry) {
                return Err(ConfgenError::validation(format!(
                    "aggregate {} has invalid expiryTime {:?}",
                    self.name, expiry
                )));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Aggregates {
    pub rules: Vec<AggregateDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimebasedOperation {
    Last,
    Diff,
    Avg,
    Min,
    Max,
    Sum,
}

impl TimebasedOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimebasedOperation::Last => "last",
            TimebasedOperation::Diff => "diff",
            TimebasedOperation::Avg => "avg",
            TimebasedOperation::Min => "min",
            TimebasedOperation::Max => "max",
            TimebasedOperation::Sum => "sum",
        }
    }
}

/// Top-K of `index_key` entries over a sliding `time_interval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TimebasedFilterRule {
    pub name: String,
    pub index_key: String,
    pub operation_type: TimebasedOperation,
    pub operation_key: String,
    #[serde(rename = "topK")]
    pub top_k: u32,
    #[serde(default)]
    pub reversed: bool,
    pub time_interval: String,
}

impl TimebasedFilterRule {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.index_key.trim().is_empty() {
            return Err(ConfgenError::validation(
                "timebased rule needs a name and an indexKey",
            ));
        }
        if self.top_k == 0 {
            return Err(ConfgenError::validation(format!(
                "timebased rule {} must keep at least one entry (topK > 0)",
                self.name
            )));
        }
        if !is_valid_duration(&self.time_interval) {
            return Err(ConfgenError::validation(format!(
                "timebased rule {} has invalid timeInterval {:?}",
                self.name, self.time_interval
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractTimebased {
    pub rules: Vec<TimebasedFilterRule>,
}
