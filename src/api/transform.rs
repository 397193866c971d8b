use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ConfgenError, Result};

/// One network enrichment rule, keyed by the field it writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NetworkTransformRule {
    /// Subnet of `input` using a mask such as `/24`
    AddSubnet {
        input: String,
        output: String,
        parameters: String,
    },
    /// Geo location of an address
    AddLocation { input: String, output: String },
    /// Service name of a port; `parameters` names the protocol field
    AddService {
        input: String,
        output: String,
        parameters: String,
    },
    /// Kubernetes metadata of an address, optionally under a label prefix
    AddKubernetes {
        input: String,
        output: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parameters: Option<String>,
    },
    /// Boolean output set when `input` matches the regex in `parameters`
    AddRegexIf {
        input: String,
        output: String,
        parameters: String,
    },
    /// Boolean output set when `input` satisfies a condition such as `<10`
    AddIf {
        input: String,
        output: String,
        parameters: String,
    },
}

pub type NetworkTransformRules = Vec<NetworkTransformRule>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransformNetwork {
    pub rules: NetworkTransformRules,
}

const CONDITION_OPERATORS: [&str; 6] = ["<=", ">=", "==", "!=", "<", ">"];

impl NetworkTransformRule {
    pub fn kind(&self) -> &'static str {
        match self {
            NetworkTransformRule::AddSubnet { .. } => "add_subnet",
            NetworkTransformRule::AddLocation { .. } => "add_location",
            NetworkTransformRule::AddService { .. } => "add_service",
            NetworkTransformRule::AddKubernetes { .. } => "add_kubernetes",
            NetworkTransformRule::AddRegexIf { .. } => "add_regex_if",
            NetworkTransformRule::AddIf { .. } => "add_if",
        }
    }

    pub fn input(&self) -> &str {
        match self {
            NetworkTransformRule::AddSubnet { input, .. }
            | NetworkTransformRule::AddLocation { input, .. }
            | NetworkTransformRule::AddService { input, .. }
            | NetworkTransformRule::AddKubernetes { input, .. }
            | NetworkTransformRule::AddRegexIf { input, .. }
            | NetworkTransformRule::AddIf { input, .. } => input,
        }
    }

    pub fn output(&self) -> &str {
        match self {
            NetworkTransformRule::AddSubnet { output, .. }
            | NetworkTransformRule::AddLocation { output, .. }
            | NetworkTransformRule::AddService { output, .. }
            | NetworkTransformRule::AddKubernetes { output, .. }
            | NetworkTransformRule::AddRegexIf { output, .. }
            | NetworkTransformRule::AddIf { output, .. } => output,
        }
    }

    pub fn parameters(&self) -> Option<&str> {
        match self {
            NetworkTransformRule::AddSubnet { parameters, .. }
            | NetworkTransformRule::AddService { parameters, .. }
            | NetworkTransformRule::AddRegexIf { parameters, .. }
            | NetworkTransformRule::AddIf { parameters, .. } => Some(parameters),
            NetworkTransformRule::AddKubernetes { parameters, .. } => parameters.as_deref(),
            NetworkTransformRule::AddLocation { .. } => None,
        }
    }

    /// Check field names and kind-specific parameters
    pub fn validate(&self) -> Result<()> {
        if self.input().trim().is_empty() || self.output().trim().is_empty() {
            return Err(ConfgenError::validation(format!(
                "{} rule needs both input and output fields",
                self.kind()
            )));
        }

        match self {
            NetworkTransformRule::AddSubnet { parameters, output, .. } => {
                let bits = parameters
                    .strip_prefix('/')
                    .and_then(|b| b.parse::<u8>().ok())
                    .filter(|b| *b <= 128);
                if bits.is_none() {
                    return Err(ConfgenError::validation(format!(
                        "add_subnet rule for {} has invalid mask {:?}",
                        output, parameters
                    )));
                }
            }
            NetworkTransformRule::AddService { parameters, output, .. } => {
                if parameters.trim().is_empty() {
                    return Err(ConfgenError::validation(format!(
                        "add_service rule for {} must name the protocol field",
                        output
                    )));
                }
            }
            NetworkTransformRule::AddRegexIf { parameters, output, .. } => {
                Regex::new(parameters).map_err(|e| {
                    ConfgenError::validation(format!(
                        "add_regex_if rule for {} has invalid regex: {}",
                        output, e
                    ))
                })?;
            }
            NetworkTransformRule::AddIf { parameters, output, .. } => {
                let operand = CONDITION_OPERATORS
                    .iter()
                    .find_map(|op| parameters.trim().strip_prefix(op));
                let valid = operand
                    .map(|v| v.trim().parse::<f64>().is_ok())
                    .unwrap_or(false);
                if !valid {
                    return Err(ConfgenError::validation(format!(
                        "add_if rule for {} has invalid condition {:?}",
                        output, parameters
                    )));
                }
            }
            NetworkTransformRule::AddLocation { .. } | NetworkTransformRule::AddKubernetes { .. } => {}
        }

        Ok(())
    }
}
