//! Pipeline config assembly
//!
//! Stages always come out in one canonical order:
//! ingest -> decode -> transform_generic -> transform_network ->
//! extract_aggregate / extract_timebased -> encode_prom, with write hanging
//! off the last flow stage. A stage `follows` the closest upstream stage that
//! is actually present in the output.

use serde::Serialize;
use tracing::{debug, warn};

use super::config::{Config, GenericTransform, PassThroughStage};
use super::dedup::RuleSet;
use crate::api::{Aggregates, ExtractTimebased, MetricsItems, TransformNetwork};
use crate::constants;
use crate::error::{ConfgenError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageKind {
    Ingest,
    Decode,
    TransformGeneric,
    TransformNetwork,
    ExtractAggregate,
    ExtractTimebased,
    EncodeProm,
    Write,
}

static CANONICAL_ORDER: [StageKind; 8] = [
    StageKind::Ingest,
    StageKind::Decode,
    StageKind::TransformGeneric,
    StageKind::TransformNetwork,
    StageKind::ExtractAggregate,
    StageKind::ExtractTimebased,
    StageKind::EncodeProm,
    StageKind::Write,
];

// Last stage that still carries flow records, nearest first
static FLOW_UPSTREAM: [StageKind; 4] = [
    StageKind::TransformNetwork,
    StageKind::TransformGeneric,
    StageKind::Decode,
    StageKind::Ingest,
];

impl StageKind {
    /// Name accepted in a truncated stage request
    pub fn request_name(&self) -> &'static str {
        match self {
            StageKind::Ingest => "ingest",
            StageKind::Decode => "decode",
            StageKind::TransformGeneric => "transform_generic",
            StageKind::TransformNetwork => "transform_network",
            StageKind::ExtractAggregate => "extract_aggregate",
            StageKind::ExtractTimebased => "extract_timebased",
            StageKind::EncodeProm => "encode_prom",
            StageKind::Write => "write",
        }
    }

    /// Candidate upstream stages, nearest first
    fn upstream(&self) -> &'static [StageKind] {
        match self {
            StageKind::Ingest => &[],
            StageKind::Decode => &[StageKind::Ingest],
            StageKind::TransformGeneric => &[StageKind::Decode, StageKind::Ingest],
            StageKind::TransformNetwork => &FLOW_UPSTREAM[1..],
            StageKind::ExtractAggregate | StageKind::ExtractTimebased | StageKind::Write => {
                &FLOW_UPSTREAM
            }
            StageKind::EncodeProm => &[
                StageKind::ExtractAggregate,
                StageKind::ExtractTimebased,
                StageKind::TransformNetwork,
                StageKind::TransformGeneric,
                StageKind::Decode,
                StageKind::Ingest,
            ],
        }
    }

    /// Resolve requested stage names (and group aliases) to stages in canonical order
    pub fn resolve_requested<S: AsRef<str>>(names: &[S]) -> Result<Vec<StageKind>> {
        let mut requested = Vec::new();
        for name in names {
            let name = name.as_ref().trim();
            let stages: &[StageKind] = match name {
                "transform" => &[StageKind::TransformGeneric, StageKind::TransformNetwork],
                "extract" => &[StageKind::ExtractAggregate, StageKind::ExtractTimebased],
                "encode" => &[StageKind::EncodeProm],
                other => match CANONICAL_ORDER.iter().find(|s| s.request_name() == other) {
                    Some(stage) => std::slice::from_ref(stage),
                    None => {
                        return Err(ConfgenError::validation(format!(
                            "unknown stage {:?}; expected one of {}",
                            other,
                            Self::known_names().join(", ")
                        )));
                    }
                },
            };
            requested.extend_from_slice(stages);
        }
        requested.sort();
        requested.dedup();
        Ok(requested)
    }

    fn known_names() -> Vec<&'static str> {
        let mut names: Vec<&'static str> = CANONICAL_ORDER.iter().map(|s| s.request_name()).collect();
        names.extend(["transform", "extract", "encode"]);
        names
    }
}

/// Generated pipeline configuration, written verbatim as YAML.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineConfig {
    #[serde(rename = "log-level")]
    pub log_level: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pipeline: Vec<StageLink>,
    pub parameters: Vec<StageParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageLink {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follows: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageParam {
    pub name: String,
    #[serde(flatten)]
    pub params: StageParams,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StageParams {
    Ingest(PassThroughStage),
    Decode(PassThroughStage),
    Transform(TransformParams),
    Extract(ExtractParams),
    Encode(EncodeParams),
    Write(PassThroughStage),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformParams {
    Generic { generic: GenericTransform },
    Network { network: TransformNetwork },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ExtractParams {
    Aggregates { aggregates: Aggregates },
    Timebased { timebased: ExtractTimebased },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EncodeParams {
    Prom { prom: PromEncodeParams },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromEncodeParams {
    pub metrics: MetricsItems,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefix: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
}

impl PipelineConfig {
    pub fn stage_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn stage(&self, name: &str) -> Option<&StageParam> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn follows(&self, name: &str) -> Option<&str> {
        self.pipeline
            .iter()
            .find(|l| l.name == name)
            .and_then(|l| l.follows.as_deref())
    }
}

/// Builds pipeline configs from the base config and the deduplicated rules.
pub struct ConfigAssembler<'a> {
    config: &'a Config,
    rules: &'a RuleSet,
}

impl<'a> ConfigAssembler<'a> {
    pub fn new(config: &'a Config, rules: &'a RuleSet) -> Self {
        Self { config, rules }
    }

    /// Complete pipeline: every stage the base config declares or the rules need
    pub fn generate_full(&self) -> PipelineConfig {
        let stages: Vec<StageKind> = CANONICAL_ORDER
            .iter()
            .copied()
            .filter(|stage| self.has_rules(*stage) && self.stage_params(*stage).is_some())
            .collect();
        self.assemble(&stages)
    }

    /// Only the requested stages, wired among themselves.
    ///
    /// Rule-driven stages are emitted even when their collection is empty;
    /// pass-through stages the base config does not declare are skipped.
    pub fn generate_truncated<S: AsRef<str>>(&self, requested: &[S]) -> Result<PipelineConfig> {
        let mut stages = Vec::new();
        for stage in StageKind::resolve_requested(requested)? {
            if self.stage_params(stage).is_some() {
                stages.push(stage);
            } else {
                warn!(
                    "stage {} requested but not declared in the base config, skipping",
                    stage.request_name()
                );
            }
        }
        Ok(self.assemble(&stages))
    }

    fn assemble(&self, stages: &[StageKind]) -> PipelineConfig {
        let mut pipeline = Vec::with_capacity(stages.len());
        let mut parameters = Vec::with_capacity(stages.len());

        for stage in stages {
            let Some(params) = self.stage_params(*stage) else {
                continue;
            };
            let follows = stage
                .upstream()
                .iter()
                .find(|up| stages.contains(*up))
                .map(|up| self.stage_name(*up));
            let name = self.stage_name(*stage);
            debug!("stage {} follows {:?}", name, follows);

            pipeline.push(StageLink {
                name: name.clone(),
                follows,
            });
            parameters.push(StageParam { name, params });
        }

        PipelineConfig {
            log_level: constants::PIPELINE_LOG_LEVEL.to_string(),
            pipeline,
            parameters,
        }
    }

    fn stage_name(&self, stage: StageKind) -> String {
        match stage {
            StageKind::Ingest => format!("ingest_{}", self.config.ingest.kind),
            StageKind::Decode => match &self.config.decode {
                Some(decode) => format!("decode_{}", decode.kind),
                None => "decode".to_string(),
            },
            StageKind::Write => match &self.config.write {
                Some(write) => format!("write_{}", write.kind),
                None => "write".to_string(),
            },
            other => other.request_name().to_string(),
        }
    }

    // Rule-driven stages are only worth emitting in full mode when they have rules
    fn has_rules(&self, stage: StageKind) -> bool {
        match stage {
            StageKind::TransformNetwork => !self.rules.transform_rules.is_empty(),
            StageKind::ExtractAggregate => !self.rules.aggregates.rules.is_empty(),
            StageKind::ExtractTimebased => !self.rules.timebased_top_ks.rules.is_empty(),
            StageKind::EncodeProm => !self.rules.prom_metrics.is_empty(),
            _ => true,
        }
    }

    fn stage_params(&self, stage: StageKind) -> Option<StageParams> {
        let params = match stage {
            StageKind::Ingest => StageParams::Ingest(self.config.ingest.clone()),
            StageKind::Decode => StageParams::Decode(self.config.decode.clone()?),
            StageKind::TransformGeneric => {
                let mut generic = self.config.transform.generic.clone()?;
                if generic.policy.is_empty() {
                    generic.policy = constants::DEFAULT_GENERIC_POLICY.to_string();
                }
                StageParams::Transform(TransformParams::Generic { generic })
            }
            StageKind::TransformNetwork => StageParams::Transform(TransformParams::Network {
                network: TransformNetwork {
                    rules: self.rules.transform_rules.clone(),
                },
            }),
            StageKind::ExtractAggregate => StageParams::Extract(ExtractParams::Aggregates {
                aggregates: self.rules.aggregates.clone(),
            }),
            StageKind::ExtractTimebased => StageParams::Extract(ExtractParams::Timebased {
                timebased: self.rules.timebased_top_ks.clone(),
            }),
            StageKind::EncodeProm => StageParams::Encode(EncodeParams::Prom {
                prom: PromEncodeParams {
                    metrics: self.rules.prom_metrics.clone(),
                    prefix: self.config.encode.prom.prefix.clone(),
                    port: self.config.encode.prom.port,
                },
            }),
            StageKind::Write => StageParams::Write(self.config.write.clone()?),
        };
        Some(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AggregateDefinition, AggregateOperation, MetricType, MetricsItem, NetworkTransformRule,
    };
    use std::path::Path;

    const BASE: &str = r#"
ingest:
  type: collector
  collector: {port: 2055}
transform:
  generic:
    rules:
      - {input: SrcAddr, output: srcIP}
encode:
  prom: {prefix: flp_, port: 9102}
write:
  type: loki
  loki: {url: "http://loki:3100"}
"#;

    fn base(yaml: &str) -> Config {
        Config::from_yaml(Path::new("config.yaml"), yaml).unwrap()
    }

    fn rules() -> RuleSet {
        RuleSet {
            transform_rules: vec![NetworkTransformRule::AddService {
                input: "dstPort".into(),
                output: "service".into(),
                parameters: "proto".into(),
            }],
            aggregates: Aggregates {
                rules: vec![AggregateDefinition {
                    name: "bandwidth_network_service".into(),
                    group_by_keys: vec!["service".into()],
                    operation_type: AggregateOperation::Sum,
                    operation_key: "bytes".into(),
                    expiry_time: None,
                }],
            },
            prom_metrics: vec![MetricsItem {
                name: "bandwidth_per_network_service".into(),
                metric_type: MetricType::Counter,
                filters: vec![],
                value_key: Some("recent_op_value".into()),
                labels: vec![],
                buckets: vec![],
            }],
            ..RuleSet::default()
        }
    }

    #[test]
    fn test_full_pipeline_order_and_wiring() {
        let config = base(BASE);
        let rules = rules();
        let cfg = ConfigAssembler::new(&config, &rules).generate_full();

        assert_eq!(
            cfg.stage_names(),
            vec![
                "ingest_collector",
                "transform_generic",
                "transform_network",
                "extract_aggregate",
                "encode_prom",
                "write_loki",
            ]
        );
        assert_eq!(cfg.follows("ingest_collector"), None);
        assert_eq!(cfg.follows("transform_generic"), Some("ingest_collector"));
        assert_eq!(cfg.follows("transform_network"), Some("transform_generic"));
        assert_eq!(cfg.follows("extract_aggregate"), Some("transform_network"));
        assert_eq!(cfg.follows("encode_prom"), Some("extract_aggregate"));
        assert_eq!(cfg.follows("write_loki"), Some("transform_network"));
        assert_eq!(cfg.log_level, "error");
    }

    #[test]
    fn test_generic_policy_defaults() {
        let config = base(BASE);
        let rules = rules();
        let cfg = ConfigAssembler::new(&config, &rules).generate_full();
        match &cfg.stage("transform_generic").unwrap().params {
            StageParams::Transform(TransformParams::Generic { generic }) => {
                assert_eq!(generic.policy, "replace_keys");
            }
            other => panic!("unexpected params {:?}", other),
        }
    }

    #[test]
    fn test_full_pipeline_skips_empty_rule_stages() {
        let config = base("ingest:\n  type: collector\n");
        let rules = RuleSet::default();
        let cfg = ConfigAssembler::new(&config, &rules).generate_full();
        assert_eq!(cfg.stage_names(), vec!["ingest_collector"]);
    }

    #[test]
    fn test_encode_follows_timebased_without_aggregates() {
        let config = base("ingest:\n  type: collector\ndecode:\n  type: json\n");
        let mut rules = rules();
        rules.aggregates = Aggregates::default();
        rules.timebased_top_ks = ExtractTimebased {
            rules: vec![crate::api::TimebasedFilterRule {
                name: "top".into(),
                index_key: "srcIP".into(),
                operation_type: crate::api::TimebasedOperation::Sum,
                operation_key: "bytes".into(),
                top_k: 3,
                reversed: false,
                time_interval: "10s".into(),
            }],
        };
        let cfg = ConfigAssembler::new(&config, &rules).generate_full();
        assert_eq!(cfg.follows("decode_json"), Some("ingest_collector"));
        assert_eq!(cfg.follows("transform_network"), Some("decode_json"));
        assert_eq!(cfg.follows("extract_timebased"), Some("transform_network"));
        assert_eq!(cfg.follows("encode_prom"), Some("extract_timebased"));
    }

    #[test]
    fn test_truncated_transform_only() {
        let config = base(BASE);
        let rules = rules();
        let cfg = ConfigAssembler::new(&config, &rules)
            .generate_truncated(&["transform"])
            .unwrap();

        assert_eq!(cfg.stage_names(), vec!["transform_generic", "transform_network"]);
        assert_eq!(cfg.follows("transform_generic"), None);
        assert_eq!(cfg.follows("transform_network"), Some("transform_generic"));
        assert!(cfg.stage("encode_prom").is_none());
        assert!(cfg.stage("write_loki").is_none());
    }

    #[test]
    fn test_truncated_keeps_canonical_order() {
        let config = base(BASE);
        let rules = RuleSet::default();
        let cfg = ConfigAssembler::new(&config, &rules)
            .generate_truncated(&["encode_prom", "ingest", "encode", "decode"])
            .unwrap();
        // decode is not declared by the base config
        assert_eq!(cfg.stage_names(), vec!["ingest_collector", "encode_prom"]);
        assert_eq!(cfg.follows("encode_prom"), Some("ingest_collector"));
    }

    #[test]
    fn test_truncated_unknown_stage_is_validation_error() {
        let config = base(BASE);
        let rules = rules();
        let result = ConfigAssembler::new(&config, &rules).generate_truncated(&["transform", "bogus"]);
        assert!(matches!(result, Err(ConfgenError::Validation(_))));
    }

    #[test]
    fn test_serialized_shape() {
        let config = base(BASE);
        let rules = rules();
        let cfg = ConfigAssembler::new(&config, &rules).generate_full();
        let value: serde_yaml::Value =
            serde_yaml::from_str(&serde_yaml::to_string(&cfg).unwrap()).unwrap();

        assert_eq!(value["log-level"].as_str(), Some("error"));
        assert_eq!(value["pipeline"][1]["follows"].as_str(), Some("ingest_collector"));

        let network = &value["parameters"][2];
        assert_eq!(network["name"].as_str(), Some("transform_network"));
        assert_eq!(network["transform"]["type"].as_str(), Some("network"));
        assert_eq!(network["transform"]["network"]["rules"][0]["type"].as_str(), Some("add_service"));

        let encode = &value["parameters"][4];
        assert_eq!(encode["encode"]["prom"]["prefix"].as_str(), Some("flp_"));
        assert_eq!(encode["encode"]["prom"]["metrics"][0]["valueKey"].as_str(), Some("recent_op_value"));

        let ingest = &value["parameters"][0];
        assert_eq!(ingest["ingest"]["type"].as_str(), Some("collector"));
        assert_eq!(ingest["ingest"]["collector"]["port"].as_u64(), Some(2055));
    }
}
