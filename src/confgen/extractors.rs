//! Rule extractors
//!
//! Each extractor turns one untyped definition section into its typed rule
//! fragment, or `None` when the section is absent or empty. Failures are
//! `ConfgenError::Validation`; the document itself already passed the strict
//! top-level schema check by the time these run.
//!
//! Extraction order matters in exactly one place: encode defaults depend on
//! the aggregates produced by the extract section, so `parse_encode` takes the
//! extract result as an argument instead of reading it from shared state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashSet;

use crate::api::{
    Aggregates, ExtractTimebased, GrafanaPanel, MetricType, MetricsFilter, PromEncode,
    TransformNetwork, Visualization,
};
use crate::constants;
use crate::error::{ConfgenError, Result};

static METRIC_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z_:][a-zA-Z0-9_:]*$").expect("metric name pattern is valid")
});

// Dashboard names become file names; no separators or parent references
static DASHBOARD_NAME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9_-]+$").expect("dashboard name pattern is valid")
});

static EXPR_IDENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_:]*").expect("identifier pattern is valid")
});

/// Result of the extract section: aggregation or time-based top-K, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractRules {
    Aggregates(Aggregates),
    Timebased(ExtractTimebased),
}

impl ExtractRules {
    pub fn aggregates(&self) -> Option<&Aggregates> {
        match self {
            ExtractRules::Aggregates(aggregates) => Some(aggregates),
            ExtractRules::Timebased(_) => None,
        }
    }

    pub fn timebased(&self) -> Option<&ExtractTimebased> {
        match self {
            ExtractRules::Timebased(timebased) => Some(timebased),
            ExtractRules::Aggregates(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ExtractKind {
    Aggregates,
    Timebased,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ExtractSection {
    #[serde(rename = "type", default)]
    kind: Option<ExtractKind>,
    #[serde(default)]
    aggregates: Option<Aggregates>,
    #[serde(default)]
    timebased: Option<ExtractTimebased>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EncodeSection {
    Prom { prom: PromEncode },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum VisualizationSection {
    Grafana { grafana: Vec<GrafanaPanel> },
}

/// Absent, null and empty-mapping sections all mean "not declared"
fn declared(section: Option<&Value>) -> Option<&Value> {
    match section {
        None | Some(Value::Null) => None,
        Some(Value::Mapping(m)) if m.is_empty() => None,
        Some(value) => Some(value),
    }
}

fn decode_section<T: DeserializeOwned>(section: &str, value: &Value) -> Result<T> {
    serde_yaml::from_value(value.clone())
        .map_err(|e| ConfgenError::validation(format!("invalid {} section: {}", section, e)))
}

/// Decode the `transform` section into network transform rules
pub fn parse_transform(section: Option<&Value>) -> Result<Option<TransformNetwork>> {
    let Some(value) = declared(section) else {
        return Ok(None);
    };

    let transform: TransformNetwork = decode_section("transform", value)?;
    for rule in &transform.rules {
        rule.validate()?;
    }

    if transform.rules.is_empty() {
        return Ok(None);
    }
    Ok(Some(transform))
}

/// Decode the `extract` section into aggregates or time-based rules
pub fn parse_extract(section: Option<&Value>) -> Result<Option<ExtractRules>> {
    let Some(value) = declared(section) else {
        return Ok(None);
    };

    let extract: ExtractSection = decode_section("extract", value)?;
    let rules = match (extract.kind, extract.aggregates, extract.timebased) {
        (_, Some(_), Some(_)) => {
            return Err(ConfgenError::validation(
                "extract section declares both aggregates and timebased rules",
            ));
        }
        (Some(ExtractKind::Timebased), Some(_), None) | (Some(ExtractKind::Aggregates), None, Some(_)) => {
            return Err(ConfgenError::validation(
                "extract type does not match the declared rules",
            ));
        }
        (_, Some(aggregates), None) => {
            for rule in &aggregates.rules {
                rule.validate()?;
            }
            ExtractRules::Aggregates(aggregates)
        }
        (_, None, Some(timebased)) => {
            for rule in &timebased.rules {
                rule.validate()?;
            }
            ExtractRules::Timebased(timebased)
        }
        (Some(kind), None, None) => {
            return Err(ConfgenError::validation(format!(
                "extract type {:?} has no rules",
                kind
            )));
        }
        (None, None, None) => return Ok(None),
    };

    let empty = match &rules {
        ExtractRules::Aggregates(a) => a.rules.is_empty(),
        ExtractRules::Timebased(t) => t.rules.is_empty(),
    };
    if empty {
        return Ok(None);
    }
    Ok(Some(rules))
}

/// Decode the `encode` section into Prometheus metrics.
///
/// `extract` is this definition's extract result; when it carries
/// aggregates, metrics default to reading the aggregate output fields.
pub fn parse_encode(
    section: Option<&Value>,
    extract: Option<&ExtractRules>,
) -> Result<Option<PromEncode>> {
    let Some(value) = declared(section) else {
        return Ok(None);
    };

    let section: EncodeSection = decode_section("encode", value)?;
    let EncodeSection::Prom { prom: mut encode } = section;
    let aggregates = extract.and_then(ExtractRules::aggregates);

    let mut seen = HashSet::new();
    for metric in &mut encode.metrics {
        if !METRIC_NAME_RE.is_match(&metric.name) {
            return Err(ConfgenError::validation(format!(
                "invalid metric name {:?}",
                metric.name
            )));
        }
        if !seen.insert(metric.name.clone()) {
            return Err(ConfgenError::validation(format!(
                "metric {} declared twice",
                metric.name
            )));
        }

        match aggregates {
            Some(aggregates) => {
                if metric.metric_type == MetricType::Histogram {
                    metric.metric_type = MetricType::AggHistogram;
                }
                if metric.value_key.is_none() {
                    let key = match metric.metric_type {
                        MetricType::AggHistogram => constants::AGG_RAW_VALUES_KEY,
                        _ => constants::AGG_VALUE_KEY,
                    };
                    metric.value_key = Some(key.to_string());
                }
                if metric.labels.is_empty() {
                    metric.labels = vec![
                        constants::AGG_LABEL_GROUP_BY_KEYS.to_string(),
                        constants::AGG_LABEL_AGGREGATE.to_string(),
                    ];
                }
                if metric.filters.is_empty() {
                    if let [only] = aggregates.rules.as_slice() {
                        metric.filters.push(MetricsFilter {
                            key: constants::AGG_NAME_FIELD.to_string(),
                            value: only.name.clone(),
                        });
                    }
                }
            }
            None => match metric.metric_type {
                MetricType::AggHistogram => {
                    return Err(ConfgenError::validation(format!(
                        "metric {} is an agg_histogram but no aggregates are declared",
                        metric.name
                    )));
                }
                MetricType::Gauge | MetricType::Histogram if metric.value_key.is_none() => {
                    return Err(ConfgenError::validation(format!(
                        "metric {} needs a valueKey",
                        metric.name
                    )));
                }
                _ => {}
            },
        }
    }

    if encode.metrics.is_empty() {
        return Ok(None);
    }
    Ok(Some(encode))
}

/// Decode the `visualization` section and resolve which encoded metrics each panel reads.
///
/// `prefix` is the base config's prom prefix, which panel expressions usually carry.
pub fn parse_visualization(
    section: Option<&Value>,
    encode: Option<&PromEncode>,
    prefix: &str,
) -> Result<Option<Visualization>> {
    let Some(value) = declared(section) else {
        return Ok(None);
    };

    let section: VisualizationSection = decode_section("visualization", value)?;
    let VisualizationSection::Grafana { grafana: mut panels } = section;
    if panels.is_empty() {
        return Ok(None);
    }

    let Some(encode) = encode else {
        return Err(ConfgenError::validation(
            "visualization declared without any encoded metric",
        ));
    };
    let names: Vec<&str> = encode.metrics.iter().map(|m| m.name.as_str()).collect();

    for panel in &mut panels {
        if panel.dashboard.trim().is_empty() {
            return Err(ConfgenError::validation(format!(
                "panel {:?} does not name a dashboard",
                panel.title
            )));
        }
        if !DASHBOARD_NAME_RE.is_match(&panel.dashboard) {
            return Err(ConfgenError::validation(format!(
                "panel {:?} has invalid dashboard name {:?}: only letters, digits, '_' and '-' are allowed",
                panel.title, panel.dashboard
            )));
        }
        panel.references = resolve_references(panel, &names, prefix)?;
    }

    Ok(Some(Visualization { panels }))
}

fn resolve_references(panel: &GrafanaPanel, names: &[&str], prefix: &str) -> Result<Vec<String>> {
    if let Some(metric) = &panel.metric {
        let bare = metric.strip_prefix(prefix).unwrap_or(metric);
        if !names.contains(&bare) {
            return Err(ConfgenError::validation(format!(
                "panel {:?} references metric {} which is not encoded by this definition",
                panel.title, metric
            )));
        }
        return Ok(vec![bare.to_string()]);
    }

    let mut references: Vec<String> = Vec::new();
    for ident in EXPR_IDENT_RE.find_iter(&panel.expr) {
        let ident = ident.as_str();
        let bare = if prefix.is_empty() {
            ident
        } else {
            ident.strip_prefix(prefix).unwrap_or(ident)
        };
        if names.contains(&bare) && !references.iter().any(|r| r == bare) {
            references.push(bare.to_string());
        }
    }

    if references.is_empty() {
        return Err(ConfgenError::validation(format!(
            "panel {:?} expression does not reference any metric of this definition",
            panel.title
        )));
    }
    Ok(references)
}
