//! Markdown catalog of definitions and of the merged rules.

use std::fmt::Write as _;

use super::dedup::RuleSet;
use super::definition::Definition;

/// Render the documentation for a run
pub fn generate_doc(definitions: &[Definition], rules: &RuleSet, prefix: &str) -> String {
    let mut doc = String::new();
    doc.push_str("# Flowlogs-Pipeline Metrics\n\n");
    doc.push_str(
        "Each table below describes one network definition: what it computes, \
         how it is exposed and where it is visualized.\n\n",
    );

    let mut sorted: Vec<&Definition> = definitions.iter().collect();
    sorted.sort_by(|a, b| a.description.cmp(&b.description));

    for definition in sorted {
        write_definition(&mut doc, definition, prefix);
    }

    write_rule_reference(&mut doc, rules);
    doc
}

fn write_definition(doc: &mut String, definition: &Definition, prefix: &str) {
    let _ = writeln!(doc, "### {}", escape(&definition.description));
    doc.push_str("| **Details** | ");
    doc.push_str(&escape(&definition.details));
    doc.push_str(" |\n|:---|:---|\n");
    let _ = writeln!(doc, "| **Usage** | {} |", escape(&definition.usage));

    let tags: Vec<&str> = definition.tags.iter().map(String::as_str).collect();
    let _ = writeln!(doc, "| **Tags** | {} |", tags.join(", "));

    let operations = operations_of(definition);
    if !operations.is_empty() {
        let _ = writeln!(doc, "| **Operation** | {} |", operations.join("<br>"));
    }

    if let Some(encode) = &definition.prom_encode {
        let names: Vec<String> = encode
            .metrics
            .iter()
            .map(|m| format!("`{}{}`", prefix, m.name))
            .collect();
        let _ = writeln!(doc, "| **Exposed as** | {} |", names.join(", "));
    }

    if let Some(visualization) = &definition.visualization {
        let panels: Vec<String> = visualization
            .panels
            .iter()
            .map(|p| format!("{} (dashboard `{}`)", escape(&p.title), p.dashboard))
            .collect();
        let _ = writeln!(doc, "| **Visualized as** | {} |", panels.join("<br>"));
    }

    doc.push('\n');
}

fn operations_of(definition: &Definition) -> Vec<String> {
    let mut ops = Vec::new();
    if let Some(aggregates) = &definition.aggregates {
        for rule in &aggregates.rules {
            let key = if rule.operation_key.is_empty() {
                String::new()
            } else {
                format!(" of `{}`", rule.operation_key)
            };
            ops.push(format!(
                "aggregate by `{}` using {}{}",
                rule.group_by_keys.join(", "),
                rule.operation_type.as_str(),
                key
            ));
        }
    }
    if let Some(timebased) = &definition.extract_timebased {
        for rule in &timebased.rules {
            ops.push(format!(
                "{} {} `{}` by {} of `{}` every {}",
                if rule.reversed { "bottom" } else { "top" },
                rule.top_k,
                rule.index_key,
                rule.operation_type.as_str(),
                rule.operation_key,
                rule.time_interval
            ));
        }
    }
    ops
}

fn write_rule_reference(doc: &mut String, rules: &RuleSet) {
    if rules.is_empty() {
        return;
    }
    doc.push_str("## Rule Reference\n\n");

    if !rules.transform_rules.is_empty() {
        doc.push_str("### Network transforms\n| Output | Type | Input | Parameters |\n|:---|:---|:---|:---|\n");
        for rule in &rules.transform_rules {
            let _ = writeln!(
                doc,
                "| `{}` | {} | `{}` | {} |",
                rule.output(),
                rule.kind(),
                rule.input(),
                escape(rule.parameters().unwrap_or(""))
            );
        }
        doc.push('\n');
    }

    if !rules.aggregates.rules.is_empty() {
        doc.push_str("### Aggregates\n| Name | Group by | Operation | Key |\n|:---|:---|:---|:---|\n");
        for rule in &rules.aggregates.rules {
            let _ = writeln!(
                doc,
                "| `{}` | {} | {} | {} |",
                rule.name,
                rule.group_by_keys.join(", "),
                rule.operation_type.as_str(),
                rule.operation_key
            );
        }
        doc.push('\n');
    }

    if !rules.timebased_top_ks.rules.is_empty() {
        doc.push_str(
            "### Time-based top-K\n| Name | Index key | Operation | Key | Top K | Interval |\n|:---|:---|:---|:---|:---|:---|\n",
        );
        for rule in &rules.timebased_top_ks.rules {
            let _ = writeln!(
                doc,
                "| `{}` | {} | {} | {} | {} | {} |",
                rule.name,
                rule.index_key,
                rule.operation_type.as_str(),
                rule.operation_key,
                rule.top_k,
                rule.time_interval
            );
        }
        doc.push('\n');
    }

    if !rules.prom_metrics.is_empty() {
        doc.push_str("### Prometheus metrics\n| Name | Type | Value key | Labels |\n|:---|:---|:---|:---|\n");
        for metric in &rules.prom_metrics {
            let _ = writeln!(
                doc,
                "| `{}` | {} | {} | {} |",
                metric.name,
                metric.metric_type.as_str(),
                metric.value_key.as_deref().unwrap_or("-"),
                metric.labels.join(", ")
            );
        }
        doc.push('\n');
    }
}

// Table cells cannot hold raw pipes or newlines
fn escape(text: &str) -> String {
    text.trim().replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AggregateDefinition, AggregateOperation, Aggregates, MetricType, MetricsItem, PromEncode,
    };
    use std::collections::BTreeSet;

    fn definition(description: &str) -> Definition {
        Definition {
            file_name: format!("{}.yaml", description).into(),
            description: description.into(),
            details: "Sum bytes | per service".into(),
            usage: "Evaluate usage".into(),
            tags: ["bandwidth".to_string(), "graph".to_string()].into_iter().collect::<BTreeSet<_>>(),
            transform_network: None,
            aggregates: Some(Aggregates {
                rules: vec![AggregateDefinition {
                    name: "bandwidth_network_service".into(),
                    group_by_keys: vec!["service".into()],
                    operation_type: AggregateOperation::Sum,
                    operation_key: "bytes".into(),
                    expiry_time: None,
                }],
            }),
            extract_timebased: None,
            prom_encode: Some(PromEncode {
                metrics: vec![MetricsItem {
                    name: "bandwidth_per_network_service".into(),
                    metric_type: MetricType::Counter,
                    filters: vec![],
                    value_key: Some("recent_op_value".into()),
                    labels: vec![],
                    buckets: vec![],
                }],
            }),
            visualization: None,
        }
    }

    #[test]
    fn test_doc_sections_sorted_by_description() {
        let defs = vec![definition("Zebra"), definition("Alpha")];
        let rules = RuleSet::from_definitions(&defs);
        let doc = generate_doc(&defs, &rules, "flp_");

        let alpha = doc.find("### Alpha").unwrap();
        let zebra = doc.find("### Zebra").unwrap();
        assert!(alpha < zebra);
        assert!(doc.contains("| **Tags** | bandwidth, graph |"));
        assert!(doc.contains("`flp_bandwidth_per_network_service`"));
        assert!(doc.contains("aggregate by `service` using sum of `bytes`"));
        assert!(doc.contains("Sum bytes \\| per service"));
    }

    #[test]
    fn test_rule_reference_lists_each_rule_once() {
        let defs = vec![definition("A"), definition("B")];
        let rules = RuleSet::from_definitions(&defs);
        let doc = generate_doc(&defs, &rules, "");

        assert!(doc.contains("## Rule Reference"));
        assert_eq!(doc.matches("| `bandwidth_network_service` |").count(), 1);
        assert_eq!(doc.matches("| `bandwidth_per_network_service` | counter |").count(), 1);
    }

    #[test]
    fn test_empty_run_has_header_only() {
        let doc = generate_doc(&[], &RuleSet::default(), "");
        assert!(doc.starts_with("# Flowlogs-Pipeline Metrics"));
        assert!(!doc.contains("Rule Reference"));
    }
}
