//! Rule merging across definitions
//!
//! Independently written definitions often ask for the same derived field or
//! metric. `RuleSet` collects every definition's fragments into one global
//! collection per rule kind, keeping the first occurrence of each structurally
//! equal rule and dropping later copies. Order of first appearance is kept.

use tracing::{debug, warn};

use super::definition::Definition;
use crate::api::{
    Aggregates, ExtractTimebased, MetricsItems, NetworkTransformRules, Visualizations,
};
use crate::metrics::ConfgenMetrics;

/// Deduplicated rules of a whole run, consumed by the assembler and generators.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleSet {
    pub transform_rules: NetworkTransformRules,
    pub aggregates: Aggregates,
    pub timebased_top_ks: ExtractTimebased,
    pub prom_metrics: MetricsItems,
    pub visualizations: Visualizations,
}

/// Number of duplicates dropped per collection during a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub transform_rules: usize,
    pub aggregates: usize,
    pub timebased_top_ks: usize,
    pub prom_metrics: usize,
    pub visualizations: usize,
}

impl MergeStats {
    pub fn total(&self) -> usize {
        self.transform_rules
            + self.aggregates
            + self.timebased_top_ks
            + self.prom_metrics
            + self.visualizations
    }
}

/// Append each item unless an equal one is already present; returns the number dropped
fn push_unique<T: PartialEq + Clone>(target: &mut Vec<T>, items: &[T]) -> usize {
    let mut dropped = 0;
    for item in items {
        if target.contains(item) {
            dropped += 1;
        } else {
            target.push(item.clone());
        }
    }
    dropped
}

impl RuleSet {
    /// Merge all definitions, in order, into duplicate-free collections
    pub fn from_definitions(definitions: &[Definition]) -> Self {
        let mut rules = Self::default();
        let mut stats = MergeStats::default();
        for definition in definitions {
            let merged = rules.merge_definition(definition);
            stats.transform_rules += merged.transform_rules;
            stats.aggregates += merged.aggregates;
            stats.timebased_top_ks += merged.timebased_top_ks;
            stats.prom_metrics += merged.prom_metrics;
            stats.visualizations += merged.visualizations;
        }

        ConfgenMetrics::record_duplicates_dropped("transform", stats.transform_rules);
        ConfgenMetrics::record_duplicates_dropped("aggregate", stats.aggregates);
        ConfgenMetrics::record_duplicates_dropped("timebased", stats.timebased_top_ks);
        ConfgenMetrics::record_duplicates_dropped("metric", stats.prom_metrics);
        ConfgenMetrics::record_duplicates_dropped("panel", stats.visualizations);
        debug!(
            "merged {} definitions, dropped {} duplicate rules",
            definitions.len(),
            stats.total()
        );

        rules.warn_on_conflicts();
        rules
    }

    /// Fold one definition's fragments into the collections
    pub fn merge_definition(&mut self, definition: &Definition) -> MergeStats {
        let mut stats = MergeStats::default();
        if let Some(transform) = &definition.transform_network {
            stats.transform_rules = push_unique(&mut self.transform_rules, &transform.rules);
        }
        if let Some(aggregates) = &definition.aggregates {
            stats.aggregates = push_unique(&mut self.aggregates.rules, &aggregates.rules);
        }
        if let Some(timebased) = &definition.extract_timebased {
            stats.timebased_top_ks =
                push_unique(&mut self.timebased_top_ks.rules, &timebased.rules);
        }
        if let Some(encode) = &definition.prom_encode {
            stats.prom_metrics = push_unique(&mut self.prom_metrics, &encode.metrics);
        }
        if let Some(visualization) = &definition.visualization {
            stats.visualizations = push_unique(&mut self.visualizations, &visualization.panels);
        }
        stats
    }

    /// Re-run deduplication over already merged collections
    pub fn dedupe(&self) -> Self {
        let mut rules = Self::default();
        push_unique(&mut rules.transform_rules, &self.transform_rules);
        push_unique(&mut rules.aggregates.rules, &self.aggregates.rules);
        push_unique(&mut rules.timebased_top_ks.rules, &self.timebased_top_ks.rules);
        push_unique(&mut rules.prom_metrics, &self.prom_metrics);
        push_unique(&mut rules.visualizations, &self.visualizations);
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.transform_rules.is_empty()
            && self.aggregates.rules.is_empty()
            && self.timebased_top_ks.rules.is_empty()
            && self.prom_metrics.is_empty()
            && self.visualizations.is_empty()
    }

    pub fn has_metric(&self, name: &str) -> bool {
        self.prom_metrics.iter().any(|m| m.name == name)
    }

    // Same target, different content: both are kept, but the pipeline will
    // write the field (or metric) twice.
    fn warn_on_conflicts(&self) {
        for (i, rule) in self.transform_rules.iter().enumerate() {
            if self.transform_rules[..i]
                .iter()
                .any(|earlier| earlier.output() == rule.output())
            {
                warn!(
                    "transform output {} is produced by more than one distinct rule",
                    rule.output()
                );
            }
        }
        for (i, agg) in self.aggregates.rules.iter().enumerate() {
            if self.aggregates.rules[..i].iter().any(|a| a.name == agg.name) {
                warn!("aggregate {} is declared with conflicting definitions", agg.name);
            }
        }
        for (i, metric) in self.prom_metrics.iter().enumerate() {
            if self.prom_metrics[..i].iter().any(|m| m.name == metric.name) {
                warn!("metric {} is declared with conflicting definitions", metric.name);
            }
        }
    }
}

impl super::ConfGen {
    /// Build the run's deduplicated rule collections
    pub fn dedupe(&self) -> RuleSet {
        RuleSet::from_definitions(&self.definitions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{
        AggregateDefinition, AggregateOperation, MetricType, MetricsItem, NetworkTransformRule,
        PromEncode, TransformNetwork,
    };
    use std::collections::BTreeSet;

    fn subnet_rule(mask: &str) -> NetworkTransformRule {
        NetworkTransformRule::AddSubnet {
            input: "srcIP".into(),
            output: "srcSubnet".into(),
            parameters: mask.into(),
        }
    }

    fn aggregate(name: &str) -> AggregateDefinition {
        AggregateDefinition {
            name: name.into(),
            group_by_keys: vec!["srcSubnet".into()],
            operation_type: AggregateOperation::Sum,
            operation_key: "bytes".into(),
            expiry_time: None,
        }
    }

    fn counter(name: &str) -> MetricsItem {
        MetricsItem {
            name: name.into(),
            metric_type: MetricType::Counter,
            filters: vec![],
            value_key: None,
            labels: vec![],
            buckets: vec![],
        }
    }

    fn definition(
        file: &str,
        rules: Vec<NetworkTransformRule>,
        aggregates: Vec<AggregateDefinition>,
        metrics: Vec<MetricsItem>,
    ) -> Definition {
        Definition {
            file_name: file.into(),
            description: file.into(),
            details: String::new(),
            usage: String::new(),
            tags: BTreeSet::new(),
            transform_network: Some(TransformNetwork { rules }),
            aggregates: (!aggregates.is_empty()).then(|| Aggregates { rules: aggregates }),
            extract_timebased: None,
            prom_encode: (!metrics.is_empty()).then(|| PromEncode { metrics }),
            visualization: None,
        }
    }

    #[test]
    fn test_identical_rules_merge_to_one() {
        let defs = vec![
            definition("a.yaml", vec![subnet_rule("/24")], vec![], vec![counter("m1")]),
            definition(
                "b.yaml",
                vec![subnet_rule("/24")],
                vec![aggregate("bytes_per_subnet")],
                vec![counter("m1"), counter("m2")],
            ),
        ];

        let rules = RuleSet::from_definitions(&defs);
        assert_eq!(rules.transform_rules, vec![subnet_rule("/24")]);
        assert_eq!(rules.aggregates.rules, vec![aggregate("bytes_per_subnet")]);
        assert_eq!(
            rules.prom_metrics.iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            vec!["m1", "m2"]
        );
        assert!(rules.has_metric("m2"));
        assert!(!rules.has_metric("m3"));
    }

    #[test]
    fn test_different_parameters_are_kept_in_order() {
        let defs = vec![
            definition("a.yaml", vec![subnet_rule("/16")], vec![], vec![]),
            definition("b.yaml", vec![subnet_rule("/24"), subnet_rule("/16")], vec![], vec![]),
        ];
        let rules = RuleSet::from_definitions(&defs);
        assert_eq!(rules.transform_rules, vec![subnet_rule("/16"), subnet_rule("/24")]);
    }

    #[test]
    fn test_first_seen_instance_is_preserved() {
        let mut first = counter("m1");
        first.labels = vec!["service".into()];
        let defs = vec![
            definition("a.yaml", vec![], vec![], vec![first.clone()]),
            definition("b.yaml", vec![], vec![], vec![first.clone()]),
        ];
        let rules = RuleSet::from_definitions(&defs);
        assert_eq!(rules.prom_metrics, vec![first]);
    }

    #[test]
    fn test_dedupe_is_idempotent() {
        let defs = vec![
            definition("a.yaml", vec![subnet_rule("/24")], vec![aggregate("x")], vec![counter("m")]),
            definition("b.yaml", vec![subnet_rule("/24")], vec![aggregate("x")], vec![counter("m")]),
        ];
        let once = RuleSet::from_definitions(&defs);
        let twice = RuleSet::from_definitions(&defs);
        assert_eq!(once, twice);
        assert_eq!(once.dedupe(), once);
    }

    #[test]
    fn test_merge_stats_count_drops() {
        let mut rules = RuleSet::default();
        let def = definition("a.yaml", vec![subnet_rule("/24")], vec![], vec![counter("m")]);
        assert_eq!(rules.merge_definition(&def).total(), 0);

        let stats = rules.merge_definition(&def);
        assert_eq!(stats.transform_rules, 1);
        assert_eq!(stats.prom_metrics, 1);
        assert_eq!(stats.total(), 2);
    }

    #[test]
    fn test_empty_rule_set() {
        assert!(RuleSet::from_definitions(&[]).is_empty());
    }
}
