//! Typed pipeline rules
//!
//! Rule shapes shared by definition documents and the generated pipeline
//! config. Every rule kind is a closed sum type decoded through its `type`
//! discriminator, and equality is full structural equality, which is what the
//! merge step deduplicates on.

pub mod encode;
pub mod extract;
pub mod transform;
pub mod visualization;

pub use encode::{MetricType, MetricsFilter, MetricsItem, MetricsItems, PromEncode};
pub use extract::{
    AggregateDefinition, AggregateOperation, Aggregates, ExtractTimebased, TimebasedFilterRule,
    TimebasedOperation,
};
pub use transform::{NetworkTransformRule, NetworkTransformRules, TransformNetwork};
pub use visualization::{GrafanaPanel, PanelType, Visualization, Visualizations};

use once_cell::sync::Lazy;
use regex::Regex;

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9]+(ms|s|m|h)$").expect("duration pattern is valid")
});

/// Accepts durations such as `500ms`, `10s`, `2m`, `1h`
pub(crate) fn is_valid_duration(value: &str) -> bool {
    DURATION_RE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_format() {
        assert!(is_valid_duration("10s"));
        assert!(is_valid_duration("250ms"));
        assert!(is_valid_duration("1h"));
        assert!(!is_valid_duration("10"));
        assert!(!is_valid_duration("s"));
        assert!(!is_valid_duration("10 s"));
    }
}
