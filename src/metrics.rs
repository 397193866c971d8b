//! Run counters
//!
//! Outcome counters for a generation run. Nothing installs a recorder here, so
//! they only surface when an embedding program installs one.

/// Counters for definition parsing and rule merging
pub struct ConfgenMetrics;

impl ConfgenMetrics {
    /// Record a definition appended to the run
    pub fn record_definition_accepted() {
        ::metrics::counter!("confgen_definitions_total", "outcome" => "accepted").increment(1);
    }

    /// Record a definition dropped because of a skip tag
    pub fn record_definition_skipped() {
        ::metrics::counter!("confgen_definitions_total", "outcome" => "skipped").increment(1);
    }

    /// Record a definition rejected with the given error kind
    pub fn record_definition_failed(kind: &'static str) {
        ::metrics::counter!("confgen_definitions_total", "outcome" => "failed").increment(1);
        ::metrics::counter!("confgen_definition_errors_total", "kind" => kind).increment(1);
    }

    /// Record rules dropped as duplicates while merging
    pub fn record_duplicates_dropped(rule_kind: &'static str, count: usize) {
        if count == 0 {
            return;
        }
        ::metrics::counter!("confgen_rules_deduplicated_total", "kind" => rule_kind)
            .increment(count as u64);
    }
}
