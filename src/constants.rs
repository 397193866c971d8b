/// Marker every definition document must start with
pub const DEFINITION_HEADER: &str = "#flp_confgen";

/// Extension of candidate definition files
pub const DEFINITION_EXT: &str = "yaml";

/// Base config file name inside the source folder; never treated as a definition
pub const CONFIG_FILE_NAME: &str = "config.yaml";

// Default option values (used when neither the options file nor the CLI set them)
pub const DEFAULT_SRC_FOLDER: &str = "network_definitions";
pub const DEFAULT_DEST_CONF_FILE: &str = "/tmp/flowlogs-pipeline.conf.yaml";
pub const DEFAULT_DEST_DOC_FILE: &str = "/tmp/metrics.md";
pub const DEFAULT_DEST_DASHBOARD_FOLDER: &str = "/tmp/dashboards";
pub const DEFAULT_DEST_JSONNET_FOLDER: &str = "/tmp/jsonnet";

/// Log level written into the generated pipeline config
pub const PIPELINE_LOG_LEVEL: &str = "error";

/// Policy applied to the base generic transform when none is configured
pub const DEFAULT_GENERIC_POLICY: &str = "replace_keys";

// Output fields of the aggregate extractor, consumed by prom encoding
pub const AGG_VALUE_KEY: &str = "recent_op_value";
pub const AGG_RAW_VALUES_KEY: &str = "recent_raw_values";
pub const AGG_LABEL_GROUP_BY_KEYS: &str = "groupByKeys";
pub const AGG_LABEL_AGGREGATE: &str = "aggregate";
pub const AGG_NAME_FIELD: &str = "name";

/// Grafana datasource used by generated panels
pub const GRAFANA_DATASOURCE: &str = "prometheus";
