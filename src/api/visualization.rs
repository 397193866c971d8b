use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PanelType {
    GraphPanel,
    SingleStat,
    BarGaugePanel,
    Heatmap,
}

impl PanelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PanelType::GraphPanel => "graphPanel",
            PanelType::SingleStat => "singleStat",
            PanelType::BarGaugePanel => "barGaugePanel",
            PanelType::Heatmap => "heatmap",
        }
    }
}

/// A dashboard panel declared by a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct GrafanaPanel {
    pub title: String,
    #[serde(rename = "type")]
    pub panel_type: PanelType,
    pub expr: String,
    #[serde(default)]
    pub legend_format: Option<String>,
    /// Dashboard (visualization group) the panel belongs to
    pub dashboard: String,
    /// Metric the panel plots; inferred from `expr` when absent
    #[serde(default)]
    pub metric: Option<String>,
    /// Encoded metric names the panel reads, resolved at parse time
    #[serde(skip)]
    pub references: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Visualization {
    pub panels: Vec<GrafanaPanel>,
}

pub type Visualizations = Vec<GrafanaPanel>;
