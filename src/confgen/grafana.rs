//! Dashboard generation
//!
//! Groups the merged panels by dashboard name and renders every dashboard in
//! two forms: a grafonnet (jsonnet) template and a plain Grafana JSON model.

use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use tracing::warn;

use super::config::Config;
use super::dedup::RuleSet;
use crate::api::{GrafanaPanel, PanelType};
use crate::constants::GRAFANA_DATASOURCE;

const DEFAULT_TIME_FROM: &str = "now-1h";
const DEFAULT_SCHEMA_VERSION: u32 = 27;
const PANEL_WIDTH: u32 = 12;
const PANEL_HEIGHT: u32 = 8;
const GRID_COLUMNS: u32 = 24;

/// One generated dashboard and its panels, in layout order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dashboard {
    pub name: String,
    pub title: String,
    pub time_from: String,
    pub tags: Vec<String>,
    pub schema_version: u32,
    pub panels: Vec<GrafanaPanel>,
}

/// Build one dashboard per visualization group.
///
/// Groups follow the base config's dashboard order, then first appearance.
/// Panels whose metrics are missing from the merged encode rules are dropped.
pub fn generate_dashboards(config: &Config, rules: &RuleSet) -> Vec<Dashboard> {
    let mut dashboards: Vec<Dashboard> = Vec::new();

    for panel in &rules.visualizations {
        if let Some(missing) = panel.references.iter().find(|m| !rules.has_metric(m)) {
            warn!(
                "omitting panel {:?} from dashboard {}: metric {} is not encoded",
                panel.title, panel.dashboard, missing
            );
            continue;
        }

        match dashboards.iter_mut().find(|d| d.name == panel.dashboard) {
            Some(dashboard) => dashboard.panels.push(panel.clone()),
            None => {
                let mut dashboard = new_dashboard(config, &panel.dashboard);
                dashboard.panels.push(panel.clone());
                dashboards.push(dashboard);
            }
        }
    }

    let position = |name: &str| {
        config
            .visualization
            .grafana
            .dashboards
            .iter()
            .position(|d| d.name == name)
            .unwrap_or(usize::MAX)
    };
    // Stable sort keeps first-appearance order among unconfigured dashboards
    dashboards.sort_by_key(|d| position(&d.name));
    dashboards
}

fn new_dashboard(config: &Config, name: &str) -> Dashboard {
    match config.dashboard_settings(name) {
        Some(settings) => Dashboard {
            name: name.to_string(),
            title: settings.title.clone(),
            time_from: settings
                .time_from
                .clone()
                .unwrap_or_else(|| DEFAULT_TIME_FROM.to_string()),
            tags: settings.tags.clone(),
            schema_version: settings.schema_version.unwrap_or(DEFAULT_SCHEMA_VERSION),
            panels: Vec::new(),
        },
        None => {
            warn!("dashboard {} is not configured in the base config, using defaults", name);
            Dashboard {
                name: name.to_string(),
                title: name.to_string(),
                time_from: DEFAULT_TIME_FROM.to_string(),
                tags: vec!["flp".to_string(), "generated".to_string()],
                schema_version: DEFAULT_SCHEMA_VERSION,
                panels: Vec::new(),
            }
        }
    }
}

impl Dashboard {
    /// Stable dashboard uid derived from its name
    pub fn uid(&self) -> String {
        let digest = Sha256::digest(self.name.as_bytes());
        hex::encode(digest)[..12].to_string()
    }

    fn grid_position(index: usize) -> (u32, u32) {
        let per_row = (GRID_COLUMNS / PANEL_WIDTH) as usize;
        let x = (index % per_row) as u32 * PANEL_WIDTH;
        let y = (index / per_row) as u32 * PANEL_HEIGHT;
        (x, y)
    }

    /// Grafonnet template for this dashboard
    pub fn to_jsonnet(&self) -> String {
        let mut out = String::new();
        out.push_str("local grafana = import 'grafana.libsonnet';\n");
        out.push_str("local dashboard = grafana.dashboard;\n");
        out.push_str("local graphPanel = grafana.graphPanel;\n");
        out.push_str("local singlestat = grafana.singlestat;\n");
        out.push_str("local barGaugePanel = grafana.barGaugePanel;\n");
        out.push_str("local heatmapPanel = grafana.heatmapPanel;\n");
        out.push_str("local prometheus = grafana.prometheus;\n\n");

        let tags: Vec<String> = self.tags.iter().map(|t| jsonnet_str(t)).collect();
        let _ = write!(
            out,
            "dashboard.new(\n  schemaVersion={},\n  title={},\n  uid={},\n  time_from={},\n  tags=[{}],\n)",
            self.schema_version,
            jsonnet_str(&self.title),
            jsonnet_str(&self.uid()),
            jsonnet_str(&self.time_from),
            tags.join(", ")
        );

        for (index, panel) in self.panels.iter().enumerate() {
            let (x, y) = Self::grid_position(index);
            let constructor = match panel.panel_type {
                PanelType::GraphPanel => "graphPanel",
                PanelType::SingleStat => "singlestat",
                PanelType::BarGaugePanel => "barGaugePanel",
                PanelType::Heatmap => "heatmapPanel",
            };
            let legend = panel
                .legend_format
                .as_deref()
                .map(|l| format!("\n      legendFormat={},", jsonnet_str(l)))
                .unwrap_or_default();
            let _ = write!(
                out,
                "\n.addPanel(\n  {}.new(\n    datasource={},\n    title={},\n  ).addTarget(\n    prometheus.target(\n      expr={},{}\n    )\n  ), gridPos={{x: {}, y: {}, w: {}, h: {}}}\n)",
                constructor,
                jsonnet_str(GRAFANA_DATASOURCE),
                jsonnet_str(&panel.title),
                jsonnet_str(&panel.expr),
                legend,
                x,
                y,
                PANEL_WIDTH,
                PANEL_HEIGHT
            );
        }
        out.push('\n');
        out
    }

    /// Plain Grafana dashboard model
    pub fn to_json(&self) -> Value {
        let panels: Vec<Value> = self
            .panels
            .iter()
            .enumerate()
            .map(|(index, panel)| {
                let (x, y) = Self::grid_position(index);
                generate_panel(panel, index as u32 + 1, x, y)
            })
            .collect();

        json!({
            "id": null,
            "uid": self.uid(),
            "title": self.title.clone(),
            "tags": self.tags.clone(),
            "timezone": "browser",
            "schemaVersion": self.schema_version,
            "version": 0,
            "refresh": "10s",
            "time": {
                "from": self.time_from.clone(),
                "to": "now"
            },
            "templating": {
                "list": []
            },
            "annotations": {
                "list": [
                    {
                        "builtIn": 1,
                        "datasource": "-- Grafana --",
                        "enable": true,
                        "hide": true,
                        "iconColor": "rgba(0, 211, 255, 1)",
                        "name": "Annotations & Alerts",
                        "type": "dashboard"
                    }
                ]
            },
            "panels": panels
        })
    }
}

/// Generate a Grafana panel for a definition panel
fn generate_panel(panel: &GrafanaPanel, panel_id: u32, x: u32, y: u32) -> Value {
    let panel_type = match panel.panel_type {
        PanelType::GraphPanel => "graph",
        PanelType::SingleStat => "stat",
        PanelType::BarGaugePanel => "bargauge",
        PanelType::Heatmap => "heatmap",
    };

    json!({
        "id": panel_id,
        "gridPos": {
            "x": x,
            "y": y,
            "w": PANEL_WIDTH,
            "h": PANEL_HEIGHT
        },
        "type": panel_type,
        "title": panel.title.clone(),
        "datasource": GRAFANA_DATASOURCE,
        "targets": [
            {
                "expr": panel.expr.clone(),
                "legendFormat": panel.legend_format.clone().unwrap_or_default(),
                "refId": "A"
            }
        ]
    })
}

fn jsonnet_str(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}
