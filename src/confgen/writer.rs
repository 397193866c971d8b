//! Artifact writers. Parent folders are created as needed; every failure is
//! reported as an I/O error naming the path.

use std::fs;
use std::path::Path;
use tracing::info;

use super::grafana::Dashboard;
use super::pipeline::PipelineConfig;
use crate::error::{ConfgenError, Result};

fn write_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| ConfgenError::io(parent, e))?;
    }
    fs::write(path, content).map_err(|e| ConfgenError::io(path, e))
}

pub fn write_config_file(path: &Path, config: &PipelineConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config)?;
    write_file(path, yaml.as_bytes())?;
    info!("wrote pipeline config {}", path.display());
    Ok(())
}

pub fn write_doc(path: &Path, doc: &str) -> Result<()> {
    write_file(path, doc.as_bytes())?;
    info!("wrote metrics documentation {}", path.display());
    Ok(())
}

/// Write each dashboard as `<name>.jsonnet` and `<name>.json`
pub fn write_dashboards(
    jsonnet_folder: &Path,
    json_folder: &Path,
    dashboards: &[Dashboard],
) -> Result<()> {
    fs::create_dir_all(jsonnet_folder).map_err(|e| ConfgenError::io(jsonnet_folder, e))?;
    fs::create_dir_all(json_folder).map_err(|e| ConfgenError::io(json_folder, e))?;

    for dashboard in dashboards {
        let jsonnet_path = jsonnet_folder.join(format!("{}.jsonnet", dashboard.name));
        write_file(&jsonnet_path, dashboard.to_jsonnet().as_bytes())?;

        let json_path = json_folder.join(format!("{}.json", dashboard.name));
        let json = serde_json::to_string_pretty(&dashboard.to_json())?;
        write_file(&json_path, json.as_bytes())?;
    }
    info!(
        "wrote {} dashboards to {} and {}",
        dashboards.len(),
        jsonnet_folder.display(),
        json_folder.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GrafanaPanel, PanelType};
    use tempfile::tempdir;

    fn dashboard() -> Dashboard {
        Dashboard {
            name: "totals".into(),
            title: "Totals".into(),
            time_from: "now-1h".into(),
            tags: vec!["flp".into()],
            schema_version: 27,
            panels: vec![GrafanaPanel {
                title: "Bytes".into(),
                panel_type: PanelType::SingleStat,
                expr: "sum(flp_bytes)".into(),
                legend_format: None,
                dashboard: "totals".into(),
                metric: None,
                references: vec![],
            }],
        }
    }

    #[test]
    fn test_write_doc_creates_parent_folders() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/docs/metrics.md");
        write_doc(&path, "# Metrics\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "# Metrics\n");
    }

    #[test]
    fn test_write_dashboards_in_both_formats() {
        let dir = tempdir().unwrap();
        let jsonnet = dir.path().join("jsonnet");
        let json = dir.path().join("dashboards");
        write_dashboards(&jsonnet, &json, &[dashboard()]).unwrap();

        let text = fs::read_to_string(jsonnet.join("totals.jsonnet")).unwrap();
        assert!(text.contains("singlestat.new("));

        let model: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(json.join("totals.json")).unwrap()).unwrap();
        assert_eq!(model["panels"][0]["type"], "stat");
    }

    #[test]
    fn test_write_into_file_path_fails_with_io() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let result = write_doc(&blocker.join("metrics.md"), "x");
        assert!(matches!(result, Err(ConfgenError::Io { .. })));
    }
}
