use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{ConfgenError, Result};

/// Generation request: where definitions come from, where artifacts go, and what to filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    pub src_folder: PathBuf,
    pub dest_conf_file: PathBuf,
    pub dest_doc_file: PathBuf,
    pub dest_dashboard_folder: PathBuf,
    pub dest_grafana_jsonnet_folder: PathBuf,
    /// Definitions carrying any of these tags are dropped
    pub skip_with_tags: Vec<String>,
    /// When non-empty, only these pipeline stages are generated
    pub generate_stages: Vec<String>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            src_folder: PathBuf::from(constants::DEFAULT_SRC_FOLDER),
            dest_conf_file: PathBuf::from(constants::DEFAULT_DEST_CONF_FILE),
            dest_doc_file: PathBuf::from(constants::DEFAULT_DEST_DOC_FILE),
            dest_dashboard_folder: PathBuf::from(constants::DEFAULT_DEST_DASHBOARD_FOLDER),
            dest_grafana_jsonnet_folder: PathBuf::from(constants::DEFAULT_DEST_JSONNET_FOLDER),
            skip_with_tags: Vec::new(),
            generate_stages: Vec::new(),
        }
    }
}

/// Options as read from a TOML options file; every field is optional.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptionsFile {
    pub src_folder: Option<PathBuf>,
    pub dest_conf_file: Option<PathBuf>,
    pub dest_doc_file: Option<PathBuf>,
    pub dest_dashboard_folder: Option<PathBuf>,
    pub dest_grafana_jsonnet_folder: Option<PathBuf>,
    pub skip_with_tags: Option<Vec<String>>,
    pub generate_stages: Option<Vec<String>>,
}

impl OptionsFile {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfgenError::io(path, e))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Overlay this file's values onto `base`
    pub fn apply(self, mut base: Options) -> Options {
        if let Some(v) = self.src_folder {
            base.src_folder = v;
        }
        if let Some(v) = self.dest_conf_file {
            base.dest_conf_file = v;
        }
        if let Some(v) = self.dest_doc_file {
            base.dest_doc_file = v;
        }
        if let Some(v) = self.dest_dashboard_folder {
            base.dest_dashboard_folder = v;
        }
        if let Some(v) = self.dest_grafana_jsonnet_folder {
            base.dest_grafana_jsonnet_folder = v;
        }
        if let Some(v) = self.skip_with_tags {
            base.skip_with_tags = v;
        }
        if let Some(v) = self.generate_stages {
            base.generate_stages = v;
        }
        base
    }
}

/// Split comma-separated list arguments, dropping empty entries
pub fn split_list<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_file_overrides_defaults() {
        let file = OptionsFile::from_toml(
            r#"
src_folder = "defs"
skip_with_tags = ["kubernetes"]
"#,
        )
        .unwrap();

        let opts = file.apply(Options::default());
        assert_eq!(opts.src_folder, PathBuf::from("defs"));
        assert_eq!(opts.skip_with_tags, vec!["kubernetes".to_string()]);
        assert_eq!(opts.dest_doc_file, PathBuf::from(constants::DEFAULT_DEST_DOC_FILE));
        assert!(opts.generate_stages.is_empty());
    }

    #[test]
    fn test_options_file_rejects_unknown_keys() {
        let result = OptionsFile::from_toml("srcFolder = \"defs\"");
        assert!(matches!(result, Err(ConfgenError::Toml(_))));
    }

    #[test]
    fn test_split_list_handles_commas_and_repeats() {
        let values = vec!["a, b".to_string(), "c".to_string(), ",".to_string()];
        assert_eq!(split_list(&values), vec!["a", "b", "c"]);
    }
}
