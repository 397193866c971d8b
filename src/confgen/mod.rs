//! Pipeline config generation
//!
//! A run loads the base config, parses every definition under the source
//! folder, merges their rules once and then writes the pipeline config and,
//! unless a truncated stage list was requested, the docs and dashboards.

pub mod config;
pub mod dedup;
pub mod definition;
pub mod discovery;
pub mod doc;
pub mod extractors;
pub mod grafana;
pub mod pipeline;
pub mod writer;

pub use config::Config;
pub use dedup::RuleSet;
pub use definition::{Definition, Definitions, ParseOutcome};
pub use grafana::Dashboard;
pub use pipeline::{ConfigAssembler, PipelineConfig};

use std::fs;
use tracing::{debug, info, warn};

use crate::constants::CONFIG_FILE_NAME;
use crate::error::{ConfgenError, Result};
use crate::metrics::ConfgenMetrics;
use crate::options::Options;

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub discovered: usize,
    pub accepted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub truncated: bool,
}

pub struct ConfGen {
    opts: Options,
    config: Option<Config>,
    definitions: Definitions,
}

impl ConfGen {
    pub fn new(opts: Options) -> Self {
        Self {
            opts,
            config: None,
            definitions: Definitions::new(),
        }
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = Some(config);
    }

    pub fn config(&self) -> Option<&Config> {
        self.config.as_ref()
    }

    pub fn options(&self) -> &Options {
        &self.opts
    }

    /// Definitions accepted so far, in parse order
    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    /// Prefix the prom encoder puts in front of metric names; empty until a config is set
    pub fn metrics_prefix(&self) -> &str {
        self.config.as_ref().map(Config::metrics_prefix).unwrap_or("")
    }

    /// Run a full generation.
    ///
    /// Per-definition failures are logged and counted; only base config and
    /// artifact write failures abort the run.
    pub fn run(&mut self) -> Result<RunSummary> {
        let config_path = self.opts.src_folder.join(CONFIG_FILE_NAME);
        let config = Config::load(&config_path)?;
        info!("loaded base config {}", config_path.display());
        self.set_config(config);

        let files = discovery::get_definition_files(&self.opts.src_folder);
        let mut summary = RunSummary {
            discovered: files.len(),
            truncated: !self.opts.generate_stages.is_empty(),
            ..RunSummary::default()
        };

        for path in &files {
            let bytes = match fs::read(path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!("cannot read definition {}: {}", path.display(), e);
                    ConfgenMetrics::record_definition_failed("io");
                    summary.failed += 1;
                    continue;
                }
            };

            match self.parse_definition(path, &bytes) {
                Ok(ParseOutcome::Accepted) => summary.accepted += 1,
                Ok(ParseOutcome::Skipped { .. }) => summary.skipped += 1,
                Err(err) if err.is_definition_error() => summary.failed += 1,
                Err(err) => return Err(err),
            }
        }
        debug!("{:?}", summary);

        let rules = self.dedupe();
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| ConfgenError::validation("base config is not loaded"))?;
        let assembler = ConfigAssembler::new(config, &rules);

        if summary.truncated {
            let pipeline = assembler.generate_truncated(&self.opts.generate_stages)?;
            writer::write_config_file(&self.opts.dest_conf_file, &pipeline)?;
            return Ok(summary);
        }

        let pipeline = assembler.generate_full();
        writer::write_config_file(&self.opts.dest_conf_file, &pipeline)?;

        let doc = doc::generate_doc(&self.definitions, &rules, config.metrics_prefix());
        writer::write_doc(&self.opts.dest_doc_file, &doc)?;

        let dashboards = grafana::generate_dashboards(config, &rules);
        writer::write_dashboards(
            &self.opts.dest_grafana_jsonnet_folder,
            &self.opts.dest_dashboard_folder,
            &dashboards,
        )?;

        Ok(summary)
    }
}
