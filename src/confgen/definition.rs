use serde::Deserialize;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::extractors;
use super::ConfGen;
use crate::api::{Aggregates, ExtractTimebased, PromEncode, TransformNetwork, Visualization};
use crate::constants::DEFINITION_HEADER;
use crate::error::{ConfgenError, Result};
use crate::metrics::ConfgenMetrics;

/// On-disk shape of a definition document. Unknown top-level keys are rejected;
/// the rule sections stay untyped until the extractors decode them.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DefFile {
    // A key left empty (`details:`) decodes as null; treat it as ""
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    details: Option<String>,
    #[serde(default)]
    usage: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    transform: Option<Value>,
    #[serde(default)]
    extract: Option<Value>,
    #[serde(default)]
    encode: Option<Value>,
    #[serde(default)]
    visualization: Option<Value>,
}

/// One parsed definition document. Never modified after parsing.
#[derive(Debug, Clone, PartialEq)]
pub struct Definition {
    pub file_name: PathBuf,
    pub description: String,
    pub details: String,
    pub usage: String,
    pub tags: BTreeSet<String>,
    pub transform_network: Option<TransformNetwork>,
    pub aggregates: Option<Aggregates>,
    pub extract_timebased: Option<ExtractTimebased>,
    pub prom_encode: Option<PromEncode>,
    pub visualization: Option<Visualization>,
}

pub type Definitions = Vec<Definition>;

/// What happened to a definition that parsed without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Accepted,
    Skipped { tag: String },
}

enum Parsed {
    Definition(Box<Definition>),
    Skipped(String),
}

/// Check that `bytes` starts with the definition marker
pub fn check_header(bytes: &[u8]) -> bool {
    bytes.starts_with(DEFINITION_HEADER.as_bytes())
}

impl ConfGen {
    /// Parse one definition document and append it to the run on success.
    ///
    /// Errors leave the run untouched; callers log them and move on to the
    /// next file.
    pub fn parse_definition(&mut self, name: &Path, bytes: &[u8]) -> Result<ParseOutcome> {
        match self.build_definition(name, bytes) {
            Ok(Parsed::Definition(definition)) => {
                self.definitions.push(*definition);
                ConfgenMetrics::record_definition_accepted();
                Ok(ParseOutcome::Accepted)
            }
            Ok(Parsed::Skipped(tag)) => {
                info!("skipping definition {} due to skip tag {}", name.display(), tag);
                ConfgenMetrics::record_definition_skipped();
                Ok(ParseOutcome::Skipped { tag })
            }
            Err(err) => {
                debug!("{}: parse definition err: {}", name.display(), err);
                ConfgenMetrics::record_definition_failed(err.kind());
                Err(err)
            }
        }
    }

    fn build_definition(&self, name: &Path, bytes: &[u8]) -> Result<Parsed> {
        if !check_header(bytes) {
            return Err(ConfgenError::HeaderMismatch {
                path: name.to_path_buf(),
            });
        }

        let def_file: DefFile =
            serde_yaml::from_slice(bytes).map_err(|source| ConfgenError::Schema {
                path: name.to_path_buf(),
                source,
            })?;

        let tags = def_file.tags.unwrap_or_default();
        if let Some(tag) = self
            .opts
            .skip_with_tags
            .iter()
            .find(|skip| tags.contains(skip))
        {
            return Ok(Parsed::Skipped(tag.clone()));
        }

        let transform_network = extractors::parse_transform(def_file.transform.as_ref())?;
        let extract = extractors::parse_extract(def_file.extract.as_ref())?;
        let prom_encode = extractors::parse_encode(def_file.encode.as_ref(), extract.as_ref())?;
        let visualization = extractors::parse_visualization(
            def_file.visualization.as_ref(),
            prom_encode.as_ref(),
            self.metrics_prefix(),
        )?;

        let aggregates = extract.as_ref().and_then(|e| e.aggregates()).cloned();
        let extract_timebased = extract.as_ref().and_then(|e| e.timebased()).cloned();

        Ok(Parsed::Definition(Box::new(Definition {
            file_name: name.to_path_buf(),
            description: def_file.description.unwrap_or_default(),
            details: def_file.details.unwrap_or_default(),
            usage: def_file.usage.unwrap_or_default(),
            tags: tags.into_iter().collect(),
            transform_network,
            aggregates,
            extract_timebased,
            prom_encode,
            visualization,
        })))
    }
}
