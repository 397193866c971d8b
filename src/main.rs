use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};

use flp_confgen::logging;
use flp_confgen::options::{split_list, Options, OptionsFile};
use flp_confgen::ConfGen;

#[derive(Parser)]
#[command(name = "flp-confgen")]
#[command(about = "Generate flowlogs-pipeline config, docs and dashboards from network definitions")]
#[command(version = "0.1.0")]
struct Cli {
    /// TOML options file; command line flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Folder holding config.yaml and the network definitions
    #[arg(long)]
    src_folder: Option<PathBuf>,

    /// Destination of the generated pipeline config
    #[arg(long)]
    dest_conf_file: Option<PathBuf>,

    /// Destination of the generated metrics documentation
    #[arg(long)]
    dest_doc_file: Option<PathBuf>,

    /// Folder for generated Grafana JSON dashboards
    #[arg(long)]
    dest_dashboard_folder: Option<PathBuf>,

    /// Folder for generated grafonnet dashboards
    #[arg(long)]
    dest_grafana_jsonnet_folder: Option<PathBuf>,

    /// Skip definitions carrying any of these tags (comma-separated)
    #[arg(long)]
    skip_with_tags: Vec<String>,

    /// Only generate these pipeline stages (comma-separated), e.g. transform,extract
    #[arg(long)]
    generate_stages: Vec<String>,

    /// Log level, overridden by RUST_LOG
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also write JSON logs to this folder
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn options(&self) -> anyhow::Result<Options> {
        let mut opts = Options::default();
        if let Some(path) = &self.config {
            opts = OptionsFile::load(path)
                .with_context(|| format!("loading options file {}", path.display()))?
                .apply(opts);
        }

        if let Some(v) = &self.src_folder {
            opts.src_folder = v.clone();
        }
        if let Some(v) = &self.dest_conf_file {
            opts.dest_conf_file = v.clone();
        }
        if let Some(v) = &self.dest_doc_file {
            opts.dest_doc_file = v.clone();
        }
        if let Some(v) = &self.dest_dashboard_folder {
            opts.dest_dashboard_folder = v.clone();
        }
        if let Some(v) = &self.dest_grafana_jsonnet_folder {
            opts.dest_grafana_jsonnet_folder = v.clone();
        }
        if !self.skip_with_tags.is_empty() {
            opts.skip_with_tags = split_list(&self.skip_with_tags);
        }
        if !self.generate_stages.is_empty() {
            opts.generate_stages = split_list(&self.generate_stages);
        }
        Ok(opts)
    }
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_dir.as_deref());

    let opts = cli.options()?;
    info!("generating from {}", opts.src_folder.display());

    let mut confgen = ConfGen::new(opts);
    let summary = match confgen.run() {
        Ok(summary) => summary,
        Err(e) => {
            error!("generation failed: {}", e);
            return Err(e.into());
        }
    };

    let opts = confgen.options();
    println!("Definitions found: {}", summary.discovered);
    println!("   Accepted: {}", summary.accepted);
    println!("   Skipped: {}", summary.skipped);
    println!("   Failed: {}", summary.failed);
    println!("Pipeline config: {}", opts.dest_conf_file.display());
    if summary.truncated {
        println!("Truncated stages: {}", opts.generate_stages.join(", "));
    } else {
        println!("Documentation: {}", opts.dest_doc_file.display());
        println!("Dashboards: {}", opts.dest_dashboard_folder.display());
        println!("Jsonnet: {}", opts.dest_grafana_jsonnet_folder.display());
    }
    Ok(())
}
