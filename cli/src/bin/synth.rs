use std::path::PathBuf;

use annotator::{AnnotateConfig, AnnotateReport, AnnotationBuilder};
use clap::{Args, Parser, Subcommand};
use cli::{RunConfig, SchemaTarget, schema_json};
use color_eyre::eyre::Result;
use compositor::{ComposeConfig, ComposeReport, Compositor};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Composite foregrounds onto backgrounds and write instance masks
    Compose {
        /// Path to a TOML or JSON compositor configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[command(flatten)]
        overrides: ComposeOverrides,
    },
    /// Build the COCO manifest from a composed dataset
    Annotate {
        /// Directory that image and mask paths are relative to
        #[arg(short, long, default_value = "output")]
        dataset_dir: PathBuf,
        /// Mask definitions file (default: <dataset-dir>/mask_definitions.json)
        #[arg(long)]
        mask_definitions: Option<PathBuf>,
        /// Dataset info file (default: <dataset-dir>/dataset_info.json)
        #[arg(long)]
        dataset_info: Option<PathBuf>,
        /// Manifest path (default: <dataset-dir>/coco_instances.json)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Polygon simplification tolerance in pixels
        #[arg(long, default_value = "1.0")]
        tolerance: f32,
        /// Regions of at most this many pixels get no polygon
        #[arg(long, default_value = "16")]
        min_region_area: u64,
        #[arg(long)]
        threads: Option<usize>,
    },
    /// Compose, then annotate, from one configuration file
    Run {
        /// Path to a TOML or JSON file with [compose] and [annotate] tables
        #[arg(short, long)]
        config: PathBuf,
        #[command(flatten)]
        overrides: ComposeOverrides,
    },
    /// Print the JSON Schema of a file format
    Schema {
        #[arg(value_enum)]
        target: SchemaTarget,
    },
}

#[derive(Args)]
struct ComposeOverrides {
    /// Directory holding foregrounds/ and backgrounds/
    #[arg(short, long)]
    input_dir: Option<PathBuf>,
    /// Output dataset directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
    /// Number of composites to generate
    #[arg(short = 'n', long)]
    count: Option<usize>,
    #[arg(long)]
    seed: Option<u64>,
    #[arg(long)]
    threads: Option<usize>,
}

impl ComposeOverrides {
    fn apply(&self, config: &mut ComposeConfig) {
        if let Some(input_dir) = &self.input_dir {
            config.input_dir = input_dir.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(count) = self.count {
            config.count = count;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if self.threads.is_some() {
            config.threads = self.threads;
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Compose { config, overrides } => {
            let mut compose = match config {
                Some(path) => ComposeConfig::from_file(path)?,
                None => ComposeConfig::default(),
            };
            overrides.apply(&mut compose);
            compose_dataset(compose)?;
        }
        Commands::Annotate {
            dataset_dir,
            mask_definitions,
            dataset_info,
            output,
            tolerance,
            min_region_area,
            threads,
        } => {
            let config = AnnotateConfig {
                dataset_dir: dataset_dir.clone(),
                mask_definitions: mask_definitions.clone(),
                dataset_info: dataset_info.clone(),
                output: output.clone(),
                tolerance: *tolerance,
                min_region_area: *min_region_area,
                threads: *threads,
            };
            annotate_dataset(config)?;
        }
        Commands::Run { config, overrides } => {
            let mut run = RunConfig::from_file(config)?;
            overrides.apply(&mut run.compose);
            let annotate = run.annotate_config();
            compose_dataset(run.compose)?;
            annotate_dataset(annotate)?;
        }
        Commands::Schema { target } => {
            println!("{}", schema_json(*target)?);
        }
    }

    Ok(())
}

fn compose_dataset(config: ComposeConfig) -> Result<ComposeReport> {
    info!("🖼️  Scanning assets in {}", config.input_dir.display());
    let report = Compositor::from_config(config)?.run()?;

    info!(
        "✅ Composed {} samples with {} instances ({} dropped)",
        report.samples, report.instances, report.dropped
    );
    if !report.is_clean() {
        warn!(
            "{} warnings, {} failed samples",
            report.warnings.len(),
            report.failures.len()
        );
        for failure in report.failures.iter().take(5) {
            warn!("  {failure}");
        }
        if report.failures.len() > 5 {
            warn!("  ... and {} more failures", report.failures.len() - 5);
        }
    }
    info!("📄 Mask definitions: {}", report.mask_definitions_path.display());
    Ok(report)
}

fn annotate_dataset(config: AnnotateConfig) -> Result<AnnotateReport> {
    let report = AnnotationBuilder::new(config)?.run()?;

    info!(
        "✅ Annotated {} images with {} annotations",
        report.images, report.annotations
    );
    if !report.dropped.is_empty() {
        warn!("{} masks produced no polygon", report.dropped.len());
    }
    for failure in report.failures.iter().take(5) {
        warn!("  skipped {}: {}", failure.image_file_name, failure.reason);
    }
    if report.failures.len() > 5 {
        warn!("  ... and {} more skipped images", report.failures.len() - 5);
    }
    info!("📄 Manifest: {}", report.output_path.display());
    Ok(report)
}
