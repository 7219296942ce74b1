use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use docsort::core::profile::{CalibrationProfile, CANONICAL_PROFILE};
use docsort::export::{Exporter, JsonExporter, PageReport, TextExporter};
use docsort::ocr::{FileCache, OcrCache, TesseractBridge, DEFAULT_OCR_LANGUAGE};
use docsort::text::ComplianceParams;
use docsort::{ClassificationPipeline, Classification, Language, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "docsort")]
#[command(version, about = "Classify scanned pages as advertisements or scientific articles", long_about = None)]
struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one page image and print the result as JSON
    Classify {
        input: PathBuf,

        #[command(flatten)]
        options: ClassifyOptions,
    },

    /// Classify several page images
    Batch {
        inputs: Vec<PathBuf>,

        /// Write one JSON line per page to this file
        #[arg(long)]
        report: Option<PathBuf>,

        #[command(flatten)]
        options: ClassifyOptions,
    },

    /// List built-in calibration profiles
    Profiles,

    /// Manage the OCR result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
    /// Delete every cached OCR result
    Clear {
        #[arg(long, default_value = ".cache_ocr")]
        cache_dir: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
struct ClassifyOptions {
    /// Built-in profile id or family name
    #[arg(long, default_value = CANONICAL_PROFILE)]
    profile: String,

    /// Calibration profile JSON file (takes precedence over --profile)
    #[arg(long)]
    profile_file: Option<PathBuf>,

    /// Word count that must be exceeded
    #[arg(long, default_value_t = 2000)]
    min_words: usize,

    /// Paragraph count that must be reached
    #[arg(long, default_value_t = 8)]
    min_paragraphs: usize,

    /// Language of messages: pt or en
    #[arg(long, default_value = "pt")]
    language: Language,

    /// Tesseract language code
    #[arg(long, default_value = DEFAULT_OCR_LANGUAGE)]
    ocr_language: String,

    /// OCR time budget in seconds
    #[arg(long, default_value_t = 30)]
    ocr_timeout: u64,

    /// Skip text analysis even if tesseract is installed
    #[arg(long)]
    no_ocr: bool,

    #[arg(long, default_value = ".cache_ocr")]
    cache_dir: PathBuf,

    /// Write <stem>.json and <stem>.txt here
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl ClassifyOptions {
    fn compliance(&self) -> ComplianceParams {
        ComplianceParams {
            min_words: self.min_words,
            min_paragraphs: self.min_paragraphs,
            language: self.language,
        }
    }

    fn profile(&self) -> Result<CalibrationProfile> {
        let profile = match &self.profile_file {
            Some(path) => CalibrationProfile::from_file(path)?,
            None => CalibrationProfile::lookup(&self.profile)?,
        };
        Ok(profile)
    }

    fn build_pipeline(&self) -> Result<ClassificationPipeline> {
        let mut config = PipelineConfig::new(self.profile()?)
            .with_compliance(self.compliance())
            .with_ocr_timeout(Duration::from_secs(self.ocr_timeout));
        config.ocr_language = self.ocr_language.clone();
        let pipeline = ClassificationPipeline::new(config);

        if self.no_ocr {
            return Ok(pipeline);
        }
        let bridge = TesseractBridge::new();
        match bridge.probe() {
            Ok(version) => {
                info!(%version, "text analysis enabled");
                let cache: Arc<dyn OcrCache> = Arc::new(FileCache::new(self.cache_dir.clone()));
                Ok(pipeline.with_ocr(Arc::new(bridge), cache))
            }
            Err(err) => {
                warn!(%err, "tesseract unavailable, text analysis disabled");
                Ok(pipeline)
            }
        }
    }

    fn exporters(&self) -> Vec<Box<dyn Exporter>> {
        match &self.output {
            Some(dir) => vec![
                Box::new(JsonExporter::new(dir.clone())),
                Box::new(TextExporter::new(dir.clone())),
            ],
            None => Vec::new(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Classify { input, options } => classify_single(&input, &options),
        Commands::Batch {
            inputs,
            report,
            options,
        } => classify_batch(&inputs, report.as_deref(), &options),
        Commands::Profiles => list_profiles(),
        Commands::Cache {
            action: CacheAction::Clear { cache_dir },
        } => {
            FileCache::new(cache_dir.clone())
                .clear()
                .with_context(|| format!("Failed to clear {}", cache_dir.display()))?;
            println!("Cleared {}", cache_dir.display());
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "docsort=debug" } else { "docsort=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn classify_file(
    pipeline: &ClassificationPipeline,
    input: &Path,
    options: &ClassifyOptions,
) -> Result<PageReport> {
    if !input.is_file() {
        anyhow::bail!("Input is not a file: {}", input.display());
    }
    let result = pipeline
        .classify_path(input, &pipeline.config().compliance)
        .with_context(|| format!("Failed to classify {}", input.display()))?;
    let report = PageReport::new(input.to_path_buf(), result);
    for exporter in options.exporters() {
        exporter.export(&report)?;
    }
    Ok(report)
}

fn classify_single(input: &Path, options: &ClassifyOptions) -> Result<()> {
    let pipeline = options.build_pipeline()?;
    let report = classify_file(&pipeline, input, options)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn classify_batch(inputs: &[PathBuf], report: Option<&Path>, options: &ClassifyOptions) -> Result<()> {
    if inputs.is_empty() {
        anyhow::bail!("No input files specified");
    }
    let pipeline = options.build_pipeline()?;
    let mut sink = report
        .map(|path| {
            File::create(path)
                .map(BufWriter::new)
                .with_context(|| format!("Failed to create {}", path.display()))
        })
        .transpose()?;

    let (mut ads, mut articles, mut failed) = (0usize, 0usize, 0usize);
    for (i, input) in inputs.iter().enumerate() {
        match classify_file(&pipeline, input, options) {
            Ok(page) => {
                println!(
                    "[{}/{}] {}: {} ({:.2})",
                    i + 1,
                    inputs.len(),
                    input.display(),
                    page.result.classification,
                    page.result.confidence
                );
                match page.result.classification {
                    Classification::Advertisement => ads += 1,
                    Classification::ScientificArticle => articles += 1,
                }
                if let Some(sink) = sink.as_mut() {
                    serde_json::to_writer(&mut *sink, &page)?;
                    sink.write_all(b"\n")?;
                }
            }
            Err(err) => {
                eprintln!("[{}/{}] {}: failed: {err:#}", i + 1, inputs.len(), input.display());
                failed += 1;
            }
        }
    }
    if let Some(mut sink) = sink {
        sink.flush()?;
    }

    println!("\nSummary: {ads} advertisement(s), {articles} scientific article(s), {failed} failed");
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed to classify");
    }
    Ok(())
}

fn list_profiles() -> Result<()> {
    for profile in CalibrationProfile::builtin() {
        let marker = if profile.id() == CANONICAL_PROFILE { "*" } else { " " };
        println!(
            "{marker} {:<16} {} rules  {}",
            profile.id(),
            profile.rules.len(),
            profile.description
        );
    }
    Ok(())
}
