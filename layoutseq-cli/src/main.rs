use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use log::{info, warn};
use std::path::{Path, PathBuf};

// Import from layoutseq-core
use layoutseq_core::classifier::{ReplayLabeler, SequenceLabeler, WapitiLabeler};
use layoutseq_core::features::FeatureKind;
use layoutseq_core::processor::{DocumentProcessor, PipelineStages, ProcessOptions};
use layoutseq_core::storage::{FileStorage, LabelStorage, NoOpStorage};
use layoutseq_core::PipelineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LabelerKind {
    /// Run the wapiti executable with the configured models
    Wapiti,
    /// Replay pre-computed labeler responses from files
    Replay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// TEI-like markup
    Tei,
    /// Structure tree as JSON
    Json,
}

#[derive(Parser)]
#[command(name = "layoutseq")]
#[command(about = "Label ALTO page layouts with CRF models and rebuild structured TEI")]
struct Args {
    /// Path to the layout file (ALTO XML from pdfalto, or layout JSON)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Path to custom config file (YAML format)
    #[arg(short, long)]
    config: Option<String>,

    /// Print the default configuration as YAML and exit
    #[arg(long)]
    show_config: bool,

    /// Output file path (if not specified, auto-generated based on input)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Tei)]
    output_format: OutputFormat,

    /// Stop after segment features and write the vectors
    #[arg(long)]
    segment_only: bool,

    /// Which labeler answers the models
    #[arg(long, value_enum, default_value_t = LabelerKind::Wapiti)]
    labeler: LabelerKind,

    /// Path to the wapiti executable (overrides config)
    #[arg(long)]
    wapiti: Option<String>,

    /// Segment model path (overrides config)
    #[arg(long)]
    segment_model: Option<PathBuf>,

    /// Fulltext model path (overrides config)
    #[arg(long)]
    fulltext_model: Option<PathBuf>,

    /// Recorded segment responses (with --labeler replay)
    #[arg(long)]
    segment_responses: Option<PathBuf>,

    /// Recorded fulltext responses (with --labeler replay)
    #[arg(long)]
    fulltext_responses: Option<PathBuf>,

    /// Enable detailed profiling of all pipeline steps
    #[arg(long)]
    profile: bool,

    /// Skip cache lookups and storage for this run
    #[arg(long)]
    skip_cache: bool,

    /// Disable the on-disk cache entirely
    #[arg(long)]
    no_cache: bool,

    /// Cache directory (default: the platform cache dir + /layoutseq)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Dump all intermediate pipeline stage outputs to this directory
    /// Captures: vectors, labels, block groups and a JSON summary
    #[arg(long)]
    dump_stages: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if args.show_config {
        print!("{}", PipelineConfig::default().to_yaml()?);
        return Ok(());
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| anyhow!("No input given, pass --input <layout.xml>"))?;
    if !input.exists() {
        return Err(anyhow!("Input layout not found at: {}", input.display()));
    }

    let mut config = PipelineConfig::load_with_fallback(args.config.as_deref());
    match &args.config {
        Some(config_path) => info!("Loaded config from: {}", config_path),
        None => info!("Using default config"),
    }
    apply_overrides(&mut config, &args);

    let labeler = create_labeler(&args, &config)?;
    let storage = create_storage(&args)?;
    let processor = DocumentProcessor::new_with_dependencies(config, labeler, storage)?;

    if args.segment_only {
        let vectors = processor.segment_vectors_for_file(&input, args.skip_cache)?;
        let output_path = args
            .output
            .clone()
            .unwrap_or_else(|| derived_output(&input, "segment.vectors"));
        let mut content = vectors.join("\n");
        content.push('\n');
        std::fs::write(&output_path, content)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;
        println!(
            "Wrote {} segment vectors to {}",
            vectors.len(),
            output_path.display()
        );
        return Ok(());
    }

    let options = ProcessOptions {
        profile: args.profile,
        capture_stages: args.dump_stages.is_some(),
        skip_cache: args.skip_cache,
    };
    let output = processor
        .process_file(&input, options)
        .with_context(|| format!("Processing failed for {}", input.display()))?;

    if let (Some(stages), Some(dir)) = (&output.stages, &args.dump_stages) {
        save_stages(stages, &input, dir, &processor.config().grouping.body_label)?;
    }

    let (content, extension) = match args.output_format {
        OutputFormat::Tei => (output.reconstruction.markup.clone(), "tei.xml"),
        OutputFormat::Json => (
            serde_json::to_string_pretty(&output.reconstruction.tree)?,
            "tree.json",
        ),
    };
    let output_path = args
        .output
        .clone()
        .unwrap_or_else(|| derived_output(&input, extension));
    std::fs::write(&output_path, content)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;
    println!("Saved structured output to: {}", output_path.display());

    Ok(())
}

fn apply_overrides(config: &mut PipelineConfig, args: &Args) {
    if let Some(wapiti) = &args.wapiti {
        config.models.wapiti_path = wapiti.clone();
    }
    if let Some(model) = &args.segment_model {
        config.models.segment_model = Some(model.clone());
    }
    if let Some(model) = &args.fulltext_model {
        config.models.fulltext_model = Some(model.clone());
    }
}

fn create_labeler(args: &Args, config: &PipelineConfig) -> Result<Box<dyn SequenceLabeler>> {
    match args.labeler {
        LabelerKind::Wapiti => {
            if config.models.segment_model.is_none() {
                warn!("No segment model configured; only --segment-only can run");
            }
            Ok(Box::new(WapitiLabeler::from_config(&config.models)))
        }
        LabelerKind::Replay => {
            let mut labeler = ReplayLabeler::new();
            if let Some(path) = &args.segment_responses {
                labeler = labeler.with_file(FeatureKind::Segment, path);
            }
            if let Some(path) = &args.fulltext_responses {
                labeler = labeler.with_file(FeatureKind::Fulltext, path);
            }
            if args.segment_responses.is_none() && !args.segment_only {
                return Err(anyhow!("--labeler replay needs --segment-responses"));
            }
            Ok(Box::new(labeler))
        }
    }
}

fn create_storage(args: &Args) -> Result<Box<dyn LabelStorage>> {
    if args.no_cache {
        info!("Caching disabled");
        return Ok(Box::new(NoOpStorage::new()));
    }
    let cache_dir = match &args.cache_dir {
        Some(dir) => dir.clone(),
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory, pass --cache-dir"))?
            .join("layoutseq"),
    };
    info!("Using cache at {}", cache_dir.display());
    Ok(Box::new(FileStorage::new(&cache_dir)?))
}

/// `paper.xml` + `tei.xml` → `paper.tei.xml`, next to the input.
fn derived_output(input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    input.with_file_name(format!("{stem}.{extension}"))
}

fn save_stages(
    stages: &PipelineStages,
    input: &Path,
    output_dir: &Path,
    body_label: &str,
) -> Result<()> {
    stages.save_to_dir(output_dir)?;

    // Summary file: quick reference for validation scripts
    let summary = serde_json::json!({
        "input": input.display().to_string(),
        "captured_at": chrono::Utc::now().to_rfc3339(),
        "stage_counts": {
            "pages": stages.layout.pages,
            "blocks": stages.layout.blocks,
            "tokens": stages.layout.tokens,
            "segment_lines": stages.segment_vectors.len(),
            "body_blocks": stages.groups.blocks(body_label).len(),
            "disputed_blocks": stages.groups.disputed.len(),
            "fulltext_tokens": stages.fulltext_vectors.len(),
        }
    });
    let summary_path = output_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&summary)?)?;
    info!("Stage summary written to {}", summary_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layoutseq_core::grouping::BlockGroups;
    use layoutseq_core::processor::LayoutSummary;
    use layoutseq_core::{BlockRef, MainAreas};

    #[test]
    fn test_derived_output_sits_next_to_input() {
        let path = derived_output(Path::new("/data/paper.xml"), "tei.xml");
        assert_eq!(path, PathBuf::from("/data/paper.tei.xml"));
    }

    #[test]
    fn test_model_overrides_apply() {
        let args = Args::parse_from([
            "layoutseq",
            "--input",
            "paper.xml",
            "--wapiti",
            "/opt/wapiti",
            "--segment-model",
            "seg.wapiti",
        ]);
        let mut config = PipelineConfig::default();
        apply_overrides(&mut config, &args);
        assert_eq!(config.models.wapiti_path, "/opt/wapiti");
        assert_eq!(config.models.segment_model, Some(PathBuf::from("seg.wapiti")));
        assert_eq!(config.models.fulltext_model, None);
    }

    #[test]
    fn test_replay_requires_segment_responses() {
        let args = Args::parse_from(["layoutseq", "-i", "paper.xml", "--labeler", "replay"]);
        let err = create_labeler(&args, &PipelineConfig::default()).err().unwrap();
        assert!(err.to_string().contains("--segment-responses"));
    }

    #[test]
    fn test_stage_summary_counts_configured_body_label() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut groups = BlockGroups::default();
        groups.categories.insert(
            "<text>".to_string(),
            vec![
                BlockRef { page_index: 0, block_index: 0 },
                BlockRef { page_index: 0, block_index: 1 },
            ],
        );
        let stages = PipelineStages {
            layout: LayoutSummary { pages: 1, blocks: 2, tokens: 4 },
            main_areas: MainAreas::default(),
            segment_vectors: vec![],
            segment_labels: vec![],
            groups,
            fulltext_vectors: vec![],
            fulltext_labels: vec![],
            tokens: vec![],
        };
        let dir = temp_dir.path().join("stages");
        save_stages(&stages, Path::new("paper.xml"), &dir, "<text>").unwrap();

        let summary: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(dir.join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["stage_counts"]["body_blocks"], 2);
    }
}
