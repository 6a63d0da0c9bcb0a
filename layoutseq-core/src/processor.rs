use crate::area::AreaEstimator;
use crate::cache::{LabelCacheKey, LabelCacheValue, LayoutCacheValue};
use crate::classifier::{align_responses, LabeledLine, LabeledToken, SequenceLabeler};
use crate::config::PipelineConfig;
use crate::features::{
    vectorize_all, FeatureKind, FulltextEncoder, SegmentEncoder, SegmentRecord,
};
use crate::grouping::{BlockGroups, BlockGrouper};
use crate::preprocessors::preprocessor_for;
use crate::storage::{calculate_input_hash, calculate_vectors_hash, LabelStorage, NoOpStorage};
use crate::structure::{Reconstruction, StructureReconstructor};
use crate::types::{LayoutDocument, MainAreas};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};

/// Counts describing the parsed layout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutSummary {
    pub pages: usize,
    pub blocks: usize,
    pub tokens: usize,
}

impl LayoutSummary {
    pub fn of(doc: &LayoutDocument) -> Self {
        Self {
            pages: doc.pages.len(),
            blocks: doc.block_count(),
            tokens: doc.token_count(),
        }
    }
}

/// Captured intermediate outputs from each pipeline stage
/// Used for testing and diagnostics, dumped with `--dump-stages`
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStages {
    pub layout: LayoutSummary,
    pub main_areas: MainAreas,
    pub segment_vectors: Vec<String>,
    pub segment_labels: Vec<LabeledLine>,
    pub groups: BlockGroups,
    pub fulltext_vectors: Vec<String>,
    pub fulltext_labels: Vec<LabeledLine>,
    pub tokens: Vec<LabeledToken>,
}

impl PipelineStages {
    /// Write every stage into `dir`, one file per boundary.
    pub fn save_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create stage directory {}", dir.display()))?;

        write_lines(&dir.join("segment.vectors"), &self.segment_vectors)?;
        write_lines(&dir.join("fulltext.vectors"), &self.fulltext_vectors)?;
        write_labeled(&dir.join("segment.labels"), &self.segment_labels)?;
        write_labeled(&dir.join("fulltext.labels"), &self.fulltext_labels)?;
        fs::write(
            dir.join("stages.json"),
            serde_json::to_string_pretty(&StageSummary::from(self))?,
        )?;

        info!("Saved pipeline stages to {}", dir.display());
        Ok(())
    }
}

#[derive(Serialize)]
struct StageSummary<'a> {
    layout: &'a LayoutSummary,
    main_areas: &'a MainAreas,
    groups: &'a BlockGroups,
    segment_lines: usize,
    fulltext_tokens: usize,
}

impl<'a> From<&'a PipelineStages> for StageSummary<'a> {
    fn from(stages: &'a PipelineStages) -> Self {
        Self {
            layout: &stages.layout,
            main_areas: &stages.main_areas,
            groups: &stages.groups,
            segment_lines: stages.segment_vectors.len(),
            fulltext_tokens: stages.fulltext_vectors.len(),
        }
    }
}

fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut content = lines.join("\n");
    content.push('\n');
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn write_labeled(path: &Path, lines: &[LabeledLine]) -> Result<()> {
    let lines: Vec<String> = lines
        .iter()
        .map(|line| format!("{}\t{}", line.features, line.label))
        .collect();
    write_lines(path, &lines)
}

/// Simple profiler that collects timings for pipeline steps
pub struct StepProfiler {
    enabled: bool,
    timings: Vec<(String, Duration)>,
}

impl StepProfiler {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timings: Vec::new(),
        }
    }

    pub fn time_step<F, R>(&mut self, step_name: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if !self.enabled {
            return f();
        }

        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.timings.push((step_name.to_string(), elapsed));
        info!("{}: {}ms", step_name, elapsed.as_millis());

        result
    }

    pub fn timings(&self) -> &[(String, Duration)] {
        &self.timings
    }

    pub fn log_summary(&self) {
        if !self.enabled || self.timings.is_empty() {
            return;
        }

        info!("Performance summary:");
        let total: Duration = self.timings.iter().map(|(_, d)| *d).sum();

        for (step, duration) in &self.timings {
            let percentage = if total.is_zero() {
                0.0
            } else {
                (duration.as_secs_f64() / total.as_secs_f64()) * 100.0
            };
            info!(
                "   {:.<35} {}ms ({:.1}%)",
                step,
                duration.as_millis(),
                percentage
            );
        }
        info!("   {:.<35} {}ms", "Total", total.as_millis());
    }
}

/// Switches for a single run
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessOptions {
    pub profile: bool,
    pub capture_stages: bool,
    pub skip_cache: bool,
}

#[derive(Debug, Clone)]
pub struct ProcessingOutput {
    pub reconstruction: Reconstruction,
    pub stages: Option<PipelineStages>,
}

/// Segment features of a document, without any labeling
#[derive(Debug, Clone)]
pub struct SegmentOutput {
    pub main_areas: MainAreas,
    pub records: Vec<SegmentRecord>,
}

impl SegmentOutput {
    pub fn vectors(&self) -> Vec<String> {
        vectorize_all(&self.records)
    }
}

pub struct DocumentProcessor {
    config: PipelineConfig,
    labeler: Box<dyn SequenceLabeler>,
    storage: Box<dyn LabelStorage>,
    reconstructor: StructureReconstructor,
}

impl DocumentProcessor {
    /// Create DocumentProcessor with full dependency injection
    pub fn new_with_dependencies(
        config: PipelineConfig,
        labeler: Box<dyn SequenceLabeler>,
        storage: Box<dyn LabelStorage>,
    ) -> Result<Self> {
        let reconstructor = StructureReconstructor::new(&config.structure)
            .context("Invalid structure vocabulary")?;
        Ok(Self {
            config,
            labeler,
            storage,
            reconstructor,
        })
    }

    /// Processor without any caching
    pub fn new(config: PipelineConfig, labeler: Box<dyn SequenceLabeler>) -> Result<Self> {
        Self::new_with_dependencies(config, labeler, Box::new(NoOpStorage::new()))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Read a layout file, going through the layout cache.
    pub fn load_layout(&self, input_path: &Path, skip_cache: bool) -> Result<LayoutDocument> {
        let preprocessor = preprocessor_for(input_path).ok_or_else(|| {
            anyhow!(
                "Unsupported layout file '{}' (expected .xml/.alto or .json)",
                input_path.display()
            )
        })?;
        let bytes = fs::read(input_path)
            .with_context(|| format!("Failed to read {}", input_path.display()))?;
        let input_hash = calculate_input_hash(&bytes);

        if !skip_cache {
            if let Some(cached) = self.storage.get_layout(&input_hash)? {
                info!("Cache hit: layout for {}", input_path.display());
                return Ok(cached.document);
            }
        }

        let content = String::from_utf8(bytes)
            .with_context(|| format!("{} is not valid UTF-8", input_path.display()))?;
        let doc = preprocessor
            .parse(&content)
            .with_context(|| format!("Failed to parse {}", input_path.display()))?;
        info!(
            "Parsed {} with {} preprocessor: {} pages, {} blocks, {} tokens",
            input_path.display(),
            preprocessor.name(),
            doc.pages.len(),
            doc.block_count(),
            doc.token_count()
        );

        if !skip_cache {
            self.storage
                .store_layout(&input_hash, &LayoutCacheValue::new(doc.clone()))?;
        }
        Ok(doc)
    }

    /// Estimate main areas and encode one segment record per labelable line.
    pub fn segment_features(&self, doc: &LayoutDocument) -> Result<SegmentOutput> {
        let main_areas = AreaEstimator::new(self.config.area.clone()).estimate(doc);
        let records = SegmentEncoder::new(&self.config.segment).encode(doc, &main_areas)?;
        info!("Encoded {} segment lines", records.len());
        Ok(SegmentOutput {
            main_areas,
            records,
        })
    }

    /// Segment-only mode: parse a layout file and return its segment vectors.
    pub fn segment_vectors_for_file(
        &self,
        input_path: &Path,
        skip_cache: bool,
    ) -> Result<Vec<String>> {
        let doc = self.load_layout(input_path, skip_cache)?;
        Ok(self.segment_features(&doc)?.vectors())
    }

    /// Full pipeline from a layout file
    pub fn process_file(
        &self,
        input_path: &Path,
        options: ProcessOptions,
    ) -> Result<ProcessingOutput> {
        let start_time = Instant::now();
        let mut profiler = StepProfiler::new(options.profile);

        info!("Processing layout: {}", input_path.display());
        let doc = profiler.time_step("1. Layout parsing", || {
            self.load_layout(input_path, options.skip_cache)
        })?;
        let output = self.run(&doc, options, &mut profiler)?;

        profiler.log_summary();
        info!(
            "Total processing time: {:.3}s",
            start_time.elapsed().as_secs_f64()
        );
        Ok(output)
    }

    /// Full pipeline from an already parsed layout
    pub fn process(&self, doc: &LayoutDocument, options: ProcessOptions) -> Result<ProcessingOutput> {
        let mut profiler = StepProfiler::new(options.profile);
        let output = self.run(doc, options, &mut profiler)?;
        profiler.log_summary();
        Ok(output)
    }

    fn run(
        &self,
        doc: &LayoutDocument,
        options: ProcessOptions,
        profiler: &mut StepProfiler,
    ) -> Result<ProcessingOutput> {
        // Stage 1: main areas + segment features
        let segments = profiler.time_step("2. Segment features", || self.segment_features(doc))?;
        let segment_vectors = segments.vectors();

        // Stage 2: segment labeling and block grouping
        let segment_labels = profiler.time_step("3. Segment labeling", || {
            self.label(FeatureKind::Segment, &segment_vectors, options.skip_cache)
        })?;
        let grouper = BlockGrouper::new(&self.config.grouping);
        let labels: Vec<String> = segment_labels.iter().map(|l| l.label.clone()).collect();
        let groups = profiler.time_step("4. Block grouping", || {
            grouper.group(doc, &segments.records, &labels)
        })?;
        let body = grouper.body_blocks(&groups);
        info!(
            "Grouped blocks into {} categories, {} body blocks, {} disputed",
            groups.categories.len(),
            body.len(),
            groups.disputed.len()
        );

        // Stage 3: fulltext features over the body blocks
        let fulltext_records = profiler.time_step("5. Fulltext features", || {
            FulltextEncoder::new(&self.config.fulltext).encode(doc, body)
        })?;
        let fulltext_vectors = vectorize_all(&fulltext_records);
        info!("Encoded {} fulltext tokens", fulltext_vectors.len());

        // Stage 4: fulltext labeling and structure reconstruction
        let fulltext_labels = profiler.time_step("6. Fulltext labeling", || {
            self.label(FeatureKind::Fulltext, &fulltext_vectors, options.skip_cache)
        })?;
        let tokens = fulltext_labels
            .iter()
            .map(LabeledToken::from_fulltext)
            .collect::<crate::error::Result<Vec<_>>>()?;
        let reconstruction = profiler.time_step("7. Structure reconstruction", || {
            self.reconstructor.reconstruct(&tokens)
        });

        let stages = options.capture_stages.then(|| PipelineStages {
            layout: LayoutSummary::of(doc),
            main_areas: segments.main_areas,
            segment_vectors,
            segment_labels,
            groups,
            fulltext_vectors,
            fulltext_labels,
            tokens,
        });

        Ok(ProcessingOutput {
            reconstruction,
            stages,
        })
    }

    /// Label vectors with the configured labeler, going through the label cache.
    fn label(
        &self,
        kind: FeatureKind,
        vectors: &[String],
        skip_cache: bool,
    ) -> Result<Vec<LabeledLine>> {
        if vectors.is_empty() {
            debug!("No {} vectors to label", kind);
            return Ok(Vec::new());
        }

        let key = LabelCacheKey::new(
            kind,
            self.labeler.model_identity(kind),
            calculate_vectors_hash(vectors),
        );

        let cached = if skip_cache {
            None
        } else {
            self.storage.get_labels(&key)?
        };

        let responses = match cached {
            Some(cached) => {
                info!(
                    "Cache hit: {} labels from {}",
                    kind,
                    cached.created_at.format("%Y-%m-%d %H:%M:%S")
                );
                cached.responses
            }
            None => {
                let start = Instant::now();
                let responses = self
                    .labeler
                    .label(kind, vectors)
                    .with_context(|| format!("{} labeler failed on {} vectors", self.labeler.name(), kind))?;
                if !skip_cache {
                    let value =
                        LabelCacheValue::new(responses.clone(), start.elapsed().as_millis() as u64);
                    self.storage.store_labels(&key, &value)?;
                }
                responses
            }
        };

        Ok(align_responses(kind, vectors, &responses)?)
    }
}
