//! Boundary to the external sequence labeler.
//!
//! A labeler receives vector lines for one model and answers with one
//! `features<TAB>label` line per vector. Responses are matched back to the
//! submitted vectors by order.

use crate::config::ModelConfig;
use crate::error::{LayoutError, Result};
use crate::features::FeatureKind;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::UNIX_EPOCH;

/// Column of the fulltext vector holding the line boundary marker.
pub const LINE_INFO_COLUMN: usize = 11;

pub trait SequenceLabeler {
    /// Label `vectors` with the model for `kind`, returning raw response lines.
    fn label(&self, kind: FeatureKind, vectors: &[String]) -> Result<Vec<String>>;

    /// Stable identity of the model used for `kind`, used for caching.
    fn model_identity(&self, kind: FeatureKind) -> String;

    fn name(&self) -> &str;
}

/// A response matched to its submitted vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledLine {
    pub features: String,
    pub label: String,
}

/// Match raw labeler output to the submitted vectors.
///
/// Blank response lines are ignored. Every remaining response must start with
/// the vector submitted at the same position.
pub fn align_responses(
    kind: FeatureKind,
    vectors: &[String],
    responses: &[String],
) -> Result<Vec<LabeledLine>> {
    let responses: Vec<&str> = responses
        .iter()
        .map(|line| line.trim_end_matches(['\r', '\n']))
        .filter(|line| !line.trim().is_empty())
        .collect();

    if responses.len() != vectors.len() {
        return Err(LayoutError::misaligned(
            kind.as_str(),
            vectors.len(),
            responses.len(),
            "response count differs from submitted vectors",
        ));
    }

    vectors
        .iter()
        .zip(responses)
        .enumerate()
        .map(|(i, (vector, response))| {
            let (features, label) = response.rsplit_once('\t').ok_or_else(|| {
                LayoutError::misaligned(
                    kind.as_str(),
                    vectors.len(),
                    i,
                    format!("response {} has no label column", i + 1),
                )
            })?;
            if !features.starts_with(vector.trim()) {
                return Err(LayoutError::misaligned(
                    kind.as_str(),
                    vectors.len(),
                    i,
                    format!("response {} does not match its vector", i + 1),
                ));
            }
            Ok(LabeledLine {
                features: features.to_string(),
                label: label.trim().to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineMarker {
    Start,
    Inside,
    End,
}

impl LineMarker {
    pub fn parse(column: &str) -> Option<Self> {
        match column {
            "LINESTART" => Some(LineMarker::Start),
            "LINEIN" => Some(LineMarker::Inside),
            "LINEEND" => Some(LineMarker::End),
            _ => None,
        }
    }
}

/// A fulltext token with its label, ready for structure reconstruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledToken {
    pub text: String,
    /// Raw label, possibly carrying the `I-` span-start prefix
    pub label: String,
    pub line_marker: Option<LineMarker>,
}

impl LabeledToken {
    pub fn new(text: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            label: label.into(),
            line_marker: None,
        }
    }

    pub fn at_line_end(mut self) -> Self {
        self.line_marker = Some(LineMarker::End);
        self
    }

    /// Recover token text and line marker from a labeled fulltext vector.
    pub fn from_fulltext(line: &LabeledLine) -> Result<Self> {
        let columns: Vec<&str> = line.features.split(' ').collect();
        let text = columns
            .first()
            .filter(|text| !text.is_empty())
            .ok_or_else(|| LayoutError::malformed("fulltext response", "empty feature text"))?;
        Ok(Self {
            text: text.to_string(),
            label: line.label.clone(),
            line_marker: columns
                .get(LINE_INFO_COLUMN)
                .and_then(|column| LineMarker::parse(column)),
        })
    }
}

/// Runs `wapiti label -m <model>` with the vectors on stdin.
pub struct WapitiLabeler {
    executable: String,
    models: HashMap<FeatureKind, PathBuf>,
}

impl WapitiLabeler {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            models: HashMap::new(),
        }
    }

    pub fn from_config(config: &ModelConfig) -> Self {
        let mut labeler = Self::new(config.wapiti_path.clone());
        if let Some(model) = &config.segment_model {
            labeler = labeler.with_model(FeatureKind::Segment, model);
        }
        if let Some(model) = &config.fulltext_model {
            labeler = labeler.with_model(FeatureKind::Fulltext, model);
        }
        labeler
    }

    pub fn with_model(mut self, kind: FeatureKind, model: impl AsRef<Path>) -> Self {
        self.models.insert(kind, model.as_ref().to_path_buf());
        self
    }

    fn model(&self, kind: FeatureKind) -> Result<&Path> {
        self.models
            .get(&kind)
            .map(PathBuf::as_path)
            .ok_or_else(|| LayoutError::Labeler(format!("no {} model configured", kind)))
    }
}

impl SequenceLabeler for WapitiLabeler {
    fn label(&self, kind: FeatureKind, vectors: &[String]) -> Result<Vec<String>> {
        let model = self.model(kind)?;
        info!(
            "Labeling {} {} vectors with {}",
            vectors.len(),
            kind,
            model.display()
        );

        let mut child = Command::new(&self.executable)
            .arg("label")
            .arg("-m")
            .arg(model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                LayoutError::Labeler(format!("failed to spawn '{}': {}", self.executable, e))
            })?;

        let mut input = vectors.join("\n");
        input.push('\n');
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LayoutError::Labeler("labeler stdin unavailable".to_string()))?;
        // Feed stdin from a separate thread so a full stdout pipe cannot block us
        let writer = std::thread::spawn(move || stdin.write_all(input.as_bytes()));

        let output = child.wait_with_output()?;
        writer
            .join()
            .map_err(|_| LayoutError::Labeler("stdin writer panicked".to_string()))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LayoutError::Labeler(format!(
                "'{}' exited with {}: {}",
                self.executable,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8(output.stdout)
            .map_err(|e| LayoutError::Labeler(format!("output is not valid UTF-8: {}", e)))?;
        let lines: Vec<String> = stdout.lines().map(str::to_string).collect();
        debug!("Labeler returned {} lines", lines.len());
        Ok(lines)
    }

    /// Model path plus file size and modification time, so a retrained model
    /// at the same path gets a new identity.
    fn model_identity(&self, kind: FeatureKind) -> String {
        let Some(path) = self.models.get(&kind) else {
            return format!("wapiti:{}:", kind);
        };
        let stamp = std::fs::metadata(path)
            .map(|meta| {
                let modified = meta
                    .modified()
                    .ok()
                    .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
                    .map(|since| since.as_nanos())
                    .unwrap_or_default();
                format!("{}:{}", meta.len(), modified)
            })
            .unwrap_or_else(|_| "missing".to_string());
        format!("wapiti:{}:{}:{}", kind, path.display(), stamp)
    }

    fn name(&self) -> &str {
        "wapiti"
    }
}

/// Serves pre-computed responses, either from files or from memory.
#[derive(Debug, Default)]
pub struct ReplayLabeler {
    files: HashMap<FeatureKind, PathBuf>,
    responses: HashMap<FeatureKind, Vec<String>>,
}

impl ReplayLabeler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, kind: FeatureKind, path: impl AsRef<Path>) -> Self {
        self.files.insert(kind, path.as_ref().to_path_buf());
        self
    }

    pub fn with_responses(mut self, kind: FeatureKind, responses: Vec<String>) -> Self {
        self.responses.insert(kind, responses);
        self
    }
}

impl SequenceLabeler for ReplayLabeler {
    fn label(&self, kind: FeatureKind, vectors: &[String]) -> Result<Vec<String>> {
        if let Some(responses) = self.responses.get(&kind) {
            return Ok(responses.clone());
        }
        let path = self
            .files
            .get(&kind)
            .ok_or_else(|| LayoutError::Labeler(format!("no recorded {} responses", kind)))?;
        debug!(
            "Replaying {} responses for {} vectors from {}",
            kind,
            vectors.len(),
            path.display()
        );
        let content = std::fs::read_to_string(path)?;
        Ok(content.lines().map(str::to_string).collect())
    }

    fn model_identity(&self, kind: FeatureKind) -> String {
        match self.files.get(&kind) {
            Some(path) => format!("replay:{}:{}", kind, path.display()),
            None => format!("replay:{}:memory", kind),
        }
    }

    fn name(&self) -> &str {
        "replay"
    }
}
