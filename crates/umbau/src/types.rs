//! Core data types shared across the conversion pipeline.
//!
//! Everything here derives `Serialize`/`Deserialize` so the transport layer
//! sitting above the library (HTTP handler, CLI `--json`, …) can marshal
//! results without further mapping.

use crate::backends::BackendId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One conversion request: a source file, an optional destination directory
/// and an optional restriction of the output formats to produce.
///
/// Created per call, consumed by the orchestrator, discarded afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Absolute path of the file to convert.
    pub source_path: PathBuf,

    /// Directory to publish outputs into. `None` means "same directory as
    /// the input": the only path the core ever infers.
    #[serde(default)]
    pub destination_dir: Option<PathBuf>,

    /// Output extensions to produce (without dots). `None` means every
    /// output the registry configures for the source extension.
    #[serde(default)]
    pub requested_outputs: Option<Vec<String>>,
}

impl ConversionRequest {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_dir: None,
            requested_outputs: None,
        }
    }

    pub fn with_destination(mut self, dir: impl Into<PathBuf>) -> Self {
        self.destination_dir = Some(dir.into());
        self
    }

    pub fn with_outputs(mut self, outputs: Vec<String>) -> Self {
        self.requested_outputs = Some(outputs);
        self
    }
}

/// Record of a single backend invocation.
///
/// Produced for every try, success or not; the full log is part of the
/// terminal [`ConversionResult`] so callers can see what was attempted and
/// why fallbacks fired.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionAttempt {
    pub backend: BackendId,
    pub output_extension: String,
    pub succeeded: bool,

    /// Final published path, present only on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,

    /// Human-readable failure message, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub duration_ms: u64,
}

/// Terminal value for one converted file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub source_path: PathBuf,

    /// (output extension, published path) for every output that succeeded.
    pub outputs: Vec<(String, PathBuf)>,

    /// Every backend invocation, in the order it ran.
    pub attempts: Vec<ConversionAttempt>,

    /// True iff every requested output extension has at least one
    /// successful attempt.
    pub overall_succeeded: bool,
}

impl ConversionResult {
    /// Path produced for a given output extension, if any attempt succeeded.
    pub fn output_for(&self, extension: &str) -> Option<&PathBuf> {
        self.outputs
            .iter()
            .find(|(ext, _)| ext == extension)
            .map(|(_, path)| path)
    }
}

/// Aggregate result of converting a directory tree (or a single file).
///
/// Partial-failure semantics: `results` holds per-file conversion results
/// (each of which may itself report failed outputs), `failures` holds files
/// that could not even be dispatched (request-level errors). One file never
/// blocks another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConversionResult {
    pub results: Vec<ConversionResult>,
    pub failures: Vec<BatchFailure>,
}

/// A file the orchestrator could not dispatch at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchFailure {
    pub source_path: PathBuf,
    pub error: String,
}

impl BatchConversionResult {
    /// True iff every file converted and every requested output succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.results.iter().all(|r| r.overall_succeeded)
    }
}

/// Output of the MHTML structural extractor: a self-contained HTML document
/// with referenced resources inlined.
#[derive(Debug, Clone)]
pub struct ExtractedHtml {
    /// UTF-8 encoded markup.
    pub html: Vec<u8>,

    /// References in the root part that resolved to no archive part and were
    /// left untouched. Warnings, never fatal.
    pub unresolved_references: usize,
}
