//! Conversion backends.
//!
//! Each backend is one strategy for performing a single format conversion,
//! wrapping either a process-based tool (LibreOffice, AbiWord, hwp5html,
//! WeasyPrint) or an in-process library (calamine + rust_xlsxwriter,
//! mail-parser, the MHTML structural extractor). All backends implement the
//! [`ConversionBackend`] trait; the orchestrator walks the registry-ordered
//! chain and stops at the first success.
//!
//! Adding a new strategy means adding a [`BackendId`] variant, an adapter
//! module and a registry entry: the orchestrator is untouched.

use crate::config::ConversionConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub mod abiword;
pub mod email;
pub mod hwp;
pub mod mhtml;
pub(crate) mod process;
pub mod sheet;
pub mod soffice;
pub mod weasyprint;

pub use abiword::AbiwordBackend;
pub use email::EmailParserBackend;
pub use hwp::HwpRenderBackend;
pub use mhtml::MhtmlExtractorBackend;
pub use sheet::SheetRewriteBackend;
pub use soffice::SofficeBackend;
pub use weasyprint::WeasyprintBackend;

/// Identifier of a conversion strategy, as referenced by the registry chains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendId {
    /// LibreOffice headless conversion (`soffice --headless --convert-to`).
    Soffice,
    /// AbiWord command-line conversion (`abiword --to=`).
    Abiword,
    /// In-process spreadsheet rewrite: calamine read, rust_xlsxwriter write.
    SheetRewrite,
    /// MHTML structural extractor with reference inlining.
    MhtmlExtractor,
    /// Generic email-parser fallback: first HTML body part, verbatim.
    EmailParser,
    /// HWP pipeline: hwp5html markup render, then WeasyPrint to PDF.
    HwpRender,
    /// WeasyPrint HTML-to-PDF conversion.
    Weasyprint,
}

impl BackendId {
    /// Stable kebab-case name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Soffice => "soffice",
            Self::Abiword => "abiword",
            Self::SheetRewrite => "sheet-rewrite",
            Self::MhtmlExtractor => "mhtml-extractor",
            Self::EmailParser => "email-parser",
            Self::HwpRender => "hwp-render",
            Self::Weasyprint => "weasyprint",
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform capability contract over all conversion strategies.
///
/// `convert` performs one attempt: read `source`, produce
/// `<source stem>.<target_ext>` inside `dest_dir`, and return the published
/// path. Implementations write to a uniquely named temporary path and rename
/// into place on success, so a failed attempt never leaves a partial file at
/// the final destination.
///
/// Errors returned here are attempt-level: the orchestrator records them on
/// the attempt log and moves on to the next backend in the chain.
#[async_trait]
pub trait ConversionBackend: Send + Sync {
    /// Registry identifier of this strategy.
    fn id(&self) -> BackendId;

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        config: &ConversionConfig,
    ) -> Result<PathBuf>;
}

/// Resolve a registry identifier to its adapter.
pub fn backend_for(id: BackendId) -> Arc<dyn ConversionBackend> {
    match id {
        BackendId::Soffice => Arc::new(SofficeBackend),
        BackendId::Abiword => Arc::new(AbiwordBackend),
        BackendId::SheetRewrite => Arc::new(SheetRewriteBackend),
        BackendId::MhtmlExtractor => Arc::new(MhtmlExtractorBackend),
        BackendId::EmailParser => Arc::new(EmailParserBackend),
        BackendId::HwpRender => Arc::new(HwpRenderBackend),
        BackendId::Weasyprint => Arc::new(WeasyprintBackend),
    }
}

/// Destination file name for a conversion: source stem + target extension.
pub(crate) fn output_file_name(source: &Path, target_ext: &str) -> Result<String> {
    let stem = source
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| crate::UmbauError::validation(format!("Invalid input file name: {}", source.display())))?;
    Ok(format!("{}.{}", stem, target_ext))
}
