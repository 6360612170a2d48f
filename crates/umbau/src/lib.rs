//! Umbau - Legacy Document Modernization Engine
//!
//! Umbau converts office-document and archival web-page formats (doc, xls,
//! xlsm, ppt, hwp, mht) into modern equivalents (docx, xlsx, pptx, pdf,
//! html). Conversions are dispatched through a static registry: each input
//! extension maps to one or more output formats, and each (input, output)
//! pair to an ordered chain of backend strategies tried until one succeeds.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use umbau::{ConversionConfig, convert_file_sync};
//!
//! # fn main() -> umbau::Result<()> {
//! let config = ConversionConfig::default();
//! let result = convert_file_sync("report.doc", None, &config)?;
//! for (ext, path) in &result.outputs {
//!     println!("{} -> {}", ext, path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Registry** (`registry`): immutable extension → outputs and
//!   (input, output) → backend-chain tables, loaded once at process start
//! - **Backends** (`backends`): one adapter per strategy behind a uniform
//!   trait: LibreOffice headless, AbiWord, in-process spreadsheet rewrite,
//!   the MHTML structural extractor, the mail-parser fallback, the HWP
//!   render pipeline and WeasyPrint
//! - **MHTML extractor** (`mhtml`): multipart archive parsing, reference
//!   resolution and resource inlining
//! - **Orchestrator** (`orchestrator`): walks the chains, aggregates
//!   per-attempt outcomes into structured results, runs batches concurrently
//!
//! Backend failures never surface as errors: every try is recorded on the
//! result's attempt log and the chain falls through. Callers always receive
//! a structured [`ConversionResult`], never a bare failure from a tool.

#![deny(unsafe_code)]

pub mod backends;
pub mod config;
pub mod error;
pub mod io;
pub mod mhtml;
pub mod orchestrator;
pub mod registry;
pub mod types;

pub use error::{Result, UmbauError};
pub use types::{
    BatchConversionResult, BatchFailure, ConversionAttempt, ConversionRequest, ConversionResult, ExtractedHtml,
};

pub use config::ConversionConfig;

pub use backends::{BackendId, ConversionBackend, backend_for};

pub use orchestrator::{
    convert_file, convert_file_sync, convert_path, convert_path_sync, convert_request, run_chain,
};

pub use registry::{backend_chain_for, outputs_for};
