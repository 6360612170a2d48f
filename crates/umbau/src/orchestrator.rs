//! Conversion orchestration.
//!
//! The entry points for running conversions: [`convert_request`] drives one
//! file through the registry-ordered fallback chains, [`convert_path`]
//! handles files or whole directory trees with bounded concurrency, and the
//! `*_sync` wrappers run either on a process-global runtime.
//!
//! Failure policy: backend errors never escape: every try is recorded as a
//! [`ConversionAttempt`] and the chain moves on. The only request-level
//! failure is an input for which no chain can be resolved at all
//! ([`UmbauError::UnsupportedFormat`]). Batch runs isolate files from each
//! other completely.

use crate::backends::{ConversionBackend, backend_for};
use crate::config::ConversionConfig;
use crate::registry;
use crate::types::{
    BatchConversionResult, BatchFailure, ConversionAttempt, ConversionRequest, ConversionResult,
};
use crate::{Result, UmbauError, io};
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Global Tokio runtime backing the synchronous wrappers.
///
/// Lazily initialized on first use and shared by every `*_sync` call.
/// Runtime creation only fails on resource exhaustion, at which point the
/// process is beyond saving; failing fast beats erroring from every call.
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Run an explicit backend chain for one output, appending to the attempt log.
///
/// Tries each backend in order and stops at the first success. Returns the
/// published path, or `None` when the chain is exhausted.
pub async fn run_chain(
    backends: &[Arc<dyn ConversionBackend>],
    source: &Path,
    dest_dir: &Path,
    output_ext: &str,
    config: &ConversionConfig,
    attempts: &mut Vec<ConversionAttempt>,
) -> Option<PathBuf> {
    for backend in backends {
        let started = Instant::now();
        let outcome = backend.convert(source, dest_dir, output_ext, config).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(path) => {
                tracing::info!(
                    source = %source.display(),
                    backend = %backend.id(),
                    output = output_ext,
                    duration_ms,
                    "conversion succeeded"
                );
                attempts.push(ConversionAttempt {
                    backend: backend.id(),
                    output_extension: output_ext.to_string(),
                    succeeded: true,
                    output_path: Some(path.clone()),
                    error: None,
                    duration_ms,
                });
                return Some(path);
            }
            Err(e) => {
                tracing::warn!(
                    source = %source.display(),
                    backend = %backend.id(),
                    output = output_ext,
                    error = %e,
                    "conversion attempt failed"
                );
                attempts.push(ConversionAttempt {
                    backend: backend.id(),
                    output_extension: output_ext.to_string(),
                    succeeded: false,
                    output_path: None,
                    error: Some(e.to_string()),
                    duration_ms,
                });
            }
        }
    }
    None
}

/// Convert one file according to a [`ConversionRequest`].
///
/// Resolves the requested output extensions (or the registry defaults for the
/// source extension), walks each output's backend chain, and returns the
/// structured result. Backend failures are data on the attempt log;
/// `overall_succeeded` is true only when every requested output produced a
/// file.
///
/// # Errors
///
/// `Validation` when the source file does not exist, `UnsupportedFormat` when
/// an output has no configured chain and no default applies. Nothing else
/// propagates.
pub async fn convert_request(request: &ConversionRequest, config: &ConversionConfig) -> Result<ConversionResult> {
    io::validate_file_exists(&request.source_path)?;
    let source = &request.source_path;

    let extension = io::extension_of(source).unwrap_or_default();
    let dest_dir = match &request.destination_dir {
        Some(dir) => dir.clone(),
        // The only path the core infers: outputs land next to the input.
        None => source.parent().unwrap_or(Path::new(".")).to_path_buf(),
    };

    let outputs: Vec<String> = match &request.requested_outputs {
        Some(requested) => requested.clone(),
        None => registry::outputs_for(&extension).iter().map(|s| s.to_string()).collect(),
    };

    // Resolve every chain up front so a misconfigured output fails the
    // request before any backend runs.
    let mut chains = Vec::with_capacity(outputs.len());
    for output in &outputs {
        let chain = registry::backend_chain_for(&extension, output).ok_or_else(|| {
            UmbauError::UnsupportedFormat(format!(
                "No conversion chain configured for '{}' -> '{}'",
                registry::normalize_extension(&extension),
                output
            ))
        })?;
        chains.push(chain);
    }

    let mut attempts = Vec::new();
    let mut produced = Vec::new();

    for (output, chain) in outputs.iter().zip(chains) {
        let backends: Vec<Arc<dyn ConversionBackend>> = chain.iter().map(|&id| backend_for(id)).collect();
        match run_chain(&backends, source, &dest_dir, output, config, &mut attempts).await {
            Some(path) => produced.push((output.clone(), path)),
            None => {
                tracing::warn!(
                    source = %source.display(),
                    output = %output,
                    attempts = chain.len(),
                    "backend chain exhausted"
                );
            }
        }
    }

    let overall_succeeded = outputs.iter().all(|o| produced.iter().any(|(ext, _)| ext == o));

    Ok(ConversionResult {
        source_path: source.clone(),
        outputs: produced,
        attempts,
        overall_succeeded,
    })
}

/// Convert a single file with registry-default outputs.
pub async fn convert_file(
    source: impl AsRef<Path>,
    destination_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult> {
    let mut request = ConversionRequest::new(source.as_ref());
    if let Some(dir) = destination_dir {
        request = request.with_destination(dir);
    }
    convert_request(&request, config).await
}

/// Convert a file or a directory tree.
///
/// Directories are walked recursively and every file with a registered
/// extension is converted; files run concurrently under a semaphore
/// (default permits `num_cpus * 2`). Partial-failure semantics: a file that
/// cannot be dispatched lands in `failures`, a file whose chains all fail
/// still yields its `ConversionResult`. Neither stops the rest.
pub async fn convert_path(
    path: impl AsRef<Path>,
    destination_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<BatchConversionResult> {
    use tokio::sync::Semaphore;
    use tokio::task::JoinSet;

    let path = path.as_ref();

    if path.is_file() {
        let result = convert_file(path, destination_dir, config).await;
        return Ok(collect_batch(vec![(path.to_path_buf(), result)]));
    }

    let files = io::traverse_directory(path, |p| {
        io::extension_of(p).is_some_and(|ext| registry::is_registered(&ext))
    })?;

    if files.is_empty() {
        return Ok(BatchConversionResult {
            results: vec![],
            failures: vec![],
        });
    }

    let config = Arc::new(config.clone());
    let dest = destination_dir.map(Path::to_path_buf);
    let semaphore = Arc::new(Semaphore::new(config.effective_concurrency()));

    let mut tasks = JoinSet::new();
    for (index, file) in files.iter().enumerate() {
        let file = file.clone();
        let config = Arc::clone(&config);
        let dest = dest.clone();
        let semaphore = Arc::clone(&semaphore);

        tasks.spawn(async move {
            let _permit = semaphore.acquire().await.expect("semaphore closed");
            let result = convert_file(&file, dest.as_deref(), &config).await;
            (index, file, result)
        });
    }

    let mut ordered: Vec<Option<(PathBuf, Result<ConversionResult>)>> = Vec::new();
    ordered.resize_with(files.len(), || None);

    while let Some(joined) = tasks.join_next().await {
        let (index, file, result) = joined.map_err(|e| UmbauError::Other(format!("Conversion task panicked: {}", e)))?;
        ordered[index] = Some((file, result));
    }

    Ok(collect_batch(ordered.into_iter().flatten().collect()))
}

fn collect_batch(entries: Vec<(PathBuf, Result<ConversionResult>)>) -> BatchConversionResult {
    let mut results = Vec::new();
    let mut failures = Vec::new();

    for (file, outcome) in entries {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => failures.push(BatchFailure {
                source_path: file,
                error: e.to_string(),
            }),
        }
    }

    BatchConversionResult { results, failures }
}

/// Synchronous wrapper over [`convert_file`].
pub fn convert_file_sync(
    source: impl AsRef<Path>,
    destination_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<ConversionResult> {
    GLOBAL_RUNTIME.block_on(convert_file(source, destination_dir, config))
}

/// Synchronous wrapper over [`convert_path`].
pub fn convert_path_sync(
    path: impl AsRef<Path>,
    destination_dir: Option<&Path>,
    config: &ConversionConfig,
) -> Result<BatchConversionResult> {
    GLOBAL_RUNTIME.block_on(convert_path(path, destination_dir, config))
}
