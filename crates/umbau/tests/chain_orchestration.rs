//! Fallback-chain and batch orchestration tests.
//!
//! Validates the dispatch semantics end to end:
//! - first-fails-second-succeeds chains
//! - exhausted chains with complete attempt logs
//! - per-file isolation in directory batches
//! - the mht chain falling through from the structural extractor to the
//!   email-parser backend on malformed archives

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use umbau::{
    BackendId, ConversionBackend, ConversionConfig, ConversionRequest, Result, UmbauError,
    convert_path, convert_request, run_chain,
};

/// Test backend that fails a scripted number of times before succeeding.
struct FlakyBackend {
    id: BackendId,
    failures_before_success: usize,
    calls: AtomicUsize,
}

impl FlakyBackend {
    fn failing(id: BackendId) -> Arc<Self> {
        Arc::new(Self {
            id,
            failures_before_success: usize::MAX,
            calls: AtomicUsize::new(0),
        })
    }

    fn succeeding(id: BackendId) -> Arc<Self> {
        Arc::new(Self {
            id,
            failures_before_success: 0,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait::async_trait]
impl ConversionBackend for FlakyBackend {
    fn id(&self) -> BackendId {
        self.id
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        _config: &ConversionConfig,
    ) -> Result<PathBuf> {
        if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures_before_success {
            return Err(UmbauError::backend("induced failure for testing"));
        }
        let stem = source.file_stem().unwrap().to_string_lossy();
        let out = dest_dir.join(format!("{}.{}", stem, target_ext));
        tokio::fs::write(&out, b"converted").await?;
        Ok(out)
    }
}

const VALID_MHT: &str = "From: <saved>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"SEP\"\r\n\
\r\n\
--SEP\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
\r\n\
<html><body><p>archived page</p></body></html>\r\n\
--SEP--\r\n";

/// First backend fails, second succeeds: overall success with a ≥2 attempt
/// log whose first entry is the recorded failure.
#[tokio::test]
async fn test_fallback_chain_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.doc");
    std::fs::write(&source, b"legacy").unwrap();

    let backends: Vec<Arc<dyn ConversionBackend>> = vec![
        FlakyBackend::failing(BackendId::Soffice),
        FlakyBackend::succeeding(BackendId::Abiword),
    ];

    let mut attempts = Vec::new();
    let config = ConversionConfig::default();
    let produced = run_chain(&backends, &source, dir.path(), "docx", &config, &mut attempts).await;

    assert!(produced.is_some());
    assert!(attempts.len() >= 2);
    assert!(!attempts[0].succeeded);
    assert_eq!(attempts[0].backend, BackendId::Soffice);
    assert!(attempts[1].succeeded);
    assert!(produced.unwrap().is_file());
}

/// Every backend fails: no output, every attempt recorded with a non-empty
/// error message.
#[tokio::test]
async fn test_exhausted_chain_records_all_failures() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("report.doc");
    std::fs::write(&source, b"legacy").unwrap();

    let backends: Vec<Arc<dyn ConversionBackend>> = vec![
        FlakyBackend::failing(BackendId::Soffice),
        FlakyBackend::failing(BackendId::Abiword),
    ];

    let mut attempts = Vec::new();
    let config = ConversionConfig::default();
    let produced = run_chain(&backends, &source, dir.path(), "pdf", &config, &mut attempts).await;

    assert!(produced.is_none());
    assert_eq!(attempts.len(), 2);
    for attempt in &attempts {
        assert!(!attempt.succeeded);
        let message = attempt.error.as_deref().unwrap();
        assert!(!message.is_empty());
    }
}

/// A valid mht converts through the registry chain without external tools:
/// the structural extractor handles it on the first attempt.
#[tokio::test]
async fn test_mht_conversion_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("page.mht");
    std::fs::write(&source, VALID_MHT).unwrap();

    let request = ConversionRequest::new(&source);
    let result = convert_request(&request, &ConversionConfig::default()).await.unwrap();

    assert!(result.overall_succeeded);
    assert_eq!(result.attempts.len(), 1);
    assert_eq!(result.attempts[0].backend, BackendId::MhtmlExtractor);
    let html_path = result.output_for("html").unwrap();
    let html = std::fs::read_to_string(html_path).unwrap();
    assert!(html.contains("archived page"));
}

/// A structurally broken mht that is still a parseable message: the
/// extractor fails, the email-parser fallback recovers.
#[tokio::test]
async fn test_mht_chain_falls_through_to_email_parser() {
    // No multipart envelope, but a plain HTML message body mail-parser
    // accepts. The structural extractor rejects it as malformed.
    let degenerate = "From: a@b\r\n\
MIME-Version: 1.0\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
\r\n\
<html><body>rescued by fallback</body></html>\r\n";

    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("odd.mht");
    std::fs::write(&source, degenerate).unwrap();

    let request = ConversionRequest::new(&source);
    let result = convert_request(&request, &ConversionConfig::default()).await.unwrap();

    assert!(result.overall_succeeded, "attempts: {:?}", result.attempts);
    assert_eq!(result.attempts.len(), 2);
    assert_eq!(result.attempts[0].backend, BackendId::MhtmlExtractor);
    assert!(!result.attempts[0].succeeded);
    assert_eq!(result.attempts[1].backend, BackendId::EmailParser);
    assert!(result.attempts[1].succeeded);

    let html = std::fs::read_to_string(result.output_for("html").unwrap()).unwrap();
    assert!(html.contains("rescued by fallback"));
}

/// Directory batch with one valid and one corrupt file: two independent
/// results, the corrupt file's failure does not block the valid one.
#[tokio::test]
async fn test_batch_isolates_per_file_failures() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("good.mht"), VALID_MHT).unwrap();
    std::fs::write(dir.path().join("corrupt.mht"), b"\x00\x01\x02 not mime at all").unwrap();

    let batch = convert_path(dir.path(), None, &ConversionConfig::default()).await.unwrap();

    assert_eq!(batch.results.len(), 2);
    assert!(batch.failures.is_empty());

    let good = batch
        .results
        .iter()
        .find(|r| r.source_path.ends_with("good.mht"))
        .unwrap();
    let corrupt = batch
        .results
        .iter()
        .find(|r| r.source_path.ends_with("corrupt.mht"))
        .unwrap();

    assert!(good.overall_succeeded);
    assert!(!corrupt.overall_succeeded);
    // Corrupt file walked the whole chain and recorded every failure.
    assert_eq!(corrupt.attempts.len(), 2);
    assert!(corrupt.attempts.iter().all(|a| !a.succeeded));
    assert!(!batch.all_succeeded());
}

/// Batch conversion writes into an explicit destination directory.
#[tokio::test]
async fn test_batch_with_destination_directory() {
    let src_dir = tempfile::tempdir().unwrap();
    let dest_dir = tempfile::tempdir().unwrap();
    std::fs::write(src_dir.path().join("page.mht"), VALID_MHT).unwrap();

    let batch = convert_path(src_dir.path(), Some(dest_dir.path()), &ConversionConfig::default())
        .await
        .unwrap();

    assert!(batch.all_succeeded());
    assert!(dest_dir.path().join("page.html").is_file());
    assert!(!src_dir.path().join("page.html").exists());
}

/// Subdirectories are walked recursively; non-registered extensions are
/// ignored.
#[tokio::test]
async fn test_batch_walks_recursively_and_filters() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("nested")).unwrap();
    std::fs::write(dir.path().join("nested").join("deep.mht"), VALID_MHT).unwrap();
    std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();
    std::fs::write(dir.path().join("photo.png"), b"ignored").unwrap();

    let batch = convert_path(dir.path(), None, &ConversionConfig::default()).await.unwrap();

    assert_eq!(batch.results.len(), 1);
    assert!(batch.results[0].source_path.ends_with("deep.mht"));
}
