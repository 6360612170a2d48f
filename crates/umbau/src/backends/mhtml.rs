//! MHTML structural-extractor backend.
//!
//! Thin adapter over [`crate::mhtml`]: decodes the multipart archive,
//! resolves inter-part references, inlines resources and publishes a single
//! self-contained HTML file. Structural parse failures surface as
//! `MalformedArchive`, which the mht chain absorbs by falling through to the
//! email-parser backend.

use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::publish_bytes;
use crate::{Result, UmbauError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct MhtmlExtractorBackend;

#[async_trait]
impl ConversionBackend for MhtmlExtractorBackend {
    fn id(&self) -> BackendId {
        BackendId::MhtmlExtractor
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        _config: &ConversionConfig,
    ) -> Result<PathBuf> {
        if target_ext != "html" {
            return Err(UmbauError::backend(format!(
                "mhtml-extractor only produces html, not {}",
                target_ext
            )));
        }

        let file_name = output_file_name(source, target_ext)?;
        let bytes = tokio::fs::read(source).await?;

        let extracted = crate::mhtml::extract(&bytes)?;
        if extracted.unresolved_references > 0 {
            tracing::warn!(
                source = %source.display(),
                unresolved = extracted.unresolved_references,
                "mhtml extraction left references unresolved"
            );
        }

        publish_bytes(dest_dir, &file_name, &extracted.html).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_garbage_input_is_malformed_archive() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.mht");
        std::fs::write(&source, b"not a mime archive at all").unwrap();

        let err = MhtmlExtractorBackend
            .convert(&source, dir.path(), "html", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UmbauError::MalformedArchive { .. }));
    }

    #[tokio::test]
    async fn test_rejects_non_html_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.mht");
        std::fs::write(&source, b"x").unwrap();

        let err = MhtmlExtractorBackend
            .convert(&source, dir.path(), "pdf", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UmbauError::Backend { .. }));
    }
}
