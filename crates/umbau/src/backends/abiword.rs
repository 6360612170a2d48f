//! AbiWord conversion backend.
//!
//! Fallback for word-processing conversions (doc/rtf/odt → docx/pdf) when
//! LibreOffice is unavailable or fails. AbiWord writes its output next to the
//! input file, so the input is first staged into a scratch directory and the
//! result published from there.

use super::process::{locate_tool, run_tool};
use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::{ScratchDir, publish_file};
use crate::{Result, UmbauError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct AbiwordBackend;

#[async_trait]
impl ConversionBackend for AbiwordBackend {
    fn id(&self) -> BackendId {
        BackendId::Abiword
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        config: &ConversionConfig,
    ) -> Result<PathBuf> {
        let abiword = locate_tool("UMBAU_ABIWORD_PATH", config.abiword_path.as_ref(), &["abiword"])?;
        let file_name = output_file_name(source, target_ext)?;

        let source_name = source
            .file_name()
            .ok_or_else(|| UmbauError::validation(format!("Invalid input file name: {}", source.display())))?;

        // Stage the input so AbiWord's sibling output lands in scratch space.
        let scratch = ScratchDir::new("umbau_abiword").await?;
        let staged: PathBuf = scratch.path().join(source_name);
        tokio::fs::copy(source, &staged).await?;

        let to_arg = format!("--to={}", target_ext);
        let staged_arg = staged.to_string_lossy();
        run_tool(
            "abiword",
            abiword.as_os_str(),
            [to_arg.as_str(), "--plugin=AbiCommand", staged_arg.as_ref()],
            config.process_timeout_secs,
        )
        .await?;

        let produced = scratch.path().join(&file_name);
        if !produced.is_file() {
            return Err(UmbauError::backend(format!(
                "AbiWord exited cleanly but produced no {} output for {}",
                target_ext,
                source.display()
            )));
        }

        tracing::debug!(source = %source.display(), target = target_ext, "abiword conversion complete");

        publish_file(&produced, dest_dir, &file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_abiword_is_missing_dependency() {
        if std::env::var_os("UMBAU_ABIWORD_PATH").is_some() {
            return;
        }
        let config = ConversionConfig {
            abiword_path: Some(PathBuf::from("/nonexistent/abiword")),
            ..Default::default()
        };

        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("input.doc");
        std::fs::write(&source, b"legacy").unwrap();

        let err = AbiwordBackend
            .convert(&source, dir.path(), "pdf", &config)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            UmbauError::MissingDependency(_) | UmbauError::Backend { .. }
        ));
    }
}
