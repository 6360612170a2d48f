//! WeasyPrint HTML-to-PDF backend.
//!
//! Renders an HTML document to PDF through the `weasyprint` CLI. First in the
//! html → pdf chain; LibreOffice covers the same pair as fallback.

use super::process::{locate_tool, run_tool};
use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::{ScratchDir, publish_file};
use crate::{Result, UmbauError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct WeasyprintBackend;

/// Run `weasyprint <input> <output>` and verify the PDF appeared.
pub(crate) async fn render_pdf(
    input: &Path,
    output: &Path,
    stylesheet: Option<&Path>,
    config: &ConversionConfig,
) -> Result<()> {
    let weasyprint = locate_tool(
        "UMBAU_WEASYPRINT_PATH",
        config.weasyprint_path.as_ref(),
        &["weasyprint"],
    )?;

    let mut args: Vec<String> = vec![
        input.to_string_lossy().into_owned(),
        output.to_string_lossy().into_owned(),
    ];
    if let Some(css) = stylesheet {
        args.push("--stylesheet".to_string());
        args.push(css.to_string_lossy().into_owned());
    }

    run_tool("weasyprint", weasyprint.as_os_str(), &args, config.process_timeout_secs).await?;

    if !output.is_file() {
        return Err(UmbauError::backend(format!(
            "WeasyPrint exited cleanly but produced no PDF for {}",
            input.display()
        )));
    }
    Ok(())
}

#[async_trait]
impl ConversionBackend for WeasyprintBackend {
    fn id(&self) -> BackendId {
        BackendId::Weasyprint
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        config: &ConversionConfig,
    ) -> Result<PathBuf> {
        if target_ext != "pdf" {
            return Err(UmbauError::backend(format!(
                "WeasyPrint only renders PDF, not {}",
                target_ext
            )));
        }

        let file_name = output_file_name(source, target_ext)?;
        let scratch = ScratchDir::new("umbau_weasyprint").await?;
        let rendered = scratch.path().join(&file_name);

        render_pdf(source, &rendered, None, config).await?;

        tracing::debug!(source = %source.display(), "weasyprint render complete");

        publish_file(&rendered, dest_dir, &file_name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rejects_non_pdf_target() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.html");
        std::fs::write(&source, b"<html></html>").unwrap();

        let err = WeasyprintBackend
            .convert(&source, dir.path(), "docx", &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, UmbauError::Backend { .. }));
    }
}
