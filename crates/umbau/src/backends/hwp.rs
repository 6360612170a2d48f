//! HWP (Hangul word processor) rendering backend.
//!
//! Two-stage pipeline behind a single strategy id: `hwp5html` renders the
//! document into a scratch directory (`index.xhtml` + `styles.css`), then
//! WeasyPrint turns that markup into the final PDF. The intermediate HTML is
//! an implementation detail and is removed with the scratch directory on
//! every exit path.

use super::process::{locate_tool, run_tool};
use super::weasyprint::render_pdf;
use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::{ScratchDir, publish_file};
use crate::{Result, UmbauError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct HwpRenderBackend;

#[async_trait]
impl ConversionBackend for HwpRenderBackend {
    fn id(&self) -> BackendId {
        BackendId::HwpRender
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
                "hwp-render only produces PDF, not {}",
                target_ext
            )));
        }

        let hwp5html = locate_tool("UMBAU_HWP5HTML_PATH", config.hwp5html_path.as_ref(), &["hwp5html"])?;
        let file_name = output_file_name(source, target_ext)?;

        let scratch = ScratchDir::new("umbau_hwp").await?;
        let render_dir = scratch.path().join("html");

        let source_arg = source.to_string_lossy();
        let render_arg = render_dir.to_string_lossy();
        run_tool(
            "hwp5html",
            hwp5html.as_os_str(),
            [source_arg.as_ref(), "--output", render_arg.as_ref()],
            config.process_timeout_secs,
        )
        .await?;

        let index = render_dir.join("index.xhtml");
        if !index.is_file() {
            return Err(UmbauError::backend(format!(
                "hwp5html exited cleanly but produced no index.xhtml for {}",
                source.display()
            )));
        }

        let styles = render_dir.join("styles.css");
        let stylesheet = styles.is_file().then_some(styles.as_path());

        let rendered = scratch.path().join(&file_name);
        render_pdf(&index, &rendered, stylesheet, config).await?;

        tracing::debug!(source = %source.display(), "hwp render pipeline complete");

        publish_file(&rendered, dest_dir, &file_name).await
    }
}
