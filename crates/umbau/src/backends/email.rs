//! Email-parser fallback backend for MHT archives.
//!
//! Last resort when the structural extractor rejects the archive: treat the
//! file as a generic RFC 822 message, take the first `text/html` body part
//! and write it verbatim. No reference resolution, no inlining: embedded
//! images stay broken, but the text content survives.

use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::publish_bytes;
use crate::{Result, UmbauError};
use async_trait::async_trait;
use mail_parser::MessageParser;
use std::path::{Path, PathBuf};

pub struct EmailParserBackend;

fn first_html_body(data: &[u8]) -> Result<String> {
    let message = MessageParser::default()
        .parse(data)
        .ok_or_else(|| UmbauError::backend("Failed to parse file as a MIME message"))?;

    message
        .body_html(0)
        .map(|s| s.into_owned())
        .ok_or_else(|| UmbauError::backend("No HTML body part found in MIME message"))
}

#[async_trait]
impl ConversionBackend for EmailParserBackend {
    fn id(&self) -> BackendId {
        BackendId::EmailParser
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
                "email-parser only produces html, not {}",
                target_ext
            )));
        }

        let file_name = output_file_name(source, target_ext)?;
        let bytes = tokio::fs::read(source).await?;
        let html = first_html_body(&bytes)?;

        tracing::debug!(source = %source.display(), "email-parser fallback extraction complete");

        publish_bytes(dest_dir, &file_name, html.as_bytes()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIMPLE_MHT: &str = "From: <saved by Umbau>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/related; boundary=\"----=_Part_01\"\r\n\
\r\n\
------=_Part_01\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: 7bit\r\n\
\r\n\
<html><body><p>hello from the archive</p></body></html>\r\n\
------=_Part_01--\r\n";

    #[test]
    fn test_first_html_body() {
        let html = first_html_body(SIMPLE_MHT.as_bytes()).unwrap();
        assert!(html.contains("hello from the archive"));
    }

    #[test]
    fn test_no_html_body_is_backend_error() {
        let plain = "From: a@b\r\nContent-Type: text/plain\r\n\r\njust text\r\n";
        let err = first_html_body(plain.as_bytes()).unwrap_err();
        assert!(matches!(err, UmbauError::Backend { .. }));
    }

    #[tokio::test]
    async fn test_convert_writes_verbatim_body() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("page.mht");
        std::fs::write(&source, SIMPLE_MHT).unwrap();

        let out = EmailParserBackend
            .convert(&source, dir.path(), "html", &ConversionConfig::default())
            .await
            .unwrap();
        assert_eq!(out, dir.path().join("page.html"));
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("hello from the archive"));
    }
}
