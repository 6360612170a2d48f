//! Multipart MIME envelope parsing for MHTML archives.
//!
//! Decodes the outer envelope into an ordered list of [`MimePart`]s: boundary
//! discovery from the top-level `Content-Type`, line-anchored part splitting,
//! RFC 2822 header folding and per-part transfer decoding (base64,
//! quoted-printable, identity).
//!
//! Splitting is deliberately strict: a separator is a line that *starts* with
//! `--<boundary>` and carries nothing after it except the optional `--`
//! closing marker and trailing whitespace. Boundary text quoted inside a part
//! body mid-line never splits.

use crate::types::ExtractedHtml;
use crate::{Result, UmbauError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

/// Content-Transfer-Encoding of a part body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    Base64,
    QuotedPrintable,
    /// 7bit / 8bit / binary: bytes pass through unchanged.
    Identity,
}

impl TransferEncoding {
    fn from_header(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("base64") => Self::Base64,
            Some("quoted-printable") => Self::QuotedPrintable,
            _ => Self::Identity,
        }
    }
}

/// One decoded part of the archive.
#[derive(Debug, Clone)]
pub struct MimePart {
    /// Full `Content-Type` value, parameters included.
    pub content_type: String,
    /// `Content-Location` as written, if present.
    pub content_location: Option<String>,
    /// `Content-ID` with surrounding angle brackets stripped, if present.
    pub content_id: Option<String>,
    pub transfer_encoding: TransferEncoding,
    /// Body bytes after transfer decoding.
    pub body: Vec<u8>,
}

impl MimePart {
    /// Lower-cased `type/subtype` with parameters stripped.
    pub fn media_type(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_lowercase()
    }

    /// `charset` parameter of the content type, if declared.
    pub fn charset(&self) -> Option<String> {
        content_type_param(&self.content_type, "charset")
    }
}

/// A parsed MHTML archive: ordered parts plus the index of the root part.
#[derive(Debug)]
pub struct MhtmlDocument {
    pub root_part_index: usize,
    pub parts: Vec<MimePart>,
}

impl MhtmlDocument {
    pub fn root(&self) -> &MimePart {
        &self.parts[self.root_part_index]
    }

    /// Resolve references in the root part and return self-contained HTML.
    pub fn into_html(self) -> Result<ExtractedHtml> {
        super::inline::inline_document(self)
    }
}

/// Parse raw archive bytes into parts.
pub fn parse(data: &[u8]) -> Result<MhtmlDocument> {
    let (header_block, body) = split_header_block(data)
        .ok_or_else(|| UmbauError::malformed("No header/body separator found in archive"))?;

    let headers = parse_headers(header_block);
    let content_type = headers
        .get("content-type")
        .ok_or_else(|| UmbauError::malformed("Archive envelope has no Content-Type header"))?;

    if !content_type.trim().to_lowercase().starts_with("multipart/") {
        return Err(UmbauError::malformed(format!(
            "Archive envelope is not multipart (Content-Type: {})",
            content_type.split(';').next().unwrap_or("").trim()
        )));
    }

    let boundary = content_type_param(content_type, "boundary")
        .ok_or_else(|| UmbauError::malformed("Multipart Content-Type has no boundary parameter"))?;

    let parts = split_parts(body, &boundary)?;
    if parts.is_empty() {
        return Err(UmbauError::malformed("Archive contains no parts"));
    }

    let root_part_index = parts
        .iter()
        .position(|p| p.media_type() == "text/html")
        .ok_or_else(|| UmbauError::malformed("Archive contains no text/html root part"))?;

    Ok(MhtmlDocument { root_part_index, parts })
}

/// Locate the blank line separating headers from body; returns both slices.
fn split_header_block(data: &[u8]) -> Option<(&[u8], &[u8])> {
    let crlf = find_subsequence(data, b"\r\n\r\n").map(|i| (i, i + 4));
    let lf = find_subsequence(data, b"\n\n").map(|i| (i, i + 2));

    let (end, body_start) = match (crlf, lf) {
        (Some(c), Some(l)) => {
            if c.0 <= l.0 {
                c
            } else {
                l
            }
        }
        (Some(c), None) => c,
        (None, Some(l)) => l,
        (None, None) => return None,
    };
    Some((&data[..end], &data[body_start..]))
}

fn find_subsequence(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Parsed header fields in document order, names lower-cased.
pub(crate) struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Parse a header block with RFC 2822 folding (continuation lines start with
/// whitespace and extend the previous field).
pub(crate) fn parse_headers(block: &[u8]) -> Headers {
    let text = String::from_utf8_lossy(block);
    let mut fields: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.is_empty() {
            continue;
        }
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some((_, value)) = fields.last_mut() {
                value.push(' ');
                value.push_str(line.trim());
            }
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            fields.push((name.trim().to_lowercase(), value.trim().to_string()));
        }
    }

    Headers(fields)
}

/// Extract a parameter (e.g. `boundary`, `charset`) from a structured header
/// value, handling quoted and bare forms case-insensitively.
pub(crate) fn content_type_param(value: &str, param: &str) -> Option<String> {
    for segment in value.split(';').skip(1) {
        let Some((name, raw)) = segment.split_once('=') else {
            continue;
        };
        if !name.trim().eq_ignore_ascii_case(param) {
            continue;
        }
        let raw = raw.trim();
        let unquoted = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')).unwrap_or(raw);
        return Some(unquoted.to_string());
    }
    None
}

enum BoundaryLine {
    Separator,
    Terminator,
    Content,
}

/// Classify a raw line against the declared boundary.
///
/// A separator must start the line with `--<boundary>` and carry nothing else
/// except the closing `--` and trailing whitespace; anything more is content.
fn classify_line(line: &[u8], boundary: &str) -> BoundaryLine {
    let trimmed = trim_line_ending(line);
    let Some(rest) = trimmed
        .strip_prefix(b"--")
        .and_then(|r| r.strip_prefix(boundary.as_bytes()))
    else {
        return BoundaryLine::Content;
    };

    let rest = match rest.strip_prefix(b"--") {
        Some(after_close) => {
            if after_close.iter().all(|b| b.is_ascii_whitespace()) {
                return BoundaryLine::Terminator;
            }
            rest
        }
        None => rest,
    };

    if rest.iter().all(|b| b.is_ascii_whitespace()) {
        BoundaryLine::Separator
    } else {
        BoundaryLine::Content
    }
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Split the envelope body into decoded parts along boundary lines.
fn split_parts(body: &[u8], boundary: &str) -> Result<Vec<MimePart>> {
    let mut parts = Vec::new();
    // None until the first separator: preamble bytes are discarded.
    let mut current: Option<Vec<u8>> = None;

    for line in body.split_inclusive(|&b| b == b'\n') {
        match classify_line(line, boundary) {
            BoundaryLine::Separator => {
                if let Some(raw) = current.take() {
                    parts.push(finish_part(raw)?);
                }
                current = Some(Vec::new());
            }
            BoundaryLine::Terminator => {
                if let Some(raw) = current.take() {
                    parts.push(finish_part(raw)?);
                }
                break;
            }
            BoundaryLine::Content => {
                if let Some(raw) = current.as_mut() {
                    raw.extend_from_slice(line);
                }
            }
        }
    }

    // Unterminated archive: keep what accumulated after the last separator.
    if let Some(raw) = current.take() {
        parts.push(finish_part(raw)?);
    }

    Ok(parts)
}

/// Parse one raw part (headers + encoded body) into a decoded `MimePart`.
fn finish_part(mut raw: Vec<u8>) -> Result<MimePart> {
    // The line break preceding a boundary belongs to the delimiter, not the body.
    if raw.ends_with(b"\n") {
        raw.pop();
        if raw.ends_with(b"\r") {
            raw.pop();
        }
    }

    let (header_block, body) = split_header_block(&raw).unwrap_or((&[][..], &raw[..]));
    let headers = parse_headers(header_block);

    let content_type = headers
        .get("content-type")
        .unwrap_or("text/plain")
        .to_string();
    let content_location = headers.get("content-location").map(|v| v.to_string());
    let content_id = headers
        .get("content-id")
        .map(|v| v.trim().trim_start_matches('<').trim_end_matches('>').to_string());
    let transfer_encoding = TransferEncoding::from_header(headers.get("content-transfer-encoding"));

    let body = decode_body(body, transfer_encoding)?;

    Ok(MimePart {
        content_type,
        content_location,
        content_id,
        transfer_encoding,
        body,
    })
}

fn decode_body(body: &[u8], encoding: TransferEncoding) -> Result<Vec<u8>> {
    match encoding {
        TransferEncoding::Identity => Ok(body.to_vec()),
        TransferEncoding::Base64 => {
            let compact: Vec<u8> = body.iter().copied().filter(|b| !b.is_ascii_whitespace()).collect();
            BASE64
                .decode(&compact)
                .map_err(|e| UmbauError::malformed_with_source("Invalid base64 part body", e))
        }
        TransferEncoding::QuotedPrintable => {
            quoted_printable::decode(body, quoted_printable::ParseMode::Robust)
                .map_err(|e| UmbauError::malformed_with_source("Invalid quoted-printable part body", e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn archive(body: &str) -> Vec<u8> {
        let mut data = String::new();
        data.push_str("MIME-Version: 1.0\r\n");
        data.push_str("Content-Type: multipart/related; boundary=\"PART.SEP\"\r\n\r\n");
        data.push_str(body);
        data.into_bytes()
    }

    #[test]
    fn test_parse_two_parts_and_root_selection() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Location: http://example.com/page.html\r\n\
\r\n\
<html><body>hi</body></html>\r\n\
--PART.SEP\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
Content-Location: http://example.com/logo.png\r\n\
\r\n\
iVBORw0KGgo=\r\n\
--PART.SEP--\r\n",
        );

        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts.len(), 2);
        assert_eq!(doc.root_part_index, 0);
        assert_eq!(doc.root().media_type(), "text/html");
        assert_eq!(doc.root().charset().as_deref(), Some("utf-8"));
        assert_eq!(doc.parts[1].body, vec![0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n']);
    }

    #[test]
    fn test_no_html_part_is_malformed() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/plain\r\n\
\r\n\
just text\r\n\
--PART.SEP--\r\n",
        );
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, UmbauError::MalformedArchive { .. }));
        assert!(err.to_string().contains("no text/html root part"));
    }

    #[test]
    fn test_quoted_boundary_text_is_not_a_separator() {
        // The token appears mid-line and at line start without the -- prefix;
        // neither may split the part.
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>the marker PART.SEP appears here</p>\r\n\
PART.SEP on its own line is still content\r\n\
<p>--PART.SEP.EXTENDED also stays content</p>\r\n\
--PART.SEP--\r\n",
        );

        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts.len(), 1);
        let body = String::from_utf8(doc.parts[0].body.clone()).unwrap();
        assert!(body.contains("still content"));
        assert!(body.contains("--PART.SEP.EXTENDED"));
    }

    #[test]
    fn test_content_after_terminator_is_epilogue() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>body</p>\r\n\
--PART.SEP--\r\n\
this epilogue is discarded\r\n",
        );
        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts.len(), 1);
        assert!(!String::from_utf8_lossy(&doc.parts[0].body).contains("epilogue"));
    }

    #[test]
    fn test_unterminated_archive_keeps_last_part() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>no terminator</p>\r\n",
        );
        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts.len(), 1);
    }

    #[test]
    fn test_header_folding() {
        let block = b"Content-Type: multipart/related;\r\n\tboundary=\"abc\";\r\n type=\"text/html\"\r\n";
        let headers = parse_headers(block);
        let ct = headers.get("content-type").unwrap();
        assert_eq!(content_type_param(ct, "boundary").as_deref(), Some("abc"));
    }

    #[test]
    fn test_content_type_param_unquoted() {
        assert_eq!(
            content_type_param("multipart/related; boundary=----=_NextPart_000", "boundary").as_deref(),
            Some("----=_NextPart_000")
        );
        assert_eq!(content_type_param("text/html; charset=EUC-KR", "charset").as_deref(), Some("EUC-KR"));
        assert_eq!(content_type_param("text/html", "charset"), None);
    }

    #[test]
    fn test_content_id_brackets_stripped() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>x</p>\r\n\
--PART.SEP\r\n\
Content-Type: image/gif\r\n\
Content-ID: <img0001@local>\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
R0lGODlh\r\n\
--PART.SEP--\r\n",
        );
        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts[1].content_id.as_deref(), Some("img0001@local"));
    }

    #[test]
    fn test_quoted_printable_body_decoding() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html; charset=\"utf-8\"\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
<p>caf=C3=A9 =\r\nwrapped</p>\r\n\
--PART.SEP--\r\n",
        );
        let doc = parse(&data).unwrap();
        let body = String::from_utf8(doc.parts[0].body.clone()).unwrap();
        assert!(body.contains("café wrapped"));
    }

    #[test]
    fn test_base64_body_tolerates_line_wrapping() {
        let data = archive(
            "--PART.SEP\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>x</p>\r\n\
--PART.SEP\r\n\
Content-Type: image/png\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
aGVs\r\n\
bG8=\r\n\
--PART.SEP--\r\n",
        );
        let doc = parse(&data).unwrap();
        assert_eq!(doc.parts[1].body, b"hello");
    }

    #[test]
    fn test_not_multipart_is_malformed() {
        let data = b"Content-Type: text/html\r\n\r\n<html></html>".to_vec();
        let err = parse(&data).unwrap_err();
        assert!(matches!(err, UmbauError::MalformedArchive { .. }));
    }

    #[test]
    fn test_missing_boundary_is_malformed() {
        let data = b"Content-Type: multipart/related\r\n\r\nbody".to_vec();
        let err = parse(&data).unwrap_err();
        assert!(err.to_string().contains("boundary"));
    }

    #[test]
    fn test_garbage_is_malformed() {
        let err = parse(b"no mime structure here at all").unwrap_err();
        assert!(matches!(err, UmbauError::MalformedArchive { .. }));
    }

    #[test]
    fn test_lf_only_archive() {
        let mut data = String::new();
        data.push_str("Content-Type: multipart/related; boundary=B\n\n");
        data.push_str("--B\nContent-Type: text/html\n\n<p>unix line endings</p>\n--B--\n");

        let doc = parse(data.as_bytes()).unwrap();
        assert_eq!(doc.parts.len(), 1);
        assert_eq!(
            String::from_utf8(doc.parts[0].body.clone()).unwrap(),
            "<p>unix line endings</p>"
        );
    }
}
