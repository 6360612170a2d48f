//! Reference resolution and resource inlining for MHTML archives.
//!
//! Rewrites the root part's markup into a self-contained document:
//! stylesheet `<link>` elements are replaced by `<style>` blocks splicing the
//! referenced css part, `src`/`href` attributes and css `url(...)` tokens
//! pointing at binary parts become `data:` URIs. References that resolve to
//! no part are left byte-for-byte untouched and counted: a warning, never a
//! failure.
//!
//! All passes run in document order over the markup, so output is
//! deterministic: re-running extraction on the same archive produces
//! identical bytes.

use super::parser::{MhtmlDocument, MimePart};
use crate::Result;
use crate::types::ExtractedHtml;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::OnceLock;

static LINK_TAG_RE: OnceLock<Regex> = OnceLock::new();
static HREF_IN_TAG_RE: OnceLock<Regex> = OnceLock::new();
static ATTR_REF_RE: OnceLock<Regex> = OnceLock::new();
static CSS_URL_RE: OnceLock<Regex> = OnceLock::new();

fn link_tag_regex() -> &'static Regex {
    LINK_TAG_RE.get_or_init(|| Regex::new(r"(?i)<link\b[^>]*>").unwrap())
}

fn href_in_tag_regex() -> &'static Regex {
    HREF_IN_TAG_RE.get_or_init(|| Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)')"#).unwrap())
}

fn attr_ref_regex() -> &'static Regex {
    ATTR_REF_RE.get_or_init(|| Regex::new(r#"(?i)\b(src|href)\s*=\s*(["'])([^"']*)(["'])"#).unwrap())
}

fn css_url_regex() -> &'static Regex {
    CSS_URL_RE.get_or_init(|| Regex::new(r#"(?i)url\(\s*(?:"([^")]*)"|'([^')]*)'|([^'")][^)]*))\s*\)"#).unwrap())
}

/// Lookup structure over the archive's non-root parts.
struct PartIndex {
    by_location: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
    /// (normalized location, part index) for relative-reference matching.
    locations: Vec<(String, usize)>,
}

fn normalize_location(location: &str) -> String {
    location.trim().to_lowercase()
}

impl PartIndex {
    fn build(doc: &MhtmlDocument) -> Self {
        let mut by_location = HashMap::new();
        let mut by_id = HashMap::new();
        let mut locations = Vec::new();

        for (i, part) in doc.parts.iter().enumerate() {
            if i == doc.root_part_index {
                continue;
            }
            if let Some(location) = &part.content_location {
                let key = normalize_location(location);
                by_location.entry(key.clone()).or_insert(i);
                locations.push((key, i));
            }
            if let Some(id) = &part.content_id {
                by_id.entry(id.trim().to_lowercase()).or_insert(i);
            }
        }

        Self {
            by_location,
            by_id,
            locations,
        }
    }

    /// Resolve a markup reference to a part index.
    ///
    /// `cid:` URIs go through the content-id index; everything else matches
    /// the location index exactly. Relative references additionally try a
    /// unique path-suffix match against the stored absolute locations.
    fn resolve(&self, reference: &str) -> Option<usize> {
        if let Some(id) = reference.strip_prefix("cid:") {
            return self.by_id.get(&id.trim().to_lowercase()).copied();
        }

        let needle = normalize_location(reference);
        if let Some(&i) = self.by_location.get(&needle) {
            return Some(i);
        }

        // Relative reference against absolute Content-Location values. Only a
        // unique suffix match counts: "resolve to exactly one other part".
        if !needle.contains("://") {
            let suffix = format!("/{}", needle);
            let mut matches = self.locations.iter().filter(|(loc, _)| loc.ends_with(&suffix));
            if let (Some(&(_, i)), None) = (matches.next(), matches.next()) {
                return Some(i);
            }
        }

        None
    }
}

/// References that are not archive lookups at all.
fn is_external_scheme(reference: &str) -> bool {
    let r = reference.trim();
    r.is_empty()
        || r.starts_with('#')
        || r.starts_with("data:")
        || r.starts_with("javascript:")
        || r.starts_with("mailto:")
        || r.starts_with("about:")
}

/// MIME type to stamp into a data URI for a part.
fn data_uri_mime(part: &MimePart, reference: &str) -> String {
    let media_type = part.media_type();
    if !media_type.is_empty() && media_type != "application/octet-stream" {
        return media_type;
    }
    mime_guess::from_path(reference)
        .first_raw()
        .unwrap_or("application/octet-stream")
        .to_string()
}

fn data_uri(part: &MimePart, reference: &str) -> String {
    format!("data:{};base64,{}", data_uri_mime(part, reference), BASE64.encode(&part.body))
}

/// Decode part bytes as text using the declared charset, defaulting to UTF-8
/// with lossy replacement for undecodable input.
pub(crate) fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(|label| encoding_rs::Encoding::for_label(label.trim().as_bytes()))
        .unwrap_or(encoding_rs::UTF_8);
    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Replace stylesheet `<link>` elements with `<style>` blocks splicing the
/// referenced css part's decoded text.
fn splice_stylesheets(markup: &str, index: &PartIndex, doc: &MhtmlDocument) -> String {
    link_tag_regex()
        .replace_all(markup, |caps: &Captures| {
            let tag = &caps[0];
            let Some(href_caps) = href_in_tag_regex().captures(tag) else {
                return tag.to_string();
            };
            let reference = href_caps
                .get(1)
                .or_else(|| href_caps.get(2))
                .map(|m| m.as_str())
                .unwrap_or("");

            if is_external_scheme(reference) {
                return tag.to_string();
            }
            let Some(part_index) = index.resolve(reference) else {
                // Leave it: the attribute pass counts the miss.
                return tag.to_string();
            };

            let part = &doc.parts[part_index];
            if part.media_type() != "text/css" {
                return tag.to_string();
            }

            let css = decode_text(&part.body, part.charset().as_deref());
            format!("<style type=\"text/css\">\n{}\n</style>", css)
        })
        .into_owned()
}

/// Inline `src="..."` / `href="..."` attribute references.
fn inline_attr_refs(markup: &str, index: &PartIndex, doc: &MhtmlDocument, unresolved: &mut usize) -> String {
    attr_ref_regex()
        .replace_all(markup, |caps: &Captures| {
            let (attr, quote, reference) = (&caps[1], &caps[2], &caps[3]);
            let original = caps[0].to_string();

            if is_external_scheme(reference) {
                return original;
            }
            let Some(part_index) = index.resolve(reference) else {
                tracing::warn!(reference, "unresolved archive reference");
                *unresolved += 1;
                return original;
            };

            let part = &doc.parts[part_index];
            // Saved sub-documents stay as references; only resources inline.
            if part.media_type() == "text/html" {
                return original;
            }

            format!("{}={}{}{}", attr, quote, data_uri(part, reference), quote)
        })
        .into_owned()
}

/// Inline `url(...)` references inside style attributes and `<style>` blocks
/// (including css spliced by [`splice_stylesheets`]).
fn inline_css_urls(markup: &str, index: &PartIndex, doc: &MhtmlDocument, unresolved: &mut usize) -> String {
    css_url_regex()
        .replace_all(markup, |caps: &Captures| {
            let reference = caps
                .get(1)
                .or_else(|| caps.get(2))
                .or_else(|| caps.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            let original = caps[0].to_string();

            if is_external_scheme(reference) {
                return original;
            }
            let Some(part_index) = index.resolve(reference) else {
                tracing::warn!(reference, "unresolved css url reference");
                *unresolved += 1;
                return original;
            };

            format!("url(\"{}\")", data_uri(&doc.parts[part_index], reference))
        })
        .into_owned()
}

/// Resolve and inline every reference in the document's root part.
pub(crate) fn inline_document(doc: MhtmlDocument) -> Result<ExtractedHtml> {
    let root = doc.root();
    let markup = decode_text(&root.body, root.charset().as_deref());

    let index = PartIndex::build(&doc);
    let mut unresolved = 0usize;

    let markup = splice_stylesheets(&markup, &index, &doc);
    let markup = inline_attr_refs(&markup, &index, &doc, &mut unresolved);
    let markup = inline_css_urls(&markup, &index, &doc, &mut unresolved);

    Ok(ExtractedHtml {
        html: markup.into_bytes(),
        unresolved_references: unresolved,
    })
}
