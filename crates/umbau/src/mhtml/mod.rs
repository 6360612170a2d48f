//! MHTML structural extractor.
//!
//! Decodes a multipart MIME archive (the `.mht`/`.mhtml` serialization of a
//! web page), resolves `Content-Location` and `cid:` references between
//! parts, and reassembles a single self-contained HTML document with binary
//! resources inlined as `data:` URIs and stylesheets spliced in place.
//!
//! The extractor is strict about structure (no boundary, no parts, no
//! `text/html` root → [`UmbauError::MalformedArchive`](crate::UmbauError))
//! but lenient about content: references that resolve to nothing are left
//! untouched and reported as a warning count on the result.
//!
//! # Example
//!
//! ```rust,no_run
//! # fn main() -> umbau::Result<()> {
//! let bytes = std::fs::read("saved-page.mht")?;
//! let extracted = umbau::mhtml::extract(&bytes)?;
//! std::fs::write("saved-page.html", &extracted.html)?;
//! println!("{} unresolved references", extracted.unresolved_references);
//! # Ok(())
//! # }
//! ```

mod inline;
mod parser;

pub use parser::{MhtmlDocument, MimePart, TransferEncoding, parse};

use crate::Result;
use crate::types::ExtractedHtml;

/// Extract a self-contained HTML document from raw archive bytes.
///
/// Equivalent to [`parse`] followed by [`MhtmlDocument::into_html`].
pub fn extract(data: &[u8]) -> Result<ExtractedHtml> {
    parse(data)?.into_html()
}
