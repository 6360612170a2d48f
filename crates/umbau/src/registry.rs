//! Conversion registry.
//!
//! Static mapping from input extension to the output extensions to produce,
//! and from a (source, target) pair to the ordered backend chain to attempt.
//! Loaded once at process start, immutable thereafter: both lookups are pure
//! reads over `Lazy` tables and need no locking.
//!
//! Unknown input extensions deliberately resolve to a single `pdf` output
//! served by the default chain (LibreOffice accepts most things); this is a
//! policy choice carried over from the original system, not an error.

use crate::backends::BackendId;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Output produced for input extensions with no configured rule.
pub const DEFAULT_OUTPUT: &str = "pdf";

/// Backend chain used for `unknown → pdf`.
static DEFAULT_PDF_CHAIN: &[BackendId] = &[BackendId::Soffice];

/// Input extension (lower-cased, dot-prefixed) → ordered output extensions.
static OUTPUT_RULES: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();

    m.insert(".doc", &["docx", "pdf"]);
    m.insert(".docx", &["pdf"]);
    m.insert(".rtf", &["pdf"]);
    m.insert(".odt", &["pdf"]);
    m.insert(".xls", &["xlsx"]);
    m.insert(".xlsm", &["xlsx"]);
    m.insert(".ppt", &["pptx"]);
    m.insert(".hwp", &["pdf"]);
    m.insert(".mht", &["html"]);
    m.insert(".mhtml", &["html"]);
    m.insert(".html", &["pdf"]);
    m.insert(".htm", &["pdf"]);

    m
});

/// (input extension, output extension) → ordered backend chain.
static BACKEND_CHAINS: Lazy<HashMap<(&'static str, &'static str), &'static [BackendId]>> = Lazy::new(|| {
    use BackendId::*;

    static WORD_CHAIN: &[BackendId] = &[Soffice, Abiword];
    static SHEET_CHAIN: &[BackendId] = &[Soffice, SheetRewrite];
    static MHT_CHAIN: &[BackendId] = &[MhtmlExtractor, EmailParser];
    static HTML_PDF_CHAIN: &[BackendId] = &[Weasyprint, Soffice];
    static PPT_CHAIN: &[BackendId] = &[Soffice];
    static HWP_CHAIN: &[BackendId] = &[HwpRender];

    let mut m: HashMap<(&'static str, &'static str), &'static [BackendId]> = HashMap::new();

    m.insert((".doc", "docx"), WORD_CHAIN);
    m.insert((".doc", "pdf"), WORD_CHAIN);
    m.insert((".docx", "pdf"), WORD_CHAIN);
    m.insert((".rtf", "pdf"), WORD_CHAIN);
    m.insert((".odt", "pdf"), WORD_CHAIN);
    m.insert((".xls", "xlsx"), SHEET_CHAIN);
    m.insert((".xlsm", "xlsx"), SHEET_CHAIN);
    m.insert((".ppt", "pptx"), PPT_CHAIN);
    m.insert((".hwp", "pdf"), HWP_CHAIN);
    m.insert((".mht", "html"), MHT_CHAIN);
    m.insert((".mhtml", "html"), MHT_CHAIN);
    m.insert((".html", "pdf"), HTML_PDF_CHAIN);
    m.insert((".htm", "pdf"), HTML_PDF_CHAIN);

    m
});

/// Normalize an extension to the registry key form: lower-cased and
/// dot-prefixed ("XLS" and ".xls" both become ".xls").
pub fn normalize_extension(ext: &str) -> String {
    let lower = ext.to_lowercase();
    if lower.starts_with('.') { lower } else { format!(".{}", lower) }
}

/// Output extensions configured for an input extension.
///
/// Unknown extensions return `["pdf"]`: the default-to-PDF policy.
pub fn outputs_for(extension: &str) -> Vec<&'static str> {
    let key = normalize_extension(extension);
    match OUTPUT_RULES.get(key.as_str()) {
        Some(outputs) => outputs.to_vec(),
        None => vec![DEFAULT_OUTPUT],
    }
}

/// Ordered backend chain for a (source, target) pair.
///
/// Unknown inputs targeting `pdf` fall back to the default chain. A
/// registered input with no chain entry for the requested output returns
/// `None`: a configuration error surfaced by the orchestrator at request
/// time, not at load time.
pub fn backend_chain_for(input_extension: &str, output_extension: &str) -> Option<&'static [BackendId]> {
    let key = normalize_extension(input_extension);
    if let Some(chain) = BACKEND_CHAINS.get(&(key.as_str(), output_extension)) {
        return Some(chain);
    }
    if !OUTPUT_RULES.contains_key(key.as_str()) && output_extension == DEFAULT_OUTPUT {
        return Some(DEFAULT_PDF_CHAIN);
    }
    None
}

/// True if the extension has an explicitly configured rule.
///
/// The directory walker uses this to decide which files to pick up; the
/// default-to-PDF policy applies only to files addressed directly.
pub fn is_registered(extension: &str) -> bool {
    OUTPUT_RULES.contains_key(normalize_extension(extension).as_str())
}

/// All registered input extensions (dot-prefixed, stable order not guaranteed).
pub fn registered_extensions() -> Vec<&'static str> {
    OUTPUT_RULES.keys().copied().collect()
}

/// All configured (input, output) pairs, for introspection and tests.
pub fn configured_pairs() -> Vec<(&'static str, &'static str)> {
    BACKEND_CHAINS.keys().copied().collect()
}
