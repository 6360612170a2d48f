//! LibreOffice headless conversion backend.
//!
//! The primary strategy for every office-format pair: spawns
//! `soffice --headless --convert-to <ext> --outdir <scratch> <input>`,
//! verifies the expected output file appeared, and atomically publishes it to
//! the destination directory.
//!
//! Every invocation gets its own user-profile directory
//! (`-env:UserInstallation=...`). LibreOffice serializes on a lock inside the
//! profile, so concurrent conversions sharing one profile show up as
//! spurious timeouts; isolated profiles remove the contention entirely.
//!
//! # Binary discovery
//!
//! `UMBAU_SOFFICE_PATH` → `ConversionConfig::soffice_path` → platform install
//! locations → PATH (`soffice`, then `libreoffice`).

use super::process::run_tool;
use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::{ScratchDir, publish_file};
use crate::{Result, UmbauError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub struct SofficeBackend;

fn soffice_candidates(config: &ConversionConfig) -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    for var in ["UMBAU_SOFFICE_PATH", "SOFFICE_PATH", "LIBREOFFICE_PATH"] {
        if let Some(value) = std::env::var_os(var).filter(|v| !v.is_empty()) {
            candidates.push(PathBuf::from(value));
        }
    }

    if let Some(path) = &config.soffice_path {
        candidates.push(path.clone());
    }

    if cfg!(target_os = "macos") {
        candidates.push(PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"));
    }

    if cfg!(target_os = "windows") {
        candidates.push(PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.exe"));
    }

    if let Some(path_env) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&path_env) {
            candidates.push(dir.join("soffice"));
            candidates.push(dir.join("libreoffice"));
            candidates.push(dir.join("soffice.exe"));
        }
    }

    candidates
}

fn locate_soffice(config: &ConversionConfig) -> Result<PathBuf> {
    for candidate in soffice_candidates(config) {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    Err(UmbauError::MissingDependency(
        "LibreOffice (soffice) not found. Install LibreOffice or set UMBAU_SOFFICE_PATH.".to_string(),
    ))
}

/// Find the converted file inside the scratch outdir.
///
/// LibreOffice normally writes `<stem>.<ext>`, but some filters mangle the
/// stem (e.g. trailing dots), so fall back to a case-insensitive scan.
fn find_converted(outdir: &Path, stem: &str, target_ext: &str) -> Option<PathBuf> {
    let expected = outdir.join(format!("{}.{}", stem, target_ext));
    if expected.is_file() {
        return Some(expected);
    }

    let stem_lower = stem.to_lowercase();
    let suffix = format!(".{}", target_ext);
    std::fs::read_dir(outdir).ok()?.filter_map(|e| e.ok()).find_map(|entry| {
        let name = entry.file_name().to_string_lossy().to_lowercase();
        (name.starts_with(&stem_lower) && name.ends_with(&suffix)).then(|| entry.path())
    })
}

#[async_trait]
impl ConversionBackend for SofficeBackend {
    fn id(&self) -> BackendId {
        BackendId::Soffice
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        config: &ConversionConfig,
    ) -> Result<PathBuf> {
        let soffice = locate_soffice(config)?;
        let file_name = output_file_name(source, target_ext)?;
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| UmbauError::validation(format!("Invalid input file name: {}", source.display())))?;

        let scratch = ScratchDir::new("umbau_soffice").await?;
        let outdir = scratch.path().join("out");
        tokio::fs::create_dir_all(&outdir).await?;
        let profile = scratch.path().join("profile");

        let profile_arg = format!("-env:UserInstallation=file://{}", profile.display());
        let outdir_arg = outdir.to_string_lossy();
        let source_arg = source.to_string_lossy();
        let output = run_tool(
            "soffice",
            soffice.as_os_str(),
            [
                profile_arg.as_str(),
                "--headless",
                "--convert-to",
                target_ext,
                "--outdir",
                outdir_arg.as_ref(),
                source_arg.as_ref(),
            ],
            config.process_timeout_secs,
        )
        .await?;

        let converted = find_converted(&outdir, stem, target_ext).ok_or_else(|| {
            let log = if output.stderr.trim().is_empty() {
                output.stdout.trim()
            } else {
                output.stderr.trim()
            };
            UmbauError::backend(format!(
                "LibreOffice reported success but produced no {} output for {}. Log: {}",
                target_ext,
                source.display(),
                log
            ))
        })?;

        if tokio::fs::metadata(&converted).await?.len() == 0 {
            return Err(UmbauError::backend(format!(
                "LibreOffice produced an empty {} file for {}",
                target_ext,
                source.display()
            )));
        }

        tracing::debug!(
            source = %source.display(),
            target = target_ext,
            "soffice conversion complete"
        );

        publish_file(&converted, dest_dir, &file_name).await
    }
}
