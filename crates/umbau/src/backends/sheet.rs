//! In-process spreadsheet rewrite backend.
//!
//! Fallback for xls/xlsm → xlsx when LibreOffice is unavailable: reads the
//! legacy workbook with `calamine` and re-serializes every sheet with
//! `rust_xlsxwriter`. Cell values only: formulas, styling and macros are
//! not carried over, which is acceptable for a last-resort path.

use super::{BackendId, ConversionBackend, output_file_name};
use crate::config::ConversionConfig;
use crate::io::publish_bytes;
use crate::{Result, UmbauError};
use async_trait::async_trait;
use calamine::{Data, Reader, open_workbook_auto};
use rust_xlsxwriter::Workbook;
use std::path::{Path, PathBuf};

pub struct SheetRewriteBackend;

fn rewrite_workbook(source: &Path) -> Result<Vec<u8>> {
    // Wrap format errors; real IO errors bubble up unchanged.
    let mut legacy = match open_workbook_auto(source) {
        Ok(wb) => wb,
        Err(calamine::Error::Io(io_err)) => {
            if io_err.kind() == std::io::ErrorKind::InvalidData {
                return Err(UmbauError::backend(format!(
                    "Cannot detect spreadsheet format: {}",
                    io_err
                )));
            }
            return Err(io_err.into());
        }
        Err(e) => {
            return Err(UmbauError::backend_with_source(
                format!("Failed to read legacy workbook {}", source.display()),
                e,
            ));
        }
    };

    let mut modern = Workbook::new();
    let sheet_names = legacy.sheet_names();
    if sheet_names.is_empty() {
        return Err(UmbauError::backend(format!(
            "Workbook {} contains no sheets",
            source.display()
        )));
    }

    let to_xlsx = |e: rust_xlsxwriter::XlsxError| UmbauError::backend_with_source("Failed to write xlsx", e);

    for name in &sheet_names {
        let Ok(range) = legacy.worksheet_range(name) else {
            continue;
        };

        let worksheet = modern.add_worksheet();
        worksheet.set_name(name).map_err(to_xlsx)?;

        for (r, row) in range.rows().enumerate() {
            let r = r as u32;
            for (c, cell) in row.iter().enumerate() {
                let c = c as u16;
                match cell {
                    Data::Empty => {}
                    Data::String(s) => {
                        worksheet.write_string(r, c, s).map_err(to_xlsx)?;
                    }
                    Data::Float(f) => {
                        worksheet.write_number(r, c, *f).map_err(to_xlsx)?;
                    }
                    Data::Int(i) => {
                        worksheet.write_number(r, c, *i as f64).map_err(to_xlsx)?;
                    }
                    Data::Bool(b) => {
                        worksheet.write_boolean(r, c, *b).map_err(to_xlsx)?;
                    }
                    Data::DateTime(dt) => {
                        worksheet.write_number(r, c, dt.as_f64()).map_err(to_xlsx)?;
                    }
                    Data::DateTimeIso(s) | Data::DurationIso(s) => {
                        worksheet.write_string(r, c, s).map_err(to_xlsx)?;
                    }
                    Data::Error(e) => {
                        worksheet.write_string(r, c, e.to_string()).map_err(to_xlsx)?;
                    }
                }
            }
        }
    }

    modern
        .save_to_buffer()
        .map_err(|e| UmbauError::backend_with_source("Failed to serialize xlsx", e))
}

#[async_trait]
impl ConversionBackend for SheetRewriteBackend {
    fn id(&self) -> BackendId {
        BackendId::SheetRewrite
    }

    async fn convert(
        &self,
        source: &Path,
        dest_dir: &Path,
        target_ext: &str,
        _config: &ConversionConfig,
    ) -> Result<PathBuf> {
        if target_ext != "xlsx" {
            return Err(UmbauError::backend(format!(
                "sheet-rewrite only produces xlsx, not {}",
                target_ext
            )));
        }

        let file_name = output_file_name(source, target_ext)?;
        let bytes = rewrite_workbook(source)?;

        tracing::debug!(source = %source.display(), "sheet rewrite complete");

        publish_bytes(dest_dir, &file_name, &bytes).await
    }
}
