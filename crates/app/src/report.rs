//! CSV export of the label summary table.

use doc_model::SummaryTable;
use std::io::Write;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),
}

pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Write the `Label,Left,Right` header row.
    pub include_headers: bool,

    pub delimiter: u8,

    /// Skip rows that do not yet have text on both sides.
    pub complete_only: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { include_headers: true, delimiter: b',', complete_only: false }
    }
}

/// Writes one row per summary entry, in table order. Missing sides are
/// written as empty fields.
pub fn export_summary_csv<W: Write>(
    writer: W,
    summary: &SummaryTable,
    config: &ReportConfig,
) -> ReportResult<()> {
    let mut csv_writer = csv::WriterBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(config.include_headers)
        .from_writer(writer);

    if config.include_headers {
        csv_writer.write_record(["Label", "Left", "Right"])?;
    }

    for entry in summary.entries() {
        if config.complete_only && !entry.is_complete() {
            continue;
        }

        csv_writer.write_record([
            entry.label.as_str(),
            entry.left_text.as_deref().unwrap_or(""),
            entry.right_text.as_deref().unwrap_or(""),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}
