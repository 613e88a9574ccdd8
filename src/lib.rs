//! Daily remark summaries for call-center dialer exports.
//!
//! Each uploaded file is loaded, stripped of noise rows, and summarized per
//! (DATE, CLIENT) seven ways: combined, predictive and manual overall, then
//! predictive and manual again per card cycle and per cycle/balance tier.
//! Batches are merged into one [`combine::SummaryReport`].
pub mod combine;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod reports;
pub mod slices;
pub mod types;
pub mod util;

use combine::{BatchSummaries, SummaryAccumulator, SummaryReport};
use error::{ReportError, ReportResult};
use std::path::{Path, PathBuf};

/// Load, filter and summarize a single file.
pub fn summarize_file(path: &Path) -> ReportResult<BatchSummaries> {
    let (records, _) = loader::load_file(path)?;
    let (filtered, _) = filter::filter_records(records);
    Ok(BatchSummaries::compute(&filtered))
}

/// Summarize every file in order and merge the results.
///
/// A file with a schema defect (missing columns, unknown format, no sheets)
/// aborts the run unless `skip_bad_files` is set, in which case it is logged
/// and left out. I/O and CSV errors always abort.
pub fn summarize_files(paths: &[PathBuf], skip_bad_files: bool) -> ReportResult<SummaryReport> {
    let mut acc = SummaryAccumulator::new();
    for (idx, path) in paths.iter().enumerate() {
        match summarize_file(path) {
            Ok(batch) => {
                acc.add(batch);
                log::info!("Process Done {} ({})", idx + 1, path.display());
            }
            Err(e) if skip_bad_files && is_schema_defect(&e) => {
                log::warn!("skipping {}: {}", path.display(), e);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(acc.finish())
}

/// Errors that mean the file itself is unusable, as opposed to I/O failures.
pub fn is_schema_defect(e: &ReportError) -> bool {
    matches!(
        e,
        ReportError::MissingColumns { .. }
            | ReportError::UnsupportedInput { .. }
            | ReportError::EmptyWorkbook { .. }
    )
}
