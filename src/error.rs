use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{}: missing required column(s): {}", path.display(), columns.join(", "))]
    MissingColumns { path: PathBuf, columns: Vec<String> },

    #[error("{}: unsupported input file type", path.display())]
    UnsupportedInput { path: PathBuf },

    #[error("{}: workbook has no worksheets", path.display())]
    EmptyWorkbook { path: PathBuf },
}

pub type ReportResult<T> = Result<T, ReportError>;
