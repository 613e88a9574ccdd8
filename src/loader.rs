use crate::error::{ReportError, ReportResult};
use crate::types::{CallRecord, RawRow, RemarkType, REQUIRED_COLUMNS};
use crate::util::{non_blank, parse_date_safe, parse_f64_safe};
use calamine::{open_workbook_auto, Data, Reader};
use chrono::{Datelike, Weekday};
use csv::{ReaderBuilder, StringRecord};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub invalid_dates: usize,
    pub sunday_rows: usize,
}

/// Load one dialer export. The format is picked from the file extension.
pub fn load_file(path: &Path) -> ReportResult<(Vec<CallRecord>, LoadReport)> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => load_csv(path),
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => load_workbook(path),
        _ => Err(ReportError::UnsupportedInput {
            path: path.to_path_buf(),
        }),
    }
}

pub fn load_csv(path: &Path) -> ReportResult<(Vec<CallRecord>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let headers = normalize_headers(rdr.headers()?);
    check_columns(path, &headers)?;
    load_records(path, &headers, rdr.records())
}

pub fn load_workbook(path: &Path) -> ReportResult<(Vec<CallRecord>, LoadReport)> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::EmptyWorkbook {
            path: path.to_path_buf(),
        })??;

    let mut rows = range.rows();
    let headers: StringRecord = match rows.next() {
        Some(cells) => normalize_headers(&cells.iter().map(cell_to_string).collect::<StringRecord>()),
        None => StringRecord::new(),
    };
    check_columns(path, &headers)?;
    let records = rows.map(|cells| Ok(cells.iter().map(cell_to_string).collect::<StringRecord>()));
    load_records(path, &headers, records)
}

/// Trim and uppercase every header so lookups ignore case and stray spaces.
pub fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers.iter().map(|h| h.trim().to_uppercase()).collect()
}

fn check_columns(path: &Path, headers: &StringRecord) -> ReportResult<()> {
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ReportError::MissingColumns {
            path: path.to_path_buf(),
            columns: missing,
        })
    }
}

/// Turn raw rows into call records, dropping rows whose DATE does not parse
/// and rows that fall on a Sunday.
pub fn load_records<I>(
    path: &Path,
    headers: &StringRecord,
    rows: I,
) -> ReportResult<(Vec<CallRecord>, LoadReport)>
where
    I: IntoIterator<Item = csv::Result<StringRecord>>,
{
    let mut report = LoadReport::default();
    let mut records = Vec::new();

    for result in rows {
        report.total_rows += 1;
        let raw: RawRow = match result.and_then(|r| r.deserialize(Some(headers))) {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };

        let date = match parse_date_safe(raw.date.as_deref()) {
            Some(d) => d,
            None => {
                report.invalid_dates += 1;
                continue;
            }
        };
        if date.weekday() == Weekday::Sun {
            report.sunday_rows += 1;
            continue;
        }

        records.push(CallRecord {
            date,
            client: non_blank(raw.client),
            remark_by: non_blank(raw.remark_by),
            account_no: non_blank(raw.account_no),
            card_no: non_blank(raw.card_no),
            call_status: non_blank(raw.call_status),
            status: non_blank(raw.status),
            remark: non_blank(raw.remark),
            remark_type: non_blank(raw.remark_type).map(|t| RemarkType::parse(&t)),
            debtor: non_blank(raw.debtor),
            call_duration: non_blank(raw.call_duration),
            talk_time_secs: parse_f64_safe(raw.talk_time_duration.as_deref()).unwrap_or(0.0),
            ptp_amount: parse_f64_safe(raw.ptp_amount.as_deref()).unwrap_or(0.0),
            balance: parse_f64_safe(raw.balance.as_deref()),
        });
    }

    report.loaded_rows = records.len();
    log::info!(
        "{}: {} rows read, {} loaded ({} invalid dates, {} Sunday rows, {} unreadable)",
        path.display(),
        report.total_rows,
        report.loaded_rows,
        report.invalid_dates,
        report.sunday_rows,
        report.parse_errors
    );
    Ok((records, report))
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(v) => v.clone(),
        Data::Float(v) => v.to_string(),
        Data::Int(v) => v.to_string(),
        Data::Bool(v) => v.to_string(),
        Data::DateTime(v) => v
            .as_datetime()
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default(),
        Data::DateTimeIso(v) => v.clone(),
        Data::DurationIso(v) => v.clone(),
        Data::Error(_) | Data::Empty => String::new(),
    }
}
