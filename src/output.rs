use crate::combine::{Sheet, SummaryReport};
use crate::error::ReportResult;
use crate::types::SummaryRow;
use crate::util::format_money;
use chrono::Datelike;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

/// Blank rows left between stacked tables on one sheet.
const SPACER_ROWS: usize = 2;

pub const WORKBOOK_FILE: &str = "daily_remark_summary.xlsx";

/// `num_days_from_ce` of 1899-12-30, day zero of spreadsheet date serials.
const EXCEL_EPOCH_CE_DAYS: i32 = 693_594;

/// A summary row with every column rendered for people.
#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DisplayRow {
    #[serde(rename = "DATE")]
    #[tabled(rename = "DATE")]
    pub date: String,
    #[serde(rename = "CLIENT")]
    #[tabled(rename = "CLIENT")]
    pub client: String,
    #[serde(rename = "COLLECTORS")]
    #[tabled(rename = "COLLECTORS")]
    pub collectors: usize,
    #[serde(rename = "ACCOUNTS")]
    #[tabled(rename = "ACCOUNTS")]
    pub accounts: usize,
    #[serde(rename = "TOTAL DIALED")]
    #[tabled(rename = "TOTAL DIALED")]
    pub total_dialed: usize,
    #[serde(rename = "PENETRATION RATE (%)")]
    #[tabled(rename = "PENETRATION RATE (%)")]
    pub penetration_rate: String,
    #[serde(rename = "CONNECTED #")]
    #[tabled(rename = "CONNECTED #")]
    pub connected: usize,
    #[serde(rename = "CONNECTED RATE (%)")]
    #[tabled(rename = "CONNECTED RATE (%)")]
    pub connected_rate: String,
    #[serde(rename = "CONNECTED ACC")]
    #[tabled(rename = "CONNECTED ACC")]
    pub connected_acc: usize,
    #[serde(rename = "TOTAL TALK TIME")]
    #[tabled(rename = "TOTAL TALK TIME")]
    pub total_talk_time: String,
    #[serde(rename = "TALK TIME AVE")]
    #[tabled(rename = "TALK TIME AVE")]
    pub talk_time_ave: String,
    #[serde(rename = "CONNECTED AVE")]
    #[tabled(rename = "CONNECTED AVE")]
    pub connected_ave: String,
    #[serde(rename = "PTP ACC")]
    #[tabled(rename = "PTP ACC")]
    pub ptp_acc: usize,
    #[serde(rename = "PTP RATE")]
    #[tabled(rename = "PTP RATE")]
    pub ptp_rate: String,
    #[serde(rename = "TOTAL PTP AMOUNT")]
    #[tabled(rename = "TOTAL PTP AMOUNT")]
    pub total_ptp_amount: String,
    #[serde(rename = "TOTAL BALANCE")]
    #[tabled(rename = "TOTAL BALANCE")]
    pub total_balance: String,
    #[serde(rename = "CALL DROP #")]
    #[tabled(rename = "CALL DROP #")]
    pub call_drop: usize,
    #[serde(rename = "SYSTEM DROP")]
    #[tabled(rename = "SYSTEM DROP")]
    pub system_drop: usize,
    #[serde(rename = "CALL DROP RATIO #")]
    #[tabled(rename = "CALL DROP RATIO #")]
    pub call_drop_ratio: String,
}

impl From<&SummaryRow> for DisplayRow {
    fn from(r: &SummaryRow) -> Self {
        DisplayRow {
            date: r.date.format("%Y-%m-%d").to_string(),
            client: r.client.clone(),
            collectors: r.collectors,
            accounts: r.accounts,
            total_dialed: r.total_dialed,
            penetration_rate: r.penetration_rate.to_string(),
            connected: r.connected,
            connected_rate: r.connected_rate.to_string(),
            connected_acc: r.connected_acc,
            total_talk_time: r.total_talk_time.to_string(),
            talk_time_ave: r.talk_time_ave.to_string(),
            connected_ave: format!("{:.2}", r.connected_ave),
            ptp_acc: r.ptp_acc,
            ptp_rate: r.ptp_rate.to_string(),
            total_ptp_amount: format_money(r.total_ptp_amount),
            total_balance: format_money(r.total_balance),
            call_drop: r.call_drop,
            system_drop: r.system_drop,
            call_drop_ratio: r.call_drop_ratio.to_string(),
        }
    }
}

pub fn display_rows(rows: &[SummaryRow]) -> Vec<DisplayRow> {
    rows.iter().map(DisplayRow::from).collect()
}

/// File name for a sheet, e.g. `predictive_cycles.csv`.
pub fn sheet_file_name(sheet_name: &str) -> String {
    format!("{}.csv", sheet_name.to_lowercase().replace(' ', "_"))
}

/// Write the sheet's non-empty tables stacked vertically: a title row, the
/// header row, the data rows, then blank spacer rows. Returns how many
/// tables were written.
pub fn write_sheet_csv(path: &Path, sheet: &Sheet<'_>) -> ReportResult<usize> {
    let mut wtr = csv::WriterBuilder::new()
        .flexible(true)
        .has_headers(false)
        .from_path(path)?;
    let headers: Vec<String> = DisplayRow::headers()
        .into_iter()
        .map(|h| h.into_owned())
        .collect();
    let blank = vec![""; DisplayRow::LENGTH];
    let mut written = 0;
    for (title, rows) in &sheet.tables {
        if rows.is_empty() {
            continue;
        }
        wtr.write_record([*title])?;
        wtr.write_record(&headers)?;
        for row in display_rows(rows) {
            wtr.serialize(row)?;
        }
        for _ in 0..SPACER_ROWS {
            wtr.write_record(&blank)?;
        }
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

/// Spreadsheet date serial for a calendar date.
pub fn excel_serial(date: chrono::NaiveDate) -> f64 {
    f64::from(date.num_days_from_ce() - EXCEL_EPOCH_CE_DAYS)
}

struct CellFormats {
    title: Format,
    header: Format,
    center: Format,
    money: Format,
    percent: Format,
    date: Format,
    time: Format,
}

impl CellFormats {
    fn new() -> Self {
        let cell = Format::new()
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin);
        CellFormats {
            title: Format::new()
                .set_bold()
                .set_font_size(14)
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(Color::Yellow),
            header: Format::new()
                .set_bold()
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_background_color(Color::Red)
                .set_font_color(Color::White),
            money: cell.clone().set_num_format("#,##0"),
            percent: cell.clone().set_num_format("0.00%"),
            date: cell.clone().set_num_format("yyyy-mm-dd"),
            time: cell.clone().set_num_format("[hh]:mm:ss"),
            center: cell,
        }
    }
}

fn write_summary_row(
    ws: &mut Worksheet,
    row: u32,
    r: &SummaryRow,
    f: &CellFormats,
) -> ReportResult<()> {
    ws.write_number_with_format(row, 0, excel_serial(r.date), &f.date)?;
    ws.write_string_with_format(row, 1, &r.client, &f.center)?;
    ws.write_number_with_format(row, 2, r.collectors as f64, &f.center)?;
    ws.write_number_with_format(row, 3, r.accounts as f64, &f.center)?;
    ws.write_number_with_format(row, 4, r.total_dialed as f64, &f.center)?;
    ws.write_number_with_format(row, 5, r.penetration_rate.fraction(), &f.percent)?;
    ws.write_number_with_format(row, 6, r.connected as f64, &f.center)?;
    ws.write_number_with_format(row, 7, r.connected_rate.fraction(), &f.percent)?;
    ws.write_number_with_format(row, 8, r.connected_acc as f64, &f.center)?;
    ws.write_number_with_format(row, 9, r.total_talk_time.day_fraction(), &f.time)?;
    ws.write_number_with_format(row, 10, r.talk_time_ave.day_fraction(), &f.time)?;
    ws.write_number_with_format(row, 11, r.connected_ave, &f.center)?;
    ws.write_number_with_format(row, 12, r.ptp_acc as f64, &f.center)?;
    ws.write_number_with_format(row, 13, r.ptp_rate.fraction(), &f.percent)?;
    ws.write_number_with_format(row, 14, r.total_ptp_amount, &f.money)?;
    ws.write_number_with_format(row, 15, r.total_balance, &f.money)?;
    ws.write_number_with_format(row, 16, r.call_drop as f64, &f.center)?;
    ws.write_number_with_format(row, 17, r.system_drop as f64, &f.center)?;
    ws.write_number_with_format(row, 18, r.call_drop_ratio.fraction(), &f.percent)?;
    Ok(())
}

/// Lay one sheet's tables out the same way as the CSV sheets, but with typed
/// cells: dates as serials, rates as fractions, durations as day fractions.
fn write_sheet_xlsx(ws: &mut Worksheet, sheet: &Sheet<'_>, f: &CellFormats) -> ReportResult<usize> {
    let headers = DisplayRow::headers();
    let last_col = (headers.len() - 1) as u16;
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    let mut row: u32 = 0;
    let mut written = 0;
    for (title, rows) in &sheet.tables {
        if rows.is_empty() {
            continue;
        }
        ws.merge_range(row, 0, row, last_col, title, &f.title)?;
        row += 1;
        for (col, h) in headers.iter().enumerate() {
            ws.write_string_with_format(row, col as u16, &**h, &f.header)?;
        }
        row += 1;
        for r in rows.iter() {
            write_summary_row(ws, row, r, f)?;
            for (w, field) in widths.iter_mut().zip(DisplayRow::from(r).fields()) {
                *w = (*w).max(field.len());
            }
            row += 1;
        }
        row += SPACER_ROWS as u32;
        written += 1;
    }
    for (col, w) in widths.iter().enumerate() {
        ws.set_column_width(col as u16, (*w + 2) as f64)?;
    }
    Ok(written)
}

/// Write every sheet that has rows into one workbook. Returns the number of
/// worksheets written.
pub fn write_workbook(path: &Path, report: &SummaryReport) -> ReportResult<usize> {
    let formats = CellFormats::new();
    let mut workbook = Workbook::new();
    let mut sheets = 0;
    for sheet in report.sheets() {
        if sheet.tables.iter().all(|(_, rows)| rows.is_empty()) {
            continue;
        }
        let ws = workbook.add_worksheet();
        ws.set_name(sheet.name)?;
        write_sheet_xlsx(ws, &sheet, &formats)?;
        sheets += 1;
    }
    if sheets == 0 {
        workbook.add_worksheet().set_name("Combined")?;
    }
    workbook.save(path)?;
    Ok(sheets)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> ReportResult<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write one CSV per sheet, the workbook and `summary.json` into `dir`. Sheets whose
/// tables are all empty produce no file.
pub fn export_report(dir: &Path, report: &SummaryReport) -> ReportResult<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut files = Vec::new();
    for sheet in report.sheets() {
        if sheet.tables.iter().all(|(_, rows)| rows.is_empty()) {
            log::debug!("export: sheet {} has no rows, skipped", sheet.name);
            continue;
        }
        let path = dir.join(sheet_file_name(sheet.name));
        let tables = write_sheet_csv(&path, &sheet)?;
        log::info!("export: {} table(s) -> {}", tables, path.display());
        files.push(path);
    }
    let xlsx = dir.join(WORKBOOK_FILE);
    let sheets = write_workbook(&xlsx, report)?;
    log::info!("export: {} worksheet(s) -> {}", sheets, xlsx.display());
    files.push(xlsx);
    let json = dir.join("summary.json");
    write_json(&json, report)?;
    files.push(json);
    Ok(files)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

/// Print every non-empty table of every sheet, `max_rows` rows each.
pub fn preview_report(report: &SummaryReport, max_rows: usize) {
    for sheet in report.sheets() {
        println!("## {}", sheet.name);
        let mut shown = 0;
        for (title, rows) in &sheet.tables {
            if rows.is_empty() {
                continue;
            }
            println!("Summary for {} ({} rows)\n", title, rows.len());
            preview_table_rows(&display_rows(rows), max_rows);
            shown += 1;
        }
        if shown == 0 {
            println!("(no rows)\n");
        }
    }
}
