//! remark-summary: build daily remark summaries from dialer exports.
//!
//! Usage:
//!   remark-summary day1.xlsx day2.csv --out-dir summaries
//!   RUST_LOG=debug remark-summary day1.xlsx --preview-rows 10 --no-export
use anyhow::{Context, Result};
use clap::Parser;
use remark_summary::combine::SummaryAccumulator;
use remark_summary::{is_schema_defect, output, summarize_file, util};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "remark-summary",
    version,
    about = "Summarize daily call-center remark exports by date, client, cycle and balance tier"
)]
struct Args {
    /// Remark export files (.csv, .xlsx, .xls, .ods), processed in order.
    #[arg(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Directory for the per-sheet CSV files and summary.json.
    #[arg(long, value_name = "DIR", default_value = ".")]
    out_dir: PathBuf,

    /// Rows shown per table in the console preview.
    #[arg(long, value_name = "N", default_value_t = 5)]
    preview_rows: usize,

    /// Leave out files with missing columns instead of failing the run.
    #[arg(long, default_value_t = false)]
    skip_bad_files: bool,

    /// Print the preview only; write nothing to disk.
    #[arg(long, default_value_t = false)]
    no_export: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    println!(
        "Processing {} file(s)...\n",
        util::format_int(args.files.len())
    );
    let mut acc = SummaryAccumulator::new();
    for (idx, path) in args.files.iter().enumerate() {
        match summarize_file(path) {
            Ok(batch) => {
                acc.add(batch);
                log::info!("Process Done {} ({})", idx + 1, path.display());
            }
            Err(e) if args.skip_bad_files && is_schema_defect(&e) => {
                log::warn!("skipping {}: {}", path.display(), e);
            }
            Err(e) => {
                return Err(e).with_context(|| format!("failed to summarize {}", path.display()))
            }
        }
    }
    let report = acc.finish();

    println!("Daily Remark Summary ({} batch(es))\n", report.batches);
    output::preview_report(&report, args.preview_rows);

    if !args.no_export {
        let files = output::export_report(&args.out_dir, &report)
            .with_context(|| format!("failed to export to {}", args.out_dir.display()))?;
        for f in &files {
            println!("(Exported {})", f.display());
        }
    }
    Ok(())
}
