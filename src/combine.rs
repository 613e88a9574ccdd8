use crate::reports::{sort_by_date, summarize_kind, SummaryKind};
use crate::slices::{balance_summaries, cycle_summaries};
use crate::types::{FilteredRecord, NamedSummaryGroup, SummaryTable};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashSet;

/// Every summary computed from one uploaded batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummaries {
    pub combined: SummaryTable,
    pub predictive: SummaryTable,
    pub manual: SummaryTable,
    pub predictive_cycles: NamedSummaryGroup,
    pub manual_cycles: NamedSummaryGroup,
    pub predictive_balances: NamedSummaryGroup,
    pub manual_balances: NamedSummaryGroup,
}

impl BatchSummaries {
    pub fn compute(records: &[FilteredRecord]) -> Self {
        let plain = || records.iter().map(|r| &r.record);
        BatchSummaries {
            combined: summarize_kind(plain(), SummaryKind::Combined),
            predictive: summarize_kind(plain(), SummaryKind::Predictive),
            manual: summarize_kind(plain(), SummaryKind::Manual),
            predictive_cycles: cycle_summaries(records, SummaryKind::Predictive),
            manual_cycles: cycle_summaries(records, SummaryKind::Manual),
            predictive_balances: balance_summaries(records, SummaryKind::Predictive),
            manual_balances: balance_summaries(records, SummaryKind::Manual),
        }
    }
}

/// Merges batches as they arrive. Rows are only appended here; each table is
/// sorted once in `finish`. Rows sharing (DATE, CLIENT) across batches stay
/// separate rows.
#[derive(Debug, Default)]
pub struct SummaryAccumulator {
    batches: usize,
    merged: BatchSummaries,
    seen: HashSet<(NaiveDate, String)>,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn add(&mut self, batch: BatchSummaries) {
        self.batches += 1;

        let keys: HashSet<(NaiveDate, String)> = batch
            .combined
            .iter()
            .map(|r| (r.date, r.client.clone()))
            .collect();
        let repeated = keys.iter().filter(|k| self.seen.contains(*k)).count();
        if repeated > 0 {
            log::warn!(
                "batch {}: {} (DATE, CLIENT) rows already seen in earlier batches; kept as separate rows",
                self.batches,
                repeated
            );
        }
        self.seen.extend(keys);

        let m = &mut self.merged;
        m.combined.extend(batch.combined);
        m.predictive.extend(batch.predictive);
        m.manual.extend(batch.manual);
        merge_group(&mut m.predictive_cycles, batch.predictive_cycles);
        merge_group(&mut m.manual_cycles, batch.manual_cycles);
        merge_group(&mut m.predictive_balances, batch.predictive_balances);
        merge_group(&mut m.manual_balances, batch.manual_balances);
    }

    pub fn finish(self) -> SummaryReport {
        let mut m = self.merged;
        sort_by_date(&mut m.combined);
        sort_by_date(&mut m.predictive);
        sort_by_date(&mut m.manual);
        for group in [
            &mut m.predictive_cycles,
            &mut m.manual_cycles,
            &mut m.predictive_balances,
            &mut m.manual_balances,
        ] {
            group.tables_mut().for_each(sort_by_date);
        }
        SummaryReport {
            batches: self.batches,
            combined: m.combined,
            predictive: m.predictive,
            manual: m.manual,
            predictive_cycles: m.predictive_cycles,
            manual_cycles: m.manual_cycles,
            predictive_balances: m.predictive_balances,
            manual_balances: m.manual_balances,
        }
    }
}

fn merge_group(into: &mut NamedSummaryGroup, from: NamedSummaryGroup) {
    for (label, rows) in from.into_entries() {
        into.append(label, rows);
    }
}

/// The merged result of a run, ready for display and export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryReport {
    pub batches: usize,
    pub combined: SummaryTable,
    pub predictive: SummaryTable,
    pub manual: SummaryTable,
    pub predictive_cycles: NamedSummaryGroup,
    pub manual_cycles: NamedSummaryGroup,
    pub predictive_balances: NamedSummaryGroup,
    pub manual_balances: NamedSummaryGroup,
}

/// A group of titled tables exported together, e.g. one spreadsheet sheet.
#[derive(Debug)]
pub struct Sheet<'a> {
    pub name: &'static str,
    pub tables: Vec<(&'a str, &'a SummaryTable)>,
}

impl SummaryReport {
    pub fn sheets(&self) -> Vec<Sheet<'_>> {
        fn group<'a>(name: &'static str, g: &'a NamedSummaryGroup) -> Sheet<'a> {
            Sheet {
                name,
                tables: g.iter().collect(),
            }
        }
        vec![
            Sheet {
                name: "Combined",
                tables: vec![("Combined Summary", &self.combined)],
            },
            Sheet {
                name: "Predictive",
                tables: vec![("Predictive Summary", &self.predictive)],
            },
            Sheet {
                name: "Manual",
                tables: vec![("Manual Summary", &self.manual)],
            },
            group("Predictive Cycles", &self.predictive_cycles),
            group("Manual Cycles", &self.manual_cycles),
            group("Predictive Balances", &self.predictive_balances),
            group("Manual Balances", &self.manual_balances),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::derive_cycle;
    use crate::filter::tests::record;
    use crate::types::RemarkType;

    fn batch(day: u32, client: &str) -> Vec<FilteredRecord> {
        let mut predictive = record();
        predictive.date = NaiveDate::from_ymd_opt(2024, 1, day).unwrap();
        predictive.client = Some(client.to_string());
        let mut manual = predictive.clone();
        manual.remark_type = Some(RemarkType::Outgoing);
        [predictive, manual]
            .into_iter()
            .map(|record| FilteredRecord {
                cycle: derive_cycle(record.card_no.as_deref()),
                record,
            })
            .collect()
    }

    fn combine(batches: &[Vec<FilteredRecord>]) -> SummaryReport {
        let mut acc = SummaryAccumulator::new();
        for b in batches {
            acc.add(BatchSummaries::compute(b));
        }
        acc.finish()
    }

    #[test]
    fn batch_computes_every_kind() {
        let b = BatchSummaries::compute(&batch(2, "ACME"));
        assert_eq!(b.combined[0].total_dialed, 2);
        assert_eq!(b.predictive[0].total_dialed, 1);
        assert_eq!(b.manual[0].total_dialed, 1);
        assert!(b.predictive_cycles.get("Cycle 12").is_some());
        assert!(b.manual_cycles.get("Cycle 12").is_some());
        assert!(b.predictive_balances.get("Cycle 12 Balance 0-9999.99").is_some());
        assert!(b.manual_balances.get("Cycle 12 Balance 0-9999.99").is_some());
    }

    #[test]
    fn merge_resorts_and_keeps_duplicates() {
        let report = combine(&[batch(5, "ACME"), batch(2, "ACME"), batch(5, "ACME")]);
        assert_eq!(report.batches, 3);
        let dates: Vec<u32> = report.combined.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(dates, vec![2, 5, 5]);
        assert_eq!(report.predictive_cycles.len(), 1);
        assert_eq!(report.predictive_cycles.get("Cycle 12").unwrap().len(), 3);
    }

    #[test]
    fn merge_is_associative_up_to_order() {
        let a = batch(3, "ACME");
        let b = batch(2, "BETA");
        let c = batch(4, "ACME");
        let left = combine(&[a.clone(), b.clone(), c.clone()]);
        let right = combine(&[c, b, a]);
        let mut l = left.combined.clone();
        let mut r = right.combined.clone();
        l.sort_by(|x, y| (x.date, &x.client).cmp(&(y.date, &y.client)));
        r.sort_by(|x, y| (x.date, &x.client).cmp(&(y.date, &y.client)));
        assert_eq!(l, r);
        assert_eq!(left.combined.len(), 3);
    }

    #[test]
    fn sheets_in_export_order() {
        let report = combine(&[batch(2, "ACME")]);
        let names: Vec<&str> = report.sheets().iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "Combined",
                "Predictive",
                "Manual",
                "Predictive Cycles",
                "Manual Cycles",
                "Predictive Balances",
                "Manual Balances"
            ]
        );
        assert_eq!(report.sheets()[3].tables[0].0, "Cycle 12");
    }

    #[test]
    fn empty_run_yields_empty_report() {
        let report = SummaryAccumulator::new().finish();
        assert_eq!(report.batches, 0);
        assert!(report.combined.is_empty());
        assert!(report.manual_balances.is_empty());
    }
}
