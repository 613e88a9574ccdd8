use crate::reports::{summarize, SummaryKind};
use crate::types::{CallRecord, FilteredRecord, NamedSummaryGroup};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceTier {
    Under10k,
    From10k,
    From50k,
    From100k,
}

impl BalanceTier {
    pub const ALL: [BalanceTier; 4] = [
        BalanceTier::Under10k,
        BalanceTier::From10k,
        BalanceTier::From50k,
        BalanceTier::From100k,
    ];

    /// Inclusive bounds.
    pub fn bounds(&self) -> (f64, f64) {
        match self {
            BalanceTier::Under10k => (0.0, 9999.99),
            BalanceTier::From10k => (10000.00, 49999.99),
            BalanceTier::From50k => (50000.00, 99999.99),
            BalanceTier::From100k => (100000.00, f64::INFINITY),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BalanceTier::Under10k => "0-9999.99",
            BalanceTier::From10k => "10000.00-49999.99",
            BalanceTier::From50k => "50000.00-99999.99",
            BalanceTier::From100k => "100000.00 and up",
        }
    }

    pub fn contains(&self, balance: f64) -> bool {
        let (min, max) = self.bounds();
        balance >= min && balance <= max
    }

    pub fn of(balance: f64) -> Option<BalanceTier> {
        BalanceTier::ALL.into_iter().find(|t| t.contains(balance))
    }
}

/// Cycles that carry no real grouping and are left out of every slice.
pub fn is_excluded_cycle(cycle: &str) -> bool {
    matches!(cycle.to_lowercase().as_str(), "unknown" | "na")
}

/// Records bucketed by cycle, cycles in order of first appearance.
fn by_cycle(records: &[FilteredRecord]) -> Vec<(&str, Vec<&CallRecord>)> {
    let mut buckets: Vec<(&str, Vec<&CallRecord>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for r in records {
        if is_excluded_cycle(&r.cycle) {
            continue;
        }
        let i = *index.entry(r.cycle.as_str()).or_insert_with(|| {
            buckets.push((r.cycle.as_str(), Vec::new()));
            buckets.len() - 1
        });
        buckets[i].1.push(&r.record);
    }
    buckets
}

pub fn cycle_label(cycle: &str) -> String {
    format!("Cycle {}", cycle)
}

pub fn balance_label(cycle: &str, tier: BalanceTier) -> String {
    format!("Cycle {} Balance {}", cycle, tier.label())
}

/// One summary table per cycle. Cycles whose table comes out empty are omitted.
pub fn cycle_summaries(records: &[FilteredRecord], kind: SummaryKind) -> NamedSummaryGroup {
    let remark_types = kind.remark_types();
    let mut group = NamedSummaryGroup::new();
    for (cycle, rows) in by_cycle(records) {
        let table = summarize(rows, &remark_types, kind.manual_correction());
        log::debug!("{} {}: {} rows", kind.label(), cycle_label(cycle), table.len());
        if !table.is_empty() {
            group.append(cycle_label(cycle), table);
        }
    }
    group
}

/// One summary table per (cycle, balance tier). Records without a balance,
/// or with one outside every tier, are left out.
pub fn balance_summaries(records: &[FilteredRecord], kind: SummaryKind) -> NamedSummaryGroup {
    let remark_types = kind.remark_types();
    let mut group = NamedSummaryGroup::new();
    for (cycle, rows) in by_cycle(records) {
        let mut tiers: [Vec<&CallRecord>; 4] = Default::default();
        for r in rows {
            if let Some(tier) = r.balance.and_then(BalanceTier::of) {
                tiers[tier as usize].push(r);
            }
        }
        for (tier, part) in BalanceTier::ALL.into_iter().zip(tiers) {
            if part.is_empty() {
                continue;
            }
            let table = summarize(part, &remark_types, kind.manual_correction());
            log::debug!(
                "{} {}: {} rows",
                kind.label(),
                balance_label(cycle, tier),
                table.len()
            );
            if !table.is_empty() {
                group.append(balance_label(cycle, tier), table);
            }
        }
    }
    group
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;
    use crate::filter::{derive_cycle, UNKNOWN_CYCLE};

    fn filtered(card: Option<&str>, balance: Option<f64>) -> FilteredRecord {
        let mut record = record();
        record.card_no = card.map(str::to_string);
        record.balance = balance;
        let cycle = derive_cycle(record.card_no.as_deref());
        FilteredRecord { record, cycle }
    }

    #[test]
    fn tiers_are_exclusive_and_cover_boundaries() {
        for b in [0.0, 9999.99, 10000.0, 49999.99, 50000.0, 99999.99, 100000.0, 5e9] {
            let hits = BalanceTier::ALL.iter().filter(|t| t.contains(b)).count();
            assert_eq!(hits, 1, "balance {b} should land in exactly one tier");
        }
        assert_eq!(BalanceTier::of(10000.0), Some(BalanceTier::From10k));
        assert_eq!(BalanceTier::of(-1.0), None);
    }

    #[test]
    fn excluded_cycles() {
        assert!(is_excluded_cycle(UNKNOWN_CYCLE));
        assert!(is_excluded_cycle("NA"));
        assert!(is_excluded_cycle("na"));
        assert!(!is_excluded_cycle("12"));
    }

    #[test]
    fn cycle_tables_keep_first_seen_order() {
        let records = vec![
            filtered(Some("3456"), Some(10.0)),
            filtered(Some("1234567"), Some(10.0)),
            filtered(None, Some(10.0)),
            filtered(Some("1299"), Some(10.0)),
        ];
        let group = cycle_summaries(&records, SummaryKind::Predictive);
        let labels: Vec<&str> = group.labels().collect();
        assert_eq!(labels, vec!["Cycle 34", "Cycle 12"]);
        assert_eq!(group.get("Cycle 12").unwrap()[0].total_dialed, 2);
    }

    #[test]
    fn cycles_without_rows_are_omitted() {
        let mut r = filtered(Some("12"), Some(10.0));
        r.record.call_duration = None;
        let group = cycle_summaries(&[r], SummaryKind::Predictive);
        assert!(group.is_empty());
    }

    #[test]
    fn balance_tables_per_cycle_and_tier() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Debug)
            .try_init();
        let records = vec![
            filtered(Some("12"), Some(500.0)),
            filtered(Some("12"), Some(75000.0)),
            filtered(Some("12"), None),
            filtered(Some("34"), Some(250000.0)),
            filtered(None, Some(500.0)),
        ];
        let group = balance_summaries(&records, SummaryKind::Predictive);
        let labels: Vec<&str> = group.labels().collect();
        assert_eq!(
            labels,
            vec![
                "Cycle 12 Balance 0-9999.99",
                "Cycle 12 Balance 50000.00-99999.99",
                "Cycle 34 Balance 100000.00 and up",
            ]
        );
        assert_eq!(group.get("Cycle 12 Balance 0-9999.99").unwrap()[0].total_dialed, 1);
    }

    #[test]
    fn manual_kind_ignores_predictive_rows() {
        let records = vec![filtered(Some("12"), Some(500.0))];
        assert!(cycle_summaries(&records, SummaryKind::Manual).is_empty());
        assert!(balance_summaries(&records, SummaryKind::Manual).is_empty());
    }
}
