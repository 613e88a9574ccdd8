use crate::types::{CallRecord, Hms, Percent, RemarkType, SummaryRow, SummaryTable};
use crate::util::{contains_ci, round2};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

const DROP_CALL_MARKERS: [&str; 2] = [
    "NEGATIVE CALLOUTS - DROP CALL",
    "NEGATIVE_CALLOUTS - DROPPED_CALL",
];

/// The three remark-type presets every batch is summarized with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryKind {
    Combined,
    Predictive,
    Manual,
}

impl SummaryKind {
    pub fn remark_types(&self) -> Vec<RemarkType> {
        match self {
            SummaryKind::Combined => vec![
                RemarkType::Predictive,
                RemarkType::FollowUp,
                RemarkType::Outgoing,
            ],
            SummaryKind::Predictive => vec![RemarkType::Predictive, RemarkType::FollowUp],
            SummaryKind::Manual => vec![RemarkType::Outgoing],
        }
    }

    /// Manual dialing attributes drops to agents rather than the dialer.
    pub fn manual_correction(&self) -> bool {
        matches!(self, SummaryKind::Manual)
    }

    pub fn label(&self) -> &'static str {
        match self {
            SummaryKind::Combined => "Combined",
            SummaryKind::Predictive => "Predictive",
            SummaryKind::Manual => "Manual",
        }
    }
}

pub fn summarize_kind<'a, I>(records: I, kind: SummaryKind) -> SummaryTable
where
    I: IntoIterator<Item = &'a CallRecord>,
{
    summarize(records, &kind.remark_types(), kind.manual_correction())
}

/// One summary row per (DATE, CLIENT) among records whose remark type is in
/// `remark_types`. Groups where no collector logged a call duration emit no row.
pub fn summarize<'a, I>(records: I, remark_types: &[RemarkType], manual_correction: bool) -> SummaryTable
where
    I: IntoIterator<Item = &'a CallRecord>,
{
    #[derive(Default)]
    struct Acc<'a> {
        collectors: HashSet<&'a str>,
        accounts: HashSet<&'a str>,
        total_dialed: usize,
        connected_accounts: HashSet<&'a str>,
        connected_calls: usize,
        ptp_accounts: HashSet<&'a str>,
        ptp_amount: f64,
        ptp_balance: f64,
        system_drop: usize,
        call_drop: usize,
        talk_secs: f64,
    }

    let mut groups: BTreeMap<(NaiveDate, &'a str), Acc<'a>> = BTreeMap::new();
    for r in records {
        let accepted = r
            .remark_type
            .as_ref()
            .is_some_and(|t| remark_types.contains(t));
        let Some(client) = r.client.as_deref() else {
            continue;
        };
        if !accepted {
            continue;
        }

        let e = groups.entry((r.date, client)).or_default();
        let account = r.account_no.as_deref();
        let is_system = r
            .remark_by
            .as_deref()
            .is_some_and(|by| by.to_uppercase() == "SYSTEM");

        if let (Some(by), Some(_)) = (r.remark_by.as_deref(), r.call_duration.as_deref()) {
            e.collectors.insert(by);
        }
        e.accounts.extend(account);
        e.total_dialed += 1;

        if r.call_status.as_deref() == Some("CONNECTED") {
            e.connected_accounts.extend(account);
            e.connected_calls += 1;
        }

        if r.ptp_amount != 0.0 {
            e.ptp_balance += r.balance.unwrap_or(0.0);
            if contains_ci(r.status.as_deref(), "PTP") {
                e.ptp_accounts.extend(account);
                e.ptp_amount += r.ptp_amount;
            }
        }

        if is_system && contains_ci(r.status.as_deref(), "DROPPED") {
            e.system_drop += 1;
        }
        if !is_system
            && DROP_CALL_MARKERS
                .iter()
                .any(|m| contains_ci(r.status.as_deref(), m))
        {
            e.call_drop += 1;
        }

        e.talk_secs += r.talk_time_secs;
    }

    let mut rows: SummaryTable = groups
        .into_iter()
        .filter(|(_, acc)| !acc.collectors.is_empty())
        .map(|((date, client), acc)| {
            let collectors = acc.collectors.len();
            let accounts = acc.accounts.len();
            let connected = acc.connected_accounts.len();
            let drops = if manual_correction {
                acc.call_drop
            } else {
                acc.system_drop
            };
            let talk_time_ave = if collectors == 0 {
                Hms(0)
            } else {
                Hms::from_secs_f64(acc.talk_secs / collectors as f64)
            };
            let connected_ave = if collectors == 0 {
                0.0
            } else {
                round2(acc.connected_calls as f64 / collectors as f64)
            };
            SummaryRow {
                date,
                client: client.to_string(),
                collectors,
                accounts,
                total_dialed: acc.total_dialed,
                penetration_rate: Percent::ratio(acc.total_dialed, accounts),
                connected,
                connected_rate: Percent::ratio(acc.connected_calls, acc.total_dialed),
                connected_acc: acc.connected_calls,
                total_talk_time: Hms::from_secs_f64(acc.talk_secs),
                talk_time_ave,
                connected_ave,
                ptp_acc: acc.ptp_accounts.len(),
                ptp_rate: Percent::ratio(acc.ptp_accounts.len(), connected),
                total_ptp_amount: acc.ptp_amount,
                total_balance: acc.ptp_balance,
                call_drop: acc.call_drop,
                system_drop: acc.system_drop,
                call_drop_ratio: Percent::ratio(drops, acc.connected_calls),
            }
        })
        .collect();

    sort_by_date(&mut rows);
    rows
}

/// Stable sort, so rows sharing a date keep their relative order.
pub fn sort_by_date(rows: &mut SummaryTable) {
    rows.sort_by_key(|r| r.date);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::tests::record;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn single_connected_ptp_record() {
        let rows = summarize_kind(&[record()], SummaryKind::Predictive);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.date, date(2));
        assert_eq!(row.client, "ACME");
        assert_eq!(row.collectors, 1);
        assert_eq!(row.accounts, 1);
        assert_eq!(row.total_dialed, 1);
        assert_eq!(row.penetration_rate.to_string(), "100.00%");
        assert_eq!(row.connected, 1);
        assert_eq!(row.connected_rate.to_string(), "100.00%");
        assert_eq!(row.connected_acc, 1);
        assert_eq!(row.ptp_acc, 1);
        assert_eq!(row.ptp_rate.to_string(), "100.00%");
        assert_eq!(row.total_ptp_amount, 500.0);
        assert_eq!(row.total_balance, 1000.0);
        assert_eq!(row.total_talk_time.to_string(), "00:01:30");
        assert_eq!(row.talk_time_ave.to_string(), "00:01:30");
        assert_eq!(row.connected_ave, 1.0);
        assert_eq!(row.call_drop_ratio.to_string(), "0.00%");
    }

    #[test]
    fn groups_without_collectors_are_skipped() {
        let mut r = record();
        r.call_duration = None;
        let mut other = record();
        other.client = Some("BETA".to_string());
        let rows = summarize_kind(&[r, other], SummaryKind::Predictive);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].client, "BETA");
    }

    #[test]
    fn remark_type_selects_records() {
        let mut manual = record();
        manual.remark_type = Some(RemarkType::Outgoing);
        let records = vec![record(), manual];
        assert_eq!(summarize_kind(&records, SummaryKind::Predictive)[0].total_dialed, 1);
        assert_eq!(summarize_kind(&records, SummaryKind::Manual)[0].total_dialed, 1);
        assert_eq!(summarize_kind(&records, SummaryKind::Combined)[0].total_dialed, 2);

        let mut untyped = record();
        untyped.remark_type = None;
        assert!(summarize_kind(&[untyped], SummaryKind::Combined).is_empty());
    }

    #[test]
    fn counts_distinct_accounts_and_dials() {
        let mut a2 = record();
        a2.account_no = Some("A2".to_string());
        a2.call_status = Some("NO ANSWER".to_string());
        a2.status = Some("RNA".to_string());
        a2.ptp_amount = 0.0;
        let mut again = record();
        again.remark_by = Some("AGENT2".to_string());
        let rows = summarize_kind(&[record(), again, a2], SummaryKind::Predictive);
        let row = &rows[0];
        assert_eq!(row.collectors, 2);
        assert_eq!(row.accounts, 2);
        assert_eq!(row.total_dialed, 3);
        assert_eq!(row.penetration_rate.to_string(), "150.00%");
        assert_eq!(row.connected, 1);
        assert_eq!(row.connected_acc, 2);
        assert_eq!(row.connected_rate.to_string(), "66.67%");
        assert_eq!(row.ptp_acc, 1);
        assert_eq!(row.total_ptp_amount, 1000.0);
        assert_eq!(row.total_balance, 2000.0);
        assert_eq!(row.total_talk_time.to_string(), "00:04:30");
        assert_eq!(row.talk_time_ave.to_string(), "00:02:15");
        assert_eq!(row.connected_ave, 1.0);
    }

    #[test]
    fn balance_counts_nonzero_ptp_even_without_ptp_status() {
        let mut r = record();
        r.status = Some("CALLBACK".to_string());
        let row = &summarize_kind(&[r], SummaryKind::Predictive)[0];
        assert_eq!(row.ptp_acc, 0);
        assert_eq!(row.total_ptp_amount, 0.0);
        assert_eq!(row.total_balance, 1000.0);
        assert_eq!(row.ptp_rate.to_string(), "0.00%");
    }

    #[test]
    fn drop_ratio_depends_on_manual_correction() {
        let mut system = record();
        system.remark_by = Some("system".to_string());
        system.call_duration = None;
        system.status = Some("Dropped".to_string());
        system.call_status = Some("DROPPED".to_string());
        let mut agent_drop = record();
        agent_drop.status = Some("Negative_Callouts - Dropped_Call".to_string());
        agent_drop.ptp_amount = 0.0;
        let mut connected = record();
        connected.ptp_amount = 0.0;
        connected.status = Some("RPC".to_string());

        let records = vec![system, agent_drop, connected];
        let auto = &summarize(&records, &[RemarkType::Predictive], false)[0];
        assert_eq!(auto.system_drop, 1);
        assert_eq!(auto.call_drop, 1);
        assert_eq!(auto.connected_acc, 2);
        assert_eq!(auto.call_drop_ratio.to_string(), "50.00%");

        let mut outgoing = records.clone();
        for r in &mut outgoing {
            r.remark_type = Some(RemarkType::Outgoing);
        }
        let manual = &summarize_kind(&outgoing, SummaryKind::Manual)[0];
        assert_eq!(manual.call_drop_ratio.to_string(), "50.00%");
        assert_eq!(manual.collectors, 1);

        let mut no_system = outgoing.clone();
        no_system.remove(0);
        let manual = &summarize_kind(&no_system, SummaryKind::Manual)[0];
        assert_eq!(manual.system_drop, 0);
        assert_eq!(manual.call_drop_ratio.to_string(), "50.00%");
        let auto = &summarize(&no_system, &[RemarkType::Outgoing], false)[0];
        assert_eq!(auto.call_drop_ratio.to_string(), "0.00%");
    }

    #[test]
    fn zero_connected_gives_zero_rates() {
        let mut r = record();
        r.call_status = Some("BUSY".to_string());
        let row = &summarize_kind(&[r], SummaryKind::Predictive)[0];
        assert_eq!(row.connected, 0);
        assert_eq!(row.ptp_rate.to_string(), "0.00%");
        assert_eq!(row.call_drop_ratio.to_string(), "0.00%");
        assert_eq!(row.connected_ave, 0.0);
    }

    #[test]
    fn connected_average_ties_round_to_even() {
        let records: Vec<CallRecord> = (0..8)
            .map(|i| {
                let mut r = record();
                r.remark_by = Some(format!("AGENT{}", i));
                r.account_no = Some(format!("A{}", i));
                if i > 0 {
                    r.call_status = Some("NO ANSWER".to_string());
                }
                r
            })
            .collect();
        let row = &summarize_kind(&records, SummaryKind::Predictive)[0];
        assert_eq!(row.collectors, 8);
        assert_eq!(row.connected_acc, 1);
        assert_eq!(row.connected_ave, 0.12);
    }

    #[test]
    fn clock_style_call_duration_counts_as_collector() {
        let mut r = record();
        r.call_duration = Some("00:00:10".to_string());
        let rows = summarize_kind(&[r], SummaryKind::Predictive);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].collectors, 1);
    }

    #[test]
    fn rows_sorted_by_date() {
        let mut late = record();
        late.date = date(5);
        let mut early = record();
        early.date = date(3);
        let rows = summarize_kind(&[late, record(), early], SummaryKind::Predictive);
        let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(2), date(3), date(5)]);
    }

    #[test]
    fn rerun_is_identical() {
        let mut b = record();
        b.account_no = Some("B7".to_string());
        b.talk_time_secs = 33.3;
        let records = vec![record(), b];
        let first = summarize_kind(&records, SummaryKind::Combined);
        let second = summarize_kind(&records, SummaryKind::Combined);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
