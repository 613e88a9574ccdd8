use crate::types::{CallRecord, FilteredRecord};
use crate::util::contains_ci;
use once_cell::sync::Lazy;
use regex::Regex;

/// Agent whose remarks are housekeeping, never dialing.
pub const EXCLUDED_AGENT: &str = "SPMADRID";

pub const UNKNOWN_CYCLE: &str = "Unknown";

/// Remark phrases that mark reassignment, import and broadcast noise.
pub const EXCLUDED_REMARKS: [&str; 9] = [
    "Broken Promise",
    "New files imported",
    "Updates when case reassign to another collector",
    "NDF IN ICS",
    "FOR PULL OUT (END OF HANDLING PERIOD)",
    "END OF HANDLING PERIOD",
    "New Assignment -",
    "broadcast",
    "File Unhold",
];

static PTP_NEW_LEAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)1_\d{11} - PTP NEW").expect("PTP lead pattern is valid"));

static EXCLUDED_REMARKS_UPPER: Lazy<Vec<String>> =
    Lazy::new(|| EXCLUDED_REMARKS.iter().map(|p| p.to_uppercase()).collect());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropRule {
    ExcludedAgent,
    DefaultLead,
    Aborted,
    PtpNewLead,
    ExcludedRemark,
    OthersStatus,
}

impl DropRule {
    pub const ALL: [DropRule; 6] = [
        DropRule::ExcludedAgent,
        DropRule::DefaultLead,
        DropRule::Aborted,
        DropRule::PtpNewLead,
        DropRule::ExcludedRemark,
        DropRule::OthersStatus,
    ];

    pub fn matches(&self, r: &CallRecord) -> bool {
        match self {
            DropRule::ExcludedAgent => r.remark_by.as_deref() == Some(EXCLUDED_AGENT),
            DropRule::DefaultLead => contains_ci(r.debtor.as_deref(), "DEFAULT_LEAD_"),
            DropRule::Aborted => contains_ci(r.status.as_deref(), "ABORT"),
            DropRule::PtpNewLead => r
                .remark
                .as_deref()
                .is_some_and(|remark| PTP_NEW_LEAD.is_match(remark)),
            DropRule::ExcludedRemark => r.remark.as_deref().is_some_and(|remark| {
                let upper = remark.to_uppercase();
                EXCLUDED_REMARKS_UPPER.iter().any(|p| upper.contains(p.as_str()))
            }),
            DropRule::OthersStatus => contains_ci(r.call_status.as_deref(), "OTHERS"),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DropRule::ExcludedAgent => "excluded agent",
            DropRule::DefaultLead => "default lead",
            DropRule::Aborted => "aborted call",
            DropRule::PtpNewLead => "PTP new lead",
            DropRule::ExcludedRemark => "excluded remark",
            DropRule::OthersStatus => "OTHERS call status",
        }
    }
}

/// How many rows each rule removed. A row matching several rules is
/// credited to the first one in `DropRule::ALL` order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped: [usize; 6],
}

impl FilterReport {
    pub fn dropped_by(&self, rule: DropRule) -> usize {
        DropRule::ALL
            .iter()
            .position(|r| *r == rule)
            .map(|i| self.dropped[i])
            .unwrap_or(0)
    }
}

/// First two characters of the card number, or "Unknown" when it is absent.
pub fn derive_cycle(card_no: Option<&str>) -> String {
    match card_no.map(str::trim).filter(|c| !c.is_empty()) {
        Some(card) => card.chars().take(2).collect(),
        None => UNKNOWN_CYCLE.to_string(),
    }
}

pub fn filter_records(records: Vec<CallRecord>) -> (Vec<FilteredRecord>, FilterReport) {
    let mut report = FilterReport {
        input_rows: records.len(),
        ..Default::default()
    };

    let kept: Vec<FilteredRecord> = records
        .into_iter()
        .filter(|r| match DropRule::ALL.iter().position(|rule| rule.matches(r)) {
            Some(i) => {
                report.dropped[i] += 1;
                false
            }
            None => true,
        })
        .map(|record| {
            let cycle = derive_cycle(record.card_no.as_deref());
            FilteredRecord { record, cycle }
        })
        .collect();

    report.kept_rows = kept.len();
    for (rule, count) in DropRule::ALL.iter().zip(report.dropped.iter()) {
        if *count > 0 {
            log::debug!("filter: {} dropped {} rows", rule.name(), count);
        }
    }
    log::info!(
        "filter: kept {} of {} rows",
        report.kept_rows,
        report.input_rows
    );
    (kept, report)
}
