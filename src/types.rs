use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

use crate::util::format_hms;

/// Columns every input file must carry, after header normalization.
pub const REQUIRED_COLUMNS: [&str; 14] = [
    "DATE",
    "CLIENT",
    "REMARK BY",
    "ACCOUNT NO.",
    "CARD NO.",
    "CALL STATUS",
    "STATUS",
    "REMARK",
    "REMARK TYPE",
    "DEBTOR",
    "CALL DURATION",
    "TALK TIME DURATION",
    "PTP AMOUNT",
    "BALANCE",
];

/// One input row keyed by normalized (trimmed, uppercased) header names.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawRow {
    #[serde(rename = "DATE")]
    pub date: Option<String>,
    #[serde(rename = "CLIENT")]
    pub client: Option<String>,
    #[serde(rename = "REMARK BY")]
    pub remark_by: Option<String>,
    #[serde(rename = "ACCOUNT NO.")]
    pub account_no: Option<String>,
    #[serde(rename = "CARD NO.")]
    pub card_no: Option<String>,
    #[serde(rename = "CALL STATUS")]
    pub call_status: Option<String>,
    #[serde(rename = "STATUS")]
    pub status: Option<String>,
    #[serde(rename = "REMARK")]
    pub remark: Option<String>,
    #[serde(rename = "REMARK TYPE")]
    pub remark_type: Option<String>,
    #[serde(rename = "DEBTOR")]
    pub debtor: Option<String>,
    #[serde(rename = "CALL DURATION")]
    pub call_duration: Option<String>,
    #[serde(rename = "TALK TIME DURATION")]
    pub talk_time_duration: Option<String>,
    #[serde(rename = "PTP AMOUNT")]
    pub ptp_amount: Option<String>,
    #[serde(rename = "BALANCE")]
    pub balance: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RemarkType {
    Predictive,
    FollowUp,
    Outgoing,
    Other(String),
}

impl RemarkType {
    pub fn parse(s: &str) -> RemarkType {
        match s.trim() {
            "Predictive" => RemarkType::Predictive,
            "Follow Up" => RemarkType::FollowUp,
            "Outgoing" => RemarkType::Outgoing,
            other => RemarkType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for RemarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemarkType::Predictive => write!(f, "Predictive"),
            RemarkType::FollowUp => write!(f, "Follow Up"),
            RemarkType::Outgoing => write!(f, "Outgoing"),
            RemarkType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// A loaded call record. Rows without a parseable DATE never become one.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    pub date: NaiveDate,
    pub client: Option<String>,
    pub remark_by: Option<String>,
    pub account_no: Option<String>,
    pub card_no: Option<String>,
    pub call_status: Option<String>,
    pub status: Option<String>,
    pub remark: Option<String>,
    pub remark_type: Option<RemarkType>,
    pub debtor: Option<String>,
    /// Raw CALL DURATION cell. Only its presence matters: any non-blank
    /// value, numeric or `hh:mm:ss`, marks the agent as an active collector.
    pub call_duration: Option<String>,
    pub talk_time_secs: f64,
    pub ptp_amount: f64,
    pub balance: Option<f64>,
}

/// A record that survived the noise filter, tagged with its cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredRecord {
    pub record: CallRecord,
    pub cycle: String,
}

/// A rate held as a percentage value (`12.5` means 12.5%).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
pub struct Percent(pub f64);

impl Percent {
    /// `num / den * 100`, or 0% when the denominator is zero.
    pub fn ratio(num: usize, den: usize) -> Percent {
        if den == 0 {
            return Percent(0.0);
        }
        Percent(num as f64 / den as f64 * 100.0)
    }

    /// The rate as a fraction (`0.125` for 12.5%), as spreadsheets store it.
    pub fn fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.0)
    }
}

/// A whole-second duration rendered as `hh:mm:ss`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Hms(pub u64);

impl Hms {
    /// Truncates toward zero; negative or NaN input becomes zero.
    pub fn from_secs_f64(secs: f64) -> Hms {
        if secs.is_finite() && secs > 0.0 {
            Hms(secs as u64)
        } else {
            Hms(0)
        }
    }

    /// The duration as a fraction of a day, the way spreadsheets store times.
    pub fn day_fraction(&self) -> f64 {
        self.0 as f64 / 86_400.0
    }
}

impl fmt::Display for Hms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_hms(self.0))
    }
}

impl Serialize for Hms {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    #[serde(rename = "DATE")]
    pub date: NaiveDate,
    #[serde(rename = "CLIENT")]
    pub client: String,
    #[serde(rename = "COLLECTORS")]
    pub collectors: usize,
    #[serde(rename = "ACCOUNTS")]
    pub accounts: usize,
    #[serde(rename = "TOTAL DIALED")]
    pub total_dialed: usize,
    #[serde(rename = "PENETRATION RATE (%)")]
    pub penetration_rate: Percent,
    #[serde(rename = "CONNECTED #")]
    pub connected: usize,
    #[serde(rename = "CONNECTED RATE (%)")]
    pub connected_rate: Percent,
    #[serde(rename = "CONNECTED ACC")]
    pub connected_acc: usize,
    #[serde(rename = "TOTAL TALK TIME")]
    pub total_talk_time: Hms,
    #[serde(rename = "TALK TIME AVE")]
    pub talk_time_ave: Hms,
    #[serde(rename = "CONNECTED AVE")]
    pub connected_ave: f64,
    #[serde(rename = "PTP ACC")]
    pub ptp_acc: usize,
    #[serde(rename = "PTP RATE")]
    pub ptp_rate: Percent,
    #[serde(rename = "TOTAL PTP AMOUNT")]
    pub total_ptp_amount: f64,
    #[serde(rename = "TOTAL BALANCE")]
    pub total_balance: f64,
    #[serde(rename = "CALL DROP #")]
    pub call_drop: usize,
    #[serde(rename = "SYSTEM DROP")]
    pub system_drop: usize,
    #[serde(rename = "CALL DROP RATIO #")]
    pub call_drop_ratio: Percent,
}

pub type SummaryTable = Vec<SummaryRow>;

/// Summary tables keyed by slice label, in first-inserted order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamedSummaryGroup {
    entries: Vec<(String, SummaryTable)>,
    index: HashMap<String, usize>,
}

impl NamedSummaryGroup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rows` under `label`, creating the label if it is new.
    pub fn append(&mut self, label: impl Into<String>, rows: SummaryTable) {
        let label = label.into();
        match self.index.get(&label) {
            Some(&i) => self.entries[i].1.extend(rows),
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, rows));
            }
        }
    }

    pub fn get(&self, label: &str) -> Option<&SummaryTable> {
        self.index.get(label).map(|&i| &self.entries[i].1)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SummaryTable)> {
        self.entries.iter().map(|(l, t)| (l.as_str(), t))
    }

    pub fn tables_mut(&mut self) -> impl Iterator<Item = &mut SummaryTable> {
        self.entries.iter_mut().map(|(_, t)| t)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(String, SummaryTable)> {
        self.entries
    }
}

impl Serialize for NamedSummaryGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
