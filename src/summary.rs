use crate::classify::Classification;
use crate::utils::round2;
use log::debug;
use serde::{Deserialize, Serialize};

pub const TOTAL_LABEL: &str = "Total";

/// Reporting category of a slice, derived from its remark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemarkBucket {
    /// Collective accounts, all accounts, or projects that ended before the cutoff.
    BeforeOrAll,
    /// Projects running past the cutoff.
    After,
    Unmatched,
}

impl RemarkBucket {
    pub fn categorize(remark: &str) -> Self {
        let remark = remark.to_lowercase();
        if remark.contains("vor") || remark.contains("alle") {
            Self::BeforeOrAll
        } else if remark.contains("nach") {
            Self::After
        } else {
            Self::Unmatched
        }
    }
}

/// How a balance should be emphasised in the summary table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Highlight {
    Positive,
    /// A deficit that later income can still cover.
    Warning,
    Critical,
    Neutral,
}

impl Highlight {
    fn for_entry(bucket: RemarkBucket, balance: f64) -> Self {
        match bucket {
            RemarkBucket::BeforeOrAll if balance < 0.0 => Self::Critical,
            RemarkBucket::After if balance < 0.0 => Self::Warning,
            RemarkBucket::BeforeOrAll | RemarkBucket::After if balance > 0.0 => Self::Positive,
            _ => Self::Neutral,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub label: String,
    pub remark: String,
    /// Newest-year balance, rounded to cents.
    pub balance: f64,
    pub bucket: RemarkBucket,
    pub highlight: Highlight,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryTable {
    pub entries: Vec<SummaryEntry>,
    /// The terminal row: `TOTAL_LABEL`, empty remark, sum of all entry balances.
    pub total: SummaryEntry,
    pub positive_sum: f64,
    pub negative_before_sum: f64,
    pub negative_after_sum: f64,
}

impl SummaryTable {
    /// Entries followed by the total row.
    pub fn rows(&self) -> impl Iterator<Item = &SummaryEntry> {
        self.entries.iter().chain(std::iter::once(&self.total))
    }
}

/// Collects the final balance of each classification in the order they are produced.
#[derive(Debug, Clone, Default)]
pub struct SummaryAccumulator {
    entries: Vec<SummaryEntry>,
}

impl SummaryAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `classification` unless it is empty or marked as detail-only.
    pub fn record(&mut self, classification: &Classification) {
        if !classification.include_in_summary {
            return;
        }
        let Some(balance) = classification.final_balance() else {
            return;
        };
        self.push(&classification.label, &classification.remark, balance);
    }

    pub fn push(&mut self, label: &str, remark: &str, balance: f64) {
        let balance = round2(balance);
        let bucket = RemarkBucket::categorize(remark);
        self.entries.push(SummaryEntry {
            label: label.to_string(),
            remark: remark.to_string(),
            balance,
            bucket,
            highlight: Highlight::for_entry(bucket, balance),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn finalize(self) -> SummaryTable {
        let mut total = 0.0;
        let mut positive_sum = 0.0;
        let mut negative_before_sum = 0.0;
        let mut negative_after_sum = 0.0;

        for entry in &self.entries {
            total += entry.balance;
            match entry.highlight {
                Highlight::Positive => positive_sum += entry.balance,
                Highlight::Critical => negative_before_sum += entry.balance,
                Highlight::Warning => negative_after_sum += entry.balance,
                Highlight::Neutral => {}
            }
        }

        let total_highlight = if total > 0.0 {
            Highlight::Positive
        } else if total - negative_after_sum >= 0.0 {
            Highlight::Warning
        } else {
            Highlight::Critical
        };

        debug!(
            "Summary over {} entries: total {:.2}",
            self.entries.len(),
            total
        );

        SummaryTable {
            entries: self.entries,
            total: SummaryEntry {
                label: TOTAL_LABEL.to_string(),
                remark: String::new(),
                balance: total,
                bucket: RemarkBucket::Unmatched,
                highlight: total_highlight,
            },
            positive_sum,
            negative_before_sum,
            negative_after_sum,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::YearTotals;

    fn classification(remark: &str, balances: &[f64], include: bool) -> Classification {
        Classification {
            title: format!("Projektart 68 | {}", remark),
            label: "Projektart 68".to_string(),
            remark: remark.to_string(),
            include_in_summary: include,
            years: balances
                .iter()
                .enumerate()
                .map(|(idx, balance)| YearTotals {
                    year: 2020 + idx as i32,
                    balance: *balance,
                    ..Default::default()
                })
                .collect(),
        }
    }

    #[test]
    fn test_categorize() {
        assert_eq!(
            RemarkBucket::categorize("Sammelkonten (alle)"),
            RemarkBucket::BeforeOrAll
        );
        assert_eq!(
            RemarkBucket::categorize("Einzelkonten (Projektende vor 30.06.24)"),
            RemarkBucket::BeforeOrAll
        );
        assert_eq!(RemarkBucket::categorize("Alle Konten"), RemarkBucket::BeforeOrAll);
        assert_eq!(
            RemarkBucket::categorize("Einzelkonten (Projektende nach 01.07.24)"),
            RemarkBucket::After
        );
        assert_eq!(RemarkBucket::categorize(""), RemarkBucket::Unmatched);
    }

    #[test]
    fn test_record_uses_last_year_rounded() {
        let mut acc = SummaryAccumulator::new();
        acc.record(&classification("Alle Konten", &[5.0, 10.004], true));
        let table = acc.finalize();
        assert_eq!(table.entries.len(), 1);
        assert_eq!(table.entries[0].balance, 10.0);
    }

    #[test]
    fn test_empty_and_detail_classifications_are_skipped() {
        let mut acc = SummaryAccumulator::new();
        acc.record(&classification("Alle Konten", &[], true));
        acc.record(&classification("Alle Konten", &[1.0], false));
        assert!(acc.is_empty());
        let table = acc.finalize();
        assert_eq!(table.total.balance, 0.0);
        assert_eq!(table.rows().count(), 1);
    }

    #[test]
    fn test_total_is_sum_of_entries() {
        let mut acc = SummaryAccumulator::new();
        acc.record(&classification("Sammelkonten (alle)", &[100.0], true));
        acc.record(&classification("Einzelkonten (Projektende vor 30.06.24)", &[-40.0], true));
        acc.record(&classification("Einzelkonten (Projektende nach 01.07.24)", &[-25.5], true));
        acc.record(&classification("sonstiges", &[7.25], true));
        let table = acc.finalize();

        let expected: f64 = table.entries.iter().map(|e| e.balance).sum();
        assert_eq!(table.total.balance, expected);
        assert!((table.total.balance - 41.75).abs() < 1e-9);
        assert_eq!(table.total.label, TOTAL_LABEL);
        assert_eq!(table.total.remark, "");
        assert_eq!(table.rows().last().unwrap().label, TOTAL_LABEL);

        assert_eq!(table.entries[0].highlight, Highlight::Positive);
        assert_eq!(table.entries[1].highlight, Highlight::Critical);
        assert_eq!(table.entries[2].highlight, Highlight::Warning);
        assert_eq!(table.entries[3].highlight, Highlight::Neutral);
        assert_eq!(table.negative_after_sum, -25.5);
        assert_eq!(table.total.highlight, Highlight::Positive);
    }

    #[test]
    fn test_total_highlight_when_deficit_is_covered_later() {
        let mut acc = SummaryAccumulator::new();
        acc.push("Projektart 90", "Alle Konten", 10.0);
        acc.push("Projektart 90", "Projektende nach 01.07.24", -30.0);
        let table = acc.finalize();
        // -20 overall, but without the ongoing deficit it would be +10
        assert_eq!(table.total.highlight, Highlight::Warning);

        let mut acc = SummaryAccumulator::new();
        acc.push("Projektart 90", "Alle Konten", -10.0);
        let table = acc.finalize();
        assert_eq!(table.total.highlight, Highlight::Critical);
    }
}
