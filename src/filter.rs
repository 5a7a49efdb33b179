use crate::error::Result;
use crate::schema::UnifiedRecord;
use crate::utils::{mid_year_cutoff, next_day};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Funder codes of collective accounts ("Sammelkonten").
pub const COLLECTIVE_FUNDERS: &str = "^999$|^1$";

/// Status text of projects that are closed in SAP.
pub const ENDED_STATUS: &str = "beendet";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Column {
    Psp,
    Name,
    ProjectType,
    Status,
    Funder,
    ProjectEnd,
}

impl Column {
    pub fn text<'a>(&self, record: &'a UnifiedRecord) -> std::borrow::Cow<'a, str> {
        match self {
            Self::Psp => record.psp.as_str().into(),
            Self::Name => record.name.as_str().into(),
            Self::ProjectType => record.project_type.as_str().into(),
            Self::Status => record.status.as_str().into(),
            Self::Funder => record.funder.as_str().into(),
            Self::ProjectEnd => record.project_end.format("%d.%m.%Y").to_string().into(),
        }
    }
}

fn select(
    records: &[UnifiedRecord],
    column: Column,
    pattern: &str,
    keep_matches: bool,
) -> Result<Vec<UnifiedRecord>> {
    let regex = Regex::new(pattern)?;
    Ok(records
        .iter()
        .filter(|record| regex.is_match(&column.text(record)) == keep_matches)
        .cloned()
        .collect())
}

/// Rows whose `column` matches `pattern` anywhere.
pub fn contains(
    records: &[UnifiedRecord],
    column: Column,
    pattern: &str,
) -> Result<Vec<UnifiedRecord>> {
    select(records, column, pattern, true)
}

/// Rows whose `column` does not match `pattern`.
pub fn not_contains(
    records: &[UnifiedRecord],
    column: Column,
    pattern: &str,
) -> Result<Vec<UnifiedRecord>> {
    select(records, column, pattern, false)
}

pub fn collective_accounts(records: &[UnifiedRecord]) -> Result<Vec<UnifiedRecord>> {
    contains(records, Column::Funder, COLLECTIVE_FUNDERS)
}

pub fn individual_accounts(records: &[UnifiedRecord]) -> Result<Vec<UnifiedRecord>> {
    not_contains(records, Column::Funder, COLLECTIVE_FUNDERS)
}

pub fn exclude_ended(records: &[UnifiedRecord]) -> Result<Vec<UnifiedRecord>> {
    not_contains(records, Column::Status, ENDED_STATUS)
}

pub fn latest_year(records: &[UnifiedRecord]) -> Option<i32> {
    records.iter().map(|r| r.year).max()
}

pub fn earliest_year(records: &[UnifiedRecord]) -> Option<i32> {
    records.iter().map(|r| r.year).min()
}

/// Drops every row of the newest year present; all other rows are kept as they are.
pub fn exclude_latest_year(records: &[UnifiedRecord]) -> Vec<UnifiedRecord> {
    match latest_year(records) {
        Some(latest) => records.iter().filter(|r| r.year != latest).cloned().collect(),
        None => Vec::new(),
    }
}

/// Separates expired from ongoing projects: June 30 of the newest year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingCutoff {
    pub cutoff: NaiveDate,
    /// First day after the cutoff; only used in slice labels.
    pub ongoing_from: NaiveDate,
}

impl ReportingCutoff {
    pub fn for_year(year: i32) -> Option<Self> {
        let cutoff = mid_year_cutoff(year)?;
        Some(Self {
            cutoff,
            ongoing_from: next_day(cutoff),
        })
    }

    pub fn from_records(records: &[UnifiedRecord]) -> Option<Self> {
        latest_year(records).and_then(Self::for_year)
    }

    /// Projects that ended on or before the cutoff.
    pub fn expired_projects(&self, records: &[UnifiedRecord]) -> Vec<UnifiedRecord> {
        records
            .iter()
            .filter(|r| r.project_end <= self.cutoff)
            .cloned()
            .collect()
    }

    /// Projects still running after the cutoff.
    pub fn ongoing_projects(&self, records: &[UnifiedRecord]) -> Vec<UnifiedRecord> {
        records
            .iter()
            .filter(|r| r.project_end > self.cutoff)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ResolvedBalance;

    fn record(psp: &str, funder: &str, status: &str, end: (i32, u32, u32), year: i32) -> UnifiedRecord {
        UnifiedRecord {
            psp: psp.to_string(),
            name: "Alpha".to_string(),
            project_type: crate::utils::project_type_of(psp),
            status: status.to_string(),
            project_end: NaiveDate::from_ymd_opt(end.0, end.1, end.2).unwrap(),
            funder: funder.to_string(),
            year,
            plan: None,
            turnover: None,
            end_balance_turnover: None,
            end_balance_budget: Some(0.0),
            balance: ResolvedBalance::Budget(0.0),
        }
    }

    fn sample() -> Vec<UnifiedRecord> {
        vec![
            record("123681234560001", "999", "freigegeben", (2022, 12, 31), 2023),
            record("123681234560002", "1", "freigegeben", (2024, 6, 30), 2024),
            record("123691234560003", "19999", "beendet", (2024, 7, 1), 2023),
            record("123691234560004", "10", "Projekt beendet", (2026, 1, 1), 2024),
        ]
    }

    #[test]
    fn test_collective_split() {
        let records = sample();
        let collective = collective_accounts(&records).unwrap();
        let individual = individual_accounts(&records).unwrap();
        assert_eq!(collective.len(), 2);
        assert_eq!(individual.len(), 2);
        assert!(individual.iter().all(|r| r.funder != "999" && r.funder != "1"));
        assert_eq!(records.len(), 4);
    }

    #[test]
    fn test_contains_with_regex() {
        let records = sample();
        let pa_69 = contains(&records, Column::Psp, r"^\d{3}69").unwrap();
        assert_eq!(pa_69.len(), 2);
        let not_pa_69 = not_contains(&records, Column::ProjectType, "69").unwrap();
        assert_eq!(not_pa_69.len(), 2);
        assert!(contains(&records, Column::Name, "(").is_err());
    }

    #[test]
    fn test_exclude_ended() {
        let remaining = exclude_ended(&sample()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| !r.status.contains("beendet")));
    }

    #[test]
    fn test_exclude_latest_year() {
        let records = sample();
        let remaining = exclude_latest_year(&records);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|r| r.year == 2023));
        assert_eq!(remaining[0], records[0]);
        assert!(exclude_latest_year(&[]).is_empty());
    }

    #[test]
    fn test_cutoff_split() {
        let records = sample();
        let cutoff = ReportingCutoff::from_records(&records).unwrap();
        assert_eq!(cutoff.cutoff, NaiveDate::from_ymd_opt(2024, 6, 30).unwrap());
        assert_eq!(cutoff.ongoing_from, NaiveDate::from_ymd_opt(2024, 7, 1).unwrap());

        let expired = cutoff.expired_projects(&records);
        let ongoing = cutoff.ongoing_projects(&records);
        assert_eq!(expired.len(), 2);
        assert_eq!(ongoing.len(), 2);
        // the cutoff day itself counts as expired
        assert!(expired.iter().any(|r| r.psp == "123681234560002"));
    }
}
