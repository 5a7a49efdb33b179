use crate::error::Result;
use crate::schema::UnifiedRecord;
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Anchored match of the project type at positions 3..5 of a 15 digit identifier.
#[derive(Debug, Clone)]
pub struct ProjectTypePattern {
    code: String,
    regex: Regex,
}

impl ProjectTypePattern {
    pub fn new(code: &str) -> Result<Self> {
        let regex = Regex::new(&format!(r"^\d{{3}}{}\d{{10}}$", regex::escape(code)))?;
        Ok(Self {
            code: code.to_string(),
            regex,
        })
    }

    pub fn from_code(code: u8) -> Result<Self> {
        Self::new(&format!("{:02}", code))
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, psp: &str) -> bool {
        self.regex.is_match(psp)
    }
}

/// Which records a classification covers.
#[derive(Debug, Clone)]
pub enum Selector {
    All,
    ProjectType(ProjectTypePattern),
    /// A single project, for the detail sections.
    Project(String),
}

impl Selector {
    pub fn matches(&self, record: &UnifiedRecord) -> bool {
        match self {
            Self::All => true,
            Self::ProjectType(pattern) => pattern.matches(&record.psp),
            Self::Project(psp) => record.psp == *psp,
        }
    }
}

/// Column sums of all selected records of one year. Undefined cells add nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YearTotals {
    pub year: i32,
    pub carryover: f64,
    pub original_budget: f64,
    pub other_allocations: f64,
    pub commitments: f64,
    pub end_balance_budget: f64,
    pub income_actual: f64,
    pub income_ila: f64,
    pub own_and_industry_shares: f64,
    pub expenditure_actual: f64,
    pub year_balance: f64,
    pub end_balance_turnover: f64,
    pub balance: f64,
}

impl YearTotals {
    fn add(&mut self, record: &UnifiedRecord) {
        if let Some(plan) = record.plan {
            self.carryover += plan.carryover;
            self.original_budget += plan.original_budget;
            self.other_allocations += plan.other_allocations;
            self.commitments += plan.commitments;
        }
        if let Some(turnover) = record.turnover {
            self.income_actual += turnover.income_actual;
            self.income_ila += turnover.income_ila;
            self.own_and_industry_shares += turnover.own_and_industry_shares;
            self.expenditure_actual += turnover.expenditure_actual;
            self.year_balance += turnover.year_balance;
        }
        self.end_balance_budget += record.end_balance_budget.unwrap_or(0.0);
        self.end_balance_turnover += record.end_balance_turnover.unwrap_or(0.0);
        self.balance += record.balance.value();
    }
}

/// Mean balance and least-squares slope per year over a classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalanceTrend {
    pub mean: f64,
    /// `None` with fewer than two years.
    pub slope_per_year: Option<f64>,
}

impl BalanceTrend {
    pub fn from_balances(balances: &[f64]) -> Option<Self> {
        if balances.is_empty() {
            return None;
        }
        let n = balances.len() as f64;
        let mean = balances.iter().sum::<f64>() / n;

        let slope_per_year = if balances.len() > 1 {
            let x_mean = (n - 1.0) / 2.0;
            let (num, den) = balances
                .iter()
                .enumerate()
                .fold((0.0, 0.0), |(num, den), (idx, y)| {
                    let dx = idx as f64 - x_mean;
                    (num + dx * (y - mean), den + dx * dx)
                });
            Some(num / den)
        } else {
            None
        };

        Some(Self {
            mean,
            slope_per_year,
        })
    }
}

/// The per-year aggregate of one reporting slice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub title: String,
    pub label: String,
    pub remark: String,
    pub include_in_summary: bool,
    /// Ascending by year; empty when nothing matched.
    pub years: Vec<YearTotals>,
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    /// Balance of the newest year in the slice.
    pub fn final_balance(&self) -> Option<f64> {
        self.years.last().map(|y| y.balance)
    }

    pub fn trend(&self) -> Option<BalanceTrend> {
        let balances: Vec<f64> = self.years.iter().map(|y| y.balance).collect();
        BalanceTrend::from_balances(&balances)
    }
}

/// Splits "label | remark" titles; titles without a bar have an empty remark.
pub fn split_title(title: &str) -> (String, String) {
    let mut parts = title.split('|');
    let label = parts.next().unwrap_or("").trim().to_string();
    let remark = parts.next().unwrap_or("").trim().to_string();
    (label, remark)
}

/// Filters `records` with `selector` and sums every numeric column per year. A
/// selector that matches nothing gives an empty classification, never an error.
pub fn classify(
    records: &[UnifiedRecord],
    selector: &Selector,
    title: &str,
    include_in_summary: bool,
) -> Classification {
    let mut by_year: BTreeMap<i32, YearTotals> = BTreeMap::new();

    for record in records.iter().filter(|r| selector.matches(r)) {
        by_year
            .entry(record.year)
            .or_insert_with(|| YearTotals {
                year: record.year,
                ..Default::default()
            })
            .add(record);
    }

    let (label, remark) = split_title(title);
    if by_year.is_empty() {
        info!("No data for '{}'", title);
    } else {
        debug!("'{}' covers {} years", title, by_year.len());
    }

    Classification {
        title: title.to_string(),
        label,
        remark,
        include_in_summary,
        years: by_year.into_values().collect(),
    }
}

/// Distinct project type codes present in `records`, ascending.
pub fn project_types(records: &[UnifiedRecord]) -> BTreeSet<String> {
    records.iter().map(|r| r.project_type.clone()).collect()
}
