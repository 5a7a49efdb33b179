use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The four SAP exports that make up one consolidation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Master,
    Budget,
    Obligo,
    Turnover,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::Master,
        SourceKind::Budget,
        SourceKind::Obligo,
        SourceKind::Turnover,
    ];

    /// Label SAP writes into column 1 of the first line of the export.
    pub fn expected_marker(&self) -> &'static str {
        match self {
            Self::Master => "Stammdaten HHP",
            Self::Budget => "Budget",
            Self::Obligo => "Obligos",
            Self::Turnover => "Kontostand",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Master => write!(f, "master data"),
            Self::Budget => write!(f, "budget"),
            Self::Obligo => write!(f, "obligo"),
            Self::Turnover => write!(f, "account turnover"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub psp: String,
    pub name: String,
    pub status: String,
    /// Raw `dd.mm.yyyy` text as exported; parsed after the join.
    pub project_end: String,
    pub funder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub psp: String,
    pub name: String,
    pub year: i32,
    /// "Budgetrest aus Vorjahr"
    pub carryover: f64,
    pub original_budget: f64,
    pub other_allocations: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObligoEntry {
    pub psp: String,
    pub name: String,
    pub year: i32,
    /// "Festlegungen"
    pub commitments: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnoverEntry {
    pub psp: String,
    pub name: String,
    pub year: i32,
    pub income_ila: f64,
    pub income_actual: f64,
    pub own_and_industry_shares: f64,
    pub expenditure_actual: f64,
    /// "Kontostand Jahr"
    pub year_balance: f64,
}

/// Budget side of a joined row. Budget and obligo are zero-filled against each other,
/// so both halves are present whenever either source had the key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanFigures {
    pub carryover: f64,
    pub original_budget: f64,
    pub other_allocations: f64,
    pub commitments: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnoverFigures {
    pub income_ila: f64,
    pub income_actual: f64,
    pub own_and_industry_shares: f64,
    pub expenditure_actual: f64,
    pub year_balance: f64,
}

/// One (project, year) row after the joins, before any balance is derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub psp: String,
    pub name: String,
    /// Two digit "Projektart" taken from the identifier.
    pub project_type: String,
    pub status: String,
    pub project_end: NaiveDate,
    pub funder: String,
    pub year: i32,
    /// `None` when neither budget nor obligo knew this (project, year).
    pub plan: Option<PlanFigures>,
    /// `None` when the turnover export had no entry; absence is distinct from zero.
    pub turnover: Option<TurnoverFigures>,
}

/// Which balance definition a project's "Kontostand" was resolved from.
///
/// Chosen once per project, so all years of one project carry the same variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum ResolvedBalance {
    Turnover(f64),
    Budget(f64),
}

impl ResolvedBalance {
    pub fn value(&self) -> f64 {
        match self {
            Self::Turnover(v) | Self::Budget(v) => *v,
        }
    }

    pub fn is_turnover(&self) -> bool {
        matches!(self, Self::Turnover(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedRecord {
    pub psp: String,
    pub name: String,
    pub project_type: String,
    pub status: String,
    pub project_end: NaiveDate,
    pub funder: String,
    pub year: i32,
    pub plan: Option<PlanFigures>,
    pub turnover: Option<TurnoverFigures>,
    /// "End Kontostand DM": running total of the yearly account balance.
    pub end_balance_turnover: Option<f64>,
    /// "End Kontostand Budget": next year's carry-over minus this year's commitments.
    pub end_balance_budget: Option<f64>,
    pub balance: ResolvedBalance,
}

impl UnifiedRecord {
    pub fn from_ledger_row(
        row: LedgerRow,
        end_balance_turnover: Option<f64>,
        end_balance_budget: Option<f64>,
        balance: ResolvedBalance,
    ) -> Self {
        Self {
            psp: row.psp,
            name: row.name,
            project_type: row.project_type,
            status: row.status,
            project_end: row.project_end,
            funder: row.funder,
            year: row.year,
            plan: row.plan,
            turnover: row.turnover,
            end_balance_turnover,
            end_balance_budget,
            balance,
        }
    }
}
