use crate::error::{ControllingError, Result};
use crate::ingestion::{RawTable, SourceSet};
use crate::schema::{BudgetEntry, ObligoEntry, ProjectRecord, SourceKind, TurnoverEntry};
use crate::utils::parse_amount;
use log::debug;

/// Marks SAP subtotal ("Ergebnis") and grand total ("Gesamtergebnis") lines.
const RESULT_MARKER: &str = "Ergebnis";
const GRAND_TOTAL: &str = "Gesamtergebnis";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectedSources {
    pub projects: Vec<ProjectRecord>,
    pub budget: Vec<BudgetEntry>,
    pub obligo: Vec<ObligoEntry>,
    pub turnover: Vec<TurnoverEntry>,
}

fn cell(row: &[String], idx: usize) -> &str {
    row.get(idx).map(|s| s.trim()).unwrap_or("")
}

fn amount(kind: SourceKind, row_idx: usize, row: &[String], idx: usize) -> Result<f64> {
    let text = cell(row, idx);
    parse_amount(text).ok_or_else(|| ControllingError::AmountParse {
        kind,
        row: row_idx + 1,
        value: text.to_string(),
    })
}

fn year(kind: SourceKind, row_idx: usize, row: &[String], idx: usize) -> Result<i32> {
    let text = cell(row, idx);
    text.parse().map_err(|_| ControllingError::YearParse {
        kind,
        row: row_idx + 1,
        value: text.to_string(),
    })
}

/// Columns 3, 4, 2, 7, 10: PSP, name, status, project end, funder.
pub fn project_master(table: &RawTable) -> Vec<ProjectRecord> {
    table
        .rows
        .iter()
        .map(|row| ProjectRecord {
            psp: cell(row, 3).to_string(),
            name: cell(row, 4).to_string(),
            status: cell(row, 2).to_string(),
            project_end: cell(row, 7).to_string(),
            funder: cell(row, 10).to_string(),
        })
        .collect()
}

/// Columns 0, 1, 2, 7, 8, 9 after dropping rows whose column 6 is a subtotal.
pub fn project_budget(table: &RawTable) -> Result<Vec<BudgetEntry>> {
    let kind = SourceKind::Budget;
    let mut entries = Vec::with_capacity(table.len());

    for (idx, row) in table.rows.iter().enumerate() {
        if cell(row, 6).contains(RESULT_MARKER) {
            continue;
        }
        entries.push(BudgetEntry {
            psp: cell(row, 0).to_string(),
            name: cell(row, 1).to_string(),
            year: year(kind, idx, row, 2)?,
            carryover: amount(kind, idx, row, 7)?,
            original_budget: amount(kind, idx, row, 8)?,
            other_allocations: amount(kind, idx, row, 9)?,
        });
    }

    debug!(
        "Budget: kept {} of {} rows",
        entries.len(),
        table.len()
    );
    Ok(entries)
}

/// Columns 3, 4, 0, 7: PSP, name, year, commitments.
pub fn project_obligo(table: &RawTable) -> Result<Vec<ObligoEntry>> {
    let kind = SourceKind::Obligo;
    table
        .rows
        .iter()
        .enumerate()
        .map(|(idx, row)| {
            Ok(ObligoEntry {
                psp: cell(row, 3).to_string(),
                name: cell(row, 4).to_string(),
                year: year(kind, idx, row, 0)?,
                commitments: amount(kind, idx, row, 7)?,
            })
        })
        .collect()
}

/// Columns 0 to 7 after dropping subtotal and grand total lines.
pub fn project_turnover(table: &RawTable) -> Result<Vec<TurnoverEntry>> {
    let kind = SourceKind::Turnover;
    let mut entries = Vec::with_capacity(table.len());

    for (idx, row) in table.rows.iter().enumerate() {
        if cell(row, 2).contains(RESULT_MARKER) || cell(row, 0) == GRAND_TOTAL {
            continue;
        }
        entries.push(TurnoverEntry {
            psp: cell(row, 0).to_string(),
            name: cell(row, 1).to_string(),
            year: year(kind, idx, row, 2)?,
            income_ila: amount(kind, idx, row, 3)?,
            income_actual: amount(kind, idx, row, 4)?,
            own_and_industry_shares: amount(kind, idx, row, 5)?,
            expenditure_actual: amount(kind, idx, row, 6)?,
            year_balance: amount(kind, idx, row, 7)?,
        });
    }

    debug!(
        "Account turnover: kept {} of {} rows",
        entries.len(),
        table.len()
    );
    Ok(entries)
}

pub fn project_sources(sources: &SourceSet) -> Result<ProjectedSources> {
    Ok(ProjectedSources {
        projects: project_master(&sources.master),
        budget: project_budget(&sources.budget)?,
        obligo: project_obligo(&sources.obligo)?,
        turnover: project_turnover(&sources.turnover)?,
    })
}
