use crate::schema::{LedgerRow, ResolvedBalance, UnifiedRecord};
use chrono::NaiveDate;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running total of the yearly account balance, or `None` when the project has no
/// turnover data in any year. Undefined years count as zero once the project has any.
pub fn cumulative_turnover(rows: &[LedgerRow]) -> Option<Vec<f64>> {
    if rows.iter().all(|row| row.turnover.is_none()) {
        return None;
    }

    let mut running = 0.0;
    Some(
        rows.iter()
            .map(|row| {
                running += row.turnover.map(|t| t.year_balance).unwrap_or(0.0);
                running
            })
            .collect(),
    )
}

/// Next row's carry-over minus this row's commitments; the last row is always 0.
pub fn shifted_budget(rows: &[LedgerRow]) -> Vec<Option<f64>> {
    let mut shifted: Vec<Option<f64>> = rows
        .windows(2)
        .map(|pair| {
            let next_carryover = pair[1].plan.map(|p| p.carryover)?;
            let commitments = pair[0].plan.map(|p| p.commitments)?;
            Some(next_carryover - commitments)
        })
        .collect();

    if !rows.is_empty() {
        shifted.push(Some(0.0));
    }
    shifted
}

/// Derives both balances for one project's rows (already in ascending year order)
/// and resolves the authoritative one.
pub fn derive_project(rows: Vec<LedgerRow>) -> Vec<UnifiedRecord> {
    let turnover = cumulative_turnover(&rows);
    let budget = shifted_budget(&rows);

    rows.into_iter()
        .zip(budget)
        .enumerate()
        .map(|(idx, (row, end_budget))| {
            let end_turnover = turnover.as_ref().map(|values| values[idx]);
            let balance = match end_turnover {
                Some(value) => ResolvedBalance::Turnover(value),
                None => ResolvedBalance::Budget(end_budget.unwrap_or(0.0)),
            };
            UnifiedRecord::from_ledger_row(row, end_turnover, end_budget, balance)
        })
        .collect()
}

/// Groups the joined rows by project, orders each project by year and derives the
/// balances project by project.
///
/// Two candidate end-of-year balances exist for every (project, year):
///
/// - **Turnover based**: the running total of the yearly account balance booked in the
///   turnover export. Only defined for projects that appear in that export at all.
/// - **Budget based**: the carry-over SAP books into the *next* year minus the
///   commitments still open in this year. The newest year of a project has no next
///   year, so its value is fixed at 0.
///
/// A project resolves to the turnover balance for all its years as soon as any of its
/// years carries turnover data, and to the budget balance otherwise.
pub fn derive_balances(rows: Vec<LedgerRow>) -> Vec<UnifiedRecord> {
    let mut projects: BTreeMap<String, Vec<LedgerRow>> = BTreeMap::new();
    for row in rows {
        projects.entry(row.psp.clone()).or_default().push(row);
    }

    let mut turnover_projects = 0usize;
    let mut records = Vec::new();

    for (_, mut project_rows) in projects {
        project_rows.sort_by_key(|row| row.year);
        let derived = derive_project(project_rows);
        if derived.first().is_some_and(|r| r.balance.is_turnover()) {
            turnover_projects += 1;
        }
        records.extend(derived);
    }

    debug!(
        "Derived balances for {} records, {} projects resolved from account turnover",
        records.len(),
        turnover_projects
    );
    records
}

/// Latest state of one project, as shown in the per-project detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectOverview {
    pub psp: String,
    pub name: String,
    pub project_type: String,
    pub status: String,
    pub project_end: NaiveDate,
    pub funder: String,
    pub end_balance_budget: Option<f64>,
    pub end_balance_turnover: Option<f64>,
    pub balance: f64,
}

/// One entry per project holding the last defined value of each balance column,
/// sorted by project type, project end and identifier.
pub fn project_overview(records: &[UnifiedRecord]) -> Vec<ProjectOverview> {
    type ProjectKey = (String, String, String, NaiveDate, String);
    let mut projects: BTreeMap<ProjectKey, ProjectOverview> = BTreeMap::new();

    for record in records {
        let key = (
            record.psp.clone(),
            record.name.clone(),
            record.status.clone(),
            record.project_end,
            record.funder.clone(),
        );
        let entry = projects.entry(key).or_insert_with(|| ProjectOverview {
            psp: record.psp.clone(),
            name: record.name.clone(),
            project_type: record.project_type.clone(),
            status: record.status.clone(),
            project_end: record.project_end,
            funder: record.funder.clone(),
            end_balance_budget: None,
            end_balance_turnover: None,
            balance: 0.0,
        });

        if record.end_balance_budget.is_some() {
            entry.end_balance_budget = record.end_balance_budget;
        }
        if record.end_balance_turnover.is_some() {
            entry.end_balance_turnover = record.end_balance_turnover;
        }
        entry.project_type = record.project_type.clone();
        entry.balance = record.balance.value();
    }

    let mut overview: Vec<ProjectOverview> = projects.into_values().collect();
    overview.sort_by(|a, b| {
        (&a.project_type, a.project_end, &a.psp, &a.status).cmp(&(
            &b.project_type,
            b.project_end,
            &b.psp,
            &b.status,
        ))
    });
    overview
}
