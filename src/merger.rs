use crate::error::{ControllingError, Result};
use crate::projection::ProjectedSources;
use crate::schema::{
    BudgetEntry, LedgerRow, ObligoEntry, PlanFigures, ProjectRecord, SourceKind, TurnoverEntry,
    TurnoverFigures,
};
use crate::utils::{parse_project_end, project_type_of};
use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};

type GroupKey = (String, String, i32);

/// An export row that is summed per (project, name, year).
pub trait YearEntry: Clone {
    fn psp(&self) -> &str;
    fn name(&self) -> &str;
    fn year(&self) -> i32;
    fn accumulate(&mut self, other: &Self);

    fn group_key(&self) -> GroupKey {
        (self.psp().to_string(), self.name().to_string(), self.year())
    }
}

impl YearEntry for BudgetEntry {
    fn psp(&self) -> &str {
        &self.psp
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn accumulate(&mut self, other: &Self) {
        self.carryover += other.carryover;
        self.original_budget += other.original_budget;
        self.other_allocations += other.other_allocations;
    }
}

impl YearEntry for ObligoEntry {
    fn psp(&self) -> &str {
        &self.psp
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn accumulate(&mut self, other: &Self) {
        self.commitments += other.commitments;
    }
}

impl YearEntry for TurnoverEntry {
    fn psp(&self) -> &str {
        &self.psp
    }
    fn name(&self) -> &str {
        &self.name
    }
    fn year(&self) -> i32 {
        self.year
    }
    fn accumulate(&mut self, other: &Self) {
        self.income_ila += other.income_ila;
        self.income_actual += other.income_actual;
        self.own_and_industry_shares += other.own_and_industry_shares;
        self.expenditure_actual += other.expenditure_actual;
        self.year_balance += other.year_balance;
    }
}

/// Sums duplicate rows of the same (project, name, year).
pub fn aggregate<T: YearEntry>(entries: &[T]) -> Vec<T> {
    let mut groups: BTreeMap<GroupKey, T> = BTreeMap::new();

    for entry in entries {
        groups
            .entry(entry.group_key())
            .and_modify(|acc| acc.accumulate(entry))
            .or_insert_with(|| entry.clone());
    }

    groups.into_values().collect()
}

/// Year-over-year derivation needs at least two distinct years.
pub fn require_years<T: YearEntry>(kind: SourceKind, entries: &[T]) -> Result<()> {
    let years: BTreeSet<i32> = entries.iter().map(|e| e.year()).collect();
    if years.len() < 2 {
        return Err(ControllingError::InsufficientYears {
            kind,
            years: years.into_iter().collect(),
        });
    }
    Ok(())
}

/// Full join key, in the order rows end up sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct JoinKey {
    psp: String,
    name: String,
    status: String,
    project_end: String,
    funder: String,
    year: i32,
}

#[derive(Debug, Default)]
struct JoinedCells {
    plan: Option<PlanFigures>,
    turnover: Option<TurnoverFigures>,
}

struct MasterIndex<'a> {
    by_project: HashMap<(String, String), &'a ProjectRecord>,
}

impl<'a> MasterIndex<'a> {
    fn new(projects: &'a [ProjectRecord]) -> Self {
        let mut by_project = HashMap::with_capacity(projects.len());
        for project in projects {
            let key = (project.psp.clone(), project.name.clone());
            if by_project.contains_key(&key) {
                warn!(
                    "Project {} ({}) appears more than once in the master data; using the first entry",
                    project.psp, project.name
                );
                continue;
            }
            by_project.insert(key, project);
        }
        Self { by_project }
    }

    /// Inner join: entries without master data yield `None` and are dropped.
    fn key_for<T: YearEntry>(&self, entry: &T) -> Option<JoinKey> {
        self.by_project
            .get(&(entry.psp().to_string(), entry.name().to_string()))
            .map(|project| JoinKey {
                psp: project.psp.clone(),
                name: project.name.clone(),
                status: project.status.clone(),
                project_end: project.project_end.clone(),
                funder: project.funder.clone(),
                year: entry.year(),
            })
    }
}

/// Builds the pre-balance record set, one row per (project, year): aggregate, check
/// the year span, attach master data, then outer join budget with obligo and the
/// result with turnover.
pub fn merge(sources: &ProjectedSources) -> Result<Vec<LedgerRow>> {
    let budget = aggregate(&sources.budget);
    let obligo = aggregate(&sources.obligo);
    let turnover = aggregate(&sources.turnover);

    require_years(SourceKind::Budget, &budget)?;
    require_years(SourceKind::Turnover, &turnover)?;

    let master = MasterIndex::new(&sources.projects);
    let mut joined: BTreeMap<JoinKey, JoinedCells> = BTreeMap::new();
    let mut unmatched = 0usize;

    for entry in &budget {
        let Some(key) = master.key_for(entry) else {
            unmatched += 1;
            continue;
        };
        let plan = joined.entry(key).or_default().plan.get_or_insert_with(Default::default);
        plan.carryover = entry.carryover;
        plan.original_budget = entry.original_budget;
        plan.other_allocations = entry.other_allocations;
    }

    for entry in &obligo {
        let Some(key) = master.key_for(entry) else {
            unmatched += 1;
            continue;
        };
        let plan = joined.entry(key).or_default().plan.get_or_insert_with(Default::default);
        plan.commitments = entry.commitments;
    }

    for entry in &turnover {
        let Some(key) = master.key_for(entry) else {
            unmatched += 1;
            continue;
        };
        joined.entry(key).or_default().turnover = Some(TurnoverFigures {
            income_ila: entry.income_ila,
            income_actual: entry.income_actual,
            own_and_industry_shares: entry.own_and_industry_shares,
            expenditure_actual: entry.expenditure_actual,
            year_balance: entry.year_balance,
        });
    }

    if unmatched > 0 {
        debug!(
            "Dropped {} aggregated entries without matching master data",
            unmatched
        );
    }

    joined
        .into_iter()
        .map(|(key, cells)| {
            let project_end = parse_project_end(&key.psp, &key.project_end)?;
            Ok(LedgerRow {
                project_type: project_type_of(&key.psp),
                psp: key.psp,
                name: key.name,
                status: key.status,
                project_end,
                funder: key.funder,
                year: key.year,
                plan: cells.plan,
                turnover: cells.turnover,
            })
        })
        .collect()
}
