//! # Project Balance Builder
//!
//! Consolidates the four SAP exports of one organizational unit (IKZ) into a single
//! balance per project and year, and slices that data by project type for the
//! controlling report.
//!
//! ## Core Concepts
//!
//! - **Sources**: project master data ("Stammdaten"), budget, open commitments
//!   ("Obligo") and account turnover ("Kontostand"), each a `;` separated export
//! - **Ledger rows**: budget, obligo and turnover joined per (project, year) against
//!   the master data
//! - **Resolved balance**: the running turnover total when a project has any turnover,
//!   the forward-shifted budget balance otherwise
//! - **Slices**: collective accounts, expired and ongoing individual accounts, or all
//!   accounts, classified by the project type ("PA") digits of the identifier
//! - **Summary**: the newest balance of every slice plus a grand total
//!
//! ## Example
//!
//! ```rust,ignore
//! use project_balance_builder::*;
//!
//! let config = ControllingConfig::load("config.json")?;
//! let sources = SourceSet::load(&config)?;
//! let ledger = consolidate(&sources, &config)?;
//!
//! let slices = ledger.slices()?;
//! let plan = ReportPlan::from_config(&slices, &config, &[])?;
//! let report = ControllingReport::build(&ledger, &slices, &plan);
//! println!("{}", report.to_text());
//! ```

pub mod balance;
pub mod classify;
pub mod config;
pub mod error;
pub mod filter;
pub mod ingestion;
pub mod merger;
pub mod obfuscate;
pub mod plan;
pub mod projection;
pub mod report;
pub mod schema;
pub mod summary;
pub mod utils;
pub mod validation;

pub use balance::{derive_balances, project_overview, ProjectOverview};
pub use classify::{classify, BalanceTrend, Classification, ProjectTypePattern, Selector, YearTotals};
pub use config::ControllingConfig;
pub use error::{ControllingError, Result};
pub use filter::{Column, ReportingCutoff};
pub use ingestion::*;
pub use merger::merge;
pub use obfuscate::obfuscate_records;
pub use plan::{PlanItem, ReportPlan, Slice, Slices};
pub use projection::{project_sources, ProjectedSources};
pub use report::TextReport;
pub use schema::*;
pub use summary::{Highlight, RemarkBucket, SummaryAccumulator, SummaryEntry, SummaryTable};
pub use utils::{format_euro, timed};

use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// The unified record set of one IKZ after all post-processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsolidatedLedger {
    /// The IKZ, or `obfuscate::MASKED_UNIT` for obfuscated runs.
    pub unit: String,
    /// Sorted by project type, project end, identifier, year and status.
    pub records: Vec<UnifiedRecord>,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
}

impl ConsolidatedLedger {
    pub fn slices(&self) -> Result<Slices> {
        Slices::new(&self.records)
    }

    pub fn overview(&self) -> Vec<ProjectOverview> {
        project_overview(&self.records)
    }
}

pub struct LedgerConsolidator;

impl LedgerConsolidator {
    pub fn consolidate<R: Rng>(
        sources: &SourceSet,
        config: &ControllingConfig,
        rng: &mut R,
    ) -> Result<ConsolidatedLedger> {
        config.validate()?;

        for kind in SourceKind::ALL {
            if config.check_marker(kind) {
                validation::check_content_marker(kind, sources.get(kind).marker.as_deref())?;
            } else {
                debug!("Skipping content check of the {} export", kind);
            }
        }

        let projected = projection::project_sources(sources)?;
        let unit = validation::resolve_unit(&projected)?;
        info!("Consolidating SAP exports of IKZ {}", unit);
        debug!(
            "Projected {} projects, {} budget, {} obligo and {} turnover rows",
            projected.projects.len(),
            projected.budget.len(),
            projected.obligo.len(),
            projected.turnover.len()
        );

        let rows = merger::merge(&projected)?;
        let mut records = balance::derive_balances(rows);
        sort_records(&mut records);

        if config.rm_beendet {
            let before = records.len();
            records = filter::exclude_ended(&records)?;
            debug!("Removed {} rows of ended projects", before - records.len());
        }
        if config.rm_current_year {
            if let Some(year) = filter::latest_year(&records) {
                info!("Removing the incomplete year {}", year);
            }
            records = filter::exclude_latest_year(&records);
        }

        let unit = if config.obfuscated {
            records = obfuscate::obfuscate_records(&records, rng);
            obfuscate::MASKED_UNIT.to_string()
        } else {
            unit
        };

        let ledger = ConsolidatedLedger {
            first_year: filter::earliest_year(&records),
            last_year: filter::latest_year(&records),
            unit,
            records,
        };
        info!(
            "Consolidated {} records for IKZ {}",
            ledger.records.len(),
            ledger.unit
        );
        Ok(ledger)
    }
}

pub fn consolidate(sources: &SourceSet, config: &ControllingConfig) -> Result<ConsolidatedLedger> {
    LedgerConsolidator::consolidate(sources, config, &mut rand::thread_rng())
}

pub fn consolidate_with_rng<R: Rng>(
    sources: &SourceSet,
    config: &ControllingConfig,
    rng: &mut R,
) -> Result<ConsolidatedLedger> {
    LedgerConsolidator::consolidate(sources, config, rng)
}

fn sort_records(records: &mut [UnifiedRecord]) {
    records.sort_by(|a, b| {
        (&a.project_type, a.project_end, &a.psp, a.year, &a.status).cmp(&(
            &b.project_type,
            b.project_end,
            &b.psp,
            b.year,
            &b.status,
        ))
    });
}

/// Everything the text report shows, in report order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllingReport {
    pub unit: String,
    pub first_year: Option<i32>,
    pub last_year: Option<i32>,
    pub classifications: Vec<Classification>,
    pub summary: SummaryTable,
    pub overview: Vec<ProjectOverview>,
}

impl ControllingReport {
    pub fn build(ledger: &ConsolidatedLedger, slices: &Slices, plan: &ReportPlan) -> Self {
        let mut accumulator = SummaryAccumulator::new();
        let classifications = plan.run(slices, &mut accumulator);
        debug!(
            "{} of {} slices enter the summary",
            accumulator.len(),
            classifications.len()
        );

        Self {
            unit: ledger.unit.clone(),
            first_year: ledger.first_year,
            last_year: ledger.last_year,
            classifications,
            summary: accumulator.finalize(),
            overview: ledger.overview(),
        }
    }

    fn year_or_blank(year: Option<i32>) -> String {
        year.map(|y| y.to_string()).unwrap_or_default()
    }

    pub fn to_text(&self) -> String {
        let first = Self::year_or_blank(self.first_year);
        let last = Self::year_or_blank(self.last_year);

        let mut text = TextReport::new();
        text.append_title(&format!(
            "Finanzübersicht {} - {} für die IKZ {}",
            first, last, self.unit
        ));
        text.append("Kontostände nach Projektart und Jahr in Euro\n\n");
        for classification in &self.classifications {
            text.append_classification(classification);
        }
        text.append_summary(
            &format!(
                "Zusammenfassung für IKZ {} (Stand 31.12.{})",
                self.unit, last
            ),
            &self.summary,
        );
        text.append_overview(
            &format!(
                "Details nach Projekt für IKZ {} (Stand 31.12.{})",
                self.unit, last
            ),
            &self.overview,
        );
        text.signature_lines(&self.unit);
        text.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const PROJECT_A: &str = "123681234560001";
    const PROJECT_B: &str = "123701234560002";

    fn table(marker: &str, rows: &[&[&str]]) -> RawTable {
        RawTable {
            marker: Some(marker.to_string()),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    fn master_row<'a>(psp: &'a str, name: &'a str, status: &'a str) -> [&'a str; 11] {
        ["", "", status, psp, name, "", "", "31.12.2030", "", "", "42"]
    }

    fn sources() -> SourceSet {
        SourceSet {
            master: table(
                "Stammdaten HHP",
                &[
                    &master_row(PROJECT_A, "Alpha", "freigegeben"),
                    &master_row(PROJECT_B, "Beta", "freigegeben"),
                ],
            ),
            budget: table(
                "Budget",
                &[
                    &[PROJECT_A, "Alpha", "2023", "", "", "", "", "0", "500", "0"],
                    &[PROJECT_A, "Alpha", "2024", "", "", "", "", "0", "0", "0"],
                    &[PROJECT_B, "Beta", "2023", "", "", "", "", "0", "300", "0"],
                    &[PROJECT_B, "Beta", "2024", "", "", "", "", "200", "0", "0"],
                    &["", "", "", "", "", "", "Ergebnis", "200", "800", "0"],
                ],
            ),
            obligo: table(
                "Obligos",
                &[&["2023", "", "", PROJECT_B, "Beta", "", "", "30"]],
            ),
            turnover: table(
                "Kontostand",
                &[
                    &[PROJECT_A, "Alpha", "2023", "0", "0", "0", "0", "100"],
                    &[PROJECT_A, "Alpha", "2024", "0", "0", "0", "0", "-150"],
                    &["Gesamtergebnis", "", "", "0", "0", "0", "0", "-50"],
                ],
            ),
        }
    }

    fn config() -> ControllingConfig {
        ControllingConfig {
            rm_current_year: false,
            ..Default::default()
        }
    }

    fn balances(ledger: &ConsolidatedLedger, psp: &str) -> Vec<f64> {
        ledger
            .records
            .iter()
            .filter(|r| r.psp == psp)
            .map(|r| r.balance.value())
            .collect()
    }

    #[test]
    fn test_turnover_balance_is_cumulative() {
        let ledger = consolidate(&sources(), &config()).unwrap();
        assert_eq!(ledger.unit, "123456");
        assert_eq!(balances(&ledger, PROJECT_A), vec![100.0, -50.0]);
        assert!(ledger
            .records
            .iter()
            .filter(|r| r.psp == PROJECT_A)
            .all(|r| r.balance.is_turnover()));
    }

    #[test]
    fn test_budget_fallback_without_turnover() {
        let ledger = consolidate(&sources(), &config()).unwrap();
        assert_eq!(balances(&ledger, PROJECT_B), vec![170.0, 0.0]);
        let last = ledger.records.iter().rfind(|r| r.psp == PROJECT_B).unwrap();
        assert_eq!(last.end_balance_budget, Some(0.0));
        assert_eq!(last.end_balance_turnover, None);
    }

    #[test]
    fn test_records_are_sorted_by_project_type() {
        let ledger = consolidate(&sources(), &config()).unwrap();
        let order: Vec<(&str, i32)> = ledger
            .records
            .iter()
            .map(|r| (r.psp.as_str(), r.year))
            .collect();
        assert_eq!(
            order,
            vec![
                (PROJECT_A, 2023),
                (PROJECT_A, 2024),
                (PROJECT_B, 2023),
                (PROJECT_B, 2024)
            ]
        );
        assert_eq!(ledger.first_year, Some(2023));
        assert_eq!(ledger.last_year, Some(2024));
    }

    #[test]
    fn test_current_year_removal() {
        let config = ControllingConfig::default();
        let ledger = consolidate(&sources(), &config).unwrap();
        assert!(ledger.records.iter().all(|r| r.year == 2023));
        assert_eq!(ledger.last_year, Some(2023));
        // balances are derived before the newest year is dropped
        assert_eq!(balances(&ledger, PROJECT_B), vec![170.0]);
    }

    #[test]
    fn test_ended_projects_are_removed() {
        let mut sources = sources();
        sources.master.rows[1][2] = "beendet".to_string();
        let ledger = consolidate(&sources, &config()).unwrap();
        assert!(ledger.records.iter().all(|r| r.psp == PROJECT_A));

        let keep_ended = ControllingConfig {
            rm_beendet: false,
            ..config()
        };
        let ledger = consolidate(&sources, &keep_ended).unwrap();
        assert_eq!(ledger.records.len(), 4);
    }

    #[test]
    fn test_marker_mismatch_is_rejected() {
        let mut sources = sources();
        sources.obligo.marker = Some("Budget".to_string());
        let err = consolidate(&sources, &config()).unwrap_err();
        assert!(matches!(
            err,
            ControllingError::ContentMismatch {
                kind: SourceKind::Obligo,
                ..
            }
        ));

        let unchecked = ControllingConfig {
            check_obligo: false,
            ..config()
        };
        assert!(consolidate(&sources, &unchecked).is_ok());
    }

    #[test]
    fn test_obfuscated_run() {
        let config = ControllingConfig {
            obfuscated: true,
            ..config()
        };
        let mut rng = StdRng::seed_from_u64(11);
        let ledger = consolidate_with_rng(&sources(), &config, &mut rng).unwrap();
        assert_eq!(ledger.unit, obfuscate::MASKED_UNIT);
        assert_eq!(ledger.records.len(), 4);
        assert!(ledger.records.iter().all(|r| &r.psp[5..11] == "000000"));
        // a zero balance stays zero under relative noise
        assert_eq!(ledger.records[3].balance.value(), 0.0);
    }

    #[test]
    fn test_report_end_to_end() {
        let config = ControllingConfig {
            liste_pa_aufteilung: vec![68],
            liste_pa_keine_aufteilung: vec![70],
            ..config()
        };
        let ledger = consolidate(&sources(), &config).unwrap();
        let slices = ledger.slices().unwrap();
        let plan = ReportPlan::from_config(&slices, &config, &[PROJECT_B.to_string()]).unwrap();
        let report = ControllingReport::build(&ledger, &slices, &plan);

        // PA 68: no collective account, project A ends after the cutoff
        assert!(report.classifications[0].is_empty());
        assert!(report.classifications[1].is_empty());
        assert_eq!(report.classifications[2].final_balance(), Some(-50.0));
        assert_eq!(report.classifications[3].final_balance(), Some(0.0));
        assert_eq!(report.classifications[4].title, "Beta (123701234560002)");

        assert_eq!(report.summary.entries.len(), 2);
        assert_eq!(report.summary.total.balance, -50.0);
        assert_eq!(report.overview.len(), 2);

        let text = report.to_text();
        assert!(text.contains("Finanzübersicht 2023 - 2024 für die IKZ 123456"));
        assert!(text.contains("Zusammenfassung für IKZ 123456 (Stand 31.12.2024)"));
        assert!(text.contains("Projektart 68 | Einzelkonten (Projektende nach 01.07.24)"));
        assert!(text.contains("Datum und Unterschrift der Leitung der IKZ 123456"));
    }
}
