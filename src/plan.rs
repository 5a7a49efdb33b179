use crate::classify::{classify, project_types, Classification, ProjectTypePattern, Selector};
use crate::config::ControllingConfig;
use crate::error::Result;
use crate::filter::{collective_accounts, individual_accounts, ReportingCutoff};
use crate::schema::UnifiedRecord;
use crate::summary::SummaryAccumulator;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Slice {
    All,
    /// Collective accounts ("Sammelkonten").
    Collective,
    /// Individual accounts of projects that ended by the cutoff.
    Expired,
    /// Individual accounts of projects running past the cutoff.
    Ongoing,
}

/// The record subsets a plan refers to.
#[derive(Debug, Clone, Default)]
pub struct Slices {
    pub all: Vec<UnifiedRecord>,
    pub collective: Vec<UnifiedRecord>,
    pub expired: Vec<UnifiedRecord>,
    pub ongoing: Vec<UnifiedRecord>,
    pub cutoff: Option<ReportingCutoff>,
}

impl Slices {
    pub fn new(records: &[UnifiedRecord]) -> Result<Self> {
        let cutoff = ReportingCutoff::from_records(records);
        let collective = collective_accounts(records)?;
        let individual = individual_accounts(records)?;
        let (expired, ongoing) = match &cutoff {
            Some(c) => (c.expired_projects(&individual), c.ongoing_projects(&individual)),
            None => (Vec::new(), Vec::new()),
        };

        debug!(
            "Slices: {} collective, {} expired, {} ongoing of {} records",
            collective.len(),
            expired.len(),
            ongoing.len(),
            records.len()
        );

        Ok(Self {
            all: records.to_vec(),
            collective,
            expired,
            ongoing,
            cutoff,
        })
    }

    pub fn get(&self, slice: Slice) -> &[UnifiedRecord] {
        match slice {
            Slice::All => &self.all,
            Slice::Collective => &self.collective,
            Slice::Expired => &self.expired,
            Slice::Ongoing => &self.ongoing,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PlanItem {
    pub slice: Slice,
    pub selector: Selector,
    pub title: String,
    pub include_in_summary: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ReportPlan {
    pub items: Vec<PlanItem>,
}

impl ReportPlan {
    /// The configured layout: split project types get collective, expired and
    /// ongoing slices, unsplit types one slice over everything, and each listed
    /// detail project a slice of its own that stays out of the summary.
    pub fn from_config(
        slices: &Slices,
        config: &ControllingConfig,
        detail_projects: &[String],
    ) -> Result<Self> {
        let mut items = Vec::new();

        match slices.cutoff {
            Some(cutoff) => {
                let before = cutoff.cutoff.format("%d.%m.%y");
                let after = cutoff.ongoing_from.format("%d.%m.%y");
                for code in &config.liste_pa_aufteilung {
                    let pattern = ProjectTypePattern::from_code(*code)?;
                    let label = format!("Projektart {}", pattern.code());
                    items.push(PlanItem {
                        slice: Slice::Collective,
                        selector: Selector::ProjectType(pattern.clone()),
                        title: format!("{} | Sammelkonten (alle)", label),
                        include_in_summary: true,
                    });
                    items.push(PlanItem {
                        slice: Slice::Expired,
                        selector: Selector::ProjectType(pattern.clone()),
                        title: format!("{} | Einzelkonten (Projektende vor {})", label, before),
                        include_in_summary: true,
                    });
                    items.push(PlanItem {
                        slice: Slice::Ongoing,
                        selector: Selector::ProjectType(pattern),
                        title: format!("{} | Einzelkonten (Projektende nach {})", label, after),
                        include_in_summary: true,
                    });
                }
            }
            None => warn!("No records left to split; skipping the split project types"),
        }

        for code in &config.liste_pa_keine_aufteilung {
            let pattern = ProjectTypePattern::from_code(*code)?;
            items.push(PlanItem {
                slice: Slice::All,
                title: format!("Projektart {} | Alle Konten", pattern.code()),
                selector: Selector::ProjectType(pattern),
                include_in_summary: true,
            });
        }

        for psp in detail_projects {
            match slices.all.iter().find(|r| r.psp == *psp) {
                Some(record) => items.push(PlanItem {
                    slice: Slice::All,
                    selector: Selector::Project(psp.clone()),
                    title: format!("{} ({})", record.name, record.psp),
                    include_in_summary: false,
                }),
                None => warn!(
                    "Detail project {} ignored because it is not part of the SAP export",
                    psp
                ),
            }
        }

        Ok(Self { items })
    }

    /// One slice per project type present in the data.
    pub fn per_project_type(slices: &Slices) -> Result<Self> {
        let items = project_types(&slices.all)
            .into_iter()
            .map(|code| {
                Ok(PlanItem {
                    slice: Slice::All,
                    title: format!("Projektart {}", code),
                    selector: Selector::ProjectType(ProjectTypePattern::new(&code)?),
                    include_in_summary: true,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { items })
    }

    /// Classifies every item in order and feeds the results into `summary`.
    pub fn run(&self, slices: &Slices, summary: &mut SummaryAccumulator) -> Vec<Classification> {
        self.items
            .iter()
            .map(|item| {
                let classification = classify(
                    slices.get(item.slice),
                    &item.selector,
                    &item.title,
                    item.include_in_summary,
                );
                summary.record(&classification);
                classification
            })
            .collect()
    }
}
