use crate::error::{ControllingError, Result};
use crate::projection::ProjectedSources;
use crate::schema::SourceKind;
use crate::utils::unit_of;
use std::collections::BTreeSet;

/// Fails with `ContentMismatch` unless `actual` is the label SAP writes for `kind`.
pub fn check_content_marker(kind: SourceKind, actual: Option<&str>) -> Result<()> {
    let expected = kind.expected_marker();
    let actual = actual.unwrap_or("").trim();
    if actual == expected {
        Ok(())
    } else {
        Err(ControllingError::ContentMismatch {
            kind,
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

/// The single IKZ shared by all project identifiers of one export.
pub fn source_unit<'a, I>(kind: SourceKind, psps: I) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let units: BTreeSet<String> = psps.into_iter().map(unit_of).collect();

    match units.len() {
        0 => Err(ControllingError::EmptySource { kind }),
        1 => Ok(units.into_iter().next().unwrap_or_default()),
        _ => Err(ControllingError::AmbiguousUnit {
            kind,
            units: units.into_iter().collect(),
        }),
    }
}

/// Checks that all four exports belong to the same IKZ and returns it.
pub fn resolve_unit(sources: &ProjectedSources) -> Result<String> {
    let units = vec![
        (
            SourceKind::Master,
            source_unit(
                SourceKind::Master,
                sources.projects.iter().map(|p| p.psp.as_str()),
            )?,
        ),
        (
            SourceKind::Budget,
            source_unit(
                SourceKind::Budget,
                sources.budget.iter().map(|b| b.psp.as_str()),
            )?,
        ),
        (
            SourceKind::Obligo,
            source_unit(
                SourceKind::Obligo,
                sources.obligo.iter().map(|o| o.psp.as_str()),
            )?,
        ),
        (
            SourceKind::Turnover,
            source_unit(
                SourceKind::Turnover,
                sources.turnover.iter().map(|t| t.psp.as_str()),
            )?,
        ),
    ];

    let reference = units[0].1.clone();
    if units.iter().all(|(_, unit)| *unit == reference) {
        Ok(reference)
    } else {
        Err(ControllingError::UnitMismatch { units })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BudgetEntry, ObligoEntry, ProjectRecord, TurnoverEntry};

    fn sources(master_psp: &str, turnover_psp: &str) -> ProjectedSources {
        ProjectedSources {
            projects: vec![ProjectRecord {
                psp: master_psp.to_string(),
                name: "Alpha".to_string(),
                status: "freigegeben".to_string(),
                project_end: "31.12.2025".to_string(),
                funder: "42".to_string(),
            }],
            budget: vec![BudgetEntry {
                psp: master_psp.to_string(),
                name: "Alpha".to_string(),
                year: 2023,
                carryover: 0.0,
                original_budget: 0.0,
                other_allocations: 0.0,
            }],
            obligo: vec![ObligoEntry {
                psp: master_psp.to_string(),
                name: "Alpha".to_string(),
                year: 2023,
                commitments: 0.0,
            }],
            turnover: vec![TurnoverEntry {
                psp: turnover_psp.to_string(),
                name: "Alpha".to_string(),
                year: 2023,
                income_ila: 0.0,
                income_actual: 0.0,
                own_and_industry_shares: 0.0,
                expenditure_actual: 0.0,
                year_balance: 0.0,
            }],
        }
    }

    #[test]
    fn test_content_marker() {
        assert!(check_content_marker(SourceKind::Budget, Some("Budget")).is_ok());
        match check_content_marker(SourceKind::Obligo, Some("Budget")) {
            Err(ControllingError::ContentMismatch {
                expected, actual, ..
            }) => {
                assert_eq!(expected, "Obligos");
                assert_eq!(actual, "Budget");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(check_content_marker(SourceKind::Master, None).is_err());
    }

    #[test]
    fn test_consistent_unit() {
        let unit = resolve_unit(&sources("123681234560001", "123701234560099")).unwrap();
        assert_eq!(unit, "123456");
    }

    #[test]
    fn test_unit_mismatch_across_sources() {
        let result = resolve_unit(&sources("123681234560001", "123689999990001"));
        assert!(matches!(result, Err(ControllingError::UnitMismatch { .. })));
    }

    #[test]
    fn test_ambiguous_unit_within_source() {
        let result = source_unit(
            SourceKind::Budget,
            ["123681234560001", "123681111110001"].into_iter(),
        );
        match result {
            Err(ControllingError::AmbiguousUnit { units, .. }) => {
                assert_eq!(units, vec!["111111".to_string(), "123456".to_string()]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_source() {
        let result = source_unit(SourceKind::Obligo, std::iter::empty());
        assert!(matches!(result, Err(ControllingError::EmptySource { .. })));
    }
}
