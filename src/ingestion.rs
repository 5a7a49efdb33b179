use crate::config::ControllingConfig;
use crate::error::{ControllingError, Result};
use crate::schema::{SourceKind, UnifiedRecord};
use crate::balance::ProjectOverview;
use csv::{ReaderBuilder, WriterBuilder};
use log::{debug, warn};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

/// A semicolon separated SAP export with its header lines removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    /// Column 1 of the very first line, which names the report type.
    pub marker: Option<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Skips `header_rows` physical lines, blank ones included, before parsing the rest.
    pub fn from_reader<R: Read>(reader: R, header_rows: usize) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        let mut marker = None;
        let mut line = Vec::new();

        for idx in 0..header_rows {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            if idx == 0 {
                marker = parse_fields(line.as_slice())?
                    .into_iter()
                    .next()
                    .and_then(|fields| fields.into_iter().nth(1));
            }
        }

        let mut rows = parse_fields(reader)?;
        if header_rows == 0 {
            marker = rows.first().and_then(|fields| fields.get(1).cloned());
        }
        rows.retain(|fields| fields.iter().any(|f| !f.trim().is_empty()));

        Ok(Self { marker, rows })
    }

    pub fn from_path(path: impl AsRef<Path>, header_rows: usize) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|_| ControllingError::MissingSourceFile {
            path: path.display().to_string(),
        })?;
        let table = Self::from_reader(file, header_rows)?;
        debug!("Read {} data rows from {}", table.rows.len(), path.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn parse_fields<R: Read>(reader: R) -> Result<Vec<Vec<String>>> {
    let mut csv_reader = ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in csv_reader.byte_records() {
        let record = record?;
        rows.push(
            record
                .iter()
                .map(|field| String::from_utf8_lossy(field).into_owned())
                .collect(),
        );
    }
    Ok(rows)
}

/// The four raw exports of one run.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    pub master: RawTable,
    pub budget: RawTable,
    pub obligo: RawTable,
    pub turnover: RawTable,
}

impl SourceSet {
    pub fn load(config: &ControllingConfig) -> Result<Self> {
        let read = |kind: SourceKind| {
            RawTable::from_path(config.source_path(kind), config.header_rows(kind))
        };

        Ok(Self {
            master: read(SourceKind::Master)?,
            budget: read(SourceKind::Budget)?,
            obligo: read(SourceKind::Obligo)?,
            turnover: read(SourceKind::Turnover)?,
        })
    }

    pub fn get(&self, kind: SourceKind) -> &RawTable {
        match kind {
            SourceKind::Master => &self.master,
            SourceKind::Budget => &self.budget,
            SourceKind::Obligo => &self.obligo,
            SourceKind::Turnover => &self.turnover,
        }
    }
}

/// Project identifiers listed in the optional detail file (one header line, id in
/// column 0). A missing file simply means no detail sections.
pub fn read_detail_projects(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!("No detail project list at {}", path.display());
        return Ok(Vec::new());
    }
    let table = RawTable::from_path(path, 1)?;
    Ok(detail_projects_from_table(&table))
}

pub fn detail_projects_from_table(table: &RawTable) -> Vec<String> {
    table
        .rows
        .iter()
        .filter_map(|row| row.first())
        .map(|psp| psp.trim().to_string())
        .filter(|psp| !psp.is_empty())
        .collect()
}

fn amount_cell(value: f64) -> String {
    value.to_string().replace('.', ",")
}

fn optional_cell(value: Option<f64>) -> String {
    value.map(amount_cell).unwrap_or_default()
}

/// Writes the consolidated records with decimal commas; undefined cells stay empty.
pub fn write_records_csv<W: Write>(writer: W, records: &[UnifiedRecord]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().delimiter(b';').from_writer(writer);

    csv_writer.write_record([
        "PSP",
        "PSPName",
        "PA",
        "Status",
        "Geldgeber",
        "Projektende",
        "Jahr",
        "Budgetrest aus Vorjahr",
        "Originalbudget",
        "Sonstige Zuweisungen",
        "Festlegungen",
        "End Kontostand Budget",
        "Einnahmen-Ist",
        "Einnahmen ILA",
        "Eigen- und Industrieanteile",
        "Ausgaben-Ist",
        "Kontostand Jahr",
        "End Kontostand DM",
        "Kontostand",
    ])?;

    for record in records {
        let plan = record.plan;
        let turnover = record.turnover;
        csv_writer.write_record([
            record.psp.clone(),
            record.name.clone(),
            record.project_type.clone(),
            record.status.clone(),
            record.funder.clone(),
            record.project_end.format("%Y-%m-%d").to_string(),
            record.year.to_string(),
            optional_cell(plan.map(|p| p.carryover)),
            optional_cell(plan.map(|p| p.original_budget)),
            optional_cell(plan.map(|p| p.other_allocations)),
            optional_cell(plan.map(|p| p.commitments)),
            optional_cell(record.end_balance_budget),
            optional_cell(turnover.map(|t| t.income_actual)),
            optional_cell(turnover.map(|t| t.income_ila)),
            optional_cell(turnover.map(|t| t.own_and_industry_shares)),
            optional_cell(turnover.map(|t| t.expenditure_actual)),
            optional_cell(turnover.map(|t| t.year_balance)),
            optional_cell(record.end_balance_turnover),
            amount_cell(record.balance.value()),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn write_overview_csv<W: Write>(writer: W, overview: &[ProjectOverview]) -> Result<()> {
    let mut csv_writer = WriterBuilder::new().delimiter(b';').from_writer(writer);

    csv_writer.write_record([
        "PSP",
        "PSPName",
        "PA",
        "Status",
        "Projektende",
        "Geldgeber",
        "End Kontostand Budget",
        "End Kontostand DM",
        "Kontostand",
    ])?;

    for project in overview {
        csv_writer.write_record([
            project.psp.clone(),
            project.name.clone(),
            project.project_type.clone(),
            project.status.clone(),
            project.project_end.format("%Y-%m-%d").to_string(),
            project.funder.clone(),
            optional_cell(project.end_balance_budget),
            optional_cell(project.end_balance_turnover),
            amount_cell(project.balance),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

/// Creates `path` and hands it to `write`. A locked file (e.g. still open in a
/// spreadsheet) is reported as a warning rather than aborting the run.
pub fn write_file<F>(path: impl AsRef<Path>, write: F) -> Result<()>
where
    F: FnOnce(File) -> Result<()>,
{
    let path = path.as_ref();
    match File::create(path) {
        Ok(file) => write(file),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            warn!(
                "Cannot write {}; please check that it is not still open",
                path.display()
            );
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUDGET: &str = "\
Bericht;Budget;;
Stand;01.01.2025;;
;;;
PSP;Name;Jahr;
123681234560001;Alpha;2023;1.000,00
123681234560001;Alpha;2024;500,50
;;;
";

    #[test]
    fn test_reads_marker_and_skips_header() {
        let table = RawTable::from_reader(BUDGET.as_bytes(), 4).unwrap();
        assert_eq!(table.marker.as_deref(), Some("Budget"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][0], "123681234560001");
        assert_eq!(table.rows[1][3], "500,50");
    }

    #[test]
    fn test_blank_header_line_counts_as_header() {
        let text = "Bericht;Budget\n\
                    Stand;31.12.2024\n\
                    \n\
                    PSP;Name;Jahr\n\
                    123681234560001;Alpha;2023\n\
                    123681234560001;Alpha;2024\n";
        let table = RawTable::from_reader(text.as_bytes(), 4).unwrap();
        assert_eq!(table.marker.as_deref(), Some("Budget"));
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0][2], "2023");
        assert_eq!(table.rows[1][2], "2024");
    }

    #[test]
    fn test_marker_without_header_rows() {
        let text = "x;Kontostand\n\n123681234560001;Alpha;2023\n";
        let table = RawTable::from_reader(text.as_bytes(), 0).unwrap();
        assert_eq!(table.marker.as_deref(), Some("Kontostand"));
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_detail_projects() {
        let text = "PSP\n123681234560001\n\n123701234560002;comment\n";
        let table = RawTable::from_reader(text.as_bytes(), 1).unwrap();
        assert_eq!(
            detail_projects_from_table(&table),
            vec!["123681234560001", "123701234560002"]
        );
    }

    #[test]
    fn test_missing_source_file() {
        let result = RawTable::from_path("no/such/export.csv", 4);
        assert!(matches!(
            result,
            Err(ControllingError::MissingSourceFile { .. })
        ));
    }

    #[test]
    fn test_missing_detail_file_is_empty() {
        assert!(read_detail_projects("no/such/plot.csv").unwrap().is_empty());
    }
}
