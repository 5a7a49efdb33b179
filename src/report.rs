use crate::balance::ProjectOverview;
use crate::classify::Classification;
use crate::summary::SummaryTable;
use crate::utils::format_euro;

/// Placeholder for values that are undefined after the joins.
pub const NOT_AVAILABLE: &str = "k.A.";

/// Plain-text controlling report, built up section by section.
#[derive(Debug, Clone, Default)]
pub struct TextReport {
    output: String,
}

impl TextReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, text: &str) {
        self.output.push_str(text);
    }

    /// Writes `title` framed by dashes of the same length.
    pub fn append_title(&mut self, title: &str) {
        let rule = "-".repeat(title.chars().count());
        self.output
            .push_str(&format!("{}\n{}\n{}\n\n", rule, title, rule));
    }

    /// Year table of one slice followed by mean and trend. Empty slices write nothing.
    pub fn append_classification(&mut self, classification: &Classification) {
        if classification.is_empty() {
            return;
        }

        self.append_title(&classification.title);
        let rows: Vec<Vec<String>> = classification
            .years
            .iter()
            .map(|y| {
                vec![
                    y.year.to_string(),
                    format_euro(y.carryover),
                    format_euro(y.original_budget),
                    format_euro(y.other_allocations),
                    format_euro(y.commitments),
                    format_euro(y.end_balance_budget),
                    format_euro(y.year_balance),
                    format_euro(y.end_balance_turnover),
                    format_euro(y.balance),
                ]
            })
            .collect();
        self.output.push_str(&render_table(
            &[
                "Jahr",
                "Übertrag",
                "Budget",
                "Sonstige Zuweisungen",
                "Obligo",
                "Kontostand Budget",
                "Jahressaldo",
                "Kontostand Konto",
                "Kontostand",
            ],
            &rows,
        ));

        if let Some(trend) = classification.trend() {
            self.output
                .push_str(&format!("\nMittelwert: {}\n", format_euro(trend.mean)));
            if let Some(slope) = trend.slope_per_year {
                self.output
                    .push_str(&format!("Trend: {} pro Jahr\n", format_euro(slope)));
            }
        }
        self.output.push_str("\n\n");
    }

    pub fn append_summary(&mut self, title: &str, summary: &SummaryTable) {
        self.output.push('\n');
        self.append_title(title);
        let rows: Vec<Vec<String>> = summary
            .rows()
            .map(|entry| {
                vec![
                    entry.label.clone(),
                    entry.remark.clone(),
                    format_euro(entry.balance),
                ]
            })
            .collect();
        self.output
            .push_str(&render_table(&["Projektart", "Bemerkung", "Kontostand"], &rows));
        self.output.push_str("\n\n");
    }

    pub fn append_overview(&mut self, title: &str, overview: &[ProjectOverview]) {
        self.output.push('\n');
        self.append_title(title);
        let rows: Vec<Vec<String>> = overview
            .iter()
            .map(|p| {
                vec![
                    p.psp.clone(),
                    p.name.clone(),
                    p.status.clone(),
                    p.project_end.format("%d.%m.%Y").to_string(),
                    p.funder.clone(),
                    format_optional(p.end_balance_budget),
                    format_optional(p.end_balance_turnover),
                    format_euro(p.balance),
                ]
            })
            .collect();
        self.output.push_str(&render_table(
            &[
                "PSP",
                "Name",
                "Status",
                "Projektende",
                "Geldgeber",
                "Kontostand Budget",
                "Kontostand Konto",
                "Kontostand",
            ],
            &rows,
        ));
        self.output.push_str("\n\n");
    }

    pub fn signature_lines(&mut self, unit: &str) {
        self.append(
            "Ich habe diesen Bericht gesehen und zur Kenntnis genommen. Bei eventuellen \
             Unklarheiten habe ich mich vor Unterschrift mit dem Dekanat abgestimmt.\n\n\n\n",
        );
        self.append("______________________________________________________\n");
        self.append(&format!(
            "Datum und Unterschrift der Leitung der IKZ {}\n",
            unit
        ));
    }

    pub fn as_str(&self) -> &str {
        &self.output
    }

    pub fn finish(self) -> String {
        self.output
    }
}

fn format_optional(value: Option<f64>) -> String {
    value
        .map(format_euro)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// Right-aligned columns, one space between them.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(idx) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let format_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, width)| format!("{:>width$}", cell, width = *width))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut lines = vec![format_line(headers.to_vec())];
    for row in rows {
        lines.push(format_line(row.iter().map(String::as_str).collect()));
    }
    lines.join("\n")
}
