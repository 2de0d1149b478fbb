//! LaTeX table bodies for the report template.
//!
//! Pure string builders: the run-details table from the metadata sidecar and
//! one table per scraped report section. Output is pasted into the template
//! verbatim, so every cell goes through [`escape`] first.

use crate::report::html::ReportSection;
use crate::report::samplesheet::SheetSection;

/// Report sections excluded from the PDF.
const EXCLUDED_SECTIONS: &[&str] = &["Top Unknown Barcodes"];

/// Escape cell text for LaTeX.
///
/// Backslashes in source cells are flattened to underscores first (they only
/// occur in Windows-style paths), then the LaTeX specials are escaped.
pub fn escape(cell: &str) -> String {
    cell.replace('\\', "_")
        .replace('_', "\\_")
        .replace('%', "\\%")
        .replace('&', "\\&")
        .replace('#', "\\#")
}

/// Column spec and body of the run-details table.
///
/// The column count follows the widest `[DATA]` row, falling back to the
/// widest row anywhere when the sidecar has no `[DATA]` section. Returns
/// `None` for an empty sidecar; the caller then renders empty tokens.
pub fn run_details(sections: &[SheetSection]) -> Option<(String, String)> {
    let columns = sections
        .iter()
        .find(|s| s.name == "[DATA]")
        .map(|s| s.rows.iter().map(Vec::len).max().unwrap_or(0))
        .filter(|&n| n > 0)
        .or_else(|| {
            sections
                .iter()
                .flat_map(|s| s.rows.iter().map(Vec::len))
                .max()
        })?;

    let mut spec = String::from("{");
    for _ in 0..columns {
        spec.push_str("|l");
    }
    spec.push_str("|}");

    let mut body = String::new();
    for section in sections {
        let name = section.name.trim_matches(['[', ']']);
        body.push_str(&format!(
            "\\multicolumn{{{columns}}}{{|c|}}{{{name}}} \\\\ \\hline\n"
        ));
        for row in &section.rows {
            match section.name.as_str() {
                // Key/value sections: key cell plus one wide value cell.
                "[HEADER]" | "[SETTINGS]" => {
                    let key = escape(row.first().map(String::as_str).unwrap_or(""));
                    let value = escape(row.get(1).map(String::as_str).unwrap_or(""));
                    body.push_str(&format!(
                        "{key} & \\multicolumn{{{}}}{{l|}}{{{value}}} \\\\ \\hline\n",
                        columns - 1
                    ));
                }
                // Single-value rows spanning the full width.
                "[READS]" => {
                    let value = escape(row.first().map(String::as_str).unwrap_or(""));
                    body.push_str(&format!(
                        "\\multicolumn{{{columns}}}{{|l|}}{{{value}}} \\\\ \\hline\n"
                    ));
                }
                _ => {
                    let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
                    body.push_str(&cells.join(" & "));
                    body.push_str(" \\\\ \\hline\n");
                }
            }
        }
    }

    Some((spec, body))
}

/// One `(title, body)` per scraped report section, in document order.
///
/// Sections without a table and the excluded sections are skipped. Header
/// cells containing a space break onto two lines so wide metric names do not
/// blow up the column width.
pub fn section_tables(sections: &[ReportSection]) -> Vec<(String, String)> {
    sections
        .iter()
        .filter(|s| !EXCLUDED_SECTIONS.contains(&s.title.as_str()))
        .filter_map(|section| {
            let table = section.table.as_ref()?;
            let columns = table.header.len().max(
                table.rows.iter().map(Vec::len).max().unwrap_or(0),
            );
            if columns == 0 {
                return None;
            }

            // Self-contained environment: section tables have their own
            // widths, independent of the run-details column spec.
            let mut spec = String::from("{");
            for _ in 0..columns {
                spec.push_str("|l");
            }
            spec.push_str("|}");

            let mut body = format!("\\begin{{tabular}}{spec}\n\\hline\n");
            body.push_str(&format!(
                "\\multicolumn{{{columns}}}{{|c|}}{{{title}}} \\\\ \\hline\n",
                title = escape(&section.title)
            ));

            let heads: Vec<String> = table.header.iter().map(|h| header_cell(h)).collect();
            if !heads.is_empty() {
                body.push_str(&heads.join(" & "));
                body.push_str(" \\\\ \\hline\n");
            }
            for row in &table.rows {
                let cells: Vec<String> = row.iter().map(|c| escape(c)).collect();
                body.push_str(&cells.join(" & "));
                body.push_str(" \\\\ \\hline\n");
            }
            body.push_str("\\end{tabular}\n");

            Some((section.title.clone(), body))
        })
        .collect()
}

/// Break a header cell at its last space into a two-line tabular cell.
fn header_cell(text: &str) -> String {
    match text.rsplit_once(' ') {
        Some((first, last)) => format!(
            "\\begin{{tabular}}[c]{{@{{}}l@{{}}}}{}\\\\ {}\\end{{tabular}}",
            escape(first),
            escape(last)
        ),
        None => escape(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::html::ReportTable;

    fn sheet(name: &str, rows: &[&[&str]]) -> SheetSection {
        SheetSection {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn escape_handles_latex_specials() {
        assert_eq!(escape("a_b"), "a\\_b");
        assert_eq!(escape("95%"), "95\\%");
        assert_eq!(escape("C:\\data"), "C:\\_data");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn column_spec_follows_widest_data_row() {
        let sections = vec![
            sheet("[HEADER]", &[&["Experiment Name", "Run_7"]]),
            sheet("[DATA]", &[&["Sample_ID", "Name", "index"], &["S1", "c", "ATT"]]),
        ];
        let (spec, body) = run_details(&sections).unwrap();
        assert_eq!(spec, "{|l|l|l|}");
        assert!(body.contains("\\multicolumn{3}{|c|}{HEADER} \\\\ \\hline"));
        assert!(body.contains("Experiment Name & \\multicolumn{2}{l|}{Run\\_7} \\\\ \\hline"));
        assert!(body.contains("S1 & c & ATT \\\\ \\hline"));
    }

    #[test]
    fn reads_rows_span_the_full_width() {
        let sections = vec![
            sheet("[READS]", &[&["151"]]),
            sheet("[DATA]", &[&["a", "b"]]),
        ];
        let (_, body) = run_details(&sections).unwrap();
        assert!(body.contains("\\multicolumn{2}{|l|}{151} \\\\ \\hline"));
    }

    #[test]
    fn empty_sidecar_builds_nothing() {
        assert!(run_details(&[]).is_none());
    }

    #[test]
    fn section_tables_skip_excluded_and_tableless() {
        let sections = vec![
            ReportSection {
                title: "Lane Summary".to_string(),
                table: Some(ReportTable {
                    header: vec!["Lane".to_string(), "Yield (Gb)".to_string()],
                    rows: vec![vec!["1".to_string(), "12.3".to_string()]],
                }),
            },
            ReportSection {
                title: "Top Unknown Barcodes".to_string(),
                table: Some(ReportTable::default()),
            },
            ReportSection {
                title: "Orphan".to_string(),
                table: None,
            },
        ];
        let tables = section_tables(&sections);
        assert_eq!(tables.len(), 1);
        let (title, body) = &tables[0];
        assert_eq!(title, "Lane Summary");
        assert!(body.starts_with("\\begin{tabular}{|l|l|}"));
        assert!(body.trim_end().ends_with("\\end{tabular}"));
        assert!(body.contains("\\multicolumn{2}{|c|}{Lane Summary}"));
        // Spaced header cells get the two-line treatment, bare ones do not.
        assert!(body.contains("Lane & \\begin{tabular}[c]{@{}l@{}}Yield\\\\ (Gb)\\end{tabular}"));
        assert!(body.contains("1 & 12.3 \\\\ \\hline"));
    }
}
