//! Run-metadata sidecar parsing.
//!
//! The sidecar is a loose CSV with bracketed section headers:
//!
//! ```text
//! [HEADER]
//! Experiment Name,Run 7
//! [READS]
//! 151
//! [DATA]
//! Sample_ID,Sample_Name
//! S1,control
//! ```
//!
//! Sections keep document order; rows keep file order. A missing or
//! unreadable file parses to an empty section list.

use std::path::Path;

/// One bracketed section and its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSection {
    /// Uppercased section name including brackets, e.g. `[HEADER]`.
    pub name: String,
    pub rows: Vec<Vec<String>>,
}

/// Parse the sidecar at `path`.
pub fn parse_samplesheet(path: &Path) -> Vec<SheetSection> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    parse(&content)
}

/// Parse sidecar content.
pub fn parse(content: &str) -> Vec<SheetSection> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut sections: Vec<SheetSection> = Vec::new();
    for record in reader.records() {
        let Ok(record) = record else {
            return Vec::new();
        };
        let fields: Vec<String> = record.iter().map(|f| f.to_string()).collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        if fields[0].starts_with('[') {
            sections.push(SheetSection {
                name: fields[0].to_uppercase(),
                rows: Vec::new(),
            });
        } else if let Some(section) = sections.last_mut() {
            // Rows before the first header have no home and are dropped.
            section.rows.push(fields);
        }
    }
    sections
}
