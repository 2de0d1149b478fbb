//! Conversion-report scraping.
//!
//! The conversion tool drops a frame-based HTML report tree under
//! `Reports/html/` in its output directory. The index page points at a
//! per-lane summary page; that page carries second-level headings, each
//! followed by a table with `id="ReportTable"`. Only those two shapes are
//! consumed, so the extraction is a handful of anchored regexes rather than
//! a DOM walk. Anything missing or malformed scrapes to an empty list.

use regex::Regex;
use std::path::Path;

/// Header row plus data rows of one report table, as trimmed text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// One second-level heading and the table that follows it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportSection {
    pub title: String,
    pub table: Option<ReportTable>,
}

/// Load and scrape the conversion report under `fastq_dir`.
///
/// Follows the frame reference in `Reports/html/index.html` to the
/// per-lane-barcode page and scrapes it.
pub fn load_conversion_report(fastq_dir: &Path) -> Vec<ReportSection> {
    let html_dir = fastq_dir.join("Reports").join("html");
    let Ok(index) = std::fs::read_to_string(html_dir.join("index.html")) else {
        return Vec::new();
    };
    let Some(frame_src) = frame_target(&index) else {
        return Vec::new();
    };
    let Ok(page) = std::fs::read_to_string(html_dir.join(frame_src)) else {
        return Vec::new();
    };
    parse_report(&page)
}

/// Resolve the frame reference of the index page to the per-lane-barcode
/// page, mirroring the report tree's own `lane.html` naming.
fn frame_target(index: &str) -> Option<String> {
    let frame = Regex::new(r#"(?is)<frame[^>]*\bsrc\s*=\s*"([^"]+)""#).ok()?;
    // The index nests two frames; the barcode summary replaces the last one.
    let src = frame.captures_iter(index).last()?.get(1)?.as_str();
    Some(src.replace("lane.html", "laneBarcode.html"))
}

/// Scrape headings and report tables out of one summary page.
///
/// Headings pair with tables in document order; a heading with no matching
/// table keeps `table: None` and is skipped by the LaTeX builders.
pub fn parse_report(html: &str) -> Vec<ReportSection> {
    try_parse(html).unwrap_or_default()
}

fn try_parse(html: &str) -> Option<Vec<ReportSection>> {
    let h2 = Regex::new(r"(?is)<h2[^>]*>(.*?)</h2>").ok()?;
    let table = Regex::new(r#"(?is)<table[^>]*\bid\s*=\s*"ReportTable"[^>]*>(.*?)</table>"#).ok()?;
    let row = Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").ok()?;
    let th = Regex::new(r"(?is)<th[^>]*>(.*?)</th>").ok()?;
    let td = Regex::new(r"(?is)<td[^>]*>(.*?)</td>").ok()?;

    let titles: Vec<String> = h2
        .captures_iter(html)
        .filter_map(|c| c.get(1))
        .map(|m| clean_cell(m.as_str()))
        .collect();

    let mut tables = Vec::new();
    for captures in table.captures_iter(html) {
        let body = captures.get(1)?.as_str();
        let mut parsed = ReportTable::default();
        for row_captures in row.captures_iter(body) {
            let row_body = row_captures.get(1)?.as_str();
            let heads: Vec<String> = th
                .captures_iter(row_body)
                .filter_map(|c| c.get(1))
                .map(|m| clean_cell(m.as_str()))
                .collect();
            if !heads.is_empty() && parsed.header.is_empty() {
                parsed.header = heads;
                continue;
            }
            let cells: Vec<String> = td
                .captures_iter(row_body)
                .filter_map(|c| c.get(1))
                .map(|m| clean_cell(m.as_str()))
                .collect();
            if !cells.is_empty() {
                parsed.rows.push(cells);
            }
        }
        tables.push(parsed);
    }

    let mut tables = tables.into_iter();
    Some(
        titles
            .into_iter()
            .map(|title| ReportSection {
                title,
                table: tables.next(),
            })
            .collect(),
    )
}

/// Strip nested markup, decode the handful of entities the report uses, and
/// trim surrounding whitespace.
fn clean_cell(raw: &str) -> String {
    let mut text = String::with_capacity(raw.len());
    let mut in_tag = false;
    for c in raw.chars() {
        match c {
            '<' => in_tag = true,
            // A tag boundary separates words (line breaks inside header cells).
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            c if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
