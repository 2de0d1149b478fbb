//! Report template rendering.
//!
//! The template is plain LaTeX with `$NAME$` substitution tokens. Rendering
//! is one pass over a variable map; unknown text, including stray `$`, is
//! left exactly as written so the template author keeps full control of the
//! document.
//!
//! The default template ships embedded in the binary; a configured
//! `template_file` overrides it.

use rust_embed::RustEmbed;
use std::collections::BTreeMap;

/// Embedded template files from the repository `templates/` directory.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/../../templates"]
struct TemplateAssets;

/// Name of the default report template inside the embedded assets.
pub const DEFAULT_TEMPLATE: &str = "report.tex";

/// The embedded default template, or `None` if the build lost it.
pub fn default_template() -> Option<String> {
    TemplateAssets::get(DEFAULT_TEMPLATE)
        .map(|file| String::from_utf8_lossy(file.data.as_ref()).into_owned())
}

/// Substitution variables for one rendered report.
///
/// Keys are bare names; rendering matches them as `$NAME$`. Letter-indexed
/// table tokens (`TABLEAHEADER` …) are added with [`TemplateVars::set_table`].
#[derive(Debug, Default, Clone)]
pub struct TemplateVars {
    vars: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one token.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Set the header/contents token pair for the table at `index`
    /// (0 = `$TABLEAHEADER$`/`$TABLEACONTENTS$`, 1 = B, …).
    pub fn set_table(&mut self, index: usize, title: &str, body: &str) -> &mut Self {
        let letter = (b'A' + (index as u8 % 26)) as char;
        self.set(format!("TABLE{letter}HEADER"), title);
        self.set(format!("TABLE{letter}CONTENTS"), body);
        self
    }

    /// Render `template`, replacing every `$NAME$` token with its value.
    pub fn render(&self, template: &str) -> String {
        let mut rendered = template.to_string();
        for (name, value) in &self.vars {
            rendered = rendered.replace(&format!("${name}$"), value);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_all_tokens() {
        let mut vars = TemplateVars::new();
        vars.set("LANE", "1").set("READ", "R2");
        assert_eq!(
            vars.render("lane $LANE$ read $READ$ of lane $LANE$"),
            "lane 1 read R2 of lane 1"
        );
    }

    #[test]
    fn unknown_text_is_untouched() {
        let vars = TemplateVars::new();
        assert_eq!(vars.render("costs $5, token $X$ stays"), "costs $5, token $X$ stays");
    }

    #[test]
    fn table_tokens_are_letter_indexed() {
        let mut vars = TemplateVars::new();
        vars.set_table(0, "First", "a & b");
        vars.set_table(1, "Second", "c & d");
        let out = vars.render("$TABLEAHEADER$|$TABLEACONTENTS$|$TABLEBHEADER$|$TABLEBCONTENTS$");
        assert_eq!(out, "First|a & b|Second|c & d");
    }

    #[test]
    fn embedded_default_template_is_present() {
        let template = default_template().unwrap();
        assert!(template.contains("$PATH$"));
        assert!(template.contains("$SEQUENCER$"));
        assert!(template.contains("$TABLECOLUMNS$"));
        assert!(template.contains("$LANE$"));
    }
}
