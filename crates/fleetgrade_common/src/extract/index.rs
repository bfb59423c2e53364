//! Section index - one pass over the document
//!
//! Reports mark each section with `<a name="...">` followed by its table.
//! The index maps each anchor name to the first table after it and keeps
//! every element in document order, so "next cell after X" and "tables
//! between two anchors" are slice scans instead of repeated tree walks.

use scraper::{ElementRef, Html};
use std::collections::HashMap;

/// A named section: its anchor and the first table that follows it
#[derive(Debug, Clone, Copy)]
pub struct Section<'a> {
    pub anchor: ElementRef<'a>,
    pub table: Option<ElementRef<'a>>,
    /// Position of the anchor in document order
    pub position: usize,
}

/// Document-order view of a parsed report
pub struct ReportIndex<'a> {
    elements: Vec<ElementRef<'a>>,
    sections: HashMap<String, Section<'a>>,
    anchor_positions: Vec<usize>,
}

impl<'a> ReportIndex<'a> {
    pub fn build(document: &'a Html) -> Self {
        let elements: Vec<ElementRef<'a>> = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .collect();

        let mut sections: HashMap<String, Section<'a>> = HashMap::new();
        let mut anchor_positions = Vec::new();
        let mut pending: Vec<String> = Vec::new();

        for (position, el) in elements.iter().enumerate() {
            match el.value().name() {
                "a" => {
                    if let Some(name) = el.value().attr("name") {
                        let key = name.trim().to_lowercase();
                        anchor_positions.push(position);
                        // First anchor with a given name wins
                        if !sections.contains_key(&key) {
                            sections.insert(
                                key.clone(),
                                Section {
                                    anchor: *el,
                                    table: None,
                                    position,
                                },
                            );
                            pending.push(key);
                        }
                    }
                }
                "table" => {
                    for key in pending.drain(..) {
                        if let Some(section) = sections.get_mut(&key) {
                            section.table = Some(*el);
                        }
                    }
                }
                _ => {}
            }
        }

        Self {
            elements,
            sections,
            anchor_positions,
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section<'a>> {
        self.sections.get(&name.to_lowercase())
    }

    /// Table of a named section, if the anchor exists and a table follows it
    pub fn section_table(&self, name: &str) -> Option<ElementRef<'a>> {
        self.section(name).and_then(|s| s.table)
    }

    /// All elements in document order
    pub fn elements(&self) -> &[ElementRef<'a>] {
        &self.elements
    }

    /// All `td` cells in document order
    pub fn cells(&self) -> impl Iterator<Item = ElementRef<'a>> + '_ {
        self.elements.iter().copied().filter(|e| e.value().name() == "td")
    }

    pub fn position_of(&self, el: ElementRef<'a>) -> Option<usize> {
        let id = el.id();
        self.elements.iter().position(|e| e.id() == id)
    }

    /// First element named `tag` after `el` in document order
    pub fn next_after(&self, el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
        let start = self.position_of(el)? + 1;
        self.elements[start..]
            .iter()
            .copied()
            .find(|e| e.value().name() == tag)
    }

    /// Tables between a section anchor and the next named anchor
    pub fn section_tables(&self, name: &str) -> Vec<ElementRef<'a>> {
        let Some(section) = self.section(name) else {
            return Vec::new();
        };
        let end = self
            .anchor_positions
            .iter()
            .copied()
            .find(|p| *p > section.position)
            .unwrap_or(self.elements.len());

        self.elements[section.position + 1..end]
            .iter()
            .copied()
            .filter(|e| e.value().name() == "table")
            .collect()
    }

    /// Value cell for a label cell: next sibling `td`, else next `td` in the document
    pub fn value_cell_for(&self, label: ElementRef<'a>) -> Option<ElementRef<'a>> {
        label
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "td")
            .or_else(|| self.next_after(label, "td"))
    }

    /// Label lookup inside `scope`.
    ///
    /// Considers leaf cells containing `label`, takes the last one, and
    /// returns the text of its value cell (link text preferred). Returns
    /// `None` on any miss.
    pub fn find_value_by_label(&self, scope: &[ElementRef<'a>], label: &str) -> Option<String> {
        let label_cell = label_cells(scope, label).pop()?;
        let value = self.value_cell_for(label_cell)?;
        Some(display_text(value))
    }

    /// Like [`ReportIndex::find_value_by_label`] but the whole cell text, links included
    pub fn find_cell_text_by_label(&self, scope: &[ElementRef<'a>], label: &str) -> Option<String> {
        let label_cell = label_cells(scope, label).pop()?;
        let value = self.value_cell_for(label_cell)?;
        Some(cell_text(value))
    }

    /// First alias that resolves to a non-empty value
    pub fn find_value_by_aliases(&self, scope: &[ElementRef<'a>], aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| self.find_value_by_label(scope, alias))
            .find(|v| !v.is_empty())
    }

    pub fn find_cell_text_by_aliases(&self, scope: &[ElementRef<'a>], aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| self.find_cell_text_by_label(scope, alias))
            .find(|v| !v.is_empty())
    }

    /// Whole-label matches across all aliases first, then substring matches.
    ///
    /// Detail blocks hold labels that contain one another ("Speed" and
    /// "Configured Clock Speed"), so a substring hit alone is not enough.
    pub fn find_value_by_aliases_exact_first(&self, scope: &[ElementRef<'a>], aliases: &[&str]) -> Option<String> {
        aliases
            .iter()
            .filter_map(|alias| {
                let label_cell = label_cells(scope, alias)
                    .into_iter()
                    .rev()
                    .find(|cell| is_whole_label(*cell, alias))?;
                self.value_cell_for(label_cell).map(display_text)
            })
            .find(|v| !v.is_empty())
            .or_else(|| self.find_value_by_aliases(scope, aliases))
    }

    /// Values of every leaf cell matching one of `aliases`, in document order
    pub fn find_all_values(&self, scope: &[ElementRef<'a>], aliases: &[&str]) -> Vec<String> {
        for alias in aliases {
            let values: Vec<String> = label_cells(scope, alias)
                .into_iter()
                .filter_map(|cell| self.value_cell_for(cell))
                .map(display_text)
                .filter(|v| !v.is_empty())
                .collect();
            if !values.is_empty() {
                return values;
            }
        }
        Vec::new()
    }
}

/// Leaf `td` cells under `scope` whose text contains `label`, in document order
pub fn label_cells<'a>(scope: &[ElementRef<'a>], label: &str) -> Vec<ElementRef<'a>> {
    let mut out = Vec::new();
    for root in scope {
        for node in root.descendants() {
            let Some(el) = ElementRef::wrap(node) else {
                continue;
            };
            if el.value().name() == "td" && is_leaf_cell(el) && cell_text(el).contains(label) {
                out.push(el);
            }
        }
    }
    out
}

/// Cell text equals `label`, ignoring a trailing colon
fn is_whole_label(cell: ElementRef<'_>, label: &str) -> bool {
    cell_text(cell).trim_end_matches(':').trim() == label
}

/// A cell that does not itself contain another cell
pub fn is_leaf_cell(el: ElementRef<'_>) -> bool {
    !el.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "td")
}

/// Element text with whitespace collapsed
pub fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cell text, preferring the display text of an embedded link
pub fn display_text(el: ElementRef<'_>) -> String {
    let link = el
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "a")
        .map(cell_text)
        .filter(|t| !t.is_empty());
    link.unwrap_or_else(|| cell_text(el))
}

/// True when the element carries `class` (ASCII case-insensitive)
pub fn has_class(el: ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c.eq_ignore_ascii_case(class))
}

/// Closest ancestor element named `tag`
pub fn ancestor<'a>(el: ElementRef<'a>, tag: &str) -> Option<ElementRef<'a>> {
    el.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == tag)
}

/// Direct `td` children of a row
pub fn row_cells<'a>(row: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "td" || e.value().name() == "th")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<html><body>
        <a name="summary"></a>
        <table>
          <tr><td>Computer Name</td><td>WS-01</td></tr>
          <tr><td>Video Adapter</td><td><a href="x">GeForce GT 710</a> (2 GB)</td></tr>
          <tr><td>Tail</td></tr>
        </table>
        <table><tr><td>Orphan</td></tr></table>
        <a name="smart"></a>
        <table><tr><td>S1</td></tr></table>
        <table><tr><td>S2</td></tr></table>
        <a name="next"></a>
        <table><tr><td>N</td></tr></table>
    </body></html>"#;

    #[test]
    fn test_section_maps_anchor_to_next_table() {
        let html = Html::parse_document(DOC);
        let index = ReportIndex::build(&html);
        let table = index.section_table("summary").unwrap();
        assert!(cell_text(table).contains("WS-01"));
        assert!(index.section_table("SMART").is_some());
        assert!(index.section_table("bios").is_none());
    }

    #[test]
    fn test_section_tables_stop_at_next_anchor() {
        let html = Html::parse_document(DOC);
        let index = ReportIndex::build(&html);
        let tables = index.section_tables("smart");
        let texts: Vec<String> = tables.into_iter().map(cell_text).collect();
        assert_eq!(texts, vec!["S1", "S2"]);
    }

    #[test]
    fn test_link_text_preferred() {
        let html = Html::parse_document(DOC);
        let index = ReportIndex::build(&html);
        let table = index.section_table("summary").unwrap();
        assert_eq!(
            index.find_value_by_label(&[table], "Video Adapter").as_deref(),
            Some("GeForce GT 710")
        );
        assert_eq!(
            index.find_cell_text_by_label(&[table], "Video Adapter").as_deref(),
            Some("GeForce GT 710 (2 GB)")
        );
    }

    #[test]
    fn test_falls_back_to_next_cell_in_document() {
        let html = Html::parse_document(DOC);
        let index = ReportIndex::build(&html);
        let table = index.section_table("summary").unwrap();
        assert_eq!(index.find_value_by_label(&[table], "Tail").as_deref(), Some("Orphan"));
    }

    #[test]
    fn test_miss_returns_none() {
        let html = Html::parse_document(DOC);
        let index = ReportIndex::build(&html);
        let table = index.section_table("summary").unwrap();
        assert_eq!(index.find_value_by_label(&[table], "Motherboard"), None);
    }

    #[test]
    fn test_container_cells_are_not_candidates() {
        let doc = r#"<table><tr>
            <td><table><tr><td>Size</td><td>wrong</td></tr></table></td>
            <td>outer value</td>
        </tr><tr><td>Size</td><td>8 GB</td></tr></table>"#;
        let html = Html::parse_document(doc);
        let index = ReportIndex::build(&html);
        let root = index.elements()[0];
        let cells = label_cells(&[root], "Size");
        assert_eq!(cells.len(), 2);
        assert_eq!(index.find_value_by_label(&[root], "Size").as_deref(), Some("8 GB"));
    }
}
