//! Memory module extraction
//!
//! Tier A reads "DIMMn:" rows straight from the overview table. Tier B walks
//! the memory detail blocks ("[ Memory Devices / ... ]" or "[ SPD / ... ]")
//! when the overview has none. Slot totals come from the motherboard
//! description, then the detail header count, then a form-factor guess.

use super::index::{ancestor, cell_text, has_class, label_cells, ReportIndex};
use super::labels;
use crate::config::MarkerConfig;
use crate::facts::SlotCount;
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;

static DIMM_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(labels::DIMM_LABEL_PATTERN).expect("valid DIMM label pattern"));
static MEMORY_DEVICE_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(labels::MEMORY_DEVICE_HEADER_PATTERN).expect("valid memory header pattern")
});
static SPD_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(labels::SPD_HEADER_PATTERN).expect("valid SPD header pattern"));
static SLOT_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(labels::SLOT_COUNT_PATTERN).expect("valid slot count pattern"));
static TIMING_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(labels::TIMING_SUFFIX_PATTERN).expect("valid timing pattern"));

/// Where the slot total came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    Motherboard,
    DetailHeaders,
    /// Form-factor guess, advisory only
    Heuristic,
    Unresolved,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryReading {
    pub modules: Vec<String>,
    pub slots_used: u32,
    pub slots_free: SlotCount,
    pub slot_source: SlotSource,
    /// Total assumed by the form-factor guess, for the diagnostic message
    pub guessed_total: Option<u32>,
}

/// Inputs for slot resolution that come from elsewhere in the report
pub struct SlotHints<'h> {
    /// Full motherboard cell text, links included
    pub motherboard: &'h str,
    /// Text searched for form-factor keywords
    pub form_factor_text: &'h str,
}

pub fn read_memory(
    index: &ReportIndex<'_>,
    summary: ElementRef<'_>,
    markers: &MarkerConfig,
    hints: &SlotHints<'_>,
) -> MemoryReading {
    let mut modules = summary_modules(index, summary, markers);

    let headers = detail_headers(index);
    if modules.is_empty() {
        modules = detail_modules(index, &headers, markers);
    }

    let found = modules.len() as u32;
    let mut guessed_total = None;
    let (total, slot_source) = if let Some(n) = slots_from_motherboard(hints.motherboard) {
        (Some(n), SlotSource::Motherboard)
    } else if !headers.is_empty() {
        (Some(headers.len() as u32), SlotSource::DetailHeaders)
    } else if found > 0 {
        let guess = guess_slot_total(hints.form_factor_text, &modules, markers);
        guessed_total = Some(guess);
        (Some(guess.max(found)), SlotSource::Heuristic)
    } else {
        (None, SlotSource::Unresolved)
    };

    let slots_free = match total {
        Some(total) => SlotCount::Known(total.saturating_sub(found)),
        None => SlotCount::Unknown,
    };

    MemoryReading {
        modules,
        slots_used: found,
        slots_free,
        slot_source,
        guessed_total,
    }
}

/// Tier A: "DIMMn: model" label cells in the overview table
fn summary_modules(index: &ReportIndex<'_>, summary: ElementRef<'_>, markers: &MarkerConfig) -> Vec<String> {
    let mut modules = Vec::new();
    for cell in label_cells(&[summary], "DIMM") {
        let label = cell_text(cell);
        let Some(found) = DIMM_LABEL.find(&label) else {
            continue;
        };
        let Some(value_cell) = index.value_cell_for(cell) else {
            continue;
        };

        let value = TIMING_SUFFIX.replace(&cell_text(value_cell), "").trim().to_string();
        let model = label[found.end()..].trim().to_string();
        if value.is_empty() || is_empty_slot(&value, markers) || is_empty_slot(&model, markers) {
            continue;
        }

        modules.push(if model.is_empty() {
            value
        } else {
            format!("{} {}", model, value)
        });
    }
    modules
}

/// Detail headers, preferring DMI device lists over SPD blocks
fn detail_headers<'a>(index: &ReportIndex<'a>) -> Vec<ElementRef<'a>> {
    let header_cells: Vec<ElementRef<'a>> = index
        .elements()
        .iter()
        .copied()
        .filter(|e| e.value().name() == "td" && has_class(*e, "dt"))
        .collect();

    let devices: Vec<ElementRef<'a>> = header_cells
        .iter()
        .copied()
        .filter(|c| MEMORY_DEVICE_HEADER.is_match(&cell_text(*c)))
        .collect();
    if !devices.is_empty() {
        return devices;
    }

    header_cells
        .into_iter()
        .filter(|c| SPD_HEADER.is_match(&cell_text(*c)))
        .collect()
}

/// Tier B: one descriptor per detail block that reports a size
fn detail_modules(index: &ReportIndex<'_>, headers: &[ElementRef<'_>], markers: &MarkerConfig) -> Vec<String> {
    let mut modules = Vec::new();
    for header in headers {
        let mut scope = block_rows(*header);
        let mut size = index.find_value_by_aliases_exact_first(&scope, labels::MODULE_SIZE);
        if size.is_none() {
            // Some exports put the block in its own table after the header
            if let Some(table) = index.next_after(*header, "table") {
                scope = vec![table];
                size = index.find_value_by_aliases_exact_first(&scope, labels::MODULE_SIZE);
            }
        }

        let Some(size) = size else {
            continue;
        };
        let size = TIMING_SUFFIX.replace(&size, "").trim().to_string();
        if size.is_empty() || is_empty_slot(&size, markers) {
            continue;
        }

        let mut parts = vec![size];
        for aliases in [labels::MEMORY_TYPE, labels::MEMORY_SPEED] {
            if let Some(extra) = index.find_value_by_aliases_exact_first(&scope, aliases) {
                let extra = TIMING_SUFFIX.replace(&extra, "").trim().to_string();
                if !extra.is_empty() && !is_empty_slot(&extra, markers) {
                    parts.push(extra);
                }
            }
        }
        modules.push(parts.join(" "));
    }
    modules
}

/// Rows after the header's row, up to the next header row
fn block_rows<'a>(header: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let Some(row) = ancestor(header, "tr") else {
        return Vec::new();
    };
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "tr")
        .take_while(|tr| !is_header_row(*tr))
        .collect()
}

fn is_header_row(row: ElementRef<'_>) -> bool {
    row.descendants()
        .filter_map(ElementRef::wrap)
        .any(|e| e.value().name() == "td" && has_class(e, "dt"))
}

fn is_empty_slot(text: &str, markers: &MarkerConfig) -> bool {
    let lower = text.to_lowercase();
    markers
        .empty_slot_markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}

/// "<N> <type> DIMM" in the motherboard description
pub fn slots_from_motherboard(text: &str) -> Option<u32> {
    SLOT_COUNT
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

/// Two slots for compact machines, four otherwise
fn guess_slot_total(form_factor_text: &str, modules: &[String], markers: &MarkerConfig) -> u32 {
    let haystack = format!("{} {}", form_factor_text, modules.join(" ")).to_lowercase();
    let compact = markers
        .compact_form_factor
        .iter()
        .any(|k| !k.is_empty() && haystack.contains(&k.to_lowercase()));
    if compact {
        2
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    fn read(doc: &str, motherboard: &str) -> MemoryReading {
        let html = Html::parse_document(doc);
        let index = ReportIndex::build(&html);
        let summary = index.section_table("summary").unwrap();
        let hints = SlotHints {
            motherboard,
            form_factor_text: motherboard,
        };
        read_memory(&index, summary, &MarkerConfig::default(), &hints)
    }

    #[test]
    fn test_slots_from_motherboard() {
        assert_eq!(slots_from_motherboard("Asus PRIME B450M-A (4 DDR4 DIMM, Audio)"), Some(4));
        assert_eq!(slots_from_motherboard("Lenovo 3132 (2 DDR3 SO-DIMM)"), Some(2));
        assert_eq!(slots_from_motherboard("Gigabyte H81M-S2V (1 PCI-E x1, 2 DDR3 DIMM, LAN)"), Some(2));
        assert_eq!(slots_from_motherboard("Unknown board"), None);
    }

    #[test]
    fn test_tier_a_strips_timings_and_skips_empty() {
        let doc = r#"<a name="summary"></a><table>
            <tr><td>DIMM1: Kingston 99U5471-020.A00LF</td><td>4 GB DDR3-1333 DDR3 SDRAM  (9-9-9-24 @ 666 MHz)</td></tr>
            <tr><td>DIMM3: </td><td>Пусто</td></tr>
            <tr><td>DIMM2: Samsung M378B5173QH0</td><td>4 GB DDR3-1600 DDR3 SDRAM (11-11-11-28 @ 800 MHz)</td></tr>
        </table>"#;
        let reading = read(doc, "MSI B75MA-P45 (4 DDR3 DIMM, Audio)");
        assert_eq!(
            reading.modules,
            vec![
                "Kingston 99U5471-020.A00LF 4 GB DDR3-1333 DDR3 SDRAM".to_string(),
                "Samsung M378B5173QH0 4 GB DDR3-1600 DDR3 SDRAM".to_string(),
            ]
        );
        assert_eq!(reading.slots_used, 2);
        assert_eq!(reading.slots_free, SlotCount::Known(2));
        assert_eq!(reading.slot_source, SlotSource::Motherboard);
    }

    #[test]
    fn test_tier_b_reads_detail_blocks() {
        let doc = r#"<a name="summary"></a><table><tr><td>Computer Name</td><td>WS</td></tr></table>
            <a name="dmi"></a><table>
            <tr><td class="dt">[ Memory Devices / DIMM0 ]</td></tr>
            <tr><td>Size</td><td>8 GB</td></tr>
            <tr><td>Memory Type</td><td>DDR4</td></tr>
            <tr><td>Speed</td><td>2666 MHz</td></tr>
            <tr><td class="dt">[ Memory Devices / DIMM1 ]</td></tr>
            <tr><td>Size</td><td>No Module Installed</td></tr>
            </table>"#;
        let reading = read(doc, "Custom board");
        assert_eq!(reading.modules, vec!["8 GB DDR4 2666 MHz".to_string()]);
        assert_eq!(reading.slot_source, SlotSource::DetailHeaders);
        assert_eq!(reading.slots_free, SlotCount::Known(1));
    }

    #[test]
    fn test_tier_b_prefers_rated_speed_over_configured_clock() {
        let doc = r#"<a name="summary"></a><table><tr><td>Computer Name</td><td>WS</td></tr></table>
            <a name="dmi"></a><table>
            <tr><td class="dt">[ Memory Devices / ChannelA-DIMM0 ]</td></tr>
            <tr><td>Size</td><td>8 GB</td></tr>
            <tr><td>Memory Type</td><td>DDR4</td></tr>
            <tr><td>Speed</td><td>2666 MHz</td></tr>
            <tr><td>Configured Clock Speed</td><td>2400 MHz</td></tr>
            </table>"#;
        let reading = read(doc, "Custom board");
        assert_eq!(reading.modules, vec!["8 GB DDR4 2666 MHz".to_string()]);
    }

    #[test]
    fn test_heuristic_used_when_nothing_else_resolves() {
        let doc = r#"<a name="summary"></a><table>
            <tr><td>DIMM1: Hynix HMT451S6</td><td>4 GB DDR3L SO-DIMM</td></tr>
        </table>"#;
        let reading = read(doc, "Lenovo ThinkPad");
        assert_eq!(reading.slot_source, SlotSource::Heuristic);
        assert_eq!(reading.guessed_total, Some(2));
        assert_eq!(reading.slots_free, SlotCount::Known(1));
    }

    #[test]
    fn test_no_modules_no_slots() {
        let doc = r#"<a name="summary"></a><table><tr><td>Computer Name</td><td>WS</td></tr></table>"#;
        let reading = read(doc, "Custom board");
        assert!(reading.modules.is_empty());
        assert_eq!(reading.slots_free, SlotCount::Unknown);
        assert_eq!(reading.slot_source, SlotSource::Unresolved);
    }
}
