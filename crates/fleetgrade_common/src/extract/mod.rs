//! Report extractor
//!
//! Turns one AIDA64 HTML export into [`RawFacts`]. The overview section is
//! mandatory; everything else degrades to sentinel values.

pub mod index;
pub mod labels;
pub mod memory;
pub mod smart;

use crate::config::RuleConfig;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::error::{FleetError, Result};
use crate::facts::{RawFacts, NOT_FOUND};
use encoding_rs::WINDOWS_1251;
use index::ReportIndex;
use memory::{SlotHints, SlotSource};
use scraper::{ElementRef, Html};
use smart::SmartSummary;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Decode report bytes as windows-1251, replacing invalid sequences.
/// A UTF-8 or UTF-16 byte order mark overrides the default encoding.
pub fn decode_report(bytes: &[u8]) -> String {
    let (text, _encoding, _had_errors) = WINDOWS_1251.decode(bytes);
    text.into_owned()
}

/// Extracts facts from report HTML
pub struct ReportExtractor {
    config: Arc<RuleConfig>,
    sink: Arc<dyn DiagnosticSink>,
}

impl ReportExtractor {
    pub fn new(config: Arc<RuleConfig>, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self { config, sink }
    }

    /// Read, decode and extract one report file
    pub fn extract_file(&self, path: &Path) -> Result<RawFacts> {
        let bytes = fs::read(path).map_err(|e| FleetError::io(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        self.extract(&decode_report(&bytes), &file_name)
    }

    /// Extract facts from decoded HTML
    pub fn extract(&self, html: &str, file_name: &str) -> Result<RawFacts> {
        let document = Html::parse_document(html);
        let index = ReportIndex::build(&document);

        let Some(summary) = index.section_table(labels::SUMMARY_SECTION) else {
            return Err(FleetError::MissingMandatorySection {
                file_name: file_name.to_string(),
            });
        };
        let overview = [summary];
        let markers = &self.config.markers;

        let mut facts = RawFacts::new(file_name);
        let text = |aliases: &[&str]| or_not_found(index.find_value_by_aliases(&overview, aliases));

        facts.machine_name = text(labels::COMPUTER_NAME);
        facts.os_version = text(labels::OPERATING_SYSTEM);
        facts.cpu = text(labels::CPU_TYPE);
        facts.motherboard = text(labels::MOTHERBOARD);
        facts.gpu = text(labels::VIDEO_ADAPTER);
        facts.monitor = text(labels::MONITOR);
        facts.total_ram_text = text(labels::SYSTEM_MEMORY);
        facts.local_ip = text(labels::PRIMARY_IP);
        facts.mac_address = text(labels::PRIMARY_MAC);

        facts.cpu_socket = section_value(&index, labels::MOTHERBOARD_SECTION, summary, labels::CPU_SOCKETS);
        facts.bios_date_text = section_value(&index, labels::BIOS_SECTION, summary, labels::BIOS_DATE);

        facts.printers = index
            .find_all_values(&overview, labels::PRINTER)
            .into_iter()
            .filter(|p| !contains_any(p, &markers.virtual_printers))
            .collect();

        facts.disks = index
            .find_all_values(&overview, labels::DISK_DRIVE)
            .into_iter()
            .filter(|d| !contains_any(d, &markers.noise_drives))
            .collect();

        let motherboard_cell = index
            .find_cell_text_by_aliases(&overview, labels::MOTHERBOARD)
            .unwrap_or_default();
        let form_factor_text = format!("{} {} {}", motherboard_cell, facts.machine_name, facts.cpu);
        let hints = SlotHints {
            motherboard: &motherboard_cell,
            form_factor_text: &form_factor_text,
        };
        let memory = memory::read_memory(&index, summary, markers, &hints);
        if memory.slot_source == SlotSource::Heuristic {
            self.sink.warn(
                DiagnosticKind::HeuristicFallback,
                file_name,
                format!(
                    "slot count not in report, assuming {} slots from form factor",
                    memory.guessed_total.unwrap_or_default()
                ),
            );
        }
        facts.ram_modules = memory.modules;
        facts.ram_slots_used = memory.slots_used;
        facts.ram_slots_free = memory.slots_free;

        let smart = match smart::read_drives(&index, markers) {
            Some(drives) => smart::summarize(&drives, &self.config.smart),
            None => SmartSummary::not_found(),
        };
        facts.smart_status = smart.status;
        facts.smart_problem_details = smart.problems;
        facts.smart_display_details = smart.display;

        Ok(facts)
    }
}

/// Look in a dedicated section first, then in the overview
fn section_value(index: &ReportIndex<'_>, section: &str, summary: ElementRef<'_>, aliases: &[&str]) -> String {
    or_not_found(
        index
            .section_table(section)
            .and_then(|table| index.find_value_by_aliases(&[table], aliases))
            .or_else(|| index.find_value_by_aliases(&[summary], aliases)),
    )
}

fn or_not_found(value: Option<String>) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_FOUND.to_string(),
    }
}

fn contains_any(text: &str, markers: &[String]) -> bool {
    let lower = text.to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}
