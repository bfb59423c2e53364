//! SMART section parsing and drive health evaluation
//!
//! Each drive is a table headed by a `td.dt` cell with the drive name.
//! Attribute rows carry the id in the third cell, the description in the
//! fourth and the raw value in the second to last.
//!
//! Two attribute layouts exist:
//! - ATA (hard disks, SATA SSDs): hex ids such as 05, C5, C6
//! - NVMe health log: decimal ids such as 3, 5, 48, 128, 144
//!
//! Thresholds:
//! - pending (C5) or uncorrectable (C6) sectors > 0 => critical
//! - reallocated (05) > 0 => warning, above the configured count => critical
//! - NVMe available spare below warn/critical percentages

use super::index::{ancestor, cell_text, has_class, row_cells, ReportIndex};
use super::labels::SMART_SECTION;
use crate::config::{MarkerConfig, SmartThresholds};
use crate::facts::SmartStatus;
use scraper::ElementRef;

/// Bytes per NVMe data unit (1000 * 512)
pub const NVME_DATA_UNIT_BYTES: u64 = 512_000;

/// One attribute row after normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartAttribute {
    /// Upper-case, leading zeros removed ("05" -> "5", "c5" -> "C5")
    pub id: String,
    pub description: String,
    pub raw_value: u64,
}

/// Attributes of one physical drive, in table order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveReading {
    pub drive_name: String,
    pub is_ssd: bool,
    pub attributes: Vec<SmartAttribute>,
}

impl DriveReading {
    pub fn raw(&self, id: &str) -> Option<u64> {
        self.attributes.iter().find(|a| a.id == id).map(|a| a.raw_value)
    }

    /// NVMe health logs use three-digit ids that ATA tables cannot have
    pub fn layout(&self) -> AttributeLayout {
        let nvme_ids = self.attributes.iter().any(|a| a.id == "128" || a.id == "144");
        if self.is_ssd && (nvme_ids || self.drive_name.to_lowercase().contains("nvme")) {
            AttributeLayout::Nvme
        } else {
            AttributeLayout::Ata
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeLayout {
    Ata,
    Nvme,
}

/// ATA attributes the evaluation looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtaMetric {
    ReadErrorRate,
    ReallocatedSectors,
    PowerOnHours,
    PowerCycles,
    Temperature,
    PendingSectors,
    UncorrectableSectors,
}

impl AtaMetric {
    pub fn id(self) -> &'static str {
        match self {
            AtaMetric::ReadErrorRate => "1",
            AtaMetric::ReallocatedSectors => "5",
            AtaMetric::PowerOnHours => "9",
            AtaMetric::PowerCycles => "C",
            AtaMetric::Temperature => "C2",
            AtaMetric::PendingSectors => "C5",
            AtaMetric::UncorrectableSectors => "C6",
        }
    }
}

/// NVMe health log fields the evaluation looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NvmeMetric {
    AvailableSpare,
    PercentageUsed,
    DataUnitsWritten,
    PowerOnHours,
    UnsafeShutdowns,
}

impl NvmeMetric {
    pub fn id(self) -> &'static str {
        match self {
            NvmeMetric::AvailableSpare => "3",
            NvmeMetric::PercentageUsed => "5",
            NvmeMetric::DataUnitsWritten => "48",
            NvmeMetric::PowerOnHours => "128",
            NvmeMetric::UnsafeShutdowns => "144",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DriveCondition {
    Healthy,
    Warning,
    Critical,
}

/// Verdict for one drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveAssessment {
    pub condition: DriveCondition,
    pub problems: Vec<String>,
    /// Key metrics, reported whatever the condition
    pub display: String,
}

/// Aggregate over all drives of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmartSummary {
    pub status: SmartStatus,
    pub problems: Vec<String>,
    pub display: Vec<String>,
}

impl SmartSummary {
    pub fn not_found() -> Self {
        Self {
            status: SmartStatus::NotFound,
            problems: Vec::new(),
            display: Vec::new(),
        }
    }
}

/// "05" -> "5", "c5" -> "C5", "0" stays "0"
pub fn normalize_attribute_id(id: &str) -> String {
    let upper = id.trim().to_uppercase();
    let trimmed = upper.trim_start_matches('0');
    if trimmed.is_empty() && !upper.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Decimal or hex raw value to an integer.
///
/// A value containing 'x' is hex (after dropping a "0x" prefix), all
/// digits is decimal, all hex digits is hex. Anything else is rejected.
pub fn normalize_raw_value(raw: &str) -> Option<u64> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return None;
    }

    let lower = compact.to_lowercase();
    if lower.contains('x') {
        let hex = lower.trim_start_matches("0x");
        return u64::from_str_radix(hex, 16).ok();
    }
    if compact.chars().all(|c| c.is_ascii_digit()) {
        return compact.parse().ok();
    }
    if compact.chars().all(|c| c.is_ascii_hexdigit()) {
        return u64::from_str_radix(&compact, 16).ok();
    }
    None
}

fn looks_like_attribute_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= 3 && id.chars().all(|c| c.is_ascii_hexdigit())
}

fn matches_any(text: &str, markers: &[String]) -> bool {
    let lower = text.to_lowercase();
    markers
        .iter()
        .any(|m| !m.is_empty() && lower.contains(&m.to_lowercase()))
}

/// Drives listed in the SMART section; `None` when the section is absent
pub fn read_drives(index: &ReportIndex<'_>, markers: &MarkerConfig) -> Option<Vec<DriveReading>> {
    index.section(SMART_SECTION)?;

    let mut drives = Vec::new();
    for table in index.section_tables(SMART_SECTION) {
        let Some(header) = own_descendants(table)
            .into_iter()
            .find(|e| e.value().name() == "td" && has_class(*e, "dt"))
        else {
            continue;
        };

        let drive_name = cell_text(header)
            .trim_matches(|c: char| c == '[' || c == ']' || c.is_whitespace())
            .to_string();
        if drive_name.is_empty() || matches_any(&drive_name, &markers.noise_drives) {
            continue;
        }

        let attributes = own_descendants(table)
            .into_iter()
            .filter(|e| e.value().name() == "tr")
            .filter_map(parse_attribute_row)
            .collect();

        drives.push(DriveReading {
            is_ssd: matches_any(&drive_name, &markers.ssd_markers),
            drive_name,
            attributes,
        });
    }
    Some(drives)
}

/// Descendants of `table` that do not belong to a nested table
fn own_descendants<'a>(table: ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let table_id = table.id();
    table
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|e| ancestor(*e, "table").map(|t| t.id()) == Some(table_id))
        .collect()
}

fn parse_attribute_row(row: ElementRef<'_>) -> Option<SmartAttribute> {
    let cells = row_cells(row);
    if cells.len() <= 3 {
        return None;
    }

    let id = normalize_attribute_id(&cell_text(cells[2]));
    if !looks_like_attribute_id(&id) {
        return None;
    }
    let raw_value = normalize_raw_value(&cell_text(cells[cells.len() - 2]))?;

    Some(SmartAttribute {
        id,
        description: cell_text(cells[3]),
        raw_value,
    })
}

/// Evaluate one drive against the thresholds
pub fn assess_drive(drive: &DriveReading, thresholds: &SmartThresholds) -> DriveAssessment {
    match drive.layout() {
        AttributeLayout::Ata => assess_ata(drive, thresholds),
        AttributeLayout::Nvme => assess_nvme(drive, thresholds),
    }
}

fn assess_ata(drive: &DriveReading, t: &SmartThresholds) -> DriveAssessment {
    let name = &drive.drive_name;
    let mut condition = DriveCondition::Healthy;
    let mut problems = Vec::new();
    let mut flag = |level: DriveCondition, message: String, problems: &mut Vec<String>| {
        condition = condition.max(level);
        problems.push(format!("{}: {}", name, message));
    };

    let reallocated = drive.raw(AtaMetric::ReallocatedSectors.id());
    let pending = drive.raw(AtaMetric::PendingSectors.id());
    let uncorrectable = drive.raw(AtaMetric::UncorrectableSectors.id());
    let power_on = drive.raw(AtaMetric::PowerOnHours.id());
    let temperature = drive.raw(AtaMetric::Temperature.id()).map(current_temperature);

    if let Some(n) = reallocated.filter(|n| *n > 0) {
        let level = if n > t.hdd_reallocated_critical {
            DriveCondition::Critical
        } else {
            DriveCondition::Warning
        };
        flag(level, format!("Reallocated sectors (05) = {}", n), &mut problems);
    }
    if let Some(n) = pending.filter(|n| *n > 0) {
        flag(DriveCondition::Critical, format!("Pending sectors (C5) = {}", n), &mut problems);
    }
    if let Some(n) = uncorrectable.filter(|n| *n > 0) {
        flag(DriveCondition::Critical, format!("Uncorrectable sectors (C6) = {}", n), &mut problems);
    }
    if let Some(c) = temperature.filter(|c| *c > t.temp_warning_celsius) {
        flag(DriveCondition::Warning, format!("High temperature ({} °C)", c), &mut problems);
    }
    if let Some(h) = power_on.filter(|h| *h > t.power_on_warning_hours) {
        flag(DriveCondition::Warning, format!("Power-on hours {} exceed {}", h, t.power_on_warning_hours), &mut problems);
    }
    if let Some(n) = drive.raw(AtaMetric::PowerCycles.id()).filter(|n| *n > t.power_cycle_warning_count) {
        flag(DriveCondition::Warning, format!("Power cycles {} exceed {}", n, t.power_cycle_warning_count), &mut problems);
    }
    if let Some(n) = drive.raw(AtaMetric::ReadErrorRate.id()).filter(|n| *n > t.read_error_warning_rate) {
        flag(DriveCondition::Warning, format!("Read error rate {} exceeds {}", n, t.read_error_warning_rate), &mut problems);
    }

    let mut metrics = Vec::new();
    if let Some(h) = power_on {
        metrics.push(format!("power-on {} h", h));
    }
    if let Some(c) = temperature {
        metrics.push(format!("{} °C", c));
    }
    if let Some(n) = reallocated {
        metrics.push(format!("reallocated {}", n));
    }
    if let Some(n) = pending {
        metrics.push(format!("pending {}", n));
    }
    if let Some(n) = uncorrectable {
        metrics.push(format!("uncorrectable {}", n));
    }

    DriveAssessment {
        condition,
        problems,
        display: display_line(name, &metrics),
    }
}

fn assess_nvme(drive: &DriveReading, t: &SmartThresholds) -> DriveAssessment {
    let name = &drive.drive_name;
    let mut condition = DriveCondition::Healthy;
    let mut problems = Vec::new();

    let spare = drive.raw(NvmeMetric::AvailableSpare.id());
    let used = drive.raw(NvmeMetric::PercentageUsed.id());
    let written = drive.raw(NvmeMetric::DataUnitsWritten.id());
    let power_on = drive.raw(NvmeMetric::PowerOnHours.id());
    let unsafe_shutdowns = drive.raw(NvmeMetric::UnsafeShutdowns.id());

    if let Some(pct) = spare {
        if pct < t.ssd_spare_critical_pct {
            condition = DriveCondition::Critical;
            problems.push(format!("{}: Available spare {}% (below {}%)", name, pct, t.ssd_spare_critical_pct));
        } else if pct < t.ssd_spare_warning_pct {
            condition = DriveCondition::Warning;
            problems.push(format!("{}: Available spare {}% (below {}%)", name, pct, t.ssd_spare_warning_pct));
        }
    }
    if let Some(pct) = used.filter(|p| *p >= t.ssd_endurance_warning_pct) {
        condition = condition.max(DriveCondition::Warning);
        problems.push(format!("{}: Endurance used {}%", name, pct));
    }

    let mut metrics = Vec::new();
    if let Some(pct) = spare {
        metrics.push(format!("spare {}%", pct));
    }
    if let Some(pct) = used {
        metrics.push(format!("used {}%", pct));
    }
    if let Some(units) = written {
        metrics.push(format!("written {}", format_terabytes(units.saturating_mul(NVME_DATA_UNIT_BYTES))));
    }
    if let Some(h) = power_on {
        metrics.push(format!("power-on {} h", h));
    }
    if let Some(n) = unsafe_shutdowns {
        metrics.push(format!("unsafe shutdowns {}", n));
    }

    DriveAssessment {
        condition,
        problems,
        display: display_line(name, &metrics),
    }
}

/// ATA temperature raw values pack min/max into the upper bytes
fn current_temperature(raw: u64) -> u64 {
    if raw > 255 {
        raw & 0xFF
    } else {
        raw
    }
}

fn format_terabytes(bytes: u64) -> String {
    format!("{:.2} TB", bytes as f64 / 1e12)
}

fn display_line(name: &str, metrics: &[String]) -> String {
    if metrics.is_empty() {
        format!("{}: no key attributes", name)
    } else {
        format!("{}: {}", name, metrics.join(", "))
    }
}

/// BAD if any drive is critical, OK if any warns, GOOD otherwise
pub fn summarize(drives: &[DriveReading], thresholds: &SmartThresholds) -> SmartSummary {
    let mut worst = DriveCondition::Healthy;
    let mut problems = Vec::new();
    let mut display = Vec::new();

    for drive in drives {
        let assessment = assess_drive(drive, thresholds);
        worst = worst.max(assessment.condition);
        problems.extend(assessment.problems);
        display.push(assessment.display);
    }

    let status = match worst {
        DriveCondition::Critical => SmartStatus::Bad,
        DriveCondition::Warning => SmartStatus::Ok,
        DriveCondition::Healthy => SmartStatus::Good,
    };

    SmartSummary {
        status,
        problems,
        display,
    }
}
