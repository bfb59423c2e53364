//! Rule table and the generic engine that evaluates it
//!
//! A rule is data: which fact it reads, how it compares, the tier it
//! belongs to and the message it produces. The built-in table is derived
//! from the configured thresholds; `[[rules]]` entries from the config file
//! replace built-ins with the same id or extend the table.

use super::units::age_in_years;
use crate::config::RuleConfig;
use crate::facts::{is_found, RawFacts, SlotCount};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const RULE_OBSOLETE_SOCKET: &str = "obsolete-socket";
pub const RULE_RAM_CRITICAL: &str = "ram-critical";
pub const RULE_EOL_OS: &str = "eol-os";
pub const RULE_RAM_UPGRADE: &str = "ram-upgrade";
pub const RULE_NO_SSD: &str = "no-ssd";
pub const RULE_GENERIC_DISPLAY: &str = "generic-display-driver";
pub const RULE_BIOS_AGE: &str = "bios-age";

/// Which fact a rule reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactField {
    MachineName,
    OsVersion,
    Cpu,
    Motherboard,
    CpuSocket,
    Gpu,
    Monitor,
    Printers,
    Disks,
    RamModules,
    TotalRamGb,
    RamSlotsFree,
    BiosDate,
}

/// How a rule compares the fact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    /// Text (or any list item) contains one of the markers, case-insensitive
    ContainsAny(Vec<String>),
    /// Fact is present and contains none of the markers
    LacksAll(Vec<String>),
    /// Positive number below the threshold
    Below(f64),
    /// Positive number in `[min, max)`
    Range { min: f64, max: f64 },
    /// Date older than this many years
    OlderThanYears(u32),
}

impl Comparator {
    fn threshold_text(&self) -> String {
        match self {
            Comparator::ContainsAny(markers) | Comparator::LacksAll(markers) => markers.join(", "),
            Comparator::Below(t) => format_number(*t),
            Comparator::Range { min, max } => format!("{}-{}", format_number(*min), format_number(*max)),
            Comparator::OlderThanYears(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Critical,
    Upgrade,
}

/// One data-described rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    pub id: String,
    pub field: FactField,
    pub comparator: Comparator,
    pub tier: Tier,
    /// `{value}` and `{threshold}` are substituted
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
}

impl RuleSpec {
    pub fn new(id: &str, field: FactField, comparator: Comparator, tier: Tier, message: &str, remedy: &str) -> Self {
        Self {
            id: id.to_string(),
            field,
            comparator,
            tier,
            message: message.to_string(),
            remedy: Some(remedy.to_string()),
        }
    }

    fn render(&self, value: &str) -> String {
        self.message
            .replace("{value}", value)
            .replace("{threshold}", &self.comparator.threshold_text())
    }
}

/// A rule that fired
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub rule_id: String,
    pub tier: Tier,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
}

/// Facts with the numeric and date fields already parsed
pub struct FactView<'f> {
    pub facts: &'f RawFacts,
    /// `None` when the RAM text could not be parsed
    pub total_ram_gb: Option<f64>,
    /// `None` when the BIOS date could not be parsed
    pub bios_date: Option<NaiveDate>,
    pub today: NaiveDate,
}

enum FactValue<'f> {
    Text(&'f str),
    List(&'f [String]),
    Number(Option<f64>),
    Date(Option<NaiveDate>),
}

impl<'f> FactView<'f> {
    fn value(&self, field: FactField) -> FactValue<'f> {
        let f = self.facts;
        match field {
            FactField::MachineName => FactValue::Text(&f.machine_name),
            FactField::OsVersion => FactValue::Text(&f.os_version),
            FactField::Cpu => FactValue::Text(&f.cpu),
            FactField::Motherboard => FactValue::Text(&f.motherboard),
            FactField::CpuSocket => FactValue::Text(&f.cpu_socket),
            FactField::Gpu => FactValue::Text(&f.gpu),
            FactField::Monitor => FactValue::Text(&f.monitor),
            FactField::Printers => FactValue::List(&f.printers),
            FactField::Disks => FactValue::List(&f.disks),
            FactField::RamModules => FactValue::List(&f.ram_modules),
            FactField::TotalRamGb => FactValue::Number(self.total_ram_gb),
            FactField::RamSlotsFree => FactValue::Number(match f.ram_slots_free {
                SlotCount::Known(n) => Some(n as f64),
                SlotCount::Unknown => None,
            }),
            FactField::BiosDate => FactValue::Date(self.bios_date),
        }
    }
}

fn format_number(n: f64) -> String {
    format!("{:.1}", n)
}

fn first_marker<'m>(text: &str, markers: &'m [String]) -> Option<&'m str> {
    let lower = text.to_lowercase();
    markers
        .iter()
        .find(|m| !m.trim().is_empty() && lower.contains(&m.to_lowercase()))
        .map(|m| m.as_str())
}

/// `Some(value text)` when the comparator holds for the fact
fn compare(comparator: &Comparator, value: &FactValue<'_>, today: NaiveDate) -> Option<String> {
    match (comparator, value) {
        (Comparator::ContainsAny(markers), FactValue::Text(text)) if is_found(text) => {
            first_marker(text, markers).map(str::to_string)
        }
        (Comparator::ContainsAny(markers), FactValue::List(items)) => {
            items.iter().find_map(|item| first_marker(item, markers)).map(str::to_string)
        }
        (Comparator::LacksAll(markers), FactValue::Text(text)) if is_found(text) => {
            first_marker(text, markers).is_none().then(|| text.to_string())
        }
        (Comparator::LacksAll(markers), FactValue::List(items)) if !items.is_empty() => items
            .iter()
            .all(|item| first_marker(item, markers).is_none())
            .then(|| items.join(", ")),
        (Comparator::Below(t), FactValue::Number(Some(x))) if *x > 0.0 && x < t => Some(format_number(*x)),
        (Comparator::Range { min, max }, FactValue::Number(Some(x))) if *x > 0.0 && x >= min && x < max => {
            Some(format_number(*x))
        }
        (Comparator::OlderThanYears(years), FactValue::Date(Some(date))) => {
            let age = age_in_years(*date, today);
            (age > *years as f64).then(|| format_number(age))
        }
        _ => None,
    }
}

/// Ordered rule table
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    rules: Vec<RuleSpec>,
}

impl RuleSet {
    /// Built-in rules with the configured thresholds, then config overrides
    pub fn from_config(config: &RuleConfig) -> Self {
        let mut rules = Self::built_in(config);
        for extra in &config.extra_rules {
            match rules.iter_mut().find(|r| r.id == extra.id) {
                Some(existing) => *existing = extra.clone(),
                None => rules.push(extra.clone()),
            }
        }
        Self { rules }
    }

    pub fn built_in(config: &RuleConfig) -> Vec<RuleSpec> {
        let a = &config.analysis;
        let m = &config.markers;
        vec![
            RuleSpec::new(
                RULE_OBSOLETE_SOCKET,
                FactField::CpuSocket,
                Comparator::ContainsAny(m.obsolete_sockets.clone()),
                Tier::Critical,
                "Obsolete CPU socket ({value})",
                "Replace the system unit",
            ),
            RuleSpec::new(
                RULE_RAM_CRITICAL,
                FactField::TotalRamGb,
                Comparator::Below(a.ram_critical_gb),
                Tier::Critical,
                "Critically low RAM ({value} GB)",
                "Replace the system unit",
            ),
            RuleSpec::new(
                RULE_EOL_OS,
                FactField::OsVersion,
                Comparator::ContainsAny(m.end_of_life_os.clone()),
                Tier::Upgrade,
                "End-of-life operating system ({value})",
                "Upgrade the operating system",
            ),
            RuleSpec::new(
                RULE_RAM_UPGRADE,
                FactField::TotalRamGb,
                Comparator::Range {
                    min: a.ram_critical_gb,
                    max: a.ram_upgrade_gb,
                },
                Tier::Upgrade,
                "Insufficient RAM ({value} GB)",
                "Add RAM",
            ),
            RuleSpec::new(
                RULE_NO_SSD,
                FactField::Disks,
                Comparator::LacksAll(m.ssd_markers.clone()),
                Tier::Upgrade,
                "No SSD installed",
                "Install an SSD",
            ),
            RuleSpec::new(
                RULE_GENERIC_DISPLAY,
                FactField::Gpu,
                Comparator::ContainsAny(m.generic_display_adapters.clone()),
                Tier::Upgrade,
                "Display driver not installed ({value})",
                "Install the display driver",
            ),
            RuleSpec::new(
                RULE_BIOS_AGE,
                FactField::BiosDate,
                Comparator::OlderThanYears(a.bios_age_limit_years),
                Tier::Upgrade,
                "BIOS older than {threshold} years",
                "Update the BIOS",
            ),
        ]
    }

    pub fn rules(&self) -> &[RuleSpec] {
        &self.rules
    }

    /// Findings of every rule that fires, in table order
    pub fn evaluate(&self, view: &FactView<'_>) -> Vec<Finding> {
        self.rules
            .iter()
            .filter_map(|rule| {
                let value = view.value(rule.field);
                compare(&rule.comparator, &value, view.today).map(|v| Finding {
                    rule_id: rule.id.clone(),
                    tier: rule.tier,
                    message: rule.render(&v),
                    remedy: rule.remedy.clone(),
                })
            })
            .collect()
    }
}
