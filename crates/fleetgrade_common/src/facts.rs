//! Data model - facts extracted from one report and their classification
//!
//! Every field always holds a value. Text fields use [`NOT_FOUND`] when the
//! report does not carry them, list fields are empty.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FleetError;

/// Sentinel for a text fact the report does not contain
pub const NOT_FOUND: &str = "Not found";

/// Problem text of a machine where no rule fired
pub const HEALTHY_MESSAGE: &str = "No problems found";

/// Separator used when a list is rendered into a single cell
pub const LIST_SEPARATOR: &str = "; ";

/// True when a text fact carries a real value
pub fn is_found(value: &str) -> bool {
    let value = value.trim();
    !value.is_empty() && value != NOT_FOUND
}

/// Aggregate drive health of one machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SmartStatus {
    Good,
    Ok,
    Bad,
    /// The report has no SMART section; treated like `Good`
    #[default]
    NotFound,
}

impl SmartStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SmartStatus::Good => "GOOD",
            SmartStatus::Ok => "OK",
            SmartStatus::Bad => "BAD",
            SmartStatus::NotFound => "NOT_FOUND",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GOOD" => Some(SmartStatus::Good),
            "OK" => Some(SmartStatus::Ok),
            "BAD" => Some(SmartStatus::Bad),
            "NOT_FOUND" | "NOT FOUND" => Some(SmartStatus::NotFound),
            _ => None,
        }
    }
}

impl fmt::Display for SmartStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free memory slots, when the total could be resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotCount {
    Known(u32),
    #[default]
    Unknown,
}

impl SlotCount {
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("unknown") || s.is_empty() {
            return Some(SlotCount::Unknown);
        }
        s.parse().ok().map(SlotCount::Known)
    }
}

impl fmt::Display for SlotCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotCount::Known(n) => write!(f, "{}", n),
            SlotCount::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Facts extracted from one report file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFacts {
    /// Unique key, stable across re-runs
    pub file_name: String,
    pub machine_name: String,
    pub os_version: String,
    pub cpu: String,
    pub motherboard: String,
    pub cpu_socket: String,
    pub gpu: String,
    pub monitor: String,
    /// Physical printers only
    pub printers: Vec<String>,
    /// Vendor string, e.g. "16384 MB"
    pub total_ram_text: String,
    pub ram_modules: Vec<String>,
    pub ram_slots_used: u32,
    pub ram_slots_free: SlotCount,
    pub disks: Vec<String>,
    /// Raw vendor string, day/month order unknown
    pub bios_date_text: String,
    pub local_ip: String,
    pub mac_address: String,
    pub smart_status: SmartStatus,
    pub smart_problem_details: Vec<String>,
    pub smart_display_details: Vec<String>,
}

impl RawFacts {
    /// Facts with every field set to its sentinel
    pub fn new(file_name: impl Into<String>) -> Self {
        let nf = || NOT_FOUND.to_string();
        Self {
            file_name: file_name.into(),
            machine_name: nf(),
            os_version: nf(),
            cpu: nf(),
            motherboard: nf(),
            cpu_socket: nf(),
            gpu: nf(),
            monitor: nf(),
            printers: Vec::new(),
            total_ram_text: nf(),
            ram_modules: Vec::new(),
            ram_slots_used: 0,
            ram_slots_free: SlotCount::Unknown,
            disks: Vec::new(),
            bios_date_text: nf(),
            local_ip: nf(),
            mac_address: nf(),
            smart_status: SmartStatus::NotFound,
            smart_problem_details: Vec::new(),
            smart_display_details: Vec::new(),
        }
    }
}

/// Severity tier, lower is worse
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Category {
    /// Replace the machine
    Critical = 1,
    /// Keep it, but upgrade components
    Upgrade = 2,
    Healthy = 3,
}

impl Category {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Category::Critical),
            2 => Some(Category::Upgrade),
            3 => Some(Category::Healthy),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::Critical => "Replace",
            Category::Upgrade => "Upgrade",
            Category::Healthy => "Healthy",
        }
    }

    pub fn all() -> [Category; 3] {
        [Category::Critical, Category::Upgrade, Category::Healthy]
    }
}

impl From<Category> for u8 {
    fn from(category: Category) -> u8 {
        category.as_u8()
    }
}

impl TryFrom<u8> for Category {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Category::from_u8(value).ok_or_else(|| format!("category must be 1, 2 or 3, got {}", value))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Facts plus classification, one per report file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedRecord {
    #[serde(flatten)]
    pub facts: RawFacts,
    pub category: Category,
    /// Sorted, deduplicated findings joined with "; ", or [`HEALTHY_MESSAGE`]
    pub problems: String,
    pub recommendation: String,
    /// Set by persistence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl ClassifiedRecord {
    pub fn file_name(&self) -> &str {
        &self.facts.file_name
    }

    /// Column titles of [`ClassifiedRecord::to_flat_row`]
    pub fn flat_headers() -> Vec<&'static str> {
        RecordField::ALL.iter().map(|f| f.header()).collect()
    }

    /// One spreadsheet row, columns in [`RecordField::ALL`] order
    pub fn to_flat_row(&self) -> Vec<String> {
        RecordField::ALL.iter().map(|f| self.display_value(*f)).collect()
    }

    /// Render one field as a single cell
    pub fn display_value(&self, field: RecordField) -> String {
        let f = &self.facts;
        let list = |items: &[String]| {
            if items.is_empty() {
                NOT_FOUND.to_string()
            } else {
                items.join(LIST_SEPARATOR)
            }
        };
        match field {
            RecordField::FileName => f.file_name.clone(),
            RecordField::MachineName => f.machine_name.clone(),
            RecordField::OsVersion => f.os_version.clone(),
            RecordField::Cpu => f.cpu.clone(),
            RecordField::Motherboard => f.motherboard.clone(),
            RecordField::CpuSocket => f.cpu_socket.clone(),
            RecordField::Gpu => f.gpu.clone(),
            RecordField::Monitor => f.monitor.clone(),
            RecordField::Printers => list(&f.printers),
            RecordField::TotalRamText => f.total_ram_text.clone(),
            RecordField::RamModules => list(&f.ram_modules),
            RecordField::RamSlotsUsed => f.ram_slots_used.to_string(),
            RecordField::RamSlotsFree => f.ram_slots_free.to_string(),
            RecordField::Disks => list(&f.disks),
            RecordField::BiosDateText => f.bios_date_text.clone(),
            RecordField::LocalIp => f.local_ip.clone(),
            RecordField::MacAddress => f.mac_address.clone(),
            RecordField::SmartStatus => f.smart_status.to_string(),
            RecordField::SmartProblemDetails => list(&f.smart_problem_details),
            RecordField::SmartDisplayDetails => list(&f.smart_display_details),
            RecordField::Category => self.category.to_string(),
            RecordField::Problems => self.problems.clone(),
            RecordField::Recommendation => self.recommendation.clone(),
            RecordField::LastUpdated => self
                .last_updated
                .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Addressable record columns, shared by export and persistence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    FileName,
    MachineName,
    OsVersion,
    Cpu,
    Motherboard,
    CpuSocket,
    Gpu,
    Monitor,
    Printers,
    TotalRamText,
    RamModules,
    RamSlotsUsed,
    RamSlotsFree,
    Disks,
    BiosDateText,
    LocalIp,
    MacAddress,
    SmartStatus,
    SmartProblemDetails,
    SmartDisplayDetails,
    Category,
    Problems,
    Recommendation,
    LastUpdated,
}

impl RecordField {
    pub const ALL: [RecordField; 24] = [
        RecordField::FileName,
        RecordField::MachineName,
        RecordField::OsVersion,
        RecordField::Cpu,
        RecordField::Motherboard,
        RecordField::CpuSocket,
        RecordField::Gpu,
        RecordField::Monitor,
        RecordField::Printers,
        RecordField::TotalRamText,
        RecordField::RamModules,
        RecordField::RamSlotsUsed,
        RecordField::RamSlotsFree,
        RecordField::Disks,
        RecordField::BiosDateText,
        RecordField::LocalIp,
        RecordField::MacAddress,
        RecordField::SmartStatus,
        RecordField::SmartProblemDetails,
        RecordField::SmartDisplayDetails,
        RecordField::Category,
        RecordField::Problems,
        RecordField::Recommendation,
        RecordField::LastUpdated,
    ];

    /// Database column name
    pub fn column(self) -> &'static str {
        match self {
            RecordField::FileName => "file_name",
            RecordField::MachineName => "machine_name",
            RecordField::OsVersion => "os_version",
            RecordField::Cpu => "cpu",
            RecordField::Motherboard => "motherboard",
            RecordField::CpuSocket => "cpu_socket",
            RecordField::Gpu => "gpu",
            RecordField::Monitor => "monitor",
            RecordField::Printers => "printers",
            RecordField::TotalRamText => "total_ram_text",
            RecordField::RamModules => "ram_modules",
            RecordField::RamSlotsUsed => "ram_slots_used",
            RecordField::RamSlotsFree => "ram_slots_free",
            RecordField::Disks => "disks",
            RecordField::BiosDateText => "bios_date_text",
            RecordField::LocalIp => "local_ip",
            RecordField::MacAddress => "mac_address",
            RecordField::SmartStatus => "smart_status",
            RecordField::SmartProblemDetails => "smart_problem_details",
            RecordField::SmartDisplayDetails => "smart_display_details",
            RecordField::Category => "category",
            RecordField::Problems => "problems",
            RecordField::Recommendation => "recommendation",
            RecordField::LastUpdated => "last_updated",
        }
    }

    /// Spreadsheet column title
    pub fn header(self) -> &'static str {
        match self {
            RecordField::FileName => "File name",
            RecordField::MachineName => "Computer name",
            RecordField::OsVersion => "Operating system",
            RecordField::Cpu => "CPU",
            RecordField::Motherboard => "Motherboard",
            RecordField::CpuSocket => "CPU socket",
            RecordField::Gpu => "Video adapter",
            RecordField::Monitor => "Monitor",
            RecordField::Printers => "Printers",
            RecordField::TotalRamText => "Total RAM",
            RecordField::RamModules => "RAM modules",
            RecordField::RamSlotsUsed => "RAM slots used",
            RecordField::RamSlotsFree => "RAM slots free",
            RecordField::Disks => "Disks",
            RecordField::BiosDateText => "BIOS date",
            RecordField::LocalIp => "IP address",
            RecordField::MacAddress => "MAC address",
            RecordField::SmartStatus => "SMART status",
            RecordField::SmartProblemDetails => "SMART problems",
            RecordField::SmartDisplayDetails => "SMART details",
            RecordField::Category => "Category",
            RecordField::Problems => "Problems",
            RecordField::Recommendation => "Recommendation",
            RecordField::LastUpdated => "Last updated",
        }
    }

    pub fn is_list(self) -> bool {
        matches!(
            self,
            RecordField::Printers
                | RecordField::RamModules
                | RecordField::Disks
                | RecordField::SmartProblemDetails
                | RecordField::SmartDisplayDetails
        )
    }
}

impl FromStr for RecordField {
    type Err = FleetError;

    /// Accepts the column name or the spreadsheet title
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        RecordField::ALL
            .iter()
            .copied()
            .find(|f| f.column() == wanted || f.header().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FleetError::UnknownField(wanted.to_string()))
    }
}

impl fmt::Display for RecordField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}
