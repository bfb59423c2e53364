//! Configuration for fleetgrade
//!
//! Loads settings from a TOML file or uses defaults. Every key is optional,
//! an empty file yields the built-in thresholds.
//!
//! Lookup order: explicit path, `./fleetgrade.toml`,
//! `~/.config/fleetgrade/config.toml`, defaults.

use crate::classify::RuleSpec;
use crate::error::{FleetError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "fleetgrade.toml";

/// Full application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub settings: Settings,

    #[serde(default)]
    pub analysis: AnalysisConfig,

    #[serde(default)]
    pub smart: SmartThresholds,

    #[serde(default)]
    pub markers: MarkerConfig,

    /// Extra data-described rules, appended to the built-in set
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
}

/// Paths used by the command-line front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_reports_directory")]
    pub reports_directory: PathBuf,

    /// Main export file; sibling files derive their names from its stem
    #[serde(default = "default_output_filename")]
    pub output_filename: PathBuf,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Log to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_filename: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reports_directory: default_reports_directory(),
            output_filename: default_output_filename(),
            database_path: default_database_path(),
            log_filename: None,
        }
    }
}

fn default_reports_directory() -> PathBuf {
    PathBuf::from("reports")
}

fn default_output_filename() -> PathBuf {
    PathBuf::from("system_analysis.csv")
}

fn default_database_path() -> PathBuf {
    PathBuf::from("system_analysis.db")
}

/// How to read a BIOS date whose first two fields are both 12 or less
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    /// mm/dd/yyyy, the SMBIOS convention
    #[default]
    MonthFirst,
    DayFirst,
}

/// Classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_bios_age_limit")]
    pub bios_age_limit_years: u32,

    /// Below this much RAM the machine is a replacement candidate
    #[serde(default = "default_ram_critical")]
    pub ram_critical_gb: f64,

    /// Below this much RAM (and above the critical mark) it needs more memory
    #[serde(default = "default_ram_upgrade")]
    pub ram_upgrade_gb: f64,

    #[serde(default)]
    pub ambiguous_date_order: DateOrder,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            bios_age_limit_years: default_bios_age_limit(),
            ram_critical_gb: default_ram_critical(),
            ram_upgrade_gb: default_ram_upgrade(),
            ambiguous_date_order: DateOrder::default(),
        }
    }
}

fn default_bios_age_limit() -> u32 {
    5
}

fn default_ram_critical() -> f64 {
    3.8
}

fn default_ram_upgrade() -> f64 {
    7.8
}

/// SMART attribute thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartThresholds {
    /// Reallocated sectors above this count are critical (any at all is a warning)
    #[serde(default = "default_hdd_reallocated_critical")]
    pub hdd_reallocated_critical: u64,

    #[serde(default = "default_ssd_spare_warning")]
    pub ssd_spare_warning_pct: u64,

    #[serde(default = "default_ssd_spare_critical")]
    pub ssd_spare_critical_pct: u64,

    /// Percentage of rated endurance used
    #[serde(default = "default_ssd_endurance_warning")]
    pub ssd_endurance_warning_pct: u64,

    #[serde(default = "default_temp_warning")]
    pub temp_warning_celsius: u64,

    #[serde(default = "default_power_on_warning")]
    pub power_on_warning_hours: u64,

    #[serde(default = "default_power_cycle_warning")]
    pub power_cycle_warning_count: u64,

    #[serde(default = "default_read_error_warning")]
    pub read_error_warning_rate: u64,
}

impl Default for SmartThresholds {
    fn default() -> Self {
        Self {
            hdd_reallocated_critical: default_hdd_reallocated_critical(),
            ssd_spare_warning_pct: default_ssd_spare_warning(),
            ssd_spare_critical_pct: default_ssd_spare_critical(),
            ssd_endurance_warning_pct: default_ssd_endurance_warning(),
            temp_warning_celsius: default_temp_warning(),
            power_on_warning_hours: default_power_on_warning(),
            power_cycle_warning_count: default_power_cycle_warning(),
            read_error_warning_rate: default_read_error_warning(),
        }
    }
}

fn default_hdd_reallocated_critical() -> u64 {
    10
}

fn default_ssd_spare_warning() -> u64 {
    30
}

fn default_ssd_spare_critical() -> u64 {
    10
}

fn default_ssd_endurance_warning() -> u64 {
    90
}

fn default_temp_warning() -> u64 {
    45
}

fn default_power_on_warning() -> u64 {
    30_000
}

fn default_power_cycle_warning() -> u64 {
    10_000
}

fn default_read_error_warning() -> u64 {
    1_000_000
}

/// Substring markers matched case-insensitively against extracted facts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    #[serde(default = "default_obsolete_sockets")]
    pub obsolete_sockets: Vec<String>,

    #[serde(default = "default_end_of_life_os")]
    pub end_of_life_os: Vec<String>,

    /// Display adapters that mean the vendor driver is not installed
    #[serde(default = "default_generic_display_adapters")]
    pub generic_display_adapters: Vec<String>,

    /// Drive name fragments that identify solid-state drives
    #[serde(default = "default_ssd_markers")]
    pub ssd_markers: Vec<String>,

    /// Drives excluded from inventory and SMART evaluation
    #[serde(default = "default_noise_drives")]
    pub noise_drives: Vec<String>,

    #[serde(default = "default_virtual_printers")]
    pub virtual_printers: Vec<String>,

    /// Keywords that suggest a two-slot board
    #[serde(default = "default_compact_form_factor")]
    pub compact_form_factor: Vec<String>,

    /// Values reported for an unpopulated memory slot
    #[serde(default = "default_empty_slot_markers")]
    pub empty_slot_markers: Vec<String>,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            obsolete_sockets: default_obsolete_sockets(),
            end_of_life_os: default_end_of_life_os(),
            generic_display_adapters: default_generic_display_adapters(),
            ssd_markers: default_ssd_markers(),
            noise_drives: default_noise_drives(),
            virtual_printers: default_virtual_printers(),
            compact_form_factor: default_compact_form_factor(),
            empty_slot_markers: default_empty_slot_markers(),
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_obsolete_sockets() -> Vec<String> {
    strings(&["LGA775", "AM2", "LGA1156"])
}

fn default_end_of_life_os() -> Vec<String> {
    strings(&["Windows XP", "Windows Vista", "Windows 7", "Windows 8"])
}

fn default_generic_display_adapters() -> Vec<String> {
    strings(&[
        "Microsoft Basic Display Adapter",
        "Базовый видеоадаптер (Майкрософт)",
        "Standard VGA",
        "Стандартный VGA",
    ])
}

fn default_ssd_markers() -> Vec<String> {
    strings(&["ssd", "nvme", "snv", "sa400"])
}

fn default_noise_drives() -> Vec<String> {
    strings(&["DataTraveler", "Virtual Disk", "USB Device"])
}

fn default_virtual_printers() -> Vec<String> {
    strings(&["Fax", "Microsoft Print to PDF", "XPS", "OneNote", "AnyDesk"])
}

fn default_compact_form_factor() -> Vec<String> {
    strings(&["SO-DIMM", "Notebook", "Laptop", "Ноутбук"])
}

fn default_empty_slot_markers() -> Vec<String> {
    strings(&["Empty", "Пусто", "No Module", "Not Installed", "Не установлен"])
}

/// The tuning set consumed by the extractor and classifier
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleConfig {
    pub analysis: AnalysisConfig,
    pub smart: SmartThresholds,
    pub markers: MarkerConfig,
    pub extra_rules: Vec<RuleSpec>,
}

impl From<&FleetConfig> for RuleConfig {
    fn from(config: &FleetConfig) -> Self {
        Self {
            analysis: config.analysis.clone(),
            smart: config.smart.clone(),
            markers: config.markers.clone(),
            extra_rules: config.rules.clone(),
        }
    }
}

impl FleetConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: FleetConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| FleetError::io(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load from the first config file that exists, or fall back to defaults.
    /// Returns the path that was used, if any.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load_from(path)?, Some(path.to_path_buf())));
        }

        for path in Self::candidate_paths() {
            if path.exists() {
                return Ok((Self::load_from(&path)?, Some(path)));
            }
        }

        Ok((Self::default(), None))
    }

    /// Implicit config locations, highest priority first
    pub fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("fleetgrade").join("config.toml"));
        }
        paths
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FleetError::Config(format!("cannot serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| FleetError::io(parent, e))?;
            }
        }
        fs::write(path, content).map_err(|e| FleetError::io(path, e))
    }

    /// Reject threshold combinations that make rules contradict each other
    pub fn validate(&self) -> Result<()> {
        let analysis = &self.analysis;
        if !(analysis.ram_critical_gb >= 0.0 && analysis.ram_upgrade_gb >= 0.0) {
            return Err(FleetError::Config(
                "RAM thresholds must be non-negative numbers".to_string(),
            ));
        }
        if analysis.ram_critical_gb > analysis.ram_upgrade_gb {
            return Err(FleetError::Config(format!(
                "ram_critical_gb ({}) is above ram_upgrade_gb ({})",
                analysis.ram_critical_gb, analysis.ram_upgrade_gb
            )));
        }
        if self.smart.ssd_spare_critical_pct > self.smart.ssd_spare_warning_pct {
            return Err(FleetError::Config(format!(
                "ssd_spare_critical_pct ({}) is above ssd_spare_warning_pct ({})",
                self.smart.ssd_spare_critical_pct, self.smart.ssd_spare_warning_pct
            )));
        }

        let mut seen = std::collections::HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(FleetError::Config("rule with empty id".to_string()));
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(FleetError::Config(format!("duplicate rule id '{}'", rule.id)));
            }
        }
        Ok(())
    }

    pub fn rule_config(&self) -> RuleConfig {
        RuleConfig::from(self)
    }
}
