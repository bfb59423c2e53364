//! Classifier behaviour over hand-built facts and full fixtures

use chrono::NaiveDate;
use fleetgrade_common::classify::{Classifier, FULL_REPLACEMENT, REPLACE_DISK};
use fleetgrade_common::config::SmartThresholds;
use fleetgrade_common::diagnostics::{DiagnosticKind, MemorySink};
use fleetgrade_common::extract::smart::{normalize_raw_value, summarize, DriveReading, SmartAttribute};
use fleetgrade_common::{
    Category, FleetConfig, RawFacts, ReportExtractor, RuleConfig, SlotCount, SmartStatus, HEALTHY_MESSAGE,
};
use std::sync::Arc;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).unwrap()
}

fn classifier_with(config: RuleConfig) -> Classifier {
    Classifier::new(Arc::new(config), MemorySink::new()).with_reference_date(today())
}

fn classifier() -> Classifier {
    classifier_with(RuleConfig::default())
}

fn problems(text: &str) -> Vec<&str> {
    text.split("; ").collect()
}

#[test]
fn test_obsolete_socket_and_low_ram_are_critical() {
    let mut facts = RawFacts::new("old.htm");
    facts.cpu_socket = "LGA775".to_string();
    facts.total_ram_text = "2048 MB".to_string();
    facts.smart_status = SmartStatus::Good;
    facts.os_version = "Windows 7".to_string();

    let result = classifier().classify(&facts);
    assert_eq!(result.category, Category::Critical);
    let list = problems(&result.problems);
    assert!(list.contains(&"Obsolete CPU socket (LGA775)"), "{:?}", list);
    assert!(list.contains(&"Critically low RAM (2.0 GB)"), "{:?}", list);
    assert!(list.contains(&"End-of-life operating system (Windows 7)"), "upgrade findings ride along");
    assert_eq!(result.recommendation, FULL_REPLACEMENT);
}

#[test]
fn test_missing_ssd_is_upgrade() {
    let mut facts = RawFacts::new("hdd.htm");
    facts.cpu_socket = "AM4".to_string();
    facts.total_ram_text = "8192 MB".to_string();
    facts.os_version = "Windows 10".to_string();
    facts.disks = vec!["HDD 1TB".to_string()];
    facts.smart_status = SmartStatus::Good;

    let result = classifier().classify(&facts);
    assert_eq!(result.category, Category::Upgrade);
    assert_eq!(result.problems, "No SSD installed");
    assert_eq!(result.recommendation, "Install an SSD");
}

#[test]
fn test_modern_machine_is_healthy() {
    let mut facts = RawFacts::new("new.htm");
    facts.cpu_socket = "AM5".to_string();
    facts.total_ram_text = "16384 MB".to_string();
    facts.os_version = "Windows 11".to_string();
    facts.disks = vec!["NVMe SSD".to_string()];
    facts.smart_status = SmartStatus::Good;
    facts.bios_date_text = "03/15/2025".to_string();

    let result = classifier().classify(&facts);
    assert_eq!(result.category, Category::Healthy);
    assert_eq!(result.problems, HEALTHY_MESSAGE);
    assert!(result.findings.is_empty());
}

#[test]
fn test_pending_sectors_fail_the_machine() {
    let drive = DriveReading {
        drive_name: "WDC WD5000AAKX".to_string(),
        is_ssd: false,
        attributes: vec![
            SmartAttribute {
                id: "C5".to_string(),
                description: "Current Pending Sector Count".to_string(),
                raw_value: normalize_raw_value("5").unwrap(),
            },
            SmartAttribute {
                id: "9".to_string(),
                description: "Power-On Hours".to_string(),
                raw_value: 100,
            },
        ],
    };
    let summary = summarize(&[drive], &SmartThresholds::default());
    assert_eq!(summary.status, SmartStatus::Bad);

    let mut facts = RawFacts::new("failing.htm");
    facts.cpu_socket = "AM5".to_string();
    facts.total_ram_text = "32 GB".to_string();
    facts.disks = vec!["Samsung SSD 980".to_string()];
    facts.smart_status = summary.status;
    facts.smart_problem_details = summary.problems;

    let result = classifier().classify(&facts);
    assert_eq!(result.category, Category::Critical);
    assert_eq!(result.problems, "WDC WD5000AAKX: Pending sectors (C5) = 5");
    assert_eq!(result.recommendation, REPLACE_DISK);
}

#[test]
fn test_bad_smart_short_circuits_everything_else() {
    let mut facts = RawFacts::new("bad.htm");
    facts.cpu_socket = "LGA775".to_string();
    facts.os_version = "Windows XP".to_string();
    facts.total_ram_text = "1024 MB".to_string();
    facts.smart_status = SmartStatus::Bad;
    facts.smart_problem_details = vec!["ST500: Uncorrectable sectors (C6) = 8".to_string()];

    let result = classifier().classify(&facts);
    assert_eq!(result.category, Category::Critical);
    assert_eq!(result.problems, "ST500: Uncorrectable sectors (C6) = 8", "SMART is the sole reason");
}

#[test]
fn test_sentinel_facts_are_healthy() {
    let sink = MemorySink::new();
    let facts = RawFacts::new("empty.htm");
    let result = Classifier::new(Arc::new(RuleConfig::default()), sink.clone())
        .with_reference_date(today())
        .classify(&facts);
    assert_eq!(result.category, Category::Healthy);
    assert_eq!(result.problems, HEALTHY_MESSAGE);
    assert!(sink.events().is_empty(), "sentinels are not parse failures");
}

#[test]
fn test_classification_is_deterministic() {
    let mut facts = RawFacts::new("mix.htm");
    facts.total_ram_text = "6 GB".to_string();
    facts.gpu = "Стандартный VGA графический адаптер".to_string();
    facts.disks = vec!["TOSHIBA DT01ACA050".to_string()];
    facts.bios_date_text = "12/28/2011".to_string();
    facts.smart_status = SmartStatus::Ok;
    facts.smart_problem_details = vec!["TOSHIBA DT01ACA050: High temperature (52 °C)".to_string()];

    let c = classifier();
    let first = c.classify(&facts);
    for _ in 0..5 {
        assert_eq!(c.classify(&facts), first);
    }

    let list = problems(&first.problems);
    let mut sorted = list.clone();
    sorted.sort();
    assert_eq!(list, sorted, "problems must be in lexicographic order");
    assert_eq!(list.len(), 5);
}

#[test]
fn test_raising_critical_threshold_only_worsens() {
    let mut facts = RawFacts::new("ram.htm");
    facts.total_ram_text = "6144 MB".to_string();
    facts.disks = vec!["Kingston SA400S37240G".to_string()];

    let mut previous = Category::Healthy;
    for critical in [1.0, 3.8, 5.0, 6.5, 7.0] {
        let mut config = RuleConfig::default();
        config.analysis.ram_critical_gb = critical;
        config.analysis.ram_upgrade_gb = 7.8;
        let category = classifier_with(config).classify(&facts).category;
        assert!(category <= previous, "threshold {} moved {:?} to {:?}", critical, previous, category);
        previous = category;
    }
    assert_eq!(previous, Category::Critical);
}

#[test]
fn test_thresholds_come_from_config() {
    let config = FleetConfig::from_toml_str(
        r#"
        [analysis]
        ram_critical_gb = 1.5
        ram_upgrade_gb = 3.0
        bios_age_limit_years = 20
        "#,
    )
    .unwrap();

    let mut facts = RawFacts::new("tuned.htm");
    facts.total_ram_text = "2048 MB".to_string();
    facts.bios_date_text = "2012-06-01".to_string();
    facts.disks = vec!["Crucial MX500 SSD".to_string()];

    let result = classifier_with(config.rule_config()).classify(&facts);
    assert_eq!(result.category, Category::Upgrade);
    assert_eq!(result.problems, "Insufficient RAM (2.0 GB)");
}

#[test]
fn test_config_rule_extends_the_table() {
    let config = FleetConfig::from_toml_str(
        r#"
        [[rules]]
        id = "no-free-slots"
        field = "ram_slots_free"
        comparator = { below = 2.0 }
        tier = "upgrade"
        message = "Only {value} RAM slot free"
        remedy = "Plan a RAM kit swap"
        "#,
    )
    .unwrap();
    let classifier = classifier_with(config.rule_config());

    let mut facts = RawFacts::new("slots.htm");
    facts.ram_slots_free = SlotCount::Known(1);
    let result = classifier.classify(&facts);
    assert_eq!(result.category, Category::Upgrade);
    assert_eq!(result.problems, "Only 1.0 RAM slot free");
    assert_eq!(result.recommendation, "Plan a RAM kit swap");

    facts.ram_slots_free = SlotCount::Known(3);
    assert_eq!(classifier.classify(&facts).category, Category::Healthy);

    facts.ram_slots_free = SlotCount::Unknown;
    assert_eq!(classifier.classify(&facts).category, Category::Healthy, "unknown is never compared");
}

#[test]
fn test_fixture_reports_classify_end_to_end() {
    let config = Arc::new(RuleConfig::default());
    let sink = MemorySink::new();
    let extractor = ReportExtractor::new(config.clone(), sink.clone());
    let classifier = Classifier::new(config, sink.clone()).with_reference_date(today());

    let ru = extractor
        .extract(include_str!("fixtures/report_ru.htm"), "BUH-07.htm")
        .unwrap();
    let record = classifier.classify_record(ru);
    assert_eq!(record.category, Category::Upgrade);
    assert_eq!(
        record.problems,
        "BIOS older than 5 years; No SSD installed; ST1000DM003-1CH162 (Z1D5K2QH): Reallocated sectors (05) = 2"
    );

    let en = extractor
        .extract(include_str!("fixtures/report_en.htm"), "RECEPTION-2.htm")
        .unwrap();
    let record = classifier.classify_record(en);
    assert_eq!(record.category, Category::Critical);
    assert_eq!(
        problems(&record.problems),
        vec![
            "BIOS older than 5 years",
            "Critically low RAM (2.0 GB)",
            "Display driver not installed (Microsoft Basic Display Adapter)",
            "End-of-life operating system (Windows 7)",
            "Obsolete CPU socket (LGA775)",
        ]
    );
    assert_eq!(sink.count(DiagnosticKind::AmbiguousDate), 1, "11/03/2009 has no field above 12");
}
