//! Extraction tests against full report fixtures
//!
//! Covers both export languages, the overview and detail-block memory
//! layouts, noise filtering and the windows-1251 file path.

use encoding_rs::WINDOWS_1251;
use fleetgrade_common::diagnostics::{DiagnosticKind, MemorySink};
use fleetgrade_common::{FleetError, RawFacts, ReportExtractor, RuleConfig, SlotCount, SmartStatus, NOT_FOUND};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const REPORT_RU: &str = include_str!("fixtures/report_ru.htm");
const REPORT_EN: &str = include_str!("fixtures/report_en.htm");
const NO_SUMMARY: &str = include_str!("fixtures/no_summary.htm");
const REPORT_SPLIT: &str = include_str!("fixtures/report_split_blocks.htm");

fn extractor(sink: Arc<MemorySink>) -> ReportExtractor {
    ReportExtractor::new(Arc::new(RuleConfig::default()), sink)
}

fn extract(html: &str, file_name: &str) -> RawFacts {
    extractor(MemorySink::new()).extract(html, file_name).unwrap()
}

#[test]
fn test_russian_overview_fields() {
    let facts = extract(REPORT_RU, "BUH-07.htm");

    assert_eq!(facts.file_name, "BUH-07.htm");
    assert_eq!(facts.machine_name, "BUH-07");
    assert_eq!(facts.os_version, "Microsoft Windows 10 Pro", "link text wins over cell text");
    assert_eq!(facts.cpu, "QuadCore Intel Core i5-4460, 3200 MHz (32 x 100)");
    assert_eq!(facts.motherboard, "Gigabyte GA-H81M-S2V");
    assert_eq!(facts.gpu, "NVIDIA GeForce GT 710 (2 ГБ)");
    assert_eq!(facts.monitor, "Samsung SyncMaster S22D300");
    assert_eq!(facts.local_ip, "192.168.1.57");
    assert_eq!(facts.mac_address, "50-E5-49-3A-7C-11");
}

#[test]
fn test_dedicated_sections_feed_socket_and_bios() {
    let facts = extract(REPORT_RU, "BUH-07.htm");
    assert_eq!(facts.cpu_socket, "1 LGA1150");
    assert_eq!(facts.bios_date_text, "05/14/2013");
}

#[test]
fn test_nested_false_positive_label_is_ignored() {
    // The overview carries an earlier nested "Системная память" cell with 512 MB
    let facts = extract(REPORT_RU, "BUH-07.htm");
    assert_eq!(facts.total_ram_text, "8192 МБ (DDR3-1333 DDR3 SDRAM)");
}

#[test]
fn test_overview_modules_and_motherboard_slot_count() {
    let facts = extract(REPORT_RU, "BUH-07.htm");
    assert_eq!(
        facts.ram_modules,
        vec![
            "Kingston 99U5471-020.A00LF 4 ГБ DDR3-1333 DDR3 SDRAM".to_string(),
            "Samsung M378B5173QH0-CK0 4 ГБ DDR3-1333 DDR3 SDRAM".to_string(),
        ]
    );
    assert_eq!(facts.ram_slots_used, 2);
    assert_eq!(facts.ram_slots_free, SlotCount::Known(0));
}

#[test]
fn test_virtual_printers_and_noise_drives_are_dropped() {
    let facts = extract(REPORT_RU, "BUH-07.htm");
    assert_eq!(facts.printers, vec!["HP LaserJet Professional P1102".to_string()]);
    assert_eq!(facts.disks, vec!["ST1000DM003-1CH162 (1 ТБ, 7200 RPM, SATA-III)".to_string()]);
}

#[test]
fn test_smart_section_evaluated_without_noise_drive() {
    let facts = extract(REPORT_RU, "BUH-07.htm");

    assert_eq!(facts.smart_status, SmartStatus::Ok);
    assert_eq!(
        facts.smart_problem_details,
        vec!["ST1000DM003-1CH162 (Z1D5K2QH): Reallocated sectors (05) = 2".to_string()]
    );
    assert_eq!(facts.smart_display_details.len(), 1, "USB stick must not be evaluated");
    let display = &facts.smart_display_details[0];
    assert!(display.contains("power-on 11872 h"), "{}", display);
    assert!(display.contains("31 °C"), "{}", display);
}

#[test]
fn test_english_report_uses_detail_blocks() {
    let sink = MemorySink::new();
    let facts = extractor(sink.clone()).extract(REPORT_EN, "RECEPTION-2.htm").unwrap();

    assert_eq!(facts.machine_name, "RECEPTION-2");
    assert_eq!(facts.os_version, "Microsoft Windows 7 Professional");
    assert_eq!(facts.cpu_socket, "1 LGA775");
    assert_eq!(facts.bios_date_text, "11/03/2009");
    assert_eq!(facts.total_ram_text, "2048 MB");
    assert_eq!(
        facts.ram_modules,
        vec!["1024 MB DDR3 1333 MHz".to_string(), "1024 MB DDR3 1333 MHz".to_string()]
    );
    assert_eq!(facts.ram_slots_used, 2);
    assert_eq!(facts.ram_slots_free, SlotCount::Known(2));
    assert_eq!(sink.count(DiagnosticKind::HeuristicFallback), 0, "header count is not a guess");
}

#[test]
fn test_detail_block_in_following_table() {
    let sink = MemorySink::new();
    let facts = extractor(sink.clone()).extract(REPORT_SPLIT, "STORE-4.htm").unwrap();

    assert_eq!(facts.ram_modules, vec!["4096 MB DDR4 2400 MHz".to_string()]);
    assert_eq!(facts.ram_slots_used, 1);
    assert_eq!(facts.ram_slots_free, SlotCount::Known(1));
    assert_eq!(sink.count(DiagnosticKind::HeuristicFallback), 0);
}

#[test]
fn test_hex_raw_value_in_smart_table() {
    let facts = extract(REPORT_SPLIT, "STORE-4.htm");

    assert_eq!(facts.smart_status, SmartStatus::Bad, "0x1A reallocated sectors is above the critical count");
    assert_eq!(
        facts.smart_problem_details,
        vec!["WDC WD5000AAKX-001CA0 (WCC2EY123456): Reallocated sectors (05) = 26".to_string()]
    );
    assert_eq!(
        facts.smart_display_details,
        vec!["WDC WD5000AAKX-001CA0 (WCC2EY123456): reallocated 26, pending 0".to_string()]
    );
}

#[test]
fn test_absent_optional_sections_degrade_to_sentinels() {
    let facts = extract(REPORT_EN, "RECEPTION-2.htm");
    assert!(facts.printers.is_empty());
    assert_eq!(facts.smart_status, SmartStatus::NotFound);
    assert!(facts.smart_problem_details.is_empty());
    assert!(facts.smart_display_details.is_empty());
}

#[test]
fn test_missing_overview_is_rejected() {
    let err = extractor(MemorySink::new())
        .extract(NO_SUMMARY, "partial.htm")
        .unwrap_err();
    assert!(matches!(err, FleetError::MissingMandatorySection { .. }));
    assert!(err.to_string().contains("partial.htm"));
}

#[test]
fn test_extraction_is_idempotent() {
    let first = extract(REPORT_RU, "BUH-07.htm");
    let second = extract(REPORT_RU, "BUH-07.htm");
    assert_eq!(first, second);
    assert_eq!(serde_json::to_string(&first).unwrap(), serde_json::to_string(&second).unwrap());
}

#[test]
fn test_windows_1251_file_matches_decoded_text() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("BUH-07.htm");
    let (bytes, _, unmappable) = WINDOWS_1251.encode(REPORT_RU);
    assert!(!unmappable);
    fs::write(&path, &bytes).unwrap();

    let from_file = extractor(MemorySink::new()).extract_file(&path).unwrap();
    assert_eq!(from_file, extract(REPORT_RU, "BUH-07.htm"));
}

#[test]
fn test_unreadable_file_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = extractor(MemorySink::new())
        .extract_file(&dir.path().join("missing.htm"))
        .unwrap_err();
    assert!(matches!(err, FleetError::Io { .. }));
}

#[test]
fn test_every_field_has_a_value() {
    let facts = extract(REPORT_EN, "RECEPTION-2.htm");
    for value in [
        &facts.machine_name,
        &facts.os_version,
        &facts.cpu,
        &facts.motherboard,
        &facts.cpu_socket,
        &facts.gpu,
        &facts.monitor,
        &facts.total_ram_text,
        &facts.bios_date_text,
        &facts.local_ip,
        &facts.mac_address,
    ] {
        assert!(!value.is_empty());
        assert_ne!(value, NOT_FOUND);
    }
}
