//! Export - spreadsheet deliverables and batch statistics
//!
//! From one sorted batch of records:
//! - `<stem>.csv`: every record as a flat row
//! - `<stem>_recommendations.csv`: category 1 then category 2 machines
//! - `<stem>_summary.json`: [`BatchStatistics`]
//!
//! Statistics are derived from the records alone.

use crate::classify::units::{age_in_years, parse_bios_date};
use crate::config::DateOrder;
use crate::error::{FleetError, Result};
use crate::facts::{is_found, Category, ClassifiedRecord, HEALTHY_MESSAGE, LIST_SEPARATOR};
use crate::sort::natural_cmp;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How many entries the "top" lists keep
pub const TOP_N: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemCount {
    pub problem: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityMachine {
    pub file_name: String,
    pub machine_name: String,
    pub category: Category,
    pub problems: String,
}

/// Aggregate view of a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchStatistics {
    pub total: usize,
    pub critical: usize,
    pub upgrade: usize,
    pub healthy: usize,
    /// Most frequent problem phrases, most common first
    pub top_problems: Vec<ProblemCount>,
    /// Mean over records with a readable BIOS date
    pub average_bios_age_years: Option<f64>,
    /// Worst machines first
    pub priority_machines: Vec<PriorityMachine>,
}

impl BatchStatistics {
    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Critical => self.critical,
            Category::Upgrade => self.upgrade,
            Category::Healthy => self.healthy,
        }
    }
}

pub fn compute_statistics(records: &[ClassifiedRecord], today: NaiveDate, order: DateOrder) -> BatchStatistics {
    let by_category = |c: Category| records.iter().filter(|r| r.category == c).count();

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for record in records {
        for problem in record.problems.split(LIST_SEPARATOR) {
            let problem = problem.trim();
            if !problem.is_empty() && problem != HEALTHY_MESSAGE {
                *counts.entry(problem).or_default() += 1;
            }
        }
    }
    let mut top_problems: Vec<ProblemCount> = counts
        .into_iter()
        .map(|(problem, count)| ProblemCount {
            problem: problem.to_string(),
            count,
        })
        .collect();
    top_problems.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.problem.cmp(&b.problem)));
    top_problems.truncate(TOP_N);

    let ages: Vec<f64> = records
        .iter()
        .filter(|r| is_found(&r.facts.bios_date_text))
        .filter_map(|r| parse_bios_date(&r.facts.bios_date_text, order).date())
        .map(|d| age_in_years(d, today))
        .collect();
    let average_bios_age_years = if ages.is_empty() {
        None
    } else {
        let mean = ages.iter().sum::<f64>() / ages.len() as f64;
        Some((mean * 10.0).round() / 10.0)
    };

    let mut flagged: Vec<&ClassifiedRecord> = records.iter().filter(|r| r.category != Category::Healthy).collect();
    flagged.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| natural_cmp(a.file_name(), b.file_name())));
    let priority_machines = flagged
        .into_iter()
        .take(TOP_N)
        .map(|r| PriorityMachine {
            file_name: r.file_name().to_string(),
            machine_name: r.facts.machine_name.clone(),
            category: r.category,
            problems: r.problems.clone(),
        })
        .collect();

    BatchStatistics {
        total: records.len(),
        critical: by_category(Category::Critical),
        upgrade: by_category(Category::Upgrade),
        healthy: by_category(Category::Healthy),
        top_problems,
        average_bios_age_years,
        priority_machines,
    }
}

/// Files written by one export
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPaths {
    pub main: PathBuf,
    pub recommendations: PathBuf,
    pub summary: PathBuf,
}

impl ExportPaths {
    /// Sibling file names derived from the main output path
    pub fn for_output(main: &Path) -> Self {
        let stem = main
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "system_analysis".to_string());
        let dir = main.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            main: main.to_path_buf(),
            recommendations: dir.join(format!("{}_recommendations.csv", stem)),
            summary: dir.join(format!("{}_summary.json", stem)),
        }
    }
}

/// Write all three deliverables, returning the statistics that went into the summary
pub fn export_all(
    records: &[ClassifiedRecord],
    output: &Path,
    today: NaiveDate,
    order: DateOrder,
) -> Result<(ExportPaths, BatchStatistics)> {
    let paths = ExportPaths::for_output(output);
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| FleetError::io(parent, e))?;
        }
    }

    let mut sorted: Vec<ClassifiedRecord> = records.to_vec();
    sorted.sort_by(|a, b| natural_cmp(a.file_name(), b.file_name()));

    write_records_csv(&sorted, &paths.main)?;
    write_recommendations_csv(&sorted, &paths.recommendations)?;

    let stats = compute_statistics(&sorted, today, order);
    let json = serde_json::to_string_pretty(&stats)?;
    fs::write(&paths.summary, json).map_err(|e| FleetError::io(&paths.summary, e))?;

    Ok((paths, stats))
}

/// One flat row per record
pub fn write_records_csv(records: &[ClassifiedRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(ClassifiedRecord::flat_headers())?;
    for record in records {
        writer.write_record(record.to_flat_row())?;
    }
    writer.flush().map_err(|e| FleetError::io(path, e))?;
    Ok(())
}

/// Machines needing action, grouped by category
pub fn write_recommendations_csv(records: &[ClassifiedRecord], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Category", "Action", "File name", "Computer name", "Problems", "Recommendation"])?;
    for category in [Category::Critical, Category::Upgrade] {
        for record in records.iter().filter(|r| r.category == category) {
            writer.write_record([
                category.to_string().as_str(),
                category.label(),
                record.file_name(),
                record.facts.machine_name.as_str(),
                record.problems.as_str(),
                record.recommendation.as_str(),
            ])?;
        }
    }
    writer.flush().map_err(|e| FleetError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::RawFacts;
    use tempfile::TempDir;

    fn record(file_name: &str, category: Category, problems: &str, bios: &str) -> ClassifiedRecord {
        let mut facts = RawFacts::new(file_name);
        facts.bios_date_text = bios.to_string();
        ClassifiedRecord {
            facts,
            category,
            problems: problems.to_string(),
            recommendation: String::new(),
            last_updated: None,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
    }

    fn batch() -> Vec<ClassifiedRecord> {
        vec![
            record("PC-3.htm", Category::Upgrade, "No SSD installed", "01/01/2016"),
            record("PC-1.htm", Category::Critical, "Critically low RAM (2.0 GB); No SSD installed", "01/01/2006"),
            record("PC-2.htm", Category::Healthy, HEALTHY_MESSAGE, "Not found"),
            record("PC-10.htm", Category::Upgrade, "BIOS older than 5 years; No SSD installed", "garbage"),
        ]
    }

    #[test]
    fn test_statistics() {
        let stats = compute_statistics(&batch(), today(), DateOrder::MonthFirst);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.count(Category::Critical), 1);
        assert_eq!(stats.count(Category::Upgrade), 2);
        assert_eq!(stats.count(Category::Healthy), 1);

        assert_eq!(stats.top_problems[0], ProblemCount { problem: "No SSD installed".to_string(), count: 3 });
        assert_eq!(stats.top_problems.len(), 3);
        assert!(!stats.top_problems.iter().any(|p| p.problem == HEALTHY_MESSAGE));

        assert_eq!(stats.average_bios_age_years, Some(15.0));

        let order: Vec<&str> = stats.priority_machines.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(order, vec!["PC-1.htm", "PC-3.htm", "PC-10.htm"]);
    }

    #[test]
    fn test_statistics_of_empty_batch() {
        let stats = compute_statistics(&[], today(), DateOrder::MonthFirst);
        assert_eq!(stats.total, 0);
        assert!(stats.top_problems.is_empty());
        assert_eq!(stats.average_bios_age_years, None);
    }

    #[test]
    fn test_export_paths() {
        let paths = ExportPaths::for_output(Path::new("out/fleet.csv"));
        assert_eq!(paths.recommendations, PathBuf::from("out/fleet_recommendations.csv"));
        assert_eq!(paths.summary, PathBuf::from("out/fleet_summary.json"));
    }

    #[test]
    fn test_export_all_writes_files() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("reports").join("fleet.csv");
        let (paths, stats) = export_all(&batch(), &output, today(), DateOrder::MonthFirst).unwrap();

        let main = fs::read_to_string(&paths.main).unwrap();
        let lines: Vec<&str> = main.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("File name,"));
        assert!(lines[1].starts_with("PC-1.htm,"));
        assert!(lines[4].starts_with("PC-10.htm,"));

        let recs = fs::read_to_string(&paths.recommendations).unwrap();
        let rec_lines: Vec<&str> = recs.lines().collect();
        assert_eq!(rec_lines.len(), 4);
        assert!(rec_lines[1].starts_with("1,Replace,PC-1.htm"));

        let summary: BatchStatistics = serde_json::from_str(&fs::read_to_string(&paths.summary).unwrap()).unwrap();
        assert_eq!(summary, stats);
    }
}
