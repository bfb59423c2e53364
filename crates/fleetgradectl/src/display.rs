//! Display helpers for fleetgradectl output
//!
//! The live scan view is an indicatif bar on stderr; each finished report
//! is printed above it as soon as it is classified, in processing order.

use fleetgrade_common::export::{BatchStatistics, ExportPaths};
use fleetgrade_common::{BatchOutcome, BatchProgress, Category, ClassifiedRecord};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

/// Width of the file name column
const NAME_WIDTH: usize = 24;

/// Category number with its colour
pub fn category_badge(category: Category) -> String {
    let text = format!("[{}] {:<7}", category, category.label());
    match category {
        Category::Critical => text.red().bold().to_string(),
        Category::Upgrade => text.yellow().to_string(),
        Category::Healthy => text.green().to_string(),
    }
}

/// One line per record: badge, file name, problems
pub fn record_line(record: &ClassifiedRecord) -> String {
    format!(
        "{} {:<width$} {}",
        category_badge(record.category),
        record.file_name(),
        record.problems,
        width = NAME_WIDTH
    )
}

pub fn print_records(records: &[ClassifiedRecord]) {
    if records.is_empty() {
        println!("{}", "No records".dimmed());
        return;
    }
    for record in records {
        println!("{}", record_line(record));
    }
}

/// Live progress for a scan
pub struct ScanProgress {
    bar: ProgressBar,
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar().template("{spinner} [{bar:30}] {pos}/{len} {msg}") {
            bar.set_style(style.progress_chars("=> "));
        }
        Self { bar }
    }

    pub fn handle(&self, event: &BatchProgress<'_>) {
        match event {
            BatchProgress::Started { total } => {
                self.bar.set_length(*total as u64);
                self.bar.set_message("scanning");
            }
            BatchProgress::Processed { done, record, .. } => {
                self.bar.println(record_line(record));
                self.bar.set_position(*done as u64);
            }
            BatchProgress::Failed { done, failure, .. } => {
                self.bar.println(format!(
                    "{} {:<width$} {}",
                    "[!] skipped  ".red(),
                    failure.file_name,
                    failure.reason.dimmed(),
                    width = NAME_WIDTH
                ));
                self.bar.set_position(*done as u64);
            }
        }
    }

    pub fn finish(&self, outcome: &BatchOutcome) {
        let message = if outcome.cancelled {
            "cancelled"
        } else {
            "done"
        };
        self.bar.finish_with_message(message);
    }
}

/// End-of-scan summary
pub fn print_outcome(outcome: &BatchOutcome) {
    println!();
    println!(
        "{} {} of {} reports processed",
        "Scan:".bold(),
        outcome.records.len(),
        outcome.total_files
    );
    if !outcome.failures.is_empty() {
        println!("      {} skipped:", outcome.failures.len());
        for failure in &outcome.failures {
            println!("       {} {}", failure.file_name, failure.reason.dimmed());
        }
    }
    if outcome.cancelled {
        println!("{}", "Interrupted: processed records were stored, export skipped".yellow());
    }
}

pub fn print_statistics(stats: &BatchStatistics) {
    println!();
    println!("{}", "Fleet summary".bold());
    for category in Category::all() {
        println!("  {} {}", category_badge(category), stats.count(category));
    }
    if let Some(age) = stats.average_bios_age_years {
        println!("  Average BIOS age: {:.1} years", age);
    }
    if !stats.top_problems.is_empty() {
        println!("  Most common problems:");
        for p in &stats.top_problems {
            println!("    {:>3}  {}", p.count, p.problem);
        }
    }
    if !stats.priority_machines.is_empty() {
        println!("  Priority machines:");
        for m in &stats.priority_machines {
            println!("    {} {} ({})", category_badge(m.category), m.file_name, m.machine_name);
        }
    }
}

pub fn print_export_paths(paths: &ExportPaths) {
    println!();
    println!("{}", "Exported".bold());
    for path in [&paths.main, &paths.recommendations, &paths.summary] {
        println!("  {}", path.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetgrade_common::RawFacts;

    #[test]
    fn test_record_line_contains_name_and_problems() {
        let record = ClassifiedRecord {
            facts: RawFacts::new("PC-7.htm"),
            category: Category::Upgrade,
            problems: "No SSD installed".to_string(),
            recommendation: "Install an SSD".to_string(),
            last_updated: None,
        };
        let line = record_line(&record);
        assert!(line.contains("PC-7.htm"));
        assert!(line.contains("No SSD installed"));
        assert!(line.contains("[2]"));
    }
}
