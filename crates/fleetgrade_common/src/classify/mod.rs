//! Health classifier
//!
//! `(RawFacts, RuleConfig) -> (category, problems)`. A failing drive
//! short-circuits to category 1. Otherwise every rule is evaluated and the
//! worst tier that fired decides the category. Problem text is the sorted,
//! deduplicated set of finding messages so output is stable for diffing.

pub mod rules;
pub mod units;

pub use rules::{Comparator, FactField, FactView, Finding, RuleSet, RuleSpec, Tier};
pub use units::{parse_bios_date, parse_size_gb, BiosDate};

use crate::config::RuleConfig;
use crate::diagnostics::{DiagnosticKind, DiagnosticSink};
use crate::facts::{is_found, Category, ClassifiedRecord, RawFacts, SmartStatus, HEALTHY_MESSAGE, LIST_SEPARATOR};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Rule id attached to carried-forward SMART findings
pub const RULE_SMART: &str = "smart";

pub const FULL_REPLACEMENT: &str = "Full replacement";
pub const REPLACE_DISK: &str = "Replace disk";
const CRITICAL_DISK_FAILURE: &str = "Critical disk failure";
const SMART_WARNINGS: &str = "SMART warnings reported";
const CHECK_DISK: &str = "Back up data and monitor the disk";

/// Outcome of classifying one machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: Category,
    /// Sorted and deduplicated by message
    pub findings: Vec<Finding>,
    pub problems: String,
    pub recommendation: String,
}

/// Applies the rule table to extracted facts
pub struct Classifier {
    config: Arc<RuleConfig>,
    rules: RuleSet,
    sink: Arc<dyn DiagnosticSink>,
    today: NaiveDate,
}

impl Classifier {
    pub fn new(config: Arc<RuleConfig>, sink: Arc<dyn DiagnosticSink>) -> Self {
        let rules = RuleSet::from_config(&config);
        Self {
            config,
            rules,
            sink,
            today: Local::now().date_naive(),
        }
    }

    /// Measure BIOS age against a fixed date instead of today
    pub fn with_reference_date(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn classify(&self, facts: &RawFacts) -> Classification {
        if facts.smart_status == SmartStatus::Bad {
            let messages = if facts.smart_problem_details.is_empty() {
                vec![CRITICAL_DISK_FAILURE.to_string()]
            } else {
                facts.smart_problem_details.clone()
            };
            let findings = messages
                .into_iter()
                .map(|message| Finding {
                    rule_id: RULE_SMART.to_string(),
                    tier: Tier::Critical,
                    message,
                    remedy: Some(REPLACE_DISK.to_string()),
                })
                .collect();
            return finish(Category::Critical, findings, REPLACE_DISK.to_string());
        }

        let view = FactView {
            facts,
            total_ram_gb: self.total_ram_gb(facts),
            bios_date: self.bios_date(facts),
            today: self.today,
        };
        let mut findings = self.rules.evaluate(&view);

        if facts.smart_status == SmartStatus::Ok {
            let warnings = if facts.smart_problem_details.is_empty() {
                vec![SMART_WARNINGS.to_string()]
            } else {
                facts.smart_problem_details.clone()
            };
            findings.extend(warnings.into_iter().map(|message| Finding {
                rule_id: RULE_SMART.to_string(),
                tier: Tier::Upgrade,
                message,
                remedy: Some(CHECK_DISK.to_string()),
            }));
        }

        if findings.iter().any(|f| f.tier == Tier::Critical) {
            finish(Category::Critical, findings, FULL_REPLACEMENT.to_string())
        } else if !findings.is_empty() {
            let remedies: BTreeSet<&str> = findings.iter().filter_map(|f| f.remedy.as_deref()).collect();
            let recommendation = remedies.into_iter().collect::<Vec<_>>().join(", ");
            finish(Category::Upgrade, findings, recommendation)
        } else {
            finish(Category::Healthy, Vec::new(), String::new())
        }
    }

    /// Classify and attach the result to the facts
    pub fn classify_record(&self, facts: RawFacts) -> ClassifiedRecord {
        let classification = self.classify(&facts);
        ClassifiedRecord {
            facts,
            category: classification.category,
            problems: classification.problems,
            recommendation: classification.recommendation,
            last_updated: None,
        }
    }

    fn total_ram_gb(&self, facts: &RawFacts) -> Option<f64> {
        if !is_found(&facts.total_ram_text) {
            return None;
        }
        let parsed = parse_size_gb(&facts.total_ram_text);
        if parsed.is_none() {
            self.sink.warn(
                DiagnosticKind::UnparseableNumeric,
                &facts.file_name,
                format!("cannot read RAM size from '{}', RAM rules skipped", facts.total_ram_text),
            );
        }
        parsed
    }

    fn bios_date(&self, facts: &RawFacts) -> Option<NaiveDate> {
        if !is_found(&facts.bios_date_text) {
            return None;
        }
        let order = self.config.analysis.ambiguous_date_order;
        match parse_bios_date(&facts.bios_date_text, order) {
            BiosDate::Parsed(date) => Some(date),
            BiosDate::Ambiguous(date) => {
                self.sink.warn(
                    DiagnosticKind::AmbiguousDate,
                    &facts.file_name,
                    format!("BIOS date '{}' is ambiguous, read as {}", facts.bios_date_text, date),
                );
                Some(date)
            }
            BiosDate::Unparseable => {
                self.sink.warn(
                    DiagnosticKind::UnparseableNumeric,
                    &facts.file_name,
                    format!("cannot read BIOS date '{}', age rule skipped", facts.bios_date_text),
                );
                None
            }
        }
    }
}

/// Sort and deduplicate findings, then render the problem text
fn finish(category: Category, mut findings: Vec<Finding>, recommendation: String) -> Classification {
    findings.sort_by(|a, b| a.message.cmp(&b.message).then_with(|| a.rule_id.cmp(&b.rule_id)));
    findings.dedup_by(|a, b| a.message == b.message);

    let problems = if findings.is_empty() {
        HEALTHY_MESSAGE.to_string()
    } else {
        findings
            .iter()
            .map(|f| f.message.as_str())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR)
    };

    Classification {
        category,
        findings,
        problems,
        recommendation,
    }
}
