//! Parsing of vendor sizes and BIOS dates

use crate::config::DateOrder;
use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:[.,]\d+)?)\s*(ТБ|TB|ГБ|GB|МБ|MB|КБ|KB)").expect("valid size pattern")
});
static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid ISO date pattern"));
static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})[/.\-](\d{1,2})[/.\-](\d{2,4})\b").expect("valid date pattern")
});

/// Size in GB from strings like "16384 MB", "8 ГБ", "1,5 TB"
pub fn parse_size_gb(text: &str) -> Option<f64> {
    let caps = SIZE.captures(text)?;
    let value: f64 = caps.get(1)?.as_str().replace(',', ".").parse().ok()?;
    let unit = caps.get(2)?.as_str().to_uppercase();
    let gb = match unit.as_str() {
        "ТБ" | "TB" => value * 1024.0,
        "ГБ" | "GB" => value,
        "МБ" | "MB" => value / 1024.0,
        "КБ" | "KB" => value / (1024.0 * 1024.0),
        _ => return None,
    };
    Some(gb)
}

/// Result of reading a BIOS date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BiosDate {
    Parsed(NaiveDate),
    /// Both leading fields were 12 or less; read with the configured order
    Ambiguous(NaiveDate),
    Unparseable,
}

impl BiosDate {
    pub fn date(self) -> Option<NaiveDate> {
        match self {
            BiosDate::Parsed(d) | BiosDate::Ambiguous(d) => Some(d),
            BiosDate::Unparseable => None,
        }
    }
}

/// Parse "mm/dd/yyyy", "dd.mm.yy", "yyyy-mm-dd" and similar.
///
/// A field above 12 must be the day. When both are 12 or less the
/// configured order decides and the result is flagged ambiguous.
/// Two-digit years below 70 are 20xx, the rest 19xx.
pub fn parse_bios_date(text: &str, ambiguous_order: DateOrder) -> BiosDate {
    if let Some(caps) = ISO_DATE.captures(text) {
        let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        if let (Some(y), Some(m), Some(d)) = (field(1), field(2), field(3)) {
            if let Some(date) = NaiveDate::from_ymd_opt(y as i32, m, d) {
                return BiosDate::Parsed(date);
            }
        }
    }

    let Some(caps) = NUMERIC_DATE.captures(text) else {
        return BiosDate::Unparseable;
    };
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let (Some(first), Some(second), Some(year_raw)) = (field(1), field(2), field(3)) else {
        return BiosDate::Unparseable;
    };
    let year_len = caps.get(3).map(|m| m.as_str().len()).unwrap_or_default();
    let year = match year_len {
        2 if year_raw < 70 => 2000 + year_raw,
        2 => 1900 + year_raw,
        4 => year_raw,
        _ => return BiosDate::Unparseable,
    };

    let (month, day, ambiguous) = if first > 12 && second <= 12 {
        (second, first, false)
    } else if second > 12 && first <= 12 {
        (first, second, false)
    } else if first <= 12 && second <= 12 {
        let ambiguous = first != second;
        match ambiguous_order {
            DateOrder::MonthFirst => (first, second, ambiguous),
            DateOrder::DayFirst => (second, first, ambiguous),
        }
    } else {
        return BiosDate::Unparseable;
    };

    match NaiveDate::from_ymd_opt(year as i32, month, day) {
        Some(date) if ambiguous => BiosDate::Ambiguous(date),
        Some(date) => BiosDate::Parsed(date),
        None => BiosDate::Unparseable,
    }
}

/// Whole years between `date` and `today`
pub fn age_in_years(date: NaiveDate, today: NaiveDate) -> f64 {
    (today - date).num_days() as f64 / 365.25
}
