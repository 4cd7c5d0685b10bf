//! Issue date (开票日期) extraction.

use chrono::NaiveDate;

use super::patterns::DATE_CN;
use super::{ExtractionMatch, FieldExtractor};

/// Date field extractor for `YYYY年M月D日`.
pub struct DateExtractor;

impl DateExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = ExtractionMatch<NaiveDate>;

    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DATE_CN
            .captures_iter(text)
            .filter_map(|caps| {
                let year: i32 = caps[1].parse().ok()?;
                let month: u32 = caps[2].parse().ok()?;
                let day: u32 = caps[3].parse().ok()?;
                let date = NaiveDate::from_ymd_opt(year, month, day)?;
                let whole = caps.get(0)?;
                Some(ExtractionMatch::new(date, "cn-date", whole.start(), whole.end()))
            })
            .collect()
    }
}

/// First valid date in `text`, formatted `YYYY-MM-DD`.
pub fn extract_date(text: &str) -> Option<String> {
    DateExtractor::new()
        .extract(text)
        .map(|m| format_date(m.value))
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
