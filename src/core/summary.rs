//! Crawl summary derivation.
//!
//! The server emits either a nested breakdown (`skipped`, `errors_by_class`)
//! or the same counters as legacy flat fields. This module resolves both
//! into one shape the summary panel and the log pill bar render from.

use crate::api::types::{CrawlSummaryDto, ErrorDetailDto, ErrorsByClassDto, SkippedCountsDto};

/// Resolved crawl summary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    /// Pages captured.
    pub captured: u64,
    /// Total errors.
    pub errors: u64,
    /// Skip breakdown.
    pub skipped: SkippedCountsDto,
    /// Error breakdown by class.
    pub errors_by_class: ErrorsByClassDto,
    /// Per-URL error rows.
    pub error_details: Vec<ErrorDetailDto>,
}

impl CrawlSummary {
    /// Resolve a wire summary, preferring nested fields and falling back
    /// to the legacy flat counters.
    #[must_use]
    pub fn from_wire(dto: CrawlSummaryDto) -> Self {
        let skipped = dto.skipped.unwrap_or(SkippedCountsDto {
            already_processed: dto.already_processed.unwrap_or(0),
            depth_exceeded: dto.depth_exceeded.unwrap_or(0),
            not_allowed: dto.not_allowed.unwrap_or(0),
            auth_required: dto.auth_required.unwrap_or(0),
            non_html: dto.non_html.unwrap_or(0),
        });

        Self {
            captured: dto.captured.unwrap_or(0),
            errors: dto.errors.unwrap_or(0),
            skipped,
            errors_by_class: dto.errors_by_class.unwrap_or_default(),
            error_details: dto.error_details,
        }
    }

    /// Total skipped across all reasons.
    #[must_use]
    pub fn skipped_total(&self) -> u64 {
        let s = self.skipped;
        s.already_processed + s.depth_exceeded + s.not_allowed + s.auth_required + s.non_html
    }

    /// The pill bar shown above the crawl log: captured, errors, skipped.
    #[must_use]
    pub fn pills(&self) -> Vec<(String, String)> {
        vec![
            ("Captured".to_owned(), self.captured.to_string()),
            ("Errors".to_owned(), self.errors.to_string()),
            ("Skipped".to_owned(), self.skipped_total().to_string()),
        ]
    }

    /// Skip rows with non-zero counts, labeled for the detail panel.
    #[must_use]
    pub fn skip_rows(&self) -> Vec<(&'static str, u64)> {
        let s = self.skipped;
        [
            ("already processed", s.already_processed),
            ("depth exceeded", s.depth_exceeded),
            ("not allowed", s.not_allowed),
            ("auth required", s.auth_required),
            ("non-HTML", s.non_html),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }

    /// Error-class rows with non-zero counts.
    #[must_use]
    pub fn error_rows(&self) -> Vec<(&'static str, u64)> {
        let e = self.errors_by_class;
        [
            ("4xx", e.client),
            ("5xx", e.server),
            ("network timeout", e.network_timeout),
            ("other", e.other),
        ]
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_fields_win_over_flat() {
        let dto: CrawlSummaryDto = serde_json::from_str(
            r#"{"captured": 5, "errors": 0,
                "skipped": {"already_processed": 2},
                "already_processed": 99}"#,
        )
        .unwrap();
        let summary = CrawlSummary::from_wire(dto);
        assert_eq!(summary.captured, 5);
        assert_eq!(summary.skipped.already_processed, 2);
        assert_eq!(summary.skipped_total(), 2);
    }

    #[test]
    fn legacy_flat_fields_fill_the_breakdown() {
        let dto: CrawlSummaryDto = serde_json::from_str(
            r#"{"captured": 3, "errors": 1, "already_processed": 2, "non_html": 4}"#,
        )
        .unwrap();
        let summary = CrawlSummary::from_wire(dto);
        assert_eq!(summary.skipped.already_processed, 2);
        assert_eq!(summary.skipped.non_html, 4);
        assert_eq!(summary.skipped_total(), 6);
    }

    #[test]
    fn pills_match_happy_path_scenario() {
        let dto: CrawlSummaryDto = serde_json::from_str(
            r#"{"captured": 5, "errors": 0, "skipped": {"already_processed": 2}}"#,
        )
        .unwrap();
        let pills = CrawlSummary::from_wire(dto).pills();
        assert_eq!(
            pills,
            vec![
                ("Captured".to_owned(), "5".to_owned()),
                ("Errors".to_owned(), "0".to_owned()),
                ("Skipped".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn zero_rows_are_hidden_in_breakdowns() {
        let summary = CrawlSummary::from_wire(CrawlSummaryDto::default());
        assert!(summary.skip_rows().is_empty());
        assert!(summary.error_rows().is_empty());
    }
}
