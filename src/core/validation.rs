//! Validation findings: priority partitioning, filtering, and paging.

use std::collections::HashSet;

use crate::api::types::{FindingDto, Severity, ValidationSummaryDto};

/// Reason substrings (lowercase) that promote a finding to high priority
/// regardless of its severity bucket.
const HIGH_PRIORITY_MARKERS: [&str; 9] = [
    "login",
    "cas redirect",
    "malformed_url",
    "401",
    "403",
    "5",
    "parser failed",
    "no content",
    "empty text",
];

/// Page sizes the lower-priority section may use.
pub const PAGE_SIZES: [usize; 4] = [10, 25, 50, 100];

/// Default lower-priority page size.
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Whether a finding renders in the always-visible high-priority section.
#[must_use]
pub fn is_high_priority(finding: &FindingDto) -> bool {
    if finding.severity == Severity::High {
        return true;
    }
    let reason = finding.reason.to_lowercase();
    HIGH_PRIORITY_MARKERS.iter().any(|marker| reason.contains(marker))
}

/// Snap an arbitrary stored page size onto the allowed set.
#[must_use]
pub fn clamp_page_size(size: usize) -> usize {
    if PAGE_SIZES.contains(&size) { size } else { DEFAULT_PAGE_SIZE }
}

/// Severity filter for the expanded lower-priority section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeverityFilter {
    /// Show every lower-priority finding.
    #[default]
    All,
    /// Only medium severity.
    Medium,
    /// Only low severity.
    Low,
}

impl SeverityFilter {
    /// Cycle to the next filter in sequence.
    #[must_use]
    pub fn cycle_next(self) -> Self {
        match self {
            Self::All => Self::Medium,
            Self::Medium => Self::Low,
            Self::Low => Self::All,
        }
    }

    /// Display name for the filter header.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    fn matches(self, finding: &FindingDto) -> bool {
        match self {
            Self::All => true,
            Self::Medium => finding.severity == Severity::Medium,
            Self::Low => finding.severity == Severity::Low,
        }
    }
}

/// One rendered page of lower-priority findings.
#[derive(Debug)]
pub struct LowerPage<'a> {
    /// The rows to render, head-truncated to the page size.
    pub rows: Vec<&'a FindingDto>,
    /// Size of the filtered list before truncation.
    pub total: usize,
}

impl LowerPage<'_> {
    /// `"Showing X of Y"` when the list was truncated.
    #[must_use]
    pub fn truncation_label(&self) -> Option<String> {
        if self.rows.len() < self.total {
            Some(format!("Showing {} of {}", self.rows.len(), self.total))
        } else {
            None
        }
    }
}

/// View state for one validation workspace (crawl or ingest).
#[derive(Debug)]
pub struct ValidationWorkspace {
    /// The latest summary, when fetched.
    pub summary: Option<ValidationSummaryDto>,
    /// Whether the lower-priority section is expanded.
    pub expanded: bool,
    /// Active severity filter for the lower section.
    pub filter: SeverityFilter,
    /// Lower-section page size; always one of [`PAGE_SIZES`].
    pub page_size: usize,
    /// Checked row ids.
    pub selected: HashSet<String>,
    /// Ids already quarantined this session (rendered dimmed with a pill).
    pub quarantined: HashSet<String>,
}

impl Default for ValidationWorkspace {
    fn default() -> Self {
        Self {
            summary: None,
            expanded: false,
            filter: SeverityFilter::All,
            page_size: DEFAULT_PAGE_SIZE,
            selected: HashSet::new(),
            quarantined: HashSet::new(),
        }
    }
}

impl ValidationWorkspace {
    /// Create a workspace with persisted UI state.
    #[must_use]
    pub fn with_ui_state(expanded: bool, page_size: usize) -> Self {
        Self {
            expanded,
            page_size: clamp_page_size(page_size),
            ..Self::default()
        }
    }

    /// Replace the summary, dropping selections that no longer resolve.
    pub fn set_summary(&mut self, summary: ValidationSummaryDto) {
        let ids: HashSet<&str> = summary.findings.iter().map(|f| f.id.as_str()).collect();
        self.selected.retain(|id| ids.contains(id.as_str()));
        self.summary = Some(summary);
    }

    fn findings(&self) -> &[FindingDto] {
        self.summary.as_ref().map_or(&[], |s| s.findings.as_slice())
    }

    /// Findings for the always-visible high-priority section.
    #[must_use]
    pub fn high_priority(&self) -> Vec<&FindingDto> {
        self.findings().iter().filter(|f| is_high_priority(f)).collect()
    }

    /// Lower-priority findings before filter and truncation.
    #[must_use]
    pub fn lower_priority(&self) -> Vec<&FindingDto> {
        self.findings().iter().filter(|f| !is_high_priority(f)).collect()
    }

    /// The rendered page of the lower-priority section.
    #[must_use]
    pub fn lower_page(&self) -> LowerPage<'_> {
        let filtered: Vec<&FindingDto> = self
            .lower_priority()
            .into_iter()
            .filter(|f| self.filter.matches(f))
            .collect();
        let total = filtered.len();
        LowerPage {
            rows: filtered.into_iter().take(self.page_size).collect(),
            total,
        }
    }

    /// Every row currently rendered: the high section plus, when
    /// expanded, the lower page.
    #[must_use]
    pub fn rendered_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.high_priority().iter().map(|f| f.id.clone()).collect();
        if self.expanded {
            ids.extend(self.lower_page().rows.iter().map(|f| f.id.clone()));
        }
        ids
    }

    /// Toggle one row's checkbox.
    pub fn toggle_selected(&mut self, id: &str) {
        if !self.selected.remove(id) {
            self.selected.insert(id.to_owned());
        }
    }

    /// Master toggle over the currently rendered rows only: selects them
    /// all unless they are all already selected, in which case it clears
    /// them.
    pub fn toggle_select_all_rendered(&mut self) {
        let rendered = self.rendered_ids();
        let all_selected = !rendered.is_empty()
            && rendered.iter().all(|id| self.selected.contains(id));
        if all_selected {
            for id in &rendered {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(rendered);
        }
    }

    /// Cycle the page size through the allowed set.
    pub fn cycle_page_size(&mut self) {
        let idx = PAGE_SIZES.iter().position(|&s| s == self.page_size).unwrap_or(0);
        self.page_size = PAGE_SIZES[(idx + 1) % PAGE_SIZES.len()];
    }

    /// Mark a quarantine batch as applied: rows render dimmed with a
    /// `Quarantined` pill and their checkboxes clear.
    pub fn mark_quarantined(&mut self, ids: &[String]) {
        for id in ids {
            self.selected.remove(id);
            self.quarantined.insert(id.clone());
        }
    }

    /// Selected ids in a stable order for the quarantine POST body.
    #[must_use]
    pub fn selected_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.selected.iter().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(id: &str, severity: Severity, reason: &str) -> FindingDto {
        FindingDto {
            id: id.to_owned(),
            url: None,
            title: None,
            severity,
            reason: reason.to_owned(),
        }
    }

    fn summary(findings: Vec<FindingDto>) -> ValidationSummaryDto {
        ValidationSummaryDto {
            findings,
            ..ValidationSummaryDto::default()
        }
    }

    #[test]
    fn severity_high_is_always_high_priority() {
        assert!(is_high_priority(&finding("a", Severity::High, "anything")));
    }

    #[test]
    fn reason_markers_promote_lower_severities() {
        assert!(is_high_priority(&finding("a", Severity::Medium, "403 forbidden")));
        assert!(is_high_priority(&finding("a", Severity::Low, "CAS Redirect loop")));
        assert!(is_high_priority(&finding("a", Severity::Low, "parser failed on frame")));
        assert!(!is_high_priority(&finding("a", Severity::Low, "duplicate")));
        assert!(!is_high_priority(&finding("a", Severity::Medium, "thin content")));
    }

    #[test]
    fn partition_matches_contract_scenario() {
        let mut ws = ValidationWorkspace::default();
        ws.set_summary(summary(vec![
            finding("f1", Severity::High, "403 forbidden"),
            finding("f2", Severity::Medium, "thin content"),
            finding("f3", Severity::Low, "duplicate"),
        ]));

        let high: Vec<&str> = ws.high_priority().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(high, vec!["f1"]);

        let lower: Vec<&str> = ws.lower_priority().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(lower, vec!["f2", "f3"]);

        ws.expanded = true;
        ws.filter = SeverityFilter::Low;
        let page = ws.lower_page();
        assert_eq!(page.rows.len(), 1);
        assert_eq!(page.rows[0].id, "f3");
    }

    #[test]
    fn page_truncates_by_head_and_labels() {
        let mut ws = ValidationWorkspace::default();
        ws.page_size = 10;
        ws.set_summary(summary(
            (0..25)
                .map(|i| finding(&format!("f{i}"), Severity::Low, "dup"))
                .collect(),
        ));

        let page = ws.lower_page();
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.total, 25);
        assert_eq!(page.rows[0].id, "f0", "truncation keeps the head");
        assert_eq!(page.truncation_label().as_deref(), Some("Showing 10 of 25"));

        ws.page_size = 100;
        assert!(ws.lower_page().truncation_label().is_none());
    }

    #[test]
    fn page_size_domain_is_enforced() {
        assert_eq!(clamp_page_size(10), 10);
        assert_eq!(clamp_page_size(100), 100);
        assert_eq!(clamp_page_size(17), DEFAULT_PAGE_SIZE);
        assert_eq!(clamp_page_size(0), DEFAULT_PAGE_SIZE);

        let mut ws = ValidationWorkspace::with_ui_state(true, 999);
        assert_eq!(ws.page_size, DEFAULT_PAGE_SIZE);
        ws.page_size = 10;
        ws.cycle_page_size();
        assert_eq!(ws.page_size, 25);
    }

    #[test]
    fn master_toggle_covers_only_rendered_rows() {
        let mut ws = ValidationWorkspace::default();
        ws.page_size = 10;
        let mut findings = vec![finding("hi", Severity::High, "401")];
        findings.extend((0..15).map(|i| finding(&format!("lo{i}"), Severity::Low, "dup")));
        ws.set_summary(summary(findings));

        // Collapsed: only the high section is rendered
        ws.toggle_select_all_rendered();
        assert_eq!(ws.selected_ids(), vec!["hi".to_owned()]);

        // Expanded: the lower page (10 of 15) joins the selection
        ws.expanded = true;
        ws.toggle_select_all_rendered();
        assert_eq!(ws.selected.len(), 11);
        assert!(!ws.selected.contains("lo14"), "beyond-page rows stay untouched");

        // All rendered selected: the toggle clears them
        ws.toggle_select_all_rendered();
        assert!(ws.selected.is_empty());
    }

    #[test]
    fn quarantine_marks_rows_and_clears_selection() {
        let mut ws = ValidationWorkspace::default();
        ws.set_summary(summary(vec![finding("a", Severity::Low, "dup")]));
        ws.toggle_selected("a");
        ws.mark_quarantined(&["a".to_owned()]);
        assert!(ws.quarantined.contains("a"));
        assert!(ws.selected.is_empty());
    }

    #[test]
    fn stale_selections_drop_on_reload() {
        let mut ws = ValidationWorkspace::default();
        ws.set_summary(summary(vec![finding("a", Severity::Low, "dup")]));
        ws.toggle_selected("a");
        ws.set_summary(summary(vec![finding("b", Severity::Low, "dup")]));
        assert!(ws.selected.is_empty());
    }
}
