//! In-memory editable model for the crawl configuration workspace.
//!
//! The store owns seeds, blocked domains, allow rules, auth profiles,
//! recommendations, and the auth-status overlay. It is mutated only from
//! UI event handlers; background tasks never touch it.

use std::collections::HashMap;
use std::time::Instant;

use crate::api::types::{
    AuthStatusOverlayDto, ProfileAuthStatusDto, RecommendationDto, UiAuthStatus,
};
use crate::api::{ApiClient, ApiError};

use super::normalize::{NormalizeError, normalize_domain_input, normalize_url_row};
use super::rules::{
    AgentsConfigDoc, AllowBlockDoc, AllowRule, AuthProfile, CrawlerConfigDoc, Seed,
};

/// How many recommendations show before the expand toggle.
const RECOMMENDATIONS_COLLAPSED: usize = 3;

/// How long the saved pill stays on a row.
pub const SAVED_PILL_TTL_MS: u128 = 2_000;

/// Which editable collection a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Seeds list.
    Seed,
    /// Blocked domains list.
    Blocked,
    /// Allow rules table.
    Allow,
}

/// Edit state: at most one row per kind is ever in edit mode.
#[derive(Debug, Default)]
pub struct EditState {
    /// Seed row index under edit.
    pub seed: Option<usize>,
    /// Blocked row index under edit.
    pub blocked: Option<usize>,
    /// Allow-rule row index under edit.
    pub allow: Option<usize>,
    /// Auth profile name under edit.
    pub auth_profile: Option<String>,
}

/// Auth-status overlay laid over the allow-rule table for rendering.
#[derive(Debug, Default)]
pub struct AuthStatusOverlay {
    /// Whether the backend can run playwright at all.
    pub playwright_available: bool,
    /// Verdicts keyed by server rule id.
    pub by_rule_id: HashMap<String, UiAuthStatus>,
    /// Verdicts keyed by pattern.
    pub by_pattern: HashMap<String, UiAuthStatus>,
    /// When the overlay was last replaced.
    pub updated_at: Option<Instant>,
}

impl AuthStatusOverlay {
    fn from_dto(dto: AuthStatusOverlayDto) -> Self {
        Self {
            playwright_available: dto.playwright_available,
            by_rule_id: dto
                .by_rule_id
                .into_iter()
                .map(|(k, v)| (k, v.ui_status))
                .collect(),
            by_pattern: dto
                .by_pattern
                .into_iter()
                .map(|(k, v)| (k, v.ui_status))
                .collect(),
            updated_at: Some(Instant::now()),
        }
    }

    /// Verdict for one rule: keyed by id, falling back to pattern.
    #[must_use]
    pub fn status_for(&self, rule: &AllowRule) -> Option<UiAuthStatus> {
        if let Some(id) = &rule.id {
            if let Some(status) = self.by_rule_id.get(id) {
                return Some(*status);
            }
        }
        self.by_pattern.get(&rule.pattern).copied()
    }
}

/// Icon shown in the allow-rule auth column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthIcon {
    /// Profile set but playwright unavailable.
    CannotTest,
    /// Overlay says the profile works.
    Valid,
    /// Overlay says the test failed.
    Invalid,
    /// Auth required but no profile assigned.
    NeedsProfile,
    /// Profile set, no verdict yet.
    Pending,
    /// No profile on this rule.
    NotApplicable,
}

impl AuthIcon {
    /// Glyph for the table cell.
    #[must_use]
    pub fn glyph(self) -> &'static str {
        match self {
            Self::CannotTest => "⚠",
            Self::Valid => "✓",
            Self::Invalid => "✗",
            Self::NeedsProfile => "🔒",
            Self::Pending => "⏳",
            Self::NotApplicable => "—",
        }
    }
}

/// Per-row persistence indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    /// Request in flight.
    Saving,
    /// Saved; cleared about two seconds later.
    Saved,
    /// Save failed; sticky until the next attempt.
    Error(String),
}

#[derive(Debug)]
struct RowStatusCell {
    status: RowStatus,
    since: Instant,
}

/// One loader failure from [`CrawlConfigStore::load_all`].
#[derive(Debug)]
pub struct LoadFailure {
    /// Which document failed.
    pub what: &'static str,
    /// The error.
    pub error: ApiError,
}

/// The crawl configuration store.
#[derive(Debug, Default)]
pub struct CrawlConfigStore {
    /// Crawl seeds, in server order.
    pub seeds: Vec<Seed>,
    /// Blocked domains, in server order.
    pub blocked: Vec<String>,
    /// Allow rules, in server order.
    pub allow_rules: Vec<AllowRule>,
    /// Crawler document (carries the playwright block).
    pub crawler: CrawlerConfigDoc,
    /// Agent prompts document.
    pub agents: AgentsConfigDoc,
    /// Discovery recommendations, ranked.
    pub recommendations: Vec<RecommendationDto>,
    /// Whether the full recommendation list is shown.
    pub recommendations_expanded: bool,
    /// Auth-status overlay for the rule table.
    pub overlay: AuthStatusOverlay,
    /// Per-profile auth test results.
    pub profile_status: HashMap<String, ProfileAuthStatusDto>,
    /// Row edit state.
    pub edit: EditState,
    /// Draft of the seed row under edit.
    pub seed_draft: Option<Seed>,
    /// Draft of the blocked row under edit.
    pub blocked_draft: Option<String>,
    /// Draft of the allow rule under edit.
    pub allow_draft: Option<AllowRule>,
    /// Draft of the auth profile under edit (name, body).
    pub profile_draft: Option<(String, AuthProfile)>,
    row_status: HashMap<String, RowStatusCell>,
}

impl CrawlConfigStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable status key for an allow rule (id when assigned, else pattern).
    #[must_use]
    pub fn rule_key(rule: &AllowRule) -> String {
        rule.id.clone().unwrap_or_else(|| rule.pattern.clone())
    }

    // ------------------------------------------------------------------
    // Loading

    /// Re-fetch every config document.
    ///
    /// Each loader is independent: a failure leaves that slice at its
    /// previous value (the overlay degrades to empty) and is reported,
    /// without invalidating the rest of the store.
    pub async fn load_all(&mut self, client: &ApiClient) -> Vec<LoadFailure> {
        let mut failures = Vec::new();

        match client.get_json::<AllowBlockDoc>("/api/admin/config/allow_block").await {
            Ok(doc) => {
                self.seeds = doc.seeds;
                self.blocked = doc.blocked;
                self.allow_rules = doc.allow_rules;
            }
            Err(error) => failures.push(LoadFailure { what: "allow_block", error }),
        }

        match client.get_json::<AgentsConfigDoc>("/api/admin/config/agents").await {
            Ok(doc) => self.agents = doc,
            Err(error) => failures.push(LoadFailure { what: "agents", error }),
        }

        match client.get_json::<CrawlerConfigDoc>("/api/admin/config/crawler").await {
            Ok(doc) => self.crawler = doc,
            Err(error) => failures.push(LoadFailure { what: "crawler", error }),
        }

        match client
            .get_json::<crate::api::types::RecommendationsResponse>(
                "/api/admin/candidates/recommendations",
            )
            .await
        {
            Ok(resp) => self.recommendations = resp.items,
            Err(error) => failures.push(LoadFailure { what: "recommendations", error }),
        }

        self.refresh_overlay(client).await;

        failures
    }

    /// Re-fetch the auth-status overlay; failure degrades to empty.
    pub async fn refresh_overlay(&mut self, client: &ApiClient) {
        match client
            .get_json::<AuthStatusOverlayDto>("/api/admin/allowed-urls/auth-status")
            .await
        {
            Ok(dto) => self.overlay = AuthStatusOverlay::from_dto(dto),
            Err(e) => {
                tracing::debug!(error = %e, "auth-status overlay unavailable");
                self.overlay = AuthStatusOverlay::default();
            }
        }
    }

    /// Re-fetch per-profile auth test results; failure leaves the cache.
    pub async fn refresh_profile_status(&mut self, client: &ApiClient) {
        match client
            .get_json::<HashMap<String, ProfileAuthStatusDto>>("/api/crawl/auth-status")
            .await
        {
            Ok(map) => self.profile_status = map,
            Err(e) => tracing::debug!(error = %e, "profile auth status unavailable"),
        }
    }

    // ------------------------------------------------------------------
    // Edit state

    /// Enter edit mode on a row, cancelling any in-progress edit of the
    /// same kind and duplicating the current fields into the draft.
    pub fn begin_edit(&mut self, kind: EditKind, index: usize) {
        match kind {
            EditKind::Seed => {
                self.edit.seed = Some(index);
                self.seed_draft = self.seeds.get(index).cloned();
            }
            EditKind::Blocked => {
                self.edit.blocked = Some(index);
                self.blocked_draft = self.blocked.get(index).cloned();
            }
            EditKind::Allow => {
                self.edit.allow = Some(index);
                self.allow_draft = self.allow_rules.get(index).cloned();
            }
        }
    }

    /// Begin editing an auth profile by name.
    pub fn begin_edit_profile(&mut self, name: &str) {
        let body = self
            .crawler
            .playwright
            .auth_profiles
            .get(name)
            .cloned()
            .unwrap_or_default();
        self.edit.auth_profile = Some(name.to_owned());
        self.profile_draft = Some((name.to_owned(), body));
    }

    /// Leave edit mode for a kind, dropping the draft.
    pub fn cancel_edit(&mut self, kind: EditKind) {
        match kind {
            EditKind::Seed => {
                self.edit.seed = None;
                self.seed_draft = None;
            }
            EditKind::Blocked => {
                self.edit.blocked = None;
                self.blocked_draft = None;
            }
            EditKind::Allow => {
                self.edit.allow = None;
                self.allow_draft = None;
            }
        }
    }

    /// Toggle `allow_http` on the allow-rule draft, re-normalizing its
    /// pattern under the new flag.
    pub fn toggle_draft_allow_http(&mut self) {
        if let Some(draft) = &mut self.allow_draft {
            draft.allow_http = !draft.allow_http;
            if let Ok(pattern) = normalize_url_row(&draft.pattern, draft.allow_http) {
                draft.pattern = pattern;
            }
        }
    }

    // ------------------------------------------------------------------
    // Coverage and recommendations

    /// Whether some allow rule already covers the candidate URL.
    ///
    /// Matches against the stored pattern text without re-normalizing;
    /// the recommendation filter depends on agreeing with the save path.
    #[must_use]
    pub fn is_url_already_allowed(&self, candidate: &str) -> bool {
        self.allow_rules.iter().any(|rule| rule.covers(candidate))
    }

    /// Recommendations not yet covered by any allow rule.
    #[must_use]
    pub fn filtered_recommendations(&self) -> Vec<&RecommendationDto> {
        self.recommendations
            .iter()
            .filter(|rec| !self.is_url_already_allowed(&rec.suggested_url))
            .collect()
    }

    /// The visible slice of recommendations plus the hidden count.
    #[must_use]
    pub fn visible_recommendations(&self) -> (Vec<&RecommendationDto>, usize) {
        let filtered = self.filtered_recommendations();
        if self.recommendations_expanded || filtered.len() <= RECOMMENDATIONS_COLLAPSED {
            (filtered, 0)
        } else {
            let hidden = filtered.len() - RECOMMENDATIONS_COLLAPSED;
            (filtered.into_iter().take(RECOMMENDATIONS_COLLAPSED).collect(), hidden)
        }
    }

    /// Build an allow rule from a recommendation: normalized with
    /// `allow_http = false`, observed types carried over, web forced when
    /// nothing was observed.
    #[must_use]
    pub fn rule_from_recommendation(rec: &RecommendationDto) -> AllowRule {
        let pattern =
            normalize_url_row(&rec.suggested_url, false).unwrap_or_else(|_| rec.suggested_url.clone());
        let mut rule = AllowRule::new(pattern);
        rule.types = rec.seen_types.or_web();
        rule
    }

    // ------------------------------------------------------------------
    // Collection edits

    /// Add a seed from raw input.
    ///
    /// # Errors
    ///
    /// Propagates the normalization rejection so the caller can alert and
    /// keep the input for correction. Duplicates are ignored silently.
    pub fn add_seed(&mut self, input: &str, allow_http: bool) -> Result<(), NormalizeError> {
        let url = normalize_url_row(input, allow_http)?;
        if !self.seeds.iter().any(|s| s.url == url) {
            self.seeds.push(Seed { url, allow_http });
        }
        Ok(())
    }

    /// Add a blocked domain from raw input; blank input is a no-op.
    pub fn add_blocked(&mut self, input: &str) {
        let domain = normalize_domain_input(input);
        if domain.is_empty() {
            return;
        }
        if !self.blocked.iter().any(|d| d == &domain) {
            self.blocked.push(domain);
        }
    }

    /// Remove a seed row.
    pub fn remove_seed(&mut self, index: usize) {
        if index < self.seeds.len() {
            self.seeds.remove(index);
            self.cancel_edit(EditKind::Seed);
        }
    }

    /// Remove a blocked row.
    pub fn remove_blocked(&mut self, index: usize) {
        if index < self.blocked.len() {
            self.blocked.remove(index);
            self.cancel_edit(EditKind::Blocked);
        }
    }

    /// Seeds as persisted: sorted lexicographically by URL.
    #[must_use]
    pub fn seeds_for_save(&self) -> Vec<Seed> {
        let mut seeds = self.seeds.clone();
        seeds.sort_by(|a, b| a.url.cmp(&b.url));
        seeds
    }

    /// Display order for a list of keys: case-insensitive lexicographic.
    /// Store order is left untouched.
    #[must_use]
    pub fn display_order<T, F: Fn(&T) -> &str>(items: &[T], key: F) -> Vec<usize> {
        let mut order: Vec<usize> = (0..items.len()).collect();
        order.sort_by_key(|&i| key(&items[i]).to_lowercase());
        order
    }

    // ------------------------------------------------------------------
    // Persistence

    /// Persist seeds, blocked domains, and the allow-rule mirror in one
    /// batch document. Per-row saves remain the primary path for rules.
    ///
    /// # Errors
    ///
    /// Propagates the API error for the caller's panel status.
    pub async fn save_allow_block(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let doc = AllowBlockDoc {
            seeds: self.seeds_for_save(),
            blocked: self.blocked.clone(),
            allow_rules: self.allow_rules.clone(),
            extra: serde_json::Map::new(),
        };
        client.put_json("/api/admin/config/allow_block", &doc).await
    }

    /// Persist the allow-rule draft for a row: PUT when the rule has an
    /// id, POST otherwise. On success the server-assigned id is adopted
    /// and the caller should reload the store.
    ///
    /// The row status cell transitions saving → saved / error; the saved
    /// pill is cleared by [`Self::prune_row_status`] about two seconds
    /// later.
    ///
    /// # Errors
    ///
    /// [`NormalizeError`] when the draft pattern is rejected; the API
    /// error when persistence fails (also recorded on the row).
    pub async fn save_allow_draft(
        &mut self,
        client: &ApiClient,
        index: usize,
    ) -> Result<(), anyhow::Error> {
        let Some(mut draft) = self.allow_draft.clone() else {
            return Ok(());
        };

        draft.pattern = normalize_url_row(&draft.pattern, draft.allow_http)?;
        draft.types = draft.types.or_web();

        let key = Self::rule_key(&draft);
        self.set_row_status(&key, RowStatus::Saving);

        let result: Result<AllowRule, ApiError> = match &draft.id {
            Some(id) => {
                client
                    .put_json_response(&format!("/api/admin/allowed-urls/{id}"), &draft)
                    .await
            }
            None => client.post_json("/api/admin/allowed-urls", &draft).await,
        };

        match result {
            Ok(saved) => {
                self.set_row_status(&Self::rule_key(&saved), RowStatus::Saved);
                if let Some(slot) = self.allow_rules.get_mut(index) {
                    *slot = saved;
                } else {
                    self.allow_rules.push(saved);
                }
                self.cancel_edit(EditKind::Allow);
                Ok(())
            }
            Err(e) => {
                self.set_row_status(&key, RowStatus::Error(e.panel_text()));
                Err(e.into())
            }
        }
    }

    /// Delete a rule row, clearing its status cell.
    ///
    /// # Errors
    ///
    /// Propagates the API error; local state is untouched on failure.
    pub async fn delete_allow_rule(
        &mut self,
        client: &ApiClient,
        index: usize,
    ) -> Result<(), ApiError> {
        let Some(rule) = self.allow_rules.get(index) else {
            return Ok(());
        };
        if let Some(id) = &rule.id {
            client.delete(&format!("/api/admin/allowed-urls/{id}")).await?;
        }
        let key = Self::rule_key(rule);
        self.row_status.remove(&key);
        self.allow_rules.remove(index);
        self.cancel_edit(EditKind::Allow);
        Ok(())
    }

    /// Persist the auth-profile draft immediately.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn save_profile_draft(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        let Some((name, body)) = self.profile_draft.clone() else {
            return Ok(());
        };
        self.crawler
            .playwright
            .auth_profiles
            .insert(name, body);
        self.persist_playwright(client).await?;
        self.edit.auth_profile = None;
        self.profile_draft = None;
        Ok(())
    }

    /// Delete an auth profile and persist immediately.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn delete_profile(
        &mut self,
        client: &ApiClient,
        name: &str,
    ) -> Result<(), ApiError> {
        self.crawler.playwright.auth_profiles.remove(name);
        self.persist_playwright(client).await
    }

    /// Run the legacy migration and persist the rewritten playwright block.
    ///
    /// # Errors
    ///
    /// Propagates the API error; the local migration is rolled into the
    /// next `load_all` either way.
    pub async fn migrate_legacy_profile(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        self.crawler.playwright.migrate_legacy_profile();
        self.persist_playwright(client).await
    }

    async fn persist_playwright(&self, client: &ApiClient) -> Result<(), ApiError> {
        client
            .put_json("/api/admin/playwright-settings", &self.crawler.playwright)
            .await
    }

    /// Run an auth test for a profile, then refresh both status caches.
    ///
    /// # Errors
    ///
    /// Propagates the API error from the test call itself.
    pub async fn test_auth_profile(
        &mut self,
        client: &ApiClient,
        profile_name: &str,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({ "profile_name": profile_name });
        let _: crate::api::types::TestAuthResponse =
            client.post_json("/api/crawl/test-auth", &body).await?;
        self.refresh_profile_status(client).await;
        self.refresh_overlay(client).await;
        Ok(())
    }

    /// Clear the discovery cache behind recommendations.
    ///
    /// # Errors
    ///
    /// Propagates the API error.
    pub async fn purge_candidates(&mut self, client: &ApiClient) -> Result<(), ApiError> {
        client.post_empty("/api/admin/candidates/purge").await?;
        self.recommendations.clear();
        Ok(())
    }

    // ------------------------------------------------------------------
    // Row status

    /// Current status cell for a row key.
    #[must_use]
    pub fn row_status(&self, key: &str) -> Option<&RowStatus> {
        self.row_status.get(key).map(|cell| &cell.status)
    }

    fn set_row_status(&mut self, key: &str, status: RowStatus) {
        self.row_status.insert(
            key.to_owned(),
            RowStatusCell {
                status,
                since: Instant::now(),
            },
        );
    }

    /// Drop saved pills older than ~2 s. Error cells are sticky.
    pub fn prune_row_status(&mut self) {
        self.row_status.retain(|_, cell| match cell.status {
            RowStatus::Saved => cell.since.elapsed().as_millis() < SAVED_PILL_TTL_MS,
            RowStatus::Saving | RowStatus::Error(_) => true,
        });
    }

    // ------------------------------------------------------------------
    // Auth icon

    /// Resolve the auth-status icon for a rule row.
    #[must_use]
    pub fn auth_icon(&self, rule: &AllowRule) -> AuthIcon {
        let has_profile = rule.auth_profile.is_some();
        if has_profile && !self.overlay.playwright_available {
            return AuthIcon::CannotTest;
        }
        match self.overlay.status_for(rule) {
            Some(UiAuthStatus::Valid) => AuthIcon::Valid,
            Some(UiAuthStatus::Invalid) => AuthIcon::Invalid,
            Some(UiAuthStatus::NeedsProfile) => AuthIcon::NeedsProfile,
            Some(UiAuthStatus::CannotTest) => AuthIcon::CannotTest,
            Some(UiAuthStatus::Unknown) | None => {
                if has_profile {
                    AuthIcon::Pending
                } else {
                    AuthIcon::NotApplicable
                }
            }
        }
    }

    /// Whether the legacy-migration banner should show.
    #[must_use]
    pub fn shows_legacy_banner(&self) -> bool {
        self.crawler.playwright.needs_legacy_migration()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rules::{MatchMode, TypeFlags};

    fn rule(pattern: &str) -> AllowRule {
        AllowRule::new(pattern)
    }

    fn rec(url: &str) -> RecommendationDto {
        RecommendationDto {
            suggested_url: url.to_owned(),
            count: 1,
            seen_types: TypeFlags::default(),
        }
    }

    #[test]
    fn edit_state_holds_one_row_per_kind() {
        let mut store = CrawlConfigStore::new();
        store.allow_rules = vec![rule("https://a.com/"), rule("https://b.com/")];
        store.begin_edit(EditKind::Allow, 0);
        assert_eq!(store.allow_draft.as_ref().unwrap().pattern, "https://a.com/");

        store.begin_edit(EditKind::Allow, 1);
        assert_eq!(store.edit.allow, Some(1));
        assert_eq!(
            store.allow_draft.as_ref().unwrap().pattern,
            "https://b.com/",
            "switching rows replaces the draft"
        );
    }

    #[test]
    fn toggling_allow_http_renormalizes_draft_pattern() {
        let mut store = CrawlConfigStore::new();
        store.allow_rules = vec![AllowRule {
            allow_http: true,
            ..rule("http://a.com/")
        }];
        store.begin_edit(EditKind::Allow, 0);

        store.toggle_draft_allow_http();
        let draft = store.allow_draft.as_ref().unwrap();
        assert!(!draft.allow_http);
        assert_eq!(draft.pattern, "https://a.com/");

        store.toggle_draft_allow_http();
        let draft = store.allow_draft.as_ref().unwrap();
        assert!(draft.allow_http);
        // An https pattern stays https when http becomes allowed again
        assert_eq!(draft.pattern, "https://a.com/");
    }

    #[test]
    fn coverage_blocks_recommendations() {
        let mut store = CrawlConfigStore::new();
        store.allow_rules = vec![rule("https://x.com/docs/")];
        store.recommendations = vec![rec("https://x.com/docs/intro/"), rec("https://y.com/")];

        assert!(store.is_url_already_allowed("https://x.com/docs/intro/"));
        let filtered = store.filtered_recommendations();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].suggested_url, "https://y.com/");
    }

    #[test]
    fn exact_rules_do_not_cover_prefixes() {
        let mut store = CrawlConfigStore::new();
        store.allow_rules = vec![AllowRule {
            match_mode: MatchMode::Exact,
            ..rule("https://x.com/docs/")
        }];
        assert!(store.is_url_already_allowed("https://x.com/docs/"));
        assert!(!store.is_url_already_allowed("https://x.com/docs/intro/"));
    }

    #[test]
    fn visible_recommendations_collapse_to_three() {
        let mut store = CrawlConfigStore::new();
        store.recommendations = (0..5).map(|i| rec(&format!("https://r{i}.com/"))).collect();

        let (visible, hidden) = store.visible_recommendations();
        assert_eq!(visible.len(), 3);
        assert_eq!(hidden, 2);

        store.recommendations_expanded = true;
        let (visible, hidden) = store.visible_recommendations();
        assert_eq!(visible.len(), 5);
        assert_eq!(hidden, 0);
    }

    #[test]
    fn rule_from_recommendation_forces_web_when_types_empty() {
        let mut recommendation = rec("http://x.com/docs");
        recommendation.seen_types = TypeFlags {
            web: false,
            pdf: false,
            docx: false,
            xlsx: false,
            pptx: false,
        };
        let rule = CrawlConfigStore::rule_from_recommendation(&recommendation);
        // Normalized under allow_http=false: http downgrades
        assert_eq!(rule.pattern, "https://x.com/docs/");
        assert!(rule.types.web);
        assert!(!rule.allow_http);
    }

    #[test]
    fn add_seed_rejects_bad_scheme_and_keeps_store() {
        let mut store = CrawlConfigStore::new();
        let err = store.add_seed("ftp://x.com", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid scheme \"ftp\". Only http:// and https:// are allowed."
        );
        assert!(store.seeds.is_empty());
    }

    #[test]
    fn add_seed_deduplicates_by_url() {
        let mut store = CrawlConfigStore::new();
        store.add_seed("x.com", false).unwrap();
        store.add_seed("https://x.com/", false).unwrap();
        assert_eq!(store.seeds.len(), 1);
    }

    #[test]
    fn add_blocked_normalizes_domains() {
        let mut store = CrawlConfigStore::new();
        store.add_blocked("https://ads.example/path");
        store.add_blocked("ads.example");
        store.add_blocked("   ");
        assert_eq!(store.blocked, vec!["ads.example".to_owned()]);
    }

    #[test]
    fn seeds_for_save_sorts_lexicographically() {
        let mut store = CrawlConfigStore::new();
        store.add_seed("https://b.com", false).unwrap();
        store.add_seed("https://a.com", false).unwrap();
        let saved = store.seeds_for_save();
        assert_eq!(saved[0].url, "https://a.com/");
        assert_eq!(saved[1].url, "https://b.com/");
        // Store order is untouched
        assert_eq!(store.seeds[0].url, "https://b.com/");
    }

    #[test]
    fn display_order_is_case_insensitive() {
        let items = vec!["Beta.com".to_owned(), "alpha.com".to_owned()];
        let order = CrawlConfigStore::display_order(&items, |s| s.as_str());
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn auth_icon_precedence() {
        let mut store = CrawlConfigStore::new();
        let mut with_profile = rule("https://a.com/");
        with_profile.auth_profile = Some("campus".to_owned());
        with_profile.id = Some("r1".to_owned());
        let without_profile = rule("https://b.com/");

        // playwright unavailable + profile set wins over everything
        store.overlay.playwright_available = false;
        store
            .overlay
            .by_rule_id
            .insert("r1".to_owned(), UiAuthStatus::Valid);
        assert_eq!(store.auth_icon(&with_profile), AuthIcon::CannotTest);

        store.overlay.playwright_available = true;
        assert_eq!(store.auth_icon(&with_profile), AuthIcon::Valid);

        store
            .overlay
            .by_rule_id
            .insert("r1".to_owned(), UiAuthStatus::Invalid);
        assert_eq!(store.auth_icon(&with_profile), AuthIcon::Invalid);

        // profile set with no verdict yet
        store.overlay.by_rule_id.clear();
        assert_eq!(store.auth_icon(&with_profile), AuthIcon::Pending);

        // no profile, no verdict
        assert_eq!(store.auth_icon(&without_profile), AuthIcon::NotApplicable);

        // needs_profile comes from the overlay keyed by pattern
        store
            .overlay
            .by_pattern
            .insert("https://b.com/".to_owned(), UiAuthStatus::NeedsProfile);
        assert_eq!(store.auth_icon(&without_profile), AuthIcon::NeedsProfile);
    }

    #[test]
    fn overlay_falls_back_from_id_to_pattern() {
        let mut overlay = AuthStatusOverlay::default();
        overlay
            .by_pattern
            .insert("https://a.com/".to_owned(), UiAuthStatus::Valid);

        let mut r = rule("https://a.com/");
        assert_eq!(overlay.status_for(&r), Some(UiAuthStatus::Valid));

        r.id = Some("r9".to_owned());
        assert_eq!(
            overlay.status_for(&r),
            Some(UiAuthStatus::Valid),
            "missing id entry falls back to pattern"
        );

        overlay.by_rule_id.insert("r9".to_owned(), UiAuthStatus::Invalid);
        assert_eq!(overlay.status_for(&r), Some(UiAuthStatus::Invalid));
    }

    #[test]
    fn saved_pill_expires_but_errors_stick() {
        let mut store = CrawlConfigStore::new();
        store.set_row_status("r1", RowStatus::Saved);
        store.set_row_status("r2", RowStatus::Error("boom".to_owned()));

        // Fresh saved pill survives a prune
        store.prune_row_status();
        assert!(store.row_status("r1").is_some());

        // Backdate the saved cell past the TTL
        if let Some(cell) = store.row_status.get_mut("r1") {
            cell.since = Instant::now() - std::time::Duration::from_millis(2_500);
        }
        store.prune_row_status();
        assert!(store.row_status("r1").is_none());
        assert!(matches!(store.row_status("r2"), Some(RowStatus::Error(_))));
    }
}
