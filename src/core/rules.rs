//! Crawl configuration documents: seeds, blocked domains, allow rules,
//! and playwright auth profiles.
//!
//! Deserialization is deliberately lenient: string shorthands and legacy
//! key names still parse, and unknown sibling keys are preserved so a
//! read-modify-write round trip never drops server-side fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Canonical name written for a profile migrated from legacy flat fields.
pub const LEGACY_PROFILE_NAME: &str = "legacy_migrated";

/// Reserved default profile name; read as a legacy-migrated synonym.
pub const DEFAULT_PROFILE_NAME: &str = "default";

/// Per-rule document-type flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeFlags {
    /// HTML pages.
    #[serde(default = "default_true")]
    pub web: bool,
    /// PDF documents.
    #[serde(default)]
    pub pdf: bool,
    /// Word documents.
    #[serde(default)]
    pub docx: bool,
    /// Spreadsheets.
    #[serde(default)]
    pub xlsx: bool,
    /// Presentations.
    #[serde(default)]
    pub pptx: bool,
}

fn default_true() -> bool {
    true
}

impl Default for TypeFlags {
    fn default() -> Self {
        Self {
            web: true,
            pdf: false,
            docx: false,
            xlsx: false,
            pptx: false,
        }
    }
}

impl TypeFlags {
    /// Whether any flag is set.
    #[must_use]
    pub fn any(self) -> bool {
        self.web || self.pdf || self.docx || self.xlsx || self.pptx
    }

    /// The save invariant: an all-false set persists as web-only.
    #[must_use]
    pub fn or_web(self) -> Self {
        if self.any() { self } else { Self { web: true, ..self } }
    }
}

/// Pattern matching mode for an allow rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum MatchMode {
    /// The pattern allows every URL it prefixes.
    #[default]
    Prefix,
    /// The pattern allows exactly one URL.
    Exact,
}

impl From<String> for MatchMode {
    fn from(s: String) -> Self {
        if s.eq_ignore_ascii_case("exact") { Self::Exact } else { Self::Prefix }
    }
}

/// One allow rule: a URL pattern the crawler may fetch under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAllowRule")]
pub struct AllowRule {
    /// Server-assigned identifier; `None` until first persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Normalized URL pattern.
    pub pattern: String,

    /// Matching mode.
    #[serde(rename = "match")]
    pub match_mode: MatchMode,

    /// Document types to fetch under this rule.
    pub types: TypeFlags,

    /// Whether plain http is acceptable for this pattern.
    pub allow_http: bool,

    /// Auth profile used to crawl this pattern, if any.
    pub auth_profile: Option<String>,
}

impl AllowRule {
    /// A fresh rule for the given pattern with defaulted fields.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            id: None,
            pattern: pattern.into(),
            match_mode: MatchMode::Prefix,
            types: TypeFlags::default(),
            allow_http: false,
            auth_profile: None,
        }
    }

    /// Whether this rule covers the candidate URL.
    ///
    /// The comparison runs against the stored pattern text on purpose:
    /// the recommendation filter must agree with what the save path wrote.
    #[must_use]
    pub fn covers(&self, candidate: &str) -> bool {
        match self.match_mode {
            MatchMode::Exact => candidate == self.pattern,
            MatchMode::Prefix => candidate.starts_with(self.pattern.as_str()),
        }
    }
}

/// Lenient wire form of an allow rule.
///
/// Accepts a bare string (pattern shorthand) or an object with current or
/// legacy keys.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawAllowRule {
    Pattern(String),
    Rule {
        #[serde(default)]
        id: Option<String>,
        #[serde(default, alias = "url", alias = "prefix")]
        pattern: String,
        #[serde(default, rename = "match", alias = "match_mode")]
        match_mode: MatchMode,
        #[serde(default)]
        types: Option<TypeFlags>,
        #[serde(default, alias = "allowHttp")]
        allow_http: bool,
        #[serde(default, alias = "authProfile")]
        auth_profile: Option<String>,
    },
}

impl From<RawAllowRule> for AllowRule {
    fn from(raw: RawAllowRule) -> Self {
        match raw {
            RawAllowRule::Pattern(pattern) => Self::new(pattern),
            RawAllowRule::Rule {
                id,
                pattern,
                match_mode,
                types,
                allow_http,
                auth_profile,
            } => Self {
                id,
                pattern,
                match_mode,
                types: types.unwrap_or_default(),
                allow_http,
                auth_profile: auth_profile.filter(|p| !p.is_empty()),
            },
        }
    }
}

/// One crawl seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawSeed")]
pub struct Seed {
    /// Normalized starting URL.
    pub url: String,

    /// Whether plain http is acceptable for this seed.
    pub allow_http: bool,
}

/// Lenient wire form of a seed: bare string or object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawSeed {
    Url(String),
    Seed {
        #[serde(default)]
        url: String,
        #[serde(default, alias = "allowHttp")]
        allow_http: bool,
    },
}

impl From<RawSeed> for Seed {
    fn from(raw: RawSeed) -> Self {
        match raw {
            RawSeed::Url(url) => Self {
                url,
                allow_http: false,
            },
            RawSeed::Seed { url, allow_http } => Self { url, allow_http },
        }
    }
}

/// The seeds/blocked/allow-rules document behind
/// `/api/admin/config/allow_block`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowBlockDoc {
    /// Crawl starting points, sorted lexicographically on save.
    #[serde(default)]
    pub seeds: Vec<Seed>,

    /// Domains the crawler must never touch.
    #[serde(default, alias = "blocked_domains")]
    pub blocked: Vec<String>,

    /// Allow rules; mirrored here for legacy consumers, but persisted
    /// per-row through `/api/admin/allowed-urls`.
    #[serde(default, alias = "allowed_urls")]
    pub allow_rules: Vec<AllowRule>,

    /// Server-side fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A named playwright storage-state profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProfile {
    /// Path to the serialized browser storage state.
    #[serde(default)]
    pub storage_state_path: String,

    /// URL fetched to verify the stored state still works.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_url: Option<String>,

    /// URL an interactive capture session starts at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_url: Option<String>,

    /// Domains this profile should be applied to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_for_domains: Option<Vec<String>>,
}

/// The `playwright` block of the crawler config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaywrightConfig {
    /// Named auth profiles. A `BTreeMap` keeps serialization order stable.
    #[serde(default)]
    pub auth_profiles: BTreeMap<String, AuthProfile>,

    /// Legacy flat field, superseded by `auth_profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_state_path: Option<String>,

    /// Legacy flat field, superseded by `auth_profiles`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_for_domains: Option<Vec<String>>,

    /// Server-side fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlaywrightConfig {
    /// Whether the block still carries un-migrated legacy flat fields.
    ///
    /// True iff a flat `storage_state_path` or `use_for_domains` is present
    /// and no profiles exist; this condition also gates the migration
    /// banner.
    #[must_use]
    pub fn needs_legacy_migration(&self) -> bool {
        (self.storage_state_path.is_some() || self.use_for_domains.is_some())
            && self.auth_profiles.is_empty()
    }

    /// Whether a profile name denotes the legacy-migrated profile.
    #[must_use]
    pub fn is_legacy_name(name: &str) -> bool {
        name == LEGACY_PROFILE_NAME || name == DEFAULT_PROFILE_NAME
    }

    /// Move the legacy flat fields into a `legacy_migrated` profile.
    ///
    /// No-op when [`Self::needs_legacy_migration`] is false.
    pub fn migrate_legacy_profile(&mut self) {
        if !self.needs_legacy_migration() {
            return;
        }
        let profile = AuthProfile {
            storage_state_path: self.storage_state_path.take().unwrap_or_default(),
            test_url: None,
            start_url: None,
            use_for_domains: self.use_for_domains.take(),
        };
        self.auth_profiles
            .insert(LEGACY_PROFILE_NAME.to_owned(), profile);
    }
}

/// The crawler configuration document behind `/api/admin/config/crawler`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlerConfigDoc {
    /// Browser-automation settings including auth profiles.
    #[serde(default)]
    pub playwright: PlaywrightConfig,

    /// Server-side fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The four agent system prompts behind `/api/admin/config/agents`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentsConfigDoc {
    /// Intent-detection prompt.
    #[serde(default)]
    pub intent: Option<String>,
    /// Research prompt.
    #[serde(default)]
    pub research: Option<String>,
    /// Synthesis prompt.
    #[serde(default)]
    pub synthesis: Option<String>,
    /// Validation prompt.
    #[serde(default)]
    pub validation: Option<String>,

    /// Server-side fields this client does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_rule_accepts_string_shorthand() {
        let rule: AllowRule = serde_json::from_str(r#""https://x.com/""#).unwrap();
        assert_eq!(rule.pattern, "https://x.com/");
        assert_eq!(rule.match_mode, MatchMode::Prefix);
        assert!(!rule.allow_http);
        assert!(rule.types.web);
    }

    #[test]
    fn allow_rule_accepts_legacy_keys() {
        let rule: AllowRule = serde_json::from_str(
            r#"{"pattern": "https://x.com/", "authProfile": "campus", "match": "exact"}"#,
        )
        .unwrap();
        assert_eq!(rule.auth_profile.as_deref(), Some("campus"));
        assert_eq!(rule.match_mode, MatchMode::Exact);
    }

    #[test]
    fn allow_rule_empty_profile_reads_as_none() {
        let rule: AllowRule =
            serde_json::from_str(r#"{"pattern": "https://x.com/", "auth_profile": ""}"#).unwrap();
        assert_eq!(rule.auth_profile, None);
    }

    #[test]
    fn allow_rule_serializes_match_key() {
        let rule = AllowRule::new("https://x.com/");
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["match"], "prefix");
        assert!(json.get("id").is_none(), "unsaved rules omit id");
    }

    #[test]
    fn seed_accepts_string_and_object() {
        let seed: Seed = serde_json::from_str(r#""https://x.com/""#).unwrap();
        assert!(!seed.allow_http);

        let seed: Seed =
            serde_json::from_str(r#"{"url": "http://x.com/", "allow_http": true}"#).unwrap();
        assert!(seed.allow_http);
    }

    #[test]
    fn coverage_respects_match_mode() {
        let mut rule = AllowRule::new("https://x.com/docs/");
        assert!(rule.covers("https://x.com/docs/intro/"));
        assert!(rule.covers("https://x.com/docs/"));
        assert!(!rule.covers("https://x.com/blog/"));

        rule.match_mode = MatchMode::Exact;
        assert!(rule.covers("https://x.com/docs/"));
        assert!(!rule.covers("https://x.com/docs/intro/"));
    }

    #[test]
    fn allow_block_doc_round_trips_unknown_fields() {
        let doc: AllowBlockDoc = serde_json::from_str(
            r#"{"seeds": ["https://x.com/"], "blocked": ["ads.example"],
                "allow_rules": [], "max_depth": 4}"#,
        )
        .unwrap();
        assert_eq!(doc.seeds.len(), 1);
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["max_depth"], 4);
    }

    #[test]
    fn legacy_migration_condition_and_effect() {
        let mut pw: PlaywrightConfig = serde_json::from_str(
            r#"{"storage_state_path": "/tmp/state.json", "use_for_domains": ["x.com"]}"#,
        )
        .unwrap();
        assert!(pw.needs_legacy_migration());

        pw.migrate_legacy_profile();
        assert!(!pw.needs_legacy_migration());
        let profile = pw.auth_profiles.get(LEGACY_PROFILE_NAME).unwrap();
        assert_eq!(profile.storage_state_path, "/tmp/state.json");
        assert_eq!(profile.use_for_domains.as_deref(), Some(&["x.com".to_owned()][..]));
        assert!(pw.storage_state_path.is_none(), "flat fields are consumed");
    }

    #[test]
    fn migration_is_noop_when_profiles_exist() {
        let mut pw: PlaywrightConfig = serde_json::from_str(
            r#"{"storage_state_path": "/tmp/state.json",
                "auth_profiles": {"campus": {"storage_state_path": "/tmp/campus.json"}}}"#,
        )
        .unwrap();
        assert!(!pw.needs_legacy_migration());
        pw.migrate_legacy_profile();
        assert!(!pw.auth_profiles.contains_key(LEGACY_PROFILE_NAME));
    }

    #[test]
    fn legacy_profile_names_are_synonyms() {
        assert!(PlaywrightConfig::is_legacy_name("legacy_migrated"));
        assert!(PlaywrightConfig::is_legacy_name("default"));
        assert!(!PlaywrightConfig::is_legacy_name("campus"));
    }
}
