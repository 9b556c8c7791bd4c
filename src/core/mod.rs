//! Crawl configuration domain: normalization, rule models, the editable
//! store, validation partitioning, and summary derivation.

/// Canonical forms for URLs, domains, seeds, and rules.
pub mod normalize;
/// Configuration document models (seeds, rules, auth profiles).
pub mod rules;
/// Editable in-memory configuration store.
pub mod store;
/// Crawl summary resolution.
pub mod summary;
/// Validation finding partitioning and paging.
pub mod validation;

pub use normalize::{
    NormalizeError, normalize_allow_rule, normalize_domain_input, normalize_seed,
    normalize_types, normalize_url_row,
};
pub use rules::{
    AllowBlockDoc, AllowRule, AuthProfile, CrawlerConfigDoc, MatchMode, PlaywrightConfig, Seed,
    TypeFlags,
};
pub use store::{AuthIcon, CrawlConfigStore, EditKind, RowStatus};
pub use summary::CrawlSummary;
pub use validation::{SeverityFilter, ValidationWorkspace, is_high_priority};
