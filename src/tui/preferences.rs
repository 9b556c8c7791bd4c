//! Persisted UI preferences.
//!
//! The file is best-effort in both directions: unreadable or unparseable
//! content falls back to defaults, and write failures are logged at debug
//! and otherwise ignored (the UI degrades to defaults next load).

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;

use crate::core::validation::{DEFAULT_PAGE_SIZE, clamp_page_size};
use crate::utils::paths;

/// Smallest sidebar width.
pub const SIDEBAR_MIN_WIDTH: u16 = 240;
/// Largest sidebar width.
pub const SIDEBAR_MAX_WIDTH: u16 = 520;
/// Default sidebar width, also the fallback for out-of-range stored values.
pub const SIDEBAR_DEFAULT_WIDTH: u16 = 320;
/// Step for keyboard resizes.
pub const SIDEBAR_RESIZE_STEP: u16 = 20;

/// Sidebar state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SidebarPrefs {
    /// Preferred expanded width; kept even while collapsed.
    pub width: u16,
    /// Whether the sidebar is collapsed to its narrow form.
    pub collapsed: bool,
}

impl Default for SidebarPrefs {
    fn default() -> Self {
        Self {
            width: SIDEBAR_DEFAULT_WIDTH,
            collapsed: false,
        }
    }
}

/// Lower-priority validation section state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LowerPriorityPrefs {
    /// Whether the section is expanded.
    pub expanded: bool,
    /// Page size; snapped onto {10, 25, 50, 100} on read.
    pub page_size: usize,
}

impl Default for LowerPriorityPrefs {
    fn default() -> Self {
        Self {
            expanded: false,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Everything ragdeck persists across runs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Preferences {
    /// Backend URL override (below the environment variable).
    #[serde(default)]
    pub api_url: Option<String>,

    /// Whether the admin surface was unlocked last run.
    #[serde(default)]
    pub admin_unlocked: bool,

    /// Sidebar state.
    #[serde(default)]
    pub sidebar: SidebarPrefs,

    /// Lower-priority validation section state.
    #[serde(default)]
    pub lower_priority: LowerPriorityPrefs,
}

impl Preferences {
    /// The sidebar width, re-clamped on every read: a stored value
    /// outside [240, 520] reads as the default 320.
    #[must_use]
    pub fn sidebar_width(&self) -> u16 {
        let width = self.sidebar.width;
        if (SIDEBAR_MIN_WIDTH..=SIDEBAR_MAX_WIDTH).contains(&width) {
            width
        } else {
            SIDEBAR_DEFAULT_WIDTH
        }
    }

    /// Resize the sidebar, clamping into range.
    pub fn resize_sidebar(&mut self, delta: i32) {
        let current = i32::from(self.sidebar_width());
        let next = (current + delta).clamp(
            i32::from(SIDEBAR_MIN_WIDTH),
            i32::from(SIDEBAR_MAX_WIDTH),
        );
        self.sidebar.width = u16::try_from(next).unwrap_or(SIDEBAR_DEFAULT_WIDTH);
    }

    /// The lower-priority page size, snapped onto the allowed set.
    #[must_use]
    pub fn lower_priority_page_size(&self) -> usize {
        clamp_page_size(self.lower_priority.page_size)
    }
}

/// Preferences manager with the file path it loads from and saves to.
#[derive(Debug)]
pub struct PreferencesStore {
    /// The loaded preferences.
    pub prefs: Preferences,
    file_path: PathBuf,
}

impl PreferencesStore {
    /// Load preferences from disk or fall back to defaults.
    pub async fn load() -> Self {
        Self::load_from(paths::preferences_path()).await
    }

    async fn load_from(file_path: PathBuf) -> Self {
        let prefs = match fs::read_to_string(&file_path).await {
            Ok(content) => match serde_json::from_str::<Preferences>(&content) {
                Ok(prefs) => prefs,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to parse preferences, using defaults");
                    Preferences::default()
                }
            },
            Err(_) => Preferences::default(),
        };
        Self { prefs, file_path }
    }

    /// Save preferences, ignoring failures.
    pub async fn save_best_effort(&self) {
        if let Err(e) = self.save().await {
            tracing::debug!(error = %e, "preferences save failed");
        }
    }

    async fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(&self.prefs)?;
        fs::write(&self.file_path, content).await?;
        Ok(())
    }
}
