use std::path::PathBuf;

/// Get the base directory for ragdeck data
///
/// # Panics
///
/// Panics if the home directory cannot be determined.
#[must_use]
pub fn base_dir() -> PathBuf {
    #[expect(clippy::expect_used, reason = "home directory is required for operation")]
    dirs::home_dir()
        .expect("Could not find home directory")
        .join(".ragdeck")
}

/// Get the directory for log files
#[must_use]
pub fn logs_dir() -> PathBuf {
    base_dir().join("logs")
}

/// Get the path to the persisted UI preferences file
/// (~/.config/ragdeck/preferences.json)
#[must_use]
pub fn preferences_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| base_dir().join("config"))
        .join("ragdeck")
        .join("preferences.json")
}

/// Get the directory where exported attachments are written.
///
/// Resolution order: `RAGDECK_DOWNLOAD_DIR`, the platform download
/// directory, then `~/.ragdeck/downloads`.
#[must_use]
pub fn downloads_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("RAGDECK_DOWNLOAD_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::download_dir().unwrap_or_else(|| base_dir().join("downloads"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferences_path_is_namespaced() {
        let path = preferences_path();
        assert!(path.to_string_lossy().contains("ragdeck"));
        assert!(path.to_string_lossy().ends_with("preferences.json"));
    }
}
