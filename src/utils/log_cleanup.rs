use std::path::Path;
use std::time::{Duration, SystemTime};

const DEFAULT_MAX_AGE_DAYS: u64 = 7;

/// Result of log cleanup operation.
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of files successfully removed.
    pub removed: usize,
    /// Files that failed to be removed.
    pub failed: Vec<String>,
}

/// Clean up old log files from the logs directory.
///
/// Removes log files older than `max_age_days` (default: 7 days).
/// Symlinks and non-ragdeck files are skipped.
///
/// Note: This function does not use tracing because it may be called
/// before the tracing subscriber is initialized. The caller should
/// log the results after logging is set up.
///
/// # Arguments
///
/// * `logs_dir` - Path to the logs directory
/// * `max_age_days` - Maximum age in days before files are deleted (None = 7 days)
///
/// # Returns
///
/// A `CleanupResult` with counts and any failures, or an error if the directory couldn't be read.
///
/// # Errors
///
/// Returns an error if the logs directory cannot be read.
pub fn cleanup_old_logs(
    logs_dir: &Path,
    max_age_days: Option<u64>,
) -> anyhow::Result<CleanupResult> {
    let max_age = Duration::from_secs(max_age_days.unwrap_or(DEFAULT_MAX_AGE_DAYS) * 24 * 60 * 60);
    let now = SystemTime::now();
    let mut result = CleanupResult::default();

    let entries = std::fs::read_dir(logs_dir)?;
    for entry in entries.flatten() {
        let path = entry.path();
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");

        // Skip symlinks and non-log files
        if path.is_symlink() || !name.starts_with("ragdeck.") {
            continue;
        }

        // Skip "latest" symlinks by name pattern
        if name.starts_with("latest.") {
            continue;
        }

        // Check file age
        if let Ok(metadata) = entry.metadata() {
            if let Ok(modified) = metadata.modified() {
                if let Ok(age) = now.duration_since(modified) {
                    if age > max_age {
                        if std::fs::remove_file(&path).is_ok() {
                            result.removed += 1;
                        } else {
                            result.failed.push(name.to_owned());
                        }
                    }
                }
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn removes_only_old_ragdeck_logs() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("ragdeck.2000-01-01T00-00-00.log");
        let fresh = dir.path().join("ragdeck.fresh.log");
        let other = dir.path().join("notes.txt");
        for p in [&old, &fresh, &other] {
            fs::write(p, "x").unwrap();
        }

        // Backdate the old file far past the cutoff
        let past = SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60);
        let file = fs::File::options().write(true).open(&old).unwrap();
        file.set_times(fs::FileTimes::new().set_modified(past)).unwrap();

        let result = cleanup_old_logs(dir.path(), Some(7)).unwrap();
        assert_eq!(result.removed, 1, "only the backdated log should go");
        assert!(!old.exists());
        assert!(fresh.exists());
        assert!(other.exists());
    }
}
