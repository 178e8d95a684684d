//! Freeze state of a project's lock configuration
//!
//! Bundler refuses to touch `Gemfile.lock` while `BUNDLE_FROZEN` is set in the
//! project's `.bundle/config`. Relocking therefore has to lift the freeze for the
//! duration of the install/lock calls and put it back afterwards, whatever happens
//! in between. [`with_unfrozen`] does exactly that:
//!
//! ```no_run
//! use relock::{with_unfrozen, ProjectSpec};
//!
//! # fn main() -> relock::Result<()> {
//! let project = ProjectSpec::new("omnibus", vec!["ruby".to_string()], true);
//! with_unfrozen(&project, || {
//!     // resolver calls go here
//!     Ok(())
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::project::ProjectSpec;
use crate::{Error, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Lock configuration file, relative to the project directory
pub const LOCK_CONFIG_PATH: &str = ".bundle/config";

const FROZEN_KEY: &str = "BUNDLE_FROZEN";

/// A project's `.bundle/config`
#[derive(Debug, Clone)]
pub struct LockConfig {
    path: PathBuf,
}

impl LockConfig {
    pub fn for_project<P: AsRef<Path>>(directory: P) -> Self {
        Self {
            path: directory.as_ref().join(LOCK_CONFIG_PATH),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing config file counts as unfrozen
    pub fn is_frozen(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .filter_map(frozen_value)
            .any(|value| value == "true" || value == "1"))
    }

    /// Set or clear the freeze marker, leaving every other setting alone
    pub fn set_frozen(&self, frozen: bool) -> Result<()> {
        let existing = if self.path.exists() {
            Some(fs::read_to_string(&self.path)?)
        } else {
            None
        };

        if existing.is_none() && !frozen {
            return Ok(());
        }

        let marker = format!("{}: \"true\"", FROZEN_KEY);
        let mut lines: Vec<&str> = existing
            .as_deref()
            .unwrap_or("---\n")
            .lines()
            .filter(|line| frozen_value(line).is_none())
            .collect();

        if frozen {
            lines.push(marker.as_str());
        }

        let mut updated = lines.join("\n");
        updated.push('\n');

        if existing.as_deref() == Some(updated.as_str()) {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, updated)?;

        tracing::debug!(path = %self.path.display(), frozen, "updated lock configuration");
        Ok(())
    }
}

/// Value of a `BUNDLE_FROZEN: "..."` line, unquoted
fn frozen_value(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix(FROZEN_KEY)?;
    let value = rest.trim_start().strip_prefix(':')?;
    Some(value.trim().trim_matches(|c| c == '"' || c == '\''))
}

/// Guard over an unfrozen lock configuration
///
/// Call [`restore`](Self::restore) on the normal path to observe restoration
/// errors. If the guard is dropped without it (a panic in the enclosed work),
/// the restoration still runs and any failure is logged.
#[derive(Debug)]
pub struct UnfrozenScope {
    config: LockConfig,
    leave_frozen: bool,
    restored: bool,
}

impl UnfrozenScope {
    pub fn enter(project: &ProjectSpec) -> Result<Self> {
        let config = LockConfig::for_project(&project.directory);

        if config.is_frozen()? {
            tracing::debug!(path = %config.path().display(), "unfreezing");
            config.set_frozen(false)?;
        }

        Ok(Self {
            config,
            leave_frozen: project.leave_frozen,
            restored: false,
        })
    }

    pub fn restore(mut self) -> Result<()> {
        self.restored = true;
        self.config.set_frozen(self.leave_frozen)
    }
}

impl Drop for UnfrozenScope {
    fn drop(&mut self) {
        if self.restored {
            return;
        }

        if let Err(e) = self.config.set_frozen(self.leave_frozen) {
            tracing::warn!(
                path = %self.config.path().display(),
                error = %e,
                "failed to restore lock configuration"
            );
        }
    }
}

/// Run `body` with the project's lock configuration unfrozen
///
/// Afterwards the freeze state is set to `project.leave_frozen`, whether `body`
/// succeeded or not. When both `body` and the restoration fail, the body's error
/// is returned with the restoration error attached.
pub fn with_unfrozen<T, F>(project: &ProjectSpec, body: F) -> Result<T>
where
    F: FnOnce() -> Result<T>,
{
    let scope = UnfrozenScope::enter(project)?;
    let outcome = body();

    match (outcome, scope.restore()) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(restore)) => Err(restore),
        (Err(primary), Ok(())) => Err(primary),
        (Err(primary), Err(restore)) => {
            tracing::warn!(
                directory = %project.directory.display(),
                error = %restore,
                "failed to restore lock configuration after an error"
            );
            Err(Error::RestoreFailed {
                primary: Box::new(primary),
                restore: Box::new(restore),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn frozen_project(temp_dir: &TempDir, leave_frozen: bool) -> ProjectSpec {
        let config = LockConfig::for_project(temp_dir.path());
        fs::create_dir_all(config.path().parent().unwrap()).unwrap();
        fs::write(
            config.path(),
            "---\nBUNDLE_WITHOUT: \"development\"\nBUNDLE_FROZEN: \"true\"\n",
        )
        .unwrap();
        ProjectSpec::new(temp_dir.path(), vec![], leave_frozen)
    }

    #[test]
    fn test_missing_config_is_unfrozen() {
        let temp_dir = TempDir::new().unwrap();
        let config = LockConfig::for_project(temp_dir.path());
        assert!(!config.is_frozen().unwrap());

        // Clearing a missing marker must not create the file
        config.set_frozen(false).unwrap();
        assert!(!config.path().exists());
    }

    #[test]
    fn test_set_frozen_preserves_other_settings() {
        let temp_dir = TempDir::new().unwrap();
        let project = frozen_project(&temp_dir, true);
        let config = LockConfig::for_project(&project.directory);

        config.set_frozen(false).unwrap();
        assert!(!config.is_frozen().unwrap());
        let content = fs::read_to_string(config.path()).unwrap();
        assert_eq!(content, "---\nBUNDLE_WITHOUT: \"development\"\n");

        config.set_frozen(true).unwrap();
        assert!(config.is_frozen().unwrap());
        let content = fs::read_to_string(config.path()).unwrap();
        assert!(content.contains("BUNDLE_WITHOUT"));
    }

    #[test]
    fn test_body_runs_unfrozen_and_refreezes() {
        let temp_dir = TempDir::new().unwrap();
        let project = frozen_project(&temp_dir, true);
        let config = LockConfig::for_project(&project.directory);

        let seen_frozen = Cell::new(true);
        with_unfrozen(&project, || {
            seen_frozen.set(config.is_frozen()?);
            Ok(())
        })
        .unwrap();

        assert!(!seen_frozen.get());
        assert!(config.is_frozen().unwrap());
    }

    #[test]
    fn test_leave_unfrozen() {
        let temp_dir = TempDir::new().unwrap();
        let project = frozen_project(&temp_dir, false);

        with_unfrozen(&project, || Ok(())).unwrap();

        let config = LockConfig::for_project(&project.directory);
        assert!(!config.is_frozen().unwrap());
    }

    #[test]
    fn test_restores_after_body_error() {
        let temp_dir = TempDir::new().unwrap();
        let project = frozen_project(&temp_dir, true);

        let result: Result<()> =
            with_unfrozen(&project, || Err(Error::Other("install failed".to_string())));

        assert!(matches!(result, Err(Error::Other(ref msg)) if msg == "install failed"));
        assert!(LockConfig::for_project(&project.directory)
            .is_frozen()
            .unwrap());
    }

    #[test]
    fn test_restores_after_panic() {
        let temp_dir = TempDir::new().unwrap();
        let project = frozen_project(&temp_dir, true);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = with_unfrozen(&project, || panic!("resolver crashed"));
        }));

        assert!(outcome.is_err());
        assert!(LockConfig::for_project(&project.directory)
            .is_frozen()
            .unwrap());
    }

    #[test]
    fn test_body_error_wins_over_restore_error() {
        let temp_dir = TempDir::new().unwrap();
        // A plain file where the .bundle directory should be makes refreezing fail
        fs::write(temp_dir.path().join(".bundle"), "not a directory").unwrap();
        let project = ProjectSpec::new(temp_dir.path(), vec![], true);

        let err = with_unfrozen(&project, || -> Result<()> {
            Err(Error::Other("lock failed".to_string()))
        })
        .unwrap_err();

        match err {
            Error::RestoreFailed { primary, restore } => {
                assert!(matches!(*primary, Error::Other(ref msg) if msg == "lock failed"));
                assert!(matches!(*restore, Error::Io(_)));
            }
            other => panic!("expected RestoreFailed, got {:?}", other),
        }
    }
}
