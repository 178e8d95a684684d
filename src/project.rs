//! Sub-projects whose lockfiles get refreshed

use std::path::{Path, PathBuf};

/// One sub-project of the repository tree
///
/// `platforms` lists the extra target platforms merged into the lockfile after
/// the install; an empty list skips the relock calls entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectSpec {
    pub directory: PathBuf,
    pub platforms: Vec<String>,
    pub leave_frozen: bool,
}

impl ProjectSpec {
    pub fn new<P: Into<PathBuf>>(directory: P, platforms: Vec<String>, leave_frozen: bool) -> Self {
        Self {
            directory: directory.into(),
            platforms,
            leave_frozen,
        }
    }

    /// Resolve `directory` against the repository root
    pub fn resolve_in(&self, root: &Path) -> Self {
        Self {
            directory: root.join(&self.directory),
            ..self.clone()
        }
    }

    /// Label used in banners and step names, e.g. `omnibus/Gemfile.lock`
    pub fn lockfile_label(&self, lockfile_name: &str) -> String {
        if self.directory.as_os_str().is_empty() || self.directory == Path::new(".") {
            lockfile_name.to_string()
        } else {
            format!("{}/{}", self.directory.display(), lockfile_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_in_keeps_absolute_paths() {
        let project = ProjectSpec::new("/srv/acceptance", vec![], false);
        let resolved = project.resolve_in(Path::new("/repo"));
        assert_eq!(resolved.directory, PathBuf::from("/srv/acceptance"));
        assert!(!resolved.leave_frozen);
    }

    #[test]
    fn test_lockfile_label() {
        let root = ProjectSpec::new(".", vec![], true);
        assert_eq!(root.lockfile_label("Gemfile.lock"), "Gemfile.lock");

        let omnibus = ProjectSpec::new("omnibus", vec!["ruby".to_string()], true);
        assert_eq!(omnibus.lockfile_label("Gemfile.lock"), "omnibus/Gemfile.lock");
    }
}
