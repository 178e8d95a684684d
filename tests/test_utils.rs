//! Test utilities and helpers for relock integration tests.
//!
//! This module provides a throwaway repository layout (primary Gemfile plus
//! `omnibus/` and `acceptance/` sub-projects) and assertions on its files.

#![allow(dead_code)]

use relock::LockConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Primary Gemfile with a git-sourced gem that follows the stable channel
pub const GEMFILE: &str = r#"source "https://rubygems.org"

gem "chef", github: "chef/chef", branch: "v15.8.23"
gem "chef-zero"
"#;

/// Sub-project Gemfile
pub const PROJECT_GEMFILE: &str = "source \"https://rubygems.org\"\n\ngem \"omnibus\"\n";

/// A repository tree in a temporary directory
pub struct TestRepo {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl TestRepo {
    /// Repository with a frozen root and frozen `omnibus/`, unfrozen `acceptance/`
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().to_path_buf();

        fs::write(root.join("Gemfile"), GEMFILE).expect("Failed to write Gemfile");
        for project in ["omnibus", "acceptance"] {
            let dir = root.join(project);
            fs::create_dir_all(&dir).expect("Failed to create project directory");
            fs::write(dir.join("Gemfile"), PROJECT_GEMFILE).expect("Failed to write Gemfile");
            fs::write(dir.join("Gemfile.lock"), "GEM\n  specs:\n").expect("Failed to write lockfile");
        }

        let repo = Self { temp_dir, root };
        repo.freeze(".");
        repo.freeze("omnibus");
        repo
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.root.join("relock.toml"), content).expect("Failed to write relock.toml");
    }

    pub fn freeze(&self, project: &str) {
        LockConfig::for_project(self.root.join(project))
            .set_frozen(true)
            .expect("Failed to freeze project");
    }

    pub fn is_frozen(&self, project: &str) -> bool {
        LockConfig::for_project(self.root.join(project))
            .is_frozen()
            .expect("Failed to read lock configuration")
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.root.join(relative))
            .unwrap_or_else(|_| panic!("Failed to read {}", relative))
    }
}

impl Default for TestRepo {
    fn default() -> Self {
        Self::new()
    }
}

/// Channel metadata response announcing `version`
pub fn channel_metadata(version: &str) -> String {
    format!(
        "sha256\tdeadbeef\nurl\thttps://packages.chef.io/files/stable/chef/{0}/chef_{0}-1_amd64.deb\nversion\t{0}\n",
        version
    )
}

/// Assertions for test results
pub mod assertions {
    use std::path::Path;

    /// Assert that a file contains a specific string
    pub fn file_contains(path: &Path, expected: &str) {
        let content = std::fs::read_to_string(path)
            .unwrap_or_else(|_| panic!("Failed to read file: {:?}", path));
        assert!(
            content.contains(expected),
            "File {:?} should contain '{}', but content was:\n{}",
            path,
            expected,
            content
        );
    }

    /// Assert file does not exist
    pub fn file_not_exists(path: &Path) {
        assert!(!path.exists(), "File should not exist: {:?}", path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repo_layout() {
        let repo = TestRepo::new();
        assert!(repo.path().join("Gemfile").exists());
        assert!(repo.path().join("omnibus/Gemfile.lock").exists());
        assert!(repo.is_frozen("."));
        assert!(repo.is_frozen("omnibus"));
        assert!(!repo.is_frozen("acceptance"));
    }

    #[test]
    fn test_channel_metadata() {
        let body = channel_metadata("16.1.0");
        assert!(body.ends_with("version\t16.1.0\n"));
    }
}
