//! Repository configuration (`relock.toml`)
//!
//! Everything the update pipeline needs is declared here: the resolver command,
//! the sub-projects to relock, the stable-channel pins and the override tables.
//! Nothing is global; the loaded [`Config`] is handed to the
//! [`Orchestrator`](crate::Orchestrator) explicitly.
//!
//! # Examples
//!
//! ```no_run
//! use relock::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load()?;
//!
//! for project in config.project_specs() {
//!     println!("{} -> {:?}", project.directory.display(), project.platforms);
//! }
//! # Ok(())
//! # }
//! ```

use crate::overrides::{LatestOverride, PinnedOverride};
use crate::pinner::ManifestPinRule;
use crate::project::ProjectSpec;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the current directory
pub const CONFIG_FILE_NAME: &str = "relock.toml";

/// Repository configuration file (`relock.toml`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Script run by `relock update` / `relock force-update`
    #[serde(default = "default_update_script")]
    pub update_script: PathBuf,

    /// External resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Sub-projects relocked after the primary lockfile, in order
    #[serde(default = "default_projects")]
    pub projects: Vec<ProjectConfig>,

    /// Stable channel pins applied to the primary manifest
    #[serde(default)]
    pub stable_channel: StableChannelConfig,

    /// Generated overrides file
    #[serde(default)]
    pub overrides: OverridesConfig,

    /// File this configuration was read from, named in generated headers
    #[serde(skip, default = "default_source")]
    pub source: PathBuf,
}

fn default_source() -> PathBuf {
    PathBuf::from(CONFIG_FILE_NAME)
}

fn default_update_script() -> PathBuf {
    PathBuf::from("ci").join("dependency_update.sh")
}

fn default_projects() -> Vec<ProjectConfig> {
    vec![
        ProjectConfig {
            directory: PathBuf::from("omnibus"),
            platforms: None,
            leave_frozen: true,
        },
        ProjectConfig {
            directory: PathBuf::from("acceptance"),
            platforms: Some(Vec::new()),
            leave_frozen: false,
        },
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Program and leading arguments, e.g. `["bundle"]` or `["bin/bundle"]`
    #[serde(default = "default_resolver_command")]
    pub command: Vec<String>,

    /// Primary lockfile name inside each project directory
    #[serde(default = "default_lockfile")]
    pub lockfile: String,

    /// Platforms merged into every lockfile unless a project overrides them
    #[serde(default = "default_platforms")]
    pub platforms: Vec<String>,
}

fn default_resolver_command() -> Vec<String> {
    vec!["bundle".to_string()]
}

fn default_lockfile() -> String {
    "Gemfile.lock".to_string()
}

fn default_platforms() -> Vec<String> {
    vec![
        "ruby".to_string(),
        "x86-mingw32".to_string(),
        "x64-mingw32".to_string(),
    ]
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            command: default_resolver_command(),
            lockfile: default_lockfile(),
            platforms: default_platforms(),
        }
    }
}

/// One `[[projects]]` entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub directory: PathBuf,

    /// Omitted = inherit `resolver.platforms`; `[]` = install only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,

    #[serde(default = "default_leave_frozen")]
    pub leave_frozen: bool,
}

fn default_leave_frozen() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StableChannelConfig {
    /// Manifest rewritten by the pins, relative to the repository root
    #[serde(default = "default_manifest")]
    pub manifest: PathBuf,

    /// Base URL of the channel metadata service
    #[serde(default = "default_channel_url")]
    pub url: String,

    #[serde(default = "default_channel")]
    pub channel: String,

    /// Platform triple sent with the metadata query
    #[serde(default = "default_channel_platform")]
    pub platform: String,

    #[serde(default = "default_channel_platform_version")]
    pub platform_version: String,

    #[serde(default = "default_channel_machine")]
    pub machine: String,

    #[serde(default = "default_pins")]
    pub pins: Vec<ManifestPinRule>,
}

fn default_manifest() -> PathBuf {
    PathBuf::from("Gemfile")
}

fn default_channel_url() -> String {
    "https://omnitruck.chef.io".to_string()
}

fn default_channel() -> String {
    "stable".to_string()
}

fn default_channel_platform() -> String {
    "ubuntu".to_string()
}

fn default_channel_platform_version() -> String {
    "18.04".to_string()
}

fn default_channel_machine() -> String {
    "x86_64".to_string()
}

fn default_pins() -> Vec<ManifestPinRule> {
    vec![ManifestPinRule {
        package: "chef".to_string(),
        tag_prefix: "v".to_string(),
        product: None,
    }]
}

impl Default for StableChannelConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            url: default_channel_url(),
            channel: default_channel(),
            platform: default_channel_platform(),
            platform_version: default_channel_platform_version(),
            machine: default_channel_machine(),
            pins: default_pins(),
        }
    }
}

/// Where "latest version" answers come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedKind {
    /// `gem list -r <name>`
    GemList,
    /// RubyGems-compatible JSON API
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverridesConfig {
    /// Generated file, relative to the repository root
    #[serde(default = "default_overrides_path")]
    pub path: PathBuf,

    #[serde(default = "default_feed")]
    pub feed: FeedKind,

    /// Base URL for the `http` feed
    #[serde(default = "default_feed_url")]
    pub feed_url: String,

    /// Program and leading arguments for the `gem-list` feed
    #[serde(default = "default_gem_command")]
    pub gem_command: Vec<String>,

    /// Overrides pinned to whatever the feed reports as latest
    #[serde(default = "default_latest")]
    pub latest: Vec<LatestOverride>,

    /// Overrides with a literal version
    #[serde(default)]
    pub pinned: Vec<PinnedOverride>,
}

fn default_overrides_path() -> PathBuf {
    PathBuf::from("omnibus_overrides.rb")
}

fn default_feed() -> FeedKind {
    FeedKind::GemList
}

fn default_feed_url() -> String {
    "https://rubygems.org".to_string()
}

fn default_gem_command() -> Vec<String> {
    vec!["gem".to_string()]
}

fn default_latest() -> Vec<LatestOverride> {
    vec![
        LatestOverride {
            key: "rubygems".to_string(),
            package: "rubygems-update".to_string(),
        },
        LatestOverride {
            key: "bundler".to_string(),
            package: "bundler".to_string(),
        },
    ]
}

impl Default for OverridesConfig {
    fn default() -> Self {
        Self {
            path: default_overrides_path(),
            feed: default_feed(),
            feed_url: default_feed_url(),
            gem_command: default_gem_command(),
            latest: default_latest(),
            pinned: Vec::new(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            update_script: default_update_script(),
            resolver: ResolverConfig::default(),
            projects: default_projects(),
            stable_channel: StableChannelConfig::default(),
            overrides: OverridesConfig::default(),
            source: default_source(),
        }
    }
}

impl Config {
    /// Get the config file path
    ///
    /// Uses RELOCK_CONFIG if set, otherwise ./relock.toml
    pub fn default_path() -> PathBuf {
        match std::env::var("RELOCK_CONFIG") {
            Ok(path) if !path.is_empty() => PathBuf::from(path),
            _ => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    /// Load config from the default path, or fall back to defaults if it doesn't exist
    pub fn load() -> Result<Self> {
        let path = Self::default_path();

        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self {
                source: path,
                ..Self::default()
            });
        }

        Self::load_from(&path)
    }

    /// Load and validate config from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: Config = toml::from_str(&content)?;
        config.validate()?;
        config.source = path.as_ref().to_path_buf();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.resolver.command.is_empty() {
            return Err(Error::InvalidConfig(
                "resolver.command must name a program".to_string(),
            ));
        }

        if self.resolver.lockfile.is_empty() {
            return Err(Error::InvalidConfig(
                "resolver.lockfile must not be empty".to_string(),
            ));
        }

        if self.overrides.feed == FeedKind::GemList && self.overrides.gem_command.is_empty() {
            return Err(Error::InvalidConfig(
                "overrides.gem_command must name a program".to_string(),
            ));
        }

        for (i, project) in self.projects.iter().enumerate() {
            if project.directory.as_os_str().is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "projects[{}].directory must not be empty",
                    i
                )));
            }
        }

        if let Some(pin) = self.stable_channel.pins.iter().find(|p| p.package.is_empty()) {
            return Err(Error::InvalidConfig(format!(
                "stable_channel pin with tag prefix {:?} has no package name",
                pin.tag_prefix
            )));
        }

        Ok(())
    }

    /// The repository root itself, relocked before the sub-projects
    pub fn primary_project(&self) -> ProjectSpec {
        ProjectSpec::new(".", self.resolver.platforms.clone(), true)
    }

    /// Registered sub-projects in declared order
    pub fn project_specs(&self) -> Vec<ProjectSpec> {
        self.projects
            .iter()
            .map(|p| {
                ProjectSpec::new(
                    p.directory.clone(),
                    p.platforms
                        .clone()
                        .unwrap_or_else(|| self.resolver.platforms.clone()),
                    p.leave_frozen,
                )
            })
            .collect()
    }

    /// Look up a registered sub-project by directory
    pub fn find_project<P: AsRef<Path>>(&self, directory: P) -> Option<ProjectSpec> {
        let wanted = directory.as_ref();
        let wanted = wanted.strip_prefix(".").unwrap_or(wanted);
        self.project_specs()
            .into_iter()
            .find(|p| p.directory == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.resolver.command, vec!["bundle"]);
        assert_eq!(config.resolver.lockfile, "Gemfile.lock");
        assert_eq!(config.overrides.feed, FeedKind::GemList);
        assert_eq!(config.overrides.latest.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_project_specs_inherit_platforms() {
        let config = Config::default();
        let specs = config.project_specs();

        assert_eq!(specs.len(), 2);
        assert_eq!(specs[0].directory, PathBuf::from("omnibus"));
        assert_eq!(specs[0].platforms, config.resolver.platforms);
        assert!(specs[0].leave_frozen);

        assert_eq!(specs[1].directory, PathBuf::from("acceptance"));
        assert!(specs[1].platforms.is_empty());
        assert!(!specs[1].leave_frozen);
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            r#"
[resolver]
command = ["bin/bundle"]
platforms = ["ruby", "x64-mingw-ucrt"]

[[projects]]
directory = "kitchen-tests"
leave_frozen = false

[overrides]
feed = "http"
feed_url = "http://localhost:9292"

[[overrides.latest]]
key = "preferred_gem"
package = "chef"

[[overrides.pinned]]
key = "ruby"
version = "2.7.2"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.resolver.command, vec!["bin/bundle"]);
        assert_eq!(config.resolver.lockfile, "Gemfile.lock");
        assert_eq!(config.overrides.feed, FeedKind::Http);
        assert_eq!(config.overrides.latest[0].key, "preferred_gem");
        assert_eq!(config.overrides.pinned[0].version, "2.7.2");
        assert_eq!(config.stable_channel.pins[0].package, "chef");
        assert_eq!(config.source, path);

        let specs = config.project_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].platforms, vec!["ruby", "x64-mingw-ucrt"]);
        assert!(!specs[0].leave_frozen);
    }

    #[test]
    fn test_empty_resolver_command_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[resolver]\ncommand = []\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn test_find_project() {
        let config = Config::default();
        assert!(config.find_project("omnibus").is_some());
        assert!(config.find_project("./acceptance").is_some());
        assert!(config.find_project("docs").is_none());
    }
}
