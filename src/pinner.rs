//! Pinning Gemfile entries to the stable channel
//!
//! A pinned entry is a git-sourced gem line such as
//!
//! ```text
//! gem "chef", github: "chef/chef", branch: "v16.0.257"
//! ```
//!
//! Pinning replaces the quoted ref (`branch`, `tag` or `ref`) with the tag prefix
//! followed by the version the stable channel currently recommends. Rewriting with
//! an unchanged channel leaves the text byte-for-byte identical.

use crate::channel::ChannelLookup;
use crate::generated::GeneratedFile;
use crate::{Error, Result};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Which gem line to rewrite and how its tag is spelled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestPinRule {
    /// Gem name as written in the manifest
    pub package: String,

    /// Prepended to the channel version, e.g. `v` for `v16.1.0`
    #[serde(default)]
    pub tag_prefix: String,

    /// Channel product name when it differs from the gem name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl ManifestPinRule {
    pub fn new(package: &str, tag_prefix: &str) -> Self {
        Self {
            package: package.to_string(),
            tag_prefix: tag_prefix.to_string(),
            product: None,
        }
    }

    pub fn product_name(&self) -> &str {
        self.product.as_deref().unwrap_or(&self.package)
    }
}

/// Point the git ref of `package`'s gem line at `tag`
pub fn rewrite_gem_ref(manifest: &str, package: &str, tag: &str) -> Result<String> {
    let pattern = format!(
        r#"(?m)^(\s*gem\s+["']{}["']\s*,.*?:?\b(?:branch|tag|ref)(?::\s*|\s*=>\s*)["'])[^"']*(["'].*)$"#,
        regex::escape(package)
    );
    let re = Regex::new(&pattern)
        .map_err(|e| Error::Other(format!("Invalid package name {:?}: {}", package, e)))?;

    if !re.is_match(manifest) {
        return Err(Error::InvalidManifest(format!(
            "no git-sourced `gem \"{}\"` line with a branch, tag or ref to pin",
            package
        )));
    }

    Ok(re
        .replace_all(manifest, |caps: &Captures| {
            format!("{}{}{}", &caps[1], tag, &caps[2])
        })
        .into_owned())
}

/// Rewrite `manifest_path` so every rule's gem follows the stable channel
///
/// All channel lookups happen before any text is touched, so a failed lookup
/// leaves nothing half-pinned. The returned file still has to be written.
pub fn pin<P: AsRef<Path>>(
    manifest_path: P,
    rules: &[ManifestPinRule],
    channel: &dyn ChannelLookup,
) -> Result<GeneratedFile> {
    let manifest_path = manifest_path.as_ref();

    let mut tags = Vec::with_capacity(rules.len());
    for rule in rules {
        let version = channel.resolve(rule.product_name())?;
        tracing::info!(package = %rule.package, version = %version, "stable channel version");
        tags.push(format!("{}{}", rule.tag_prefix, version));
    }

    let mut manifest = fs::read_to_string(manifest_path)?;
    for (rule, tag) in rules.iter().zip(&tags) {
        manifest = rewrite_gem_ref(&manifest, &rule.package, tag)?;
    }

    Ok(GeneratedFile::new(manifest_path, manifest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generated::WriteOutcome;
    use std::collections::HashMap;
    use tempfile::TempDir;

    const GEMFILE: &str = r#"source "https://rubygems.org"

gem "chef", github: "chef/chef", branch: "v15.8.23"
gem "chef-zero"
gem "ohai", git: "https://github.com/chef/ohai", :tag => "v15.7.4"
"#;

    struct FixedChannel(HashMap<&'static str, &'static str>);

    impl ChannelLookup for FixedChannel {
        fn resolve(&self, product: &str) -> Result<String> {
            self.0
                .get(product)
                .map(|v| v.to_string())
                .ok_or_else(|| Error::ChannelLookup {
                    package: product.to_string(),
                    reason: "not on the channel".to_string(),
                })
        }
    }

    fn channel() -> FixedChannel {
        FixedChannel(HashMap::from([("chef", "16.1.0"), ("ohai", "16.1.1")]))
    }

    #[test]
    fn test_rewrite_branch() {
        let rewritten = rewrite_gem_ref(GEMFILE, "chef", "v16.1.0").unwrap();
        assert!(rewritten.contains(r#"gem "chef", github: "chef/chef", branch: "v16.1.0""#));
        assert!(rewritten.contains("gem \"chef-zero\"\n"));
    }

    #[test]
    fn test_rewrite_hash_rocket_tag() {
        let rewritten = rewrite_gem_ref(GEMFILE, "ohai", "v16.1.1").unwrap();
        assert!(rewritten.contains(r#":tag => "v16.1.1""#));
    }

    #[test]
    fn test_rewrite_missing_line() {
        let err = rewrite_gem_ref(GEMFILE, "chef-zero", "v15.0.0").unwrap_err();
        assert!(matches!(err, Error::InvalidManifest(_)));
    }

    #[test]
    fn test_pin_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Gemfile");
        fs::write(&path, GEMFILE).unwrap();
        let rules = vec![ManifestPinRule::new("chef", "v"), ManifestPinRule::new("ohai", "v")];

        let first = pin(&path, &rules, &channel()).unwrap();
        assert!(first.write_if_changed().unwrap().is_changed());

        let second = pin(&path, &rules, &channel()).unwrap();
        assert_eq!(second.content, first.content);
        assert_eq!(second.write_if_changed().unwrap(), WriteOutcome::Unchanged);
    }

    #[test]
    fn test_pin_uses_product_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Gemfile");
        fs::write(&path, "gem \"opscode-pushy-client\", github: \"chef/opscode-pushy-client\", tag: \"2.0.0\"\n").unwrap();

        let rules = vec![ManifestPinRule {
            package: "opscode-pushy-client".to_string(),
            tag_prefix: String::new(),
            product: Some("chef".to_string()),
        }];

        let pinned = pin(&path, &rules, &channel()).unwrap();
        assert!(pinned.content.contains("tag: \"16.1.0\""));
    }

    #[test]
    fn test_lookup_failure_leaves_manifest_alone() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("Gemfile");
        fs::write(&path, GEMFILE).unwrap();
        let rules = vec![
            ManifestPinRule::new("chef", "v"),
            ManifestPinRule::new("push-jobs-client", ""),
        ];

        let err = pin(&path, &rules, &channel()).unwrap_err();

        assert!(matches!(err, Error::ChannelLookup { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), GEMFILE);
    }
}
