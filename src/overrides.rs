//! Generated omnibus overrides
//!
//! The overrides file pins software versions for the omnibus build. Part of it is
//! looked up at generation time ("whatever is latest on the feed"), the rest is
//! copied verbatim from `relock.toml`. The rendered file is deterministic: dynamic
//! entries first, then static ones, each group in configured order.
//!
//! # Examples
//!
//! ```
//! use relock::overrides::{render, OverrideEntry};
//! use std::path::Path;
//!
//! let body = render(
//!     Path::new("relock.toml"),
//!     &[
//!         OverrideEntry::latest("preferred_gem", "16.1.0"),
//!         OverrideEntry::pinned("ruby", "2.7.2"),
//!     ],
//! );
//! assert!(body.ends_with("override \"ruby\", version: \"2.7.2\"\n"));
//! ```

use crate::feed::PackageFeed;
use crate::generated::GeneratedFile;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// First line of every generated overrides file; `source` is the config file to edit
pub fn header(source: &Path) -> String {
    format!(
        "# DO NOT EDIT. Generated by \"relock update-omnibus-overrides\". Edit {} instead.\n",
        source.display()
    )
}

/// `[[overrides.latest]]`: override `key` with the latest version of `package`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestOverride {
    pub key: String,
    pub package: String,
}

/// `[[overrides.pinned]]`: override `key` with a literal version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedOverride {
    pub key: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideSource {
    DynamicLatest,
    StaticPinned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEntry {
    pub name: String,
    pub version: String,
    pub source: OverrideSource,
}

impl OverrideEntry {
    pub fn latest(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            source: OverrideSource::DynamicLatest,
        }
    }

    pub fn pinned(name: &str, version: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            source: OverrideSource::StaticPinned,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "override {}, version: {}\n",
            ruby_string(&self.name),
            ruby_string(&self.version)
        )
    }
}

/// Double-quoted Ruby string literal, as `String#inspect` prints it
pub fn ruby_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // Interpolation openers
            '#' if matches!(chars.peek(), Some('{' | '$' | '@')) => quoted.push_str("\\#"),
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            '\r' => quoted.push_str("\\r"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04X}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Header plus one line per entry, dynamic entries first
pub fn render(source: &Path, entries: &[OverrideEntry]) -> String {
    let mut body = header(source);
    for source in [OverrideSource::DynamicLatest, OverrideSource::StaticPinned] {
        for entry in entries.iter().filter(|e| e.source == source) {
            body.push_str(&entry.to_line());
        }
    }
    body
}

/// Resolve every dynamic override through `feed` and merge in the static ones
///
/// Any feed failure ends generation before anything is rendered.
pub fn resolve_entries(
    latest: &[LatestOverride],
    pinned: &[PinnedOverride],
    feed: &dyn PackageFeed,
) -> Result<Vec<OverrideEntry>> {
    let mut entries = Vec::with_capacity(latest.len() + pinned.len());

    for o in latest {
        let version = feed.latest_version(&o.package)?;
        tracing::info!(package = %o.package, version = %version, "latest version");
        entries.push(OverrideEntry::latest(&o.key, &version));
    }

    entries.extend(pinned.iter().map(|o| OverrideEntry::pinned(&o.key, &o.version)));
    Ok(entries)
}

/// Render the overrides file destined for `path`; nothing is written yet
///
/// `source` is the configuration file named in the header.
pub fn generate<P: AsRef<Path>>(
    path: P,
    source: &Path,
    latest: &[LatestOverride],
    pinned: &[PinnedOverride],
    feed: &dyn PackageFeed,
) -> Result<GeneratedFile> {
    let entries = resolve_entries(latest, pinned, feed)?;
    Ok(GeneratedFile::new(path.as_ref(), render(source, &entries)))
}
