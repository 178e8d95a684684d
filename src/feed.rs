//! "Latest version" lookups for the generated overrides
//!
//! A feed answers one question: what is the newest published version of a
//! package? Answers are parsed strictly. Anything other than exactly one record
//! for the requested package is an [`Error::FeedFormat`] carrying the raw response,
//! so a broken feed can never produce a half-written overrides file.

use crate::config::{FeedKind, OverridesConfig};
use crate::{Error, Result};
use regex::Regex;
use std::process::Command;
use url::Url;

pub trait PackageFeed {
    fn latest_version(&self, package: &str) -> Result<String>;
}

/// Extract the version from `gem list -r <package>` output
///
/// Exactly one line must read `<package> (<version>)`; other gems whose names
/// merely contain `package` are ignored.
pub fn parse_gem_list(package: &str, response: &str) -> Result<String> {
    let re = Regex::new(&format!(r"^{}\s*\(([^)]*)\)$", regex::escape(package)))
        .map_err(|e| Error::Other(format!("Invalid package name {:?}: {}", package, e)))?;

    let versions: Vec<&str> = response
        .lines()
        .filter_map(|line| re.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .collect();

    match versions.as_slice() {
        [version] if !version.is_empty() => Ok(version.to_string()),
        _ => Err(Error::FeedFormat {
            package: package.to_string(),
            response: response.to_string(),
        }),
    }
}

/// Asks the `gem` command line tool
#[derive(Debug, Clone)]
pub struct GemListFeed {
    program: String,
    leading_args: Vec<String>,
}

impl GemListFeed {
    pub fn new(command: &[String]) -> Result<Self> {
        let (program, leading_args) = command
            .split_first()
            .ok_or_else(|| Error::InvalidConfig("overrides.gem_command must name a program".to_string()))?;

        Ok(Self {
            program: program.clone(),
            leading_args: leading_args.to_vec(),
        })
    }
}

impl PackageFeed for GemListFeed {
    fn latest_version(&self, package: &str) -> Result<String> {
        tracing::info!(package, "running gem list -r");

        let output = Command::new(&self.program)
            .args(&self.leading_args)
            .args(["list", "-r", package])
            .output()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_gem_list(package, &stdout).map_err(|e| match e {
            Error::FeedFormat { package, response } => Error::FeedFormat {
                package,
                response: format!(
                    "{}{}",
                    response,
                    String::from_utf8_lossy(&output.stderr)
                ),
            },
            other => other,
        })
    }
}

/// Asks a RubyGems-compatible HTTP API (`/api/v1/versions/<name>/latest.json`)
pub struct HttpFeed {
    base_url: Url,
    client: reqwest::blocking::Client,
}

impl HttpFeed {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::InvalidConfig(format!("overrides.feed_url {:?}: {}", base_url, e)))?;

        Ok(Self {
            base_url,
            client: reqwest::blocking::Client::new(),
        })
    }

    fn latest_url(&self, package: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "v1", "versions", package, "latest.json"]);
        Ok(url)
    }
}

impl PackageFeed for HttpFeed {
    fn latest_version(&self, package: &str) -> Result<String> {
        let url = self.latest_url(package)?;
        tracing::info!(package, url = %url, "querying package feed");

        let response = self.client.get(url).send()?;
        let status = response.status();
        let body = response.text()?;

        let format_error = || Error::FeedFormat {
            package: package.to_string(),
            response: format!("HTTP {}\n{}", status, body),
        };

        if !status.is_success() {
            return Err(format_error());
        }

        let value: serde_json::Value = serde_json::from_str(&body).map_err(|_| format_error())?;
        match value.get("version").and_then(|v| v.as_str()) {
            Some(version) if !version.is_empty() && version != "unknown" => Ok(version.to_string()),
            _ => Err(format_error()),
        }
    }
}

/// Build the feed selected in `[overrides]`
pub fn feed_from_config(config: &OverridesConfig) -> Result<Box<dyn PackageFeed>> {
    Ok(match config.feed {
        FeedKind::GemList => Box::new(GemListFeed::new(&config.gem_command)?),
        FeedKind::Http => Box::new(HttpFeed::new(&config.feed_url)?),
    })
}
