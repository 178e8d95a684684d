//! Stable channel lookups
//!
//! The stable channel names the currently recommended release of a product. The
//! metadata service answers with tab separated `key value` lines, of which only
//! `version` matters here.

use crate::config::StableChannelConfig;
use crate::{Error, Result};
use regex::Regex;
use url::Url;

pub trait ChannelLookup {
    /// Current version of `product` on the channel, e.g. `16.1.0`
    fn resolve(&self, product: &str) -> Result<String>;
}

/// Extract the `version` line of a channel metadata response
pub fn parse_metadata_version(response: &str) -> Option<String> {
    let re = Regex::new(r"(?m)^version\s+(\S+)\s*$").ok()?;
    re.captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Queries an Omnitruck-style metadata endpoint over HTTP
pub struct OmnitruckChannel {
    base_url: Url,
    channel: String,
    platform: String,
    platform_version: String,
    machine: String,
    client: reqwest::blocking::Client,
}

impl OmnitruckChannel {
    pub fn from_config(config: &StableChannelConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url).map_err(|e| {
            Error::InvalidConfig(format!("stable_channel.url {:?}: {}", config.url, e))
        })?;

        Ok(Self {
            base_url,
            channel: config.channel.clone(),
            platform: config.platform.clone(),
            platform_version: config.platform_version.clone(),
            machine: config.machine.clone(),
            client: reqwest::blocking::Client::new(),
        })
    }

    fn metadata_url(&self, product: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::InvalidConfig(format!("{} cannot be a base URL", self.base_url)))?
            .pop_if_empty()
            .extend([self.channel.as_str(), product, "metadata"]);
        url.query_pairs_mut()
            .append_pair("v", "latest")
            .append_pair("p", &self.platform)
            .append_pair("pv", &self.platform_version)
            .append_pair("m", &self.machine);
        Ok(url)
    }
}

impl ChannelLookup for OmnitruckChannel {
    fn resolve(&self, product: &str) -> Result<String> {
        let url = self.metadata_url(product)?;
        tracing::info!(product, url = %url, "querying stable channel");

        let lookup_error = |reason: String| Error::ChannelLookup {
            package: product.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| lookup_error(e.to_string()))?;
        let status = response.status();
        let body = response.text().map_err(|e| lookup_error(e.to_string()))?;

        if !status.is_success() {
            return Err(lookup_error(format!("HTTP {}: {}", status, body.trim())));
        }

        parse_metadata_version(&body)
            .ok_or_else(|| lookup_error(format!("no version in response:\n{}", body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const METADATA: &str = "sha1\t0a1b2c\nsha256\tdeadbeef\nurl\thttps://packages.chef.io/files/stable/chef/16.1.0/ubuntu/18.04/chef_16.1.0-1_amd64.deb\nversion\t16.1.0\n";

    fn channel_for(server: &mockito::Server) -> OmnitruckChannel {
        let config = StableChannelConfig {
            url: server.url(),
            ..Default::default()
        };
        OmnitruckChannel::from_config(&config).unwrap()
    }

    #[test]
    fn test_parse_metadata_version() {
        assert_eq!(parse_metadata_version(METADATA).as_deref(), Some("16.1.0"));
        assert_eq!(parse_metadata_version("url\thttps://example.com\n"), None);
    }

    #[test]
    fn test_resolve_sends_platform_query() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/stable/chef/metadata")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("v".into(), "latest".into()),
                Matcher::UrlEncoded("p".into(), "ubuntu".into()),
                Matcher::UrlEncoded("pv".into(), "18.04".into()),
                Matcher::UrlEncoded("m".into(), "x86_64".into()),
            ]))
            .with_status(200)
            .with_body(METADATA)
            .create();

        let channel = channel_for(&server);
        assert_eq!(channel.resolve("chef").unwrap(), "16.1.0");
        mock.assert();
    }

    #[test]
    fn test_resolve_not_found() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/stable/push-jobs-client/metadata")
            .match_query(Matcher::Any)
            .with_status(404)
            .with_body("Not Found")
            .create();

        let err = channel_for(&server).resolve("push-jobs-client").unwrap_err();
        match err {
            Error::ChannelLookup { package, reason } => {
                assert_eq!(package, "push-jobs-client");
                assert!(reason.contains("404"));
            }
            other => panic!("expected ChannelLookup, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_without_version_line() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/stable/chef/metadata")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("url\thttps://example.com/chef.deb\n")
            .create();

        let err = channel_for(&server).resolve("chef").unwrap_err();
        assert!(matches!(err, Error::ChannelLookup { .. }));
    }
}
