//! Provider configuration.
//!
//! MangaDex needs no configuration; each scraped source is enabled by
//! pointing an environment variable at its deployed proxy base URL.

use crate::model::Provider;

use std::time::Duration;

pub const MANGAPILL_API_URL: &str = "MANGAPILL_API_URL";
pub const WEEBCENTRAL_API_URL: &str = "WEEBCENTRAL_API_URL";
pub const ASURASCANS_API_URL: &str = "ASURASCANS_API_URL";
pub const REQUEST_TIMEOUT_SECS: &str = "MANGAKO_REQUEST_TIMEOUT_SECS";

#[derive(Debug, Clone)]
pub struct Config {
    pub mangadex_enabled: bool,
    pub mangapill_base: Option<String>,
    pub weebcentral_base: Option<String>,
    pub asurascans_base: Option<String>,
    /// No deadline by default: a hung request is abandoned only by query
    /// supersession. Set for deployments that want one.
    pub request_timeout: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mangadex_enabled: true,
            mangapill_base: None,
            weebcentral_base: None,
            asurascans_base: None,
            request_timeout: None,
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => None,
    }
}

impl Config {
    pub fn from_env() -> Self {
        let request_timeout = env_non_empty(REQUEST_TIMEOUT_SECS)
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs);

        Self {
            mangadex_enabled: true,
            mangapill_base: env_non_empty(MANGAPILL_API_URL),
            weebcentral_base: env_non_empty(WEEBCENTRAL_API_URL),
            asurascans_base: env_non_empty(ASURASCANS_API_URL),
            request_timeout,
        }
    }

    /// Scraped sources with a configured base URL, in the order they are
    /// consulted when resolving a chapter source for a merge.
    pub fn scraped_sources(&self) -> Vec<(Provider, &str)> {
        let mut sources = Vec::new();

        if let Some(base) = &self.mangapill_base {
            sources.push((Provider::Mangapill, base.as_str()));
        }
        if let Some(base) = &self.weebcentral_base {
            sources.push((Provider::WeebCentral, base.as_str()));
        }
        if let Some(base) = &self.asurascans_base {
            sources.push((Provider::AsuraScans, base.as_str()));
        }

        sources
    }

    /// True when at least one provider would be constructed.
    pub fn any_provider_configured(&self) -> bool {
        self.mangadex_enabled || !self.scraped_sources().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scraped_sources_in_resolution_order() {
        let config = Config {
            mangapill_base: Some("https://mp.example.com".to_string()),
            asurascans_base: Some("https://as.example.com".to_string()),
            ..Config::default()
        };

        let sources: Vec<_> = config.scraped_sources().iter().map(|(p, _)| *p).collect();
        assert_eq!(sources, vec![Provider::Mangapill, Provider::AsuraScans]);
    }

    #[test]
    fn defaults_have_mangadex_only() {
        let config = Config::default();
        assert!(config.any_provider_configured());
        assert!(config.scraped_sources().is_empty());
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn disabling_everything_is_detected() {
        let config = Config {
            mangadex_enabled: false,
            ..Config::default()
        };
        assert!(!config.any_provider_configured());
    }
}
