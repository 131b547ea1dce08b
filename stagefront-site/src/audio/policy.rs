//! Cross-origin restricted provider detection
//!
//! Some hosts serve audio without CORS headers. Requesting those sources in
//! anonymous mode makes them fail to load, so tracks from such providers are
//! played without a cross-origin mode and without the analyser.

use stagefront_common::config::RestrictedProviderConfig;
use stagefront_common::model::Track;

/// Why a track was classified as restricted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Restriction {
    /// Track carries an external reference for a restricted provider
    ProviderRef { provider: String },
    /// Audio URL is served from a restricted host
    Host { provider: String, host: String },
}

impl Restriction {
    pub fn provider(&self) -> &str {
        match self {
            Restriction::ProviderRef { provider } | Restriction::Host { provider, .. } => provider,
        }
    }
}

impl std::fmt::Display for Restriction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Restriction::ProviderRef { provider } => write!(f, "{} track reference", provider),
            Restriction::Host { provider, host } => write!(f, "{} host {}", provider, host),
        }
    }
}

#[derive(Debug, Clone)]
struct Provider {
    name: String,
    hosts: Vec<String>,
}

/// Table of providers whose audio must not be requested in anonymous mode
#[derive(Debug, Clone, Default)]
pub struct RestrictedPolicy {
    providers: Vec<Provider>,
}

impl RestrictedPolicy {
    pub fn from_config(providers: &[RestrictedProviderConfig]) -> Self {
        Self {
            providers: providers
                .iter()
                .map(|p| Provider {
                    name: p.name.to_ascii_lowercase(),
                    hosts: p.hosts.iter().map(|h| h.trim().to_ascii_lowercase()).collect(),
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Classify a track about to be played from `url`
    ///
    /// A provider reference on the track wins over the URL check.
    pub fn check(&self, track: &Track, url: &str) -> Option<Restriction> {
        for (provider, _) in track.external_refs() {
            if self.providers.iter().any(|p| p.name == provider) {
                return Some(Restriction::ProviderRef {
                    provider: provider.to_string(),
                });
            }
        }
        self.check_url(url)
    }

    /// Classify a bare URL
    ///
    /// The host matches exactly or as a subdomain, so lookalike hosts stay
    /// unrestricted. A provider host quoted in the path or query (a proxied
    /// link) also counts. Relative or malformed URLs match by substring.
    pub fn check_url(&self, url: &str) -> Option<Restriction> {
        match reqwest::Url::parse(url) {
            Ok(parsed) => {
                let host = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
                self.find_host(|h| host_matches(&host, h)).or_else(|| {
                    let rest = format!("{}?{}", parsed.path(), parsed.query().unwrap_or_default())
                        .to_ascii_lowercase();
                    self.find_host(|h| rest.contains(h))
                })
            }
            Err(_) => {
                let lowered = url.to_ascii_lowercase();
                self.find_host(|h| lowered.contains(h))
            }
        }
    }

    fn find_host(&self, matches: impl Fn(&str) -> bool) -> Option<Restriction> {
        self.providers.iter().find_map(|p| {
            p.hosts
                .iter()
                .find(|h| !h.is_empty() && matches(h.as_str()))
                .map(|h| Restriction::Host {
                    provider: p.name.clone(),
                    host: h.clone(),
                })
        })
    }
}

fn host_matches(host: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    host == pattern
        || host
            .strip_suffix(pattern)
            .map_or(false, |prefix| prefix.ends_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use stagefront_common::config::AudioConfig;

    fn policy() -> RestrictedPolicy {
        RestrictedPolicy::from_config(&AudioConfig::default().restricted_providers)
    }

    fn track(netease_id: Option<&str>) -> Track {
        Track {
            id: 1,
            netease_id: netease_id.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_restricted_host_is_detected() {
        let hit = policy().check(&track(None), "https://music.163.com/song/media/outer/url?id=1.mp3");
        assert_eq!(
            hit,
            Some(Restriction::Host {
                provider: "netease".to_string(),
                host: "music.163.com".to_string()
            })
        );
    }

    #[test]
    fn test_subdomain_and_case_match() {
        assert!(policy().check_url("https://M10.Music.126.net/a.mp3").is_some());
    }

    #[test]
    fn test_lookalike_host_is_not_restricted() {
        assert!(policy().check_url("https://notmusic.163.com.example.org/a.mp3").is_none());
        assert!(policy().check_url("https://xmusic.163.com/a.mp3").is_none());
    }

    #[test]
    fn test_provider_reference_wins() {
        let hit = policy().check(&track(Some("186016")), "https://cdn.example.com/a.mp3");
        assert_eq!(hit.map(|r| r.provider().to_string()), Some("netease".to_string()));
    }

    #[test]
    fn test_ordinary_track_is_not_restricted() {
        assert!(policy().check(&track(None), "https://cdn.example.com/a.mp3").is_none());
        assert!(policy().check(&track(Some("")), "/audio/a.mp3").is_none());
    }

    #[test]
    fn test_proxied_provider_url_is_restricted() {
        let hit = policy().check_url("https://cdn.example.com/p?u=music.163.com/song.mp3");
        assert_eq!(hit.map(|r| r.provider().to_string()), Some("netease".to_string()));
        assert!(policy()
            .check_url("https://proxy.example.org/fetch/m701.music.126.net/a.mp3")
            .is_some());
    }

    #[test]
    fn test_relative_url_substring_fallback() {
        assert!(policy().check_url("//music.163.com/outer/url?id=1").is_some());
    }

    #[test]
    fn test_empty_policy() {
        let empty = RestrictedPolicy::from_config(&[]);
        assert!(empty.is_empty());
        assert!(empty.check(&track(Some("1")), "https://music.163.com/x").is_none());
    }
}
