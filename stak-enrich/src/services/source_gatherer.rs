//! Deterministic source gathering
//!
//! Derives enrichment sources from the profile alone. No network calls, no
//! error conditions: the same profile always yields the same sources.

use sha2::{Digest, Sha256};

use crate::models::Profile;
use crate::types::EnrichmentSources;

const GRAVATAR_BASE_URL: &str = "https://www.gravatar.com/avatar";

/// Consumer-domain aware source gatherer
#[derive(Debug, Clone)]
pub struct SourceGatherer {
    consumer_domains: Vec<String>,
}

impl SourceGatherer {
    pub fn new(consumer_domains: Vec<String>) -> Self {
        Self {
            consumer_domains: consumer_domains
                .into_iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
        }
    }

    /// Gather sources for one profile
    pub fn gather_deterministic_sources(&self, profile: &Profile) -> EnrichmentSources {
        let mut sources = EnrichmentSources::default();

        let email = non_blank(&profile.email);

        if let Some(domain) = email.and_then(email_domain) {
            if !self.is_consumer_domain(&domain) {
                sources.company_url = Some(format!("https://{}", domain));
                sources.email_domain = Some(domain);
            }
        }

        if let (Some(email), None) = (email, non_blank(&profile.avatar_url)) {
            sources.gravatar_url = Some(gravatar_url(email));
        }

        sources.linkedin_url = non_blank(&profile.linkedin_url).map(str::to_string);
        sources.twitter_url = non_blank(&profile.twitter_url).map(str::to_string);
        sources.github_url = non_blank(&profile.github_url).map(str::to_string);
        sources.website_urls = profile
            .website_urls
            .iter()
            .filter(|u| !u.trim().is_empty())
            .cloned()
            .collect();

        sources
    }

    pub fn is_consumer_domain(&self, domain: &str) -> bool {
        let domain = domain.to_lowercase();
        self.consumer_domains.iter().any(|d| *d == domain)
    }
}

/// Gravatar URL for an email: SHA-256 of the trimmed, lower-cased address
pub fn gravatar_url(email: &str) -> String {
    let normalized = email.trim().to_lowercase();
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = hasher.finalize();

    format!("{}/{:x}?d=404", GRAVATAR_BASE_URL, digest)
}

/// Lower-cased domain part of an email address
fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        None
    } else {
        Some(domain)
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stak_common::config::DEFAULT_CONSUMER_DOMAINS;

    fn gatherer() -> SourceGatherer {
        SourceGatherer::new(DEFAULT_CONSUMER_DOMAINS.iter().map(|d| d.to_string()).collect())
    }

    fn profile(email: &str) -> Profile {
        Profile {
            id: "u1".into(),
            email: Some(email.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_company_domain_yields_company_url() {
        let sources = gatherer().gather_deterministic_sources(&profile("ceo@Acme.io"));
        assert_eq!(sources.email_domain.as_deref(), Some("acme.io"));
        assert_eq!(sources.company_url.as_deref(), Some("https://acme.io"));
    }

    #[test]
    fn test_consumer_domains_never_yield_company() {
        let g = gatherer();
        for domain in DEFAULT_CONSUMER_DOMAINS {
            let sources = g.gather_deterministic_sources(&profile(&format!("someone@{}", domain)));
            assert!(sources.email_domain.is_none(), "{} leaked", domain);
            assert!(sources.company_url.is_none(), "{} leaked", domain);
        }

        let sources = g.gather_deterministic_sources(&profile("x@GMAIL.COM"));
        assert!(sources.email_domain.is_none());
    }

    #[test]
    fn test_gathering_is_idempotent() {
        let mut p = profile("ada@analytical.engine");
        p.linkedin_url = Some("https://linkedin.com/in/ada".into());
        p.website_urls = vec!["https://ada.dev".into()];

        let g = gatherer();
        assert_eq!(g.gather_deterministic_sources(&p), g.gather_deterministic_sources(&p));
    }

    #[test]
    fn test_gravatar_digest_is_normalized() {
        assert_eq!(gravatar_url("  Ada@Example.COM "), gravatar_url("ada@example.com"));
        // sha256("ada@example.com") is 64 hex chars
        let url = gravatar_url("ada@example.com");
        let digest = url
            .trim_start_matches("https://www.gravatar.com/avatar/")
            .trim_end_matches("?d=404");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_avatar_suppresses_gravatar() {
        let mut p = profile("ada@example.com");
        p.avatar_url = Some("https://cdn/ada.png".into());
        assert!(gatherer().gather_deterministic_sources(&p).gravatar_url.is_none());

        p.avatar_url = Some("  ".into());
        assert!(gatherer().gather_deterministic_sources(&p).gravatar_url.is_some());
    }

    #[test]
    fn test_blank_social_urls_are_absent() {
        let p = Profile {
            id: "u1".into(),
            github_url: Some("".into()),
            twitter_url: Some("https://x.com/ada".into()),
            website_urls: vec!["".into(), "https://ada.dev".into()],
            ..Default::default()
        };

        let sources = gatherer().gather_deterministic_sources(&p);
        assert!(sources.github_url.is_none());
        assert_eq!(sources.twitter_url.as_deref(), Some("https://x.com/ada"));
        assert_eq!(sources.website_urls, vec!["https://ada.dev"]);
        assert!(sources.gravatar_url.is_none());
    }
}
