//! Search context assembly
//!
//! Builds the free-text block handed to the normalizer. Output depends only on
//! the profile and the gathered sources.

use serde_json::json;

use crate::models::Profile;
use crate::types::EnrichmentSources;

/// Build the search context for one profile
pub fn build_search_context(profile: &Profile, sources: &EnrichmentSources) -> String {
    let full_name = profile.full_name();
    let mut lines = vec![format!("Name: \"{}\"", full_name)];

    if let Some(company) = profile.company.as_deref().filter(|c| !c.trim().is_empty()) {
        lines.push(format!("Company: \"{}\"", company.trim()));
    }

    if let Some(domain) = &sources.email_domain {
        lines.push(format!("Email domain: {}", domain));
    }

    let social = sources.known_social_fields();
    if !social.is_empty() {
        lines.push(format!("Known profiles: {}", social.join(", ")));
    }

    let core = json!({
        "name": full_name,
        "title": profile.title,
        "company": profile.company,
        "location": profile.location,
        "bio": profile.bio,
    });
    lines.push(format!("Current profile: {}", core));

    lines.join("\n")
}
