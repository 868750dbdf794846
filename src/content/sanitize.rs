use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use ammonia::{Builder, UrlRelative};

use crate::error::{AppError, AppResult};

use super::policy::{image_insert_policy, SanitizationPolicy, URL_ATTRIBUTES};

// ammonia always drops these together with their content; they can never be allow-listed.
const CONTENT_STRIPPED: &[&str] = &["script", "style"];

/// Filter `raw` markup down to what `policy` allows. Parses as a fragment and never evaluates
/// anything; malformed input degrades to whatever survives, never to an error.
pub fn sanitize(raw: &str, policy: &SanitizationPolicy) -> String {
    if raw.trim().is_empty() { return String::new(); }

    let tags: HashSet<&str> = policy
        .tags()
        .iter()
        .map(String::as_str)
        .filter(|t| !CONTENT_STRIPPED.contains(t))
        .collect();
    let tag_attributes: HashMap<&str, HashSet<&str>> = policy
        .tag_attributes()
        .iter()
        .map(|(t, attrs)| (t.as_str(), attrs.iter().map(String::as_str).collect()))
        .collect();
    let all_schemes = policy.all_schemes();
    let url_schemes: HashSet<&str> = all_schemes.iter().map(String::as_str).collect();

    // ammonia only knows one global scheme set; per-tag overrides are applied here.
    let scheme_rules = policy.clone();

    let mut builder = Builder::default();
    builder
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(url_schemes)
        .link_rel(None)
        .url_relative(if policy.relative_urls_allowed() { UrlRelative::PassThrough } else { UrlRelative::Deny })
        .attribute_filter(move |element, attribute, value| {
            if URL_ATTRIBUTES.contains(&attribute) && !scheme_rules.permits_url(element, value) {
                tracing::debug!(target: "postboard::content", "dropped {}.{} under policy {}", element, attribute, scheme_rules.name());
                return None;
            }
            Some(Cow::Borrowed(value))
        });
    builder.clean(raw).to_string()
}

fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Markup for an uploaded image, ready to append to a post body.
pub fn image_tag(url: &str) -> AppResult<String> {
    let policy = image_insert_policy();
    if !policy.permits_url("img", url) {
        return Err(AppError::user("image_url_rejected", "Uploaded image URL must use https."));
    }
    let raw = format!(r#"<img src="{}" alt="image" />"#, escape_attr(url.trim()));
    Ok(sanitize(&raw, policy))
}

#[cfg(test)]
#[path = "sanitize_tests.rs"]
mod sanitize_tests;
