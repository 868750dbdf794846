use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use url::{ParseError, Url};

/// Attributes whose values are URLs and therefore subject to the scheme check.
pub(crate) const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Tags, per-tag attributes and URL schemes that survive sanitization. Everything else is dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizationPolicy {
    name: &'static str,
    tags: BTreeSet<String>,
    tag_attributes: BTreeMap<String, BTreeSet<String>>,
    url_schemes: BTreeSet<String>,
    tag_url_schemes: BTreeMap<String, BTreeSet<String>>,
    allow_relative_urls: bool,
}

fn set_of(items: &[&str]) -> BTreeSet<String> { items.iter().map(|s| s.to_ascii_lowercase()).collect() }

impl SanitizationPolicy {
    /// Empty policy: strips every tag.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            tags: BTreeSet::new(),
            tag_attributes: BTreeMap::new(),
            url_schemes: BTreeSet::new(),
            tag_url_schemes: BTreeMap::new(),
            allow_relative_urls: false,
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags.extend(set_of(tags));
        self
    }

    pub fn with_attributes(mut self, tag: &str, attrs: &[&str]) -> Self {
        self.tag_attributes.entry(tag.to_ascii_lowercase()).or_default().extend(set_of(attrs));
        self
    }

    pub fn with_schemes(mut self, schemes: &[&str]) -> Self {
        self.url_schemes.extend(set_of(schemes));
        self
    }

    /// Per-tag scheme set; replaces the global set for URL attributes on `tag`.
    pub fn with_tag_schemes(mut self, tag: &str, schemes: &[&str]) -> Self {
        self.tag_url_schemes.entry(tag.to_ascii_lowercase()).or_default().extend(set_of(schemes));
        self
    }

    pub fn allow_relative_urls(mut self, allow: bool) -> Self {
        self.allow_relative_urls = allow;
        self
    }

    pub fn name(&self) -> &'static str { self.name }
    pub fn tags(&self) -> &BTreeSet<String> { &self.tags }
    pub fn tag_attributes(&self) -> &BTreeMap<String, BTreeSet<String>> { &self.tag_attributes }
    pub fn relative_urls_allowed(&self) -> bool { self.allow_relative_urls }

    pub fn permits_tag(&self, tag: &str) -> bool { self.tags.contains(&tag.to_ascii_lowercase()) }

    pub fn permits_attribute(&self, tag: &str, attr: &str) -> bool {
        self.tag_attributes
            .get(&tag.to_ascii_lowercase())
            .map(|a| a.contains(&attr.to_ascii_lowercase()))
            .unwrap_or(false)
    }

    /// Schemes in effect for URL attributes on `tag`.
    pub fn schemes_for(&self, tag: &str) -> &BTreeSet<String> {
        self.tag_url_schemes.get(&tag.to_ascii_lowercase()).unwrap_or(&self.url_schemes)
    }

    /// Every scheme any tag may use.
    pub(crate) fn all_schemes(&self) -> BTreeSet<String> {
        let mut out = self.url_schemes.clone();
        for s in self.tag_url_schemes.values() { out.extend(s.iter().cloned()); }
        out
    }

    /// Whether `url` may appear in a URL attribute of `tag`.
    pub fn permits_url(&self, tag: &str, url: &str) -> bool {
        match Url::parse(url.trim()) {
            Ok(u) => self.schemes_for(tag).contains(u.scheme()),
            Err(ParseError::RelativeUrlWithoutBase) => self.allow_relative_urls,
            Err(_) => false,
        }
    }
}

static IMAGE_INSERT: Lazy<SanitizationPolicy> = Lazy::new(|| {
    SanitizationPolicy::new("image_insert")
        .with_tags(&["img"])
        .with_attributes("img", &["src", "alt"])
        .with_schemes(&["https"])
        .with_tag_schemes("img", &["https"])
});

static POST_BODY: Lazy<SanitizationPolicy> = Lazy::new(|| {
    SanitizationPolicy::new("post_body")
        .with_tags(&["b", "i", "em", "strong", "a", "p", "br", "img", "ul", "ol", "li"])
        .with_attributes("a", &["target", "rel", "href"])
        .with_attributes("img", &["src", "alt", "width", "height"])
        .with_schemes(&["http", "https", "data"])
        .with_tag_schemes("a", &["http", "https"])
        .allow_relative_urls(true)
});

/// Narrow policy for the single `<img>` tag appended after an upload.
pub fn image_insert_policy() -> &'static SanitizationPolicy { &IMAGE_INSERT }

/// Policy for full post bodies and comments.
pub fn post_body_policy() -> &'static SanitizationPolicy { &POST_BODY }
