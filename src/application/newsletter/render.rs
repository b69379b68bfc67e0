//! Newsletter message rendering.
//!
//! Bodies are rendered once per content item with an unsubscribe placeholder;
//! each recipient's copy differs only by the substituted token.

use std::collections::HashMap;

use askama::Template;
use thiserror::Error;
use url::Url;

use crate::domain::{
    entities::ContentRecord,
    types::{ContentKind, SummaryField},
};

pub const UNSUBSCRIBE_PLACEHOLDER: &str = "__UNSUBSCRIBE_TOKEN__";
pub const NO_SUMMARY: &str = "No summary available.";

const SUMMARY_FALLBACKS: [SummaryField; 3] = [
    SummaryField::Excerpt,
    SummaryField::ShortDescription,
    SummaryField::Description,
];

#[derive(Debug, Error)]
#[error("failed to render newsletter template `{template}`")]
pub struct RenderError {
    template: &'static str,
    #[source]
    source: askama::Error,
}

/// Site URLs embedded in newsletter bodies.
#[derive(Debug, Clone)]
pub struct NewsletterLinks {
    site_url: Url,
    listing_paths: HashMap<ContentKind, String>,
}

impl NewsletterLinks {
    pub fn new(mut site_url: Url, listing_paths: HashMap<ContentKind, String>) -> Self {
        if !site_url.path().ends_with('/') {
            let path = format!("{}/", site_url.path());
            site_url.set_path(&path);
        }
        Self {
            site_url,
            listing_paths,
        }
    }

    /// Listing page for a kind; configured paths win over the kind default.
    pub fn listing_url(&self, kind: ContentKind) -> String {
        let path = self
            .listing_paths
            .get(&kind)
            .map(String::as_str)
            .unwrap_or_else(|| kind.default_listing_path());
        self.join(path)
    }

    /// Unsubscribe page URL carrying the per-recipient placeholder.
    pub fn unsubscribe_url(&self) -> String {
        self.join(&format!("newsletter/unsubscribe/{UNSUBSCRIBE_PLACEHOLDER}"))
    }

    fn join(&self, path: &str) -> String {
        let relative = path.trim_start_matches('/');
        match self.site_url.join(relative) {
            Ok(url) => url.into(),
            Err(_) => format!("{}{relative}", self.site_url),
        }
    }
}

/// Shared newsletter content for one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNewsletter {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// A recipient's copy of a rendered newsletter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonalizedNewsletter {
    pub subject: String,
    pub text: String,
    pub html: String,
}

impl RenderedNewsletter {
    pub fn personalize(&self, unsubscribe_token: &str) -> PersonalizedNewsletter {
        PersonalizedNewsletter {
            subject: self.subject.clone(),
            text: self.text.replace(UNSUBSCRIBE_PLACEHOLDER, unsubscribe_token),
            html: self.html.replace(UNSUBSCRIBE_PLACEHOLDER, unsubscribe_token),
        }
    }
}

#[derive(Template)]
#[template(path = "email/newsletter.html")]
struct NewsletterHtml<'a> {
    kind_label: &'a str,
    title: &'a str,
    summary: &'a str,
    listing_url: &'a str,
    unsubscribe_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/newsletter.txt")]
struct NewsletterText<'a> {
    kind_label: &'a str,
    title: &'a str,
    summary: &'a str,
    listing_url: &'a str,
    unsubscribe_url: &'a str,
}

pub fn subject_line(kind: ContentKind, title: &str) -> String {
    format!("New {} Available - {}", kind.display_name(), title)
}

/// Kind-specific summary, then the ordered fallbacks, then a placeholder.
pub fn summary_for(kind: ContentKind, item: &ContentRecord) -> &str {
    std::iter::once(kind.summary_field())
        .chain(SUMMARY_FALLBACKS)
        .find_map(|field| item.summary_field(field))
        .unwrap_or(NO_SUMMARY)
}

pub fn render_newsletter(
    kind: ContentKind,
    item: &ContentRecord,
    links: &NewsletterLinks,
) -> Result<RenderedNewsletter, RenderError> {
    let summary = summary_for(kind, item);
    let listing_url = links.listing_url(kind);
    let unsubscribe_url = links.unsubscribe_url();
    let kind_label = kind.display_name();

    let html = NewsletterHtml {
        kind_label,
        title: &item.title,
        summary,
        listing_url: &listing_url,
        unsubscribe_url: &unsubscribe_url,
    }
    .render()
    .map_err(|source| RenderError {
        template: "email/newsletter.html",
        source,
    })?;

    let text = NewsletterText {
        kind_label,
        title: &item.title,
        summary,
        listing_url: &listing_url,
        unsubscribe_url: &unsubscribe_url,
    }
    .render()
    .map_err(|source| RenderError {
        template: "email/newsletter.txt",
        source,
    })?;

    Ok(RenderedNewsletter {
        subject: subject_line(kind, &item.title),
        text,
        html,
    })
}
