//! Shared domain enumerations aligned with persisted database enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category tag that subscribes a reader to every content kind.
pub const ALL_CATEGORY: &str = "all";

/// Publishable content kinds. Mirrors Postgres enum `content_kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "content_kind", rename_all = "snake_case")]
pub enum ContentKind {
    Blog,
    Webinar,
    Event,
    Resource,
    #[serde(alias = "job")]
    Careers,
}

/// How a content kind records whether it is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationShape {
    /// Nullable `published_at` timestamp.
    Timestamp,
    /// Boolean `published` flag.
    Flag,
}

/// Field that carries the human-written summary of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryField {
    Excerpt,
    ShortDescription,
    Description,
}

impl ContentKind {
    pub const ALL: [ContentKind; 5] = [
        ContentKind::Blog,
        ContentKind::Webinar,
        ContentKind::Event,
        ContentKind::Resource,
        ContentKind::Careers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::Webinar => "webinar",
            ContentKind::Event => "event",
            ContentKind::Resource => "resource",
            ContentKind::Careers => "careers",
        }
    }

    /// Parse a path segment or category tag. Exact, case-sensitive match.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "blog" => Some(ContentKind::Blog),
            "webinar" => Some(ContentKind::Webinar),
            "event" => Some(ContentKind::Event),
            "resource" => Some(ContentKind::Resource),
            "careers" | "job" => Some(ContentKind::Careers),
            _ => None,
        }
    }

    /// Capitalised label used in email subjects.
    pub fn display_name(self) -> &'static str {
        match self {
            ContentKind::Blog => "Blog",
            ContentKind::Webinar => "Webinar",
            ContentKind::Event => "Event",
            ContentKind::Resource => "Resource",
            ContentKind::Careers => "Careers",
        }
    }

    pub fn publication_shape(self) -> PublicationShape {
        match self {
            ContentKind::Blog | ContentKind::Webinar | ContentKind::Event => {
                PublicationShape::Timestamp
            }
            ContentKind::Resource | ContentKind::Careers => PublicationShape::Flag,
        }
    }

    /// The summary field written by editors of this kind.
    pub fn summary_field(self) -> SummaryField {
        match self {
            ContentKind::Blog => SummaryField::Excerpt,
            ContentKind::Webinar | ContentKind::Event => SummaryField::ShortDescription,
            ContentKind::Resource | ContentKind::Careers => SummaryField::Description,
        }
    }

    /// Default listing page path, relative to the site root.
    pub fn default_listing_path(self) -> &'static str {
        match self {
            ContentKind::Blog => "blog",
            ContentKind::Webinar => "webinars",
            ContentKind::Event => "events",
            ContentKind::Resource => "resources",
            ContentKind::Careers => "careers",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
