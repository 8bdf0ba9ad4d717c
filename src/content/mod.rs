/// Content records
///
/// One tagged record shape covers all four content types; what varies per
/// type is only the category table below and which form field carries the
/// body text. The attachment contract (image slot, pdf slot, optional
/// video URL) is identical everywhere.
mod manager;

pub use manager::{ContentManager, ContentManagers};

use crate::error::{CmsError, CmsResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Pages a Post can belong to
pub const POST_PAGES: &[&str] = &["research", "programs", "news"];

const RESEARCH_SECTIONS: &[&str] = &[
    "latest-publications",
    "ongoing-projects",
    "collaborations-partnerships",
];
const PROGRAM_SECTIONS: &[&str] = &[
    "innovation-labs",
    "incubation-programs",
    "funding-opportunities",
];
const NEWS_SECTIONS: &[&str] = &[
    "webinars-workshops",
    "announcements",
    "press-releases",
    "events",
];

/// The four content types served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContentKind {
    Post,
    Program,
    Research,
    NewsEvent,
}

impl ContentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Program => "program",
            ContentKind::Research => "research",
            ContentKind::NewsEvent => "news-event",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "post" => Some(ContentKind::Post),
            "program" => Some(ContentKind::Program),
            "research" => Some(ContentKind::Research),
            "news-event" => Some(ContentKind::NewsEvent),
            _ => None,
        }
    }

    /// Posts are filed under a page; the other types have a fixed table
    pub fn requires_page(self) -> bool {
        matches!(self, ContentKind::Post)
    }

    /// Multipart field name carrying the body text for this type
    pub fn body_field(self) -> &'static str {
        match self {
            ContentKind::Post => "content",
            _ => "description",
        }
    }

    /// Allowed sections, given the page for Posts
    pub fn allowed_sections(self, page: Option<&str>) -> Option<&'static [&'static str]> {
        match self {
            ContentKind::Post => match page? {
                "research" => Some(RESEARCH_SECTIONS),
                "programs" => Some(PROGRAM_SECTIONS),
                "news" => Some(NEWS_SECTIONS),
                _ => None,
            },
            ContentKind::Program => Some(PROGRAM_SECTIONS),
            ContentKind::Research => Some(RESEARCH_SECTIONS),
            ContentKind::NewsEvent => Some(NEWS_SECTIONS),
        }
    }
}

/// Validate a page/section pair against the category table for a kind
pub fn validate_category(kind: ContentKind, page: Option<&str>, section: &str) -> CmsResult<()> {
    if kind.requires_page() {
        let page = page.ok_or_else(|| {
            CmsError::Validation("Page is required for posts".to_string())
        })?;
        if !POST_PAGES.contains(&page) {
            return Err(CmsError::Validation(format!("Invalid page: {}", page)));
        }
    }

    let allowed = kind
        .allowed_sections(page)
        .ok_or_else(|| CmsError::Validation("Invalid page".to_string()))?;

    if !allowed.contains(&section) {
        return Err(CmsError::Validation(format!(
            "Invalid section for this content type: {}",
            section
        )));
    }

    Ok(())
}

/// A persisted content record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRecord {
    pub id: String,
    pub kind: ContentKind,
    pub title: String,
    pub title_ar: String,
    pub body: String,
    pub body_ar: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    pub section: String,
    pub image_id: Option<String>,
    pub pdf_id: Option<String>,
    pub video_url: Option<String>,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A record decorated with derived attachment URLs, as returned by the
/// API. The URLs are computed per response, never stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordView {
    #[serde(flatten)]
    pub record: ContentRecord,
    pub image_url: Option<String>,
    pub pdf_url: Option<String>,
}

/// Incoming field set for create and update requests
///
/// Everything is optional: create validates required fields are present,
/// update treats absent fields as "keep the previous value". For
/// `video_url` and `is_featured`, an explicit empty string / `false`
/// differs from omission.
#[derive(Debug, Default, Clone)]
pub struct RecordInput {
    pub title: Option<String>,
    pub title_ar: Option<String>,
    pub body: Option<String>,
    pub body_ar: Option<String>,
    pub page: Option<String>,
    pub section: Option<String>,
    pub video_url: Option<String>,
    pub is_featured: Option<bool>,
}

/// Accepts YouTube watch/share URLs, with or without scheme and www
pub fn is_valid_video_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let rest = rest.strip_prefix("www.").unwrap_or(rest);

    for host in ["youtube.com/", "youtu.be/"] {
        if let Some(path) = rest.strip_prefix(host) {
            return !path.is_empty();
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_tables_per_kind() {
        assert!(validate_category(ContentKind::Research, None, "ongoing-projects").is_ok());
        assert!(validate_category(ContentKind::Program, None, "innovation-labs").is_ok());
        assert!(validate_category(ContentKind::NewsEvent, None, "events").is_ok());

        assert!(validate_category(ContentKind::Research, None, "events").is_err());
        assert!(validate_category(ContentKind::NewsEvent, None, "bogus").is_err());
    }

    #[test]
    fn test_post_category_is_page_times_section() {
        assert!(validate_category(ContentKind::Post, Some("news"), "events").is_ok());
        assert!(
            validate_category(ContentKind::Post, Some("research"), "latest-publications").is_ok()
        );

        // Valid section, wrong page
        assert!(validate_category(ContentKind::Post, Some("research"), "events").is_err());
        // Unknown page
        assert!(validate_category(ContentKind::Post, Some("sports"), "events").is_err());
        // Page is mandatory for posts
        assert!(validate_category(ContentKind::Post, None, "events").is_err());
    }

    #[test]
    fn test_video_url_validation() {
        assert!(is_valid_video_url("https://youtube.com/watch?v=abc"));
        assert!(is_valid_video_url("https://www.youtube.com/watch?v=abc"));
        assert!(is_valid_video_url("http://youtu.be/abc"));
        assert!(is_valid_video_url("youtube.com/watch?v=abc"));

        assert!(!is_valid_video_url("https://youtube.com/"));
        assert!(!is_valid_video_url("https://vimeo.com/12345"));
        assert!(!is_valid_video_url("not a url"));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ContentKind::Post,
            ContentKind::Program,
            ContentKind::Research,
            ContentKind::NewsEvent,
        ] {
            assert_eq!(ContentKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(ContentKind::from_str("page"), None);
    }
}
