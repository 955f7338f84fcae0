//! Catalog records returned by [`super::ForumSource`].

use serde::Serialize;

/// One entry of the manga listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MangaSummary {
    /// Display title.
    pub title: String,
    /// Absolute detail page URL.
    pub url: String,
    /// Absolute cover image URL, when the listing shows one.
    pub cover_url: Option<String>,
}

/// A manga detail page with its chapter list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MangaDetail {
    pub title: String,
    pub url: String,
    pub cover_url: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    /// Chapters in page order.
    pub chapters: Vec<ChapterRef>,
}

/// Link to one chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterRef {
    pub title: String,
    pub url: String,
}

/// One page image of a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageImage {
    /// Zero-based reading order.
    pub index: usize,
    pub url: String,
}
