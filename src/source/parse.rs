//! Markup extraction for the forum's manga plugin pages.
//!
//! These functions are synchronous and own their parsed documents; `scraper`
//! documents are not `Send` and must never live across an `.await`.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::model::{ChapterRef, MangaDetail, MangaSummary, PageImage};

const LIST_ITEM: &str = "div.uk-card";
const LIST_LINK: &str = "p.mt5 > a";
const DETAIL_TITLE: &str = "h3.uk-heading-line";
const DETAIL_COVER: &str = "div.uk-width-medium > img";
const DETAIL_AUTHOR: &str = "div.cl > a.uk-label";
const DETAIL_DESCRIPTION: &str = "li > div.uk-alert";
const CHAPTER_LINK: &str = "div.muludiv > a";
const PAGE_IMAGE: &str = "div.uk-text-center > img";

/// Lazy-loading attributes checked before `src`.
const IMAGE_SOURCE_ATTRS: [&str; 3] = ["data-original", "data-src", "src"];

/// Extracts the listing entries of one catalog page.
#[must_use]
pub fn parse_manga_list(html: &str, page_url: &Url) -> Vec<MangaSummary> {
    let document = Html::parse_document(html);
    select(document.root_element(), LIST_ITEM)
        .into_iter()
        .filter_map(|card| {
            let link = select(card, LIST_LINK).into_iter().next()?;
            let url = absolute(page_url, link.value().attr("href")?)?;
            let title = text_of(link);
            if title.is_empty() {
                return None;
            }
            let cover_url = select(card, "img")
                .into_iter()
                .next()
                .and_then(|img| image_source(img, page_url));
            Some(MangaSummary {
                title,
                url,
                cover_url,
            })
        })
        .collect()
}

/// Extracts a manga detail page.
///
/// # Errors
///
/// Returns a reason string when the page has no title, which means it is not
/// a manga page (or the layout changed).
pub fn parse_manga_detail(html: &str, page_url: &Url) -> Result<MangaDetail, String> {
    let document = Html::parse_document(html);
    let root = document.root_element();

    let title = select(root, DETAIL_TITLE)
        .into_iter()
        .map(text_of)
        .find(|t| !t.is_empty())
        .ok_or_else(|| format!("no element matches `{DETAIL_TITLE}`"))?;

    let cover_url = select(root, DETAIL_COVER)
        .into_iter()
        .find_map(|img| image_source(img, page_url));

    let authors = select(root, DETAIL_AUTHOR)
        .into_iter()
        .map(text_of)
        .filter(|a| !a.is_empty())
        .collect();

    let description = select(root, DETAIL_DESCRIPTION)
        .into_iter()
        .map(text_of)
        .find(|d| !d.is_empty());

    let chapters = select(root, CHAPTER_LINK)
        .into_iter()
        .filter_map(|link| {
            let url = absolute(page_url, link.value().attr("href")?)?;
            Some(ChapterRef {
                title: text_of(link),
                url,
            })
        })
        .collect();

    Ok(MangaDetail {
        title,
        url: page_url.to_string(),
        cover_url,
        authors,
        description,
        chapters,
    })
}

/// Extracts the page images of a chapter in reading order.
#[must_use]
pub fn parse_chapter_pages(html: &str, page_url: &Url) -> Vec<PageImage> {
    let document = Html::parse_document(html);
    select(document.root_element(), PAGE_IMAGE)
        .into_iter()
        .filter_map(|img| image_source(img, page_url))
        .enumerate()
        .map(|(index, url)| PageImage { index, url })
        .collect()
}

fn select<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    Selector::parse(css)
        .map(|selector| scope.select(&selector).collect())
        .unwrap_or_default()
}

fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn image_source(img: ElementRef<'_>, page_url: &Url) -> Option<String> {
    IMAGE_SOURCE_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .and_then(|src| absolute(page_url, src))
}

fn absolute(page_url: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") {
        return None;
    }
    page_url.join(href).ok().map(String::from)
}
