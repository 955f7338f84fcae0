//! Catalog access for the forum's manga plugin.
//!
//! [`ForumSource`] is the narrow capability set the rest of the program uses:
//! list, detail, pages, and configure. All traffic goes through the
//! [`AuthenticatingClient`], so members-only chapters load transparently once
//! credentials are configured.

mod model;
mod parse;

pub use model::{ChapterRef, MangaDetail, MangaSummary, PageImage};
pub use parse::{parse_chapter_pages, parse_manga_detail, parse_manga_list};

use tracing::{debug, instrument};
use url::Url;

use crate::auth::Credentials;
use crate::fetch::{AuthenticatingClient, FetchError};

/// Display name of the site.
pub const SOURCE_NAME: &str = "zero搬运网";
/// Content language.
pub const SOURCE_LANG: &str = "zh";

/// Manga catalog backed by the authenticating pipeline.
#[derive(Debug, Clone)]
pub struct ForumSource {
    client: AuthenticatingClient,
}

impl ForumSource {
    /// Creates a source over `client`.
    #[must_use]
    pub fn new(client: AuthenticatingClient) -> Self {
        Self { client }
    }

    /// Returns the underlying pipeline.
    #[must_use]
    pub fn client(&self) -> &AuthenticatingClient {
        &self.client
    }

    /// Fetches one page of the catalog listing. Pages start at 1; 0 is read as 1.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] on transport, authentication, or status failures.
    #[instrument(skip(self))]
    pub async fn fetch_list(&self, page: u32) -> Result<Vec<MangaSummary>, FetchError> {
        let path = format!(
            "plugin.php?id=jameson_manhua&c=index&a=ku&page={}",
            page.max(1)
        );
        let url = self.resolve(&path)?;
        let html = self.client.get_html(url.clone()).await?;
        let list = parse_manga_list(&html, &url);
        debug!(entries = list.len(), "parsed listing");
        Ok(list)
    }

    /// Fetches a manga detail page and its chapter list.
    ///
    /// `url` may be absolute or relative to the endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Parse`] when the page is not a manga page, and
    /// [`FetchError`] on transport, authentication, or status failures.
    #[instrument(skip(self))]
    pub async fn fetch_detail(&self, url: &str) -> Result<MangaDetail, FetchError> {
        let url = self.resolve(url)?;
        let html = self.client.get_html(url.clone()).await?;
        let detail =
            parse_manga_detail(&html, &url).map_err(|reason| FetchError::parse(url.as_str(), reason))?;
        debug!(chapters = detail.chapters.len(), "parsed manga detail");
        Ok(detail)
    }

    /// Fetches the page images of one chapter.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Parse`] when the chapter shows no images (usually
    /// a members-only chapter viewed without a session), and [`FetchError`]
    /// on transport, authentication, or status failures.
    #[instrument(skip(self))]
    pub async fn fetch_pages(&self, chapter_url: &str) -> Result<Vec<PageImage>, FetchError> {
        let url = self.resolve(chapter_url)?;
        let html = self.client.get_html(url.clone()).await?;
        let pages = parse_chapter_pages(&html, &url);
        if pages.is_empty() {
            return Err(FetchError::parse(url.as_str(), "chapter has no page images"));
        }
        debug!(pages = pages.len(), "parsed chapter pages");
        Ok(pages)
    }

    /// Replaces the stored credentials; the current session is dropped.
    pub async fn configure(&self, credentials: Credentials) {
        self.client.store().set_credentials(credentials).await;
    }

    fn resolve(&self, url: &str) -> Result<Url, FetchError> {
        if let Ok(absolute) = Url::parse(url) {
            return Ok(absolute);
        }
        self.client
            .store()
            .endpoint()
            .url(url)
            .map_err(|_| FetchError::invalid_url(url))
    }
}
