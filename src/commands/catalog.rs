//! Catalog command handlers: listing, manga detail, and chapter pages.

use anyhow::{Result, bail};
use futures_util::{StreamExt, stream};
use serde::Serialize;
use tracing::{info, warn};
use zerobyw_core::{ForumSource, PageImage};

use super::Output;

#[derive(Debug, Serialize)]
struct ChapterPages {
    chapter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages: Option<Vec<PageImage>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

pub async fn run_list_command(source: &ForumSource, page: u32, output: Output) -> Result<()> {
    let entries = source.fetch_list(page).await?;
    info!(page, entries = entries.len(), "Fetched catalog page");

    if output.emit_json(&entries)? {
        return Ok(());
    }
    for entry in &entries {
        println!("{}\t{}", entry.title, entry.url);
    }
    Ok(())
}

pub async fn run_manga_command(source: &ForumSource, url: &str, output: Output) -> Result<()> {
    let detail = source.fetch_detail(url).await?;

    if output.emit_json(&detail)? {
        return Ok(());
    }
    println!("title = {}", detail.title);
    println!("url = {}", detail.url);
    if let Some(cover) = &detail.cover_url {
        println!("cover = {cover}");
    }
    if !detail.authors.is_empty() {
        println!("authors = {}", detail.authors.join(", "));
    }
    if let Some(description) = &detail.description {
        println!("description = {description}");
    }
    println!("chapters = {}", detail.chapters.len());
    for chapter in &detail.chapters {
        println!("{}\t{}", chapter.title, chapter.url);
    }
    Ok(())
}

/// Fetches the chapters `concurrency` at a time, printing results in input order.
pub async fn run_pages_command(
    source: &ForumSource,
    urls: Vec<String>,
    concurrency: usize,
    output: Output,
) -> Result<()> {
    let results: Vec<ChapterPages> = stream::iter(urls)
        .map(|chapter| async move {
            match source.fetch_pages(&chapter).await {
                Ok(pages) => ChapterPages {
                    chapter,
                    pages: Some(pages),
                    error: None,
                },
                Err(error) => {
                    warn!(chapter = %chapter, error = %error, "Chapter fetch failed");
                    ChapterPages {
                        chapter,
                        pages: None,
                        error: Some(error.to_string()),
                    }
                }
            }
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let failed = results.iter().filter(|r| r.error.is_some()).count();

    if !output.emit_json(&results)? {
        for result in &results {
            println!("# {}", result.chapter);
            if let Some(pages) = &result.pages {
                for page in pages {
                    println!("{}\t{}", page.index, page.url);
                }
            }
            if let Some(error) = &result.error {
                println!("error: {error}");
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} chapters failed", results.len());
    }
    Ok(())
}
