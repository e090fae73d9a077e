use async_trait::async_trait;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

use crate::config::PreviewConfig;

/// Preview tags live in the document head; nothing past this is read.
pub const MAX_PAGE_BYTES: usize = 1 << 20;

/// Resolves a representative image for a shared link.
#[async_trait]
pub trait LinkPreviewer: Send + Sync {
    /// Best-effort: any failure is `None`.
    async fn preview_image(&self, link: &str) -> Option<String>;
}

/// Fetches the page and reads `og:image`, falling back to the site icon.
pub struct HttpPreviewer {
    client: reqwest::Client,
}

impl HttpPreviewer {
    pub fn new(config: &PreviewConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client })
    }

    async fn fetch(&self, url: &Url) -> Result<String, reqwest::Error> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await?
            .error_for_status()?;

        let mut page = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if !append_capped(&mut page, &chunk, MAX_PAGE_BYTES) {
                tracing::debug!("Link preview for {} truncated at {} bytes", url, MAX_PAGE_BYTES);
                break;
            }
        }
        Ok(String::from_utf8_lossy(&page).into_owned())
    }
}

#[async_trait]
impl LinkPreviewer for HttpPreviewer {
    async fn preview_image(&self, link: &str) -> Option<String> {
        let url = Url::parse(link).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }

        match self.fetch(&url).await {
            Ok(body) => extract_preview_image(&url, &body),
            Err(e) => {
                tracing::debug!("Link preview failed for {}: {}", url, e);
                None
            }
        }
    }
}

/// Pick the preview image out of a page, resolved against `base`.
pub fn extract_preview_image(base: &Url, html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let candidates = [
        (r#"meta[property="og:image"]"#, "content"),
        (r#"link[rel~="icon"]"#, "href"),
    ];

    candidates.iter().find_map(|(selector, attr)| {
        let selector = Selector::parse(selector).ok()?;
        let value = doc
            .select(&selector)
            .find_map(|el| el.value().attr(attr))
            .map(str::trim)
            .filter(|v| !v.is_empty())?;
        base.join(value)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .map(String::from)
    })
}

/// Append as much of `chunk` as fits under `cap`. Returns false once the
/// buffer is full.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buf.len());
    buf.extend_from_slice(&chunk[..chunk.len().min(room)]);
    buf.len() < cap
}

/// Previewer that never resolves anything.
pub struct NoPreview;

#[async_trait]
impl LinkPreviewer for NoPreview {
    async fn preview_image(&self, _link: &str) -> Option<String> {
        None
    }
}
