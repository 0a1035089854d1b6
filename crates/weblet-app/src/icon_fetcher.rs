//! Site icon discovery
//!
//! Finding an icon for a new webapp is best-effort: the page's
//! declared icons are tried first, then the conventional fallback
//! locations. Absence is not an error; a webapp without an icon gets
//! the generic one.

use scraper::{Html, Selector};
use std::sync::mpsc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use weblet_core::{WebletError, WebletResult};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) Weblet/0.1";

/// Icon bytes delivered by a background fetch, tagged with the
/// generation current when the fetch started.
#[derive(Debug)]
pub struct IconUpdate {
    pub webapp_id: String,
    pub generation: u64,
    pub data: Vec<u8>,
}

pub struct IconFetcher {
    client: reqwest::blocking::Client,
    generation: Arc<AtomicU64>,
}

impl IconFetcher {
    pub fn new() -> WebletResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WebletError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            generation: Arc::new(AtomicU64::new(0)),
        })
    }

    /// The generation a delivered `IconUpdate` must match to still be
    /// relevant. Editing a webapp's URL bumps this.
    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Try every strategy in order and return the first bytes that
    /// decode as an image.
    pub fn fetch(&self, page_url: &Url) -> Option<Vec<u8>> {
        self.fetch_metadata(page_url).icon
    }

    /// Best-effort site metadata: the page title and the first icon
    /// that decodes. Either, both, or neither may be present; network
    /// failures collapse to absence.
    pub fn fetch_metadata(&self, page_url: &Url) -> SiteMetadata {
        let html = self.download_html(page_url);
        if html.is_none() {
            log::warn!("Could not fetch page HTML from {}", page_url);
        }
        let title = html.as_deref().and_then(page_title);

        let mut candidates = html
            .map(|html| declared_icons(&html, page_url))
            .unwrap_or_default();
        for fallback in ["/favicon.ico", "/apple-touch-icon.png"] {
            if let Ok(url) = page_url.join(fallback) {
                candidates.push(url);
            }
        }
        candidates.dedup();

        let mut icon = None;
        for candidate in candidates {
            log::info!("Trying icon candidate {}", candidate);
            if let Some(data) = self.download_image(&candidate) {
                icon = Some(data);
                break;
            }
        }
        if icon.is_none() {
            log::info!("No icon found for {}", page_url);
        }

        SiteMetadata { title, icon }
    }

    /// Fetch on a background thread, delivering at most one update on
    /// the returned channel. The receiver should drop updates whose
    /// generation is stale.
    pub fn fetch_in_background(
        &self,
        webapp_id: &str,
        page_url: Url,
    ) -> mpsc::Receiver<IconUpdate> {
        let (sender, receiver) = mpsc::channel();
        let fetcher = Self {
            client: self.client.clone(),
            generation: Arc::clone(&self.generation),
        };
        let webapp_id = webapp_id.to_string();

        std::thread::spawn(move || {
            let generation = fetcher.current_generation();
            if let Some(data) = fetcher.fetch(&page_url) {
                // The receiver may be gone; that just means nobody
                // cares about this icon anymore.
                sender
                    .send(IconUpdate {
                        webapp_id,
                        generation,
                        data,
                    })
                    .ok();
            }
        });

        receiver
    }

    fn download_html(&self, url: &Url) -> Option<String> {
        let response = self.client.get(url.clone()).send().ok()?;
        if !response.status().is_success() {
            return None;
        }
        response.text().ok()
    }

    fn download_image(&self, url: &Url) -> Option<Vec<u8>> {
        let response = self.client.get(url.clone()).send().ok()?;
        if !response.status().is_success() {
            return None;
        }
        let bytes = response.bytes().ok()?;
        if bytes.is_empty() || image::load_from_memory(&bytes).is_err() {
            return None;
        }
        Some(bytes.to_vec())
    }
}

/// Best-effort metadata for a site.
#[derive(Debug, Default)]
pub struct SiteMetadata {
    pub title: Option<String>,
    pub icon: Option<Vec<u8>>,
}

/// The page's `<title>` text, if any.
fn page_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let element = Selector::parse("title")
        .ok()
        .and_then(|selector| document.select(&selector).next())?;
    let title = element.text().collect::<String>().trim().to_string();
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

/// Icon links declared in the page head, resolved against the page
/// URL. Order follows the rel-attribute priority list.
fn declared_icons(html: &str, base: &Url) -> Vec<Url> {
    const RELS: &[&str] = &[
        r#"link[rel="icon"]"#,
        r#"link[rel="shortcut icon"]"#,
        r#"link[rel="apple-touch-icon"]"#,
        r#"link[rel="apple-touch-icon-precomposed"]"#,
    ];

    let document = Html::parse_document(html);
    let mut icons = Vec::new();

    for rel in RELS {
        let Ok(selector) = Selector::parse(rel) else {
            continue;
        };
        for element in document.select(&selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href.starts_with("data:") {
                continue;
            }
            if let Ok(resolved) = base.join(href) {
                icons.push(resolved);
            }
        }
    }

    icons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://app.example.com/dashboard").unwrap()
    }

    #[test]
    fn test_declared_icons_resolve_relative_hrefs() {
        let html = r#"<html><head>
            <link rel="icon" href="/static/fav.png">
            <link rel="apple-touch-icon" href="touch.png">
        </head></html>"#;

        let icons = declared_icons(html, &base());
        assert_eq!(icons.len(), 2);
        assert_eq!(icons[0].as_str(), "https://app.example.com/static/fav.png");
        assert_eq!(icons[1].as_str(), "https://app.example.com/touch.png");
    }

    #[test]
    fn test_declared_icons_priority_order() {
        let html = r#"<head>
            <link rel="apple-touch-icon" href="/touch.png">
            <link rel="icon" href="/fav.png">
        </head>"#;

        let icons = declared_icons(html, &base());
        // rel="icon" wins regardless of document order.
        assert_eq!(icons[0].path(), "/fav.png");
    }

    #[test]
    fn test_declared_icons_skip_data_urls_and_blanks() {
        let html = r#"<head>
            <link rel="icon" href="data:image/png;base64,AAAA">
            <link rel="icon" href="   ">
            <link rel="icon">
        </head>"#;

        assert!(declared_icons(html, &base()).is_empty());
    }

    #[test]
    fn test_page_title_extraction() {
        assert_eq!(
            page_title("<html><head><title>  My App </title></head></html>"),
            Some("My App".to_string())
        );
        assert_eq!(page_title("<html><head><title></title></head></html>"), None);
        assert_eq!(page_title("<html><body>no head</body></html>"), None);
    }

    #[test]
    fn test_generation_invalidate() {
        let fetcher = IconFetcher::new().unwrap();
        let before = fetcher.current_generation();
        fetcher.invalidate();
        assert_eq!(fetcher.current_generation(), before + 1);
    }
}
