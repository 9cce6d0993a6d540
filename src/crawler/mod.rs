use std::time::Duration;

use async_trait::async_trait;
use scraper::{ElementRef, Html, Node};
use tracing::{debug, error};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; WebCrawler/1.0)";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Elements whose text never counts as page content.
const SKIPPED_ELEMENTS: [&str; 5] = ["script", "style", "nav", "footer", "header"];

/// Outcome of extracting a page. Failures are values, not errors, so the
/// prompt can degrade instead of aborting the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    Text(String),
    Empty { url: String },
    Unreachable { url: String, reason: String },
}

impl PageContent {
    pub fn is_unreachable(&self) -> bool {
        matches!(self, PageContent::Unreachable { .. })
    }
}

/// Renders the in-band form: the text itself, or a sentinel sentence naming the url.
impl std::fmt::Display for PageContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PageContent::Text(text) => f.write_str(text),
            PageContent::Empty { url } => write!(f, "No meaningful content found at {url}"),
            PageContent::Unreachable { url, reason } => {
                write!(f, "Error: Could not retrieve content from {url}. {reason}")
            }
        }
    }
}

/// Anything that can turn a URL into page text.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn extract(&self, url: &str) -> PageContent;
}

/// Fetches pages over HTTP and reduces their HTML to plain text.
#[derive(Clone)]
pub struct WebCrawler {
    client: reqwest::Client,
}

impl WebCrawler {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, reqwest::Error> {
        self.client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl PageSource for WebCrawler {
    async fn extract(&self, url: &str) -> PageContent {
        match self.fetch_html(url).await {
            Ok(html) => {
                let text = extract_text(&html);
                debug!("Extracted {} characters from {url}", text.chars().count());
                if text.is_empty() {
                    PageContent::Empty { url: url.to_string() }
                } else {
                    PageContent::Text(text)
                }
            }
            Err(e) => {
                error!("Error crawling {url}: {e}");
                PageContent::Unreachable { url: url.to_string(), reason: e.to_string() }
            }
        }
    }
}

/// Body text of an HTML document with non-content elements dropped and
/// whitespace runs collapsed to single spaces.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let root = document.root_element();
    let body = root
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "body")
        .unwrap_or(root);

    let mut raw = String::new();
    collect_text(body, &mut raw);
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}
