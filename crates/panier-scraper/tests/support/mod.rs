//! In-memory page renderer for adapter and dispatcher tests.
//!
//! Documents map selector strings to nodes; a selector matches only when it is
//! registered verbatim, so fixtures use the exact selectors the store
//! profiles use. Every interaction is appended to a shared log.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use panier_scraper::{NavigationOptions, PageElement, RenderedPage, Renderer, ScraperError};

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    text: Option<String>,
    attributes: HashMap<String, String>,
    children: HashMap<String, FakeNode>,
    hidden: bool,
}

impl FakeNode {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_owned()),
            ..Self::default()
        }
    }

    pub fn child(mut self, selector: &str, node: FakeNode) -> Self {
        self.children.insert(selector.to_owned(), node);
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeDocument {
    nodes: HashMap<String, Vec<FakeNode>>,
    broken: Vec<String>,
}

impl FakeDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `node` to the matches of `selector`.
    pub fn with(mut self, selector: &str, node: FakeNode) -> Self {
        self.nodes.entry(selector.to_owned()).or_default().push(node);
        self
    }

    /// Makes every lookup of `selector` fail as if the browser went away.
    pub fn broken(mut self, selector: &str) -> Self {
        self.broken.push(selector.to_owned());
        self
    }
}

#[derive(Debug, Default)]
struct Counters {
    open_pages: AtomicUsize,
    max_open_pages: AtomicUsize,
    closed_pages: AtomicUsize,
}

#[derive(Debug, Clone)]
enum Route {
    Serve(FakeDocument),
    Fail(String),
}

/// Serves [`FakeDocument`]s by URL substring, first match wins.
#[derive(Debug, Clone, Default)]
pub struct FakeRenderer {
    routes: Vec<(String, Route)>,
    fallback: FakeDocument,
    open_delay: Duration,
    log: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
}

impl FakeRenderer {
    pub fn serving(document: FakeDocument) -> Self {
        Self {
            fallback: document,
            ..Self::default()
        }
    }

    pub fn route(mut self, url_part: &str, document: FakeDocument) -> Self {
        self.routes
            .push((url_part.to_owned(), Route::Serve(document)));
        self
    }

    pub fn fail_on(mut self, url_part: &str, reason: &str) -> Self {
        self.routes
            .push((url_part.to_owned(), Route::Fail(reason.to_owned())));
        self
    }

    /// Simulated page load time, spent before the page counts as open.
    pub fn open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = delay;
        self
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn opened_urls(&self) -> Vec<String> {
        self.log()
            .into_iter()
            .filter_map(|entry| entry.strip_prefix("open ").map(str::to_owned))
            .collect()
    }

    pub fn open_pages(&self) -> usize {
        self.counters.open_pages.load(Ordering::SeqCst)
    }

    pub fn max_open_pages(&self) -> usize {
        self.counters.max_open_pages.load(Ordering::SeqCst)
    }

    pub fn closed_pages(&self) -> usize {
        self.counters.closed_pages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn open(
        &self,
        url: &str,
        _options: NavigationOptions,
    ) -> Result<Box<dyn RenderedPage>, ScraperError> {
        self.log.lock().unwrap().push(format!("open {url}"));

        let route = self
            .routes
            .iter()
            .find(|(part, _)| url.contains(part.as_str()))
            .map_or_else(|| Route::Serve(self.fallback.clone()), |(_, r)| r.clone());

        let document = match route {
            Route::Serve(document) => document,
            Route::Fail(reason) => {
                return Err(ScraperError::Navigation {
                    url: url.to_owned(),
                    reason,
                })
            }
        };

        let open = self.counters.open_pages.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters
            .max_open_pages
            .fetch_max(open, Ordering::SeqCst);
        if !self.open_delay.is_zero() {
            tokio::time::sleep(self.open_delay).await;
        }

        Ok(Box::new(FakePage {
            document,
            log: Arc::clone(&self.log),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakePage {
    document: FakeDocument,
    log: Arc<Mutex<Vec<String>>>,
    counters: Arc<Counters>,
}

impl FakePage {
    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    fn require(&self, selector: &str) -> Result<(), ScraperError> {
        if self.document.nodes.get(selector).is_some_and(|n| !n.is_empty()) {
            Ok(())
        } else {
            Err(ScraperError::ElementNotFound {
                selector: selector.to_owned(),
            })
        }
    }
}

#[async_trait]
impl RenderedPage for FakePage {
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScraperError> {
        if self.document.broken.iter().any(|s| s == selector) {
            return Err(ScraperError::Render("target closed".to_owned()));
        }
        Ok(self
            .document
            .nodes
            .get(selector)
            .map(|nodes| {
                nodes
                    .iter()
                    .map(|node| {
                        Box::new(FakeElement {
                            node: node.clone(),
                            selector: selector.to_owned(),
                            log: Arc::clone(&self.log),
                        }) as Box<dyn PageElement>
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError> {
        Ok(self
            .document
            .nodes
            .get(selector)
            .is_some_and(|nodes| nodes.iter().any(|n| !n.hidden)))
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        self.require(selector)?;
        self.record(format!("fill {selector} {text}"));
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<(), ScraperError> {
        self.require(selector)?;
        self.record(format!("press {selector} {key}"));
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        self.require(selector)?;
        self.record(format!("type {selector} {text}"));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), ScraperError> {
        self.counters.open_pages.fetch_sub(1, Ordering::SeqCst);
        self.counters.closed_pages.fetch_add(1, Ordering::SeqCst);
        self.record("close".to_owned());
        Ok(())
    }
}

struct FakeElement {
    node: FakeNode,
    selector: String,
    log: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn inner_text(&self) -> Result<Option<String>, ScraperError> {
        Ok(self.node.text.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        Ok(self.node.attributes.get(name).cloned())
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, ScraperError> {
        Ok(self.node.children.get(selector).map(|node| {
            Box::new(FakeElement {
                node: node.clone(),
                selector: format!("{} {selector}", self.selector),
                log: Arc::clone(&self.log),
            }) as Box<dyn PageElement>
        }))
    }

    async fn click(&self) -> Result<(), ScraperError> {
        self.log
            .lock()
            .unwrap()
            .push(format!("click {}", self.selector));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Listing fixtures in each retailer's markup
// ---------------------------------------------------------------------------

pub const ALDI_LISTING: &str = "div.product-tile";
pub const CARREFOUR_LISTING: &str = "article.product-list-card-plp-grid-new";
pub const MONOPRIX_LISTING: &str = "div[data-test^='fop-wrapper:']";
pub const U_LISTING: &str = "li.grid-tile";

pub fn aldi_listing(name: &str, brand: &str, price: &str) -> FakeNode {
    FakeNode::empty()
        .child(
            "h2.product-tile__content__upper__product-name",
            FakeNode::text(name),
        )
        .child(
            "p.product-tile__content__upper__brand-name",
            FakeNode::text(brand),
        )
        .child("span.tag__label--price", FakeNode::text(price))
}

pub fn carrefour_listing(name: &str, brand: &str, integer: &str, decimal: &str) -> FakeNode {
    FakeNode::empty()
        .child(".product-list-card-plp-grid-new__title", FakeNode::text(name))
        .child(".product-list-card-plp-grid-new__brand", FakeNode::text(brand))
        .child(
            ".product-price__content.c-text--size-m",
            FakeNode::text(integer),
        )
        .child(
            ".product-price__content.c-text--size-s",
            FakeNode::text(decimal),
        )
}

pub fn monoprix_listing(name: &str, price: &str) -> FakeNode {
    FakeNode::empty()
        .child("h3[data-test='fop-title']", FakeNode::text(name))
        .child("span[data-test='fop-price']", FakeNode::text(price))
}

pub fn u_listing(name: &str, tracking: Option<&str>, price: &str) -> FakeNode {
    let node = FakeNode::empty()
        .child(".product-name .name-link", FakeNode::text(name))
        .child("[data-sup-product-price]", FakeNode::text(price));
    match tracking {
        Some(json) => node.attr("data-tc-product-tile", json),
        None => node,
    }
}

pub fn document(selector: &str, listings: Vec<FakeNode>) -> FakeDocument {
    listings
        .into_iter()
        .fold(FakeDocument::new(), |doc, node| doc.with(selector, node))
}
