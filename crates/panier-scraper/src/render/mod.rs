//! Page rendering capability used by the store adapters.
//!
//! Adapters only talk to [`Renderer`], [`RenderedPage`] and [`PageElement`];
//! the production backend is [`ChromiumRenderer`]. Tests plug in an in-memory
//! document instead.

mod chromium;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;

pub use chromium::ChromiumRenderer;

/// Interval between selector probes in [`RenderedPage::wait_for`].
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationOptions {
    /// Upper bound for the initial page load.
    pub timeout: Duration,
}

/// Opens pages. Every call hands out a page that the caller owns exclusively
/// and must [`close`](RenderedPage::close).
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigates to `url` and waits for the load to settle.
    ///
    /// # Errors
    ///
    /// [`ScraperError::BrowserLaunch`] when no browser session can be started,
    /// [`ScraperError::Navigation`] when the page does not load in time.
    async fn open(
        &self,
        url: &str,
        options: NavigationOptions,
    ) -> Result<Box<dyn RenderedPage>, ScraperError>;
}

/// A loaded, interactive document.
///
/// Selectors are CSS, plus the `tag:has-text("…")` form for matching an
/// element by its visible text.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// All elements matching `selector`, in document order.
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScraperError>;

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, ScraperError> {
        Ok(self.query_all(selector).await?.into_iter().next())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError>;

    /// Clicks the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<(), ScraperError> {
        match self.query(selector).await? {
            Some(element) => element.click().await,
            None => Err(ScraperError::ElementNotFound {
                selector: selector.to_owned(),
            }),
        }
    }

    /// Replaces the value of the input matching `selector` with `text`.
    async fn fill(&self, selector: &str, text: &str) -> Result<(), ScraperError>;

    /// Sends a single named key (`"Enter"`, `"Backspace"`) to `selector`.
    async fn press(&self, selector: &str, key: &str) -> Result<(), ScraperError>;

    /// Types `text` key by key into `selector`, keeping its current value.
    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError>;

    /// Waits until at least one element matches `selector`.
    ///
    /// Returns `Ok(false)` once `timeout` elapses without a match; only
    /// backend failures are errors.
    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<bool, ScraperError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.query_all(selector).await?.is_empty() {
                return Ok(true);
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    /// Releases the page and whatever browser session backs it.
    async fn close(self: Box<Self>) -> Result<(), ScraperError>;
}

#[async_trait]
pub trait PageElement: Send + Sync {
    /// Rendered text of the element, `None` if it has none.
    async fn inner_text(&self) -> Result<Option<String>, ScraperError>;

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError>;

    /// First descendant matching a CSS `selector`.
    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, ScraperError>;

    async fn click(&self) -> Result<(), ScraperError>;
}

/// A selector of the form `button:has-text("Tout accepter")`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TextSelector<'a> {
    pub base: &'a str,
    pub text: &'a str,
}

impl<'a> TextSelector<'a> {
    const MARKER: &'static str = ":has-text(";

    /// Splits a `:has-text(...)` selector into its CSS part and the quoted
    /// text. Returns `None` for plain CSS selectors.
    pub(crate) fn parse(selector: &'a str) -> Option<Self> {
        let start = selector.find(Self::MARKER)?;
        let base = selector[..start].trim();
        let rest = selector[start + Self::MARKER.len()..].strip_suffix(')')?;
        let text = rest
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .or_else(|| rest.strip_prefix('\'').and_then(|r| r.strip_suffix('\'')))?;
        Some(Self {
            base: if base.is_empty() { "*" } else { base },
            text,
        })
    }

    /// Case-insensitive containment check against an element's text, with
    /// whitespace collapsed on both sides.
    pub(crate) fn matches(&self, inner_text: &str) -> bool {
        collapse_whitespace(inner_text)
            .to_lowercase()
            .contains(&collapse_whitespace(self.text).to_lowercase())
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
