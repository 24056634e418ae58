//! Headless Chromium backend driven over CDP.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{NavigationOptions, PageElement, RenderedPage, Renderer, TextSelector};
use crate::error::ScraperError;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Launches one private Chromium process per [`Renderer::open`] call.
///
/// Sessions never share a profile directory, so concurrent adapter calls
/// cannot see each other's cookies or store selection.
#[derive(Debug, Clone)]
pub struct ChromiumRenderer {
    user_agent: String,
    headless: bool,
    executable: Option<PathBuf>,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
            headless: true,
            executable: None,
        }
    }

    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn executable(mut self, executable: Option<PathBuf>) -> Self {
        self.executable = executable;
        self
    }

    fn browser_config(
        &self,
        profile_dir: PathBuf,
        options: NavigationOptions,
    ) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--incognito")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--lang=fr-FR")
            .window_size(1920, 1080)
            .user_data_dir(profile_dir)
            .request_timeout(options.timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(ScraperError::BrowserLaunch)
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn open(
        &self,
        url: &str,
        options: NavigationOptions,
    ) -> Result<Box<dyn RenderedPage>, ScraperError> {
        let profile_dir = std::env::temp_dir().join(format!(
            "panier-chromium-{}-{}",
            std::process::id(),
            SESSION_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        let config = self.browser_config(profile_dir.clone(), options)?;

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(launched) => launched,
            Err(e) => {
                remove_profile_dir(&profile_dir).await;
                return Err(ScraperError::BrowserLaunch(e.to_string()));
            }
        };

        // The handler drives the CDP connection and must be polled for the
        // browser to respond at all.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let mut session = ChromiumSession {
            browser,
            handler_task,
            profile_dir,
        };

        match navigate(&session.browser, url, &self.user_agent, options.timeout).await {
            Ok(page) => Ok(Box::new(ChromiumPage { session, page })),
            Err(err) => {
                session.shutdown().await;
                Err(err)
            }
        }
    }
}

async fn navigate(
    browser: &Browser,
    url: &str,
    user_agent: &str,
    timeout: Duration,
) -> Result<Page, ScraperError> {
    let nav_err = |reason: String| ScraperError::Navigation {
        url: url.to_owned(),
        reason,
    };

    let page = browser
        .new_page("about:blank")
        .await
        .map_err(|e| nav_err(e.to_string()))?;
    page.set_user_agent(user_agent)
        .await
        .map_err(|e| nav_err(e.to_string()))?;

    let started = std::time::Instant::now();
    tokio::time::timeout(timeout, async {
        page.goto(url).await?.wait_for_navigation().await?;
        Ok::<(), chromiumoxide::error::CdpError>(())
    })
    .await
    .map_err(|_| nav_err(format!("timed out after {}s", timeout.as_secs())))?
    .map_err(|e| nav_err(e.to_string()))?;

    tracing::debug!(
        url,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "page loaded"
    );
    Ok(page)
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl ChromiumSession {
    /// Closes the browser, stops the CDP handler and removes the profile
    /// directory. Every step is attempted even if an earlier one fails.
    async fn shutdown(&mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::warn!(error = %e, "browser close failed");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::warn!(error = %e, "waiting for browser exit failed");
        }
        self.handler_task.abort();
        remove_profile_dir(&self.profile_dir).await;
    }
}

async fn remove_profile_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        tracing::debug!(
            dir = %dir.display(),
            error = %e,
            "could not remove browser profile dir"
        );
    }
}

struct ChromiumPage {
    session: ChromiumSession,
    page: Page,
}

impl ChromiumPage {
    async fn find_all(&self, selector: &str) -> Result<Vec<Element>, ScraperError> {
        if let Some(text_selector) = TextSelector::parse(selector) {
            let candidates = self
                .page
                .find_elements(text_selector.base)
                .await
                .map_err(render_err)?;
            let mut matching = Vec::new();
            for element in candidates {
                let text = element.inner_text().await.map_err(render_err)?;
                if text.is_some_and(|t| text_selector.matches(&t)) {
                    matching.push(element);
                }
            }
            return Ok(matching);
        }

        self.page.find_elements(selector).await.map_err(render_err)
    }

    async fn require(&self, selector: &str) -> Result<Element, ScraperError> {
        self.find_all(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ScraperError::ElementNotFound {
                selector: selector.to_owned(),
            })
    }
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, ScraperError> {
        Ok(self
            .find_all(selector)
            .await?
            .into_iter()
            .map(|e| Box::new(ChromiumElement(e)) as Box<dyn PageElement>)
            .collect())
    }

    async fn is_visible(&self, selector: &str) -> Result<bool, ScraperError> {
        for element in self.find_all(selector).await? {
            if let Ok(bounds) = element.bounding_box().await {
                if bounds.width > 0.0 && bounds.height > 0.0 {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    async fn fill(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        let element = self.require(selector).await?;
        element.click().await.map_err(render_err)?;
        element
            .call_js_fn("function() { this.value = ''; }", false)
            .await
            .map_err(render_err)?;
        element.type_str(text).await.map_err(render_err)?;
        Ok(())
    }

    async fn press(&self, selector: &str, key: &str) -> Result<(), ScraperError> {
        let element = self.require(selector).await?;
        element.focus().await.map_err(render_err)?;
        element.press_key(key).await.map_err(render_err)?;
        Ok(())
    }

    async fn type_text(&self, selector: &str, text: &str) -> Result<(), ScraperError> {
        let element = self.require(selector).await?;
        element.focus().await.map_err(render_err)?;
        element.type_str(text).await.map_err(render_err)?;
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<(), ScraperError> {
        let ChromiumPage { mut session, page } = *self;
        let page_result = page.close().await.map_err(render_err);
        session.shutdown().await;
        page_result
    }
}

struct ChromiumElement(Element);

#[async_trait]
impl PageElement for ChromiumElement {
    async fn inner_text(&self) -> Result<Option<String>, ScraperError> {
        self.0.inner_text().await.map_err(render_err)
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        self.0.attribute(name).await.map_err(render_err)
    }

    async fn query(&self, selector: &str) -> Result<Option<Box<dyn PageElement>>, ScraperError> {
        let found = self.0.find_elements(selector).await.map_err(render_err)?;
        Ok(found
            .into_iter()
            .next()
            .map(|e| Box::new(ChromiumElement(e)) as Box<dyn PageElement>))
    }

    async fn click(&self) -> Result<(), ScraperError> {
        self.0.click().await.map_err(render_err)?;
        Ok(())
    }
}

#[allow(clippy::needless_pass_by_value)]
fn render_err(e: chromiumoxide::error::CdpError) -> ScraperError {
    ScraperError::Render(e.to_string())
}
