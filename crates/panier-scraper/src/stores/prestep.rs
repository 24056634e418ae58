//! Best-effort page preparation run before listings are read.
//!
//! Nothing here can fail a search: each step reports whether it applied and
//! logs a warning when it could not.

use std::time::Duration;

use crate::error::ScraperError;
use crate::render::RenderedPage;

use super::profiles::{StoreLocatorFlow, StoreProfile};

const CONSENT_SETTLE: Duration = Duration::from_secs(1);
const LOCATOR_WAIT: Duration = Duration::from_secs(10);

/// Outcome of the pre-steps for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PreStepReport {
    /// A consent button was clicked.
    pub consent: bool,
    /// `None` when the retailer has no store locator.
    pub store_selected: Option<bool>,
}

pub(crate) async fn run(
    page: &dyn RenderedPage,
    profile: &StoreProfile,
    locality: &str,
) -> PreStepReport {
    let consent = dismiss_consent(page, profile.consent_buttons).await;
    let store_selected = match &profile.store_locator {
        Some(flow) => Some(select_store(page, flow, locality).await),
        None => None,
    };
    PreStepReport {
        consent,
        store_selected,
    }
}

/// Clicks the first visible button of `buttons`.
pub(crate) async fn dismiss_consent(page: &dyn RenderedPage, buttons: &[&str]) -> bool {
    for button in buttons {
        match page.is_visible(button).await {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                tracing::warn!(selector = button, error = %e, "consent probe failed");
                return false;
            }
        }

        return match page.click(button).await {
            Ok(()) => {
                tracing::debug!(selector = button, "consent overlay dismissed");
                tokio::time::sleep(CONSENT_SETTLE).await;
                true
            }
            Err(e) => {
                tracing::warn!(selector = button, error = %e, "consent click failed");
                false
            }
        };
    }
    false
}

/// Picks the first store the locator suggests for `locality`.
pub(crate) async fn select_store(
    page: &dyn RenderedPage,
    flow: &StoreLocatorFlow,
    locality: &str,
) -> bool {
    if locality.trim().is_empty() {
        tracing::debug!("no locality, store selection skipped");
        return false;
    }
    match try_select_store(page, flow, locality.trim()).await {
        Ok(selected) => {
            if selected {
                tracing::debug!(locality, "store selected");
            }
            selected
        }
        Err(e) => {
            tracing::warn!(locality, error = %e, "store selection failed");
            false
        }
    }
}

async fn try_select_store(
    page: &dyn RenderedPage,
    flow: &StoreLocatorFlow,
    locality: &str,
) -> Result<bool, ScraperError> {
    if !page.is_visible(flow.open_link).await? {
        tracing::debug!(selector = flow.open_link, "store locator link not visible");
        return Ok(false);
    }
    page.click(flow.open_link).await?;
    settle(Duration::from_secs(2)).await;

    if !page.wait_for(flow.search_input, LOCATOR_WAIT).await? {
        tracing::warn!(selector = flow.search_input, "store search input never appeared");
        return Ok(false);
    }
    settle(Duration::from_secs(1)).await;

    page.fill(flow.search_input, locality).await?;
    settle(Duration::from_secs(1)).await;

    // Deleting and retyping the last character is what opens the suggestions.
    page.press(flow.search_input, "Backspace").await?;
    settle(Duration::from_millis(500)).await;
    if let Some(last) = locality.chars().last() {
        page.type_text(flow.search_input, &last.to_string()).await?;
        settle(Duration::from_millis(500)).await;
    }

    page.press(flow.search_input, "Enter").await?;
    settle(Duration::from_secs(2)).await;

    if !page.wait_for(flow.first_result, LOCATOR_WAIT).await? {
        tracing::warn!(locality, "store locator returned no store");
        return Ok(false);
    }
    page.click(flow.first_result).await?;
    settle(Duration::from_secs(2)).await;

    if page.query(flow.close_button).await?.is_some() {
        page.click(flow.close_button).await?;
        settle(Duration::from_secs(1)).await;
    } else {
        tracing::debug!(selector = flow.close_button, "locator close button not found");
    }

    Ok(true)
}

async fn settle(pause: Duration) {
    tokio::time::sleep(pause).await;
}
