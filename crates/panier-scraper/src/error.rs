use thiserror::Error;

/// Infrastructure failures raised by the render backend or a store adapter.
///
/// "No product found" is never an error; adapters return an empty candidate
/// list for that.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("page interaction failed: {0}")]
    Render(String),

    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("invalid search URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}
