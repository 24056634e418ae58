use thiserror::Error;

/// Errors returned by the geocoding and nearby-store providers.
#[derive(Debug, Error)]
pub enum GeoError {
    /// The provider did not answer within the client timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The provider answered 2xx with no body.
    #[error("empty response from {url}")]
    EmptyResponse { url: String },

    /// The body could not be decoded into the expected shape.
    #[error("malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    /// Any non-2xx status.
    #[error("{url} returned HTTP {status}")]
    UnexpectedStatus { status: u16, url: String },

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("address not found: {0}")]
    AddressNotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl GeoError {
    /// Whether another provider endpoint may succeed where this one failed.
    ///
    /// Caller mistakes and a definitive "no such address" are final.
    #[must_use]
    pub fn allows_fallback(&self) -> bool {
        !matches!(self, GeoError::AddressNotFound(_) | GeoError::InvalidRequest(_))
    }
}
