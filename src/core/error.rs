//! Error taxonomy for rate acquisition and conversion.

use thiserror::Error;

/// Errors raised while acquiring quotes or converting amounts.
///
/// Everything except the caller errors (see [`RateError::is_caller_error`]) is
/// a tier failure: the fallback chain absorbs it and moves on to the next
/// source, so it never reaches the caller of a rates request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RateError {
    /// DNS resolution or the pre-flight TCP connect failed.
    #[error("Host unreachable: {0}")]
    HostUnreachable(String),

    /// The outbound request budget for the current window is spent.
    #[error("Rate limit exceeded: {limit} requests per {window_secs}s")]
    RateLimitExceeded { limit: u32, window_secs: u64 },

    /// The network call itself failed (connect, timeout, TLS, body read).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status.
    #[error("Bad response status: {0}")]
    BadStatus(u16),

    /// Upstream answered with an empty body.
    #[error("Empty response body")]
    EmptyBody,

    /// The document yielded no usable quotes.
    #[error("Failed to parse exchange rates: {0}")]
    ParseFailure(String),

    /// A JSON feed was malformed or missing its `rates` object.
    #[error("Invalid response from {0}")]
    InvalidResponse(String),

    /// A requested currency code is not in the quote table.
    #[error("Currency not available: {0}")]
    InvalidCurrency(String),

    /// Conversion amounts must be finite and positive.
    #[error("Invalid amount: {0}")]
    InvalidAmount(f64),

    /// The quote exists but the rate needed for this direction is not positive.
    #[error("No usable rate for currency: {0}")]
    UnpricedCurrency(String),
}

impl RateError {
    /// Errors caused by caller input, which propagate instead of triggering fallback.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            RateError::InvalidCurrency(_)
                | RateError::InvalidAmount(_)
                | RateError::UnpricedCurrency(_)
        )
    }
}

impl From<reqwest::Error> for RateError {
    fn from(err: reqwest::Error) -> Self {
        RateError::Transport(err.to_string())
    }
}
