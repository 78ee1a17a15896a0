//! Error types for the raffle desk.

use std::fmt;
use thiserror::Error;

/// Errors raised by raffle configuration, checkout and reservation.
#[derive(Debug, Error)]
pub enum RaffleError {
    /// A raffle needs at least one ticket
    #[error("raffle must have at least one ticket")]
    NoTickets,

    /// Ticket price is negative or not a number
    #[error("invalid ticket price: {0}")]
    InvalidPrice(String),

    /// A checkout field was left blank
    #[error("{0} is required")]
    MissingBuyerField(BuyerField),

    /// Checkout submitted without any selected ticket
    #[error("no tickets selected")]
    EmptySelection,

    /// The ticket store rejected a read or write
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors raised by a [`TicketStore`](crate::storage::TicketStore).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing medium could not be read
    #[error("failed to read ticket store: {0}")]
    Read(String),

    /// The stored value is not a list of sold-ticket records
    #[error("ticket store holds malformed data: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// The backing medium could not be written
    #[error("failed to write ticket store: {0}")]
    Write(String),
}

/// Checkout form fields, all of which are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuyerField {
    /// Buyer's full name
    FullName,
    /// Contact phone
    Phone,
    /// Contact email
    Email,
}

impl fmt::Display for BuyerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullName => write!(f, "full name"),
            Self::Phone => write!(f, "phone"),
            Self::Email => write!(f, "email"),
        }
    }
}

/// Result alias for raffle operations
pub type Result<T> = std::result::Result<T, RaffleError>;

/// Errors raised while generating themed copy.
///
/// Never leaves the content module: providers log them and report
/// [`ThemeResult::Unavailable`](crate::content::ThemeResult::Unavailable).
#[derive(Debug, Error)]
pub enum ContentError {
    /// No `ANTHROPIC_API_KEY` configured
    #[error("missing ANTHROPIC_API_KEY")]
    MissingApiKey,

    /// HTTP request failed
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// Rate limited - too many requests
    #[error("rate limited")]
    RateLimited,

    /// Unauthorized - invalid API key
    #[error("unauthorized - invalid API key")]
    Unauthorized,

    /// API returned an error
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error body from the API
        message: String,
    },

    /// Response had no text block
    #[error("empty response")]
    EmptyResponse,

    /// Response body or generated text did not parse
    #[error("response parsing failed: {0}")]
    ResponseParseFailed(String),
}
