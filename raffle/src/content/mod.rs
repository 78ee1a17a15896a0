//! Themed page copy.
//!
//! A [`ContentProvider`] may produce a title, a description and prize
//! highlights for the raffle page. It never fails: anything that goes wrong
//! is logged and reported as [`ThemeResult::Unavailable`], and the page falls
//! back to [`PageCopy`] defaults.

mod anthropic;

pub use anthropic::{AnthropicContentProvider, DEFAULT_API_URL, DEFAULT_MODEL, THEME_PROMPT};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Page title used when no themed copy is available
pub const DEFAULT_TITLE: &str = "Sorteio Tech 2024";

/// Page description used when no themed copy is available
pub const DEFAULT_DESCRIPTION: &str =
    "Participe da nossa rifa. Selecione seus números, preencha seus dados e boa sorte!";

/// Generated copy for the raffle page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeContent {
    /// Catchy page title
    pub title: String,
    /// Short description
    pub description: String,
    /// Prize bullet points
    pub prize_highlights: Vec<String>,
}

/// Outcome of a content request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ThemeResult {
    /// Copy was generated
    Content(ThemeContent),
    /// No copy; show the defaults
    Unavailable,
}

impl ThemeResult {
    /// Label used for logs and metrics
    #[must_use]
    pub const fn outcome(&self) -> &'static str {
        match self {
            Self::Content(_) => "content",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Source of themed page copy.
///
/// Returns a `BoxFuture` so providers can be injected as
/// `Arc<dyn ContentProvider>`.
pub trait ContentProvider: Send + Sync {
    /// Generates page copy; failures surface as [`ThemeResult::Unavailable`]
    fn generate(&self) -> BoxFuture<'_, ThemeResult>;
}

/// Provider that always answers with the same result
#[derive(Clone, Debug)]
pub struct StaticContentProvider {
    result: ThemeResult,
}

impl StaticContentProvider {
    /// Answers with `result`
    #[must_use]
    pub const fn new(result: ThemeResult) -> Self {
        Self { result }
    }

    /// Answers with `content`
    #[must_use]
    pub const fn content(content: ThemeContent) -> Self {
        Self::new(ThemeResult::Content(content))
    }

    /// Never has copy
    #[must_use]
    pub const fn unavailable() -> Self {
        Self::new(ThemeResult::Unavailable)
    }
}

impl ContentProvider for StaticContentProvider {
    fn generate(&self) -> BoxFuture<'_, ThemeResult> {
        Box::pin(async move { self.result.clone() })
    }
}

/// Copy shown in the page header
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageCopy {
    /// Header title
    pub title: String,
    /// Header description
    pub description: String,
    /// Prize highlights; empty without themed copy
    pub highlights: Vec<String>,
}

impl PageCopy {
    /// Themed copy when present, defaults otherwise
    #[must_use]
    pub fn resolve(theme: Option<&ThemeContent>) -> Self {
        theme.map_or_else(
            || Self {
                title: DEFAULT_TITLE.to_string(),
                description: DEFAULT_DESCRIPTION.to_string(),
                highlights: Vec::new(),
            },
            |theme| Self {
                title: theme.title.clone(),
                description: theme.description.clone(),
                highlights: theme.prize_highlights.clone(),
            },
        )
    }
}
