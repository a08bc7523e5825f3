//! Host-page side of the lookup: turning whatever the user pasted into an IMDb
//! id, and deciding from a saved title page whether a rating is worth showing.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use serde::Serialize;
use thiserror::Error;

static TITLE_URL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"/tt([0-9]+)(?:/|$|\?)").unwrap());
static BARE_ID_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?:tt)?([0-9]+)$").unwrap());

static AGGREGATE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-testid="hero-rating-bar__aggregate-rating__score"]"#).unwrap()
});
static USER_RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-testid="hero-rating-bar__user-rating"]"#).unwrap());
static POPULARITY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"[data-testid="hero-rating-bar__popularity"]"#).unwrap());

#[derive(Debug, Error, PartialEq)]
pub enum IdentifierError {
    #[error("no IMDb title id in {0:?}")]
    Missing(String),
    #[error("IMDb title id must be non-zero: {0:?}")]
    Zero(String),
}

/// Numeric IMDb title id without the `tt` prefix, e.g. `0133093`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceIdentifier(String);

impl SourceIdentifier {
    /// Accepts `0133093`, `tt0133093`, or a title URL like
    /// `https://www.imdb.com/title/tt0133093/reviews`.
    pub fn parse(input: &str) -> Result<Self, IdentifierError> {
        let input = input.trim();
        let digits = BARE_ID_RE
            .captures(input)
            .or_else(|| TITLE_URL_RE.captures(input))
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| IdentifierError::Missing(input.to_string()))?;

        if digits.bytes().all(|b| b == b'0') {
            return Err(IdentifierError::Zero(input.to_string()));
        }
        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tt{}", self.0)
    }
}

/// Rating-bar affordance present on the host title page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingBar {
    /// Host shows its own average; the film is released and rated.
    Aggregate,
    /// Too few host ratings for an average, only the "rate this" button.
    UserRating,
    /// Upcoming film with only a popularity meter.
    Popularity,
}

impl RatingBar {
    /// `None` means no rating bar at all: unreleased, or a subpage of the title.
    pub fn detect(html: &str) -> Option<Self> {
        let doc = Html::parse_document(html);
        if doc.select(&AGGREGATE).next().is_some() {
            Some(Self::Aggregate)
        } else if doc.select(&USER_RATING).next().is_some() {
            Some(Self::UserRating)
        } else if doc.select(&POPULARITY).next().is_some() {
            Some(Self::Popularity)
        } else {
            None
        }
    }
}
