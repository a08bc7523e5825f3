use clap::ValueEnum;
use serde_json::json;

use crate::host::RatingBar;
use crate::numfmt::{self, PLACEHOLDER};
use crate::pipeline::{PresentationSink, RatingResult};

const LABEL: &str = "LETTERBOXD";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Sink that renders each result into a line, shaped after the host page's
/// rating bar. Lines are printed by the caller once the run is over.
pub struct Rendered {
    bar: RatingBar,
    format: OutputFormat,
    title: Option<String>,
    pub lines: Vec<String>,
}

impl Rendered {
    pub fn new(bar: RatingBar, format: OutputFormat) -> Self {
        Self {
            bar,
            format,
            title: None,
            lines: Vec::new(),
        }
    }

    /// Tag every line with the host title id (batch output).
    pub fn titled(mut self, title: String) -> Self {
        self.title = Some(title);
        self
    }
}

impl PresentationSink for Rendered {
    fn present(&mut self, result: RatingResult) {
        let line = match (self.format, &self.title) {
            (OutputFormat::Text, None) => text(&result, self.bar),
            (OutputFormat::Text, Some(t)) => format!("{}  {}", t, text(&result, self.bar)),
            (OutputFormat::Json, title) => {
                let mut v = json(&result, self.bar);
                if let Some(t) = title {
                    v["imdb_id"] = json!(t);
                }
                v.to_string()
            }
        };
        self.lines.push(line);
    }
}

pub fn text(result: &RatingResult, bar: RatingBar) -> String {
    match bar {
        RatingBar::Aggregate => format!(
            "{}  {}/5  {}  {}",
            LABEL,
            rating(result.rating),
            numfmt::compact(result.total_ratings),
            result.canonical_url
        ),
        // No host average: the count is shown as-is, uncompacted.
        RatingBar::UserRating => format!(
            "{}  {}/5  {}  {}",
            LABEL,
            rating(result.rating),
            result
                .total_ratings
                .map(|n| n.to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string()),
            result.canonical_url
        ),
        // Upcoming film: nothing to score yet, link only.
        RatingBar::Popularity => format!("{}  View  {}", LABEL, result.canonical_url),
    }
}

pub fn json(result: &RatingResult, bar: RatingBar) -> serde_json::Value {
    json!({
        "layout": bar,
        "rating": result.rating,
        "total_ratings": result.total_ratings,
        "total_display": numfmt::compact(result.total_ratings),
        "url": result.canonical_url,
    })
}

fn rating(value: Option<f64>) -> String {
    value
        .map(|r| r.to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}
