use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{info, warn};

static DISPLAY_RATING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".display-rating").unwrap());
static NOT_ENOUGH: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        r#"[title="Not enough ratings to calculate average"], [data-original-title="Not enough ratings to calculate average"]"#,
    )
    .unwrap()
});
static LEADING_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+(?:\.\d+)?)").unwrap());
static BASED_ON_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"based on\s+(.+?)\s*ratings?").unwrap());
// Per-star bar tooltips, e.g. title="3&nbsp;★★½ ratings (20%)".
static BUCKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"title="(\d[\d,]*)&nbsp"#).unwrap());

/// Which part of the fragment the figures came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The site's own weighted average and total.
    Average,
    /// Below the site's threshold: total counted from the bar tooltips.
    ManualTally,
    /// Neither marker present.
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Histogram {
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
    pub source: Source,
}

/// Pull the rating and total out of a rating-histogram fragment. Never fails;
/// missing figures come back as `None`.
pub fn extract(body: &str) -> Histogram {
    let doc = Html::parse_fragment(body);

    if let Some(el) = doc.select(&DISPLAY_RATING).next() {
        return Histogram {
            rating: parse_rating(&el.text().collect::<String>()),
            total_ratings: tooltip(&el).and_then(parse_based_on),
            source: Source::Average,
        };
    }

    if doc.select(&NOT_ENOUGH).next().is_some() {
        let tally = manual_tally(body);
        match tally {
            Some(n) => info!("Manually counted {} ratings on Letterboxd for this film", n),
            None => warn!("Bucket counts in the histogram overflow; total unavailable"),
        }
        return Histogram {
            rating: None,
            total_ratings: tally.filter(|&n| n > 0),
            source: Source::ManualTally,
        };
    }

    warn!("Film exists on Letterboxd but the histogram has no ratings data");
    Histogram {
        rating: None,
        total_ratings: None,
        source: Source::NoData,
    }
}

fn tooltip<'a>(el: &ElementRef<'a>) -> Option<&'a str> {
    let value = el.value();
    value.attr("title").or_else(|| value.attr("data-original-title"))
}

fn parse_rating(text: &str) -> Option<f64> {
    LEADING_NUMBER_RE.captures(text)?[1].parse().ok()
}

/// "Weighted average of 4.21 based on 1,234,567 ratings" → 1234567.
fn parse_based_on(title: &str) -> Option<u64> {
    let caps = BASED_ON_RE.captures(title)?;
    digits(&caps[1])
}

/// Sum of every per-bucket count found in the raw markup. `None` on overflow.
fn manual_tally(body: &str) -> Option<u64> {
    BUCKET_RE
        .captures_iter(body)
        .filter_map(|caps| digits(&caps[1]))
        .try_fold(0u64, |acc, n| acc.checked_add(n))
}

fn digits(s: &str) -> Option<u64> {
    let d: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
    d.parse().ok()
}
