use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::host::SourceIdentifier;
use crate::letterboxd::histogram::{self, Source};
use crate::letterboxd::{FetchError, Letterboxd};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Resolving,
    Fetching,
    Extracting,
    Done,
    Aborted,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Resolving => "resolving",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Done => "done",
            Stage::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// What a finished run hands to the sink. `None` fields are unavailable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatingResult {
    pub rating: Option<f64>,
    pub total_ratings: Option<u64>,
    pub canonical_url: String,
}

/// Receives the result of a successful run. Not called on abort.
pub trait PresentationSink {
    fn present(&mut self, result: RatingResult);
}

#[derive(Debug, Error)]
pub enum Abort {
    #[error("film tt{imdb_id} not found on Letterboxd")]
    NotFound { imdb_id: String },
    #[error("request error while {stage}: {source}")]
    Failed {
        stage: Stage,
        #[source]
        source: FetchError,
    },
}

/// One lookup for one title: resolve, fetch the histogram, extract, present.
/// Consumed by [`Pipeline::run`].
pub struct Pipeline<'a> {
    site: &'a Letterboxd,
    stage: Stage,
}

impl<'a> Pipeline<'a> {
    pub fn new(site: &'a Letterboxd) -> Self {
        Self {
            site,
            stage: Stage::Idle,
        }
    }

    /// Returns the terminal stage, `Done` or `Aborted`. Failures are logged
    /// here and never surface to the caller.
    pub async fn run(mut self, id: &SourceIdentifier, sink: &mut impl PresentationSink) -> Stage {
        match self.drive(id).await {
            Ok(result) => {
                sink.present(result);
                self.advance(Stage::Done);
            }
            Err(abort) => {
                match &abort {
                    Abort::NotFound { .. } => info!("{}", abort),
                    Abort::Failed { .. } => warn!("{}", abort),
                }
                self.advance(Stage::Aborted);
            }
        }
        self.stage
    }

    async fn drive(&mut self, id: &SourceIdentifier) -> Result<RatingResult, Abort> {
        self.advance(Stage::Resolving);
        let film = self
            .site
            .resolve(id.as_str())
            .await
            .map_err(|source| self.failed(source))?
            .ok_or_else(|| Abort::NotFound {
                imdb_id: id.as_str().to_string(),
            })?;

        self.advance(Stage::Fetching);
        let hist_url = self
            .site
            .histogram_url(&film.resource_id)
            .map_err(|source| self.failed(source))?;
        info!("Letterboxd histogram URL for {}: {}", id, hist_url);
        let body = self
            .site
            .get_text(&hist_url)
            .await
            .map_err(|source| self.failed(source))?;

        self.advance(Stage::Extracting);
        let hist = histogram::extract(&body);
        if hist.source == Source::NoData {
            warn!(
                "No rating markers in histogram for {}; markup may have changed",
                film.canonical_url
            );
        }

        Ok(RatingResult {
            rating: hist.rating,
            total_ratings: hist.total_ratings,
            canonical_url: film.canonical_url.to_string(),
        })
    }

    fn failed(&self, source: FetchError) -> Abort {
        Abort::Failed {
            stage: self.stage,
            source,
        }
    }

    fn advance(&mut self, next: Stage) {
        debug!("pipeline {} -> {}", self.stage, next);
        self.stage = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct Recorder(Vec<RatingResult>);

    impl PresentationSink for Recorder {
        fn present(&mut self, result: RatingResult) {
            self.0.push(result);
        }
    }

    fn site_for(server: &MockServer, timeout_secs: u64) -> Letterboxd {
        Letterboxd::new(&Settings {
            base_url: server.uri(),
            timeout_secs,
            ..Settings::default()
        })
        .unwrap()
    }

    async fn mount_redirect(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/imdb/0133093/"))
            .respond_with(ResponseTemplate::new(302).insert_header("Location", "/film/the-matrix/"))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/film/the-matrix/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .mount(server)
            .await;
    }

    fn fixture(name: &str) -> String {
        std::fs::read_to_string(format!("tests/fixtures/{}.html", name)).unwrap()
    }

    fn matrix() -> SourceIdentifier {
        SourceIdentifier::parse("0133093").unwrap()
    }

    #[tokio::test]
    async fn end_to_end_presents_once() {
        let server = MockServer::start().await;
        mount_redirect(&server).await;
        Mock::given(method("GET"))
            .and(path("/csi/film/the-matrix/rating-histogram/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("histogram_average")))
            .expect(1)
            .mount(&server)
            .await;

        let site = site_for(&server, 10);
        let mut sink = Recorder::default();
        let stage = Pipeline::new(&site).run(&matrix(), &mut sink).await;

        assert_eq!(stage, Stage::Done);
        assert_eq!(
            sink.0,
            vec![RatingResult {
                rating: Some(4.2),
                total_ratings: Some(1_234_567),
                canonical_url: format!("{}/film/the-matrix/", server.uri()),
            }]
        );
    }

    #[tokio::test]
    async fn manual_tally_reaches_sink() {
        let server = MockServer::start().await;
        mount_redirect(&server).await;
        Mock::given(method("GET"))
            .and(path("/csi/film/the-matrix/rating-histogram/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("histogram_not_enough")))
            .mount(&server)
            .await;

        let site = site_for(&server, 10);
        let mut sink = Recorder::default();
        assert_eq!(Pipeline::new(&site).run(&matrix(), &mut sink).await, Stage::Done);
        assert_eq!(sink.0.len(), 1);
        assert_eq!(sink.0[0].rating, None);
        assert_eq!(sink.0[0].total_ratings, Some(14));
    }

    #[tokio::test]
    async fn no_markers_still_presents_link() {
        let server = MockServer::start().await;
        mount_redirect(&server).await;
        Mock::given(method("GET"))
            .and(path("/csi/film/the-matrix/rating-histogram/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(fixture("histogram_empty")))
            .mount(&server)
            .await;

        let site = site_for(&server, 10);
        let mut sink = Recorder::default();
        assert_eq!(Pipeline::new(&site).run(&matrix(), &mut sink).await, Stage::Done);
        assert_eq!(sink.0[0].rating, None);
        assert_eq!(sink.0[0].total_ratings, None);
        assert!(sink.0[0].canonical_url.ends_with("/film/the-matrix/"));
    }

    #[tokio::test]
    async fn not_found_aborts_without_presenting() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imdb/0133093/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let site = site_for(&server, 10);
        let mut sink = Recorder::default();
        assert_eq!(Pipeline::new(&site).run(&matrix(), &mut sink).await, Stage::Aborted);
        assert!(sink.0.is_empty());
    }

    #[tokio::test]
    async fn histogram_timeout_aborts_without_presenting() {
        let server = MockServer::start().await;
        mount_redirect(&server).await;
        Mock::given(method("GET"))
            .and(path("/csi/film/the-matrix/rating-histogram/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(fixture("histogram_average"))
                    .set_delay(std::time::Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let site = site_for(&server, 1);
        let mut sink = Recorder::default();
        assert_eq!(Pipeline::new(&site).run(&matrix(), &mut sink).await, Stage::Aborted);
        assert!(sink.0.is_empty());
    }

    #[tokio::test]
    async fn histogram_server_error_aborts() {
        let server = MockServer::start().await;
        mount_redirect(&server).await;
        Mock::given(method("GET"))
            .and(path("/csi/film/the-matrix/rating-histogram/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let site = site_for(&server, 10);
        let mut sink = Recorder::default();
        assert_eq!(Pipeline::new(&site).run(&matrix(), &mut sink).await, Stage::Aborted);
        assert!(sink.0.is_empty());
    }

    #[tokio::test]
    async fn timeout_is_classified_per_stage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/imdb/0133093/"))
            .respond_with(ResponseTemplate::new(302).set_delay(std::time::Duration::from_secs(3)))
            .mount(&server)
            .await;

        let site = site_for(&server, 1);
        let mut pipeline = Pipeline::new(&site);
        let err = pipeline.drive(&matrix()).await.unwrap_err();
        assert!(matches!(
            err,
            Abort::Failed {
                stage: Stage::Resolving,
                source: FetchError::Timeout { .. },
            }
        ));
    }
}
