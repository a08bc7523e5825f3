use tracing::debug;
use url::Url;

use super::{FetchError, Letterboxd};

/// A film the rating site confirmed by redirecting away from the lookup URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilm {
    pub canonical_url: Url,
    /// Path of the canonical URL with the site origin stripped, e.g. `/film/the-matrix/`.
    pub resource_id: String,
}

impl Letterboxd {
    /// Look up an IMDb id (digits only). `Ok(None)` means no redirect happened,
    /// i.e. the rating site has no film mapped to this id.
    pub async fn resolve(&self, imdb_id: &str) -> Result<Option<ResolvedFilm>, FetchError> {
        let lookup_url = self.lookup_url(imdb_id)?;
        debug!("Resolving {}", lookup_url);

        let response = self.get(&lookup_url).await?;
        let final_url = response.url().clone();

        if final_url == lookup_url {
            debug!("No redirect from {}", lookup_url);
            return Ok(None);
        }

        let resource_id = strip_origin(&final_url, self.base());
        Ok(Some(ResolvedFilm {
            canonical_url: final_url,
            resource_id,
        }))
    }
}

/// Everything after the base origin. Off-site redirects keep only their path.
fn strip_origin(url: &Url, base: &Url) -> String {
    let full = url.as_str();
    let origin = base.as_str().trim_end_matches('/');
    match full.strip_prefix(origin) {
        Some(rest) if rest.starts_with('/') => rest.to_string(),
        _ => url.path().to_string(),
    }
}
