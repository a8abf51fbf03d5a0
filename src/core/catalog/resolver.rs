use reqwest::{Client, StatusCode};
use tracing::{debug, info};

use super::model::{CatalogEntry, DownloadDescriptor, InstallUnit};
use crate::core::error::ResolveError;

/// Capability for turning a catalog identifier into an installable unit.
/// Injected into the pipeline so tests and alternative catalogs can swap
/// the implementation.
#[async_trait::async_trait]
pub trait CatalogResolver: Send + Sync {
    async fn resolve(&self, identifier: &str) -> Result<InstallUnit, ResolveError>;
}

/// Resolver backed by a JSON catalog endpoint: `GET <base>/<identifier>`
/// returns a [`CatalogEntry`] with a version-ordered download list.
pub struct HttpCatalogResolver {
    client: Client,
    base_url: String,
}

impl HttpCatalogResolver {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { client, base_url }
    }
}

#[async_trait::async_trait]
impl CatalogResolver for HttpCatalogResolver {
    /// Resolution is read-only: one GET, no retries, no caching. The latest
    /// version is the last entry of the catalog's version-ordered list.
    async fn resolve(&self, identifier: &str) -> Result<InstallUnit, ResolveError> {
        let url = format!("{}/{}", self.base_url, identifier);
        debug!("Resolving {} via {}", identifier, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(ResolveError::NotFound(identifier.to_string()));
            }
            status if !status.is_success() => {
                return Err(ResolveError::Unavailable(format!(
                    "catalog returned HTTP {} for {}",
                    status.as_u16(),
                    identifier
                )));
            }
            _ => {}
        }

        let body = response
            .text()
            .await
            .map_err(|e| ResolveError::Unavailable(e.to_string()))?;
        let entry: CatalogEntry =
            serde_json::from_str(&body).map_err(|e| ResolveError::MalformedResponse {
                identifier: identifier.to_string(),
                reason: e.to_string(),
            })?;

        // An entry without a downloadable version is as good as absent.
        let Some(version) = entry.versions.last() else {
            return Err(ResolveError::NotFound(identifier.to_string()));
        };

        info!(
            "Resolved '{}' to {} ({} file digests)",
            identifier,
            version.download_url,
            version.hashes.len()
        );

        Ok(InstallUnit {
            identifier: entry.id,
            display_name: entry.name.clone(),
            descriptors: vec![DownloadDescriptor {
                url: version.download_url.clone(),
                expected_hashes: version.hashes.clone(),
                label: entry.name,
            }],
            subdir: None,
        })
    }
}
