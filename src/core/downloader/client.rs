use futures_util::stream::{self, Stream, StreamExt};
use reqwest::Client;
use tracing::{debug, warn};

use crate::core::cancel::CancelToken;
use crate::core::error::FetchError;
use crate::core::progress::Progress;

/// One download to perform: a display name plus its ordered mirror URLs.
/// URLs are tried in order and the first success wins.
#[derive(Debug, Clone)]
pub struct FetchItem {
    pub display_name: String,
    pub urls: Vec<String>,
}

/// Exactly one outcome is produced per [`FetchItem`], in input order.
/// `url` is the source that produced the result (the winning mirror on
/// success, the last attempted one on failure).
#[derive(Debug)]
pub struct FetchOutcome {
    pub display_name: String,
    pub url: String,
    pub result: Result<Vec<u8>, FetchError>,
}

/// Sequential HTTP fetcher with per-item progress reporting.
#[derive(Clone)]
pub struct BatchDownloader {
    client: Client,
}

impl BatchDownloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Fetch `items` one by one as a lazy stream.
    ///
    /// The current item's display name is reported before its bytes are
    /// requested, so an observer always knows what is in flight. A failed
    /// outcome terminates the stream: remaining items are not attempted and
    /// the caller must treat them as unprocessed. No automatic retry.
    pub fn fetch_sequence<'a>(
        &'a self,
        items: Vec<FetchItem>,
        progress: &'a Progress,
        cancel: &'a CancelToken,
    ) -> impl Stream<Item = FetchOutcome> + 'a {
        stream::unfold(items.into_iter(), move |mut remaining| async move {
            let item = remaining.next()?;
            let outcome = self.fetch_item(item, progress, cancel).await;
            let next = if outcome.result.is_err() {
                // Early termination: drop everything after the failed item.
                Vec::new().into_iter()
            } else {
                remaining
            };
            Some((outcome, next))
        })
    }

    /// Single-shot GET of a whole body (used for playlist manifests).
    pub async fn fetch(&self, url: &str, cancel: &CancelToken) -> Result<Vec<u8>, FetchError> {
        let progress = Progress::detached();
        self.fetch_url(url, &progress, cancel).await
    }

    async fn fetch_item(
        &self,
        item: FetchItem,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> FetchOutcome {
        progress.item(&item.display_name);

        let mut last: Option<(String, FetchError)> = None;
        for url in &item.urls {
            if cancel.is_cancelled() {
                return FetchOutcome {
                    display_name: item.display_name,
                    url: url.clone(),
                    result: Err(FetchError::Cancelled { url: url.clone() }),
                };
            }

            match self.fetch_url(url, progress, cancel).await {
                Ok(bytes) => {
                    debug!("Fetched {} ({} bytes)", url, bytes.len());
                    return FetchOutcome {
                        display_name: item.display_name,
                        url: url.clone(),
                        result: Ok(bytes),
                    };
                }
                Err(e) => {
                    warn!("Fetch failed for '{}' from {}: {}", item.display_name, url, e);
                    last = Some((url.clone(), e));
                }
            }
        }

        let (url, error) = last.unwrap_or_else(|| {
            (
                String::new(),
                FetchError::Transport {
                    url: String::new(),
                    reason: "no download source".to_string(),
                },
            )
        });
        FetchOutcome {
            display_name: item.display_name,
            url,
            result: Err(error),
        }
    }

    async fn fetch_url(
        &self,
        url: &str,
        progress: &Progress,
        cancel: &CancelToken,
    ) -> Result<Vec<u8>, FetchError> {
        let response =
            self.client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let total = response.content_length();
        let mut body = response.bytes_stream();
        let mut bytes = Vec::with_capacity(total.unwrap_or(0) as usize);
        while let Some(chunk) = body.next().await {
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled {
                    url: url.to_string(),
                });
            }
            let chunk = chunk.map_err(|e| FetchError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            bytes.extend_from_slice(&chunk);
            progress.bytes(bytes.len() as u64, total);
        }

        Ok(bytes)
    }
}
