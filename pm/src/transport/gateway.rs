//! Registry gateway client
//!
//! The gateway fronts every registered backend. It publishes registry changes
//! as a server-sent event stream and proxies each backend's data set:
//!
//! - `GET {base-url}{feed-path}`: SSE, one `BackendChangeEvent` JSON per message
//! - `GET {base-url}{data-path}`: JSON array of data points, `{id}` substituted

use std::time::Duration;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::{Client, Url};
use reqwest_eventsource::{Event, EventSource};
use tracing::{debug, info, warn};

use super::{FeedError, FetchError, FetchTransport, into_points};
use crate::config::GatewayConfig;
use crate::domain::{BackendChangeEvent, BackendId, DataPoint};

/// HTTP client for the registry gateway
pub struct GatewayClient {
    base_url: Url,
    feed_url: Url,
    data_path: String,
    /// Client for data fetches, bounded by the request timeout
    http: Client,
    /// Client for the feed; only connecting is bounded, the stream is long-lived
    feed_http: Client,
}

impl GatewayClient {
    /// Create a new client from gateway configuration
    pub fn from_config(config: &GatewayConfig) -> Result<Self, FetchError> {
        debug!(?config, "GatewayClient::from_config: called");
        let timeout = Duration::from_millis(config.timeout_ms);

        let base_url = Url::parse(&config.base_url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(format!("{}: not a base URL", config.base_url)));
        }
        let feed_url = with_segments(&base_url, &config.feed_path, None)?;

        let http = Client::builder().timeout(timeout).build()?;
        let feed_http = Client::builder().connect_timeout(timeout).build()?;

        Ok(Self {
            base_url,
            feed_url,
            data_path: config.data_path.clone(),
            http,
            feed_http,
        })
    }

    /// URL of the registry event stream
    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }

    /// URL serving the data set of `backend_id`
    ///
    /// The id fills a single path segment, percent-encoded, so it can never
    /// reach a different resource.
    pub fn data_url(&self, backend_id: &BackendId) -> Result<Url, FetchError> {
        let id = backend_id.as_str();
        if matches!(id, "" | "." | "..") {
            return Err(FetchError::UnsafeId {
                backend_id: backend_id.clone(),
                reason: "not a usable path segment".to_string(),
            });
        }
        with_segments(&self.base_url, &self.data_path, Some(backend_id))
    }

    /// Subscribe to the registry event stream
    ///
    /// The stream is not reconnected on failure: a transport error is yielded
    /// once and the stream ends after it.
    pub fn event_feed(&self) -> Result<impl Stream<Item = Result<BackendChangeEvent, FeedError>> + Send + 'static, FeedError> {
        let url = self.feed_url.clone();
        debug!(%url, "GatewayClient::event_feed: called");

        let mut es = EventSource::new(self.feed_http.get(url)).map_err(|e| FeedError::Connect(e.to_string()))?;
        es.set_retry_policy(Box::new(reqwest_eventsource::retry::Never));

        Ok(futures::stream::unfold(Some(es), |state| async move {
            let mut es = state?;
            loop {
                match es.next().await {
                    Some(Ok(Event::Open)) => {
                        info!("Registry feed connected");
                    }
                    Some(Ok(Event::Message(msg))) => {
                        debug!(event = %msg.event, "event_feed: received message");
                        let item = serde_json::from_str::<BackendChangeEvent>(&msg.data).map_err(FeedError::Decode);
                        return Some((item, Some(es)));
                    }
                    Some(Err(reqwest_eventsource::Error::StreamEnded)) | None => {
                        info!("Registry feed closed by gateway");
                        es.close();
                        return None;
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "event_feed: stream error");
                        es.close();
                        return Some((Err(FeedError::Stream(e.to_string())), None));
                    }
                }
            }
        }))
    }
}

/// Append the segments of `path` to `base`, filling `{id}` from `backend_id`
fn with_segments(base: &Url, path: &str, backend_id: Option<&BackendId>) -> Result<Url, FetchError> {
    let mut url = base.clone();
    {
        let mut segments = url
            .path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(format!("{}: not a base URL", base)))?;
        segments.pop_if_empty();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            match backend_id {
                Some(id) => segments.push(&segment.replace("{id}", id.as_str())),
                None => segments.push(segment),
            };
        }
    }
    Ok(url)
}

#[async_trait]
impl FetchTransport for GatewayClient {
    async fn fetch_data(&self, backend_id: &BackendId) -> Result<Vec<DataPoint>, FetchError> {
        let url = self.data_url(backend_id)?;
        debug!(%backend_id, %url, "GatewayClient::fetch_data: called");

        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            debug!(%backend_id, %status, "fetch_data: non-success status");
            return Err(FetchError::Status {
                backend_id: backend_id.clone(),
                status: status.as_u16(),
                message: body,
            });
        }

        let payload: serde_json::Value = serde_json::from_str(&body)?;
        into_points(payload)
    }
}
