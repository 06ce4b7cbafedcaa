//! Transports for the registry feed and backend data
//!
//! The engine only knows two seams:
//! - an event feed: any `Stream` of `Result<BackendChangeEvent, FeedError>`
//! - a [`FetchTransport`]: fetches one backend's data set
//!
//! Bundled implementations:
//! - [`GatewayClient`]: SSE feed and HTTP fetches against the registry gateway
//! - [`jsonl_feed`] / [`DirectoryTransport`]: replay recorded events against
//!   data sets on disk

use async_trait::async_trait;

use crate::domain::{BackendId, DataPoint};

mod error;
mod gateway;
mod replay;

pub use error::{FeedError, FetchError};
pub use gateway::GatewayClient;
pub use replay::{DirectoryTransport, jsonl_feed, open_jsonl_feed};

/// Fetches a backend's current data set
///
/// Each call is independent. Retrying, if wanted, belongs inside the
/// implementation; the engine never retries.
#[async_trait]
pub trait FetchTransport: Send + Sync {
    async fn fetch_data(&self, backend_id: &BackendId) -> Result<Vec<DataPoint>, FetchError>;
}

/// Interpret a decoded payload as a sequence of data points
pub(crate) fn into_points(payload: serde_json::Value) -> Result<Vec<DataPoint>, FetchError> {
    match payload {
        serde_json::Value::Array(points) => Ok(points),
        other => Err(FetchError::Payload(format!(
            "expected a JSON array of data points, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
