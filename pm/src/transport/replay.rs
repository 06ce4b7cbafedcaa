//! Offline transports: recorded event logs and data sets on disk
//!
//! An event log is JSON lines, one `BackendChangeEvent` per line; blank lines
//! are skipped. A data directory holds `<backend-id>.json` files, each a JSON
//! array of data points.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use futures::Stream;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::debug;

use super::{FeedError, FetchError, FetchTransport, into_points};
use crate::domain::{BackendChangeEvent, BackendId, DataPoint};

/// Decode a JSON-lines event log from any async reader
pub fn jsonl_feed<R>(reader: R) -> impl Stream<Item = Result<BackendChangeEvent, FeedError>> + Send + 'static
where
    R: AsyncRead + Send + Unpin + 'static,
{
    let lines = BufReader::new(reader).lines();
    futures::stream::unfold(Some((lines, 0usize)), |state| async move {
        let (mut lines, mut line_no) = state?;
        loop {
            line_no += 1;
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => {
                    let item = serde_json::from_str::<BackendChangeEvent>(&line)
                        .map_err(|source| FeedError::DecodeLine { line: line_no, source });
                    return Some((item, Some((lines, line_no))));
                }
                Ok(None) => return None,
                Err(e) => return Some((Err(FeedError::Io(e)), None)),
            }
        }
    })
}

/// Open a JSON-lines event log file
pub async fn open_jsonl_feed(
    path: impl AsRef<Path>,
) -> Result<impl Stream<Item = Result<BackendChangeEvent, FeedError>> + Send + 'static, FeedError> {
    debug!(path = %path.as_ref().display(), "open_jsonl_feed: called");
    let file = tokio::fs::File::open(path.as_ref()).await?;
    Ok(jsonl_feed(file))
}

/// Fetch transport serving data sets from `<dir>/<backend-id>.json`
#[derive(Debug, Clone)]
pub struct DirectoryTransport {
    dir: PathBuf,
}

impl DirectoryTransport {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the data set for `backend_id`
    ///
    /// The id must be a single plain file name component; anything that could
    /// resolve outside the data directory is rejected.
    pub fn path_for(&self, backend_id: &BackendId) -> Result<PathBuf, FetchError> {
        let id = backend_id.as_str();
        let unsafe_id = |reason: &str| FetchError::UnsafeId {
            backend_id: backend_id.clone(),
            reason: reason.to_string(),
        };

        if id.contains(['/', '\\']) {
            return Err(unsafe_id("contains a path separator"));
        }
        let mut components = Path::new(id).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.dir.join(format!("{}.json", id))),
            _ => Err(unsafe_id("not a plain file name")),
        }
    }
}

#[async_trait]
impl FetchTransport for DirectoryTransport {
    async fn fetch_data(&self, backend_id: &BackendId) -> Result<Vec<DataPoint>, FetchError> {
        let path = self.path_for(backend_id)?;
        debug!(%backend_id, path = %path.display(), "DirectoryTransport::fetch_data: called");
        let content = tokio::fs::read_to_string(&path).await?;
        let payload: serde_json::Value = serde_json::from_str(&content)?;
        into_points(payload)
    }
}
