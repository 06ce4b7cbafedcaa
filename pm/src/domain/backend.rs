//! Backend descriptor and data points

use serde::{Deserialize, Serialize};

use super::id::BackendId;

/// One element of a fetched data set
///
/// The engine never looks inside a data point. Renderers may read whatever
/// fields they understand.
pub type DataPoint = serde_json::Value;

/// Map position a backend would like to be focused on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    #[serde(alias = "lat")]
    pub latitude: f64,
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

/// A data-providing backend as announced by the registry
///
/// Immutable snapshot of one registration. A re-registration produces a new
/// value, it never mutates an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub id: BackendId,

    /// Human-readable name, also the default presentation key
    pub display_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom: Option<u8>,
}

impl Backend {
    /// Create a backend with just an id and a display name
    pub fn new(id: impl Into<BackendId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            coordinates: None,
            zoom: None,
        }
    }
}
