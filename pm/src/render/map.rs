//! MapModel - in-memory map of marker layers
//!
//! Each overlay is a layer of markers, one per data point that carries a
//! usable position. Points are read best-effort in the shape the backends
//! serve (`{"name", "description", "coordinates": [lat, lon]}`); anything
//! without a position is counted and skipped.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use super::OverlayRenderer;
use crate::domain::{Coordinates, DataPoint};

/// Identity of a built layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct LayerId(Uuid);

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One pin on the map
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub popup: Option<String>,
    pub position: Coordinates,
}

impl Marker {
    /// Read a marker out of an opaque data point
    pub fn from_point(point: &DataPoint) -> Option<Self> {
        let position = position_of(point.get("coordinates")?)?;
        let title = point
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("unnamed")
            .to_string();
        let popup = point.get("description").and_then(|v| v.as_str()).map(str::to_string);
        Some(Self { title, popup, position })
    }
}

fn position_of(value: &serde_json::Value) -> Option<Coordinates> {
    match value {
        serde_json::Value::Array(pair) if pair.len() == 2 => Some(Coordinates {
            latitude: pair[0].as_f64()?,
            longitude: pair[1].as_f64()?,
        }),
        serde_json::Value::Object(_) => serde_json::from_value(value.clone()).ok(),
        _ => None,
    }
}

/// A built overlay: markers plus the count of unusable points
#[derive(Debug, Clone, Serialize)]
pub struct MarkerLayer {
    pub id: LayerId,
    pub markers: Vec<Marker>,
    pub skipped: usize,
}

/// Serializable view of what is on the map
#[derive(Debug, Clone, Serialize)]
pub struct MapView {
    pub layers: Vec<MarkerLayer>,
}

/// In-memory map holding the layers the engine asked for
#[derive(Debug, Default)]
pub struct MapModel {
    layers: HashMap<LayerId, MarkerLayer>,
    /// Displayed layers, in the order they were added
    displayed: Vec<LayerId>,
}

impl MapModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layer(&self, id: &LayerId) -> Option<&MarkerLayer> {
        self.layers.get(id)
    }

    pub fn is_displayed(&self, id: &LayerId) -> bool {
        self.displayed.contains(id)
    }

    /// Layers on the map, oldest first
    pub fn displayed_layers(&self) -> impl Iterator<Item = &MarkerLayer> {
        self.displayed.iter().filter_map(|id| self.layers.get(id))
    }

    pub fn view(&self) -> MapView {
        MapView {
            layers: self.displayed_layers().cloned().collect(),
        }
    }
}

impl OverlayRenderer for MapModel {
    type Handle = LayerId;

    fn build_overlay(&mut self, points: &[DataPoint]) -> LayerId {
        let id = LayerId(Uuid::now_v7());
        let markers: Vec<Marker> = points.iter().filter_map(Marker::from_point).collect();
        let skipped = points.len() - markers.len();
        debug!(%id, markers = markers.len(), skipped, "MapModel::build_overlay: called");
        self.layers.insert(id, MarkerLayer { id, markers, skipped });
        id
    }

    fn add_overlay(&mut self, handle: &LayerId) {
        debug!(%handle, "MapModel::add_overlay: called");
        if !self.displayed.contains(handle) {
            self.displayed.push(*handle);
        }
    }

    fn remove_overlay(&mut self, handle: &LayerId) {
        debug!(%handle, "MapModel::remove_overlay: called");
        self.displayed.retain(|id| id != handle);
        self.layers.remove(handle);
    }
}
