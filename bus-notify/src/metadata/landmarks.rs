//! Decoding of tile metadata responses into landmark features.
//!
//! A response looks like `_xdc_._abc123([ {...}, {...} ])`: a JSONP-style
//! envelope around a pseudo-JSON array. Elements carrying a `features`
//! list describe the landmarks on the requested tiles. Bus stops are
//! recognized by their icon bounding box.

use serde_json::Value;
use tracing::{debug, warn};

use crate::domain::{BusStops, FeatureId};

use super::repair::repair;

/// Icon bounding box `[x0, y0, x1, y1]` reported for a feature.
pub type BoundingBox = [i64; 4];

/// Bounding box the service uses for bus stop icons.
pub const BUS_STOP_BOUNDING_BOX: BoundingBox = [-7, -7, 6, 6];

/// Longest excerpt of repaired text kept in a [`PayloadError`].
const EXCERPT_LEN: usize = 500;

/// The repaired payload could not be parsed.
///
/// This usually means the upstream format changed or a repair rule
/// regressed, and must not be treated as an empty area.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed tile metadata: {message}")]
pub struct PayloadError {
    pub message: String,
    /// Start of the repaired text, for diagnosis
    pub excerpt: String,
}

/// A landmark on the requested tiles.
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFeature {
    pub id: FeatureId,
    pub bounding_box: Option<BoundingBox>,
    /// `c.title`, when present
    pub title: Option<String>,
    /// The feature's `c` attribute object
    pub attributes: Value,
}

impl LandmarkFeature {
    /// Read a feature from a `features` entry.
    ///
    /// Returns `None` if the entry has no usable id.
    fn from_value(value: &Value) -> Option<Self> {
        let id = match value.get("id")? {
            Value::String(s) => FeatureId::new(s.as_str()),
            Value::Number(n) => FeatureId::new(n.to_string()),
            _ => return None,
        };

        let bounding_box = value.get("bb").and_then(bounding_box);
        let attributes = value.get("c").cloned().unwrap_or(Value::Null);
        let title = attributes
            .get("title")
            .and_then(Value::as_str)
            .map(str::to_string);

        Some(Self {
            id,
            bounding_box,
            title,
            attributes,
        })
    }
}

fn bounding_box(value: &Value) -> Option<BoundingBox> {
    match value.as_array()?.as_slice() {
        [a, b, c, d] => Some([a.as_i64()?, b.as_i64()?, c.as_i64()?, d.as_i64()?]),
        _ => None,
    }
}

/// Decoded content of a tile metadata response.
#[derive(Debug, Clone, PartialEq)]
pub enum TileMetadata {
    /// The response carries no landmark data for the area.
    NoData,
    /// Landmarks in response order, possibly empty.
    Features(Vec<LandmarkFeature>),
}

/// The text between the first `(` and the last `)`.
pub fn strip_envelope(body: &str) -> Option<&str> {
    let start = body.find('(')?;
    let end = body.rfind(')')?;
    if end <= start {
        return None;
    }
    Some(&body[start + 1..end])
}

/// Decode a raw tile metadata response.
///
/// Returns [`TileMetadata::NoData`] when the envelope is missing or the
/// payload never mentions `features`, and a [`PayloadError`] when the
/// repaired payload is not a JSON array.
pub fn decode_tile_metadata(body: &str) -> Result<TileMetadata, PayloadError> {
    let Some(payload) = strip_envelope(body) else {
        debug!("tile metadata response has no envelope");
        return Ok(TileMetadata::NoData);
    };
    if !payload.contains("features") {
        return Ok(TileMetadata::NoData);
    }

    let repaired = repair(payload);
    let document: Value = serde_json::from_str(&repaired).map_err(|e| {
        warn!(error = %e, len = repaired.len(), "repaired tile metadata failed to parse");
        PayloadError {
            message: e.to_string(),
            excerpt: repaired.chars().take(EXCERPT_LEN).collect(),
        }
    })?;

    let Value::Array(nodes) = document else {
        return Err(PayloadError {
            message: "expected an array at the top level".to_string(),
            excerpt: repaired.chars().take(EXCERPT_LEN).collect(),
        });
    };

    let features = nodes
        .iter()
        .filter_map(|node| node.get("features")?.as_array())
        .flatten()
        .filter_map(LandmarkFeature::from_value)
        .collect();

    Ok(TileMetadata::Features(features))
}

/// Bus stops among `features`: entries with the `sentinel` bounding box and
/// a title. The first title seen for an id is kept.
pub fn extract_bus_stops(features: &[LandmarkFeature], sentinel: BoundingBox) -> BusStops {
    let mut stops = BusStops::new();
    for feature in features {
        if feature.bounding_box != Some(sentinel) {
            continue;
        }
        let Some(title) = &feature.title else {
            debug!(id = %feature.id, "bus stop feature without title");
            continue;
        };
        stops.insert_first(feature.id.clone(), title.clone());
    }
    stops
}
