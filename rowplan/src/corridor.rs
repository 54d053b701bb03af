//! Corridor data model and loader.
//!
//! A corridor is the validated geometric dataset a workflow run
//! operates on: an ordered, non-empty set of right-of-way segment
//! records plus a coordinate reference system. It is created once at
//! workflow start and immutable thereafter.

use crate::errors::DataError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// The CRS assumed when the source omits one.
pub const DEFAULT_CRS: &str = "EPSG:4326";

/// One right-of-way segment record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorridorSegment {
    /// Segment identifier.
    pub id: String,
    /// Human-readable line name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Voltage class in kV.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage_kv: Option<f64>,
    /// Owning utility.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// In-service date, as recorded in the source.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_service_date: Option<String>,
    /// Segment length in kilometres.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length_km: Option<f64>,
    /// Segment geometry as a GeoJSON value.
    pub geometry: serde_json::Value,
}

/// A validated corridor dataset.
///
/// Invariants: at least one segment; CRS always defined.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Corridor {
    segments: Vec<CorridorSegment>,
    crs: String,
}

impl Corridor {
    /// Creates a corridor from segments and a CRS.
    ///
    /// # Errors
    ///
    /// Returns [`DataError::Empty`] when `segments` is empty.
    pub fn new(
        segments: Vec<CorridorSegment>,
        crs: impl Into<String>,
    ) -> Result<Self, DataError> {
        if segments.is_empty() {
            return Err(DataError::Empty);
        }
        Ok(Self {
            segments,
            crs: crs.into(),
        })
    }

    /// Returns the segment records, in source order.
    #[must_use]
    pub fn segments(&self) -> &[CorridorSegment] {
        &self.segments
    }

    /// Returns the coordinate reference system identifier.
    #[must_use]
    pub fn crs(&self) -> &str {
        &self.crs
    }

    /// Returns the number of segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the summed length of segments that record one, in km.
    #[must_use]
    pub fn total_length_km(&self) -> f64 {
        self.segments.iter().filter_map(|s| s.length_km).sum()
    }

    /// Renders the corridor as a GeoJSON feature collection.
    #[must_use]
    pub fn to_geojson(&self) -> serde_json::Value {
        let features: Vec<serde_json::Value> = self
            .segments
            .iter()
            .map(|segment| {
                serde_json::json!({
                    "type": "Feature",
                    "properties": {
                        "line_id": segment.id,
                        "line_name": segment.name,
                        "voltage_kv": segment.voltage_kv,
                        "owner": segment.owner,
                        "in_service_date": segment.in_service_date,
                        "length_km": segment.length_km,
                    },
                    "geometry": segment.geometry,
                })
            })
            .collect();

        serde_json::json!({
            "type": "FeatureCollection",
            "crs": {
                "type": "name",
                "properties": { "name": self.crs },
            },
            "features": features,
        })
    }
}

/// Loads and validates corridor geometry sources.
#[derive(Debug, Clone, Copy, Default)]
pub struct CorridorLoader;

impl CorridorLoader {
    /// Loads a corridor from a GeoJSON file.
    ///
    /// A source without a CRS member is recoverable: the corridor is
    /// assigned [`DEFAULT_CRS`] and a warning is emitted. A source
    /// with zero features is not.
    ///
    /// # Errors
    ///
    /// Returns [`DataError`] when the path does not exist, the file
    /// cannot be read or parsed, or the dataset has no segments.
    pub fn load(path: impl AsRef<Path>) -> Result<Corridor, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::Missing(path.display().to_string()));
        }

        let text = fs::read_to_string(path)?;
        let doc: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| DataError::Parse(e.to_string()))?;

        let features = doc
            .get("features")
            .and_then(serde_json::Value::as_array)
            .ok_or_else(|| {
                DataError::Parse("expected a GeoJSON FeatureCollection with features".to_string())
            })?;

        let segments: Vec<CorridorSegment> = features
            .iter()
            .enumerate()
            .map(|(index, feature)| parse_segment(index, feature))
            .collect();

        let crs = match parse_crs(&doc) {
            Some(crs) => crs,
            None => {
                warn!(default = DEFAULT_CRS, "no CRS specified, assuming default");
                DEFAULT_CRS.to_string()
            }
        };

        let corridor = Corridor::new(segments, crs)?;
        info!(
            path = %path.display(),
            segments = corridor.segment_count(),
            crs = corridor.crs(),
            "loaded corridor"
        );
        Ok(corridor)
    }
}

fn parse_segment(index: usize, feature: &serde_json::Value) -> CorridorSegment {
    let props = feature.get("properties").cloned().unwrap_or_default();

    let id = props
        .get("line_id")
        .or_else(|| props.get("id"))
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| format!("segment-{index}"), str::to_string);

    CorridorSegment {
        id,
        name: string_prop(&props, "line_name"),
        voltage_kv: props.get("voltage_kv").and_then(serde_json::Value::as_f64),
        owner: string_prop(&props, "owner"),
        in_service_date: string_prop(&props, "in_service_date"),
        length_km: props.get("length_km").and_then(serde_json::Value::as_f64),
        geometry: feature
            .get("geometry")
            .cloned()
            .unwrap_or(serde_json::Value::Null),
    }
}

fn string_prop(props: &serde_json::Value, key: &str) -> Option<String> {
    props
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

// GeoJSON's legacy named-CRS member: {"crs": {"properties": {"name": ...}}}.
fn parse_crs(doc: &serde_json::Value) -> Option<String> {
    doc.get("crs")
        .and_then(|crs| crs.get("properties"))
        .and_then(|props| props.get("name"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::io::Write;

    fn feature_collection(crs: Option<&str>, feature_count: usize) -> serde_json::Value {
        let features: Vec<serde_json::Value> = (0..feature_count)
            .map(|i| {
                json!({
                    "type": "Feature",
                    "properties": {
                        "line_id": format!("LINE-{i}"),
                        "line_name": "Test Line",
                        "voltage_kv": 230,
                        "length_km": 4.2,
                    },
                    "geometry": {
                        "type": "LineString",
                        "coordinates": [[-122.4, 37.7], [-122.3, 37.8]],
                    },
                })
            })
            .collect();

        let mut doc = json!({"type": "FeatureCollection", "features": features});
        if let Some(name) = crs {
            doc["crs"] = json!({"type": "name", "properties": {"name": name}});
        }
        doc
    }

    fn write_temp(doc: &serde_json::Value) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{doc}").unwrap();
        file
    }

    #[test]
    fn load_valid_corridor() {
        let file = write_temp(&feature_collection(Some("EPSG:32610"), 2));
        let corridor = CorridorLoader::load(file.path()).unwrap();

        assert_eq!(corridor.segment_count(), 2);
        assert_eq!(corridor.crs(), "EPSG:32610");
        assert_eq!(corridor.segments()[0].id, "LINE-0");
        assert_eq!(corridor.segments()[0].voltage_kv, Some(230.0));
        assert!((corridor.total_length_km() - 8.4).abs() < 1e-9);
    }

    #[test]
    fn load_missing_path_fails() {
        let err = CorridorLoader::load("does/not/exist.geojson").unwrap_err();
        assert!(matches!(err, DataError::Missing(_)));
    }

    #[test]
    fn load_empty_corridor_fails() {
        let file = write_temp(&feature_collection(Some("EPSG:4326"), 0));
        let err = CorridorLoader::load(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Empty));
    }

    #[test]
    fn load_unparseable_source_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not geojson at all").unwrap();
        let err = CorridorLoader::load(file.path()).unwrap_err();
        assert!(matches!(err, DataError::Parse(_)));
    }

    #[test]
    fn load_defaults_missing_crs() {
        let file = write_temp(&feature_collection(None, 1));
        let corridor = CorridorLoader::load(file.path()).unwrap();
        assert_eq!(corridor.crs(), DEFAULT_CRS);
    }

    #[test]
    fn missing_properties_get_fallback_id() {
        let doc = json!({
            "type": "FeatureCollection",
            "features": [{"type": "Feature", "geometry": null}],
        });
        let file = write_temp(&doc);
        let corridor = CorridorLoader::load(file.path()).unwrap();

        assert_eq!(corridor.segments()[0].id, "segment-0");
        assert_eq!(corridor.segments()[0].name, None);
    }

    #[test]
    fn geojson_round_trip() {
        let file = write_temp(&feature_collection(Some("EPSG:4326"), 2));
        let corridor = CorridorLoader::load(file.path()).unwrap();

        let rendered = write_temp(&corridor.to_geojson());
        let reloaded = CorridorLoader::load(rendered.path()).unwrap();

        assert_eq!(corridor, reloaded);
    }

    #[test]
    fn empty_segments_rejected_by_constructor() {
        let err = Corridor::new(Vec::new(), DEFAULT_CRS).unwrap_err();
        assert!(matches!(err, DataError::Empty));
    }
}
