//! Demo corridor data and reference stage backends.
//!
//! Real deployments wire their own analysis backends into the
//! [`StageRunner`]; the backends here are deterministic placeholders
//! that exercise the whole pipeline end to end, for demo mode and for
//! tests. None of them model anything — the numbers are derived
//! directly from the corridor's segment records.

use crate::corridor::{Corridor, CorridorSegment, DEFAULT_CRS};
use crate::errors::DataError;
use crate::stages::{BackendOutput, MapDocument, StageBackend, StageContext, StageName, StageRunner};
use crate::value::StageValue;
use std::fs;
use std::path::Path;
use tracing::info;

/// Builds the demo transmission-line corridor.
///
/// One 500 kV segment running roughly from San Francisco towards
/// Oakland, with its length derived from the coordinate span.
#[must_use]
pub fn sample_corridor() -> Corridor {
    let coords: Vec<Vec<f64>> = vec![
        vec![-122.4194, 37.7749],
        vec![-122.4094, 37.7849],
        vec![-122.3994, 37.7949],
        vec![-122.3894, 37.8049],
        vec![-122.3794, 37.8149],
    ];

    // Rough degrees-to-km conversion for a demo-sized line.
    let degree_length: f64 = coords
        .windows(2)
        .map(|pair| {
            let dx = pair[1][0] - pair[0][0];
            let dy = pair[1][1] - pair[0][1];
            dx.hypot(dy)
        })
        .sum();
    let length_km = degree_length * 111.32;

    let segment = CorridorSegment {
        id: "DEMO_LINE_001".to_string(),
        name: Some("Demo Transmission Line".to_string()),
        voltage_kv: Some(500.0),
        owner: Some("Demo Utility Company".to_string()),
        in_service_date: Some("2020-01-01".to_string()),
        length_km: Some(length_km),
        geometry: serde_json::json!({
            "type": "LineString",
            "coordinates": coords,
        }),
    };

    Corridor::new(vec![segment], DEFAULT_CRS).unwrap_or_else(|_| unreachable!())
}

/// Writes the demo corridor to `path` as GeoJSON.
///
/// # Errors
///
/// Returns [`DataError::Io`] when the file cannot be written.
pub fn write_sample_corridor(path: impl AsRef<Path>) -> Result<(), DataError> {
    let path = path.as_ref();
    let doc = sample_corridor().to_geojson();
    let text = serde_json::to_string_pretty(&doc)
        .map_err(|e| DataError::Parse(e.to_string()))?;
    fs::write(path, text)?;
    info!(path = %path.display(), "sample corridor written");
    Ok(())
}

/// Builds a runner with all five demo backends registered.
#[must_use]
pub fn demo_runner() -> StageRunner {
    StageRunner::new()
        .register(StageName::Data, Box::new(DataAcquisitionBackend))
        .register(StageName::Vegetation, Box::new(VegetationAnalysisBackend))
        .register(StageName::Risk, Box::new(RiskAssessmentBackend))
        .register(StageName::Priorities, Box::new(PrioritizationBackend))
        .register(StageName::Reports, Box::new(ReportingBackend))
}

/// Demo data-acquisition backend: fakes an imagery/LiDAR inventory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DataAcquisitionBackend;

impl StageBackend for DataAcquisitionBackend {
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
        let corridor = ctx.corridor();
        let scenes = i64::try_from(corridor.segment_count())? * 3;

        let value = StageValue::mapping([
            (
                "imagery",
                StageValue::mapping([
                    ("source", StageValue::from("sentinel-2")),
                    ("scenes", StageValue::Int(scenes)),
                    ("cloud_cover_pct", StageValue::Number(4.5)),
                ]),
            ),
            (
                "lidar",
                StageValue::mapping([
                    ("source", StageValue::from("demo-lidar")),
                    ("point_density_per_m2", StageValue::Number(8.0)),
                ]),
            ),
            (
                "segments_covered",
                StageValue::Int(i64::try_from(corridor.segment_count())?),
            ),
            ("crs", StageValue::from(corridor.crs())),
        ]);
        Ok(BackendOutput::value(value))
    }
}

/// Demo vegetation backend: NDVI stats and a canopy-height profile.
#[derive(Debug, Clone, Copy, Default)]
pub struct VegetationAnalysisBackend;

impl StageBackend for VegetationAnalysisBackend {
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
        let threshold = ctx
            .config()
            .and_then(|c| c.get("ndvi_threshold"))
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.4);

        // A fixed profile per segment keeps the output deterministic.
        let profile: Vec<f64> = ctx
            .corridor()
            .segments()
            .iter()
            .flat_map(|_| [12.5, 14.0, 9.5, 17.25])
            .collect();

        let encroaching: Vec<StageValue> = ctx
            .corridor()
            .segments()
            .iter()
            .filter(|s| s.voltage_kv.unwrap_or(0.0) >= 345.0)
            .map(|s| StageValue::from(s.id.as_str()))
            .collect();

        let value = StageValue::mapping([
            (
                "ndvi",
                StageValue::mapping([
                    ("mean", StageValue::Number(0.52)),
                    ("max", StageValue::Number(0.81)),
                    ("threshold", StageValue::Number(threshold)),
                ]),
            ),
            ("canopy_height_m", StageValue::NumericArray(profile)),
            ("encroachment_segments", StageValue::Sequence(encroaching)),
        ]);
        Ok(BackendOutput::value(value))
    }
}

/// Demo risk backend: a composite score per segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskAssessmentBackend;

impl StageBackend for RiskAssessmentBackend {
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
        let scores: Vec<StageValue> = ctx
            .corridor()
            .segments()
            .iter()
            .map(|segment| {
                let length = segment.length_km.unwrap_or(1.0);
                let voltage = segment.voltage_kv.unwrap_or(115.0);
                // Longer, higher-voltage segments score higher.
                let composite = (length / 10.0 + voltage / 1000.0).min(1.0);
                StageValue::mapping([
                    ("segment_id", StageValue::from(segment.id.as_str())),
                    ("composite_score", StageValue::Number(composite)),
                    (
                        "drivers",
                        StageValue::mapping([
                            ("vegetation", StageValue::Number(composite * 0.6)),
                            ("wildfire", StageValue::Number(composite * 0.3)),
                            ("wind", StageValue::Number(composite * 0.1)),
                        ]),
                    ),
                    (
                        "geometry",
                        StageValue::geometry(segment.geometry.clone()),
                    ),
                ])
            })
            .collect();

        let value = StageValue::mapping([
            ("method", StageValue::from("weighted-overlay")),
            ("segment_scores", StageValue::Sequence(scores)),
        ]);
        Ok(BackendOutput::value(value))
    }
}

/// Demo prioritization backend: ranks segments by risk score.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrioritizationBackend;

impl StageBackend for PrioritizationBackend {
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
        let scores = ctx
            .value(StageName::Risk)
            .and_then(|v| v.get("segment_scores"))
            .ok_or_else(|| anyhow::anyhow!("risk output missing segment_scores"))?;

        let StageValue::Sequence(scores) = scores else {
            anyhow::bail!("segment_scores is not a sequence");
        };

        let mut ranked: Vec<(String, f64)> = scores
            .iter()
            .filter_map(|entry| {
                let id = entry.get("segment_id")?;
                let score = entry.get("composite_score")?;
                match (id, score) {
                    (StageValue::Text(id), StageValue::Number(score)) => {
                        Some((id.clone(), *score))
                    }
                    _ => None,
                }
            })
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let actions: Vec<StageValue> = ranked
            .iter()
            .enumerate()
            .map(|(index, (id, score))| {
                let action = if *score > 0.6 {
                    "trim-within-30-days"
                } else {
                    "schedule-routine-patrol"
                };
                StageValue::mapping([
                    ("rank", StageValue::Int(index as i64 + 1)),
                    ("segment_id", StageValue::from(id.as_str())),
                    ("score", StageValue::Number(*score)),
                    ("action", StageValue::from(action)),
                ])
            })
            .collect();

        let value = StageValue::mapping([
            ("ranked_actions", StageValue::Sequence(actions)),
            ("budget_utilization", StageValue::Number(0.85)),
        ]);
        Ok(BackendOutput::value(value))
    }
}

/// Demo reporting backend: a run digest plus an interactive map.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportingBackend;

impl StageBackend for ReportingBackend {
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
        let ranked = ctx
            .value(StageName::Priorities)
            .and_then(|v| v.get("ranked_actions"))
            .map_or(0, |actions| match actions {
                StageValue::Sequence(items) => items.len(),
                _ => 0,
            });

        let value = StageValue::mapping([
            (
                "summary",
                StageValue::mapping([
                    (
                        "segments_analyzed",
                        StageValue::Int(i64::try_from(ctx.corridor().segment_count())?),
                    ),
                    ("actions_ranked", StageValue::Int(i64::try_from(ranked)?)),
                ]),
            ),
        ]);

        let map = HtmlMap::render(ctx.corridor());
        Ok(BackendOutput::value(value).with_map(Box::new(map)))
    }
}

/// A self-contained HTML map document.
#[derive(Debug, Clone)]
pub struct HtmlMap {
    html: String,
}

impl HtmlMap {
    /// Renders the corridor geometry into a standalone HTML page.
    #[must_use]
    pub fn render(corridor: &Corridor) -> Self {
        let geojson = corridor.to_geojson();
        let html = format!(
            "<!DOCTYPE html>\n<html>\n<head><title>ROW Risk Map</title></head>\n\
             <body>\n<div id=\"map\"></div>\n\
             <script>const corridor = {geojson};</script>\n\
             </body>\n</html>\n"
        );
        Self { html }
    }

    /// Returns the rendered HTML.
    #[must_use]
    pub fn html(&self) -> &str {
        &self.html
    }
}

impl MapDocument for HtmlMap {
    fn save(&self, path: &Path) -> std::io::Result<()> {
        fs::write(path, &self.html)
    }
}
