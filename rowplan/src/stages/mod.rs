//! Stage identity, the backend seam, and the stage runner.
//!
//! The five analysis stages form a strict linear dependency chain. The
//! runner is the failure-containment boundary: a backend error is
//! captured into the stage's result and never propagates, so one
//! stage's defect cannot abort stages that do not depend on it.

mod result;

pub use result::StageResult;

use crate::corridor::Corridor;
use crate::value::StageValue;
use crate::workflow::ResultBundle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Debug};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info, warn};

/// The five workflow stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageName {
    /// Satellite/LiDAR data acquisition.
    Data,
    /// Vegetation-index and canopy-height analysis.
    Vegetation,
    /// Multi-hazard risk assessment.
    Risk,
    /// Maintenance prioritization.
    Priorities,
    /// Report and map generation.
    Reports,
}

impl StageName {
    /// All stages, in execution order.
    pub const ALL: [Self; 5] = [
        Self::Data,
        Self::Vegetation,
        Self::Risk,
        Self::Priorities,
        Self::Reports,
    ];

    /// Returns the stage's canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Vegetation => "vegetation",
            Self::Risk => "risk",
            Self::Priorities => "priorities",
            Self::Reports => "reports",
        }
    }

    /// Returns the stage whose success this stage requires.
    ///
    /// The chain is strictly linear; only the first stage has no
    /// predecessor.
    #[must_use]
    pub const fn required_predecessor(self) -> Option<Self> {
        match self {
            Self::Data => None,
            Self::Vegetation => Some(Self::Data),
            Self::Risk => Some(Self::Vegetation),
            Self::Priorities => Some(Self::Risk),
            Self::Reports => Some(Self::Priorities),
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A renderable map artifact that knows how to persist itself.
///
/// Produced by reporting backends; the exporter only ever calls
/// `save`, never inspects the map's contents.
pub trait MapDocument: Debug + Send + Sync {
    /// Writes the map document to `path`.
    ///
    /// # Errors
    ///
    /// Returns the underlying IO error when the write fails.
    fn save(&self, path: &Path) -> std::io::Result<()>;
}

/// The output of a successful backend invocation.
#[derive(Debug)]
pub struct BackendOutput {
    /// The stage's result value.
    pub value: StageValue,
    /// An optional renderable map, produced by reporting backends.
    pub map: Option<Box<dyn MapDocument>>,
}

impl BackendOutput {
    /// Creates an output carrying only a value.
    #[must_use]
    pub const fn value(value: StageValue) -> Self {
        Self { value, map: None }
    }

    /// Attaches a renderable map to the output.
    #[must_use]
    pub fn with_map(mut self, map: Box<dyn MapDocument>) -> Self {
        self.map = Some(map);
        self
    }
}

/// The context one stage executes against.
///
/// Borrows the validated corridor, the stage's configuration subtree,
/// and every result produced so far in the run.
#[derive(Debug, Clone, Copy)]
pub struct StageContext<'a> {
    corridor: &'a Corridor,
    config: Option<&'a serde_json::Value>,
    completed: &'a ResultBundle,
}

impl<'a> StageContext<'a> {
    /// Creates a context for one stage invocation.
    #[must_use]
    pub const fn new(
        corridor: &'a Corridor,
        config: Option<&'a serde_json::Value>,
        completed: &'a ResultBundle,
    ) -> Self {
        Self {
            corridor,
            config,
            completed,
        }
    }

    /// Returns the corridor under analysis.
    #[must_use]
    pub const fn corridor(&self) -> &'a Corridor {
        self.corridor
    }

    /// Returns this stage's configuration subtree, if any.
    #[must_use]
    pub const fn config(&self) -> Option<&'a serde_json::Value> {
        self.config
    }

    /// Returns an upstream stage's result, if that stage was attempted.
    #[must_use]
    pub fn result(&self, stage: StageName) -> Option<&'a StageResult> {
        self.completed.get(stage)
    }

    /// Returns an upstream stage's output value, if it succeeded.
    #[must_use]
    pub fn value(&self, stage: StageName) -> Option<&'a StageValue> {
        self.result(stage).and_then(StageResult::value)
    }

    /// Returns true if the given stage was attempted and succeeded.
    #[must_use]
    pub fn succeeded(&self, stage: StageName) -> bool {
        self.result(stage).is_some_and(StageResult::is_success)
    }
}

/// An external analysis backend for one stage.
///
/// The core invokes the backend with the current context and records
/// whatever comes back; the value's internal schema is the backend's
/// concern.
pub trait StageBackend: Debug + Send + Sync {
    /// Runs the backend against the current context.
    ///
    /// # Errors
    ///
    /// Any error is captured by the runner into a failed stage result.
    fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput>;
}

/// The result of one runner invocation: the stage's result plus any
/// map artifact and the observed duration.
#[derive(Debug)]
pub struct StageOutcome {
    /// Which stage was attempted.
    pub stage: StageName,
    /// The recorded result.
    pub result: StageResult,
    /// A map artifact, if the backend produced one.
    pub map: Option<Box<dyn MapDocument>>,
    /// Wall-clock duration of the attempt in milliseconds.
    pub duration_ms: f64,
}

/// Executes single named stages against the current run context.
#[derive(Debug, Default)]
pub struct StageRunner {
    backends: HashMap<StageName, Box<dyn StageBackend>>,
}

impl StageRunner {
    /// Creates a runner with no backends registered.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the backend for a stage, replacing any previous one.
    #[must_use]
    pub fn register(mut self, stage: StageName, backend: Box<dyn StageBackend>) -> Self {
        self.backends.insert(stage, backend);
        self
    }

    /// Returns true if a backend is registered for the stage.
    #[must_use]
    pub fn has_backend(&self, stage: StageName) -> bool {
        self.backends.contains_key(&stage)
    }

    /// Runs one stage against the current context.
    ///
    /// A stage whose required predecessor did not succeed is skipped
    /// without invoking its backend, as is a stage with no backend
    /// registered. A backend error is captured into a failed result;
    /// it never propagates past this method.
    #[must_use]
    pub fn run(&self, stage: StageName, ctx: &StageContext<'_>) -> StageOutcome {
        let started = Instant::now();

        if let Some(dep) = stage.required_predecessor() {
            if !ctx.succeeded(dep) {
                let reason = format!("missing dependency: {dep}");
                debug!(stage = %stage, reason = %reason, "stage skipped");
                return StageOutcome {
                    stage,
                    result: StageResult::skipped(reason),
                    map: None,
                    duration_ms: elapsed_ms(started),
                };
            }
        }

        let Some(backend) = self.backends.get(&stage) else {
            let reason = format!("no backend registered for stage: {stage}");
            warn!(stage = %stage, "stage skipped, no backend registered");
            return StageOutcome {
                stage,
                result: StageResult::skipped(reason),
                map: None,
                duration_ms: elapsed_ms(started),
            };
        };

        match backend.run(ctx) {
            Ok(output) => {
                let duration_ms = elapsed_ms(started);
                info!(stage = %stage, duration_ms, "stage completed");
                StageOutcome {
                    stage,
                    result: StageResult::success(output.value),
                    map: output.map,
                    duration_ms,
                }
            }
            Err(err) => {
                let duration_ms = elapsed_ms(started);
                let error = format!("{err:#}");
                warn!(stage = %stage, error = %error, "stage failed");
                StageOutcome {
                    stage,
                    result: StageResult::failed(error),
                    map: None,
                    duration_ms,
                }
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corridor::{Corridor, CorridorSegment, DEFAULT_CRS};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn test_corridor() -> Corridor {
        let segment = CorridorSegment {
            id: "TEST-1".to_string(),
            name: Some("Test Line".to_string()),
            voltage_kv: Some(230.0),
            owner: None,
            in_service_date: None,
            length_km: Some(5.0),
            geometry: json!({
                "type": "LineString",
                "coordinates": [[-122.4, 37.7], [-122.3, 37.8]],
            }),
        };
        Corridor::new(vec![segment], DEFAULT_CRS).unwrap()
    }

    #[derive(Debug)]
    struct EchoBackend;

    impl StageBackend for EchoBackend {
        fn run(&self, ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
            Ok(BackendOutput::value(StageValue::mapping([(
                "segments",
                StageValue::Int(i64::try_from(ctx.corridor().segment_count())?),
            )])))
        }
    }

    #[derive(Debug)]
    struct FailingBackend;

    impl StageBackend for FailingBackend {
        fn run(&self, _ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
            anyhow::bail!("satellite feed unavailable")
        }
    }

    #[test]
    fn stage_order_is_fixed() {
        let names: Vec<&str> = StageName::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["data", "vegetation", "risk", "priorities", "reports"]);
    }

    #[test]
    fn dependency_chain_is_linear() {
        assert_eq!(StageName::Data.required_predecessor(), None);
        assert_eq!(
            StageName::Vegetation.required_predecessor(),
            Some(StageName::Data)
        );
        assert_eq!(
            StageName::Risk.required_predecessor(),
            Some(StageName::Vegetation)
        );
        assert_eq!(
            StageName::Priorities.required_predecessor(),
            Some(StageName::Risk)
        );
        assert_eq!(
            StageName::Reports.required_predecessor(),
            Some(StageName::Priorities)
        );
    }

    #[test]
    fn runner_executes_backend() {
        let corridor = test_corridor();
        let bundle = ResultBundle::new();
        let runner = StageRunner::new().register(StageName::Data, Box::new(EchoBackend));

        let ctx = StageContext::new(&corridor, None, &bundle);
        let outcome = runner.run(StageName::Data, &ctx);

        assert!(outcome.result.is_success());
        assert_eq!(
            outcome.result.value().and_then(|v| v.get("segments")),
            Some(&StageValue::Int(1))
        );
    }

    #[test]
    fn runner_captures_backend_failure() {
        let corridor = test_corridor();
        let bundle = ResultBundle::new();
        let runner = StageRunner::new().register(StageName::Data, Box::new(FailingBackend));

        let ctx = StageContext::new(&corridor, None, &bundle);
        let outcome = runner.run(StageName::Data, &ctx);

        assert!(outcome.result.is_failed());
        assert!(outcome
            .result
            .error()
            .unwrap()
            .contains("satellite feed unavailable"));
    }

    #[test]
    fn runner_skips_on_missing_dependency() {
        let corridor = test_corridor();
        let bundle = ResultBundle::new();
        let runner = StageRunner::new().register(StageName::Vegetation, Box::new(EchoBackend));

        let ctx = StageContext::new(&corridor, None, &bundle);
        let outcome = runner.run(StageName::Vegetation, &ctx);

        assert!(outcome.result.is_skipped());
        assert_eq!(
            outcome.result.skip_reason(),
            Some("missing dependency: data")
        );
    }

    #[test]
    fn runner_skips_without_backend() {
        let corridor = test_corridor();
        let bundle = ResultBundle::new();
        let runner = StageRunner::new();

        let ctx = StageContext::new(&corridor, None, &bundle);
        let outcome = runner.run(StageName::Data, &ctx);

        assert!(outcome.result.is_skipped());
        assert_eq!(
            outcome.result.skip_reason(),
            Some("no backend registered for stage: data")
        );
    }
}
