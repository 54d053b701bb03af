//! Workflow orchestration and the per-run result bundle.
//!
//! The orchestrator drives the five stages strictly in order and keeps
//! going after a stage fails: downstream stages observe the missing
//! dependency and skip themselves. A partial plan is more useful to
//! the operator than no plan at all.

use crate::config::WorkflowConfig;
use crate::corridor::Corridor;
use crate::stages::{MapDocument, StageContext, StageName, StageOutcome, StageResult, StageRunner};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

/// The accumulated per-stage results for one workflow run.
///
/// Entries are stored in execution order, so iteration order equals
/// the fixed stage order restricted to attempted stages. Map artifacts
/// produced by backends travel alongside the results rather than
/// inside them; result values stay plain data.
#[derive(Debug)]
pub struct ResultBundle {
    run_id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    entries: Vec<(StageName, StageResult)>,
    maps: Vec<(StageName, Box<dyn MapDocument>)>,
}

impl ResultBundle {
    /// Creates an empty bundle for a new run.
    #[must_use]
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            entries: Vec::new(),
            maps: Vec::new(),
        }
    }

    /// Returns the run identifier.
    #[must_use]
    pub const fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns when the run started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns when the run finished, once it has.
    #[must_use]
    pub const fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns a stage's result, if that stage was attempted.
    #[must_use]
    pub fn get(&self, stage: StageName) -> Option<&StageResult> {
        self.entries
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, result)| result)
    }

    /// Iterates over attempted stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (StageName, &StageResult)> {
        self.entries.iter().map(|(name, result)| (*name, result))
    }

    /// Returns a stage's map artifact, if its backend produced one.
    #[must_use]
    pub fn map(&self, stage: StageName) -> Option<&dyn MapDocument> {
        self.maps
            .iter()
            .find(|(name, _)| *name == stage)
            .map(|(_, map)| map.as_ref())
    }

    /// Records one stage outcome. Insertion order is execution order.
    pub(crate) fn insert(&mut self, outcome: StageOutcome) {
        if let Some(map) = outcome.map {
            self.maps.push((outcome.stage, map));
        }
        self.entries.push((outcome.stage, outcome.result));
    }

    pub(crate) fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Summarizes the run: per-stage statuses and aggregate counts.
    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut succeeded = 0;
        let mut skipped = 0;
        let mut failed = 0;
        let stages = self
            .entries
            .iter()
            .map(|(name, result)| {
                match result {
                    StageResult::Success { .. } => succeeded += 1,
                    StageResult::Skipped { .. } => skipped += 1,
                    StageResult::Failed { .. } => failed += 1,
                }
                StageStatusLine {
                    stage: *name,
                    status: result.status().to_string(),
                    detail: result
                        .skip_reason()
                        .or_else(|| result.error())
                        .map(str::to_string),
                }
            })
            .collect();

        let duration_ms = self.finished_at.map_or(0.0, |finished| {
            (finished - self.started_at).num_milliseconds() as f64
        });

        RunSummary {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: self.finished_at,
            duration_ms,
            attempted: self.entries.len(),
            succeeded,
            skipped,
            failed,
            stages,
        }
    }
}

impl Default for ResultBundle {
    fn default() -> Self {
        Self::new()
    }
}

/// One line of a run summary: a stage and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageStatusLine {
    /// The stage.
    pub stage: StageName,
    /// Its status tag.
    pub status: String,
    /// Skip reason or captured error, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Aggregate view of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    /// The run identifier.
    pub run_id: Uuid,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Total run duration in milliseconds.
    pub duration_ms: f64,
    /// Number of stages attempted.
    pub attempted: usize,
    /// Number of successful stages.
    pub succeeded: usize,
    /// Number of skipped stages.
    pub skipped: usize,
    /// Number of failed stages.
    pub failed: usize,
    /// Per-stage status lines, in execution order.
    pub stages: Vec<StageStatusLine>,
}

impl RunSummary {
    /// Returns true when every attempted stage succeeded.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.skipped == 0 && self.failed == 0
    }
}

/// Drives the five-stage sequence for one corridor.
///
/// An orchestrator instance is single-use: `run_full` consumes it, so
/// each run gets a fresh instance and re-entrancy is ruled out by the
/// type system.
#[derive(Debug)]
pub struct WorkflowOrchestrator {
    runner: StageRunner,
    config: WorkflowConfig,
}

impl WorkflowOrchestrator {
    /// Creates an orchestrator over a set of stage backends.
    #[must_use]
    pub fn new(runner: StageRunner) -> Self {
        Self {
            runner,
            config: WorkflowConfig::default(),
        }
    }

    /// Attaches a workflow configuration.
    #[must_use]
    pub fn with_config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Runs all five stages in order and returns the finished bundle.
    ///
    /// Failed stages are recorded, never retried, and never abort the
    /// remaining sequence; dependent stages self-skip.
    #[must_use]
    pub fn run_full(self, corridor: &Corridor) -> ResultBundle {
        let mut bundle = ResultBundle::new();
        info!(
            run_id = %bundle.run_id(),
            segments = corridor.segment_count(),
            crs = corridor.crs(),
            "starting workflow run"
        );

        for stage in StageName::ALL {
            let outcome = {
                let ctx = StageContext::new(corridor, self.config.section(stage), &bundle);
                self.runner.run(stage, &ctx)
            };
            bundle.insert(outcome);
        }

        bundle.finish();
        let summary = bundle.summary();
        info!(
            run_id = %bundle.run_id(),
            succeeded = summary.succeeded,
            skipped = summary.skipped,
            failed = summary.failed,
            duration_ms = summary.duration_ms,
            "workflow run finished"
        );
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use crate::stages::{BackendOutput, StageBackend};
    use pretty_assertions::assert_eq;

    fn demo_corridor() -> Corridor {
        sample::sample_corridor()
    }

    #[derive(Debug)]
    struct BrokenBackend;

    impl StageBackend for BrokenBackend {
        fn run(&self, _ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
            anyhow::bail!("NDVI raster unreadable")
        }
    }

    #[test]
    fn full_run_succeeds_with_demo_backends() {
        let corridor = demo_corridor();
        let orchestrator = WorkflowOrchestrator::new(sample::demo_runner());

        let bundle = orchestrator.run_full(&corridor);

        let order: Vec<StageName> = bundle.iter().map(|(name, _)| name).collect();
        assert_eq!(order.as_slice(), StageName::ALL.as_slice());
        assert!(bundle.iter().all(|(_, result)| result.is_success()));
        assert!(bundle.map(StageName::Reports).is_some());
        assert!(bundle.finished_at().is_some());

        let summary = bundle.summary();
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.succeeded, 5);
        assert!(summary.is_clean());
    }

    #[test]
    fn failed_stage_skips_all_dependents() {
        let corridor = demo_corridor();
        let runner = sample::demo_runner()
            .register(StageName::Vegetation, Box::new(BrokenBackend));
        let orchestrator = WorkflowOrchestrator::new(runner);

        let bundle = orchestrator.run_full(&corridor);

        assert!(bundle.get(StageName::Data).is_some_and(StageResult::is_success));
        assert!(bundle
            .get(StageName::Vegetation)
            .is_some_and(StageResult::is_failed));
        for stage in [StageName::Risk, StageName::Priorities, StageName::Reports] {
            let result = bundle.get(stage).unwrap();
            assert!(result.is_skipped(), "{stage} should be skipped");
            assert!(result.skip_reason().unwrap().starts_with("missing dependency:"));
        }

        let summary = bundle.summary();
        assert_eq!(
            (summary.succeeded, summary.failed, summary.skipped),
            (1, 1, 3)
        );
        assert!(!summary.is_clean());
    }

    #[test]
    fn stage_context_sees_upstream_values() {
        let corridor = demo_corridor();
        let bundle = WorkflowOrchestrator::new(sample::demo_runner()).run_full(&corridor);

        // Priorities ranked every segment the risk stage scored.
        let ranked = bundle
            .get(StageName::Priorities)
            .and_then(StageResult::value)
            .and_then(|v| v.get("ranked_actions"));
        assert!(ranked.is_some());
    }

    #[test]
    fn summary_counts_agree_with_entries() {
        let corridor = demo_corridor();
        let runner = StageRunner::new();
        let bundle = WorkflowOrchestrator::new(runner).run_full(&corridor);

        // No backends at all: data skips, everything downstream skips.
        let summary = bundle.summary();
        assert_eq!(summary.attempted, 5);
        assert_eq!(summary.skipped, 5);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.failed, 0);
        assert_eq!(summary.stages.len(), 5);
    }

    #[test]
    fn summary_serializes_with_stage_names() {
        let corridor = demo_corridor();
        let bundle = WorkflowOrchestrator::new(sample::demo_runner()).run_full(&corridor);

        let json = serde_json::to_value(bundle.summary()).unwrap();
        assert_eq!(json["stages"][0]["stage"], "data");
        assert_eq!(json["stages"][0]["status"], "success");
    }
}
