//! Result export.
//!
//! For each successful bundle entry the exporter produces one
//! artifact: structured JSON documents for the analysis stages and an
//! interactive map for the reporting stage. Artifacts are independent;
//! one write failure is recorded and the rest are still attempted.

use crate::errors::ExportError;
use crate::normalize::normalize;
use crate::stages::StageName;
use crate::value::StageValue;
use crate::workflow::ResultBundle;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// File name of the interactive map artifact.
pub const MAP_ARTIFACT: &str = "risk_map.html";

/// File name of the run summary artifact.
pub const SUMMARY_ARTIFACT: &str = "workflow_summary.json";

/// Returns the structured-document file name for a stage.
///
/// The reporting stage produces a map rather than a document, so it
/// has no entry here.
#[must_use]
pub const fn document_name(stage: StageName) -> Option<&'static str> {
    match stage {
        StageName::Data => Some("data_acquisition.json"),
        StageName::Vegetation => Some("vegetation_analysis.json"),
        StageName::Risk => Some("risk_assessment.json"),
        StageName::Priorities => Some("maintenance_priorities.json"),
        StageName::Reports => None,
    }
}

/// What an export pass wrote and what it could not.
#[derive(Debug, Default)]
pub struct ExportReport {
    /// Paths of artifacts written successfully.
    pub written: Vec<PathBuf>,
    /// Per-artifact failures; the run itself is still considered
    /// successful when the orchestration phase completed.
    pub failures: Vec<ExportError>,
}

impl ExportReport {
    /// Returns true when every attempted artifact was written.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Persists a result bundle's artifacts to an output directory.
#[derive(Debug, Clone)]
pub struct ResultExporter {
    output_dir: PathBuf,
}

impl ResultExporter {
    /// Creates an exporter targeting `output_dir`.
    #[must_use]
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Returns the output directory.
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Exports every populated bundle entry plus the run summary.
    ///
    /// Creates the output directory if absent. Never fails as a whole:
    /// per-artifact errors are collected into the returned report.
    #[must_use]
    pub fn export(&self, bundle: &ResultBundle) -> ExportReport {
        let mut report = ExportReport::default();

        if let Err(source) = fs::create_dir_all(&self.output_dir) {
            let failure = ExportError::Io {
                artifact: self.output_dir.display().to_string(),
                source,
            };
            error!(error = %failure, "could not create output directory");
            report.failures.push(failure);
            return report;
        }

        for (stage, result) in bundle.iter() {
            let Some(value) = result.value() else {
                continue;
            };

            if let Some(name) = document_name(stage) {
                record(&mut report, self.write_document(name, value));
            }

            if stage == StageName::Reports {
                match bundle.map(stage) {
                    Some(map) => {
                        let path = self.output_dir.join(MAP_ARTIFACT);
                        let saved = map.save(&path).map(|()| path).map_err(|source| {
                            ExportError::Io {
                                artifact: MAP_ARTIFACT.to_string(),
                                source,
                            }
                        });
                        record(&mut report, saved);
                    }
                    None => warn!("reporting stage produced no map object to save"),
                }
            }
        }

        record(&mut report, self.write_summary(bundle));
        report
    }

    fn write_document(&self, name: &str, value: &StageValue) -> Result<PathBuf, ExportError> {
        let normalized = normalize(value);
        let text =
            serde_json::to_string_pretty(&normalized).map_err(|source| ExportError::Serialize {
                artifact: name.to_string(),
                source,
            })?;
        self.write_text(name, &text)
    }

    fn write_summary(&self, bundle: &ResultBundle) -> Result<PathBuf, ExportError> {
        let text = serde_json::to_string_pretty(&bundle.summary()).map_err(|source| {
            ExportError::Serialize {
                artifact: SUMMARY_ARTIFACT.to_string(),
                source,
            }
        })?;
        self.write_text(SUMMARY_ARTIFACT, &text)
    }

    fn write_text(&self, name: &str, text: &str) -> Result<PathBuf, ExportError> {
        let path = self.output_dir.join(name);
        fs::write(&path, text).map_err(|source| ExportError::Io {
            artifact: name.to_string(),
            source,
        })?;
        Ok(path)
    }
}

fn record(report: &mut ExportReport, outcome: Result<PathBuf, ExportError>) {
    match outcome {
        Ok(path) => {
            info!(path = %path.display(), "artifact written");
            report.written.push(path);
        }
        Err(failure) => {
            error!(error = %failure, "artifact export failed");
            report.failures.push(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample;
    use crate::stages::{BackendOutput, StageBackend, StageContext};
    use crate::workflow::WorkflowOrchestrator;
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct BrokenBackend;

    impl StageBackend for BrokenBackend {
        fn run(&self, _ctx: &StageContext<'_>) -> anyhow::Result<BackendOutput> {
            anyhow::bail!("scene download failed")
        }
    }

    fn run_demo() -> ResultBundle {
        WorkflowOrchestrator::new(sample::demo_runner()).run_full(&sample::sample_corridor())
    }

    #[test]
    fn full_export_writes_all_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = run_demo();

        let report = ResultExporter::new(dir.path()).export(&bundle);

        assert!(report.is_clean());
        for name in [
            "data_acquisition.json",
            "vegetation_analysis.json",
            "risk_assessment.json",
            "maintenance_priorities.json",
            MAP_ARTIFACT,
            SUMMARY_ARTIFACT,
        ] {
            assert!(dir.path().join(name).exists(), "{name} missing");
        }
    }

    #[test]
    fn exported_documents_are_plain_json() {
        let dir = tempfile::tempdir().unwrap();
        let bundle = run_demo();
        let _report = ResultExporter::new(dir.path()).export(&bundle);

        let text = fs::read_to_string(dir.path().join("vegetation_analysis.json")).unwrap();
        let doc: serde_json::Value = serde_json::from_str(&text).unwrap();

        // Numeric buffers export as plain arrays of numbers.
        assert!(doc["canopy_height_m"].is_array());
        assert!(doc["canopy_height_m"][0].is_number());
    }

    #[test]
    fn failed_stage_produces_no_document() {
        let dir = tempfile::tempdir().unwrap();
        let runner = sample::demo_runner()
            .register(StageName::Vegetation, Box::new(BrokenBackend));
        let bundle =
            WorkflowOrchestrator::new(runner).run_full(&sample::sample_corridor());

        let report = ResultExporter::new(dir.path()).export(&bundle);

        assert!(report.is_clean());
        assert!(dir.path().join("data_acquisition.json").exists());
        for name in [
            "vegetation_analysis.json",
            "risk_assessment.json",
            "maintenance_priorities.json",
            MAP_ARTIFACT,
        ] {
            assert!(!dir.path().join(name).exists(), "{name} should not exist");
        }
        assert!(dir.path().join(SUMMARY_ARTIFACT).exists());
    }

    #[test]
    fn one_artifact_failure_does_not_block_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        // A directory squatting on the artifact path makes that single
        // write fail while the others go through.
        fs::create_dir(dir.path().join("data_acquisition.json")).unwrap();

        let bundle = run_demo();
        let report = ResultExporter::new(dir.path()).export(&bundle);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].artifact(), "data_acquisition.json");
        assert!(dir.path().join("vegetation_analysis.json").exists());
        assert!(dir.path().join(MAP_ARTIFACT).exists());
        assert!(dir.path().join(SUMMARY_ARTIFACT).exists());
    }

    #[test]
    fn unwritable_output_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join("not-a-dir");
        fs::write(&file_path, "x").unwrap();

        let bundle = run_demo();
        let report = ResultExporter::new(&file_path).export(&bundle);

        assert!(!report.is_clean());
        assert!(report.written.is_empty());
    }
}
