//! # Rowplan
//!
//! A workflow orchestrator that turns a power-transmission
//! right-of-way corridor into a prioritized maintenance plan.
//!
//! The pipeline runs five dependent stages — data acquisition,
//! vegetation analysis, risk assessment, prioritization, reporting —
//! and aggregates their heterogeneous outputs into a single result
//! bundle:
//!
//! - **Failure containment**: a stage backend's error is captured into
//!   its result; stages that depend on it self-skip, everything else
//!   still runs.
//! - **Fixed linear order**: each stage requires its predecessor's
//!   success, so a run is a straight sequence, never a graph walk.
//! - **Portable results**: arbitrary nested stage outputs are
//!   normalized into bit-stable JSON documents at export time.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rowplan::prelude::*;
//!
//! let corridor = CorridorLoader::load("corridor.geojson")?;
//! let bundle = WorkflowOrchestrator::new(backends).run_full(&corridor);
//! let report = ResultExporter::new("output/").export(&bundle);
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, missing_docs, rust_2018_idioms)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::cast_precision_loss
)]

pub mod config;
pub mod corridor;
pub mod errors;
pub mod export;
pub mod normalize;
pub mod sample;
pub mod stages;
pub mod value;
pub mod workflow;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::WorkflowConfig;
    pub use crate::corridor::{Corridor, CorridorLoader, CorridorSegment, DEFAULT_CRS};
    pub use crate::errors::{ConfigError, DataError, ExportError, WorkflowError};
    pub use crate::export::{ExportReport, ResultExporter};
    pub use crate::normalize::normalize;
    pub use crate::stages::{
        BackendOutput, MapDocument, StageBackend, StageContext, StageName, StageResult,
        StageRunner,
    };
    pub use crate::value::StageValue;
    pub use crate::workflow::{ResultBundle, RunSummary, WorkflowOrchestrator};
}
