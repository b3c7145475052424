//! `episodic-engine` — Episode aggregation and reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded source text, returns the
//! normalized record stream, episode table, patient identity classes,
//! and the reconciliation report. No CLI or file-IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod model;
pub mod money;
pub mod normalize;

pub use config::PipelineConfig;
pub use engine::run;
pub use error::EngineError;
pub use model::{EngineInput, PipelineResult, ServiceRecord, SourceData};
