use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Decoded text of one source export, tagged with its origin.
pub struct SourceData {
    pub origin: String,
    pub text: String,
    /// Field delimiter for this source (callers sniff it; tests pass b',').
    pub delimiter: u8,
}

/// Decoded text of the reference summary file.
pub struct ReferenceData {
    pub text: String,
    pub delimiter: u8,
}

/// Pre-loaded inputs for one engine run. `reference` must be present
/// exactly when the config carries a `[reference]` section.
pub struct EngineInput {
    pub sources: Vec<SourceData>,
    pub reference: Option<ReferenceData>,
}

/// A single billed line-item from any source export.
///
/// `hospitalization_id_raw` keeps the verbatim source text as an audit
/// trail; `hospitalization_id` is the canonical form filled in by the
/// normalizer. The triage identifier is carried as-is.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceRecord {
    pub origin: String,
    pub patient_id: String,
    pub hospitalization_id_raw: String,
    pub hospitalization_id: String,
    pub triage_id: String,
    pub service_date: NaiveDate,
    pub service_area: String,
    pub description: String,
    pub quantity_hundredths: i64,
    pub cost_level6_cents: i64,
    pub amount_level1_cents: i64,
    pub amount_level6_cents: i64,
}

// ---------------------------------------------------------------------------
// Ingestion report
// ---------------------------------------------------------------------------

/// A whole source dropped during ingestion (unreadable or missing a
/// mapped column). Recoverable: the run continues on the other sources.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSkip {
    pub origin: String,
    pub reason: String,
}

/// One data row dropped during ingestion. `row` is the 1-based data-row
/// position within the source, for reproduction against the export.
#[derive(Debug, Clone, Serialize)]
pub struct RowSkip {
    pub origin: String,
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub sources_read: usize,
    pub sources_skipped: Vec<SourceSkip>,
    pub rows_ingested: usize,
    pub rows_skipped: Vec<RowSkip>,
}

// ---------------------------------------------------------------------------
// Episodes
// ---------------------------------------------------------------------------

/// Episode key: patient + both canonical identifiers. All three fields —
/// a patient may legitimately hold several distinct episodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EpisodeKey {
    pub patient_id: String,
    pub hospitalization_id: String,
    pub triage_id: String,
}

/// Aggregated records sharing one episode key. Immutable once built.
#[derive(Debug, Clone, Serialize)]
pub struct Episode {
    pub patient_id: String,
    pub hospitalization_id: String,
    pub triage_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count: a single-day episode is 1.
    pub length_of_stay_days: i64,
    pub total_quantity_hundredths: i64,
    pub total_cost_level6_cents: i64,
    pub total_amount_level1_cents: i64,
    pub total_amount_level6_cents: i64,
    pub record_count: usize,
    /// Origin of the first contributing record, in input order.
    pub origin: String,
}

// ---------------------------------------------------------------------------
// Identity classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityClass {
    /// Triage/observation intake only — no hospitalization identifier.
    TriageOnly,
    /// Formally admitted without a recorded triage identifier.
    HospitalizationOnly,
    /// Urgent-care intake that progressed to admission.
    Both,
}

impl std::fmt::Display for IdentityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TriageOnly => write!(f, "triage_only"),
            Self::HospitalizationOnly => write!(f, "hospitalization_only"),
            Self::Both => write!(f, "both"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PatientIdentity {
    pub patient_id: String,
    pub distinct_hospitalization_ids: usize,
    pub distinct_triage_ids: usize,
    pub class: IdentityClass,
}

// ---------------------------------------------------------------------------
// Reconciliation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaBucket {
    Small,
    Medium,
    Large,
    GeneratedOnly,
    ReferenceOnly,
}

impl std::fmt::Display for DeltaBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Medium => write!(f, "medium"),
            Self::Large => write!(f, "large"),
            Self::GeneratedOnly => write!(f, "generated_only"),
            Self::ReferenceOnly => write!(f, "reference_only"),
        }
    }
}

/// One patient's generated-vs-reference comparison. One-sided patients
/// keep `None` deltas — a missing counterpart is never coerced to zero.
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationDelta {
    pub patient_id: String,
    pub generated_cents: Option<i64>,
    pub reference_cents: Option<i64>,
    pub delta_cents: Option<i64>,
    pub abs_delta_cents: Option<i64>,
    pub bucket: DeltaBucket,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationSummary {
    pub total_patients: usize,
    /// Both-sided, |delta| within tolerance.
    pub in_agreement: usize,
    pub with_difference: usize,
    pub generated_only: usize,
    pub reference_only: usize,
    pub bucket_counts: HashMap<String, usize>,
    pub generated_total_cents: i64,
    pub reference_total_cents: i64,
    /// Sum of per-patient deltas over both-sided patients.
    pub delta_sum_cents: i64,
    /// Dataset-wide grand-total difference (generated - reference).
    pub grand_delta_cents: i64,
    /// Self-check: delta_sum and grand_delta agree within tolerance.
    /// False is the ReconciliationMismatch condition — reported, not fatal.
    pub consistent: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub deltas: Vec<ReconciliationDelta>,
    pub rows_skipped: Vec<RowSkip>,
    pub summary: ReconciliationSummary,
}

// ---------------------------------------------------------------------------
// Run output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct PipelineSummary {
    pub record_count: usize,
    /// Records whose canonical hospitalization id differs from the trimmed
    /// raw value.
    pub normalized_count: usize,
    pub episode_count: usize,
    pub patient_count: usize,
    pub class_counts: HashMap<String, usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug)]
pub struct PipelineResult {
    pub meta: RunMeta,
    pub summary: PipelineSummary,
    pub ingest: IngestReport,
    pub records: Vec<ServiceRecord>,
    pub episodes: Vec<Episode>,
    pub patients: Vec<PatientIdentity>,
    pub reconciliation: Option<ReconciliationReport>,
}
