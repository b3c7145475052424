use std::collections::{BTreeMap, HashMap};

use crate::config::{ReferenceConfig, TierConfig, ToleranceConfig};
use crate::error::EngineError;
use crate::model::{
    DeltaBucket, Episode, ReconciliationDelta, ReconciliationReport, ReconciliationSummary,
    RowSkip,
};

/// Per-patient totals from the independently produced reference summary.
#[derive(Debug)]
pub struct ReferenceTotals {
    pub totals: BTreeMap<String, i64>,
    pub skipped: Vec<RowSkip>,
}

/// Parse the reference summary CSV. Duplicate patient rows sum; rows with
/// a blank patient id or unparseable total are skipped and recorded.
pub fn parse_reference(
    text: &str,
    config: &ReferenceConfig,
    delimiter: u8,
) -> Result<ReferenceTotals, EngineError> {
    let origin = "reference";
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Io(e.to_string()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, EngineError> {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EngineError::MissingColumn {
                origin: origin.into(),
                column: name.into(),
            })
    };

    let patient_idx = idx(&config.patient_id)?;
    let total_idx = idx(&config.total)?;

    let mut totals: BTreeMap<String, i64> = BTreeMap::new();
    let mut skipped = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skipped.push(RowSkip {
                    origin: origin.into(),
                    row,
                    reason: format!("csv parse error: {e}"),
                });
                continue;
            }
        };

        let patient_id = record.get(patient_idx).unwrap_or("").trim();
        if patient_id.is_empty() {
            skipped.push(RowSkip {
                origin: origin.into(),
                row,
                reason: "empty patient id".into(),
            });
            continue;
        }

        let raw_total = record.get(total_idx).unwrap_or("");
        match crate::money::parse_cents(raw_total) {
            Some(cents) => {
                *totals.entry(patient_id.to_string()).or_insert(0) += cents;
            }
            None => {
                skipped.push(RowSkip {
                    origin: origin.into(),
                    row,
                    reason: format!("patient '{patient_id}': cannot parse amount '{raw_total}'"),
                });
            }
        }
    }

    Ok(ReferenceTotals { totals, skipped })
}

/// Full outer join of generated per-patient totals (sum of episode
/// `total_amount_level6_cents`) against the reference summary.
///
/// Both-sided patients tier on |delta|, inclusive on the lower tier.
/// One-sided patients keep null deltas and land in the one-sided buckets;
/// they never enter a magnitude tier. The summary carries the
/// sum-of-deltas self-check against the dataset-wide grand totals.
pub fn reconcile(
    episodes: &[Episode],
    reference: &ReferenceTotals,
    tiers: &TierConfig,
    tolerance: &ToleranceConfig,
) -> ReconciliationReport {
    let mut generated: BTreeMap<&str, i64> = BTreeMap::new();
    for episode in episodes {
        *generated.entry(&episode.patient_id).or_insert(0) += episode.total_amount_level6_cents;
    }

    let mut patient_ids: Vec<&str> = generated.keys().copied().collect();
    for patient_id in reference.totals.keys() {
        if !generated.contains_key(patient_id.as_str()) {
            patient_ids.push(patient_id.as_str());
        }
    }
    patient_ids.sort_unstable();

    let mut deltas = Vec::with_capacity(patient_ids.len());
    let mut bucket_counts: HashMap<String, usize> = HashMap::new();
    let mut in_agreement = 0;
    let mut with_difference = 0;
    let mut generated_only = 0;
    let mut reference_only = 0;
    let mut delta_sum_cents = 0i64;

    for patient_id in patient_ids {
        let generated_cents = generated.get(patient_id).copied();
        let reference_cents = reference.totals.get(patient_id).copied();

        let (delta_cents, bucket) = match (generated_cents, reference_cents) {
            (Some(g), Some(r)) => {
                let delta = g - r;
                delta_sum_cents += delta;
                if delta.abs() <= tolerance.delta_cents {
                    in_agreement += 1;
                } else {
                    with_difference += 1;
                }
                let bucket = if delta.abs() <= tiers.small_max_cents {
                    DeltaBucket::Small
                } else if delta.abs() <= tiers.medium_max_cents {
                    DeltaBucket::Medium
                } else {
                    DeltaBucket::Large
                };
                (Some(delta), bucket)
            }
            (Some(_), None) => {
                generated_only += 1;
                (None, DeltaBucket::GeneratedOnly)
            }
            (None, Some(_)) => {
                reference_only += 1;
                (None, DeltaBucket::ReferenceOnly)
            }
            (None, None) => unreachable!("patient id came from one of the two sides"),
        };

        *bucket_counts.entry(bucket.to_string()).or_insert(0) += 1;

        deltas.push(ReconciliationDelta {
            patient_id: patient_id.into(),
            generated_cents,
            reference_cents,
            delta_cents,
            abs_delta_cents: delta_cents.map(i64::abs),
            bucket,
        });
    }

    let generated_total_cents: i64 = generated.values().sum();
    let reference_total_cents: i64 = reference.totals.values().sum();
    let grand_delta_cents = generated_total_cents - reference_total_cents;
    let consistent = (delta_sum_cents - grand_delta_cents).abs() <= tolerance.delta_cents;

    ReconciliationReport {
        summary: ReconciliationSummary {
            total_patients: deltas.len(),
            in_agreement,
            with_difference,
            generated_only,
            reference_only,
            bucket_counts,
            generated_total_cents,
            reference_total_cents,
            delta_sum_cents,
            grand_delta_cents,
            consistent,
        },
        rows_skipped: reference.skipped.clone(),
        deltas,
    }
}
