use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::model::{Episode, EpisodeKey, ServiceRecord};

struct Accum {
    start_date: NaiveDate,
    end_date: NaiveDate,
    total_quantity_hundredths: i64,
    total_cost_level6_cents: i64,
    total_amount_level1_cents: i64,
    total_amount_level6_cents: i64,
    record_count: usize,
    origin: String,
}

/// Group the normalized stream into episodes keyed by
/// (patient, canonical hospitalization id, triage id).
///
/// All aggregates are order-independent except `origin`, which is
/// first-wins in input order. Exact-duplicate rows are separate billed
/// line-items and sum into the totals — no deduplication.
pub fn build_episodes(records: &[ServiceRecord]) -> Vec<Episode> {
    let mut groups: BTreeMap<EpisodeKey, Accum> = BTreeMap::new();

    for record in records {
        let key = EpisodeKey {
            patient_id: record.patient_id.clone(),
            hospitalization_id: record.hospitalization_id.clone(),
            triage_id: record.triage_id.clone(),
        };
        let entry = groups.entry(key).or_insert_with(|| Accum {
            start_date: record.service_date,
            end_date: record.service_date,
            total_quantity_hundredths: 0,
            total_cost_level6_cents: 0,
            total_amount_level1_cents: 0,
            total_amount_level6_cents: 0,
            record_count: 0,
            origin: record.origin.clone(),
        });
        if record.service_date < entry.start_date {
            entry.start_date = record.service_date;
        }
        if record.service_date > entry.end_date {
            entry.end_date = record.service_date;
        }
        entry.total_quantity_hundredths += record.quantity_hundredths;
        entry.total_cost_level6_cents += record.cost_level6_cents;
        entry.total_amount_level1_cents += record.amount_level1_cents;
        entry.total_amount_level6_cents += record.amount_level6_cents;
        entry.record_count += 1;
    }

    groups
        .into_iter()
        .map(|(key, accum)| Episode {
            patient_id: key.patient_id,
            hospitalization_id: key.hospitalization_id,
            triage_id: key.triage_id,
            start_date: accum.start_date,
            end_date: accum.end_date,
            length_of_stay_days: (accum.end_date - accum.start_date).num_days() + 1,
            total_quantity_hundredths: accum.total_quantity_hundredths,
            total_cost_level6_cents: accum.total_cost_level6_cents,
            total_amount_level1_cents: accum.total_amount_level1_cents,
            total_amount_level6_cents: accum.total_amount_level6_cents,
            record_count: accum.record_count,
            origin: accum.origin,
        })
        .collect()
}
