use std::collections::{BTreeMap, BTreeSet};

use crate::model::{IdentityClass, PatientIdentity, ServiceRecord};

/// Classify every patient by which identifier types appear across their
/// records. Works on the record stream, not the episode table —
/// classification is per patient, coarser than per episode.
///
/// Blank identifiers on both sides of every record leave both counts at
/// zero; the hospitalization check runs first, so such patients land in
/// `TriageOnly`.
pub fn classify_patients(records: &[ServiceRecord]) -> Vec<PatientIdentity> {
    let mut per_patient: BTreeMap<&str, (BTreeSet<&str>, BTreeSet<&str>)> = BTreeMap::new();

    for record in records {
        let entry = per_patient.entry(&record.patient_id).or_default();
        if !record.hospitalization_id.trim().is_empty() {
            entry.0.insert(&record.hospitalization_id);
        }
        if !record.triage_id.trim().is_empty() {
            entry.1.insert(&record.triage_id);
        }
    }

    per_patient
        .into_iter()
        .map(|(patient_id, (hosp_ids, triage_ids))| {
            let class = if hosp_ids.is_empty() {
                IdentityClass::TriageOnly
            } else if triage_ids.is_empty() {
                IdentityClass::HospitalizationOnly
            } else {
                IdentityClass::Both
            };
            PatientIdentity {
                patient_id: patient_id.into(),
                distinct_hospitalization_ids: hosp_ids.len(),
                distinct_triage_ids: triage_ids.len(),
                class,
            }
        })
        .collect()
}
