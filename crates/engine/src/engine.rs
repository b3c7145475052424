use std::collections::HashMap;

use crate::aggregate::build_episodes;
use crate::classify::classify_patients;
use crate::compare::{parse_reference, reconcile};
use crate::config::PipelineConfig;
use crate::error::EngineError;
use crate::ingest::parse_source;
use crate::model::{
    EngineInput, Episode, IngestReport, PatientIdentity, PipelineResult, PipelineSummary,
    RunMeta, ServiceRecord, SourceSkip,
};
use crate::normalize;

/// Run the full pipeline: ingest -> normalize -> aggregate -> classify ->
/// reconcile. Each stage materializes its output before the next starts;
/// grouping needs full membership, so there is nothing to stream.
pub fn run(config: &PipelineConfig, input: &EngineInput) -> Result<PipelineResult, EngineError> {
    let mut ingest = IngestReport::default();
    let mut records: Vec<ServiceRecord> = Vec::new();

    for source in &input.sources {
        match parse_source(&source.origin, &source.text, &config.columns, source.delimiter) {
            Ok(parsed) => {
                ingest.sources_read += 1;
                ingest.rows_skipped.extend(parsed.skipped);
                records.extend(parsed.records);
            }
            Err(e) => ingest.sources_skipped.push(SourceSkip {
                origin: source.origin.clone(),
                reason: e.to_string(),
            }),
        }
    }

    if ingest.sources_read == 0 {
        return Err(EngineError::NoData);
    }
    ingest.rows_ingested = records.len();

    normalize::apply(&mut records, &config.normalizer);

    let episodes = build_episodes(&records);
    let patients = classify_patients(&records);

    let reconciliation = match (&input.reference, &config.reference) {
        (Some(data), Some(reference_config)) => {
            let reference = parse_reference(&data.text, reference_config, data.delimiter)?;
            Some(reconcile(
                &episodes,
                &reference,
                &config.tiers,
                &config.tolerance,
            ))
        }
        (None, _) => None,
        (Some(_), None) => {
            return Err(EngineError::ConfigValidation(
                "reference data supplied but config has no [reference] section".into(),
            ))
        }
    };

    let summary = compute_summary(&records, &episodes, &patients);

    Ok(PipelineResult {
        meta: RunMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        ingest,
        records,
        episodes,
        patients,
        reconciliation,
    })
}

fn compute_summary(
    records: &[ServiceRecord],
    episodes: &[Episode],
    patients: &[PatientIdentity],
) -> PipelineSummary {
    let normalized_count = records
        .iter()
        .filter(|r| r.hospitalization_id != r.hospitalization_id_raw.trim())
        .count();

    let mut class_counts: HashMap<String, usize> = HashMap::new();
    for patient in patients {
        *class_counts.entry(patient.class.to_string()).or_insert(0) += 1;
    }

    PipelineSummary {
        record_count: records.len(),
        normalized_count,
        episode_count: episodes.len(),
        patient_count: patients.len(),
        class_counts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceData;

    const CONFIG: &str = r#"
name = "Unit"

[[sources]]
file = "a.csv"
origin = "batch_a"

[[sources]]
file = "b.csv"
origin = "batch_b"

[columns]
patient_id         = "patient"
hospitalization_id = "admission_record"
triage_id          = "triage_record"
service_date       = "date"
service_area       = "area"
description        = "description"
quantity           = "qty"
cost_level6        = "cost_l6"
amount_level1      = "amount_l1"
amount_level6      = "amount_l6"
"#;

    const HEADER: &str = "patient,admission_record,triage_record,date,area,description,qty,cost_l6,amount_l1,amount_l6\n";

    fn source(origin: &str, body: &str) -> SourceData {
        SourceData {
            origin: origin.into(),
            text: format!("{HEADER}{body}"),
            delimiter: b',',
        }
    }

    #[test]
    fn bad_source_is_skipped_good_one_survives() {
        let input = EngineInput {
            sources: vec![
                SourceData {
                    origin: "batch_a".into(),
                    text: "wrong,headers\n1,2\n".into(),
                    delimiter: b',',
                },
                source("batch_b", "P1,000123,,2024-01-05,ER,Item,1,1.00,1.00,1.00\n"),
            ],
            reference: None,
        };
        let config = PipelineConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &input).unwrap();

        assert_eq!(result.ingest.sources_read, 1);
        assert_eq!(result.ingest.sources_skipped.len(), 1);
        assert_eq!(result.ingest.sources_skipped[0].origin, "batch_a");
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].hospitalization_id, "123");
    }

    #[test]
    fn all_sources_bad_is_no_data() {
        let input = EngineInput {
            sources: vec![SourceData {
                origin: "batch_a".into(),
                text: "wrong,headers\n".into(),
                delimiter: b',',
            }],
            reference: None,
        };
        let config = PipelineConfig::from_toml(CONFIG).unwrap();
        let err = run(&config, &input).unwrap_err();
        assert!(matches!(err, EngineError::NoData));
    }

    #[test]
    fn reference_without_config_section_is_rejected() {
        let input = EngineInput {
            sources: vec![source("batch_a", "P1,000123,,2024-01-05,ER,Item,1,1.00,1.00,1.00\n")],
            reference: Some(crate::model::ReferenceData {
                text: "patient,total\nP1,1.00\n".into(),
                delimiter: b',',
            }),
        };
        let config = PipelineConfig::from_toml(CONFIG).unwrap();
        let err = run(&config, &input).unwrap_err();
        assert!(matches!(err, EngineError::ConfigValidation(_)));
    }

    #[test]
    fn summary_counts_normalized_records() {
        let input = EngineInput {
            sources: vec![source(
                "batch_a",
                "P1,000123,,2024-01-05,ER,Item,1,1.00,1.00,1.00\n\
P1,123,,2024-01-06,ER,Item,1,1.00,1.00,1.00\n\
P2,,IAN-1,2024-01-06,ER,Item,1,1.00,1.00,1.00\n",
            )],
            reference: None,
        };
        let config = PipelineConfig::from_toml(CONFIG).unwrap();
        let result = run(&config, &input).unwrap();

        assert_eq!(result.summary.record_count, 3);
        assert_eq!(result.summary.normalized_count, 1);
        // "000123" and "123" collapse into one episode key
        assert_eq!(result.summary.episode_count, 2);
        assert_eq!(result.summary.patient_count, 2);
        assert_eq!(result.summary.class_counts["hospitalization_only"], 1);
        assert_eq!(result.summary.class_counts["triage_only"], 1);
    }
}
