// CSV export of the pipeline output tables.
// Stable column order, UTF-8, money re-serialized with two decimals.

use std::path::Path;

use episodic_engine::model::{Episode, PatientIdentity, ReconciliationDelta, ServiceRecord};
use episodic_engine::money::format_cents;

pub fn write_records(path: &Path, records: &[ServiceRecord]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    writer
        .write_record([
            "origin",
            "patient_id",
            "hospitalization_id_raw",
            "hospitalization_id",
            "triage_id",
            "service_date",
            "service_area",
            "description",
            "quantity",
            "cost_level6",
            "amount_level1",
            "amount_level6",
        ])
        .map_err(|e| e.to_string())?;

    for r in records {
        let date = r.service_date.to_string();
        let quantity = format_cents(r.quantity_hundredths);
        let cost_l6 = format_cents(r.cost_level6_cents);
        let amount_l1 = format_cents(r.amount_level1_cents);
        let amount_l6 = format_cents(r.amount_level6_cents);
        writer
            .write_record([
                r.origin.as_str(),
                r.patient_id.as_str(),
                r.hospitalization_id_raw.as_str(),
                r.hospitalization_id.as_str(),
                r.triage_id.as_str(),
                date.as_str(),
                r.service_area.as_str(),
                r.description.as_str(),
                quantity.as_str(),
                cost_l6.as_str(),
                amount_l1.as_str(),
                amount_l6.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

pub fn write_episodes(path: &Path, episodes: &[Episode]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    writer
        .write_record([
            "patient_id",
            "hospitalization_id",
            "triage_id",
            "start_date",
            "end_date",
            "length_of_stay_days",
            "total_quantity",
            "total_cost_level6",
            "total_amount_level1",
            "total_amount_level6",
            "record_count",
            "origin",
        ])
        .map_err(|e| e.to_string())?;

    for episode in episodes {
        let start = episode.start_date.to_string();
        let end = episode.end_date.to_string();
        let stay = episode.length_of_stay_days.to_string();
        let quantity = format_cents(episode.total_quantity_hundredths);
        let cost_l6 = format_cents(episode.total_cost_level6_cents);
        let amount_l1 = format_cents(episode.total_amount_level1_cents);
        let amount_l6 = format_cents(episode.total_amount_level6_cents);
        let count = episode.record_count.to_string();
        writer
            .write_record([
                episode.patient_id.as_str(),
                episode.hospitalization_id.as_str(),
                episode.triage_id.as_str(),
                start.as_str(),
                end.as_str(),
                stay.as_str(),
                quantity.as_str(),
                cost_l6.as_str(),
                amount_l1.as_str(),
                amount_l6.as_str(),
                count.as_str(),
                episode.origin.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

pub fn write_patients(path: &Path, patients: &[PatientIdentity]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    writer
        .write_record([
            "patient_id",
            "distinct_hospitalization_ids",
            "distinct_triage_ids",
            "class",
        ])
        .map_err(|e| e.to_string())?;

    for p in patients {
        let hosp = p.distinct_hospitalization_ids.to_string();
        let triage = p.distinct_triage_ids.to_string();
        let class = p.class.to_string();
        writer
            .write_record([
                p.patient_id.as_str(),
                hosp.as_str(),
                triage.as_str(),
                class.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

pub fn write_deltas(path: &Path, deltas: &[ReconciliationDelta]) -> Result<(), String> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| e.to_string())?;
    writer
        .write_record([
            "patient_id",
            "generated_total",
            "reference_total",
            "delta",
            "abs_delta",
            "bucket",
        ])
        .map_err(|e| e.to_string())?;

    // Null sides stay empty cells — never rendered as zero.
    let opt = |cents: Option<i64>| cents.map(format_cents).unwrap_or_default();

    for d in deltas {
        let generated = opt(d.generated_cents);
        let reference = opt(d.reference_cents);
        let delta = opt(d.delta_cents);
        let abs_delta = opt(d.abs_delta_cents);
        let bucket = d.bucket.to_string();
        writer
            .write_record([
                d.patient_id.as_str(),
                generated.as_str(),
                reference.as_str(),
                delta.as_str(),
                abs_delta.as_str(),
                bucket.as_str(),
            ])
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use episodic_engine::model::DeltaBucket;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn episode_table_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("episodes.csv");
        let episodes = vec![Episode {
            patient_id: "P1".into(),
            hospitalization_id: "778899".into(),
            triage_id: "IAN-42".into(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
            length_of_stay_days: 4,
            total_quantity_hundredths: 300,
            total_cost_level6_cents: 24_500,
            total_amount_level1_cents: 30_800,
            total_amount_level6_cents: 3_550,
            record_count: 3,
            origin: "period_a".into(),
        }];

        write_episodes(&path, &episodes).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "patient_id,hospitalization_id,triage_id,start_date,end_date,length_of_stay_days,\
total_quantity,total_cost_level6,total_amount_level1,total_amount_level6,record_count,origin"
        );
        assert_eq!(
            lines.next().unwrap(),
            "P1,778899,IAN-42,2024-01-05,2024-01-08,4,3.00,245.00,308.00,35.50,3,period_a"
        );
    }

    #[test]
    fn delta_table_keeps_null_sides_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("deltas.csv");
        let deltas = vec![
            ReconciliationDelta {
                patient_id: "P1".into(),
                generated_cents: Some(10_000),
                reference_cents: Some(9_000),
                delta_cents: Some(1_000),
                abs_delta_cents: Some(1_000),
                bucket: DeltaBucket::Small,
            },
            ReconciliationDelta {
                patient_id: "P3".into(),
                generated_cents: None,
                reference_cents: Some(9_900),
                delta_cents: None,
                abs_delta_cents: None,
                bucket: DeltaBucket::ReferenceOnly,
            },
        ];

        write_deltas(&path, &deltas).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[1], "P1,100.00,90.00,10.00,10.00,small");
        assert_eq!(lines[2], "P3,,99.00,,,reference_only");
    }

    #[test]
    fn record_table_roundtrips_audit_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.csv");
        let records = vec![ServiceRecord {
            origin: "period_a".into(),
            patient_id: "P1".into(),
            hospitalization_id_raw: "000778899".into(),
            hospitalization_id: "778899".into(),
            triage_id: String::new(),
            service_date: NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(),
            service_area: "ER".into(),
            description: "Saline".into(),
            quantity_hundredths: 100,
            cost_level6_cents: 500,
            amount_level1_cents: 800,
            amount_level6_cents: 1_000,
        }];

        write_records(&path, &records).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert!(lines[0].contains("hospitalization_id_raw,hospitalization_id"));
        assert_eq!(
            lines[1],
            "period_a,P1,000778899,778899,,2024-01-05,ER,Saline,1.00,5.00,8.00,10.00"
        );
    }

    #[test]
    fn patient_table_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patients.csv");
        let patients = vec![PatientIdentity {
            patient_id: "P1".into(),
            distinct_hospitalization_ids: 1,
            distinct_triage_ids: 1,
            class: episodic_engine::model::IdentityClass::Both,
        }];

        write_patients(&path, &patients).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.ends_with("P1,1,1,both\n"));
    }
}
