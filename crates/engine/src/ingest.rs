use chrono::NaiveDate;

use crate::config::ColumnMapping;
use crate::error::EngineError;
use crate::model::{RowSkip, ServiceRecord};

/// Records parsed from one source plus the rows it dropped.
#[derive(Debug)]
pub struct ParsedSource {
    pub records: Vec<ServiceRecord>,
    pub skipped: Vec<RowSkip>,
}

/// Parse one decoded source export into service records.
///
/// Headers are resolved by the column mapping; a missing mapped column
/// fails the whole source (the caller drops it and moves on). Individual
/// rows that fail structurally — CSV error, empty patient id, bad date,
/// bad numeric text — are skipped and recorded, never fatal. Row order
/// is preserved.
pub fn parse_source(
    origin: &str,
    text: &str,
    columns: &ColumnMapping,
    delimiter: u8,
) -> Result<ParsedSource, EngineError> {
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

    let patient_idx = idx(&columns.patient_id)?;
    let hosp_idx = idx(&columns.hospitalization_id)?;
    let triage_idx = idx(&columns.triage_id)?;
    let date_idx = idx(&columns.service_date)?;
    let area_idx = idx(&columns.service_area)?;
    let description_idx = idx(&columns.description)?;
    let quantity_idx = idx(&columns.quantity)?;
    let cost_l6_idx = idx(&columns.cost_level6)?;
    let amount_l1_idx = idx(&columns.amount_level1)?;
    let amount_l6_idx = idx(&columns.amount_level6)?;

    let mut records = Vec::new();
    let mut skipped = Vec::new();

    for (i, result) in reader.records().enumerate() {
        let row = i + 1;
        let record = match result {
            Ok(r) => r,
            Err(e) => {
                skipped.push(skip(origin, row, format!("csv parse error: {e}")));
                continue;
            }
        };

        let patient_id = record.get(patient_idx).unwrap_or("").trim();
        if patient_id.is_empty() {
            skipped.push(skip(origin, row, "empty patient id".into()));
            continue;
        }

        let date_str = record.get(date_idx).unwrap_or("");
        let service_date = match parse_date(date_str) {
            Some(d) => d,
            None => {
                skipped.push(skip(
                    origin,
                    row,
                    format!("patient '{patient_id}': cannot parse date '{date_str}'"),
                ));
                continue;
            }
        };

        let mut amounts = [0i64; 4];
        let mut bad_amount = None;
        for (slot, &col) in [quantity_idx, cost_l6_idx, amount_l1_idx, amount_l6_idx]
            .iter()
            .enumerate()
        {
            let raw = record.get(col).unwrap_or("");
            match crate::money::parse_cents(raw) {
                Some(cents) => amounts[slot] = cents,
                None => {
                    bad_amount = Some(raw.to_string());
                    break;
                }
            }
        }
        if let Some(raw) = bad_amount {
            skipped.push(skip(
                origin,
                row,
                format!("patient '{patient_id}': cannot parse amount '{raw}'"),
            ));
            continue;
        }

        records.push(ServiceRecord {
            origin: origin.into(),
            patient_id: patient_id.into(),
            hospitalization_id_raw: record.get(hosp_idx).unwrap_or("").to_string(),
            // Filled by the normalizer stage.
            hospitalization_id: String::new(),
            triage_id: record.get(triage_idx).unwrap_or("").to_string(),
            service_date,
            service_area: record.get(area_idx).unwrap_or("").to_string(),
            description: record.get(description_idx).unwrap_or("").to_string(),
            quantity_hundredths: amounts[0],
            cost_level6_cents: amounts[1],
            amount_level1_cents: amounts[2],
            amount_level6_cents: amounts[3],
        });
    }

    Ok(ParsedSource { records, skipped })
}

fn skip(origin: &str, row: usize, reason: String) -> RowSkip {
    RowSkip {
        origin: origin.into(),
        row,
        reason,
    }
}

/// ISO dates plus the day-first form both upstream exports use.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            patient_id: "patient".into(),
            hospitalization_id: "admission_record".into(),
            triage_id: "triage_record".into(),
            service_date: "date".into(),
            service_area: "area".into(),
            description: "description".into(),
            quantity: "qty".into(),
            cost_level6: "cost_l6".into(),
            amount_level1: "amount_l1".into(),
            amount_level6: "amount_l6".into(),
        }
    }

    const HEADER: &str = "patient,admission_record,triage_record,date,area,description,qty,cost_l6,amount_l1,amount_l6\n";

    #[test]
    fn parse_basic() {
        let csv = format!(
            "{HEADER}\
P1,000123,IAN-9,2024-01-05,ER,Saline,1,10.00,12.00,15.50\n\
P1,000123,IAN-9,2024-01-06,ER,Gauze,2.5,1.00,1.20,2.40\n"
        );
        let parsed = parse_source("batch_a", &csv, &mapping(), b',').unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert!(parsed.skipped.is_empty());

        let r = &parsed.records[0];
        assert_eq!(r.patient_id, "P1");
        assert_eq!(r.hospitalization_id_raw, "000123");
        assert_eq!(r.hospitalization_id, ""); // normalizer fills this
        assert_eq!(r.triage_id, "IAN-9");
        assert_eq!(r.amount_level6_cents, 1550);
        assert_eq!(parsed.records[1].quantity_hundredths, 250);
    }

    #[test]
    fn blank_numerics_default_to_zero() {
        let csv = format!("{HEADER}P1,,IAN-9,2024-01-05,ER,Obs,,,,\n");
        let parsed = parse_source("batch_a", &csv, &mapping(), b',').unwrap();
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].quantity_hundredths, 0);
        assert_eq!(parsed.records[0].amount_level6_cents, 0);
    }

    #[test]
    fn malformed_rows_skip_not_abort() {
        let csv = format!(
            "{HEADER}\
P1,000123,,2024-01-05,ER,Ok,1,1.00,1.00,1.00\n\
,000123,,2024-01-05,ER,No patient,1,1.00,1.00,1.00\n\
P2,000124,,not-a-date,ER,Bad date,1,1.00,1.00,1.00\n\
P3,000125,,2024-01-06,ER,Bad amount,1,abc,1.00,1.00\n\
P4,000126,,2024-01-07,ER,Ok,1,1.00,1.00,1.00\n"
        );
        let parsed = parse_source("batch_a", &csv, &mapping(), b',').unwrap();
        assert_eq!(parsed.records.len(), 2);
        assert_eq!(parsed.skipped.len(), 3);
        assert_eq!(parsed.skipped[0].row, 2);
        assert!(parsed.skipped[0].reason.contains("empty patient id"));
        assert!(parsed.skipped[1].reason.contains("cannot parse date"));
        assert!(parsed.skipped[2].reason.contains("cannot parse amount"));
    }

    #[test]
    fn missing_column_fails_source() {
        let csv = "patient,date\nP1,2024-01-05\n";
        let err = parse_source("batch_a", csv, &mapping(), b',').unwrap_err();
        match err {
            EngineError::MissingColumn { origin, column } => {
                assert_eq!(origin, "batch_a");
                assert_eq!(column, "admission_record");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn semicolon_delimiter() {
        let csv = "patient;admission_record;triage_record;date;area;description;qty;cost_l6;amount_l1;amount_l6\n\
P1;000123;;2024-01-05;ER;Saline;1;1.00;1.00;1.00\n";
        let parsed = parse_source("batch_a", csv, &mapping(), b';').unwrap();
        assert_eq!(parsed.records.len(), 1);
    }

    #[test]
    fn day_first_dates() {
        assert_eq!(
            parse_date("05/01/2024"),
            NaiveDate::from_ymd_opt(2024, 1, 5)
        );
        assert_eq!(parse_date("2024-01-05"), NaiveDate::from_ymd_opt(2024, 1, 5));
        assert_eq!(parse_date("01-05-2024"), None);
    }
}
