//! `episodic run` / `episodic validate` — config-driven pipeline runs.

use std::path::{Path, PathBuf};

use serde::Serialize;

use episodic_engine::model::{
    EngineInput, IngestReport, PipelineSummary, ReconciliationSummary, ReferenceData, RunMeta,
    SourceData,
};
use episodic_engine::{EngineError, PipelineConfig};
use episodic_io::read::{read_file_as_utf8, sniff_delimiter};
use episodic_io::tables;

use crate::exit_codes::{EXIT_ERROR, EXIT_INVALID_CONFIG, EXIT_NO_DATA, EXIT_RECON_MISMATCH};
use crate::CliError;

fn engine_exit_code(err: &EngineError) -> u8 {
    match err {
        EngineError::ConfigParse(_) | EngineError::ConfigValidation(_) => EXIT_INVALID_CONFIG,
        EngineError::NoData => EXIT_NO_DATA,
        EngineError::MissingColumn { .. } | EngineError::Io(_) => EXIT_ERROR,
    }
}

/// Machine-readable run report: everything except the row-level tables,
/// which go to the out-dir CSVs.
#[derive(Serialize)]
struct RunReport<'a> {
    meta: &'a RunMeta,
    summary: &'a PipelineSummary,
    ingest: &'a IngestReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    reconciliation: Option<&'a ReconciliationSummary>,
}

pub fn cmd_run(
    config_path: PathBuf,
    out_dir: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot read config: {e}")))?;
    let config = PipelineConfig::from_toml(&config_str)
        .map_err(|e| CliError::new(engine_exit_code(&e), e.to_string()))?;

    // Resolve data files relative to the config file's directory
    let base_dir = config_path
        .parent()
        .unwrap_or_else(|| Path::new("."));

    // Read source files; an unreadable file drops that source with a
    // warning, the run continues on the rest.
    let mut sources = Vec::new();
    for source_config in &config.sources {
        let path = base_dir.join(&source_config.file);
        match read_file_as_utf8(&path) {
            Ok(text) => {
                let delimiter = sniff_delimiter(&text);
                sources.push(SourceData {
                    origin: source_config.origin.clone(),
                    text,
                    delimiter,
                });
            }
            Err(e) => eprintln!(
                "warning: skipping source '{}': cannot read {}: {e}",
                source_config.origin,
                path.display()
            ),
        }
    }

    let reference = match &config.reference {
        Some(reference_config) => {
            let path = base_dir.join(&reference_config.file);
            let text = read_file_as_utf8(&path).map_err(|e| {
                CliError::new(
                    EXIT_ERROR,
                    format!("cannot read reference {}: {e}", path.display()),
                )
                .with_hint("the reference summary is the comparison baseline; fix the path or drop the [reference] section")
            })?;
            let delimiter = sniff_delimiter(&text);
            Some(ReferenceData { text, delimiter })
        }
        None => None,
    };

    let input = EngineInput { sources, reference };

    let result = episodic_engine::run(&config, &input)
        .map_err(|e| CliError::new(engine_exit_code(&e), e.to_string()))?;

    // Ingestion warnings, with enough context to reproduce
    for skip in &result.ingest.sources_skipped {
        eprintln!("warning: skipped source '{}': {}", skip.origin, skip.reason);
    }
    for skip in result.ingest.rows_skipped.iter().take(20) {
        eprintln!(
            "warning: {}: row {}: {}",
            skip.origin, skip.row, skip.reason
        );
    }
    let more = result.ingest.rows_skipped.len().saturating_sub(20);
    if more > 0 {
        eprintln!("warning: {more} further row(s) skipped");
    }

    // Output tables
    std::fs::create_dir_all(&out_dir)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot create out dir: {e}")))?;
    let table_err = |e: String| CliError::new(EXIT_ERROR, format!("cannot write table: {e}"));
    tables::write_records(&out_dir.join("records.csv"), &result.records).map_err(table_err)?;
    tables::write_episodes(&out_dir.join("episodes.csv"), &result.episodes).map_err(table_err)?;
    tables::write_patients(&out_dir.join("patients.csv"), &result.patients).map_err(table_err)?;
    if let Some(ref recon) = result.reconciliation {
        tables::write_deltas(&out_dir.join("deltas.csv"), &recon.deltas).map_err(table_err)?;
    }

    // JSON run report
    let report = RunReport {
        meta: &result.meta,
        summary: &result.summary,
        ingest: &result.ingest,
        reconciliation: result.reconciliation.as_ref().map(|r| &r.summary),
    };
    let json_str = serde_json::to_string_pretty(&report)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("JSON serialization error: {e}")))?;

    if let Some(ref path) = output_file {
        std::fs::write(path, &json_str)
            .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot write output: {e}")))?;
        eprintln!("wrote {}", path.display());
    }
    if json_output {
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    eprintln!(
        "{} records from {} source(s) — {} normalized, {} episodes, {} patients \
({} triage-only, {} hospitalization-only, {} both)",
        s.record_count,
        result.ingest.sources_read,
        s.normalized_count,
        s.episode_count,
        s.patient_count,
        s.class_counts.get("triage_only").copied().unwrap_or(0),
        s.class_counts
            .get("hospitalization_only")
            .copied()
            .unwrap_or(0),
        s.class_counts.get("both").copied().unwrap_or(0),
    );

    if let Some(ref recon) = result.reconciliation {
        let r = &recon.summary;
        eprintln!(
            "reconciliation: {} patients — {} in agreement, {} with differences, {} generated-only, \
{} reference-only, grand delta {}",
            r.total_patients,
            r.in_agreement,
            r.with_difference,
            r.generated_only,
            r.reference_only,
            episodic_engine::money::format_cents(r.grand_delta_cents),
        );

        if !r.consistent {
            return Err(CliError::new(
                EXIT_RECON_MISMATCH,
                format!(
                    "reconciliation self-check failed: per-patient delta sum {} vs grand delta {}",
                    episodic_engine::money::format_cents(r.delta_sum_cents),
                    episodic_engine::money::format_cents(r.grand_delta_cents),
                ),
            )
            .with_hint("one-sided patients usually explain the gap; see deltas.csv"));
        }
    }

    Ok(())
}

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config_str = std::fs::read_to_string(&config_path)
        .map_err(|e| CliError::new(EXIT_ERROR, format!("cannot read config: {e}")))?;

    match PipelineConfig::from_toml(&config_str) {
        Ok(config) => {
            eprintln!(
                "valid: pipeline '{}' with {} source(s){}",
                config.name,
                config.sources.len(),
                if config.reference.is_some() {
                    ", reference summary configured"
                } else {
                    ""
                },
            );
            Ok(())
        }
        Err(e) => Err(CliError::new(engine_exit_code(&e), e.to_string())),
    }
}
