use crate::config::NormalizerConfig;
use crate::model::ServiceRecord;

/// Canonical form of a raw hospitalization identifier: trim, then strip
/// exactly one leading occurrence of the prefix. `"000000123"` becomes
/// `"000123"`, not `"123"` — the doubled form is a distinct upstream
/// identifier, not double padding.
pub fn canonical_id(raw: &str, prefix: &str) -> String {
    let trimmed = raw.trim();
    if prefix.is_empty() {
        return trimmed.to_string();
    }
    match trimmed.strip_prefix(prefix) {
        Some(rest) => rest.to_string(),
        None => trimmed.to_string(),
    }
}

/// Fill every record's canonical hospitalization identifier, leaving the
/// raw field untouched. Triage identifiers pass through as-is; that side
/// of the feed has never carried the padded format.
pub fn apply(records: &mut [ServiceRecord], config: &NormalizerConfig) {
    for record in records {
        record.hospitalization_id =
            canonical_id(&record.hospitalization_id_raw, &config.strip_prefix);
    }
}
