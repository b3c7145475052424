use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PipelineConfig {
    pub name: String,
    pub sources: Vec<SourceConfig>,
    pub columns: ColumnMapping,
    #[serde(default)]
    pub reference: Option<ReferenceConfig>,
    #[serde(default)]
    pub normalizer: NormalizerConfig,
    #[serde(default)]
    pub tiers: TierConfig,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
}

/// One source export. Config order defines stream order.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    pub origin: String,
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

/// Header text -> internal field. Columns are contract, not positional;
/// this is the only place source header names appear.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub patient_id: String,
    pub hospitalization_id: String,
    pub triage_id: String,
    pub service_date: String,
    pub service_area: String,
    pub description: String,
    pub quantity: String,
    pub cost_level6: String,
    pub amount_level1: String,
    pub amount_level6: String,
}

/// Reference summary file: one independently computed total per patient.
#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    pub file: String,
    pub patient_id: String,
    pub total: String,
}

// ---------------------------------------------------------------------------
// Normalizer + tiers + tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct NormalizerConfig {
    /// Prefix stripped (once) from hospitalization identifiers.
    #[serde(default = "default_strip_prefix")]
    pub strip_prefix: String,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            strip_prefix: default_strip_prefix(),
        }
    }
}

fn default_strip_prefix() -> String {
    "000".into()
}

/// Magnitude tiers for both-sided reconciliation deltas. Boundaries are
/// inclusive on the lower tier: abs == small_max_cents is still small.
#[derive(Debug, Clone, Deserialize)]
pub struct TierConfig {
    #[serde(default = "default_small_max_cents")]
    pub small_max_cents: i64,
    #[serde(default = "default_medium_max_cents")]
    pub medium_max_cents: i64,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            small_max_cents: default_small_max_cents(),
            medium_max_cents: default_medium_max_cents(),
        }
    }
}

fn default_small_max_cents() -> i64 {
    10_000
}

fn default_medium_max_cents() -> i64 {
    100_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToleranceConfig {
    /// Agreement threshold per patient and for the global sum self-check.
    #[serde(default = "default_delta_cents")]
    pub delta_cents: i64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            delta_cents: default_delta_cents(),
        }
    }
}

fn default_delta_cents() -> i64 {
    1
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl PipelineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: PipelineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sources.is_empty() {
            return Err(EngineError::ConfigValidation(
                "at least one source is required".into(),
            ));
        }

        for (i, source) in self.sources.iter().enumerate() {
            if source.origin.trim().is_empty() {
                return Err(EngineError::ConfigValidation(format!(
                    "source #{}: origin must not be empty",
                    i + 1
                )));
            }
            let dup = self.sources[..i].iter().any(|s| s.origin == source.origin);
            if dup {
                return Err(EngineError::ConfigValidation(format!(
                    "duplicate source origin '{}'",
                    source.origin
                )));
            }
        }

        if self.normalizer.strip_prefix.is_empty() {
            return Err(EngineError::ConfigValidation(
                "normalizer.strip_prefix must not be empty".into(),
            ));
        }

        if self.tiers.small_max_cents <= 0 {
            return Err(EngineError::ConfigValidation(format!(
                "tiers.small_max_cents must be positive, got {}",
                self.tiers.small_max_cents
            )));
        }
        if self.tiers.medium_max_cents <= self.tiers.small_max_cents {
            return Err(EngineError::ConfigValidation(format!(
                "tiers.medium_max_cents ({}) must exceed small_max_cents ({})",
                self.tiers.medium_max_cents, self.tiers.small_max_cents
            )));
        }

        if self.tolerance.delta_cents < 0 {
            return Err(EngineError::ConfigValidation(format!(
                "tolerance.delta_cents must not be negative, got {}",
                self.tolerance.delta_cents
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
