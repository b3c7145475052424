use std::fmt;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no sources, bad tier boundaries, etc.).
    ConfigValidation(String),
    /// Missing required column in input data.
    MissingColumn { origin: String, column: String },
    /// No source could be parsed at all.
    NoData,
    /// IO error (file read, etc.).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { origin, column } => {
                write!(f, "source '{origin}': missing column '{column}'")
            }
            Self::NoData => write!(f, "no data available: every source failed to parse"),
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
