//! Error types for the pattern module

/// Result type for pattern operations
pub type PatternResult<T> = std::result::Result<T, PatternError>;

/// Errors raised while parsing or evaluating cron expressions
#[derive(Debug, Clone, thiserror::Error)]
pub enum PatternError {
    /// Wrong number of fields in the expression
    #[error("expected 5, 6 or 7 fields in cron expression '{expr}', found {found}")]
    FieldCount { expr: String, found: usize },

    /// A field failed to parse
    #[error("invalid {field} field '{value}': {reason}")]
    InvalidField {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A field value is outside the admissible range
    #[error("{field} value {value} out of range {min}..={max}")]
    ValueOutOfRange {
        field: &'static str,
        value: u32,
        min: u32,
        max: u32,
    },

    /// Unknown timezone name in the scheduler configuration
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
}
