use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// Every variant is a caller error.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("unknown field {0:?}")]
    UnknownField(String),

    #[error("type error: {0}")]
    Type(String),

    #[error("invalid timestamp {value:?}: {source}")]
    Timestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("filter evaluated to a {0} value, expected bool")]
    NotBoolean(&'static str),

    #[error("field {field:?} does not hold a {expected} value")]
    FieldValue { field: String, expected: &'static str },
}
