use std::fmt::Display;

#[derive(Debug, Clone, PartialEq)]
pub enum QueryError {
    /// `evaluate` was given no table and the query names no source table.
    MissingSource,
    /// The catalog has no table under this name.
    UnknownTable(String),
    /// A serialized verb names a kind absent from the registry.
    UnknownVerb(String),
    /// A serialized verb matched a registered kind but its body is malformed.
    InvalidVerb { verb: String, message: String },
    /// The top-level query encoding is not the expected shape.
    InvalidQuery(String),
    /// A verb expression referenced a parameter the query never set.
    UnknownParam(String),
    /// Failure raised by a verb's own evaluation, passed through verbatim.
    Verb(String),
}

impl Display for QueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryError::MissingSource => {
                write!(f, "no input table given and the query names no source table")
            }
            QueryError::UnknownTable(name) => write!(f, "unknown table '{name}'"),
            QueryError::UnknownVerb(name) => write!(f, "unknown verb '{name}'"),
            QueryError::InvalidVerb { verb, message } => {
                write!(f, "invalid encoding for verb '{verb}': {message}")
            }
            QueryError::InvalidQuery(message) => write!(f, "invalid query encoding: {message}"),
            QueryError::UnknownParam(name) => write!(f, "unknown parameter '{name}'"),
            QueryError::Verb(message) => write!(f, "verb evaluation failed: {message}"),
        }
    }
}

impl std::error::Error for QueryError {}
