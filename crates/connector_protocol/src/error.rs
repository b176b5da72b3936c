use std::collections::BTreeSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::message::MessageKind;

/// A line that is not syntactically valid JSON.
#[derive(Debug, Error)]
#[error("unable to parse line as JSON: {source}")]
pub struct ParseError {
    /// The offending line, without its terminator.
    pub line: String,
    #[source]
    pub source: serde_json::Error,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error while reading line {line_number}: {source}")]
    Io {
        line_number: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid UTF-8 on line {line_number}")]
    InvalidUtf8 { line_number: usize },
    #[error("line {line_number} too long (observed_bytes={observed_bytes}, max_line_bytes={max_line_bytes})")]
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("line {line_number}: {source}")]
    Parse {
        line_number: usize,
        #[source]
        source: ParseError,
    },
    #[error("line {line_number} is missing required {} key(s)", join_keys(.missing))]
    InvalidInput {
        line_number: usize,
        missing: BTreeSet<String>,
    },
    #[error("line {line_number} is not a valid {kind} message: {source}")]
    InvalidMessage {
        line_number: usize,
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("unknown message type '{message_type}' in message")]
    UnrecognizedMessage { message_type: String },
    #[error("failed to encode message: {source}")]
    Encode {
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to write message: {source}")]
    Write {
        #[source]
        source: std::io::Error,
    },
}

impl ProtocolError {
    /// Line number the failure was detected on, when it is tied to an input line.
    pub fn line_number(&self) -> Option<usize> {
        match self {
            ProtocolError::Io { line_number, .. }
            | ProtocolError::InvalidUtf8 { line_number }
            | ProtocolError::LineTooLong { line_number, .. }
            | ProtocolError::Parse { line_number, .. }
            | ProtocolError::InvalidInput { line_number, .. }
            | ProtocolError::InvalidMessage { line_number, .. } => Some(*line_number),
            ProtocolError::UnrecognizedMessage { .. }
            | ProtocolError::Encode { .. }
            | ProtocolError::Write { .. } => None,
        }
    }
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read reader config from `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode reader config from TOML: {source}")]
    TomlDecode {
        #[source]
        source: toml::de::Error,
    },
}
