#![forbid(unsafe_code)]
//! Message exchange protocol between extractor ("tap") and loader ("target") processes.
//!
//! The wire format is UTF-8 text with one JSON object per line; every object carries a `type`
//! tag naming one of `SCHEMA`, `RECORD`, `ACTIVATE_VERSION`, `STATE` or `BATCH`. This crate
//! provides:
//! - Typed messages and their wire encoding ([`Message`], [`MessageWriter`]).
//! - A strict, line-at-a-time reader that validates each line and dispatches it to a
//!   [`MessageHandler`] ([`MessageReader`]).
//! - Counters and timers reported through an explicit [`MetricsContext`].
//!
//! JSON numbers keep their exact decimal value from read to write: `1.10` is never rewritten
//! as `1.1` and large integers never pass through floating point. Exponent spellings may be
//! normalized (`1.0e5` is written as `1.0e+5`).

mod config;
mod error;
mod handler;
mod message;
pub mod metrics;
mod reader;
mod stats;
mod writer;

pub use config::{MetricsConfig, ReadLimits, ReaderConfig};
pub use error::{ConfigError, ParseError, ProtocolError};
pub use handler::{dispatch, MessageHandler};
pub use message::{
    missing_keys, ActivateVersionMessage, BatchEncoding, BatchFileFormat, BatchMessage, Message,
    MessageKind, RecordMessage, SchemaMessage, StateMessage, UnknownMessage,
};
pub use metrics::{MetricSink, MetricsContext};
pub use reader::{deserialize_json, parse_line, MessageReader};
pub use stats::ProcessingStats;
pub use writer::{format_message, MessageWriter};
