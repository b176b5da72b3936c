mod lines;

use std::collections::BTreeSet;
use std::io::{BufReader, Read};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::config::ReaderConfig;
use crate::error::{ParseError, ProtocolError};
use crate::handler::{dispatch, MessageHandler};
use crate::message::{
    missing_keys, type_tag, Message, MessageKind, RecordMessage, SchemaMessage, StateMessage,
    UnknownMessage,
};
use crate::metrics::{Metric, MetricsContext, TimerStatus};
use crate::stats::ProcessingStats;

use lines::MessageLines;

/// Parses one line as JSON, keeping every number's exact decimal value.
pub fn deserialize_json(line: &str) -> Result<Value, ParseError> {
    serde_json::from_str(line).map_err(|source| ParseError {
        line: line.to_string(),
        source,
    })
}

/// Parses and validates a single protocol line.
///
/// An empty or whitespace-only line is not JSON and fails with [`ProtocolError::Parse`].
/// Unrecognized `type` values yield [`Message::Unknown`]; rejecting them is the handler's call.
pub fn parse_line(line_number: usize, line: &str) -> Result<Message, ProtocolError> {
    let value =
        deserialize_json(line).map_err(|source| ProtocolError::Parse { line_number, source })?;
    decode_message(line_number, value)
}

fn decode_message(line_number: usize, value: Value) -> Result<Message, ProtocolError> {
    let Value::Object(mut object) = value else {
        return Err(ProtocolError::InvalidInput {
            line_number,
            missing: BTreeSet::from(["type".to_string()]),
        });
    };
    require(line_number, missing_keys(&object, ["type"]))?;

    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .and_then(MessageKind::from_type_tag);
    let Some(kind) = kind else {
        let message_type = object
            .shift_remove("type")
            .map(|tag| type_tag(&tag))
            .unwrap_or_default();
        return Ok(Message::Unknown(UnknownMessage {
            message_type,
            body: object,
        }));
    };
    require(
        line_number,
        missing_keys(&object, kind.required_keys().iter().copied()),
    )?;

    let invalid = |source: serde_json::Error| ProtocolError::InvalidMessage {
        line_number,
        kind,
        source,
    };
    let message = match kind {
        MessageKind::Schema => Message::Schema(
            decode_around(object, "schema", |message: &mut SchemaMessage, schema| {
                message.schema = schema
            })
            .map_err(invalid)?,
        ),
        MessageKind::Record => Message::Record(
            decode_around(object, "record", |message: &mut RecordMessage, record| {
                if let Value::Object(record) = record {
                    message.record = record;
                }
            })
            .map_err(invalid)?,
        ),
        MessageKind::ActivateVersion => Message::ActivateVersion(decode(object).map_err(invalid)?),
        MessageKind::State => Message::State(
            decode_around(object, "value", |message: &mut StateMessage, value| {
                message.value = value
            })
            .map_err(invalid)?,
        ),
        MessageKind::Batch => Message::Batch(decode(object).map_err(invalid)?),
    };
    Ok(message)
}

fn decode<T: DeserializeOwned>(object: Map<String, Value>) -> Result<T, serde_json::Error> {
    serde_json::from_value(Value::Object(object))
}

/// Decodes `object` into `T` without passing the free-form `payload` field through serde.
///
/// Re-deserializing a parsed `Value` renders its numbers anew (`0.000000000000000000001`
/// comes back as `1e-21`), so the payload is swapped for an empty stand-in of the same JSON
/// type and handed back to `restore` untouched.
fn decode_around<T, F>(
    mut object: Map<String, Value>,
    payload: &str,
    restore: F,
) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned,
    F: FnOnce(&mut T, Value),
{
    let original = object.get_mut(payload).map(|slot| {
        let stand_in = match &*slot {
            Value::Object(_) => Value::Object(Map::new()),
            Value::Array(_) => Value::Array(Vec::new()),
            other => other.clone(),
        };
        std::mem::replace(slot, stand_in)
    });
    let mut message = decode(object)?;
    if let Some(original) = original {
        restore(&mut message, original);
    }
    Ok(message)
}

fn require(line_number: usize, missing: BTreeSet<String>) -> Result<(), ProtocolError> {
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::InvalidInput {
            line_number,
            missing,
        })
    }
}

/// Consumes a line-delimited message stream and drives a [`MessageHandler`].
///
/// Lines are handled strictly one at a time: each is parsed, validated and dispatched before
/// the next is read. The first failure ends the read.
pub struct MessageReader<H> {
    handler: H,
    config: ReaderConfig,
    metrics: MetricsContext,
}

impl<H: MessageHandler> MessageReader<H> {
    pub fn new(handler: H) -> Self {
        Self::with_config(handler, ReaderConfig::default())
    }

    pub fn with_config(handler: H, config: ReaderConfig) -> Self {
        let metrics = MetricsContext::for_process().with_log_interval(config.metrics.log_interval());
        Self {
            handler,
            config,
            metrics,
        }
    }

    /// Replaces the tags and sink used by [`Self::listen`].
    ///
    /// The counter log interval still comes from [`ReaderConfig::metrics`].
    pub fn with_metrics(mut self, metrics: MetricsContext) -> Self {
        self.metrics = metrics.with_log_interval(self.config.metrics.log_interval());
        self
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }

    /// Reads standard input until it is exhausted.
    pub fn listen_stdin(&mut self) -> Result<ProcessingStats, H::Error> {
        self.listen(std::io::stdin().lock())
    }

    /// Reads `input` until it is exhausted, then signals end of pipe to the handler.
    ///
    /// The whole call is timed as `sync_duration`; RECORD messages are counted live as
    /// `message_count`.
    pub fn listen<R: Read>(&mut self, input: R) -> Result<ProcessingStats, H::Error> {
        let timer = self.metrics.timer(Metric::SyncDuration);
        let outcome = self.process_lines(input).and_then(|stats| {
            self.handler.process_end_of_pipe()?;
            Ok(stats)
        });
        let status = if outcome.is_ok() {
            TimerStatus::Succeeded
        } else {
            TimerStatus::Failed
        };
        timer.stop(status);
        outcome
    }

    fn process_lines<R: Read>(&mut self, input: R) -> Result<ProcessingStats, H::Error> {
        let mut stats = ProcessingStats::default();
        let mut record_counter = self.metrics.counter(Metric::MessageCount);
        let lines = MessageLines::new(BufReader::new(input), self.config.limits.max_line_bytes);

        for line in lines {
            let parsed = line.and_then(|(line_number, text)| parse_line(line_number, &text));
            let message = match parsed {
                Ok(message) => message,
                Err(err) => return Err(fail(err)),
            };

            if matches!(message, Message::Record(_)) {
                record_counter.increment();
            }
            let message_type = message.type_name().to_string();
            dispatch(&mut self.handler, message)?;
            stats.increment(&message_type);
        }

        record_counter.finish();
        debug!(stats = ?stats, total = stats.total(), "finished reading input");
        Ok(stats)
    }
}

fn fail<E: From<ProtocolError>>(err: ProtocolError) -> E {
    match &err {
        ProtocolError::Parse { line_number, source } => {
            error!(line_number, line = %source.line, "unable to parse line: {}", source.source)
        }
        other => error!(line_number = other.line_number(), "{other}"),
    }
    err.into()
}
