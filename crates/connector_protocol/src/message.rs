use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use time::OffsetDateTime;

/// The five recognized protocol message kinds, keyed by their wire `type` tag.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum MessageKind {
    Schema,
    Record,
    ActivateVersion,
    State,
    Batch,
}

impl MessageKind {
    pub const ALL: [MessageKind; 5] = [
        MessageKind::Schema,
        MessageKind::Record,
        MessageKind::ActivateVersion,
        MessageKind::State,
        MessageKind::Batch,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Schema => "SCHEMA",
            MessageKind::Record => "RECORD",
            MessageKind::ActivateVersion => "ACTIVATE_VERSION",
            MessageKind::State => "STATE",
            MessageKind::Batch => "BATCH",
        }
    }

    /// Maps a wire `type` tag to a kind; tags are case-sensitive.
    pub fn from_type_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Keys a message of this kind must carry besides `type`.
    pub fn required_keys(self) -> &'static [&'static str] {
        match self {
            MessageKind::Schema => &["stream", "schema"],
            MessageKind::Record => &["stream", "record"],
            MessageKind::ActivateVersion => &["stream", "version"],
            MessageKind::State => &["value"],
            MessageKind::Batch => &["stream", "encoding", "manifest"],
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Announces the JSON Schema of a stream. Precedes the stream's records.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SchemaMessage {
    pub stream: String,
    pub schema: Value,
    #[serde(default)]
    pub key_properties: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bookmark_properties: Option<Vec<String>>,
}

impl SchemaMessage {
    pub fn new(stream: impl Into<String>, schema: Value) -> Self {
        Self {
            stream: stream.into(),
            schema,
            key_properties: Vec::new(),
            bookmark_properties: None,
        }
    }

    pub fn with_key_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_properties = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_bookmark_properties<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bookmark_properties = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// One row of a stream. Numbers inside `record` keep their literal text.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RecordMessage {
    pub stream: String,
    pub record: Map<String, Value>,
    #[serde(
        default,
        with = "time::serde::rfc3339::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub time_extracted: Option<OffsetDateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

impl RecordMessage {
    pub fn new(stream: impl Into<String>, record: Map<String, Value>) -> Self {
        Self {
            stream: stream.into(),
            record,
            time_extracted: None,
            version: None,
        }
    }

    pub fn with_time_extracted(mut self, at: OffsetDateTime) -> Self {
        self.time_extracted = Some(at);
        self
    }

    pub fn with_version(mut self, version: i64) -> Self {
        self.version = Some(version);
        self
    }
}

/// Opaque bookmark describing sync progress. Its shape belongs to the tap.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StateMessage {
    pub value: Value,
}

/// Signals that `version` of `stream` is complete and should replace older versions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ActivateVersionMessage {
    pub stream: String,
    pub version: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchFileFormat {
    Jsonl,
    Parquet,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchEncoding {
    pub format: BatchFileFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compression: Option<String>,
}

/// Points the reader at files holding records for `stream`, in manifest order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BatchMessage {
    pub stream: String,
    pub encoding: BatchEncoding,
    pub manifest: Vec<String>,
}

/// A message whose `type` is not one of the recognized kinds.
///
/// `body` holds every key of the original object except `type`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownMessage {
    pub message_type: String,
    pub body: Map<String, Value>,
}

/// A single protocol message; one JSON object per line on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Schema(SchemaMessage),
    Record(RecordMessage),
    ActivateVersion(ActivateVersionMessage),
    State(StateMessage),
    Batch(BatchMessage),
    Unknown(UnknownMessage),
}

impl Message {
    /// `None` for [`Message::Unknown`].
    pub fn kind(&self) -> Option<MessageKind> {
        match self {
            Message::Schema(_) => Some(MessageKind::Schema),
            Message::Record(_) => Some(MessageKind::Record),
            Message::ActivateVersion(_) => Some(MessageKind::ActivateVersion),
            Message::State(_) => Some(MessageKind::State),
            Message::Batch(_) => Some(MessageKind::Batch),
            Message::Unknown(_) => None,
        }
    }

    /// The wire `type` tag.
    pub fn type_name(&self) -> &str {
        match self {
            Message::Unknown(unknown) => unknown.message_type.as_str(),
            other => other.kind().map(MessageKind::as_str).unwrap_or_default(),
        }
    }
}

#[derive(Serialize)]
struct Tagged<'a, T: Serialize> {
    #[serde(rename = "type")]
    message_type: &'a str,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for Message {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let message_type = self.type_name();
        match self {
            Message::Schema(body) => Tagged { message_type, body }.serialize(serializer),
            Message::Record(body) => Tagged { message_type, body }.serialize(serializer),
            Message::ActivateVersion(body) => Tagged { message_type, body }.serialize(serializer),
            Message::State(body) => Tagged { message_type, body }.serialize(serializer),
            Message::Batch(body) => Tagged { message_type, body }.serialize(serializer),
            Message::Unknown(unknown) => Tagged {
                message_type,
                body: &unknown.body,
            }
            .serialize(serializer),
        }
    }
}

impl From<SchemaMessage> for Message {
    fn from(message: SchemaMessage) -> Self {
        Message::Schema(message)
    }
}

impl From<RecordMessage> for Message {
    fn from(message: RecordMessage) -> Self {
        Message::Record(message)
    }
}

impl From<ActivateVersionMessage> for Message {
    fn from(message: ActivateVersionMessage) -> Self {
        Message::ActivateVersion(message)
    }
}

impl From<StateMessage> for Message {
    fn from(message: StateMessage) -> Self {
        Message::State(message)
    }
}

impl From<BatchMessage> for Message {
    fn from(message: BatchMessage) -> Self {
        Message::Batch(message)
    }
}

/// Returns every key in `required` that `object` lacks.
pub fn missing_keys<'a, I>(object: &Map<String, Value>, required: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a str>,
{
    required
        .into_iter()
        .filter(|key| !object.contains_key(*key))
        .map(str::to_string)
        .collect()
}

/// Renders the `type` value as a tag; non-string values use their JSON text.
pub(crate) fn type_tag(value: &Value) -> String {
    match value {
        Value::String(tag) => tag.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_round_trip_through_their_tags() {
        for kind in MessageKind::ALL {
            assert_eq!(MessageKind::from_type_tag(kind.as_str()), Some(kind));
        }
        assert_eq!(MessageKind::from_type_tag("record"), None);
        assert_eq!(MessageKind::from_type_tag("FOO"), None);
    }

    #[test]
    fn missing_keys_reports_the_full_subset() {
        let object = json!({"type": "RECORD"});
        let Value::Object(object) = object else {
            unreachable!()
        };
        let missing = missing_keys(&object, ["type", "stream", "record"]);
        assert_eq!(
            missing.into_iter().collect::<Vec<_>>(),
            vec!["record".to_string(), "stream".to_string()]
        );
    }

    #[test]
    fn type_is_serialized_first() {
        let message = Message::from(ActivateVersionMessage {
            stream: "users".to_string(),
            version: 7,
        });
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"ACTIVATE_VERSION","stream":"users","version":7}"#
        );
    }

    #[test]
    fn unknown_messages_keep_their_tag_and_body() {
        let mut body = Map::new();
        body.insert("payload".to_string(), json!([1, 2]));
        let message = Message::Unknown(UnknownMessage {
            message_type: "FOO".to_string(),
            body,
        });
        assert_eq!(message.kind(), None);
        assert_eq!(message.type_name(), "FOO");
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"FOO","payload":[1,2]}"#
        );
    }

    #[test]
    fn non_string_type_tags_render_as_json() {
        assert_eq!(type_tag(&json!("STATE")), "STATE");
        assert_eq!(type_tag(&json!(5)), "5");
        assert_eq!(type_tag(&Value::Null), "null");
    }
}
