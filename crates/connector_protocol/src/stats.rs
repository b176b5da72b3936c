use std::collections::BTreeMap;

use serde::Serialize;

use crate::message::MessageKind;

/// Per-type message counts for one pass over an input stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProcessingStats {
    counts: BTreeMap<String, u64>,
}

impl ProcessingStats {
    pub(crate) fn increment(&mut self, message_type: &str) {
        *self.counts.entry(message_type.to_string()).or_default() += 1;
    }

    /// Count for a wire `type` tag, including unrecognized tags a handler chose to skip.
    pub fn get(&self, message_type: &str) -> u64 {
        self.counts.get(message_type).copied().unwrap_or(0)
    }

    pub fn kind(&self, kind: MessageKind) -> u64 {
        self.get(kind.as_str())
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }
}
