use std::io::{Stdout, Write};

use tracing::trace;

use crate::error::ProtocolError;
use crate::message::Message;

/// Renders `message` as one wire line, without the trailing newline.
pub fn format_message(message: &Message) -> Result<String, ProtocolError> {
    serde_json::to_string(message).map_err(|source| ProtocolError::Encode { source })
}

/// Emits messages, one line per call, in call order. Each line is flushed as it is written.
#[derive(Debug)]
pub struct MessageWriter<W: Write> {
    out: W,
}

impl MessageWriter<Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> MessageWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn format_message(&self, message: &Message) -> Result<String, ProtocolError> {
        format_message(message)
    }

    pub fn write_message(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let mut line = self.format_message(message)?;
        line.push('\n');
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.flush())
            .map_err(|source| ProtocolError::Write { source })?;
        trace!(
            message_type = message.type_name(),
            bytes = line.len(),
            "wrote message"
        );
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
