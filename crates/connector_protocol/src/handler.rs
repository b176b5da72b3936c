use tracing::debug;

use crate::error::ProtocolError;
use crate::message::{
    ActivateVersionMessage, BatchMessage, Message, RecordMessage, SchemaMessage, StateMessage,
    UnknownMessage,
};

/// Kind-specific behavior supplied by a concrete tap or target.
///
/// [`crate::MessageReader`] calls exactly one method per input message, in input order. Errors
/// returned here stop the read and are handed back to the caller unchanged; protocol failures
/// detected by the reader itself are converted into `Self::Error`.
pub trait MessageHandler {
    type Error: From<ProtocolError>;

    fn process_schema(&mut self, message: SchemaMessage) -> Result<(), Self::Error>;

    fn process_record(&mut self, message: RecordMessage) -> Result<(), Self::Error>;

    fn process_state(&mut self, message: StateMessage) -> Result<(), Self::Error>;

    fn process_activate_version(
        &mut self,
        message: ActivateVersionMessage,
    ) -> Result<(), Self::Error>;

    fn process_batch(&mut self, message: BatchMessage) -> Result<(), Self::Error>;

    /// Called for a `type` outside the known kinds. Fails by default; override to skip
    /// (the message is then still counted under its own type name).
    fn process_unknown(&mut self, message: UnknownMessage) -> Result<(), Self::Error> {
        Err(ProtocolError::UnrecognizedMessage {
            message_type: message.message_type,
        }
        .into())
    }

    /// Called once after the input is exhausted, before stats are returned.
    fn process_end_of_pipe(&mut self) -> Result<(), Self::Error> {
        debug!("end of pipe reached");
        Ok(())
    }
}

/// Routes `message` to the matching handler method.
pub fn dispatch<H>(handler: &mut H, message: Message) -> Result<(), H::Error>
where
    H: MessageHandler + ?Sized,
{
    match message {
        Message::Schema(message) => handler.process_schema(message),
        Message::Record(message) => handler.process_record(message),
        Message::ActivateVersion(message) => handler.process_activate_version(message),
        Message::State(message) => handler.process_state(message),
        Message::Batch(message) => handler.process_batch(message),
        Message::Unknown(message) => handler.process_unknown(message),
    }
}
