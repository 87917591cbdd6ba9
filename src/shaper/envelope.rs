//! Response envelope
//!
//! Every JSON response, success or failure, is `{"result": ..., "messages": [...]}`.

use serde::Serialize;

/// The uniform response wrapper
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope<T> {
    pub result: T,
    pub messages: Vec<String>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(result: T) -> Self {
        Self {
            result,
            messages: Vec::new(),
        }
    }

    /// Attach a non-fatal advisory
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.messages.push(message.into());
        self
    }
}

impl Envelope<Option<()>> {
    /// Failure envelope: null result plus client-safe messages
    pub fn failure(messages: Vec<String>) -> Self {
        Self {
            result: None,
            messages,
        }
    }
}
