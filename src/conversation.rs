use crate::model::{Attachment, Message};

/// Turns sent to the remote model as context.
pub(crate) const CONTEXT_TURNS: usize = 10;

pub(crate) const GREETING: &str = "Hello friend! I am so happy to see you! (◕‿◕)";

/// Append-only chat log plus the single pending-attachment slot.
#[derive(Clone, Debug, Default)]
pub(crate) struct Conversation {
    messages: Vec<Message>,
    pending: Option<Attachment>,
}

impl Conversation {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_greeting() -> Self {
        let mut c = Self::new();
        c.append(Message::model(GREETING));
        c
    }

    pub(crate) fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub(crate) fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn len(&self) -> usize {
        self.messages.len()
    }

    /// The last `n` turns in insertion order.
    pub(crate) fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    pub(crate) fn pending(&self) -> Option<&Attachment> {
        self.pending.as_ref()
    }

    /// Replaces the pending attachment, returning the one it displaced.
    pub(crate) fn set_pending(&mut self, attachment: Attachment) -> Option<Attachment> {
        self.pending.replace(attachment)
    }

    pub(crate) fn take_pending(&mut self) -> Option<Attachment> {
        self.pending.take()
    }

    pub(crate) fn clear_pending(&mut self) -> bool {
        self.pending.take().is_some()
    }
}
