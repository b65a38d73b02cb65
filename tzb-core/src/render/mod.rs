//! Event-to-message rendering.
//!
//! The [`MessageRenderer`] keeps a registry from event type tag to a
//! [`Handler`]. A handler either produces message text, asks for the event
//! to be suppressed, or returns `None` when the event does not have the
//! shape it expects. Unknown tags and `None` results both fall back to the
//! generic "performed" message.

mod handlers;

use std::collections::HashMap;

use tracing::trace;

use crate::events::EventRecord;

/// What a handler decided for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutput {
    /// Message body to post.
    Text(String),
    /// Post nothing for this event.
    Suppress,
}

/// Renders one event. `None` means "not my shape", which selects the
/// generic rendering.
pub type Handler = fn(&EventRecord) -> Option<HandlerOutput>;

/// A message ready for the chat service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    /// Topic, at most 60 characters.
    pub subject: String,
    pub body: String,
}

/// Result of rendering one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Message(RenderedMessage),
    Suppressed,
}

impl Rendered {
    pub fn is_suppressed(&self) -> bool {
        matches!(self, Rendered::Suppressed)
    }
}

/// Maps event type tags to handlers.
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    handlers: HashMap<&'static str, Handler>,
}

impl MessageRenderer {
    /// Create a renderer with the built-in handler catalog.
    pub fn new() -> Self {
        Self {
            handlers: handlers::CATALOG.iter().copied().collect(),
        }
    }

    /// Add or replace the handler for `kind`, returning the previous one.
    pub fn register(&mut self, kind: &'static str, handler: Handler) -> Option<Handler> {
        self.handlers.insert(kind, handler)
    }

    /// Whether `kind` has a dedicated handler.
    pub fn handles(&self, kind: &str) -> bool {
        self.handlers.contains_key(kind)
    }

    /// Render `event` into a message, or decide to suppress it.
    pub fn render(&self, event: &EventRecord) -> Rendered {
        let output = self
            .handlers
            .get(event.kind())
            .and_then(|handler| handler(event))
            .unwrap_or_else(|| {
                trace!(kind = event.kind(), "Using generic rendering");
                handlers::generic(event)
            });

        match output {
            HandlerOutput::Text(body) => Rendered::Message(RenderedMessage {
                subject: event.derive_subject(),
                body,
            }),
            HandlerOutput::Suppress => Rendered::Suppressed,
        }
    }
}

impl Default for MessageRenderer {
    fn default() -> Self {
        Self::new()
    }
}
