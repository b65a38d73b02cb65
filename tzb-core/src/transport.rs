//! Seams between the poll loop and the two HTTP APIs.

use async_trait::async_trait;
use tzb_sdk::client::{ClientError, TrelloClient, ZulipClient};
use tzb_sdk::objects::StreamMessage;

use crate::render::RenderedMessage;

/// Where activity payloads come from.
#[async_trait]
pub trait EventSource: Send + Sync {
    /// Fetch the raw payload of events newer than `since`.
    async fn fetch(&self, since: &str) -> Result<String, ClientError>;
}

/// Where rendered messages go.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn post(&self, message: &RenderedMessage) -> Result<(), ClientError>;
}

#[async_trait]
impl EventSource for TrelloClient {
    async fn fetch(&self, since: &str) -> Result<String, ClientError> {
        self.organization_actions(since).await
    }
}

/// Posts every message to one Zulip stream, using the message subject as
/// the topic.
#[derive(Debug, Clone)]
pub struct StreamSink {
    client: ZulipClient,
    stream: String,
}

impl StreamSink {
    pub fn new(client: ZulipClient, stream: impl Into<String>) -> Self {
        Self {
            client,
            stream: stream.into(),
        }
    }

    pub fn stream(&self) -> &str {
        &self.stream
    }
}

#[async_trait]
impl MessageSink for StreamSink {
    async fn post(&self, message: &RenderedMessage) -> Result<(), ClientError> {
        let message = StreamMessage::new(&self.stream, &message.subject, &message.body);
        self.client.send_stream_message(&message).await
    }
}
