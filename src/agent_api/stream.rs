// ABOUTME: Server-sent event stream returned by a streaming message send
// ABOUTME: Decodes SSE frames into AgentEvents and stops after the first terminal item
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fmt;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bridge_core::{AgentEvent, BridgeError, BridgeResult};
use eventsource_stream::Eventsource;
use futures_util::stream::{Stream, StreamExt};
use serde_json::Value;
use tracing::debug;

type EventItems = Pin<Box<dyn Stream<Item = BridgeResult<AgentEvent>> + Send>>;

/// Ordered events for one streamed prompt
///
/// Yields `Ok` events in arrival order, then exactly one terminal item: `None`
/// when the agent ended the stream, or an `Err` when it broke. After either,
/// the stream stays exhausted.
pub struct AgentEventStream {
    session_id: String,
    events: EventItems,
    finished: bool,
}

impl AgentEventStream {
    /// Decode a raw SSE byte stream
    pub fn from_bytes<S, B, E>(session_id: impl Into<String>, bytes: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]>,
        E: fmt::Display + Send + 'static,
    {
        let session_id = session_id.into();
        let owner = session_id.clone();
        let events = bytes.eventsource().map(move |item| match item {
            Ok(event) => Ok(AgentEvent {
                event: if event.event.is_empty() {
                    "message".to_owned()
                } else {
                    event.event
                },
                data: decode_data(event.data),
            }),
            Err(e) => Err(BridgeError::message(
                &owner,
                None,
                format!("Event stream interrupted: {e}"),
            )),
        });

        Self {
            session_id,
            events: Box::pin(events),
            finished: false,
        }
    }

    /// Session the events belong to
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stop consuming; the underlying HTTP response is released
    pub fn close(self) {
        debug!(session_id = %self.session_id, "Event stream closed by consumer");
    }
}

/// Event data is JSON when it parses, otherwise forwarded as a plain string
fn decode_data(data: String) -> Value {
    serde_json::from_str(&data).unwrap_or(Value::String(data))
}

impl Stream for AgentEventStream {
    type Item = BridgeResult<AgentEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        let item = ready!(self.events.as_mut().poll_next(cx));
        if !matches!(item, Some(Ok(_))) {
            self.finished = true;
        }
        Poll::Ready(item)
    }
}

impl fmt::Debug for AgentEventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentEventStream")
            .field("session_id", &self.session_id)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}
