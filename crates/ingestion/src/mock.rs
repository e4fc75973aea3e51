//! Mock bus endpoints
//!
//! For tests and hardware-less runs: a publisher that records what it was
//! asked to send, and a connection that replays a fixed event script.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use contracts::{BusError, BusPublisher, DeliveryGuarantee};
use tokio_util::sync::CancellationToken;

use crate::connection::{BusConnection, BusEvent};

/// Ordered log shared between mocks to assert cross-component ordering
pub type Journal = Arc<Mutex<Vec<String>>>;

/// Append an entry to a journal
pub fn journal_push(journal: &Journal, entry: impl Into<String>) {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(entry.into());
}

/// Copy of the journal contents
pub fn journal_entries(journal: &Journal) -> Vec<String> {
    journal
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// One recorded publish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedMessage {
    pub topic: String,
    pub payload: String,
    pub guarantee: DeliveryGuarantee,
}

/// Publisher that records instead of sending
#[derive(Debug, Default)]
pub struct RecordingBus {
    published: Mutex<Vec<PublishedMessage>>,
    journal: Option<Journal>,
    failing: AtomicBool,
}

impl RecordingBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log `publish:<payload>` entries into `journal`
    pub fn with_journal(journal: Journal) -> Self {
        Self {
            journal: Some(journal),
            ..Self::default()
        }
    }

    /// Make every subsequent publish fail
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Successfully published messages, in order
    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Payloads of the successfully published messages
    pub fn payloads(&self) -> Vec<String> {
        self.published().into_iter().map(|m| m.payload).collect()
    }
}

impl BusPublisher for RecordingBus {
    async fn publish(
        &self,
        topic: &str,
        payload: &str,
        guarantee: DeliveryGuarantee,
    ) -> Result<(), BusError> {
        if self.failing.load(Ordering::SeqCst) {
            if let Some(journal) = &self.journal {
                journal_push(journal, format!("publish-failed:{payload}"));
            }
            return Err(BusError::publish(topic, "mock failure"));
        }

        if let Some(journal) = &self.journal {
            journal_push(journal, format!("publish:{payload}"));
        }
        self.published
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PublishedMessage {
                topic: topic.to_string(),
                payload: payload.to_string(),
                guarantee,
            });
        Ok(())
    }
}

/// Connection replaying a fixed list of events
///
/// Once the script is exhausted it waits forever, optionally cancelling a
/// token first so the subscriber loop under test winds down.
#[derive(Debug, Default)]
pub struct ScriptedConnection {
    script: VecDeque<Result<BusEvent, BusError>>,
    on_drained: Option<CancellationToken>,
    journal: Option<Journal>,
    subscriptions: Vec<String>,
    disconnected: bool,
}

impl ScriptedConnection {
    pub fn new(script: Vec<Result<BusEvent, BusError>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn cancel_when_drained(mut self, token: CancellationToken) -> Self {
        self.on_drained = Some(token);
        self
    }

    /// Log a `disconnect` entry into `journal` when disconnected
    pub fn with_journal(mut self, journal: Journal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Topics subscribed so far (one entry per request)
    pub fn subscriptions(&self) -> Vec<String> {
        self.subscriptions.clone()
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }
}

impl BusConnection for ScriptedConnection {
    async fn next_event(&mut self) -> Result<BusEvent, BusError> {
        if let Some(event) = self.script.pop_front() {
            return event;
        }
        if let Some(token) = &self.on_drained {
            token.cancel();
        }
        std::future::pending().await
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(journal) = &self.journal {
            journal_push(journal, "disconnect");
        }
        self.disconnected = true;
    }
}
