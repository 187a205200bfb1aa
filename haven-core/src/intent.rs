//! One-shot context handoff between screens
//!
//! A single-slot mailbox: setting a new intent replaces any unconsumed one,
//! and consuming clears the slot. It is deliberately not a queue; receiving
//! screens assume at most one pending context.

use crate::store::{keys, PersistentStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Typed context handed to the next screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentEnvelope {
    pub intent: String,
    #[serde(default)]
    pub payload: Value,
}

/// Repository over the pending envelope.
pub struct IntentChannel<'a> {
    store: &'a PersistentStore,
}

impl<'a> IntentChannel<'a> {
    pub fn new(store: &'a PersistentStore) -> Self {
        Self { store }
    }

    /// Replace the pending envelope. Blank intent names are ignored.
    pub fn set_next_intent(&self, intent: &str, payload: Value) {
        let intent = intent.trim();
        if intent.is_empty() {
            tracing::debug!("ignoring blank intent");
            return;
        }

        let envelope = IntentEnvelope {
            intent: intent.to_string(),
            payload,
        };
        match serde_json::to_string(&envelope) {
            Ok(json) => {
                self.store.set(keys::INTENT, &json);
                tracing::debug!(intent, "set next intent");
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize intent"),
        }
    }

    /// Take the pending envelope, leaving the slot empty.
    pub fn consume_next_intent(&self) -> Option<IntentEnvelope> {
        let raw = self.store.get(keys::INTENT)?;
        self.store.remove(keys::INTENT);
        let envelope = parse(&raw);
        if let Some(envelope) = &envelope {
            tracing::debug!(intent = %envelope.intent, "consumed intent");
        }
        envelope
    }

    /// Read the pending envelope without consuming it.
    pub fn peek_next_intent(&self) -> Option<IntentEnvelope> {
        self.store.get(keys::INTENT).and_then(|raw| parse(&raw))
    }
}

fn parse(raw: &str) -> Option<IntentEnvelope> {
    match serde_json::from_str::<IntentEnvelope>(raw) {
        Ok(envelope) if !envelope.intent.trim().is_empty() => Some(envelope),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!(error = %e, "stored intent is malformed, dropping it");
            None
        }
    }
}
