//! The `PaymentProcessor` trait and an in-memory implementation.

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;
use tracing::debug;

use crate::intent::{ChargeIntent, ChargeStatus, IntentMetadata};

/// Processor errors.
#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Processor unreachable: {0}")]
    Unreachable(String),

    #[error("Unknown charge intent: {0}")]
    UnknownIntent(String),

    #[error("Processor rejected request: {0}")]
    Rejected(String),
}

pub type ProcessorResult<T> = Result<T, ProcessorError>;

/// External card-payment processor.
///
/// The processor is the authority on charge state. Callers must never trust a
/// client-reported outcome; they re-fetch the intent with [`retrieve_intent`]
/// and act on the status the processor reports.
///
/// [`retrieve_intent`]: PaymentProcessor::retrieve_intent
pub trait PaymentProcessor {
    /// Create a charge intent for `amount_cents` in `currency`, tagged with
    /// domain metadata.
    fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> ProcessorResult<ChargeIntent>;

    /// Re-fetch an intent by its processor-assigned identifier.
    fn retrieve_intent(&self, intent_id: &str) -> ProcessorResult<ChargeIntent>;
}

/// In-memory processor for tests and demos.
///
/// Intents start out `Pending`; tests drive them to a terminal state with
/// [`settle`](InMemoryProcessor::settle) or [`decline`](InMemoryProcessor::decline),
/// standing in for the cardholder-side confirmation step.
#[derive(Default)]
pub struct InMemoryProcessor {
    intents: Mutex<HashMap<String, ChargeIntent>>,
    offline: Mutex<bool>,
}

impl InMemoryProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a processor outage: all calls fail with `Unreachable`.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// Drive a pending intent to `Succeeded`.
    pub fn settle(&self, intent_id: &str) -> ProcessorResult<()> {
        self.transition(intent_id, ChargeStatus::Succeeded)
    }

    /// Drive a pending intent to `Failed`.
    pub fn decline(&self, intent_id: &str) -> ProcessorResult<()> {
        self.transition(intent_id, ChargeStatus::Failed)
    }

    fn transition(&self, intent_id: &str, status: ChargeStatus) -> ProcessorResult<()> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(intent_id)
            .ok_or_else(|| ProcessorError::UnknownIntent(intent_id.to_string()))?;
        intent.status = status;
        // Secret is only usable while pending.
        intent.client_secret = None;
        Ok(())
    }

    fn check_online(&self) -> ProcessorResult<()> {
        if *self.offline.lock().unwrap() {
            return Err(ProcessorError::Unreachable("simulated outage".to_string()));
        }
        Ok(())
    }
}

impl PaymentProcessor for InMemoryProcessor {
    fn create_intent(
        &self,
        amount_cents: i64,
        currency: &str,
        metadata: IntentMetadata,
    ) -> ProcessorResult<ChargeIntent> {
        self.check_online()?;

        if amount_cents <= 0 {
            return Err(ProcessorError::Rejected(format!(
                "amount must be positive, got {}",
                amount_cents
            )));
        }

        let intent_id = format!("pi_{}", uuid::Uuid::new_v4().simple());
        let intent = ChargeIntent {
            intent_id: intent_id.clone(),
            client_secret: Some(format!("{}_secret_{}", intent_id, uuid::Uuid::new_v4().simple())),
            amount_cents,
            currency: currency.to_lowercase(),
            status: ChargeStatus::Pending,
            metadata,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        debug!(
            intent_id = %intent_id,
            amount_cents,
            "created charge intent"
        );

        self.intents
            .lock()
            .unwrap()
            .insert(intent_id, intent.clone());
        Ok(intent)
    }

    fn retrieve_intent(&self, intent_id: &str) -> ProcessorResult<ChargeIntent> {
        self.check_online()?;

        self.intents
            .lock()
            .unwrap()
            .get(intent_id)
            .cloned()
            .ok_or_else(|| ProcessorError::UnknownIntent(intent_id.to_string()))
    }
}
