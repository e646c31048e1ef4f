//! Payment reconciliation.
//!
//! Coordinates external charge confirmation with local state. The external
//! processor is the authority on whether money moved; this module's job is to
//! make the local bookkeeping catch up exactly once:
//!
//! - **Initiated**: a charge intent is created for the server-computed total,
//!   tagged with the patient and resolved service IDs as metadata.
//! - **Confirmed (client path)**: the client reports success; the server
//!   re-fetches the intent and verifies status and metadata instead of
//!   trusting the report.
//! - **Applied**: services flip to paid, a payment record is inserted, and an
//!   audit entry is appended, all in one transaction.
//! - **Confirmed (async path)**: the processor's signed webhook corrects the
//!   payment record status when the client path was interrupted.

use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};

use selfpay_gateway::{
    ChargeStatus, IntentMetadata, PaymentProcessor, ProcessorError, WebhookError, WebhookEvent,
    WebhookEventKind, WebhookVerifier,
};

use crate::checkout::{Checkout, CheckoutError};
use crate::db::{self, Database, DbError, DbResult};
use crate::models::{ActionKind, PatientAction, Payment, PaymentStatus};
use crate::pricing;

/// Currency all charges are denominated in.
pub const CURRENCY: &str = "usd";

/// Reconciliation errors.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Processor error: {0}")]
    Processor(#[from] ProcessorError),

    #[error("Charge intent {intent_id} is not completed (status: {status})")]
    ChargeNotCompleted { intent_id: String, status: String },

    #[error("Charge intent {intent_id} does not belong to the authenticated patient")]
    Unauthorized { intent_id: String },

    #[error("State update failed after successful charge: {0}")]
    Persistence(#[source] DbError),

    #[error("Webhook rejected: {0}")]
    Webhook(#[from] WebhookError),
}

impl ReconcileError {
    /// Whether the caller may safely retry the same call.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ReconcileError::Processor(_) | ReconcileError::Persistence(_) | ReconcileError::Db(_)
        )
    }

    /// True when the external charge already succeeded and only local
    /// bookkeeping is pending. Callers must not present this to the patient
    /// as a failed payment; re-confirmation or the webhook backstop will
    /// finish the job.
    pub fn charge_already_succeeded(&self) -> bool {
        matches!(self, ReconcileError::Persistence(_))
    }
}

pub type ReconcileResult<T> = Result<T, ReconcileError>;

/// Outcome of creating a charge intent.
#[derive(Debug, Clone)]
pub struct IntentReceipt {
    /// Processor intent identifier.
    pub intent_id: String,
    /// Secret the client needs to confirm the charge.
    pub client_secret: Option<String>,
    /// Authoritative amount the intent was created for, in cents.
    pub amount_cents: i64,
    /// Number of services the intent covers.
    pub service_count: usize,
}

/// Outcome of a confirmation.
#[derive(Debug, Clone)]
pub struct Confirmation {
    /// Processor intent identifier.
    pub intent_id: String,
    /// Services flipped to paid by this call (zero on an idempotent replay).
    pub services_updated: usize,
    /// Amount the processor settled, in cents.
    pub amount_cents: i64,
    /// Whether this confirmation had already been applied.
    pub already_applied: bool,
}

/// Payment reconciler.
pub struct Reconciler<'a, P: PaymentProcessor> {
    db: &'a mut Database,
    processor: &'a P,
}

impl<'a, P: PaymentProcessor> Reconciler<'a, P> {
    /// Create a new reconciler.
    pub fn new(db: &'a mut Database, processor: &'a P) -> Self {
        Self { db, processor }
    }

    /// Create a charge intent for a validated selection.
    ///
    /// The claimed total is checked against the server-computed quote; the
    /// intent is created for the quote's total, never the claim.
    pub fn create_intent(
        &mut self,
        patient_id: &str,
        requested_ids: &[String],
        claimed_cents: i64,
    ) -> ReconcileResult<IntentReceipt> {
        let quote = Checkout::new(self.db).quote_for_payment(patient_id, requested_ids, claimed_cents)?;
        let service_ids = quote.service_ids();

        let intent = self.processor.create_intent(
            quote.expected_total_cents,
            CURRENCY,
            IntentMetadata {
                patient_id: patient_id.to_string(),
                service_ids: service_ids.clone(),
            },
        )?;

        let details = json!({
            "description": format!(
                "Created payment intent for {} services totaling ${}",
                service_ids.len(),
                pricing::format_usd(intent.amount_cents)
            ),
            "intent_id": intent.intent_id,
            "service_ids": service_ids,
            "amount_cents": intent.amount_cents,
        })
        .to_string();
        self.db.append_action(&PatientAction::new(
            patient_id.to_string(),
            ActionKind::PaymentIntentCreated,
            Some(details),
        ))?;

        info!(
            patient_id,
            intent_id = %intent.intent_id,
            amount_cents = intent.amount_cents,
            services = service_ids.len(),
            "created charge intent"
        );

        Ok(IntentReceipt {
            intent_id: intent.intent_id,
            client_secret: intent.client_secret,
            amount_cents: intent.amount_cents,
            service_count: service_ids.len(),
        })
    }

    /// Confirm a charge the client reports as completed.
    ///
    /// The intent is re-fetched from the processor and verified (status
    /// succeeded, metadata patient matches the authenticated patient) before
    /// any local state moves. Re-confirmation of an already-applied intent is
    /// a no-op that returns the original success result.
    pub fn confirm(
        &mut self,
        patient_id: &str,
        intent_id: &str,
        requested_ids: &[String],
    ) -> ReconcileResult<Confirmation> {
        let intent = self.processor.retrieve_intent(intent_id)?;

        if intent.status != ChargeStatus::Succeeded {
            return Err(ReconcileError::ChargeNotCompleted {
                intent_id: intent_id.to_string(),
                status: intent.status.as_str().to_string(),
            });
        }

        if intent.metadata.patient_id != patient_id {
            warn!(
                intent_id,
                claimed_by = patient_id,
                owned_by = %intent.metadata.patient_id,
                "confirmation for an intent owned by another patient"
            );
            return Err(ReconcileError::Unauthorized {
                intent_id: intent_id.to_string(),
            });
        }

        // Replay of an applied confirmation.
        if let Some(existing) = self
            .db
            .get_payment_by_intent_id(intent_id)
            .map_err(ReconcileError::Persistence)?
        {
            return Ok(Confirmation {
                intent_id: intent_id.to_string(),
                services_updated: 0,
                amount_cents: existing.amount_cents,
                already_applied: true,
            });
        }

        let quote = match Checkout::new(self.db).resolve_selection(patient_id, requested_ids) {
            Ok(quote) => quote,
            Err(CheckoutError::EmptySelection)
                if self.all_requested_already_paid(patient_id, requested_ids)? =>
            {
                return Ok(Confirmation {
                    intent_id: intent_id.to_string(),
                    services_updated: 0,
                    amount_cents: intent.amount_cents,
                    already_applied: true,
                });
            }
            Err(err) => return Err(err.into()),
        };

        let service_ids = quote.service_ids();
        let payment = Payment::new(
            patient_id.to_string(),
            intent_id.to_string(),
            intent.amount_cents,
            intent.currency.clone(),
            PaymentStatus::Succeeded,
            service_ids.clone(),
        );
        let details = json!({
            "description": format!("Successfully paid for {} services", service_ids.len()),
            "intent_id": intent_id,
            "service_ids": service_ids,
            "amount_cents": intent.amount_cents,
            "service_names": quote.services.iter().map(|s| s.service_name.clone()).collect::<Vec<_>>(),
        })
        .to_string();
        let action = PatientAction::new(
            patient_id.to_string(),
            ActionKind::PaymentCompleted,
            Some(details),
        );

        let services_updated = match self.apply(&service_ids, &payment, &action) {
            Ok(updated) => updated,
            Err(err) if err.is_unique_violation() => {
                // A racing confirmation inserted the payment first.
                return Ok(Confirmation {
                    intent_id: intent_id.to_string(),
                    services_updated: 0,
                    amount_cents: intent.amount_cents,
                    already_applied: true,
                });
            }
            Err(err) => {
                error!(
                    intent_id,
                    service_ids = ?service_ids,
                    amount_cents = intent.amount_cents,
                    error = %err,
                    "atomic apply failed after successful charge"
                );
                return Err(ReconcileError::Persistence(err));
            }
        };

        info!(
            patient_id,
            intent_id,
            services_updated,
            amount_cents = intent.amount_cents,
            "payment applied"
        );

        Ok(Confirmation {
            intent_id: intent_id.to_string(),
            services_updated,
            amount_cents: intent.amount_cents,
            already_applied: false,
        })
    }

    /// Apply the paid-state transition, payment record, and audit entry as a
    /// single atomic unit.
    fn apply(
        &mut self,
        service_ids: &[String],
        payment: &Payment,
        action: &PatientAction,
    ) -> DbResult<usize> {
        let tx = self.db.transaction()?;
        let updated = db::mark_services_paid_in(&tx, service_ids)?;
        db::insert_payment_in(&tx, payment)?;
        db::append_action_in(&tx, action)?;
        tx.commit()?;
        Ok(updated)
    }

    /// Whether every requested service the patient owns is already paid.
    /// Used to treat a stale re-confirmation as an idempotent no-op.
    fn all_requested_already_paid(
        &self,
        patient_id: &str,
        requested_ids: &[String],
    ) -> ReconcileResult<bool> {
        let owned = self
            .db
            .list_services_by_patient(patient_id)
            .map_err(ReconcileError::Persistence)?;
        let requested: Vec<_> = owned
            .iter()
            .filter(|s| requested_ids.contains(&s.id))
            .collect();
        Ok(!requested.is_empty() && requested.iter().all(|s| s.is_paid))
    }

    /// Apply a verified asynchronous notification.
    ///
    /// Corrects the payment record status keyed by the processor intent ID.
    /// This path never re-runs the service-paid transition; it exists to fix
    /// bookkeeping when the client path was interrupted after the charge
    /// settled. Repeated delivery of the same event is harmless.
    ///
    /// Returns whether a payment record was updated.
    pub fn apply_webhook(&mut self, event: &WebhookEvent) -> ReconcileResult<bool> {
        let status = match event.kind {
            WebhookEventKind::PaymentSucceeded => PaymentStatus::Succeeded,
            WebhookEventKind::PaymentFailed => PaymentStatus::Failed,
        };

        let updated = self
            .db
            .update_payment_status_by_intent_id(&event.intent_id, status)
            .map_err(ReconcileError::Persistence)?;

        match &event.patient_id {
            Some(patient_id) => {
                let details = json!({
                    "description": match event.kind {
                        WebhookEventKind::PaymentSucceeded => "Payment succeeded webhook received",
                        WebhookEventKind::PaymentFailed => "Payment failed webhook received",
                    },
                    "intent_id": event.intent_id,
                    "amount_cents": event.amount_cents,
                    "failure_message": event.failure_message,
                })
                .to_string();
                self.db
                    .append_action(&PatientAction::new(
                        patient_id.clone(),
                        ActionKind::PaymentWebhookReceived,
                        Some(details),
                    ))
                    .map_err(ReconcileError::Persistence)?;
            }
            None => {
                warn!(intent_id = %event.intent_id, "webhook event has no patient ID; skipping audit entry");
            }
        }

        info!(
            intent_id = %event.intent_id,
            status = status.as_str(),
            payment_updated = updated,
            "processed webhook event"
        );

        Ok(updated)
    }

    /// Verify a raw webhook delivery and apply it.
    ///
    /// Rejects unverifiable deliveries before any state is touched.
    pub fn apply_signed_webhook(
        &mut self,
        verifier: &WebhookVerifier,
        payload: &str,
        signature_header: Option<&str>,
        now_epoch_secs: i64,
    ) -> ReconcileResult<WebhookEvent> {
        let event = verifier.verify_and_parse(payload, signature_header, now_epoch_secs)?;
        self.apply_webhook(&event)?;
        Ok(event)
    }
}
