//! Selfpay Core Library
//!
//! Patient-facing self-pay billing: discount pricing, checkout validation,
//! and reconciliation of external card charges against local state.
//!
//! # Architecture
//!
//! ```text
//! Magic link → Sign-in → Dashboard (services + denial context)
//!                             │
//!              ┌──────────────┴──────────────┐
//!              ▼                             ▼
//!      Update insurance               Select services
//!      (card + history)                      │
//!                                   Checkout validation
//!                            (ownership, unpaid, amount match)
//!                                            │
//!                                  Charge intent created
//!                               (server-computed total only)
//!                                            │
//!                              Client confirms with processor
//!                                            │
//!                          ┌─────────────────▼─────────────────┐
//!                          │          Atomic apply             │
//!                          │  services paid + payment record   │
//!                          │         + audit entry             │
//!                          └─────────────────┬─────────────────┘
//!                                            │
//!                              Signed webhook (async backstop)
//!                               corrects payment status
//! ```
//!
//! # Core Principle
//!
//! **The server's numbers are the binding ones.** Client-claimed totals are
//! verified, never charged; client-reported outcomes are re-fetched from the
//! processor, never trusted.
//!
//! # Modules
//!
//! - [`db`]: SQLite database layer
//! - [`models`]: Domain types (Patient, Service, Payment, etc.)
//! - [`pricing`]: Static self-pay discount table
//! - [`checkout`]: Selection and amount-integrity validation
//! - [`reconcile`]: Payment reconciliation against the external processor
//! - [`insurance`]: Insurance card update workflow
//! - [`dashboard`]: Per-patient dashboard aggregation

pub mod checkout;
pub mod dashboard;
pub mod db;
pub mod insurance;
pub mod models;
pub mod pricing;
pub mod reconcile;

// Re-export commonly used types
pub use checkout::{Checkout, CheckoutError, Quote};
pub use dashboard::{load_dashboard, Dashboard};
pub use db::Database;
pub use insurance::{submit_insurance_update, InsuranceError, InsuranceSubmission};
pub use models::{
    ActionKind, InsuranceCard, InsuranceUpdate, InsuranceUpdateKind, MagicLink, Patient,
    PatientAction, Payment, PaymentStatus, Service,
};
pub use reconcile::{Confirmation, IntentReceipt, ReconcileError, Reconciler};

// The processor boundary lives in its own crate; re-export the pieces callers
// need to wire a reconciler.
pub use selfpay_gateway::{
    ChargeIntent, ChargeStatus, InMemoryProcessor, IntentMetadata, PaymentProcessor,
    ProcessorError, WebhookEvent, WebhookEventKind, WebhookVerifier,
};
