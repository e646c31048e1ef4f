//! Card-processor boundary for the selfpay billing system.
//!
//! The core library never talks to the card network directly; everything goes
//! through the [`PaymentProcessor`] trait defined here. The processor owns the
//! authoritative transaction state, and the billing core reconciles against it.
//!
//! # Modules
//!
//! - [`intent`]: charge-intent types shared with the billing core
//! - [`processor`]: the `PaymentProcessor` trait and an in-memory implementation
//! - [`webhook`]: signed asynchronous notification parsing and verification

pub mod intent;
pub mod processor;
pub mod webhook;

pub use intent::{ChargeIntent, ChargeStatus, IntentMetadata};
pub use processor::{InMemoryProcessor, PaymentProcessor, ProcessorError, ProcessorResult};
pub use webhook::{WebhookError, WebhookEvent, WebhookEventKind, WebhookVerifier};
