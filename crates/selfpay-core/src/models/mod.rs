//! Domain models for the selfpay billing system.

mod audit;
mod insurance;
mod magic_link;
mod patient;
mod payment;
mod service;

pub use audit::*;
pub use insurance::*;
pub use magic_link::*;
pub use patient::*;
pub use payment::*;
pub use service::*;
