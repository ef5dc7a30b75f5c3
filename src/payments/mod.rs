//! Payment gateway integration module
//!
//! Types, signatures and the gateway provider used by the checkout backend,
//! plus the amount and payment-method helpers shared with the checkout client.

pub mod amount;
pub mod methods;
pub mod providers;
pub mod signature;
pub mod traits;
pub mod types;

pub use traits::PaymentGateway;
pub use types::PaymentStatus;
