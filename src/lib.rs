//! Payment confirmation for the EduSmart checkout
//!
//! A merchant checkout backend that talks to an Antom-style payment gateway,
//! verifies signed payment notifications and tracks payment requests, plus
//! the client-side flow that redirects the buyer and polls for the outcome.

pub mod api;
pub mod checkout;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod payments;
