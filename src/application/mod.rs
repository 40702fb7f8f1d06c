//! Application layer - Checkout services
//!
//! This module contains the services that orchestrate the checkout domain:
//! the coordinator, the temp order lifecycle, payload building and sealing,
//! and the expiry sweep.

pub mod services;

pub use services::*;
