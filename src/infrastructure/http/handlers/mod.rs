//! HTTP route handlers module
//!
//! Handlers are grouped by endpoint family.

pub mod checkout;
pub mod health;
pub mod metrics;

pub use checkout::{
    handle_checkout_delete, handle_checkout_finalize, handle_checkout_params, handle_checkout_receipt,
    handle_checkout_session, handle_rejection,
};
pub use health::handle_health_request;
pub use metrics::handle_prometheus_request;
