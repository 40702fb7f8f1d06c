//! Storefront-side checkout client
//!
//! [`CheckoutFlowController`] sequences the checkout endpoints around the hosted
//! payment widget. [`HttpCheckoutApi`] is the bundled transport.

pub mod flow;
pub mod http_api;
pub mod models;

pub use flow::{CheckoutApi, CheckoutFlowController, CheckoutUi, FlowState, PaymentWidget, PopupTimer};
pub use http_api::HttpCheckoutApi;
pub use models::{ClientError, ClientResult, WidgetSession};
