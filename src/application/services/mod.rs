//! Application services - Orchestration of domain logic

pub mod checkout_service;
pub mod discount;
pub mod encryption;
pub mod expiry_scheduler;
pub mod extensions;
pub mod payload_builder;
pub mod temp_orders;

pub use checkout_service::{
    CheckoutCoordinator, CheckoutDependencies, CheckoutFailure, CheckoutParams, CheckoutResult, DeleteResponse,
    FinalizeResponse, ReceiptResponse, SessionResponse,
};
pub use encryption::{KeyWrapper, PayloadSealer};
pub use expiry_scheduler::{ExpiryScheduler, ExpirySweeper, SweepReport};
pub use extensions::CheckoutExtensions;
pub use payload_builder::PayloadBuilder;
pub use temp_orders::{DeleteOutcome, TempOrderLifecycle};
