//! Infrastructure layer - Storage, credentials and HTTP
//!
//! Adapters for the order, cart and session collaborators, credential issuing
//! and the warp HTTP surface.

pub mod adapters;
pub mod http;

pub use adapters::{
    CartStore, CredentialIssuer, CredentialLedger, FieldCheckoutValidator, InMemoryCartStore,
    InMemoryOrderRepository, OrderRepository, SessionStore,
};
