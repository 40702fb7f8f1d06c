//! Infrastructure adapters module
//!
//! Storage and credential adapters behind the checkout coordinator.

pub mod cart_store;
pub mod checkout_validator;
pub mod credential_issuer;
pub mod credential_ledger;
pub mod order_store;
pub mod session_store;

pub use cart_store::{CartStore, InMemoryCartStore};
pub use checkout_validator::FieldCheckoutValidator;
pub use credential_issuer::{CredentialClaims, CredentialIssuer, CredentialScope, IssuedCredential};
pub use credential_ledger::CredentialLedger;
pub use order_store::{InMemoryOrderRepository, OrderRepository};
pub use session_store::SessionStore;
