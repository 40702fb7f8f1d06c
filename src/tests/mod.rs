//! In-crate test suite
//!
//! - `fixtures`: carts, forms, configuration and a wired coordinator
//! - `unit`: lifecycle, credential and sweep behaviour through the coordinator
//! - `integration`: warp round trips and the storefront flow controller

mod integration;
mod unit;
