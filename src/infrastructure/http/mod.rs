//! HTTP infrastructure module
//!
//! Request models, filters, handlers, routes and the server.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod server;
pub mod utils;

pub use models::{ErrorBody, RequestContext, SESSION_COOKIE};
pub use routes::RouteBuilder;
pub use server::HttpServer;
