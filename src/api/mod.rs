//! HTTP surface of the service.
pub mod handlers;
pub mod routes;
