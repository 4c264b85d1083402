//! HTTP API Handlers and Routes
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! - `POST /chat` - Answer a question, optionally from a caller-supplied passage
//! - `GET /health` - Health check endpoint
//!
//! Pipeline failures are answered with `200 OK` and a fixed message in
//! `answer`; only malformed requests are rejected.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

pub use routes::create_router;
