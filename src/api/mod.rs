//! API Module
//!
//! HTTP handlers and routing for the cache server REST API.
//!
//! # Endpoints
//! - `PUT /set`, `GET /get/:key`, `DELETE /del/:key` - Key/value access
//! - `GET /meta/:key` - Row metadata
//! - `POST /purge`, `PUT /lifetime` - Engine maintenance
//! - `GET /namespace`, `POST /namespace/push`, `POST /namespace/pop` - Key hierarchy
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
