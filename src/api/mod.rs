//! API Module
//!
//! HTTP handlers and routing for the export server.
//!
//! # Endpoints
//! - `POST /api/export/:format` - Export a presentation as `html`, `pdf`,
//!   `markdown`, `executive` or `advanced-digest`
//! - `POST /api/export/cache` - Cache statistics, clear and cleanup
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
