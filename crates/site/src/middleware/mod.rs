//! HTTP middleware stack for the site.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span with status and latency)
//! 3. Request ID (tag span, Sentry scope and response)
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Body limit for multipart uploads
//! 6. Rate limiting on the auth form posts (governor)
//!
//! Authentication is resolved per handler through the [`Viewer`] and
//! [`RequireAdmin`] extractors.

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{RequireAdmin, Viewer, clear_current_user, set_current_user};
pub use rate_limit::auth_rate_limiter;
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
