//! Domain models owned by the site.

pub mod session;

pub use session::{SessionUser, keys as session_keys};
