//! Class Fete site library.
//!
//! The site is a server-rendered class reunion page: a hall-of-fame profile
//! grid, a moderated photo/video gallery with uploads, and admin tooling. All
//! data lives in a hosted backend (rows, object storage, email/password auth)
//! reached through the [`backend::Backend`] trait, or in the in-process
//! [`backend::MemoryBackend`] when none is configured.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod backend;
pub mod config;
pub mod error;
pub mod inflight;
pub mod media;
pub mod middleware;
pub mod models;
pub mod realtime;
pub mod routes;
pub mod services;
pub mod state;

pub use routes::app;
pub use state::AppState;
