//! Classfete Core - Shared domain types.
//!
//! This crate provides the vocabulary shared by every Classfete component:
//! - `site` - The public site, upload flow and moderation panel
//! - `cli` - Operator tools for admin roles and hall-of-fame seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. Everything that talks to the hosted backend
//! lives in the `site` crate.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, emails, statuses, media rules and change events

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
