//! Core types for Classfete.
//!
//! This module provides type-safe wrappers for the domain concepts shared
//! between the site and the CLI.

pub mod change;
pub mod email;
pub mod id;
pub mod link;
pub mod media;
pub mod password;
pub mod status;

pub use change::{ChangeEvent, ChangeKind, Table};
pub use email::{Email, EmailError};
pub use id::*;
pub use link::normalize_link;
pub use media::{
    DEFAULT_TITLE, MAX_DESCRIPTION_CHARS, MAX_TITLE_CHARS, MAX_UPLOAD_BYTES, MediaKind,
    MediaRejection, TextFieldError, is_video_url, normalize_description, normalize_title,
};
pub use password::{MIN_PASSWORD_CHARS, PasswordError, validate_password};
pub use status::*;
