//! Media validation rules for gallery uploads and profile images.
//!
//! These checks run before any network call. A rejected file is reported on
//! its own and never reaches object storage.

use serde::{Deserialize, Serialize};

/// Largest accepted upload, inclusive (25 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Maximum title length in characters.
pub const MAX_TITLE_CHARS: usize = 100;

/// Maximum description length in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 500;

/// Title stored when the uploader leaves it blank.
pub const DEFAULT_TITLE: &str = "none";

/// Broad class of an uploaded file, derived from its media type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a media type such as `image/png` or `video/mp4`.
    #[must_use]
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        let content_type = content_type.trim().to_ascii_lowercase();
        if content_type.starts_with("image/") {
            Some(Self::Image)
        } else if content_type.starts_with("video/") {
            Some(Self::Video)
        } else {
            None
        }
    }

    /// Validate a gallery upload: image or video, at most [`MAX_UPLOAD_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns the [`MediaRejection`] describing why the file was refused.
    pub fn validate_upload(content_type: &str, size: u64) -> Result<Self, MediaRejection> {
        let kind = Self::from_content_type(content_type).ok_or_else(|| {
            MediaRejection::UnsupportedType {
                content_type: content_type.to_owned(),
            }
        })?;
        check_size(size)?;
        Ok(kind)
    }

    /// Validate a profile image: images only, at most [`MAX_UPLOAD_BYTES`].
    ///
    /// # Errors
    ///
    /// Returns [`MediaRejection::NotAnImage`] for anything but `image/*`.
    pub fn validate_profile_image(content_type: &str, size: u64) -> Result<(), MediaRejection> {
        match Self::from_content_type(content_type) {
            Some(Self::Image) => check_size(size),
            _ => Err(MediaRejection::NotAnImage {
                content_type: content_type.to_owned(),
            }),
        }
    }
}

const fn check_size(size: u64) -> Result<(), MediaRejection> {
    if size > MAX_UPLOAD_BYTES {
        return Err(MediaRejection::TooLarge {
            size,
            max: MAX_UPLOAD_BYTES,
        });
    }
    Ok(())
}

/// Why a single file was refused.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MediaRejection {
    #[error("unsupported file type `{content_type}`: only images and videos are accepted")]
    UnsupportedType { content_type: String },

    #[error("file type `{content_type}` is not an image")]
    NotAnImage { content_type: String },

    #[error("file is {size} bytes, the limit is {max} bytes (25 MB)")]
    TooLarge { size: u64, max: u64 },
}

/// Title or description input that is too long.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TextFieldError {
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },

    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
}

/// Trim a title, substituting [`DEFAULT_TITLE`] when blank.
///
/// # Errors
///
/// Returns [`TextFieldError::TitleTooLong`] past [`MAX_TITLE_CHARS`].
pub fn normalize_title(input: Option<&str>) -> Result<String, TextFieldError> {
    let trimmed = input.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(DEFAULT_TITLE.to_owned());
    }
    if trimmed.chars().count() > MAX_TITLE_CHARS {
        return Err(TextFieldError::TitleTooLong {
            max: MAX_TITLE_CHARS,
        });
    }
    Ok(trimmed.to_owned())
}

/// Trim a description; blank means absent.
///
/// # Errors
///
/// Returns [`TextFieldError::DescriptionTooLong`] past [`MAX_DESCRIPTION_CHARS`].
pub fn normalize_description(input: Option<&str>) -> Result<Option<String>, TextFieldError> {
    let trimmed = input.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(TextFieldError::DescriptionTooLong {
            max: MAX_DESCRIPTION_CHARS,
        });
    }
    Ok(Some(trimmed.to_owned()))
}

/// Whether a stored media URL points at a video (by extension).
#[must_use]
pub fn is_video_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    matches!(ext.to_ascii_lowercase().as_str(), "mp4" | "webm" | "ogg")
}
