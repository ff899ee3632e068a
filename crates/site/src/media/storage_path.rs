//! Object storage path naming.
//!
//! Gallery uploads are stored as `{unix_millis}-{random base36}.{ext}` and
//! never overwrite. Profile images are stored as
//! `{profile_id}-{unix_millis}.{ext}` and may overwrite.

use rand::Rng;

use classfete_core::ProfileId;

const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Length of the random suffix in gallery paths.
const SUFFIX_LEN: usize = 11;

/// Extension of a file name, as written.
///
/// Returns `None` when the name has no extension or the extension contains
/// anything but ASCII letters and digits.
#[must_use]
pub fn file_extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_owned())
}

fn with_extension(stem: String, file_name: &str) -> String {
    match file_extension(file_name) {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem,
    }
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..BASE36.len());
            BASE36.get(idx).copied().map_or('0', char::from)
        })
        .collect()
}

/// Path for a new gallery object.
#[must_use]
pub fn gallery_object_path<R: Rng + ?Sized>(file_name: &str, unix_millis: i64, rng: &mut R) -> String {
    with_extension(format!("{unix_millis}-{}", random_suffix(rng)), file_name)
}

/// Path for a replacement profile image.
#[must_use]
pub fn profile_object_path(profile_id: ProfileId, file_name: &str, unix_millis: i64) -> String {
    with_extension(format!("{profile_id}-{unix_millis}"), file_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("photo.JPG").as_deref(), Some("JPG"));
        assert_eq!(file_extension("photo.jpeg").as_deref(), Some("jpeg"));
        assert_eq!(file_extension("clip.final.mp4").as_deref(), Some("mp4"));
        assert_eq!(file_extension("README"), None);
        assert_eq!(file_extension("trailing."), None);
        assert_eq!(file_extension("weird.j?g"), None);
    }

    #[test]
    fn test_gallery_path_shape() {
        let path = gallery_object_path("prom.png", 1_700_000_000_000, &mut rand::rng());
        let (stem, ext) = path.rsplit_once('.').unwrap();
        assert_eq!(ext, "png");

        let (millis, suffix) = stem.split_once('-').unwrap();
        assert_eq!(millis, "1700000000000");
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_gallery_path_keeps_extension_case() {
        let path = gallery_object_path("Photo.JPG", 1, &mut rand::rng());
        assert!(path.starts_with("1-"));
        assert!(path.ends_with(".JPG"));
    }

    #[test]
    fn test_gallery_path_without_extension() {
        let path = gallery_object_path("noext", 42, &mut rand::rng());
        assert!(path.starts_with("42-"));
        assert!(!path.contains('.'));
    }

    #[test]
    fn test_gallery_paths_are_unique() {
        let mut rng = rand::rng();
        let a = gallery_object_path("a.jpg", 1, &mut rng);
        let b = gallery_object_path("a.jpg", 1, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_profile_path_shape() {
        let id = ProfileId::random();
        assert_eq!(
            profile_object_path(id, "me.webp", 99),
            format!("{id}-99.webp")
        );
    }
}
