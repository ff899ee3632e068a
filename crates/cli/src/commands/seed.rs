//! Seed the hall of fame from a YAML file.
//!
//! ```yaml
//! - name: Nguyen Van An
//!   position: 1
//!   social_link_1: facebook.com/an
//! - name: Tran Thi Binh
//!   position: 2
//!   image_url: https://cdn.example.com/binh.jpg
//! ```
//!
//! Profiles whose name already exists are skipped, so the command can be run
//! again after editing the file.

use std::collections::HashSet;
use std::path::Path;

use classfete_core::normalize_link;
use classfete_site::backend::{Backend, NewProfile};

use super::CliError;

/// Outcome of a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parse and check seed entries.
///
/// # Errors
///
/// Returns [`CliError::Invalid`] for blank names or duplicate positions.
pub fn parse_profiles(yaml: &str) -> Result<Vec<NewProfile>, CliError> {
    let profiles: Vec<NewProfile> = serde_yaml::from_str(yaml)?;

    let mut positions = HashSet::new();
    let mut errors = Vec::new();
    for (i, profile) in profiles.iter().enumerate() {
        if profile.name.trim().is_empty() {
            errors.push(format!("entry {}: name is empty", i + 1));
        }
        if !positions.insert(profile.position) {
            errors.push(format!("entry {}: position {} is used twice", i + 1, profile.position));
        }
    }
    if !errors.is_empty() {
        return Err(CliError::Invalid(errors.join("; ")));
    }

    Ok(profiles
        .into_iter()
        .map(|p| NewProfile {
            name: p.name.trim().to_owned(),
            social_link_1: p.social_link_1.as_deref().and_then(normalize_link),
            social_link_2: p.social_link_2.as_deref().and_then(normalize_link),
            ..p
        })
        .collect())
}

/// Insert every profile not yet present by name.
///
/// # Errors
///
/// Returns an error if listing or inserting fails.
pub async fn seed_profiles<B: Backend>(
    backend: &B,
    profiles: Vec<NewProfile>,
) -> Result<SeedReport, CliError> {
    let existing: HashSet<String> = backend
        .list_profiles()
        .await?
        .into_iter()
        .map(|p| p.name.to_lowercase())
        .collect();

    let mut report = SeedReport::default();
    for profile in profiles {
        if existing.contains(&profile.name.to_lowercase()) {
            tracing::debug!(name = %profile.name, "profile exists, skipping");
            report.skipped += 1;
            continue;
        }
        let created = backend.insert_profile(profile).await?;
        tracing::info!(id = %created.id, name = %created.name, "profile created");
        report.inserted += 1;
    }
    Ok(report)
}

/// Seed from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or a backend call
/// fails.
pub async fn hall_of_fame<B: Backend>(backend: &B, file_path: &Path) -> Result<SeedReport, CliError> {
    let content = tokio::fs::read_to_string(file_path)
        .await
        .map_err(|source| CliError::Read {
            path: file_path.display().to_string(),
            source,
        })?;
    let profiles = parse_profiles(&content)?;
    tracing::info!(count = profiles.len(), path = %file_path.display(), "seed file parsed");

    let report = seed_profiles(backend, profiles).await?;
    tracing::info!(
        inserted = report.inserted,
        skipped = report.skipped,
        "seeding complete"
    );
    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use classfete_site::backend::MemoryBackend;

    use super::*;

    const SEED: &str = "
- name: ' An '
  position: 1
  social_link_1: facebook.com/an
- name: Binh
  position: 2
";

    #[test]
    fn test_parse_normalizes() {
        let profiles = parse_profiles(SEED).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].name, "An");
        assert_eq!(profiles[0].social_link_1.as_deref(), Some("https://facebook.com/an"));
        assert_eq!(profiles[1].image_url, None);
    }

    #[test]
    fn test_parse_rejects_duplicates_and_blanks() {
        let yaml = "
- name: ''
  position: 1
- name: B
  position: 1
";
        let Err(CliError::Invalid(message)) = parse_profiles(yaml) else {
            panic!("expected validation error");
        };
        assert!(message.contains("name is empty"));
        assert!(message.contains("position 1 is used twice"));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let backend = MemoryBackend::new("http://localhost:3000", "gallery-images");

        let first = seed_profiles(&backend, parse_profiles(SEED).unwrap()).await.unwrap();
        assert_eq!(first, SeedReport { inserted: 2, skipped: 0 });

        let second = seed_profiles(&backend, parse_profiles(SEED).unwrap()).await.unwrap();
        assert_eq!(second, SeedReport { inserted: 0, skipped: 2 });

        let names: Vec<String> = backend
            .list_profiles()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["An", "Binh"]);
    }
}
