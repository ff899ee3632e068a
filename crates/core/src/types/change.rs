//! Change-feed vocabulary shared by both backend implementations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend tables the application reads and writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Table {
    #[serde(rename = "gallery_images")]
    GalleryItems,
    #[serde(rename = "hall_of_fame")]
    HallOfFame,
    #[serde(rename = "user_roles")]
    UserRoles,
}

impl Table {
    /// Every table, in a stable order.
    pub const ALL: [Self; 3] = [Self::GalleryItems, Self::HallOfFame, Self::UserRoles];

    /// Table name as used in REST paths.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GalleryItems => "gallery_images",
            Self::HallOfFame => "hall_of_fame",
            Self::UserRoles => "user_roles",
        }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Table {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown table: {s}"))
    }
}

/// Kind of row mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    /// The subscriber missed events and should re-query the whole table.
    Refresh,
}

/// A single change notification.
///
/// `row_id` is `None` for whole-table refreshes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    pub row_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Event for a mutation of one row.
    #[must_use]
    pub fn row(table: Table, kind: ChangeKind, row_id: impl ToString) -> Self {
        Self {
            table,
            kind,
            row_id: Some(row_id.to_string()),
            at: Utc::now(),
        }
    }

    /// Event telling a subscriber to reload `table`.
    #[must_use]
    pub fn refresh(table: Table) -> Self {
        Self {
            table,
            kind: ChangeKind::Refresh,
            row_id: None,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(Table::GalleryItems.as_str(), "gallery_images");
        assert_eq!(Table::HallOfFame.to_string(), "hall_of_fame");
        assert_eq!("user_roles".parse::<Table>().unwrap(), Table::UserRoles);
        assert!("users".parse::<Table>().is_err());
    }

    #[test]
    fn test_table_serde_matches_rest_name() {
        for table in Table::ALL {
            let json = serde_json::to_string(&table).unwrap();
            assert_eq!(json, format!("\"{}\"", table.as_str()));
        }
    }

    #[test]
    fn test_refresh_has_no_row() {
        let event = ChangeEvent::refresh(Table::HallOfFame);
        assert_eq!(event.kind, ChangeKind::Refresh);
        assert!(event.row_id.is_none());

        let event = ChangeEvent::row(Table::GalleryItems, ChangeKind::Insert, 42);
        assert_eq!(event.row_id.as_deref(), Some("42"));
    }
}
