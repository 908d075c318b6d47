use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// ID Types
// ============================================================================

/// Chat-transport user identifier. Scopes every read and write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OwnerId(pub i64);

/// Row identifier, unique within one item partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Item Schema
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    #[serde(rename = "idea")]
    Idea,
    #[serde(rename = "task")]
    Task,
}

impl ItemKind {
    pub const ALL: [ItemKind; 2] = [ItemKind::Idea, ItemKind::Task];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Idea => "idea",
            ItemKind::Task => "task",
        }
    }

    /// Storage partition holding items of this kind
    pub fn table(&self) -> &'static str {
        match self {
            ItemKind::Idea => "ideas",
            ItemKind::Task => "tasks",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "idea" | "ideas" => Some(ItemKind::Idea),
            "task" | "tasks" => Some(ItemKind::Task),
            _ => None,
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored idea or task. Both kinds share this shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ItemKind,
    pub owner_id: OwnerId,
    pub content: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
    pub is_processed: bool,
    pub is_done: bool,
}

impl Item {
    /// First `max_chars` characters of the content, with an ellipsis when cut
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{}...", head)
        } else {
            head
        }
    }
}

/// Per-owner counters for one item kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemStats {
    pub total: u64,
    pub done: u64,
    pub pending: u64,
    pub today: u64,
}

impl ItemStats {
    pub fn new(total: u64, done: u64, today: u64) -> Self {
        Self {
            total,
            done,
            pending: total.saturating_sub(done),
            today,
        }
    }
}

// ============================================================================
// User Settings Schema
// ============================================================================

pub const DEFAULT_DIGEST_TIME: &str = "08:00";
pub const DEFAULT_TIMEZONE: &str = "Europe/Moscow";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSettings {
    pub owner_id: OwnerId,
    pub digest_time: String, // HH:MM
    pub timezone: String,
    pub streak_count: u32,
    pub last_activity: DateTime<FixedOffset>,
    pub created_at: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_item(content: &str) -> Item {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let at = tz.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap();
        Item {
            id: ItemId(7),
            kind: ItemKind::Task,
            owner_id: OwnerId(12345),
            content: content.to_string(),
            category: Some("home".into()),
            tags: vec!["errand".into()],
            created_at: at,
            updated_at: at,
            is_processed: false,
            is_done: false,
        }
    }

    #[test]
    fn test_kind_tables_and_parsing() {
        assert_eq!(ItemKind::Idea.table(), "ideas");
        assert_eq!(ItemKind::Task.table(), "tasks");
        assert_eq!(ItemKind::parse("Tasks"), Some(ItemKind::Task));
        assert_eq!(ItemKind::parse(" idea "), Some(ItemKind::Idea));
        assert_eq!(ItemKind::parse("note"), None);
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let item = sample_item("Купить молоко и хлеб");
        assert_eq!(item.preview(6), "Купить...");
        assert_eq!(item.preview(100), "Купить молоко и хлеб");
    }

    #[test]
    fn test_stats_pending_is_derived() {
        let stats = ItemStats::new(5, 2, 1);
        assert_eq!(stats.pending, 3);
        assert_eq!(ItemStats::new(0, 0, 0), ItemStats::default());
    }

    #[test]
    fn test_item_serialization() {
        let item = sample_item("Write the release notes");
        let json = serde_json::to_string(&item).unwrap();
        assert!(json.contains("\"kind\":\"task\""));

        let restored: Item = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, item);
    }
}
