//! Owner-scoped operations over one item partition.
//!
//! `ItemRepository<K>` is written once and instantiated per entity kind
//! through the `EntityKind` marker types, so ideas and tasks share every
//! query. All reads and writes by id carry the owner in the `WHERE` clause;
//! a row owned by someone else behaves exactly like a missing row.

use idea_inbox_schemas::{Item, ItemId, ItemKind, ItemStats, OwnerId};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};
use std::marker::PhantomData;
use tracing::{debug, info};

use crate::database::{Database, ITEM_COLUMNS};
use crate::error::{StoreError, StoreResult};
use crate::timezone::{from_storage, to_storage, ReportingZone};

/// How many of the most recent items ordinals can address
pub const ORDINAL_WINDOW: usize = 10;

/// Compile-time selector for an item partition
pub trait EntityKind: Send + Sync + 'static {
    const KIND: ItemKind;
}

#[derive(Debug, Clone, Copy)]
pub struct Ideas;

#[derive(Debug, Clone, Copy)]
pub struct Tasks;

impl EntityKind for Ideas {
    const KIND: ItemKind = ItemKind::Idea;
}

impl EntityKind for Tasks {
    const KIND: ItemKind = ItemKind::Task;
}

pub type IdeaRepository<'a> = ItemRepository<'a, Ideas>;
pub type TaskRepository<'a> = ItemRepository<'a, Tasks>;

pub struct ItemRepository<'a, K: EntityKind> {
    db: &'a Database,
    _kind: PhantomData<K>,
}

impl<'a, K: EntityKind> ItemRepository<'a, K> {
    pub fn new(db: &'a Database) -> Self {
        Self {
            db,
            _kind: PhantomData,
        }
    }

    pub fn kind(&self) -> ItemKind {
        K::KIND
    }

    fn table(&self) -> &'static str {
        K::KIND.table()
    }

    fn zone(&self) -> &ReportingZone {
        self.db.zone()
    }

    /// Insert a new item and return the stored record.
    ///
    /// Content is expected to be validated already. The streak is not
    /// touched here.
    pub fn create(
        &self,
        owner_id: OwnerId,
        content: &str,
        category: Option<&str>,
        tags: &[String],
    ) -> StoreResult<Item> {
        let now = to_storage(&self.zone().now());
        let tags_json = serde_json::to_string(tags)?;

        self.db.conn().execute(
            &format!(
                "INSERT INTO {} (owner_id, content, category, tags, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                self.table()
            ),
            params![owner_id.0, content, category, tags_json, now],
        )?;
        let id = ItemId(self.db.conn().last_insert_rowid());

        let item = self
            .get_by_id(id, owner_id)?
            .ok_or(StoreError::MissingRow {
                table: self.table(),
                id: id.0,
            })?;

        info!("Created {} {} for owner {}", K::KIND, item.id, owner_id);
        Ok(item)
    }

    /// Newest first, ties broken by id, at most `limit` items
    pub fn list_by_owner(&self, owner_id: OwnerId, limit: usize) -> StoreResult<Vec<Item>> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM {}
             WHERE owner_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
            self.table()
        ))?;

        let items = stmt
            .query_map(params![owner_id.0, sql_limit(limit)], |row| self.row_to_item(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// The owner's whole partition, same order as `list_by_owner`
    pub fn list_all(&self, owner_id: OwnerId) -> StoreResult<Vec<Item>> {
        self.list_by_owner(owner_id, usize::MAX)
    }

    /// Every item created on the current calendar day of the reporting zone
    pub fn list_today(&self, owner_id: OwnerId) -> StoreResult<Vec<Item>> {
        let (start, end) = self.today_bounds();
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM {}
             WHERE owner_id = ?1 AND created_at >= ?2 AND created_at < ?3
             ORDER BY created_at DESC, id DESC",
            self.table()
        ))?;

        let items = stmt
            .query_map(params![owner_id.0, start, end], |row| self.row_to_item(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Completed items, newest first
    pub fn list_done(&self, owner_id: OwnerId, limit: usize) -> StoreResult<Vec<Item>> {
        let mut stmt = self.db.conn().prepare(&format!(
            "SELECT {ITEM_COLUMNS}
             FROM {}
             WHERE owner_id = ?1 AND is_done = 1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
            self.table()
        ))?;

        let items = stmt
            .query_map(params![owner_id.0, sql_limit(limit)], |row| self.row_to_item(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(items)
    }

    /// Point lookup scoped to the owner
    pub fn get_by_id(&self, id: ItemId, owner_id: OwnerId) -> StoreResult<Option<Item>> {
        let item = self
            .db
            .conn()
            .query_row(
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM {} WHERE id = ?1 AND owner_id = ?2",
                    self.table()
                ),
                params![id.0, owner_id.0],
                |row| self.row_to_item(row),
            )
            .optional()?;

        Ok(item)
    }

    /// Resolve a 1-based position in the owner's most recent items.
    ///
    /// The window is re-read on every call and includes done items, so an
    /// ordinal only means something relative to the list the user last saw.
    /// Do not hold on to it across mutations.
    pub fn get_by_ordinal(&self, owner_id: OwnerId, n: usize) -> StoreResult<Option<Item>> {
        let recent = self.list_by_owner(owner_id, ORDINAL_WINDOW)?;
        Ok(pick_ordinal(recent, n))
    }

    /// Like `get_by_ordinal`, but counts only the pending items of the window
    pub fn get_pending_by_ordinal(&self, owner_id: OwnerId, n: usize) -> StoreResult<Option<Item>> {
        let pending: Vec<Item> = self
            .list_by_owner(owner_id, ORDINAL_WINDOW)?
            .into_iter()
            .filter(|item| !item.is_done)
            .collect();
        Ok(pick_ordinal(pending, n))
    }

    pub fn mark_done(&self, id: ItemId, owner_id: OwnerId) -> StoreResult<bool> {
        self.set_done(id, owner_id, true)
    }

    pub fn undo(&self, id: ItemId, owner_id: OwnerId) -> StoreResult<bool> {
        self.set_done(id, owner_id, false)
    }

    fn set_done(&self, id: ItemId, owner_id: OwnerId, done: bool) -> StoreResult<bool> {
        let now = to_storage(&self.zone().now());
        let changed = self.db.conn().execute(
            &format!(
                "UPDATE {} SET is_done = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
                self.table()
            ),
            params![done, now, id.0, owner_id.0],
        )?;

        debug!(
            "Set is_done={} on {} {} for owner {}: {} row(s)",
            done, K::KIND, id, owner_id, changed
        );
        Ok(changed > 0)
    }

    /// Replace the content of an item
    pub fn update_content(
        &self,
        id: ItemId,
        owner_id: OwnerId,
        new_content: &str,
    ) -> StoreResult<bool> {
        let now = to_storage(&self.zone().now());
        let changed = self.db.conn().execute(
            &format!(
                "UPDATE {} SET content = ?1, updated_at = ?2 WHERE id = ?3 AND owner_id = ?4",
                self.table()
            ),
            params![new_content, now, id.0, owner_id.0],
        )?;

        if changed > 0 {
            info!("Edited {} {} for owner {}", K::KIND, id, owner_id);
        }
        Ok(changed > 0)
    }

    /// Replace category and tags of an item
    pub fn update_metadata(
        &self,
        id: ItemId,
        owner_id: OwnerId,
        category: Option<&str>,
        tags: &[String],
    ) -> StoreResult<bool> {
        let now = to_storage(&self.zone().now());
        let tags_json = serde_json::to_string(tags)?;
        let changed = self.db.conn().execute(
            &format!(
                "UPDATE {} SET category = ?1, tags = ?2, updated_at = ?3
                 WHERE id = ?4 AND owner_id = ?5",
                self.table()
            ),
            params![category, tags_json, now, id.0, owner_id.0],
        )?;

        Ok(changed > 0)
    }

    /// Totals for one owner, all computed by a single aggregate query
    pub fn stats(&self, owner_id: OwnerId) -> StoreResult<ItemStats> {
        let (start, end) = self.today_bounds();
        let (total, done, today): (i64, i64, i64) = self.db.conn().query_row(
            &format!(
                "SELECT COUNT(*),
                        COALESCE(SUM(CASE WHEN is_done = 1 THEN 1 ELSE 0 END), 0),
                        COALESCE(SUM(CASE WHEN created_at >= ?2 AND created_at < ?3
                                          THEN 1 ELSE 0 END), 0)
                 FROM {}
                 WHERE owner_id = ?1",
                self.table()
            ),
            params![owner_id.0, start, end],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )?;

        Ok(ItemStats::new(total as u64, done as u64, today as u64))
    }

    fn today_bounds(&self) -> (String, String) {
        let zone = self.zone();
        let (start, end) = zone.day_bounds(zone.today());
        (to_storage(&start), to_storage(&end))
    }

    fn row_to_item(&self, row: &Row) -> rusqlite::Result<Item> {
        let tags_json: String = row.get(4)?;
        let tags: Vec<String> = serde_json::from_str(&tags_json).map_err(json_error)?;

        let created_raw: String = row.get(5)?;
        let updated_raw: Option<String> = row.get(6)?;
        let created_at = from_storage(&created_raw, self.zone()).map_err(timestamp_error(5))?;
        let updated_at = match updated_raw {
            Some(raw) => from_storage(&raw, self.zone()).map_err(timestamp_error(6))?,
            None => created_at,
        };

        Ok(Item {
            id: ItemId(row.get(0)?),
            kind: K::KIND,
            owner_id: OwnerId(row.get(1)?),
            content: row.get(2)?,
            category: row.get(3)?,
            tags,
            created_at,
            updated_at,
            is_processed: row.get(7)?,
            is_done: row.get(8)?,
        })
    }
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn pick_ordinal(items: Vec<Item>, n: usize) -> Option<Item> {
    if n == 0 {
        return None;
    }
    items.into_iter().nth(n - 1)
}

fn json_error(err: serde_json::Error) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(err))
}

fn timestamp_error(column: usize) -> impl Fn(StoreError) -> rusqlite::Error {
    move |err| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::NamedTempFile;

    fn open() -> (NamedTempFile, Database) {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path(), ReportingZone::default()).unwrap();
        (temp, db)
    }

    fn insert_at(db: &Database, table: &str, owner: i64, content: &str, at: &str) -> ItemId {
        db.conn()
            .execute(
                &format!(
                    "INSERT INTO {table} (owner_id, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?3)"
                ),
                params![owner, content, at],
            )
            .unwrap();
        ItemId(db.conn().last_insert_rowid())
    }

    #[test]
    fn test_create_and_get_round_trip() {
        let (_temp, db) = open();
        let ideas = IdeaRepository::new(&db);

        let tags = vec!["rust".to_string(), "side-project".to_string()];
        let created = ideas
            .create(OwnerId(12345), "Write a CLI for notes", Some("dev"), &tags)
            .unwrap();

        assert!(created.id.0 > 0);
        assert_eq!(created.kind, ItemKind::Idea);
        assert_eq!(created.category.as_deref(), Some("dev"));
        assert_eq!(created.tags, tags);
        assert!(!created.is_done);
        assert_eq!(created.created_at, created.updated_at);

        let fetched = ideas.get_by_id(created.id, OwnerId(12345)).unwrap();
        assert_eq!(fetched, Some(created));
    }

    #[test]
    fn test_partitions_are_separate() {
        let (_temp, db) = open();
        let ideas = IdeaRepository::new(&db);
        let tasks = TaskRepository::new(&db);

        let idea = ideas.create(OwnerId(1), "An idea", None, &[]).unwrap();
        tasks.create(OwnerId(1), "A task", None, &[]).unwrap();

        assert_eq!(ideas.list_by_owner(OwnerId(1), 10).unwrap().len(), 1);
        assert_eq!(tasks.list_by_owner(OwnerId(1), 10).unwrap().len(), 1);
        // Ids are assigned per partition; the same number names a different row
        let task_view = tasks.get_by_id(idea.id, OwnerId(1)).unwrap().unwrap();
        assert_eq!(task_view.kind, ItemKind::Task);
        assert_eq!(task_view.content, "A task");
    }

    #[test]
    fn test_list_orders_by_created_then_id() {
        let (_temp, db) = open();
        let tasks = TaskRepository::new(&db);

        let same = "2025-02-01T10:00:00.000000Z";
        let a = insert_at(&db, "tasks", 1, "first at noon", same);
        let b = insert_at(&db, "tasks", 1, "second at noon", same);
        let old = insert_at(&db, "tasks", 1, "older", "2025-01-01T10:00:00.000000Z");

        let ids: Vec<ItemId> = tasks
            .list_by_owner(OwnerId(1), 10)
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect();
        assert_eq!(ids, vec![b, a, old]);

        assert_eq!(tasks.list_by_owner(OwnerId(1), 2).unwrap().len(), 2);
        assert!(tasks.list_by_owner(OwnerId(1), 0).unwrap().is_empty());
    }

    #[test]
    fn test_list_today_uses_reporting_day() {
        let (_temp, db) = open();
        let ideas = IdeaRepository::new(&db);
        let zone = *db.zone();

        let (start, _) = zone.day_bounds(zone.today());
        let just_before = to_storage(&(start - Duration::microseconds(1)));
        insert_at(&db, "ideas", 1, "yesterday late", &just_before);
        let today = ideas.create(OwnerId(1), "fresh", None, &[]).unwrap();
        ideas.create(OwnerId(2), "someone else", None, &[]).unwrap();

        let listed = ideas.list_today(OwnerId(1)).unwrap();
        assert_eq!(listed, vec![today]);

        let stats = ideas.stats(OwnerId(1)).unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.today, 1);
    }

    #[test]
    fn test_ordinals_cover_recent_window_only() {
        let (_temp, db) = open();
        let tasks = TaskRepository::new(&db);

        let mut created = Vec::new();
        for i in 0..12 {
            created.push(tasks.create(OwnerId(1), &format!("task {i}"), None, &[]).unwrap());
        }

        let first = tasks.get_by_ordinal(OwnerId(1), 1).unwrap().unwrap();
        assert_eq!(first.id, created[11].id);
        let tenth = tasks.get_by_ordinal(OwnerId(1), 10).unwrap().unwrap();
        assert_eq!(tenth.id, created[2].id);

        assert!(tasks.get_by_ordinal(OwnerId(1), 0).unwrap().is_none());
        assert!(tasks.get_by_ordinal(OwnerId(1), 11).unwrap().is_none());
        assert!(tasks.get_by_ordinal(OwnerId(2), 1).unwrap().is_none());
    }

    #[test]
    fn test_ordinal_keeps_pointing_at_done_items() {
        let (_temp, db) = open();
        let tasks = TaskRepository::new(&db);

        let oldest = tasks.create(OwnerId(1), "oldest", None, &[]).unwrap();
        let middle = tasks.create(OwnerId(1), "middle", None, &[]).unwrap();
        let newest = tasks.create(OwnerId(1), "newest", None, &[]).unwrap();

        assert!(tasks.mark_done(middle.id, OwnerId(1)).unwrap());

        let second = tasks.get_by_ordinal(OwnerId(1), 2).unwrap().unwrap();
        assert_eq!(second.id, middle.id);
        assert!(second.is_done);

        let pending_second = tasks.get_pending_by_ordinal(OwnerId(1), 2).unwrap().unwrap();
        assert_eq!(pending_second.id, oldest.id);
        let pending_first = tasks.get_pending_by_ordinal(OwnerId(1), 1).unwrap().unwrap();
        assert_eq!(pending_first.id, newest.id);
        assert!(tasks.get_pending_by_ordinal(OwnerId(1), 3).unwrap().is_none());
    }

    #[test]
    fn test_mark_done_and_undo() {
        let (_temp, db) = open();
        let tasks = TaskRepository::new(&db);
        let task = tasks.create(OwnerId(7), "Call the plumber", None, &[]).unwrap();

        assert!(tasks.mark_done(task.id, OwnerId(7)).unwrap());
        assert!(tasks.mark_done(task.id, OwnerId(7)).unwrap());
        assert!(tasks.get_by_id(task.id, OwnerId(7)).unwrap().unwrap().is_done);
        assert_eq!(tasks.list_done(OwnerId(7), 10).unwrap().len(), 1);

        assert!(tasks.undo(task.id, OwnerId(7)).unwrap());
        let restored = tasks.get_by_id(task.id, OwnerId(7)).unwrap().unwrap();
        assert!(!restored.is_done);
        assert_eq!(restored.content, "Call the plumber");
        assert!(restored.updated_at >= task.updated_at);

        assert!(!tasks.mark_done(task.id, OwnerId(8)).unwrap());
        assert!(!tasks.undo(ItemId(9999), OwnerId(7)).unwrap());
    }

    #[test]
    fn test_update_content_and_metadata() {
        let (_temp, db) = open();
        let ideas = IdeaRepository::new(&db);
        let idea = ideas.create(OwnerId(3), "draft", None, &[]).unwrap();

        assert!(ideas.update_content(idea.id, OwnerId(3), "final wording").unwrap());
        assert!(!ideas.update_content(idea.id, OwnerId(4), "hijack").unwrap());

        let tags = vec!["writing".to_string()];
        assert!(ideas.update_metadata(idea.id, OwnerId(3), Some("blog"), &tags).unwrap());

        let stored = ideas.get_by_id(idea.id, OwnerId(3)).unwrap().unwrap();
        assert_eq!(stored.content, "final wording");
        assert_eq!(stored.category.as_deref(), Some("blog"));
        assert_eq!(stored.tags, tags);
        assert_eq!(stored.created_at, idea.created_at);
    }

    #[test]
    fn test_stats_counts() {
        let (_temp, db) = open();
        let tasks = TaskRepository::new(&db);

        assert_eq!(tasks.stats(OwnerId(5)).unwrap(), ItemStats::default());

        let a = tasks.create(OwnerId(5), "a", None, &[]).unwrap();
        tasks.create(OwnerId(5), "b", None, &[]).unwrap();
        tasks.create(OwnerId(5), "c", None, &[]).unwrap();
        tasks.create(OwnerId(6), "not mine", None, &[]).unwrap();
        tasks.mark_done(a.id, OwnerId(5)).unwrap();

        let stats = tasks.stats(OwnerId(5)).unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.done, 1);
        assert_eq!(stats.pending, stats.total - stats.done);
        assert_eq!(stats.today, 3);
    }

    #[test]
    fn test_corrupt_tags_surface_as_storage_error() {
        let (_temp, db) = open();
        let ideas = IdeaRepository::new(&db);
        let id = insert_at(&db, "ideas", 1, "bad tags", "2025-01-01T00:00:00.000000Z");
        db.conn()
            .execute("UPDATE ideas SET tags = 'not json' WHERE id = ?1", [id.0])
            .unwrap();

        assert!(matches!(
            ideas.get_by_id(id, OwnerId(1)),
            Err(StoreError::Storage(_))
        ));
    }
}
