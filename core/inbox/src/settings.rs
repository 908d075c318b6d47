use idea_inbox_schemas::{OwnerId, UserSettings};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::info;

use crate::database::Database;
use crate::error::{StoreError, StoreResult};
use crate::timezone::{from_storage, to_storage, ReportingZone};

const SETTINGS_COLUMNS: &str =
    "owner_id, digest_time, timezone, streak_count, last_activity, created_at";

/// Defaults applied when a settings record is created lazily
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsDefaults {
    pub digest_time: String,
    pub timezone: String,
}

impl Default for SettingsDefaults {
    fn default() -> Self {
        Self {
            digest_time: idea_inbox_schemas::DEFAULT_DIGEST_TIME.to_string(),
            timezone: idea_inbox_schemas::DEFAULT_TIMEZONE.to_string(),
        }
    }
}

/// Per-owner settings and the activity streak
pub struct SettingsRepository<'a> {
    db: &'a Database,
    defaults: SettingsDefaults,
}

impl<'a> SettingsRepository<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_defaults(db, SettingsDefaults::default())
    }

    pub fn with_defaults(db: &'a Database, defaults: SettingsDefaults) -> Self {
        Self { db, defaults }
    }

    /// Return the owner's settings, creating them on first access
    pub fn get_or_create(&self, owner_id: OwnerId) -> StoreResult<UserSettings> {
        let tx = self.db.transaction()?;
        let settings = self.ensure(&tx, owner_id)?;
        tx.commit()?;
        Ok(settings)
    }

    /// `increment` adds one to the streak, otherwise it is reset to zero.
    /// Either way `last_activity` moves to now.
    pub fn update_streak(&self, owner_id: OwnerId, increment: bool) -> StoreResult<UserSettings> {
        let now = to_storage(&self.zone().now());

        let tx = self.db.transaction()?;
        self.ensure(&tx, owner_id)?;
        let sql = if increment {
            "UPDATE user_settings SET streak_count = streak_count + 1, last_activity = ?1
             WHERE owner_id = ?2"
        } else {
            "UPDATE user_settings SET streak_count = 0, last_activity = ?1
             WHERE owner_id = ?2"
        };
        tx.execute(sql, params![now, owner_id.0])?;
        let settings = self
            .find(&tx, owner_id)?
            .ok_or(StoreError::MissingRow {
                table: "user_settings",
                id: owner_id.0,
            })?;
        tx.commit()?;

        info!(
            "Updated streak for owner {}: {}",
            owner_id, settings.streak_count
        );
        Ok(settings)
    }

    /// Change the digest schedule strings. Both are stored as given.
    pub fn update_digest(
        &self,
        owner_id: OwnerId,
        digest_time: &str,
        timezone: Option<&str>,
    ) -> StoreResult<UserSettings> {
        let tx = self.db.transaction()?;
        let current = self.ensure(&tx, owner_id)?;
        let timezone = timezone.unwrap_or(current.timezone.as_str());
        tx.execute(
            "UPDATE user_settings SET digest_time = ?1, timezone = ?2 WHERE owner_id = ?3",
            params![digest_time, timezone, owner_id.0],
        )?;
        let settings = self
            .find(&tx, owner_id)?
            .ok_or(StoreError::MissingRow {
                table: "user_settings",
                id: owner_id.0,
            })?;
        tx.commit()?;
        Ok(settings)
    }

    fn zone(&self) -> &ReportingZone {
        self.db.zone()
    }

    fn ensure(&self, conn: &Connection, owner_id: OwnerId) -> StoreResult<UserSettings> {
        if let Some(existing) = self.find(conn, owner_id)? {
            return Ok(existing);
        }

        let now = to_storage(&self.zone().now());
        conn.execute(
            "INSERT INTO user_settings (owner_id, digest_time, timezone, streak_count,
                                        last_activity, created_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            params![
                owner_id.0,
                self.defaults.digest_time,
                self.defaults.timezone,
                now
            ],
        )?;
        info!("Created settings for owner {}", owner_id);

        self.find(conn, owner_id)?.ok_or(StoreError::MissingRow {
            table: "user_settings",
            id: owner_id.0,
        })
    }

    fn find(&self, conn: &Connection, owner_id: OwnerId) -> StoreResult<Option<UserSettings>> {
        let settings = conn
            .query_row(
                &format!("SELECT {SETTINGS_COLUMNS} FROM user_settings WHERE owner_id = ?1"),
                params![owner_id.0],
                |row| self.row_to_settings(row),
            )
            .optional()?;
        Ok(settings)
    }

    fn row_to_settings(&self, row: &Row) -> rusqlite::Result<UserSettings> {
        let last_activity: String = row.get(4)?;
        let created_at: String = row.get(5)?;
        let to_sql_error = |column: usize| {
            move |err: StoreError| {
                rusqlite::Error::FromSqlConversionFailure(
                    column,
                    rusqlite::types::Type::Text,
                    Box::new(err),
                )
            }
        };

        Ok(UserSettings {
            owner_id: OwnerId(row.get(0)?),
            digest_time: row.get(1)?,
            timezone: row.get(2)?,
            streak_count: row.get(3)?,
            last_activity: from_storage(&last_activity, self.zone()).map_err(to_sql_error(4))?,
            created_at: from_storage(&created_at, self.zone()).map_err(to_sql_error(5))?,
        })
    }
}
