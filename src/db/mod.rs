pub mod queries;
pub mod value_type;

pub use value_type::ValueType;

use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, ToSql, params};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub id: i64,
    pub name: String,
    pub value_type: ValueType,
}

/// A log entry joined with the name and type of its activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntryRow {
    pub id: i64,
    pub activity_id: i64,
    pub date: String,
    pub value: Option<String>,
    pub activity_name: String,
    pub value_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub date: String,
    pub activity_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Activity with name '{0}' already exists")]
    DuplicateName(String),
    #[error("Unknown activity: {0}")]
    MissingActivity(i64),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// One connection per handle. Callers open a handle per operation and drop it afterwards.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite DB: {}", path.display()))?;
        conn.execute_batch(queries::PRAGMA_FOREIGN_KEYS)
            .context("Failed to enable foreign keys")?;

        let database = Self { conn };
        database.init_schema()?;

        Ok(database)
    }

    pub fn init_schema(&self) -> Result<()> {
        queries::schema_statements()
            .iter()
            .try_for_each(|statement| {
                self.conn
                    .execute(statement, [])
                    .context("Failed to initialize schema")
                    .map(|_| ())
            })
    }

    pub fn create_activity(&self, name: &str, value_type: ValueType) -> Result<i64, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO activities (name, value_type) VALUES (?1, ?2)",
            params![name, value_type],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
            {
                Err(StoreError::DuplicateName(name.to_string()))
            }
            Err(error) => Err(anyhow::Error::new(error)
                .context("Failed to insert activity")
                .into()),
        }
    }

    pub fn list_activities(&self) -> Result<Vec<Activity>> {
        let mut statement = self
            .conn
            .prepare("SELECT id, name, value_type FROM activities ORDER BY name ASC, id ASC")?;

        let rows = statement
            .query_map([], map_activity)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query activities")?;

        Ok(rows)
    }

    pub fn activity(&self, id: i64) -> Result<Option<Activity>> {
        self.conn
            .query_row(
                "SELECT id, name, value_type FROM activities WHERE id = ?1",
                params![id],
                map_activity,
            )
            .optional()
            .with_context(|| format!("Failed to query activity {id}"))
    }

    /// Deletes the activity and, through the foreign key cascade, all of its log entries.
    pub fn delete_activity(&self, id: i64) -> Result<usize> {
        self.conn
            .execute("DELETE FROM activities WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete activity {id}"))
    }

    pub fn create_log_entry(
        &self,
        activity_id: i64,
        date: &str,
        value: Option<&str>,
    ) -> Result<i64, StoreError> {
        let inserted = self.conn.execute(
            "INSERT INTO activity_logs (activity_id, date, value) VALUES (?1, ?2, ?3)",
            params![activity_id, date, value],
        );

        match inserted {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(failure, _))
                if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY =>
            {
                Err(StoreError::MissingActivity(activity_id))
            }
            Err(error) => Err(anyhow::Error::new(error)
                .context("Failed to insert log entry")
                .into()),
        }
    }

    /// Dates are stored as zero-padded `YYYY-MM-DD`, so a prefix match selects exactly one month.
    pub fn log_entries_for_month(
        &self,
        year: i32,
        month: u32,
        activity_ids: &[i64],
    ) -> Result<Vec<LogEntryRow>> {
        let mut sql = format!("{} WHERE l.date LIKE ?1", queries::SELECT_LOG_ENTRY_COLUMNS);
        if !activity_ids.is_empty() {
            sql.push_str(&format!(
                " AND l.activity_id IN ({})",
                queries::placeholders(1, activity_ids.len())
            ));
        }
        sql.push_str(" ORDER BY l.date ASC, l.id ASC");

        let pattern = queries::month_prefix_pattern(year, month);
        let mut bound: Vec<&dyn ToSql> = vec![&pattern as &dyn ToSql];
        bound.extend(activity_ids.iter().map(|id| id as &dyn ToSql));

        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement
            .query_map(bound.as_slice(), map_log_entry)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query log entries for month")?;

        Ok(rows)
    }

    pub fn log_entries_for_day(&self, date: &str) -> Result<Vec<LogEntryRow>> {
        let sql = format!(
            "{} WHERE l.date = ?1 ORDER BY l.id ASC",
            queries::SELECT_LOG_ENTRY_COLUMNS
        );

        let mut statement = self.conn.prepare(&sql)?;
        let rows = statement
            .query_map(params![date], map_log_entry)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query log entries for day")?;

        Ok(rows)
    }

    pub fn delete_log_entry(&self, id: i64) -> Result<usize> {
        self.conn
            .execute("DELETE FROM activity_logs WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete log entry {id}"))
    }

    pub fn export_all(&self) -> Result<Vec<ExportRecord>> {
        let mut statement = self.conn.prepare(
            "SELECT l.date, a.name, l.value
             FROM activity_logs l
             JOIN activities a ON a.id = l.activity_id
             ORDER BY l.date ASC, l.id ASC",
        )?;

        let rows = statement
            .query_map([], |row| {
                Ok(ExportRecord {
                    date: row.get(0)?,
                    activity_name: row.get(1)?,
                    value: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query export data")?;

        Ok(rows)
    }

    pub fn count_activities(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM activities", [], |row| row.get(0))
            .context("Failed to count activities")
    }

    pub fn count_log_entries(&self) -> Result<i64> {
        self.conn
            .query_row("SELECT COUNT(*) FROM activity_logs", [], |row| row.get(0))
            .context("Failed to count log entries")
    }
}

fn map_activity(row: &Row<'_>) -> rusqlite::Result<Activity> {
    Ok(Activity {
        id: row.get(0)?,
        name: row.get(1)?,
        value_type: row.get(2)?,
    })
}

fn map_log_entry(row: &Row<'_>) -> rusqlite::Result<LogEntryRow> {
    Ok(LogEntryRow {
        id: row.get(0)?,
        activity_id: row.get(1)?,
        date: row.get(2)?,
        value: row.get(3)?,
        activity_name: row.get(4)?,
        value_type: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_temp() -> (TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let database = Database::open(&dir.path().join("data").join("tracker.db")).unwrap();
        (dir, database)
    }

    #[test]
    fn duplicate_activity_name_is_rejected_without_second_row() {
        let (_dir, db) = open_temp();

        let id = db.create_activity("Reading", ValueType::Count).unwrap();
        let duplicate = db.create_activity("Reading", ValueType::Text);

        assert!(matches!(duplicate, Err(StoreError::DuplicateName(name)) if name == "Reading"));
        let activities = db.list_activities().unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].id, id);
        assert_eq!(activities[0].value_type, ValueType::Count);
    }

    #[test]
    fn names_are_case_sensitive() {
        let (_dir, db) = open_temp();

        db.create_activity("run", ValueType::Checkmark).unwrap();
        db.create_activity("Run", ValueType::Checkmark).unwrap();

        assert_eq!(db.count_activities().unwrap(), 2);
    }

    #[test]
    fn activities_are_listed_by_name() {
        let (_dir, db) = open_temp();

        db.create_activity("Yoga", ValueType::Duration).unwrap();
        db.create_activity("Coffee", ValueType::Count).unwrap();
        db.create_activity("Journal", ValueType::Text).unwrap();

        let names = db
            .list_activities()
            .unwrap()
            .into_iter()
            .map(|activity| activity.name)
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["Coffee", "Journal", "Yoga"]);
    }

    #[test]
    fn deleting_activity_cascades_only_to_its_entries() {
        let (_dir, db) = open_temp();

        let run = db.create_activity("Run", ValueType::Duration).unwrap();
        let read = db.create_activity("Read", ValueType::Checkmark).unwrap();
        db.create_log_entry(run, "2024-03-01", Some("00:30:00")).unwrap();
        db.create_log_entry(run, "2024-03-02", None).unwrap();
        let kept = db.create_log_entry(read, "2024-03-01", None).unwrap();

        db.delete_activity(run).unwrap();

        let remaining = db.log_entries_for_month(2024, 3, &[]).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, kept);
        assert_eq!(remaining[0].activity_name, "Read");
        assert!(db.activity(run).unwrap().is_none());
    }

    #[test]
    fn deletes_of_missing_rows_are_noops() {
        let (_dir, db) = open_temp();

        assert_eq!(db.delete_activity(42).unwrap(), 0);
        assert_eq!(db.delete_log_entry(42).unwrap(), 0);
    }

    #[test]
    fn multiple_entries_per_day_are_allowed() {
        let (_dir, db) = open_temp();

        let coffee = db.create_activity("Coffee", ValueType::Count).unwrap();
        db.create_log_entry(coffee, "2024-05-10", Some("1")).unwrap();
        db.create_log_entry(coffee, "2024-05-10", Some("2")).unwrap();

        let entries = db.log_entries_for_day("2024-05-10").unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].value.as_deref(), Some("1"));
        assert_eq!(entries[1].value.as_deref(), Some("2"));
    }

    #[test]
    fn month_listing_respects_month_boundaries() {
        let (_dir, db) = open_temp();

        let id = db.create_activity("Walk", ValueType::Checkmark).unwrap();
        db.create_log_entry(id, "2024-01-05", None).unwrap();
        db.create_log_entry(id, "2024-01-31", None).unwrap();
        db.create_log_entry(id, "2024-02-01", None).unwrap();

        let dates = db
            .log_entries_for_month(2024, 1, &[])
            .unwrap()
            .into_iter()
            .map(|entry| entry.date)
            .collect::<Vec<_>>();
        assert_eq!(dates, vec!["2024-01-05", "2024-01-31"]);
    }

    #[test]
    fn month_listing_applies_activity_filter() {
        let (_dir, db) = open_temp();

        let walk = db.create_activity("Walk", ValueType::Checkmark).unwrap();
        let swim = db.create_activity("Swim", ValueType::Duration).unwrap();
        let nap = db.create_activity("Nap", ValueType::Checkmark).unwrap();
        db.create_log_entry(walk, "2024-06-01", None).unwrap();
        db.create_log_entry(swim, "2024-06-02", Some("01:00:00")).unwrap();
        db.create_log_entry(nap, "2024-06-03", None).unwrap();

        let filtered = db.log_entries_for_month(2024, 6, &[walk, nap]).unwrap();
        let ids = filtered.iter().map(|entry| entry.activity_id).collect::<Vec<_>>();
        assert_eq!(ids, vec![walk, nap]);

        let all = db.log_entries_for_month(2024, 6, &[]).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].value_type, ValueType::Duration);
    }

    #[test]
    fn export_is_ordered_by_date_and_omits_missing_values() {
        let (_dir, db) = open_temp();

        let run = db.create_activity("Бег", ValueType::Duration).unwrap();
        let read = db.create_activity("Read", ValueType::Checkmark).unwrap();
        db.create_log_entry(run, "2024-02-10", Some("00:45:00")).unwrap();
        db.create_log_entry(read, "2024-01-03", None).unwrap();

        let records = db.export_all().unwrap();
        assert_eq!(records[0].date, "2024-01-03");
        assert_eq!(records[1].activity_name, "Бег");

        let json = serde_json::to_value(&records).unwrap();
        assert!(json[0].get("value").is_none());
        assert_eq!(json[1]["value"], "00:45:00");
    }

    #[test]
    fn entry_requires_live_activity() {
        let (_dir, db) = open_temp();

        let missing = db.create_log_entry(99, "2024-01-01", None);
        assert!(matches!(missing, Err(StoreError::MissingActivity(99))));
        assert_eq!(db.count_log_entries().unwrap(), 0);
    }

    #[test]
    fn reopening_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.db");

        {
            let db = Database::open(&path).unwrap();
            db.create_activity("Stretch", ValueType::Checkmark).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.count_activities().unwrap(), 1);
    }
}
