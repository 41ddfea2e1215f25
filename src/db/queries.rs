pub const PRAGMA_FOREIGN_KEYS: &str = "PRAGMA foreign_keys = ON;";

pub const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id         INTEGER PRIMARY KEY AUTOINCREMENT,
  name       TEXT NOT NULL UNIQUE,
  value_type TEXT NOT NULL CHECK (value_type IN ('checkmark', 'count', 'duration', 'text'))
);
"#;

pub const CREATE_ACTIVITY_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS activity_logs (
  id          INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL,
  date        TEXT NOT NULL,
  value       TEXT,
  FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE
);
"#;

pub const INDEX_ACTIVITY_LOGS_DATE: &str =
    "CREATE INDEX IF NOT EXISTS idx_activity_logs_date ON activity_logs(date);";

pub const INDEX_ACTIVITY_LOGS_ACTIVITY: &str =
    "CREATE INDEX IF NOT EXISTS idx_activity_logs_activity_id ON activity_logs(activity_id);";

pub const SELECT_LOG_ENTRY_COLUMNS: &str = "SELECT l.id, l.activity_id, l.date, l.value, a.name, a.value_type
     FROM activity_logs l
     JOIN activities a ON a.id = l.activity_id";

pub fn schema_statements() -> Vec<&'static str> {
    vec![
        CREATE_ACTIVITIES,
        CREATE_ACTIVITY_LOGS,
        INDEX_ACTIVITY_LOGS_DATE,
        INDEX_ACTIVITY_LOGS_ACTIVITY,
    ]
}

/// `LIKE` pattern matching every zero-padded date in the given month.
pub fn month_prefix_pattern(year: i32, month: u32) -> String {
    format!("{year:04}-{month:02}-%")
}

/// Builds `?1, ?2, ...` placeholders starting after `offset` bound parameters.
pub fn placeholders(offset: usize, count: usize) -> String {
    (1..=count)
        .map(|index| format!("?{}", offset + index))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_pattern_is_zero_padded() {
        assert_eq!(month_prefix_pattern(2024, 1), "2024-01-%");
        assert_eq!(month_prefix_pattern(987, 12), "0987-12-%");
    }

    #[test]
    fn placeholders_continue_after_offset() {
        assert_eq!(placeholders(1, 3), "?2, ?3, ?4");
        assert_eq!(placeholders(0, 1), "?1");
    }
}
