use rusqlite::ToSql;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How the value of a log entry is interpreted. Fixed when the activity is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Checkmark,
    Count,
    Duration,
    Text,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown value type: {0} (expected one of checkmark, count, duration, text)")]
pub struct UnknownValueType(pub String);

impl ValueType {
    pub const ALL: [ValueType; 4] = [
        ValueType::Checkmark,
        ValueType::Count,
        ValueType::Duration,
        ValueType::Text,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Checkmark => "checkmark",
            ValueType::Count => "count",
            ValueType::Duration => "duration",
            ValueType::Text => "text",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = UnknownValueType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| UnknownValueType(value.to_string()))
    }
}

impl ToSql for ValueType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ValueType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_kind() {
        for kind in ValueType::ALL {
            assert_eq!(kind.as_str().parse::<ValueType>(), Ok(kind));
        }
    }

    #[test]
    fn parsing_is_exact() {
        assert!("Duration".parse::<ValueType>().is_err());
        assert!(" text".parse::<ValueType>().is_err());
        assert_eq!(
            "number".parse::<ValueType>(),
            Err(UnknownValueType("number".to_string()))
        );
    }

    #[test]
    fn serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&ValueType::Checkmark).unwrap();
        assert_eq!(json, "\"checkmark\"");
    }
}
