use chrono::{DateTime, NaiveDate, Utc};
use sqlx::MySql;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I32(i32),
    U64(u64),
    F64(f64),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Json(serde_json::Value),
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I32(v)
    }
}

impl From<u64> for SqlValue {
    fn from(v: u64) -> Self {
        SqlValue::U64(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(v: DateTime<Utc>) -> Self {
        SqlValue::DateTime(v)
    }
}

impl From<serde_json::Value> for SqlValue {
    fn from(v: serde_json::Value) -> Self {
        SqlValue::Json(v)
    }
}

/// ===============================
/// Partial UPDATE builder
/// ===============================
///
/// Only columns given a value end up in the SET clause, so `None` fields of a
/// patch keep what is stored.
#[derive(Debug)]
pub struct SqlUpdate {
    table: &'static str,
    id_column: &'static str,
    sets: Vec<(&'static str, SqlValue)>,
}

impl SqlUpdate {
    pub fn new(table: &'static str, id_column: &'static str) -> Self {
        Self {
            table,
            id_column,
            sets: Vec::new(),
        }
    }

    pub fn set<V: Into<SqlValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.sets.push((column, value.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    pub fn sql(&self) -> String {
        let set_clause = self
            .sets
            .iter()
            .map(|(column, _)| format!("{column} = ?"))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE {} = ?",
            self.table, set_clause, self.id_column
        )
    }

    /// Returns the affected row count. An empty update touches nothing.
    pub async fn execute<'c, E>(self, id: u64, executor: E) -> Result<u64, sqlx::Error>
    where
        E: sqlx::Executor<'c, Database = MySql>,
    {
        if self.is_empty() {
            return Ok(0);
        }

        let sql = self.sql();
        let mut query = sqlx::query(&sql);

        for (_, value) in self.sets {
            query = match value {
                SqlValue::String(v) => query.bind(v),
                SqlValue::I32(v) => query.bind(v),
                SqlValue::U64(v) => query.bind(v),
                SqlValue::F64(v) => query.bind(v),
                SqlValue::Date(v) => query.bind(v),
                SqlValue::DateTime(v) => query.bind(v),
                SqlValue::Json(v) => query.bind(sqlx::types::Json(v)),
            };
        }

        let result = query.bind(id).execute(executor).await?;
        Ok(result.rows_affected())
    }
}
