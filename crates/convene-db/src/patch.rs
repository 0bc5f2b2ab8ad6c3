use anyhow::Result;
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::models::{EventPatch, UserPatch};

/// Parameterized `SET` list for a sparse UPDATE.
///
/// Column names are `&'static str` supplied by this crate, never by callers,
/// so only values ever travel as parameters.
#[derive(Debug, Default)]
pub struct Assignments {
    columns: Vec<&'static str>,
    values: Vec<Value>,
}

impl Assignments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, column: &'static str, value: impl Into<Value>) -> &mut Self {
        self.columns.push(column);
        self.values.push(value.into());
        self
    }

    /// Adds `column` only when the caller supplied the field at all.
    pub fn set_if_present<V: Into<Value>>(&mut self, column: &'static str, value: Option<V>) -> &mut Self {
        if let Some(v) = value {
            self.set(column, v);
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    /// `UPDATE {table} SET a = ?1, b = ?2 WHERE {key} = ?3`
    pub fn update_sql(&self, table: &str, key_column: &str) -> String {
        let sets: Vec<String> = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, col)| format!("{} = ?{}", col, i + 1))
            .collect();
        format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            table,
            sets.join(", "),
            key_column,
            self.columns.len() + 1
        )
    }

    /// Execute against `table`, returning the number of rows changed.
    /// An empty assignment list is a no-op.
    pub fn execute(self, conn: &Connection, table: &str, key_column: &str, key: i64) -> Result<usize> {
        if self.is_empty() {
            return Ok(0);
        }
        let sql = self.update_sql(table, key_column);
        let mut values = self.values;
        values.push(Value::Integer(key));
        let changed = conn.execute(&sql, rusqlite::params_from_iter(values.iter()))?;
        Ok(changed)
    }
}

impl EventPatch {
    /// Assignments for every supplied field. `slug` is the regenerated slug
    /// when the title changed; the store computes it.
    pub fn assignments(&self, slug: Option<String>) -> Assignments {
        let mut a = Assignments::new();
        a.set_if_present("title", self.title.clone())
            .set_if_present("slug", slug)
            .set_if_present("thumbnail_url", self.thumbnail_url.clone())
            .set_if_present("banner_url", self.banner_url.clone())
            .set_if_present("description", self.description.clone())
            .set_if_present("resume", self.resume.clone())
            .set_if_present("location", self.location.clone())
            .set_if_present("date", self.date.clone());
        a
    }
}

impl UserPatch {
    pub fn assignments(&self) -> Assignments {
        let mut a = Assignments::new();
        a.set_if_present("name", self.name.clone())
            .set_if_present("email", self.email.clone())
            .set_if_present("image", self.image.clone());
        a
    }
}
