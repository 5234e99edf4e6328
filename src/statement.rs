//! SQL text builders for the write operations.
//!
//! Values are always rendered through [`Value::to_sql_literal`]. Table names,
//! column names and WHERE clauses are trusted and emitted verbatim.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::value::Value;

/// Ordered column → value map used as insert/update input.
///
/// Key order decides the column order of the generated SQL. Inserting an
/// existing key replaces its value in place.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ColumnValueMap {
    values: IndexMap<String, Value>,
}

impl ColumnValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a column value, builder style
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: &str, value: impl Into<Value>) -> Option<Value> {
        self.values.insert(column.to_string(), value.into())
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ColumnValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl<K: Into<String>, V: Into<Value>, const N: usize> From<[(K, V); N]> for ColumnValueMap {
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

fn require_columns(table: &str, data: &ColumnValueMap) -> Result<()> {
    if data.is_empty() {
        return Err(Error::NoColumns {
            table: table.to_string(),
        });
    }
    Ok(())
}

/// `INSERT INTO <table> (<columns>) VALUES (<values>)`
pub fn insert_sql(table: &str, data: &ColumnValueMap) -> Result<String> {
    require_columns(table, data)?;
    let columns = data.columns().collect::<Vec<_>>().join(",");
    let values = data
        .values
        .values()
        .map(Value::to_sql_literal)
        .collect::<Result<Vec<_>>>()?
        .join(",");
    Ok(format!("INSERT INTO {table} ({columns}) VALUES ({values})"))
}

/// `UPDATE <table> SET c1=v1, c2=v2 WHERE <where_clause>`
pub fn update_sql(table: &str, data: &ColumnValueMap, where_clause: &str) -> Result<String> {
    require_columns(table, data)?;
    let assignments = data
        .iter()
        .map(|(column, value)| -> Result<String> {
            Ok(format!("{column}={}", value.to_sql_literal()?))
        })
        .collect::<Result<Vec<_>>>()?
        .join(", ");
    Ok(format!("UPDATE {table} SET {assignments} WHERE {where_clause}"))
}

/// `DELETE FROM <table> WHERE <where_clause>`
pub fn delete_sql(table: &str, where_clause: &str) -> String {
    format!("DELETE FROM {table} WHERE {where_clause}")
}

/// Split a possibly schema-qualified table reference into unquoted
/// `(schema, table)` parts.
///
/// Understands `"..."` (with `""` escapes), `` `...` `` and `[...]` quoting.
/// Dots inside quotes do not split.
pub(crate) fn split_table_name(table: &str) -> (Option<String>, String) {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = table.trim().chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' | '`' => {
                while let Some(q) = chars.next() {
                    if q == c {
                        if chars.peek() == Some(&c) {
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    current.push(q);
                }
            }
            '[' => current.extend(chars.by_ref().take_while(|&q| q != ']')),
            '.' => parts.push(std::mem::take(&mut current)),
            c if c.is_whitespace() => {}
            c => current.push(c),
        }
    }
    parts.push(current);
    let table = parts.pop().unwrap_or_default();
    (parts.pop(), table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post() -> ColumnValueMap {
        ColumnValueMap::new()
            .with("id", "p1")
            .with("title", "T")
            .with("content", "C'\"")
            .with("timestamp", 6)
    }

    #[test]
    fn insert_keeps_key_order_and_escapes_values() {
        let sql = insert_sql("posts", &post()).unwrap();
        assert_eq!(
            sql,
            r#"INSERT INTO posts (id,title,content,timestamp) VALUES ('p1','T','C''"',6)"#
        );
    }

    #[test]
    fn insert_column_and_value_counts_match() {
        let data: ColumnValueMap = (0..7).map(|i| (format!("c{i}"), i)).collect();
        let sql = insert_sql("t", &data).unwrap();
        let (cols, vals) = sql
            .trim_start_matches("INSERT INTO t (")
            .trim_end_matches(')')
            .split_once(") VALUES (")
            .unwrap();
        assert_eq!(cols.split(',').count(), vals.split(',').count());
        assert_eq!(cols, "c0,c1,c2,c3,c4,c5,c6");
        assert_eq!(vals, "0,1,2,3,4,5,6");
    }

    #[test]
    fn duplicate_key_replaces_in_place() {
        let mut data = post();
        data.insert("id", "p2");
        assert_eq!(data.len(), 4);
        assert_eq!(data.columns().next(), Some("id"));
        assert_eq!(data.get("id"), Some(&Value::from("p2")));
    }

    #[test]
    fn update_builds_set_list_and_passes_where_through() {
        let data = ColumnValueMap::from([("title", "T2"), ("content", "it's")]);
        let sql = update_sql("posts", &data, "timestamp=2").unwrap();
        assert_eq!(
            sql,
            "UPDATE posts SET title='T2', content='it''s' WHERE timestamp=2"
        );
    }

    #[test]
    fn delete_passes_table_and_where_through() {
        assert_eq!(
            delete_sql("posts", "id != 'abc'"),
            "DELETE FROM posts WHERE id != 'abc'"
        );
    }

    #[test]
    fn table_names_split_into_schema_and_table() {
        assert_eq!(split_table_name("users"), (None, "users".to_string()));
        assert_eq!(
            split_table_name("main.users"),
            (Some("main".to_string()), "users".to_string())
        );
        assert_eq!(split_table_name("\"users\""), (None, "users".to_string()));
        assert_eq!(
            split_table_name("[main] . \"odd.\"\"name\""),
            (Some("main".to_string()), "odd.\"name".to_string())
        );
        assert_eq!(
            split_table_name("`temp`.`t`"),
            (Some("temp".to_string()), "t".to_string())
        );
    }

    #[test]
    fn empty_maps_are_rejected() {
        let empty = ColumnValueMap::new();
        assert!(matches!(
            insert_sql("posts", &empty),
            Err(Error::NoColumns { table }) if table == "posts"
        ));
        assert!(update_sql("posts", &empty, "1=1").is_err());
    }

    #[test]
    fn invalid_values_abort_the_build() {
        let data = ColumnValueMap::new().with("score", f64::NAN);
        assert!(matches!(
            insert_sql("t", &data),
            Err(Error::InvalidValue(_))
        ));
    }
}
