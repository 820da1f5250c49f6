//! Materialized statement results.
//!
//! A `Row` is one immutable record that can be read three ways: by field
//! name, by position (including tuple conversion), or as a key/value
//! mapping. All three views read the same values.

use crate::db::{DbError, DbResult};
use rusqlite::types::{FromSql, Value, ValueRef};
use std::ops::Index;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub(crate) fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn keys(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.position(name).map(|index| &self.values[index])
    }

    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Field-name view.
    pub fn get<T: FromSql>(&self, name: &str) -> DbResult<T> {
        let index = self
            .position(name)
            .ok_or_else(|| DbError::NoSuchColumn(name.to_string()))?;
        self.get_at(index)
    }

    /// Positional view.
    pub fn get_at<T: FromSql>(&self, index: usize) -> DbResult<T> {
        let value = self
            .values
            .get(index)
            .ok_or_else(|| DbError::NoSuchColumn(format!("#{index}")))?;
        T::column_result(ValueRef::from(value)).map_err(|err| DbError::Conversion {
            column: self
                .columns
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("#{index}")),
            message: err.to_string(),
        })
    }

    /// Positional view as a tuple, e.g. `row.to_tuple::<(i64, i64)>()`.
    pub fn to_tuple<T: FromRow>(&self) -> DbResult<T> {
        T::from_row(self)
    }

    /// Key-based view.
    pub fn as_mapping(&self) -> RowMapping<'_> {
        RowMapping { row: self }
    }
}

impl Index<usize> for Row {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

/// Borrowed key/value view over one `Row`.
///
/// Prefer `get`, which returns `None` for an unknown key. Indexing with
/// `mapping["key"]` is for keys known to be in the statement and panics
/// otherwise.
#[derive(Debug, Clone, Copy)]
pub struct RowMapping<'r> {
    row: &'r Row,
}

impl<'r> RowMapping<'r> {
    /// Value under `key`, `None` when the statement produced no such column.
    pub fn get(&self, key: &str) -> Option<&'r Value> {
        self.row.value(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.row.position(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &'r str> {
        self.row.columns.iter().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'r str, &'r Value)> {
        self.row
            .columns
            .iter()
            .map(String::as_str)
            .zip(self.row.values.iter())
    }
}

/// Panics when `key` is not a column of the row; use `RowMapping::get`
/// for keys that may be absent.
impl Index<&str> for RowMapping<'_> {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        match self.row.value(key) {
            Some(value) => value,
            None => panic!("row has no column `{key}`"),
        }
    }
}

/// Positional decoding of a whole row.
pub trait FromRow: Sized {
    fn from_row(row: &Row) -> DbResult<Self>;
}

macro_rules! tuple_from_row {
    ($len:expr => $($ty:ident : $idx:tt),+) => {
        impl<$($ty: FromSql),+> FromRow for ($($ty,)+) {
            fn from_row(row: &Row) -> DbResult<Self> {
                if row.len() != $len {
                    return Err(DbError::Conversion {
                        column: "*".to_string(),
                        message: format!("expected {} columns, row has {}", $len, row.len()),
                    });
                }
                Ok(($(row.get_at::<$ty>($idx)?,)+))
            }
        }
    };
}

tuple_from_row!(1 => A: 0);
tuple_from_row!(2 => A: 0, B: 1);
tuple_from_row!(3 => A: 0, B: 1, C: 2);
tuple_from_row!(4 => A: 0, B: 1, C: 2, D: 3);
tuple_from_row!(5 => A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_from_row!(6 => A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);

/// Rows plus write metadata returned by one statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Arc<[String]>,
    rows: Vec<Row>,
    rows_affected: usize,
    inserted_primary_key: Option<i64>,
}

impl ResultSet {
    pub(crate) fn from_rows(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self {
            columns,
            rows,
            rows_affected: 0,
            inserted_primary_key: None,
        }
    }

    pub(crate) fn from_write(rows_affected: usize, inserted_primary_key: Option<i64>) -> Self {
        Self {
            columns: Arc::from(Vec::new()),
            rows: Vec::new(),
            rows_affected,
            inserted_primary_key,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn all(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First column of the first row, `None` when there are no rows.
    pub fn scalar<T: FromSql>(&self) -> DbResult<Option<T>> {
        self.rows.first().map(|row| row.get_at(0)).transpose()
    }

    pub fn mappings(&self) -> impl Iterator<Item = RowMapping<'_>> {
        self.rows.iter().map(Row::as_mapping)
    }

    pub fn rows_affected(&self) -> usize {
        self.rows_affected
    }

    /// Row id assigned by the store to the last inserted row.
    pub fn inserted_primary_key(&self) -> Option<i64> {
        self.inserted_primary_key
    }
}

impl IntoIterator for ResultSet {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultSet {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::{ResultSet, Row};
    use crate::db::DbError;
    use rusqlite::types::Value;
    use std::sync::Arc;

    fn sample() -> ResultSet {
        let columns: Arc<[String]> = Arc::from(vec!["x".to_string(), "y".to_string()]);
        let rows = vec![
            Row::new(columns.clone(), vec![Value::Integer(1), Value::Integer(10)]),
            Row::new(columns.clone(), vec![Value::Integer(2), Value::Null]),
        ];
        ResultSet::from_rows(columns, rows)
    }

    #[test]
    fn three_views_read_the_same_values() {
        let result = sample();
        let row = result.first().unwrap();

        assert_eq!(row.get::<i64>("y").unwrap(), 10);
        assert_eq!(row.get_at::<i64>(1).unwrap(), 10);
        assert_eq!(row[1], Value::Integer(10));
        assert_eq!(row.to_tuple::<(i64, i64)>().unwrap(), (1, 10));
        assert_eq!(row.as_mapping()["y"], Value::Integer(10));
        assert_eq!(
            row.as_mapping().keys().collect::<Vec<_>>(),
            vec!["x", "y"]
        );
    }

    #[test]
    fn null_decodes_into_option_and_fails_for_plain_integer() {
        let result = sample();
        let row = &result.all()[1];

        assert_eq!(row.get::<Option<i64>>("y").unwrap(), None);
        assert!(matches!(
            row.get::<i64>("y").unwrap_err(),
            DbError::Conversion { column, .. } if column == "y"
        ));
    }

    #[test]
    fn missing_column_and_wrong_tuple_arity_are_errors() {
        let result = sample();
        let row = result.first().unwrap();

        assert!(matches!(
            row.get::<i64>("z").unwrap_err(),
            DbError::NoSuchColumn(name) if name == "z"
        ));
        assert!(row.to_tuple::<(i64,)>().is_err());
        assert!(row.as_mapping().get("z").is_none());
    }

    #[test]
    #[should_panic(expected = "row has no column `z`")]
    fn mapping_index_panics_on_unknown_key() {
        let result = sample();
        let _ = &result.first().unwrap().as_mapping()["z"];
    }

    #[test]
    fn scalar_and_iteration() {
        let result = sample();
        assert_eq!(result.scalar::<i64>().unwrap(), Some(1));
        assert_eq!(result.len(), 2);
        let xs = result
            .iter()
            .map(|row| row.get::<i64>("x").unwrap())
            .collect::<Vec<_>>();
        assert_eq!(xs, vec![1, 2]);
        assert_eq!(ResultSet::from_write(1, Some(7)).inserted_primary_key(), Some(7));
        assert_eq!(ResultSet::from_write(0, None).scalar::<i64>().unwrap(), None);
    }
}
