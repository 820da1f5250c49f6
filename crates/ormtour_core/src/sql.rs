//! Statement construction: textual SQL with named parameters and small
//! insert/select/update builders over declared tables.
//!
//! # Invariants
//! - Parameters are always bound by name (`:name`), never spliced into SQL.
//! - Builders only reference columns declared on their `Table`; unknown
//!   columns surface as `SchemaError::UnknownColumn` when compiled.

use crate::schema::{SchemaError, SchemaResult, Table};
use rusqlite::types::Value;
use rusqlite::ToSql;
use std::fmt::{Display, Formatter};

/// Conversion into a bindable SQLite value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl IntoValue for &Value {
    fn into_value(self) -> Value {
        self.clone()
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::Text(self.to_string())
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::Text(self)
    }
}

impl IntoValue for &String {
    fn into_value(self) -> Value {
        Value::Text(self.clone())
    }
}

impl IntoValue for i64 {
    fn into_value(self) -> Value {
        Value::Integer(self)
    }
}

impl IntoValue for i32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for u32 {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::Real(self)
    }
}

impl IntoValue for bool {
    fn into_value(self) -> Value {
        Value::Integer(i64::from(self))
    }
}

impl IntoValue for Vec<u8> {
    fn into_value(self) -> Value {
        Value::Blob(self)
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

/// Ordered named parameter set. Names are stored without the `:` prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `name`, replacing an earlier binding of the same name.
    pub fn set(mut self, name: &str, value: impl IntoValue) -> Self {
        self.insert(name, value.into_value());
        self
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        let name = name.trim_start_matches(':');
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        let name = name.trim_start_matches(':');
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Later entries of `other` win over existing ones.
    pub fn merged(&self, other: &Params) -> Params {
        let mut merged = self.clone();
        for (name, value) in &other.entries {
            merged.insert(name, value.clone());
        }
        merged
    }

    pub(crate) fn prefixed_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(name, _)| format!(":{name}"))
            .collect()
    }

    pub(crate) fn bindings<'a>(&'a self, names: &'a [String]) -> Vec<(&'a str, &'a dyn ToSql)> {
        names
            .iter()
            .zip(self.entries.iter())
            .map(|(name, (_, value))| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

impl<K: AsRef<str>, V: IntoValue> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (name, value) in iter {
            params.insert(name.as_ref(), value.into_value());
        }
        params
    }
}

impl IntoIterator for Params {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Compiled SQL text plus its bound parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    params: Params,
}

/// Wraps literal SQL text into a statement.
pub fn text(sql: impl Into<String>) -> Statement {
    Statement {
        sql: sql.into(),
        params: Params::new(),
    }
}

impl Statement {
    pub fn bind(mut self, name: &str, value: impl IntoValue) -> Self {
        self.params.insert(name, value.into_value());
        self
    }

    pub fn bind_params(mut self, params: &Params) -> Self {
        self.params = self.params.merged(params);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    pub(crate) fn is_insert(&self) -> bool {
        self.sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Anything that can be compiled into a `Statement`.
pub trait Executable {
    fn compile(&self) -> SchemaResult<Statement>;
}

impl Executable for Statement {
    fn compile(&self) -> SchemaResult<Statement> {
        Ok(self.clone())
    }
}

impl Executable for str {
    fn compile(&self) -> SchemaResult<Statement> {
        Ok(text(self))
    }
}

impl Executable for String {
    fn compile(&self) -> SchemaResult<Statement> {
        Ok(text(self.as_str()))
    }
}

/// `INSERT` over one table.
///
/// Without explicit values it compiles a placeholder for every non primary
/// key column, which suits `Conn::execute_many`.
#[derive(Debug, Clone)]
pub struct Insert<'t> {
    table: &'t Table,
    values: Params,
}

pub fn insert(table: &Table) -> Insert<'_> {
    Insert {
        table,
        values: Params::new(),
    }
}

impl Insert<'_> {
    pub fn value(mut self, column: &str, value: impl IntoValue) -> Self {
        self.values.insert(column, value.into_value());
        self
    }

    pub fn values<K: AsRef<str>, V: IntoValue>(
        mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        for (column, value) in values {
            self.values.insert(column.as_ref(), value.into_value());
        }
        self
    }

    fn target_columns(&self) -> Vec<String> {
        if self.values.is_empty() {
            self.table
                .columns()
                .iter()
                .filter(|column| !column.is_primary_key())
                .map(|column| column.name().to_string())
                .collect()
        } else {
            self.values.names().map(str::to_string).collect()
        }
    }

    fn render(columns: &[String], table: &Table) -> String {
        let placeholders = columns
            .iter()
            .map(|column| format!(":{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            table.name(),
            columns.join(", ")
        )
    }
}

impl Executable for Insert<'_> {
    fn compile(&self) -> SchemaResult<Statement> {
        let columns = self.target_columns();
        if columns.is_empty() {
            return Err(SchemaError::EmptyStatement(self.table.name().to_string()));
        }
        for column in &columns {
            self.table.column(column)?;
        }
        Ok(Statement {
            sql: Self::render(&columns, self.table),
            params: self.values.clone(),
        })
    }
}

impl Display for Insert<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&Self::render(&self.target_columns(), self.table))
    }
}

/// Equality filters shared by select/update. Each filter binds `:{column}_{n}`.
#[derive(Debug, Clone, Default)]
struct Filters {
    entries: Vec<(String, Value)>,
}

impl Filters {
    fn push(&mut self, column: &str, value: Value) {
        self.entries.push((column.to_string(), value));
    }

    fn render(&self, qualifier: Option<&str>) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let clauses = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, (column, _))| match qualifier {
                Some(table) => format!("{table}.{column} = :{column}_{}", index + 1),
                None => format!("{column} = :{column}_{}", index + 1),
            })
            .collect::<Vec<_>>()
            .join(" AND ");
        format!(" WHERE {clauses}")
    }

    fn params(&self) -> Params {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, (column, value))| (format!("{column}_{}", index + 1), value.clone()))
            .collect()
    }

    fn check(&self, table: &Table) -> SchemaResult<()> {
        for (column, _) in &self.entries {
            table.column(column)?;
        }
        Ok(())
    }
}

/// `SELECT` of every column of one table.
#[derive(Debug, Clone)]
pub struct Select<'t> {
    table: &'t Table,
    filters: Filters,
    order_by: Vec<String>,
}

pub fn select(table: &Table) -> Select<'_> {
    Select {
        table,
        filters: Filters::default(),
        order_by: Vec::new(),
    }
}

impl Select<'_> {
    pub fn where_eq(mut self, column: &str, value: impl IntoValue) -> Self {
        self.filters.push(column, value.into_value());
        self
    }

    pub fn order_by(mut self, column: &str) -> Self {
        self.order_by.push(column.to_string());
        self
    }

    fn render(&self) -> String {
        let table = self.table.name();
        let columns = self
            .table
            .columns()
            .iter()
            .map(|column| column.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {columns} FROM {table}");
        sql.push_str(&self.filters.render(Some(table)));
        if !self.order_by.is_empty() {
            let order = self
                .order_by
                .iter()
                .map(|column| format!("{table}.{column}"))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(&format!(" ORDER BY {order}"));
        }
        sql
    }
}

impl Executable for Select<'_> {
    fn compile(&self) -> SchemaResult<Statement> {
        self.filters.check(self.table)?;
        for column in &self.order_by {
            self.table.column(column)?;
        }
        Ok(Statement {
            sql: self.render(),
            params: self.filters.params(),
        })
    }
}

impl Display for Select<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// `UPDATE` of one table. Without filters it touches every row.
#[derive(Debug, Clone)]
pub struct Update<'t> {
    table: &'t Table,
    values: Params,
    filters: Filters,
}

pub fn update(table: &Table) -> Update<'_> {
    Update {
        table,
        values: Params::new(),
        filters: Filters::default(),
    }
}

impl Update<'_> {
    pub fn values<K: AsRef<str>, V: IntoValue>(
        mut self,
        values: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        for (column, value) in values {
            self.values.insert(column.as_ref(), value.into_value());
        }
        self
    }

    pub fn where_eq(mut self, column: &str, value: impl IntoValue) -> Self {
        self.filters.push(column, value.into_value());
        self
    }

    fn render(&self) -> String {
        let assignments = self
            .values
            .names()
            .map(|column| format!("{column} = :{column}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "UPDATE {} SET {assignments}{}",
            self.table.name(),
            self.filters.render(None)
        )
    }
}

impl Executable for Update<'_> {
    fn compile(&self) -> SchemaResult<Statement> {
        if self.values.is_empty() {
            return Err(SchemaError::EmptyStatement(self.table.name().to_string()));
        }
        for column in self.values.names() {
            self.table.column(column)?;
        }
        self.filters.check(self.table)?;
        Ok(Statement {
            sql: self.render(),
            params: self.values.merged(&self.filters.params()),
        })
    }
}

impl Display for Update<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::{insert, select, text, update, Executable, Params};
    use crate::schema::{Column, SchemaError, Table};
    use rusqlite::types::Value;

    fn user_table() -> Table {
        Table::new(
            "user_account",
            [
                Column::integer("id").primary_key(),
                Column::string("name", Some(30)),
                Column::string("fullname", None),
            ],
        )
    }

    #[test]
    fn text_statement_binds_named_parameters() {
        let stmt = text("SELECT x, y FROM some_table WHERE y > :y").bind(":y", 0);
        assert_eq!(stmt.to_string(), "SELECT x, y FROM some_table WHERE y > :y");
        assert_eq!(stmt.params().get("y"), Some(&Value::Integer(0)));

        let rebound = stmt.bind("y", 5);
        assert_eq!(rebound.params().len(), 1);
        assert_eq!(rebound.params().get(":y"), Some(&Value::Integer(5)));
    }

    #[test]
    fn insert_compiles_given_columns_or_all_non_key_columns() {
        let table = user_table();
        let stmt = insert(&table)
            .values([("name", "spongebob"), ("fullname", "Spongebob Squarepants")])
            .compile()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "INSERT INTO user_account (name, fullname) VALUES (:name, :fullname)"
        );
        assert_eq!(
            stmt.params().get("name"),
            Some(&Value::Text("spongebob".to_string()))
        );

        assert_eq!(
            insert(&table).to_string(),
            "INSERT INTO user_account (name, fullname) VALUES (:name, :fullname)"
        );
    }

    #[test]
    fn insert_rejects_unknown_column() {
        let table = user_table();
        let err = insert(&table).value("nickname", "sb").compile().unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownColumn {
                table: "user_account".to_string(),
                column: "nickname".to_string()
            }
        );
    }

    #[test]
    fn select_qualifies_columns_and_numbers_filters() {
        let table = user_table();
        let stmt = select(&table)
            .where_eq("name", "spongebob")
            .order_by("id")
            .compile()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "SELECT user_account.id, user_account.name, user_account.fullname \
             FROM user_account WHERE user_account.name = :name_1 ORDER BY user_account.id"
        );
        assert_eq!(
            stmt.params().get("name_1"),
            Some(&Value::Text("spongebob".to_string()))
        );
        assert!(select(&table).order_by("age").compile().is_err());
    }

    #[test]
    fn update_keeps_set_and_filter_parameters_apart() {
        let table = user_table();
        let stmt = update(&table)
            .values([("name", "sandy")])
            .where_eq("id", 3)
            .compile()
            .unwrap();
        assert_eq!(
            stmt.sql(),
            "UPDATE user_account SET name = :name WHERE id = :id_1"
        );
        assert_eq!(stmt.params().get("id_1"), Some(&Value::Integer(3)));
        assert!(matches!(
            update(&table).where_eq("id", 1).compile().unwrap_err(),
            SchemaError::EmptyStatement(_)
        ));
    }

    #[test]
    fn params_merge_prefers_later_values() {
        let base = Params::new().set("x", 1).set("y", 2);
        let merged = base.merged(&Params::new().set("y", 20).set("z", Option::<i64>::None));
        assert_eq!(merged.get("x"), Some(&Value::Integer(1)));
        assert_eq!(merged.get("y"), Some(&Value::Integer(20)));
        assert_eq!(merged.get("z"), Some(&Value::Null));
    }
}
