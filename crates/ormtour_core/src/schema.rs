//! Table metadata declarations and DDL emission.
//!
//! # Responsibility
//! - Describe tables, columns, primary keys and foreign keys as plain values.
//! - Emit idempotent `CREATE TABLE IF NOT EXISTS` statements.
//!
//! # Invariants
//! - Identifiers match `[A-Za-z_][A-Za-z0-9_]*`; nothing else reaches DDL.
//! - A foreign key may only point at a table registered earlier in the same
//!   `Metadata`, so registration order is a valid creation order.
//! - Declared string lengths are enforced by the store through `CHECK`.

use crate::db::DbResult;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

static IDENTIFIER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

pub type SchemaResult<T> = Result<T, SchemaError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaError {
    InvalidIdentifier(String),
    NoColumns(String),
    DuplicateTable(String),
    DuplicateColumn { table: String, column: String },
    UnknownTable(String),
    UnknownColumn { table: String, column: String },
    InvalidForeignKey { column: String, target: String },
    EmptyStatement(String),
}

impl Display for SchemaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(name) => write!(f, "invalid sql identifier `{name}`"),
            Self::NoColumns(table) => write!(f, "table `{table}` declares no columns"),
            Self::DuplicateTable(table) => write!(f, "table `{table}` is already registered"),
            Self::DuplicateColumn { table, column } => {
                write!(f, "column `{column}` is declared twice in table `{table}`")
            }
            Self::UnknownTable(table) => write!(f, "unknown table `{table}`"),
            Self::UnknownColumn { table, column } => {
                write!(f, "table `{table}` has no column `{column}`")
            }
            Self::InvalidForeignKey { column, target } => write!(
                f,
                "foreign key on `{column}` must reference `table.column`, got `{target}`"
            ),
            Self::EmptyStatement(table) => {
                write!(f, "statement against `{table}` has nothing to write")
            }
        }
    }
}

impl Error for SchemaError {}

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    /// `None` means unbounded text.
    String(Option<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub table: String,
    pub column: String,
}

impl Display for ForeignKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// One declared column. The owning table name is filled in by `Table::new`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    name: String,
    table: String,
    kind: ColumnType,
    primary_key: bool,
    nullable: bool,
    references: Option<String>,
}

impl Column {
    pub fn integer(name: impl Into<String>) -> Self {
        Self::with_type(name, ColumnType::Integer)
    }

    pub fn string(name: impl Into<String>, length: Option<u32>) -> Self {
        Self::with_type(name, ColumnType::String(length))
    }

    fn with_type(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            table: String::new(),
            kind,
            primary_key: false,
            nullable: true,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Declares a foreign key as `"table.column"`; checked on registration.
    pub fn references(mut self, target: impl Into<String>) -> Self {
        self.references = Some(target.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    pub fn kind(&self) -> ColumnType {
        self.kind
    }

    pub fn is_primary_key(&self) -> bool {
        self.primary_key
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn foreign_key(&self) -> SchemaResult<Option<ForeignKey>> {
        let Some(target) = self.references.as_deref() else {
            return Ok(None);
        };
        let invalid = || SchemaError::InvalidForeignKey {
            column: self.name.clone(),
            target: target.to_string(),
        };
        let (table, column) = target.split_once('.').ok_or_else(invalid)?;
        if !is_identifier(table) || !is_identifier(column) {
            return Err(invalid());
        }
        Ok(Some(ForeignKey {
            table: table.to_string(),
            column: column.to_string(),
        }))
    }

    fn type_sql(&self) -> String {
        match self.kind {
            ColumnType::Integer => "INTEGER".to_string(),
            ColumnType::String(Some(length)) => format!("VARCHAR({length})"),
            ColumnType::String(None) => "VARCHAR".to_string(),
        }
    }
}

impl Display for Column {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.table.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.table, self.name)
        }
    }
}

/// Declared table: a name plus ordered columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    name: String,
    columns: Vec<Column>,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: impl IntoIterator<Item = Column>) -> Self {
        let name = name.into();
        let columns = columns
            .into_iter()
            .map(|mut column| {
                column.table = name.clone();
                column
            })
            .collect();
        Self { name, columns }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column lookup by name, `None` when absent.
    pub fn c(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column(&self, name: &str) -> SchemaResult<&Column> {
        self.c(name).ok_or_else(|| SchemaError::UnknownColumn {
            table: self.name.clone(),
            column: name.to_string(),
        })
    }

    pub fn keys(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns
            .iter()
            .filter(|column| column.primary_key)
            .collect()
    }

    /// Renders the `CREATE TABLE IF NOT EXISTS` statement.
    ///
    /// A lone integer primary key becomes `INTEGER PRIMARY KEY AUTOINCREMENT`
    /// so the store never hands out an id twice.
    pub fn create_sql(&self) -> SchemaResult<String> {
        let primary_key = self.primary_key();
        let inline_pk = match primary_key.as_slice() {
            [only] if only.kind == ColumnType::Integer => Some(only.name.as_str()),
            _ => None,
        };

        let mut parts = Vec::with_capacity(self.columns.len() + 2);
        for column in &self.columns {
            let mut line = format!("    {} {}", column.name, column.type_sql());
            if inline_pk == Some(column.name.as_str()) {
                line.push_str(" PRIMARY KEY AUTOINCREMENT");
            } else if !column.nullable {
                line.push_str(" NOT NULL");
            }
            if let ColumnType::String(Some(length)) = column.kind {
                line.push_str(&format!(" CHECK (length({}) <= {length})", column.name));
            }
            parts.push(line);
        }

        if inline_pk.is_none() && !primary_key.is_empty() {
            let names = primary_key
                .iter()
                .map(|column| column.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            parts.push(format!("    PRIMARY KEY ({names})"));
        }

        for column in &self.columns {
            if let Some(fk) = column.foreign_key()? {
                parts.push(format!(
                    "    FOREIGN KEY ({}) REFERENCES {} ({})",
                    column.name, fk.table, fk.column
                ));
            }
        }

        Ok(format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.name,
            parts.join(",\n")
        ))
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Ordered registry of declared tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    tables: Vec<Table>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a table after checking identifiers and foreign key targets.
    pub fn add_table(&mut self, table: Table) -> SchemaResult<()> {
        ensure_identifier(&table.name)?;
        if table.columns.is_empty() {
            return Err(SchemaError::NoColumns(table.name));
        }
        if self.table(&table.name).is_some() {
            return Err(SchemaError::DuplicateTable(table.name));
        }

        for (index, column) in table.columns.iter().enumerate() {
            ensure_identifier(&column.name)?;
            if table.columns[..index]
                .iter()
                .any(|earlier| earlier.name == column.name)
            {
                return Err(SchemaError::DuplicateColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
            if let Some(fk) = column.foreign_key()? {
                let target = if fk.table == table.name {
                    &table
                } else {
                    self.table(&fk.table)
                        .ok_or_else(|| SchemaError::UnknownTable(fk.table.clone()))?
                };
                target.column(&fk.column)?;
            }
        }

        self.tables.push(table);
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|table| table.name == name)
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Emits DDL for every table, in registration order.
    ///
    /// Safe to call repeatedly; existing tables are left untouched.
    pub fn create_all(&self, conn: &Connection) -> DbResult<()> {
        for table in &self.tables {
            conn.execute_batch(&table.create_sql()?)?;
        }
        Ok(())
    }
}

pub(crate) fn is_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

pub(crate) fn ensure_identifier(value: &str) -> SchemaResult<()> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(SchemaError::InvalidIdentifier(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::{Column, Metadata, SchemaError, Table};
    use rusqlite::Connection;

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
    fn table_exposes_columns_keys_and_primary_key() {
        let table = user_table();
        assert_eq!(table.c("name").unwrap().to_string(), "user_account.name");
        assert_eq!(table.keys(), vec!["id", "name", "fullname"]);
        let pk = table.primary_key();
        assert_eq!(pk.len(), 1);
        assert_eq!(pk[0].name(), "id");
        assert!(table.c("missing").is_none());
    }

    #[test]
    fn create_sql_renders_autoincrement_check_and_foreign_key() {
        let sql = user_table().create_sql().unwrap();
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS user_account ("));
        assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
        assert!(sql.contains("name VARCHAR(30) CHECK (length(name) <= 30)"));
        assert!(sql.contains("fullname VARCHAR"));

        let address = Table::new(
            "address",
            [
                Column::integer("id").primary_key(),
                Column::integer("user_id")
                    .references("user_account.id")
                    .not_null(),
                Column::string("email_address", None).not_null(),
            ],
        );
        let sql = address.create_sql().unwrap();
        assert!(sql.contains("user_id INTEGER NOT NULL"));
        assert!(sql.contains("FOREIGN KEY (user_id) REFERENCES user_account (id)"));
    }

    #[test]
    fn composite_primary_key_is_declared_at_table_level() {
        let table = Table::new(
            "membership",
            [
                Column::integer("group_id").primary_key(),
                Column::integer("user_id").primary_key(),
            ],
        );
        let sql = table.create_sql().unwrap();
        assert!(sql.contains("PRIMARY KEY (group_id, user_id)"));
        assert!(!sql.contains("AUTOINCREMENT"));
    }

    #[test]
    fn metadata_rejects_bad_identifiers_duplicates_and_dangling_references() {
        let mut metadata = Metadata::new();
        metadata.add_table(user_table()).unwrap();

        assert_eq!(
            metadata.add_table(user_table()).unwrap_err(),
            SchemaError::DuplicateTable("user_account".to_string())
        );
        assert_eq!(
            metadata
                .add_table(Table::new("bad name", [Column::integer("id")]))
                .unwrap_err(),
            SchemaError::InvalidIdentifier("bad name".to_string())
        );
        assert_eq!(
            metadata
                .add_table(Table::new(
                    "twice",
                    [Column::integer("x"), Column::integer("x")]
                ))
                .unwrap_err(),
            SchemaError::DuplicateColumn {
                table: "twice".to_string(),
                column: "x".to_string()
            }
        );
        assert_eq!(
            metadata
                .add_table(Table::new(
                    "orphan",
                    [Column::integer("owner").references("nowhere.id")]
                ))
                .unwrap_err(),
            SchemaError::UnknownTable("nowhere".to_string())
        );
        assert!(matches!(
            metadata
                .add_table(Table::new(
                    "broken",
                    [Column::integer("owner").references("user_account")]
                ))
                .unwrap_err(),
            SchemaError::InvalidForeignKey { .. }
        ));
    }

    #[test]
    fn create_all_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        let mut metadata = Metadata::new();
        metadata.add_table(user_table()).unwrap();

        metadata.create_all(&conn).unwrap();
        metadata.create_all(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'user_account'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }
}
