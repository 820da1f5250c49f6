//! Record-to-table mapping registry.
//!
//! # Responsibility
//! - Associate each entity record type with its declared table.
//! - Convert records to column values and hydrate them from result rows.
//!
//! # Invariants
//! - Every mapped table has a single integer primary key named `id`.
//! - `entity_metadata()` lists tables in foreign key dependency order.

use crate::db::DbResult;
use crate::model::address::Address;
use crate::model::user::{User, USER_NAME_MAX_CHARS};
use crate::result::Row;
use crate::schema::{Column, Metadata, SchemaResult, Table};
use crate::sql::Params;
use once_cell::sync::Lazy;

pub const USER_TABLE_NAME: &str = "user_account";
pub const ADDRESS_TABLE_NAME: &str = "address";

static USER_TABLE: Lazy<Table> = Lazy::new(|| {
    Table::new(
        USER_TABLE_NAME,
        [
            Column::integer("id").primary_key(),
            Column::string("name", Some(USER_NAME_MAX_CHARS)),
            Column::string("fullname", None),
        ],
    )
});

static ADDRESS_TABLE: Lazy<Table> = Lazy::new(|| {
    Table::new(
        ADDRESS_TABLE_NAME,
        [
            Column::integer("id").primary_key(),
            Column::string("email_address", None).not_null(),
            Column::integer("user_id").references(format!("{USER_TABLE_NAME}.id")),
        ],
    )
});

/// Storage mapping for one entity record type.
pub trait Mapped: Sized {
    const PRIMARY_KEY: &'static str = "id";

    fn table() -> &'static Table;
    fn id(&self) -> Option<i64>;
    fn set_id(&mut self, id: i64);
    /// Values of every non primary key column.
    fn column_values(&self) -> Params;
    fn from_row(row: &Row) -> DbResult<Self>;
}

impl Mapped for User {
    fn table() -> &'static Table {
        &USER_TABLE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Params {
        Params::new()
            .set("name", self.name.as_deref())
            .set("fullname", self.fullname.as_deref())
    }

    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            name: row.get("name")?,
            fullname: row.get("fullname")?,
            addresses: Vec::new(),
        })
    }
}

impl Mapped for Address {
    fn table() -> &'static Table {
        &ADDRESS_TABLE
    }

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn column_values(&self) -> Params {
        Params::new()
            .set("email_address", self.email_address.as_str())
            .set("user_id", self.user_id)
    }

    fn from_row(row: &Row) -> DbResult<Self> {
        Ok(Self {
            id: Some(row.get("id")?),
            email_address: row.get("email_address")?,
            user_id: row.get("user_id")?,
        })
    }
}

/// Metadata holding every mapped entity table.
pub fn entity_metadata() -> SchemaResult<Metadata> {
    let mut metadata = Metadata::new();
    metadata.add_table(User::table().clone())?;
    metadata.add_table(Address::table().clone())?;
    Ok(metadata)
}
