//! Entity records and their storage mapping.
//!
//! # Responsibility
//! - Define `User` and `Address` as plain data records.
//! - Keep the record-to-table association in `mapping`, outside the records.
//!
//! # Invariants
//! - `id == None` means the record has never been persisted.
//! - Ids are assigned by the store only.

pub mod address;
pub mod mapping;
pub mod user;
