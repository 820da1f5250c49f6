//! User entity.

use crate::model::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Store-assigned surrogate key of `user_account`.
pub type UserId = i64;

pub const USER_NAME_MAX_CHARS: u32 = 30;

/// Account record owning zero or more addresses.
///
/// `addresses` is only populated by operations that load it explicitly
/// (`get_users_addresses`) or by the caller before persisting.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct User {
    pub id: Option<UserId>,
    /// At most `USER_NAME_MAX_CHARS` characters; enforced by the store.
    /// The column is nullable, so rows written through raw SQL may lack it.
    pub name: Option<String>,
    pub fullname: Option<String>,
    #[serde(default)]
    pub addresses: Vec<Address>,
}

impl User {
    /// Creates a transient user with no id.
    pub fn new(name: impl Into<String>, fullname: impl Into<String>) -> Self {
        Self {
            id: None,
            name: Some(name.into()),
            fullname: Some(fullname.into()),
            addresses: Vec::new(),
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

impl Display for User {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "User(id={}, name={}, fullname={})",
            repr_id(self.id),
            repr_text(self.name.as_deref()),
            repr_text(self.fullname.as_deref())
        )
    }
}

fn repr_text(value: Option<&str>) -> String {
    value.map_or_else(|| "None".to_string(), |value| format!("'{value}'"))
}

pub(crate) fn repr_id(id: Option<i64>) -> String {
    id.map_or_else(|| "None".to_string(), |id| id.to_string())
}
