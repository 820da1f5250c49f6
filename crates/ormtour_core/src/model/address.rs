//! Address entity.

use crate::model::user::{repr_id, UserId};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub type AddressId = i64;

/// E-mail address row.
///
/// `user_id` is the lookup-only back-reference to the owning `User`; the
/// address does not own the user.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    pub id: Option<AddressId>,
    /// Required; the store rejects `NULL`.
    pub email_address: String,
    pub user_id: Option<UserId>,
}

impl Address {
    /// Creates a transient, unassociated address.
    pub fn new(email_address: impl Into<String>) -> Self {
        Self {
            id: None,
            email_address: email_address.into(),
            user_id: None,
        }
    }

    /// Creates a transient address pointing at `user_id` directly.
    pub fn for_user(email_address: impl Into<String>, user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::new(email_address)
        }
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Address(id={}, email_address='{}')",
            repr_id(self.id),
            self.email_address
        )
    }
}
