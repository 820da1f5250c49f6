//! User/address repository contract and SQLite-backed façade.
//!
//! # Responsibility
//! - Provide coarse CRUD entry points over `user_account` and `address`.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Caller-owned entities are only updated after a successful commit.
//! - `get_user` filters by `name` only; `fullname` is accepted and ignored.
//! - `get_users_addresses` loads users and addresses in one statement.

use crate::config::StoreConfig;
use crate::engine::Engine;
use crate::model::address::Address;
use crate::model::mapping::Mapped;
use crate::model::user::{User, UserId};
use crate::repo::error::RepoResult;
use crate::result::{ResultSet, Row};
use crate::sql::{select, text, Executable};
use log::{error, info};
use std::time::Instant;

const USERS_WITH_ADDRESSES_SQL: &str = "SELECT
    user_account.id AS user_id,
    user_account.name AS user_name,
    user_account.fullname AS user_fullname,
    address.id AS address_id,
    address.email_address AS address_email_address
FROM user_account
LEFT OUTER JOIN address ON address.user_id = user_account.id
ORDER BY user_account.id ASC, address.id ASC";

/// Repository interface for user and address access.
pub trait UserRepository {
    /// Persists `user` and its attached addresses; assigns ids on success.
    fn add_user(&self, user: &mut User) -> RepoResult<()>;
    /// Users whose `name` matches. `fullname` does not filter.
    fn get_user(&self, name: &str, fullname: &str) -> RepoResult<Vec<User>>;
    /// Attaches `address` to `user` and persists both.
    fn add_user_address(&self, user: &mut User, address: Address) -> RepoResult<()>;
    /// Every user ordered by id, with addresses loaded.
    fn get_users_addresses(&self) -> RepoResult<Vec<User>>;
    /// Runs an arbitrary statement and returns all rows.
    fn exec<S: Executable + ?Sized>(&self, statement: &S) -> RepoResult<ResultSet>;
}

/// SQLite-backed persistence façade owning its engine.
pub struct Repo {
    engine: Engine,
}

impl Repo {
    /// Opens the configured store and creates the entity tables if absent.
    pub fn new(config: StoreConfig) -> RepoResult<Self> {
        let engine = Engine::new(config)?;
        Ok(Self { engine })
    }

    /// Wraps an existing engine, re-running the idempotent schema bootstrap.
    pub fn with_engine(engine: Engine) -> RepoResult<Self> {
        engine.bootstrap()?;
        Ok(Self { engine })
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Persists one address exactly as given, without the association step.
    ///
    /// A dangling `user_id` fails with `RepoError::ReferentialIntegrity`.
    pub fn add_address(&self, address: &mut Address) -> RepoResult<()> {
        let started_at = Instant::now();
        let staged = observe("repo_add_address", started_at, self.stage_address(address))?;
        *address = staged;
        Ok(())
    }

    /// Resolves the back-reference from an address to its owning user.
    pub fn address_owner(&self, address: &Address) -> RepoResult<Option<User>> {
        let Some(user_id) = address.user_id else {
            return Ok(None);
        };
        let started_at = Instant::now();
        let result = self.find_user(user_id);
        observe("repo_address_owner", started_at, result)
    }

    fn find_user(&self, user_id: UserId) -> RepoResult<Option<User>> {
        let mut session = self.engine.open_session()?;
        let mut users: Vec<User> =
            session.query(&select(User::table()).where_eq(User::PRIMARY_KEY, user_id))?;
        session.close()?;
        Ok(users.pop())
    }

    fn users_named(&self, name: &str) -> RepoResult<Vec<User>> {
        let mut session = self.engine.open_session()?;
        let users = session.query(&select(User::table()).where_eq("name", name))?;
        session.close()?;
        Ok(users)
    }

    fn users_with_addresses(&self) -> RepoResult<Vec<User>> {
        let mut session = self.engine.open_session()?;
        let rows = session.execute(&text(USERS_WITH_ADDRESSES_SQL))?;
        session.close()?;
        hydrate_users_with_addresses(&rows)
    }

    fn run_statement<S: Executable + ?Sized>(&self, statement: &S) -> RepoResult<ResultSet> {
        let mut session = self.engine.open_session()?;
        let rows = session.execute(statement)?;
        session.commit()?;
        Ok(rows)
    }

    fn stage_address(&self, address: &Address) -> RepoResult<Address> {
        let mut staged = address.clone();
        let mut session = self.engine.open_session()?;
        session.add_address(&mut staged)?;
        session.commit()?;
        Ok(staged)
    }

    fn stage_user(&self, user: &User) -> RepoResult<User> {
        let mut staged = user.clone();
        let mut session = self.engine.open_session()?;
        session.add_user(&mut staged)?;
        session.commit()?;
        Ok(staged)
    }
}

impl UserRepository for Repo {
    fn add_user(&self, user: &mut User) -> RepoResult<()> {
        let started_at = Instant::now();
        let staged = observe("repo_add_user", started_at, self.stage_user(user))?;
        *user = staged;
        Ok(())
    }

    fn get_user(&self, name: &str, _fullname: &str) -> RepoResult<Vec<User>> {
        let started_at = Instant::now();
        observe("repo_get_user", started_at, self.users_named(name))
    }

    fn add_user_address(&self, user: &mut User, address: Address) -> RepoResult<()> {
        let started_at = Instant::now();
        let mut candidate = user.clone();
        candidate.addresses.push(address);
        let staged = observe(
            "repo_add_user_address",
            started_at,
            self.stage_user(&candidate),
        )?;
        *user = staged;
        Ok(())
    }

    fn get_users_addresses(&self) -> RepoResult<Vec<User>> {
        let started_at = Instant::now();
        observe(
            "repo_get_users_addresses",
            started_at,
            self.users_with_addresses(),
        )
    }

    fn exec<S: Executable + ?Sized>(&self, statement: &S) -> RepoResult<ResultSet> {
        let started_at = Instant::now();
        observe("repo_exec", started_at, self.run_statement(statement))
    }
}

/// Groups joined rows into users, preserving row order.
fn hydrate_users_with_addresses(rows: &ResultSet) -> RepoResult<Vec<User>> {
    let mut users: Vec<User> = Vec::new();
    for row in rows {
        let user_id: UserId = row.get("user_id")?;
        if users.last().and_then(|user| user.id) != Some(user_id) {
            users.push(User {
                id: Some(user_id),
                name: row.get("user_name")?,
                fullname: row.get("user_fullname")?,
                addresses: Vec::new(),
            });
        }
        if let Some(address) = joined_address(row, user_id)? {
            if let Some(user) = users.last_mut() {
                user.addresses.push(address);
            }
        }
    }
    Ok(users)
}

fn joined_address(row: &Row, user_id: UserId) -> RepoResult<Option<Address>> {
    let Some(address_id) = row.get::<Option<i64>>("address_id")? else {
        return Ok(None);
    };
    Ok(Some(Address {
        id: Some(address_id),
        email_address: row.get("address_email_address")?,
        user_id: Some(user_id),
    }))
}

fn observe<T>(event: &str, started_at: Instant, result: RepoResult<T>) -> RepoResult<T> {
    match &result {
        Ok(_) => info!(
            "event={event} module=repo status=ok duration_ms={}",
            started_at.elapsed().as_millis()
        ),
        Err(err) => error!(
            "event={event} module=repo status=error duration_ms={} error_code={} error={}",
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
    result
}
