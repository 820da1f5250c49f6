//! Guided tour over one store: raw SQL, declared tables, then the
//! user/address repository.

use ormtour_core::{
    entity_metadata, insert, select, text, Address, Engine, Mapped, Params, Repo, StoreConfig,
    User, UserRepository,
};
use std::error::Error;
use std::io::Write;

pub type TourResult<T> = Result<T, Box<dyn Error>>;

/// Runs every step against a store opened from `config`.
pub fn run(config: StoreConfig, out: &mut dyn Write) -> TourResult<()> {
    let engine = Engine::new(config)?;
    log::info!(
        "event=tour_start module=cli status=ok location={:?}",
        engine.location()
    );

    hello_world(&engine, out)?;
    commit_as_you_go(&engine, out)?;
    bound_parameters(&engine, out)?;
    declared_tables(&engine, out)?;

    let repo = Repo::with_engine(engine)?;
    repository(&repo, out)?;
    rejected_writes(&repo, out)?;

    log::info!("event=tour_finish module=cli status=ok");
    Ok(())
}

fn heading(out: &mut dyn Write, title: &str) -> TourResult<()> {
    writeln!(out, "\n== {title} ==")?;
    Ok(())
}

fn hello_world(engine: &Engine, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "hello world")?;
    let mut conn = engine.connect()?;
    let greeting = conn.execute("select 'hello world'")?.scalar::<String>()?;
    writeln!(out, "{}", greeting.unwrap_or_default())?;
    Ok(())
}

fn some_table_rows(pairs: &[(i64, i64)]) -> Vec<Params> {
    pairs
        .iter()
        .map(|(x, y)| Params::new().set("x", *x).set("y", *y))
        .collect()
}

fn commit_as_you_go(engine: &Engine, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "commit as you go")?;
    let mut conn = engine.connect()?;
    conn.execute("DROP TABLE IF EXISTS some_table")?;
    conn.execute("CREATE TABLE some_table (x int, y int)")?;
    let inserted = conn.execute_many(
        &text("INSERT INTO some_table (x, y) VALUES (:x, :y)"),
        some_table_rows(&[(1, 1), (2, 4), (6, 8), (9, 10)]),
    )?;
    conn.commit()?;
    writeln!(out, "inserted {inserted} rows")?;

    let rows = conn.execute("SELECT x, y FROM some_table")?;
    for row in &rows {
        let x: i64 = row.get("x")?;
        let y: i64 = row.get("y")?;
        writeln!(out, "x: {x}  y: {y}")?;
    }
    for row in &rows {
        let (x, y) = row.to_tuple::<(i64, i64)>()?;
        writeln!(out, "tuple: ({x}, {y})")?;
    }
    for mapping in rows.mappings() {
        let fields = mapping
            .iter()
            .map(|(key, value)| format!("{key}={value:?}"))
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(out, "mapping: {{{fields}}}")?;
        if let Some(y) = mapping.get("y") {
            writeln!(out, "mapping y: {y:?}")?;
        }
    }
    Ok(())
}

fn bound_parameters(engine: &Engine, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "bound parameters")?;
    {
        let mut conn = engine.connect()?;
        let rows = conn.execute(
            &text("SELECT x, y FROM some_table WHERE y > :y ORDER BY x, y").bind("y", 6),
        )?;
        for row in &rows {
            writeln!(out, "x: {}  y: {}", row.get::<i64>("x")?, row.get::<i64>("y")?)?;
        }
    }

    let mut session = engine.open_session()?;
    let updated = session.execute(
        &text("UPDATE some_table SET y = :y WHERE x = :x")
            .bind("x", 9)
            .bind("y", 11),
    )?;
    session.commit()?;
    writeln!(out, "session updated {} row(s)", updated.rows_affected())?;
    Ok(())
}

fn declared_tables(engine: &Engine, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "declared tables")?;
    let metadata = entity_metadata()?;
    engine.create_all(&metadata)?;

    for table in metadata.tables() {
        writeln!(out, "{}: {:?}", table.name(), table.keys())?;
        writeln!(out, "{}", table.create_sql()?)?;
    }
    let user_table = User::table();
    let primary_key = user_table
        .primary_key()
        .into_iter()
        .map(|column| column.to_string())
        .collect::<Vec<_>>();
    writeln!(out, "primary key: {primary_key:?}")?;

    let stmt = insert(user_table)
        .value("name", "spongebob")
        .value("fullname", "Spongebob Squarepants");
    writeln!(out, "{stmt}")?;

    let mut conn = engine.connect()?;
    let inserted = conn.execute(&stmt)?;
    let many = conn.execute_many(
        &insert(user_table),
        [
            Params::new().set("name", "sandy").set("fullname", "Sandy Cheeks"),
            Params::new().set("name", "patrick").set("fullname", "Patrick Star"),
        ],
    )?;
    conn.commit()?;
    writeln!(
        out,
        "inserted primary key: {:?}, then {many} more",
        inserted.inserted_primary_key()
    )?;

    let rows = conn.execute(&select(user_table).where_eq("name", "spongebob"))?;
    for row in &rows {
        writeln!(out, "{}", User::from_row(row)?)?;
    }
    Ok(())
}

fn repository(repo: &Repo, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "repository")?;
    let mut squidward = User::new("squidward", "Squidward Tentacles");
    repo.add_user(&mut squidward)?;
    writeln!(out, "added {squidward}")?;

    for user in repo.get_user("squidward", "")? {
        writeln!(out, "found {user}")?;
    }

    repo.add_user_address(&mut squidward, Address::new("squidward@sqlalchemy.org"))?;
    repo.add_user_address(&mut squidward, Address::new("clarinet@bikinibottom.org"))?;

    for user in repo.get_users_addresses()? {
        writeln!(out, "{user}")?;
        for address in &user.addresses {
            writeln!(out, "    {address}")?;
        }
    }

    if let Some(address) = squidward.addresses.first() {
        if let Some(owner) = repo.address_owner(address)? {
            writeln!(out, "{address} belongs to {owner}")?;
        }
    }
    Ok(())
}

fn rejected_writes(repo: &Repo, out: &mut dyn Write) -> TourResult<()> {
    heading(out, "rejected writes")?;
    let mut too_long = User::new("a_name_well_beyond_thirty_characters", "Too Long");
    if let Err(err) = repo.add_user(&mut too_long) {
        writeln!(out, "{}: {err}", err.code())?;
    }

    let mut orphan = Address::for_user("nobody@example.com", i64::MAX);
    if let Err(err) = repo.add_address(&mut orphan) {
        writeln!(out, "{}: {err}", err.code())?;
    }
    Ok(())
}
