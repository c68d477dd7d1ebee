//! Person repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD APIs over the `person` table.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Every `(name, age)` pair round-trips unchanged; only SQLite
//!   constraints can reject a write.
//! - Listing order is `id ASC`, which equals insertion order.

use crate::db::DbError;
use crate::model::person::{NewPerson, Person, PersonId, PersonPatch};
use rusqlite::{params, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

const PERSON_SELECT_SQL: &str = "SELECT id, name, age FROM person";

pub type StoreResult<T> = Result<T, StoreError>;

/// Error for person persistence and query operations.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    NotFound(PersonId),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "person not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::NotFound(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for person CRUD operations.
pub trait PersonRepository {
    /// Returns `None` when the conflict policy skipped the row.
    fn insert(&self, person: &NewPerson) -> StoreResult<Option<PersonId>>;
    fn get_by_id(&self, id: PersonId) -> StoreResult<Option<Person>>;
    fn update_by_id(&self, id: PersonId, patch: &PersonPatch) -> StoreResult<usize>;
    fn delete_by_id(&self, id: PersonId) -> StoreResult<usize>;
    fn delete_by_name(&self, name: &str) -> StoreResult<usize>;
    fn select_all(&self) -> StoreResult<Vec<Person>>;
    fn select_by_name(&self, name: &str) -> StoreResult<Vec<Person>>;
}

/// SQLite-backed person repository.
pub struct SqlitePersonRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePersonRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_people(&self, sql: &str, params: impl rusqlite::Params) -> StoreResult<Vec<Person>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut people = Vec::new();
        while let Some(row) = rows.next()? {
            people.push(parse_person_row(row)?);
        }
        Ok(people)
    }
}

impl PersonRepository for SqlitePersonRepository<'_> {
    fn insert(&self, person: &NewPerson) -> StoreResult<Option<PersonId>> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO person (name, age) VALUES (?1, ?2);",
            params![person.name.as_str(), person.age],
        )?;
        if changed == 0 {
            return Ok(None);
        }

        Ok(Some(self.conn.last_insert_rowid()))
    }

    fn get_by_id(&self, id: PersonId) -> StoreResult<Option<Person>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{PERSON_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_person_row(row)?));
        }
        Ok(None)
    }

    fn update_by_id(&self, id: PersonId, patch: &PersonPatch) -> StoreResult<usize> {
        let current = self.get_by_id(id)?.ok_or(StoreError::NotFound(id))?;
        let next = current.patched(patch);

        let changed = self.conn.execute(
            "UPDATE person SET name = ?1, age = ?2 WHERE id = ?3;",
            params![next.name.as_str(), next.age, id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }

        Ok(changed)
    }

    fn delete_by_id(&self, id: PersonId) -> StoreResult<usize> {
        Ok(self.conn.execute("DELETE FROM person WHERE id = ?1;", [id])?)
    }

    fn delete_by_name(&self, name: &str) -> StoreResult<usize> {
        Ok(self
            .conn
            .execute("DELETE FROM person WHERE name = ?1;", [name])?)
    }

    fn select_all(&self) -> StoreResult<Vec<Person>> {
        self.query_people(&format!("{PERSON_SELECT_SQL} ORDER BY id ASC;"), params![])
    }

    fn select_by_name(&self, name: &str) -> StoreResult<Vec<Person>> {
        self.query_people(
            &format!("{PERSON_SELECT_SQL} WHERE name = ?1 ORDER BY id ASC;"),
            [name],
        )
    }
}

fn parse_person_row(row: &Row<'_>) -> StoreResult<Person> {
    Ok(Person {
        id: row.get("id")?,
        name: row.get("name")?,
        age: row.get("age")?,
    })
}
