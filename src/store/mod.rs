//! Git objects kept in a relational table.
//!
//! One row per object: the id, the kind, the compressed loose-object bytes
//! and the comma-joined ids the object refers to. The `referred` column is a
//! cache of what decoding `compressed_content` would give; graph walks read
//! only that column so they never inflate content.
//!
//! Every operation runs in one transaction, supplied by the caller or opened
//! here (see [`TxScope`]). Queries over id lists are cut into batches of
//! [`BATCH_ROWS`] to stay under engine parameter limits.

use std::ops::Deref;
use std::path::Path;

use rusqlite::{params, Connection, Transaction};

use crate::error::Result;
use crate::object::RawObject;
use crate::oid;

pub mod batch;
pub mod closure;
pub mod sync;
pub mod tree;

pub const TABLE: &str = "gitobjects";

/// Largest number of ids bound into a single statement.
pub const BATCH_ROWS: usize = 500;

/// Opens (or creates) a database file with write-ahead logging.
pub fn open(path: impl AsRef<Path>) -> Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(conn)
}

pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

/// Creates the object table if it does not exist yet.
pub fn create_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (
            oid CHAR(40) PRIMARY KEY NOT NULL,
            kind CHAR(6) NOT NULL,
            compressed_content BLOB NOT NULL,
            referred TEXT NOT NULL DEFAULT ''
        )"
    ))?;
    Ok(())
}

/// The transaction an operation runs in.
///
/// A borrowed transaction belongs to the caller, who commits or rolls it
/// back. An owned one was opened by the operation: [`TxScope::finish`]
/// commits it, and dropping it unfinished rolls it back.
pub enum TxScope<'a> {
    Borrowed(&'a Transaction<'a>),
    Owned(Transaction<'a>),
}

impl<'a> TxScope<'a> {
    pub fn begin(conn: &'a mut Connection) -> Result<Self> {
        Ok(Self::Owned(conn.transaction()?))
    }

    pub fn finish(self) -> Result<()> {
        match self {
            Self::Owned(tx) => Ok(tx.commit()?),
            Self::Borrowed(_) => Ok(()),
        }
    }
}

impl<'a> Deref for TxScope<'a> {
    type Target = Transaction<'a>;

    fn deref(&self) -> &Self::Target {
        match self {
            Self::Borrowed(tx) => *tx,
            Self::Owned(tx) => tx,
        }
    }
}

impl<'a, 'conn: 'a> From<&'a Transaction<'conn>> for TxScope<'a> {
    fn from(tx: &'a Transaction<'conn>) -> Self {
        Self::Borrowed(tx)
    }
}

/// Inserts one row. Rows are never updated; a duplicate id is an error.
pub(crate) fn insert_object(conn: &Connection, object: &RawObject) -> Result<()> {
    let zcontent = object.encode();
    let referred = object.referred_ids();
    debug_assert_eq!(
        RawObject::decode(&zcontent).map(|fresh| fresh.referred_ids()),
        Ok(referred.clone()),
        "referred cache of {} disagrees with its content",
        object.oid()
    );

    let mut stmt = conn.prepare_cached(&format!(
        "INSERT INTO {TABLE} (oid, kind, compressed_content, referred) VALUES (?1, ?2, ?3, ?4)"
    ))?;
    stmt.execute(params![
        object.oid(),
        object.kind().as_str(),
        zcontent,
        oid::join(&referred, ",")
    ])?;
    Ok(())
}

/// `?,?,…,?` for an `IN` list of `n` ids.
pub(crate) fn placeholders(n: usize) -> String {
    let mut list = "?,".repeat(n);
    list.pop();
    list
}
