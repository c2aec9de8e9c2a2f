use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use rusqlite::{params_from_iter, Connection, Row};

use super::{placeholders, BATCH_ROWS, TABLE};
use crate::error::{Error, Result};
use crate::object::RawObject;
use crate::oid::Oid;

/// Runs `SELECT <columns> ... WHERE oid IN (...)` over `ids`, at most
/// [`BATCH_ROWS`] ids per statement, and hands every row to `on_row`.
///
/// Rows come back in whatever order the engine picks. No statement is
/// executed for an empty id list.
pub fn query_by_ids<F>(conn: &Connection, columns: &str, ids: &[Oid], mut on_row: F) -> Result<()>
where
    F: FnMut(&Row<'_>) -> Result<()>,
{
    for chunk in ids.chunks(BATCH_ROWS) {
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {columns} FROM {TABLE} WHERE oid IN ({})",
            placeholders(chunk.len())
        ))?;
        let mut rows = stmt.query(params_from_iter(chunk))?;
        while let Some(row) = rows.next()? {
            on_row(row)?;
        }
    }
    Ok(())
}

/// Reads an `oid` column value, rejecting anything that is not an id.
pub(crate) fn oid_column(row: &Row<'_>, idx: usize) -> Result<Oid> {
    Ok(row.get::<_, String>(idx)?.parse()?)
}

/// The ids that have no row yet, deduplicated, in input order.
pub fn unseen(conn: &Connection, ids: &[Oid]) -> Result<Vec<Oid>> {
    let ids: IndexSet<Oid> = ids.iter().copied().collect();
    let ids: Vec<Oid> = ids.into_iter().collect();

    let mut existing = HashSet::new();
    query_by_ids(conn, "oid", &ids, |row| {
        existing.insert(oid_column(row, 0)?);
        Ok(())
    })?;

    let unseen = ids.into_iter().filter(|id| !existing.contains(id));
    Ok(unseen.collect())
}

/// Compressed content keyed by id. Ids without a row are simply absent.
pub fn read_contents(conn: &Connection, ids: &[Oid]) -> Result<HashMap<Oid, Vec<u8>>> {
    let mut contents = HashMap::with_capacity(ids.len());
    query_by_ids(conn, "oid, compressed_content", ids, |row| {
        contents.insert(oid_column(row, 0)?, row.get(1)?);
        Ok(())
    })?;
    Ok(contents)
}

/// Decoded objects in input order.
///
/// Every row is verified against its key; an id without a row is a
/// [`Error::MissingObject`].
pub fn read_objects(conn: &Connection, ids: &[Oid]) -> Result<Vec<RawObject>> {
    let mut objects = HashMap::with_capacity(ids.len());
    for (oid, zcontent) in read_contents(conn, ids)? {
        objects.insert(oid, verified(&oid, &zcontent)?);
    }

    ids.iter()
        .map(|id| objects.get(id).cloned().ok_or(Error::MissingObject(*id)))
        .collect()
}

/// Decodes `zcontent` and checks that it really is `oid`.
pub(crate) fn verified(oid: &Oid, zcontent: &[u8]) -> Result<RawObject> {
    let object = RawObject::decode(zcontent)?;
    if object.oid() != oid {
        return Err(Error::HashMismatch {
            expected: *oid,
            actual: *object.oid(),
        });
    }
    Ok(object)
}
