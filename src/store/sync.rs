//! Import, export and garbage collection.
//!
//! Each operation runs inside the [`TxScope`] it is given. An owned scope is
//! committed on success and rolled back on any error; a borrowed one is left
//! to the caller.

use std::collections::{HashMap, HashSet};

use rusqlite::params_from_iter;
use tracing::{debug, info};

use super::batch::{oid_column, read_contents, unseen, verified};
use super::closure::{closure, dependency_order};
use super::{insert_object, placeholders, TxScope, BATCH_ROWS, TABLE};
use crate::error::{Error, Result};
use crate::oid::Oid;
use crate::source::{check_ref_name, ObjectSource};

/// Outcome of [`import`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Imported {
    /// What the imported revision resolved to, if it listed anything.
    pub ref_id: Option<Oid>,
    /// Ids that were not stored before this import.
    pub ids: Vec<Oid>,
}

/// Copies every object reachable from `rev` in `source` that the table
/// does not have yet. Running it again on an unchanged source imports
/// nothing.
pub fn import<S>(scope: TxScope<'_>, source: &S, rev: &str) -> Result<Imported>
where
    S: ObjectSource + ?Sized,
{
    let listed = source.list_ids(rev)?;
    let Some(&ref_id) = listed.first() else {
        info!(rev, "nothing to import");
        return Ok(Imported::default());
    };

    let ids = unseen(&scope, &listed)?;
    let objects = source.read_objects(&ids)?;
    if objects.len() != ids.len() {
        return Err(Error::Source(format!(
            "asked for {} objects, got {}",
            ids.len(),
            objects.len()
        )));
    }

    for (id, object) in ids.iter().zip(&objects) {
        if object.oid() != id {
            return Err(Error::Source(format!(
                "asked for {id}, got {}",
                object.oid()
            )));
        }
        insert_object(&scope, object)?;
    }

    scope.finish()?;
    info!(rev, %ref_id, listed = listed.len(), imported = ids.len(), "import complete");
    Ok(Imported {
        ref_id: Some(ref_id),
        ids,
    })
}

/// The ref [`export`] updates when the caller names none.
pub fn default_ref_name(id: &Oid) -> String {
    format!("refs/tags/oxigit/{id}")
}

/// Writes `id` and everything it needs that `dest` lacks, then points
/// `ref_name` at it. Objects are written dependencies first.
///
/// Returns the written ids in discovery order, `id` first.
pub fn export<S>(
    scope: TxScope<'_>,
    dest: &S,
    id: &Oid,
    ref_name: Option<&str>,
) -> Result<Vec<Oid>>
where
    S: ObjectSource + ?Sized,
{
    let ref_name = match ref_name {
        Some(name) => check_ref_name(name)?,
        None => check_ref_name(&default_ref_name(id))?,
    };

    if dest.has_id(id) {
        dest.write_ref(&ref_name, id)?;
        scope.finish()?;
        info!(%id, ref_name = %ref_name, "destination already up to date");
        return Ok(Vec::new());
    }

    let existing = dest.list_all_ids()?;
    let ids = closure(&scope, &[*id], &existing)?;
    let contents = read_contents(&scope, &ids)?;

    let mut edges = HashMap::with_capacity(ids.len());
    for id in &ids {
        let zcontent = contents.get(id).ok_or(Error::MissingObject(*id))?;
        edges.insert(*id, verified(id, zcontent)?.referred_ids());
    }

    for id in dependency_order(&ids, &edges) {
        let zcontent = contents.get(&id).ok_or(Error::MissingObject(id))?;
        dest.write_raw_object(&id, zcontent)?;
        debug!(%id, "wrote object");
    }
    dest.write_ref(&ref_name, id)?;

    scope.finish()?;
    info!(
        %id,
        ref_name = %ref_name,
        exported = ids.len(),
        skipped = existing.len(),
        "export complete"
    );
    Ok(ids)
}

/// Mark and sweep: deletes every row not reachable from `keep`.
///
/// The sweep scans the whole table.
pub fn collect(scope: TxScope<'_>, keep: &[Oid]) -> Result<Vec<Oid>> {
    let reachable: HashSet<Oid> = closure(&scope, keep, &[])?.into_iter().collect();

    let mut deletable = Vec::new();
    {
        let mut stmt = scope.prepare(&format!("SELECT oid FROM {TABLE}"))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let oid = oid_column(row, 0)?;
            if !reachable.contains(&oid) {
                deletable.push(oid);
            }
        }
    }

    for chunk in deletable.chunks(BATCH_ROWS) {
        scope.execute(
            &format!(
                "DELETE FROM {TABLE} WHERE oid IN ({})",
                placeholders(chunk.len())
            ),
            params_from_iter(chunk),
        )?;
    }

    scope.finish()?;
    info!(
        keep = keep.len(),
        reachable = reachable.len(),
        deleted = deletable.len(),
        "collection complete"
    );
    Ok(deletable)
}
