use std::collections::{HashMap, HashSet};

use indexmap::IndexSet;
use rusqlite::Connection;
use tracing::debug;

use super::batch::query_by_ids;
use crate::error::Result;
use crate::oid::Oid;

/// Everything reachable from `initial` through the `referred` column,
/// breadth first, without entering `skip`.
///
/// The result starts with `initial` and continues in discovery order. Each
/// layer costs one batched query per [`BATCH_ROWS`](super::BATCH_ROWS) ids,
/// so this is slow on deep histories; prefer a plain existence check when
/// that is enough. Ids without a row are kept in the result but contribute
/// no edges.
pub fn closure(conn: &Connection, initial: &[Oid], skip: &[Oid]) -> Result<Vec<Oid>> {
    let initial: IndexSet<Oid> = initial.iter().copied().collect();
    let mut visited: HashSet<Oid> = initial.iter().chain(skip).copied().collect();
    let mut result: Vec<Oid> = initial.iter().copied().collect();
    let mut frontier = result.clone();

    let mut depth = 0;
    while !frontier.is_empty() {
        let mut next = Vec::new();
        query_by_ids(conn, "referred", &frontier, |row| {
            let referred: String = row.get(0)?;
            for id in referred.split(',').filter(|id| !id.is_empty()) {
                let id: Oid = id.parse()?;
                if visited.insert(id) {
                    next.push(id);
                }
            }
            Ok(())
        })?;
        depth += 1;
        debug!(
            depth,
            frontier = frontier.len(),
            discovered = next.len(),
            "expanded closure layer"
        );
        result.extend_from_slice(&next);
        frontier = next;
    }
    Ok(result)
}

/// Orders `ids` so that every object comes after the objects it refers to.
///
/// Starts from the reverse of `ids` (for a breadth-first discovery list that
/// is already nearly right) and pulls each object's unwritten dependencies
/// in front of it. Edges leaving `ids` are ignored.
pub fn dependency_order(ids: &[Oid], edges: &HashMap<Oid, Vec<Oid>>) -> Vec<Oid> {
    let members: HashSet<Oid> = ids.iter().copied().collect();
    let mut emitted = HashSet::with_capacity(ids.len());
    let mut on_stack = HashSet::new();
    let mut order = Vec::with_capacity(ids.len());

    for &start in ids.iter().rev() {
        if emitted.contains(&start) {
            continue;
        }
        on_stack.insert(start);
        let mut stack = vec![(start, 0)];
        while let Some((id, next_child)) = stack.pop() {
            let children = edges.get(&id).map(Vec::as_slice).unwrap_or_default();
            match children.get(next_child) {
                Some(&child) => {
                    stack.push((id, next_child + 1));
                    let pending = members.contains(&child)
                        && !emitted.contains(&child)
                        && !on_stack.contains(&child);
                    if pending {
                        on_stack.insert(child);
                        stack.push((child, 0));
                    }
                }
                None => {
                    on_stack.remove(&id);
                    if emitted.insert(id) {
                        order.push(id);
                    }
                }
            }
        }
    }
    order
}
