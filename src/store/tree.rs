use bstr::{BString, ByteVec};
use tracing::{debug, warn};

use super::batch::read_objects;
use super::TxScope;
use crate::error::Result;
use crate::object::{commit, tree, ObjectKind};
use crate::oid::Oid;

/// A file of a flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub mode: u32,
    pub oid: Oid,
    /// Slash-separated path from the root tree.
    pub path: BString,
}

/// Lists every non-tree entry under `id`, which may name a tree or a commit
/// (whose root tree is used).
///
/// Subtrees are read one level per batch. Items come out level by level,
/// shallow paths first.
pub fn read_tree(scope: TxScope<'_>, id: &Oid) -> Result<Vec<TreeItem>> {
    let mut items = Vec::new();
    let mut frontier: Vec<(Oid, BString)> = vec![(*id, BString::default())];

    while !frontier.is_empty() {
        let ids: Vec<Oid> = frontier.iter().map(|(oid, _)| *oid).collect();
        let objects = read_objects(&scope, &ids)?;

        let mut next = Vec::new();
        for (object, (_, prefix)) in objects.iter().zip(frontier) {
            match object.kind() {
                ObjectKind::Commit => match commit::tree_id(object.body()) {
                    Some(tree) => next.push((tree, prefix)),
                    None => warn!(id = %object.oid(), "commit without a readable tree"),
                },
                ObjectKind::Tree => {
                    for entry in tree::parse(object.body()) {
                        let path = join_path(&prefix, &entry.name);
                        if entry.is_tree() {
                            next.push((entry.oid, path));
                        } else {
                            items.push(TreeItem {
                                mode: entry.mode,
                                oid: entry.oid,
                                path,
                            });
                        }
                    }
                }
                ObjectKind::Blob | ObjectKind::Tag => {}
            }
        }
        debug!(items = items.len(), pending = next.len(), "read tree level");
        frontier = next;
    }

    scope.finish()?;
    Ok(items)
}

fn join_path(prefix: &[u8], name: &[u8]) -> BString {
    let mut path = BString::from(prefix);
    if !path.is_empty() {
        path.push_byte(b'/');
    }
    path.push_str(name);
    path
}

/// Inflated bodies of `ids`, in input order, whatever their kind.
pub fn read_blobs(scope: TxScope<'_>, ids: &[Oid]) -> Result<Vec<Vec<u8>>> {
    let bodies = read_objects(&scope, ids)?
        .into_iter()
        .map(|object| object.into_body())
        .collect();
    scope.finish()?;
    Ok(bodies)
}
