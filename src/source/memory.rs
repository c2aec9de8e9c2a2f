use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::RwLock;

use indexmap::IndexMap;

use super::{check_ref_name, ObjectSource};
use crate::error::{Error, Result};
use crate::object::RawObject;
use crate::oid::Oid;

/// In-memory repository.
///
/// Intended for tests and embedding. Unlike a loose-object directory it
/// refuses a raw write whose dependencies are not present yet, and it keeps
/// the order of accepted writes.
#[derive(Default)]
pub struct MemorySource {
    objects: RwLock<IndexMap<Oid, RawObject>>,
    refs: RwLock<BTreeMap<String, Oid>>,
    writes: RwLock<Vec<Oid>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an object without any completeness check.
    pub fn insert(&self, object: RawObject) -> Oid {
        let oid = *object.oid();
        self.objects
            .write()
            .expect("lock poisoned")
            .entry(oid)
            .or_insert(object);
        oid
    }

    pub fn len(&self) -> usize {
        self.objects.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: &Oid) -> bool {
        self.objects.read().expect("lock poisoned").contains_key(id)
    }

    pub fn get(&self, id: &Oid) -> Option<RawObject> {
        self.objects.read().expect("lock poisoned").get(id).cloned()
    }

    pub fn resolve(&self, name: &str) -> Option<Oid> {
        self.refs.read().expect("lock poisoned").get(name).copied()
    }

    /// Ids accepted by `write_raw_object`, in write order.
    pub fn written(&self) -> Vec<Oid> {
        self.writes.read().expect("lock poisoned").clone()
    }

    fn resolve_rev(&self, rev: &str) -> Result<Oid> {
        self.resolve(rev)
            .or_else(|| rev.parse().ok())
            .filter(|oid| self.contains(oid))
            .ok_or_else(|| Error::Source(format!("unknown revision {rev:?}")))
    }
}

impl ObjectSource for MemorySource {
    fn list_ids(&self, rev: &str) -> Result<Vec<Oid>> {
        let root = self.resolve_rev(rev)?;
        let objects = self.objects.read().expect("lock poisoned");

        let mut seen = HashSet::from([root]);
        let mut ids = vec![root];
        let mut queue = VecDeque::from([root]);
        while let Some(id) = queue.pop_front() {
            let Some(object) = objects.get(&id) else {
                continue;
            };
            for referred in object.referred_ids() {
                if objects.contains_key(&referred) && seen.insert(referred) {
                    ids.push(referred);
                    queue.push_back(referred);
                }
            }
        }
        Ok(ids)
    }

    fn list_all_ids(&self) -> Result<Vec<Oid>> {
        Ok(self
            .objects
            .read()
            .expect("lock poisoned")
            .keys()
            .copied()
            .collect())
    }

    fn read_objects(&self, ids: &[Oid]) -> Result<Vec<RawObject>> {
        let objects = self.objects.read().expect("lock poisoned");
        ids.iter()
            .map(|id| {
                objects
                    .get(id)
                    .cloned()
                    .ok_or_else(|| Error::Source(format!("missing object {id}")))
            })
            .collect()
    }

    fn has_id(&self, id: &Oid) -> bool {
        self.contains(id)
    }

    fn write_raw_object(&self, id: &Oid, zcontent: &[u8]) -> Result<()> {
        if self.contains(id) {
            return Ok(());
        }
        let object = RawObject::decode(zcontent)?;
        if object.oid() != id {
            return Err(Error::HashMismatch {
                expected: *id,
                actual: *object.oid(),
            });
        }

        let mut objects = self.objects.write().expect("lock poisoned");
        if let Some(missing) = object
            .referred_ids()
            .into_iter()
            .find(|referred| !objects.contains_key(referred))
        {
            return Err(Error::MissingObject(missing));
        }
        objects.insert(*id, object);
        self.writes.write().expect("lock poisoned").push(*id);
        Ok(())
    }

    fn write_ref(&self, name: &str, id: &Oid) -> Result<()> {
        let name = check_ref_name(name)?;
        self.refs.write().expect("lock poisoned").insert(name, *id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{blob, commit, TreeBuilder};

    #[test]
    fn lists_history_and_content_from_a_ref() {
        let source = MemorySource::new();
        let a = source.insert(blob("a"));
        let tree = source.insert(TreeBuilder::new().file("a", a).build());
        let first = source.insert(commit(tree, &[], "first"));
        let second = source.insert(commit(tree, &[first], "second"));
        source.write_ref("refs/heads/master", &second).unwrap();

        assert_eq!(
            source.list_ids("refs/heads/master").unwrap(),
            vec![second, tree, first, a]
        );
        let listed = source.list_ids(&first.to_string()).unwrap();
        assert_eq!(listed, vec![first, tree, a]);
        assert!(matches!(source.list_ids("nope"), Err(Error::Source(_))));
    }

    #[test]
    fn raw_writes_need_their_dependencies() {
        let source = MemorySource::new();
        let a = blob("a");
        let tree = TreeBuilder::new().file("a", *a.oid()).build();

        assert!(matches!(
            source.write_raw_object(tree.oid(), &tree.encode()),
            Err(Error::MissingObject(id)) if id == *a.oid()
        ));
        source.write_raw_object(a.oid(), &a.encode()).unwrap();
        source.write_raw_object(tree.oid(), &tree.encode()).unwrap();
        source.write_raw_object(tree.oid(), &tree.encode()).unwrap();
        assert_eq!(source.written(), vec![*a.oid(), *tree.oid()]);

        assert!(matches!(
            source.write_raw_object(a.oid(), &tree.encode()),
            Ok(())
        ));
        let b = blob("b");
        assert!(matches!(
            source.write_raw_object(b.oid(), &a.encode()),
            Err(Error::HashMismatch { .. })
        ));
    }
}
