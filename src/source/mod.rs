//! The filesystem side of a sync: something that can list, read and write
//! git objects and point refs at them.

use crate::error::{Error, Result};
use crate::object::RawObject;
use crate::oid::Oid;

pub mod git;
pub mod lockfile;
pub mod memory;

/// A repository objects are imported from and exported to.
pub trait ObjectSource {
    /// Ids reachable from `rev`: the resolved id of `rev` first, then its
    /// history and content.
    fn list_ids(&self, rev: &str) -> Result<Vec<Oid>>;

    /// Every id reachable from any ref of the repository.
    fn list_all_ids(&self) -> Result<Vec<Oid>>;

    /// Exactly one object per id, in input order.
    fn read_objects(&self, ids: &[Oid]) -> Result<Vec<RawObject>>;

    fn has_id(&self, id: &Oid) -> bool;

    /// Stores an already compressed object. A no-op if it exists.
    fn write_raw_object(&self, id: &Oid, zcontent: &[u8]) -> Result<()>;

    fn write_ref(&self, name: &str, id: &Oid) -> Result<()>;
}

/// Validates a ref name and returns it normalized.
///
/// Only `HEAD`, `refs/heads/*` and `refs/tags/*` are writable. Absolute
/// names and names containing `..` are rejected before normalization.
pub fn check_ref_name(name: &str) -> Result<String> {
    let unsafe_name = || Error::UnsafeRefName(name.to_owned());

    if name.starts_with('/') || name.contains("..") || name.contains('\\') {
        return Err(unsafe_name());
    }
    if name.bytes().any(|b| b.is_ascii_control()) {
        return Err(unsafe_name());
    }

    let clean = name
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect::<Vec<_>>()
        .join("/");

    let allowed =
        clean == "HEAD" || clean.starts_with("refs/heads/") || clean.starts_with("refs/tags/");
    if !allowed {
        return Err(unsafe_name());
    }
    Ok(clean)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_ref_names() {
        assert_eq!(check_ref_name("HEAD").unwrap(), "HEAD");
        assert_eq!(
            check_ref_name("refs/heads/master").unwrap(),
            "refs/heads/master"
        );
        assert_eq!(
            check_ref_name("refs/tags//v1.0/./x").unwrap(),
            "refs/tags/v1.0/x"
        );
    }

    #[test]
    fn rejected_ref_names() {
        for name in [
            "",
            "/etc/passwd",
            "refs/heads/../../config",
            "refs/heads/a..b",
            "refs/heads/",
            "refs/remotes/origin/master",
            "config",
            "objects/ab/cdef",
            "refs/heads/x\ny",
            "refs\\heads\\x",
        ] {
            assert!(
                matches!(check_ref_name(name), Err(Error::UnsafeRefName(_))),
                "{name:?}"
            );
        }
    }
}
