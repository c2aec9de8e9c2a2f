use crate::oid::{Oid, HEX_LEN};

const TREE: &[u8] = b"tree ";
const PARENT: &[u8] = b"parent ";

/// The tree a commit points at, read from its fixed-position first line.
pub fn tree_id(body: &[u8]) -> Option<Oid> {
    field(body, TREE)
}

/// The tree id followed by every parent id.
///
/// Parents are read as consecutive `parent <hex>\n` lines; the scan stops at
/// the first line that is not one, normally the author line.
pub fn referred_ids(body: &[u8]) -> Vec<Oid> {
    let Some(tree) = tree_id(body) else {
        return Vec::new();
    };
    let mut ids = vec![tree];
    let mut rest = &body[TREE.len() + HEX_LEN + 1..];
    while let Some(parent) = field(rest, PARENT) {
        ids.push(parent);
        rest = &rest[PARENT.len() + HEX_LEN + 1..];
    }
    ids
}

fn field(data: &[u8], name: &[u8]) -> Option<Oid> {
    let hex = data.strip_prefix(name)?;
    if hex.get(HEX_LEN) != Some(&b'\n') {
        return None;
    }
    Oid::from_hex(&hex[..HEX_LEN])
}

#[cfg(test)]
mod tests {
    use super::*;

    const TREE_ID: &str = "d318a662507e9592830be3a3cbbb2f670b6ce7a5";
    const P1: &str = "7b9fe328531202c2f5c2906b21b3a2677a799c40";
    const P2: &str = "0702d34643a8b644846748a00c425ef76a4634d3";

    fn strings(ids: Vec<Oid>) -> Vec<String> {
        ids.into_iter().map(String::from).collect()
    }

    #[test]
    fn merge_commit() {
        let body = format!(
            "tree {TREE_ID}\nparent {P1}\nparent {P2}\n\
             author Foo <a@example.com> 1433758557 +0800\n\
             committer Foo Wu <a@example.com> 1433758557 +0800\n\
             \n\
             Merge branch 'bbb' into aaa\n"
        );
        let ids = strings(referred_ids(body.as_bytes()));
        assert_eq!(ids, vec![TREE_ID, P1, P2]);
        assert_eq!(tree_id(body.as_bytes()), Some(TREE_ID.parse().unwrap()));
    }

    #[test]
    fn root_commit() {
        let body = format!("tree {TREE_ID}\nauthor A <a@example.com> 1 +0000\n\nmsg\n");
        assert_eq!(strings(referred_ids(body.as_bytes())), vec![TREE_ID]);
    }

    #[test]
    fn invalid_tree_means_no_edges() {
        let upper = TREE_ID.to_uppercase();
        let body = format!("tree {upper}\nparent {P1}\n");
        assert!(referred_ids(body.as_bytes()).is_empty());
        assert!(referred_ids(b"tree abc").is_empty());
        assert!(referred_ids(b"").is_empty());
    }

    #[test]
    fn stops_at_first_invalid_parent() {
        let body = format!("tree {TREE_ID}\nparent {P1}\nparent nothex\nparent {P2}\n");
        assert_eq!(strings(referred_ids(body.as_bytes())), vec![TREE_ID, P1]);

        let body = format!("tree {TREE_ID}\nparent {P1}");
        assert_eq!(strings(referred_ids(body.as_bytes())), vec![TREE_ID]);
    }
}
