use bstr::BString;

use crate::oid::{Oid, RAW_LEN};

/// Mode bit set on every non-directory entry (files, symlinks, gitlinks).
const LEAF_BIT: u32 = 0o100000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: u32,
    pub name: BString,
    pub oid: Oid,
}

impl TreeEntry {
    pub fn is_tree(&self) -> bool {
        self.mode & LEAF_BIT == 0
    }
}

/// Parses a tree body: repeated `<octal mode> <name>\0<20-byte digest>`.
///
/// A record with an empty mode, an empty name or a mode that is not octal is
/// skipped together with its digest; the rest of the tree is still returned.
pub fn parse(body: &[u8]) -> Vec<TreeEntry> {
    let mut entries = Vec::new();
    let mut start = 0;
    let mut space = None;
    let mut pos = 0;

    // `pos + RAW_LEN < len` keeps the digest after a NUL inside the body.
    while pos + RAW_LEN < body.len() {
        match body[pos] {
            b' ' if space.is_none() => space = Some(pos),
            0 => {
                let digest = &body[pos + 1..pos + 1 + RAW_LEN];
                match space.and_then(|space| record(body, start, space, pos, digest)) {
                    Some(entry) => entries.push(entry),
                    None => tracing::debug!(offset = start, "skipping malformed tree record"),
                }
                pos += RAW_LEN + 1;
                start = pos;
                space = None;
                continue;
            }
            _ => {}
        }
        pos += 1;
    }
    entries
}

fn record(body: &[u8], start: usize, space: usize, nul: usize, digest: &[u8]) -> Option<TreeEntry> {
    if start >= space || space + 1 >= nul {
        return None;
    }
    let mode = std::str::from_utf8(&body[start..space]).ok()?;
    let mode = u32::from_str_radix(mode, 8).ok()?;
    Some(TreeEntry {
        mode,
        name: BString::from(&body[space + 1..nul]),
        oid: Oid::from_raw(digest)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(entries: &[TreeEntry]) -> Vec<String> {
        entries.iter().map(|e| e.oid.to_string()).collect()
    }

    #[test]
    fn two_entries_in_order() {
        let body = b"100644 a\x00\x01\x00\x02\x00\x03\x00\x04\x00\x05\x00\x06\x00\x07\x00\x08\x00\x09\x00\x00\x00\
100644 b\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\x00\xf1";
        let entries = parse(body);
        assert_eq!(
            ids(&entries),
            vec![
                "0100020003000400050006000700080009000000",
                "00000000000000000000000000000000000000f1"
            ]
        );
        assert_eq!(entries[0].name, "a");
        assert_eq!(entries[1].name, "b");
        assert_eq!(entries[0].mode, 0o100644);
        assert!(!entries[0].is_tree());
    }

    #[test]
    fn directories_and_names_with_spaces() {
        let mut body = Vec::new();
        body.extend_from_slice(b"40000 sub dir\0");
        body.extend_from_slice(&[0x11; 20]);
        body.extend_from_slice(b"120000 link\0");
        body.extend_from_slice(&[0x22; 20]);
        body.extend_from_slice(b"160000 module\0");
        body.extend_from_slice(&[0x33; 20]);

        let entries = parse(&body);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "sub dir");
        assert!(entries[0].is_tree());
        assert!(!entries[1].is_tree());
        assert!(!entries[2].is_tree());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let mut body = Vec::new();
        body.extend_from_slice(b"100644 \0");
        body.extend_from_slice(&[0x44; 20]);
        body.extend_from_slice(b"nomode\0");
        body.extend_from_slice(&[0x55; 20]);
        body.extend_from_slice(b"100944 bad\0");
        body.extend_from_slice(&[0x66; 20]);
        body.extend_from_slice(b"100644 good\0");
        body.extend_from_slice(&[0x77; 20]);

        let entries = parse(&body);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "good");
        assert_eq!(entries[0].oid.as_bytes(), &[0x77; 20]);
    }

    #[test]
    fn truncated_digest_is_ignored() {
        let mut body = Vec::new();
        body.extend_from_slice(b"100644 a\0");
        body.extend_from_slice(&[0x01; 20]);
        body.extend_from_slice(b"100644 b\0");
        body.extend_from_slice(&[0x02; 19]);
        assert_eq!(parse(&body).len(), 1);
        assert!(parse(b"").is_empty());
        assert!(parse(b"100644 a\0").is_empty());
    }
}
