use rusqlite::types::{ToSql, ToSqlOutput};
use sha1::{Digest, Sha1};
use std::fmt::{Debug, Display};
use std::str::FromStr;

/// Length of an object id in its hex form.
pub const HEX_LEN: usize = 40;

/// Length of an object id as a raw digest, the form used inside tree bodies.
pub const RAW_LEN: usize = 20;

/// A git object id: the SHA-1 of the object's header and body.
///
/// The only accepted textual form is exactly 40 lowercase hex digits.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Oid {
    hash: [u8; RAW_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid object id: {0:?}")]
pub struct InvalidOid(pub String);

/// Returns true iff `s` is exactly 40 lowercase hex characters.
pub fn is_valid_id(s: &str) -> bool {
    is_valid_hex(s.as_bytes())
}

fn is_valid_hex(s: &[u8]) -> bool {
    s.len() == HEX_LEN && s.iter().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

impl Oid {
    /// Hashes `data` (header and body) into the id it would be stored under.
    pub fn new(data: &[u8]) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(data);
        let hash = hasher.finalize();
        Self { hash: hash.into() }
    }

    /// Builds an id from a raw 20-byte digest.
    pub fn from_raw(raw: &[u8]) -> Option<Self> {
        let hash: [u8; RAW_LEN] = raw.try_into().ok()?;
        Some(Self { hash })
    }

    /// Parses 40 lowercase hex bytes. Anything else yields `None`.
    pub fn from_hex(hex: &[u8]) -> Option<Self> {
        if !is_valid_hex(hex) {
            return None;
        }
        let mut hash = [0; RAW_LEN];
        hex::decode_to_slice(hex, &mut hash).ok()?;
        Some(Self { hash })
    }

    pub fn as_bytes(&self) -> &[u8; RAW_LEN] {
        &self.hash
    }
}

impl Debug for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", base16ct::lower::encode_string(&self.hash))
    }
}

impl Display for Oid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", base16ct::lower::encode_string(&self.hash))
    }
}

impl From<Oid> for String {
    fn from(value: Oid) -> Self {
        value.to_string()
    }
}

impl FromStr for Oid {
    type Err = InvalidOid;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s.as_bytes()).ok_or_else(|| InvalidOid(s.to_owned()))
    }
}

impl TryFrom<String> for Oid {
    type Error = InvalidOid;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ToSql for Oid {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

/// Joins ids with `sep`, the encoding of the `referred` column.
pub fn join(ids: &[Oid], sep: &str) -> String {
    let mut joined = String::with_capacity(ids.len() * (HEX_LEN + sep.len()));
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            joined.push_str(sep);
        }
        joined.push_str(&id.to_string());
    }
    joined
}
