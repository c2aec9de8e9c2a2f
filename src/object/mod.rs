//! Loose object codec.
//!
//! An object is stored the way git keeps it under `objects/xx/`: the header
//! `"<kind> <len>\0"` followed by the body, deflated with zlib. The id is the
//! SHA-1 of the inflated bytes, so every decode re-derives it from content.

use std::fmt::Display;
use std::io::{Read, Write};
use std::str::FromStr;

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use crate::error::DecodeError;
use crate::oid::Oid;

pub mod commit;
pub mod tree;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    /// Stored and round-tripped, but never expanded into edges.
    Tag,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    pub fn from_bytes(kind: &[u8]) -> Option<Self> {
        match kind {
            b"blob" => Some(Self::Blob),
            b"tree" => Some(Self::Tree),
            b"commit" => Some(Self::Commit),
            b"tag" => Some(Self::Tag),
            _ => None,
        }
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_bytes(s.as_bytes())
            .ok_or_else(|| DecodeError::MalformedHeader(format!("unknown object kind {s:?}")))
    }
}

/// An object in its inflated form. The id always matches the content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    oid: Oid,
    kind: ObjectKind,
    body: Vec<u8>,
}

impl RawObject {
    pub fn new(kind: ObjectKind, body: Vec<u8>) -> Self {
        let oid = Oid::new(&with_header(kind, &body));
        Self { oid, kind, body }
    }

    pub fn oid(&self) -> &Oid {
        &self.oid
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn into_body(self) -> Vec<u8> {
        self.body
    }

    /// Deflates header and body. This is the `compressed_content` column and
    /// the exact bytes of a loose object file.
    pub fn encode(&self) -> Vec<u8> {
        deflate(&with_header(self.kind, &self.body))
    }

    /// Inflates a loose object and derives its id from the content.
    pub fn decode(zcontent: &[u8]) -> Result<Self, DecodeError> {
        let mut content = Vec::new();
        ZlibDecoder::new(zcontent)
            .read_to_end(&mut content)
            .map_err(|e| DecodeError::CorruptContent(e.to_string()))?;

        let nul = match content.iter().position(|&b| b == 0) {
            Some(i) if i > 0 => i,
            _ => {
                return Err(DecodeError::MalformedHeader(
                    "no header delimiter".to_owned(),
                ))
            }
        };

        let (kind, declared) = parse_header(&content[..nul])?;
        let actual = content.len() - nul - 1;
        if declared != actual {
            return Err(DecodeError::SizeMismatch { declared, actual });
        }

        let oid = Oid::new(&content);
        let body = content.split_off(nul + 1);
        Ok(Self { oid, kind, body })
    }

    /// Ids this object directly depends on, in body order.
    pub fn referred_ids(&self) -> Vec<Oid> {
        match self.kind {
            ObjectKind::Blob | ObjectKind::Tag => Vec::new(),
            ObjectKind::Tree => tree::parse(&self.body)
                .into_iter()
                .map(|entry| entry.oid)
                .collect(),
            ObjectKind::Commit => commit::referred_ids(&self.body),
        }
    }
}

fn with_header(kind: ObjectKind, body: &[u8]) -> Vec<u8> {
    let mut content: Vec<u8> = Vec::with_capacity(body.len() + 32);
    content.extend_from_slice(kind.as_str().as_bytes());
    content.push(b' ');
    content.extend_from_slice(body.len().to_string().as_bytes());
    content.push(0);
    content.extend_from_slice(body);
    content
}

fn parse_header(header: &[u8]) -> Result<(ObjectKind, usize), DecodeError> {
    let malformed =
        || DecodeError::MalformedHeader(format!("illegal header {:?}", bstr::BStr::new(header)));

    let Some(space) = header.iter().position(|&b| b == b' ') else {
        return Err(malformed());
    };
    let Some(kind) = ObjectKind::from_bytes(&header[..space]) else {
        return Err(malformed());
    };
    let len = &header[space + 1..];
    if len.is_empty() || !len.iter().all(u8::is_ascii_digit) {
        return Err(malformed());
    }
    let len = std::str::from_utf8(len)
        .ok()
        .and_then(|len| len.parse().ok())
        .ok_or_else(malformed)?;
    Ok((kind, len))
}

pub(crate) fn deflate(content: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    // The sink is an in-memory Vec.
    encoder
        .write_all(content)
        .and_then(|_| encoder.finish())
        .expect("deflating into memory cannot fail")
}
