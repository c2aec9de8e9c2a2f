//! Object builders for tests.

use std::collections::BTreeMap;

use bstr::BString;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};

use crate::object::{ObjectKind, RawObject};
use crate::oid::Oid;

const FILE_MODE: u32 = 0o100644;
const DIR_MODE: u32 = 0o40000;

pub fn blob(data: &str) -> RawObject {
    RawObject::new(ObjectKind::Blob, data.as_bytes().to_vec())
}

#[derive(Debug, Clone, Default)]
pub struct TreeBuilder {
    entries: BTreeMap<BString, (u32, Oid)>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, name: &str, oid: Oid) -> Self {
        self.entries.insert(name.into(), (FILE_MODE, oid));
        self
    }

    pub fn dir(mut self, name: &str, oid: Oid) -> Self {
        self.entries.insert(name.into(), (DIR_MODE, oid));
        self
    }

    pub fn build(&self) -> RawObject {
        let mut body = Vec::new();
        for (name, (mode, oid)) in &self.entries {
            body.extend_from_slice(format!("{mode:o} ").as_bytes());
            body.extend_from_slice(name);
            body.push(0);
            body.extend_from_slice(oid.as_bytes());
        }
        RawObject::new(ObjectKind::Tree, body)
    }
}

#[derive(Debug, Clone)]
pub struct Author {
    name: String,
    email: String,
    a_time: DateTime<FixedOffset>,
}

impl Author {
    pub fn new<Tz: TimeZone>(name: &str, email: &str, atime: DateTime<Tz>) -> Self {
        Self {
            a_time: atime.fixed_offset(),
            name: name.to_owned(),
            email: email.to_owned(),
        }
    }

    pub fn string(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.a_time.timestamp(),
            self.a_time.format("%z")
        )
    }
}

pub fn commit(tree: Oid, parents: &[Oid], message: &str) -> RawObject {
    let author = Author::new(
        "Alice",
        "a@example.com",
        Utc.timestamp_opt(1_433_758_557, 0).unwrap(),
    );
    let mut body = format!("tree {tree}\n");
    for parent in parents {
        body.push_str(&format!("parent {parent}\n"));
    }
    body.push_str(&format!(
        "author {}\ncommitter {}\n\n{message}\n",
        author.string(),
        author.string()
    ));
    RawObject::new(ObjectKind::Commit, body.into_bytes())
}
