//! Keeps git objects in a relational table and moves them to and from git
//! repositories.
//!
//! Objects are stored in their loose form (zlib-compressed `<kind> <len>\0`
//! header plus body) next to the ids they refer to, so the object graph can
//! be walked without inflating anything. On top of that table sit four
//! operations:
//!
//! - [`import`]: copy what a revision reaches into the table,
//! - [`export`]: write an object and its closure into a repository,
//!   dependencies first, then point a ref at it,
//! - [`collect`]: delete every row not reachable from a keep set,
//! - [`read_tree`] / [`read_blobs`]: look at stored content.
//!
//! Repositories are reached through [`ObjectSource`]; [`GitRepo`] drives
//! the `git` binary and [`MemorySource`] keeps everything in memory.

pub mod config;
pub mod error;
pub mod object;
pub mod oid;
pub mod source;
pub mod store;

#[cfg(test)]
mod testutil;

pub use error::{DecodeError, Error, Result};
pub use object::{ObjectKind, RawObject};
pub use oid::{is_valid_id, Oid};
pub use source::git::GitRepo;
pub use source::memory::MemorySource;
pub use source::ObjectSource;
pub use store::sync::{collect, export, import, Imported};
pub use store::tree::{read_blobs, read_tree, TreeItem};
pub use store::{create_schema, TxScope};
