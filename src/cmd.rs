use std::path::PathBuf;

use clap::{Parser, Subcommand};
use oxigit_store::Oid;

#[derive(Parser)]
#[command(about, version)]
pub struct Cli {
    /// Database file [env: OXIGIT_STORE_DB]
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// Git executable [env: OXIGIT_STORE_GIT]
    #[arg(long, global = true)]
    pub git: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the object table
    Init,

    /// Copy the objects a revision reaches into the store
    Import {
        /// Repository or .git directory
        repo: PathBuf,
        /// Revision to import
        #[arg(default_value = "HEAD")]
        rev: String,
    },

    /// Write an object and everything it needs into a repository
    Export {
        /// Repository or .git directory
        repo: PathBuf,
        /// Object to export
        oid: Oid,
        /// Ref to point at it [default: refs/tags/oxigit/<oid>]
        #[arg(long = "ref")]
        ref_name: Option<String>,
    },

    /// Delete every object not reachable from the given ones
    Gc {
        /// Objects to keep
        #[arg(required = true)]
        keep: Vec<Oid>,
    },

    /// List the files under a tree or commit
    LsTree { oid: Oid },

    /// Print object bodies
    CatBlobs {
        #[arg(required = true)]
        oids: Vec<Oid>,
    },
}
