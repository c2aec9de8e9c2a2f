use std::io::{self, Write};

use anyhow::Context;
use clap::Parser;
use cmd::Commands;
use oxigit_store::config::Config;
use oxigit_store::store::{self, sync::default_ref_name};
use oxigit_store::{collect, export, import, read_blobs, read_tree, GitRepo, TxScope};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cmd;

fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = cmd::Cli::parse();
    let config = Config::from_env().with_overrides(cli.database, cli.git);

    let mut conn = store::open(&config.database)
        .with_context(|| format!("Can't open database {}", config.database.display()))?;

    match cli.command {
        Commands::Init => {
            store::create_schema(&conn).with_context(|| "Can't create object table")?;
            info!(database = %config.database.display(), "initialized");
        }
        Commands::Import { repo, rev } => {
            let source = GitRepo::with_git(&repo, &config.git);
            let imported = import(TxScope::begin(&mut conn)?, &source, &rev)
                .with_context(|| format!("Can't import {rev} from {}", repo.display()))?;
            match imported.ref_id {
                Some(id) => println!("{id} {}", imported.ids.len()),
                None => println!("nothing to import"),
            }
        }
        Commands::Export {
            repo,
            oid,
            ref_name,
        } => {
            let dest = GitRepo::with_git(&repo, &config.git);
            let ref_name = ref_name.unwrap_or_else(|| default_ref_name(&oid));
            let scope = TxScope::begin(&mut conn)?;
            let written = export(scope, &dest, &oid, Some(ref_name.as_str()))
                .with_context(|| format!("Can't export {oid} to {}", repo.display()))?;
            println!("{ref_name} {oid} {}", written.len());
        }
        Commands::Gc { keep } => {
            let deleted = collect(TxScope::begin(&mut conn)?, &keep)
                .with_context(|| "Can't collect unreachable objects")?;
            for id in deleted {
                println!("{id}");
            }
        }
        Commands::LsTree { oid } => {
            let items = read_tree(TxScope::begin(&mut conn)?, &oid)
                .with_context(|| format!("Can't read tree {oid}"))?;
            let mut out = io::stdout().lock();
            for item in items {
                writeln!(out, "{:06o} blob {}\t{}", item.mode, item.oid, item.path)?;
            }
        }
        Commands::CatBlobs { oids } => {
            let bodies = read_blobs(TxScope::begin(&mut conn)?, &oids)
                .with_context(|| "Can't read objects")?;
            let mut out = io::stdout().lock();
            for body in bodies {
                writeln!(out, "--")?;
                out.write_all(&body)?;
            }
        }
    }

    Ok(())
}
