//! Command-line tool over a SQLite document database.
//!
//! # Responsibility
//! - Inspect and edit spell links of parent items stored in a database file.
//! - Keep output line-oriented so it can be diffed in scripts.

use clap::{Args, Parser, Subcommand};
use itemspells_core::engine::migrator::migrate_persisted;
use itemspells_core::{
    build_spells_tab, core_version, get_child_spells, init_logging, Context, CoreConfig,
    DocumentStore, FixedAnswer, ItemSpellManager, NoopRenderSink, RemoveOptions,
    SqliteDocumentStore,
};
use log::info;
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "itemspells")]
#[command(about = "Inspect and edit spells granted by items")]
struct Cli {
    /// JSON config file; enables file logging when it names a log dir
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the resolved child spells of a parent item
    Children(ParentArgs),
    /// Print the spells tab view model as JSON
    Tab(ParentArgs),
    /// Rewrite a parent's legacy link entries to the current schema
    Migrate(ParentArgs),
    /// Link a spell to a parent item
    Link {
        #[command(flatten)]
        parent: ParentArgs,
        /// Uuid of the spell to link
        #[arg(long)]
        spell: String,
    },
    /// Remove the link to one child spell
    Unlink {
        #[command(flatten)]
        parent: ParentArgs,
        /// Id of the child spell as listed by `children`
        #[arg(long)]
        child: String,
        /// Delete the owned child spell instead of keeping it unlinked
        #[arg(long)]
        delete: bool,
    },
    /// Print the core version
    Version,
}

#[derive(Args, Debug)]
struct ParentArgs {
    /// SQLite database file
    #[arg(long, value_name = "PATH")]
    db: PathBuf,
    /// Uuid of the parent item
    #[arg(long)]
    parent: String,
    /// Act as a game master
    #[arg(long)]
    gm: bool,
    /// Game system version used for version-gated rules
    #[arg(long, default_value = "4.0.0")]
    system_version: String,
}

impl ParentArgs {
    fn context(&self) -> Context {
        Context::new("cli", self.gm, self.system_version.as_str())
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    if let Some(path) = &cli.config {
        let config = CoreConfig::load(path)?;
        if config.logging.dir.is_some() {
            init_logging(&config.logging)?;
        }
    }

    match cli.command {
        Command::Version => println!("itemspells_core version={}", core_version()),
        Command::Children(args) => {
            let (store, parent) = open_parent(&args)?;
            let children = get_child_spells(store.as_ref(), &parent, false, None).await?;
            for (id, child) in children.iter().flatten() {
                println!(
                    "{id}\t{}\t{}\tpersisted={}",
                    child.name(),
                    child.uuid,
                    child.persisted
                );
            }
        }
        Command::Tab(args) => {
            let ctx = args.context();
            let (store, parent) = open_parent(&args)?;
            let mut manager = manager_for(store, parent, false);
            let children = manager.child_spells().await?.clone();
            let tab = build_spells_tab(&ctx, manager.parent(), &children);
            println!("{}", serde_json::to_string_pretty(&tab)?);
        }
        Command::Migrate(args) => {
            let (store, parent) = open_parent(&args)?;
            let migrated = migrate_persisted(store.as_ref(), &parent).await?;
            let changed = migrated != parent;
            info!("event=cli_migrate module=cli status=ok parent={} changed={changed}", parent.uuid);
            println!("{}\tchanged={changed}", parent.uuid);
        }
        Command::Link { parent, spell } => {
            let ctx = parent.context();
            let (store, document) = open_parent(&parent)?;
            let mut manager = manager_for(store, document, false);
            let children = manager.add_spell_link(&ctx, &spell).await?;
            println!("{}\tchildren={}", parent.parent, children.len());
        }
        Command::Unlink {
            parent,
            child,
            delete,
        } => {
            let ctx = parent.context();
            let (store, document) = open_parent(&parent)?;
            let mut manager = manager_for(store, document, delete);
            let options = RemoveOptions {
                also_delete: delete,
                skip_confirmation: delete,
            };
            let removal = manager.remove_spell_link(&ctx, &child, options).await?;
            println!("{child}\t{removal:?}");
        }
    }
    Ok(())
}

fn open_parent(
    args: &ParentArgs,
) -> Result<(Arc<SqliteDocumentStore>, itemspells_core::Document), Box<dyn Error>> {
    let store = Arc::new(SqliteDocumentStore::open(&args.db)?);
    let parent = store
        .fetch_sync(&args.parent)?
        .ok_or_else(|| format!("parent item not found: {}", args.parent))?;
    Ok((store, parent))
}

fn manager_for(
    store: Arc<SqliteDocumentStore>,
    parent: itemspells_core::Document,
    confirm: bool,
) -> ItemSpellManager {
    ItemSpellManager::new(
        parent,
        store,
        Arc::new(FixedAnswer(confirm)),
        Arc::new(NoopRenderSink),
    )
}
