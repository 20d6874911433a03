use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wisdomgraph_api::MapRecord;
use wisdomgraph_app::{AppConfig, FileContentProvider, MapController, codec};
use wisdomgraph_core::{LayoutDirection, Level, NodeId};
use wisdomgraph_storage::Storage;

#[derive(Parser, Debug)]
#[command(author, version, about = "Build and explore learning maps", long_about = None)]
struct Args {
    /// Path to a JSON config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the SQLite database of saved maps
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new map for a topic
    Generate {
        #[arg(long)]
        topic: String,
        #[arg(long, default_value = "beginner")]
        level: Level,
        /// Directory of canned provider responses
        #[arg(long)]
        provider_dir: Option<PathBuf>,
        #[arg(long)]
        out: PathBuf,
    },
    /// Attach generated subtopics under one node of an exported map
    Expand {
        #[arg(long)]
        map: PathBuf,
        #[arg(long)]
        node: String,
        #[arg(long)]
        provider_dir: Option<PathBuf>,
        /// Defaults to overwriting --map
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Lay out an exported map again
    Relayout {
        #[arg(long)]
        map: PathBuf,
        #[arg(long)]
        direction: Option<LayoutDirection>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Store an exported map under an owner
    Save {
        #[arg(long)]
        map: PathBuf,
        #[arg(long)]
        owner: String,
    },
    /// List an owner's saved maps, newest first
    List {
        #[arg(long)]
        owner: String,
    },
    /// Print or export a saved map
    Show {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Delete a saved map
    Delete {
        #[arg(long)]
        owner: String,
        #[arg(long)]
        id: String,
    },
}

fn load_config(args: &Args) -> Result<AppConfig> {
    let mut config = match args.config.clone().or_else(AppConfig::default_path) {
        Some(path) => AppConfig::load(&path)?,
        None => AppConfig::default(),
    };
    if let Some(db) = &args.db {
        config.database_path = Some(db.clone());
    }
    Ok(config)
}

fn provider_dir(config: &AppConfig, flag: Option<PathBuf>) -> Result<PathBuf> {
    flag.or_else(|| config.provider_dir.clone())
        .ok_or_else(|| anyhow!("no provider directory: pass --provider-dir or set provider_dir"))
}

fn build_controller(config: &AppConfig, provider_dir: PathBuf) -> MapController {
    MapController::new(Arc::new(FileContentProvider::new(provider_dir)), config.layout)
}

fn open_store(config: &AppConfig) -> Result<Arc<Storage>> {
    let path = config.database_path();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    Ok(Arc::new(Storage::open(&path)?))
}

fn read_record(path: &Path) -> Result<MapRecord> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(codec::from_json(&text)?)
}

fn write_record(record: &MapRecord, path: &Path) -> Result<()> {
    std::fs::write(path, codec::to_json_pretty(record)?)
        .with_context(|| format!("writing {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Generate {
            topic,
            level,
            provider_dir: dir,
            out,
        } => {
            let controller = build_controller(&config, provider_dir(&config, dir)?);
            let session = controller.generate(&topic, level).await?;
            write_record(&controller.export()?, &out)?;
            let map = session.snapshot();
            println!(
                "Generated '{}' ({}): {} nodes, {} edges -> {}",
                map.topic(),
                map.level(),
                map.model.node_count(),
                map.model.edge_count(),
                out.display()
            );
        }
        Command::Expand {
            map,
            node,
            provider_dir: dir,
            out,
        } => {
            let controller = build_controller(&config, provider_dir(&config, dir)?);
            controller.import(&read_record(&map)?)?;
            let outcome = controller.expand(&NodeId::new(node.as_str())).await?;
            let out = out.unwrap_or(map);
            write_record(&controller.export()?, &out)?;
            println!("Added {} nodes under {node}:", outcome.added.len());
            for id in &outcome.added {
                if let Some(added) = outcome.snapshot.model.get_node(id) {
                    println!("  {id}  {}", added.label);
                }
            }
        }
        Command::Relayout {
            map,
            direction,
            out,
        } => {
            let controller = build_controller(&config, PathBuf::from("."));
            controller.import(&read_record(&map)?)?;
            let layout = match direction {
                Some(direction) => config.layout.with_direction(direction),
                None => config.layout,
            };
            let relaid = controller.relayout(&layout)?;
            let out = out.unwrap_or(map);
            write_record(&controller.export()?, &out)?;
            println!(
                "Laid out {} nodes -> {}",
                relaid.model.node_count(),
                out.display()
            );
        }
        Command::Save { map, owner } => {
            let store = open_store(&config)?;
            let controller = build_controller(&config, PathBuf::from(".")).with_store(store);
            controller.import(&read_record(&map)?)?;
            let id = controller.save(&owner)?;
            println!("{id}");
        }
        Command::List { owner } => {
            let store = open_store(&config)?;
            let controller = build_controller(&config, PathBuf::from(".")).with_store(store);
            let saved_maps = controller.list_saved(&owner)?;
            let total = controller.count_saved(&owner)?;
            for saved in &saved_maps {
                println!(
                    "{}  {}  {:?}  {} nodes",
                    saved.id,
                    saved.created_at.to_rfc3339(),
                    saved.record.level,
                    saved.record.nodes.len()
                );
                println!("    {}", saved.record.topic);
            }
            if total > saved_maps.len() {
                println!("Showing {} of {total} maps.", saved_maps.len());
            }
        }
        Command::Show { owner, id, out } => {
            let store = open_store(&config)?;
            let controller = build_controller(&config, PathBuf::from(".")).with_store(store);
            let saved = controller.get_saved(&owner, &id)?;
            match out {
                Some(out) => write_record(&saved.record, &out)?,
                None => println!("{}", codec::to_json_pretty(&saved.record)?),
            }
        }
        Command::Delete { owner, id } => {
            let store = open_store(&config)?;
            let controller = build_controller(&config, PathBuf::from(".")).with_store(store);
            controller.delete_saved(&owner, &id)?;
            tracing::info!(map_id = %id, "deleted");
            println!("Deleted {id}");
        }
    }

    Ok(())
}
