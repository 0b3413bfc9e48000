//! Factory Planner CLI
//!
//! Catalog management, one-shot chain calculation and editing of a saved
//! planner state.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing_subscriber::EnvFilter;

use factory_planner::catalog::Catalog;
use factory_planner::config::{self, PlannerConfig};
use factory_planner::db::{self, SqliteCatalog};
use factory_planner::extract;
use factory_planner::models::{ElementId, ItemCount, ModifierMode, RecipeId, TargetId};
use factory_planner::persist;
use factory_planner::sample;
use factory_planner::Planner;

#[derive(Parser)]
#[command(name = "factory-planner")]
#[command(about = "Production chain planner for factory-building games")]
struct Cli {
    /// Path to the SQLite catalog database
    #[arg(short, long, default_value = "factory_data.db")]
    database: PathBuf,

    /// Path to the saved planner state
    #[arg(short, long, default_value = "planner_state.json")]
    state: PathBuf,

    /// Planner config file (JSON); falls back to $FACTORY_PLANNER_CONFIG
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize empty database with schema
    Init,

    /// Import *.catalog files from a directory
    Import {
        dir: PathBuf,

        /// Clear the existing catalog first
        #[arg(long)]
        clear: bool,
    },

    /// Replace the catalog with built-in sample data
    LoadSample,

    /// List all items in the catalog
    ListItems,

    /// List all recipes in the catalog
    ListRecipes,

    /// Show details for a specific recipe
    Recipe { id: RecipeId },

    /// Calculate a production chain without touching the saved state
    Calc {
        /// Item to produce (e.g. "gear")
        item: String,

        /// Target rate in items per minute
        #[arg(short, long, default_value = "60.0")]
        rate: f64,

        /// Expand every intermediate with its default recipe
        #[arg(short, long)]
        full: bool,

        /// Show the production tree
        #[arg(short, long)]
        verbose: bool,
    },

    /// Manage targets in the saved state
    Target {
        #[command(subcommand)]
        command: TargetCommand,
    },

    /// Source an element from a recipe
    SetRecipe {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
        recipe: RecipeId,

        #[arg(short, long)]
        full: bool,
    },

    /// Switch an element to a non-recipe source
    Source {
        #[command(subcommand)]
        command: SourceCommand,
    },

    /// Change the facility of a recipe-backed element
    Facility {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
        facility: String,

        /// Speed multiplier; defaults to the catalog value
        #[arg(long)]
        speed: Option<f64>,

        /// Pin the facility count
        #[arg(long)]
        count: Option<f64>,
    },

    /// Set the proliferator modifier of a recipe-backed element
    Modifier {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,

        /// none, speed or product
        #[arg(value_parser = parse_mode)]
        mode: ModifierMode,

        level: u8,

        /// Charge item (defaults to proliferator_mk<level>)
        #[arg(long)]
        item: Option<String>,
    },

    /// Show one target's production tree and summary
    Show {
        #[arg(value_parser = parse_target_id)]
        target: TargetId,
    },

    /// Raw resource draw over all targets
    Needs,

    /// Facility counts over all targets
    Facilities,

    /// Aggregated totals graph with layout
    Graph {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum TargetCommand {
    Add {
        item: String,
        rate: f64,

        #[arg(short, long)]
        full: bool,
    },
    Remove {
        #[arg(value_parser = parse_target_id)]
        id: TargetId,
    },
    Rate {
        #[arg(value_parser = parse_target_id)]
        id: TargetId,
        rate: f64,
    },
    List,
}

#[derive(Subcommand)]
enum SourceCommand {
    Mining {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
    },
    Extraction {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
    },
    Gathered {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
    },
    Clear {
        #[arg(value_parser = parse_element_id)]
        element: ElementId,
    },
}

/// Accepts "e12" or "12"
fn parse_element_id(s: &str) -> Result<ElementId, String> {
    let digits = s.strip_prefix('e').unwrap_or(s);
    digits
        .parse()
        .map(ElementId)
        .map_err(|_| format!("invalid element id '{}'", s))
}

/// Accepts "t3" or "3"
fn parse_target_id(s: &str) -> Result<TargetId, String> {
    let digits = s.strip_prefix('t').unwrap_or(s);
    digits
        .parse()
        .map(TargetId)
        .map_err(|_| format!("invalid target id '{}'", s))
}

fn parse_mode(s: &str) -> Result<ModifierMode, String> {
    match s.to_ascii_lowercase().as_str() {
        "none" => Ok(ModifierMode::None),
        "speed" => Ok(ModifierMode::Speed),
        "product" => Ok(ModifierMode::Product),
        _ => Err(format!("unknown modifier mode '{}'", s)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load_config(cli.config.as_deref());

    let conn = Connection::open(&cli.database)
        .with_context(|| format!("Failed to open {}", cli.database.display()))?;
    db::init_schema(&conn)?;

    run(&cli, &conn, config)
}

fn run(cli: &Cli, conn: &Connection, config: PlannerConfig) -> Result<()> {
    match &cli.command {
        Commands::Init => {
            println!("Database initialized at: {}", cli.database.display());
        }

        Commands::Import { dir, clear } => {
            if *clear {
                println!("Clearing existing catalog...");
                db::clear_catalog(conn)?;
            }
            let stats = extract::extract_to_database(conn, dir)?;
            println!("{}", stats);
        }

        Commands::LoadSample => {
            sample::load_sample_data(conn)?;
            println!("Sample catalog loaded successfully!");
        }

        Commands::ListItems => {
            let items = db::list_items(conn)?;
            if items.is_empty() {
                println!("No items in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:<24} {}", "Item", "Name");
                println!("{}", "-".repeat(48));
                for item in items {
                    println!("{:<24} {}", item.id, item.name);
                }
            }
        }

        Commands::ListRecipes => {
            let recipes = db::list_recipes(conn)?;
            if recipes.is_empty() {
                println!("No recipes in database. Run 'import' or 'load-sample' first.");
            } else {
                println!("{:>5} {:<24} {:<12} {:>6}  Slots", "Id", "Name", "Process", "Secs");
                println!("{}", "-".repeat(80));
                for r in recipes {
                    println!(
                        "{:>5} {:<24} {:<12} {:>6.1}  {} -> {}",
                        r.id,
                        r.name,
                        r.process_type,
                        r.cycle_seconds,
                        format_slots(&r.inputs),
                        format_slots(&r.outputs)
                    );
                }
            }
        }

        Commands::Recipe { id } => {
            let catalog = SqliteCatalog::new(conn);
            match catalog.recipe(*id) {
                Some(r) => {
                    println!("Recipe: {}", r.name);
                    println!("  Id: {}", r.id);
                    println!("  Process: {}", r.process_type);
                    println!("  Cycle: {}s", r.cycle_seconds);
                    if let Some(facility) = catalog.default_facility_for(&r.process_type) {
                        println!("  Default facility: {}", facility);
                    }
                    println!("  Inputs:");
                    for slot in &r.inputs {
                        println!("    {} x{}", catalog.item_name(&slot.item_id), slot.count);
                    }
                    println!("  Outputs:");
                    for slot in &r.outputs {
                        println!("    {} x{}", catalog.item_name(&slot.item_id), slot.count);
                    }
                }
                None => println!("Recipe '{}' not found", id),
            }
        }

        Commands::Calc {
            item,
            rate,
            full,
            verbose,
        } => {
            let mut planner = Planner::new(SqliteCatalog::new(conn)).with_config(config);
            let expand = *full || planner.config().expand_fully_by_default;
            let target = planner.add_target_with(item, *rate, expand)?;

            if *verbose {
                println!("Production chain:\n");
                println!("{}", planner.format_production_tree(target));
            }
            if let Some(summary) = planner.summarize_target(target) {
                println!("{}", summary);
            }
        }

        Commands::Target { command } => {
            let mut planner = open_planner(cli, conn, config);
            match command {
                TargetCommand::Add { item, rate, full } => {
                    let expand = *full || planner.config().expand_fully_by_default;
                    let id = planner.add_target_with(item, *rate, expand)?;
                    println!("Added target {} ({} @ {}/min)", id, item, rate);
                }
                TargetCommand::Remove { id } => report(planner.remove_target(*id)),
                TargetCommand::Rate { id, rate } => report(planner.update_target_rate(*id, *rate)?),
                TargetCommand::List => {
                    let state = planner.state();
                    if state.targets.is_empty() {
                        println!("No targets. Add one with 'target add <item> <rate>'.");
                    }
                    for t in &state.targets {
                        println!(
                            "{:<5} {:<24} {:>10.2}/min  root {}",
                            t.id.to_string(),
                            planner.catalog().item_name(&t.item_id),
                            t.rate,
                            t.root
                        );
                    }
                }
            }
        }

        Commands::SetRecipe {
            element,
            recipe,
            full,
        } => {
            let mut planner = open_planner(cli, conn, config);
            report(planner.set_recipe(*element, *recipe, *full));
        }

        Commands::Source { command } => {
            let mut planner = open_planner(cli, conn, config);
            let changed = match command {
                SourceCommand::Mining { element } => planner.set_to_mining(*element),
                SourceCommand::Extraction { element } => planner.set_to_extraction(*element),
                SourceCommand::Gathered { element } => planner.set_to_gathered(*element),
                SourceCommand::Clear { element } => planner.clear_source(*element),
            };
            report(changed);
        }

        Commands::Facility {
            element,
            facility,
            speed,
            count,
        } => {
            let mut planner = open_planner(cli, conn, config);
            let speed = match speed {
                Some(speed) => *speed,
                None => planner
                    .catalog()
                    .facility(facility)
                    .map(|f| f.speed_multiplier)
                    .ok_or_else(|| anyhow!("unknown facility '{}'; pass --speed", facility))?,
            };
            report(planner.set_facility(*element, facility, speed, *count)?);
        }

        Commands::Modifier {
            element,
            mode,
            level,
            item,
        } => {
            let mut planner = open_planner(cli, conn, config);
            report(planner.set_modifier(*element, *mode, *level, item.clone()));
        }

        Commands::Show { target } => {
            let planner = open_planner(cli, conn, config);
            match planner.summarize_target(*target) {
                Some(summary) => {
                    println!("{}", planner.format_production_tree(*target));
                    println!("{}", summary);
                }
                None => println!("Target '{}' not found", target),
            }
        }

        Commands::Needs => {
            let planner = open_planner(cli, conn, config);
            let needs = planner.resource_needs();
            if needs.is_empty() {
                println!("No raw resources needed.");
            }
            for need in needs {
                println!(
                    "{:<24} {:>10.2}/min  ({})",
                    planner.catalog().item_name(&need.item_id),
                    need.rate,
                    need.kind
                );
            }
            let charges = planner.modifier_consumption();
            if !charges.is_empty() {
                println!("\nModifier charges:");
                for (item, rate) in charges {
                    println!("{:<24} {:>10.2}/min", planner.catalog().item_name(&item), rate);
                }
            }
        }

        Commands::Facilities => {
            let planner = open_planner(cli, conn, config);
            for (id, count) in planner.facility_summary() {
                let name = planner
                    .catalog()
                    .facility(&id)
                    .map(|f| f.name)
                    .unwrap_or(id);
                println!("{:>8.2}x {}", count, name);
            }
        }

        Commands::Graph { json } => {
            let planner = open_planner(cli, conn, config);
            let graph = planner.totals_graph();
            if *json {
                println!("{}", serde_json::to_string_pretty(&graph)?);
            } else {
                for node in &graph.nodes {
                    println!(
                        "row {:<2} x {:>8.1} w {:>6.1}  {:<24} {:>10.2}/min{}",
                        node.placement.row,
                        node.placement.x,
                        node.placement.width,
                        node.name,
                        node.required_rate,
                        if node.manual { "  (manual)" } else { "" }
                    );
                }
                println!();
                for edge in &graph.edges {
                    println!(
                        "{} -> {} @ {:.2}/min",
                        edge.supplier, edge.consumer, edge.rate
                    );
                }
            }
        }
    }

    Ok(())
}

/// Planner over the saved state; every change is written back.
fn open_planner<'c>(
    cli: &Cli,
    conn: &'c Connection,
    config: PlannerConfig,
) -> Planner<SqliteCatalog<'c>> {
    let state = persist::load_state(&cli.state);
    let mut planner = Planner::with_state(SqliteCatalog::new(conn), state).with_config(config);
    planner.on_change(persist::file_subscriber(cli.state.clone()));
    planner
}

fn report(changed: bool) {
    if changed {
        println!("Updated.");
    } else {
        println!("Nothing changed (unknown id or not applicable).");
    }
}

fn format_slots(slots: &[ItemCount]) -> String {
    slots
        .iter()
        .map(|s| format!("{}*{}", s.item_id, s.count))
        .collect::<Vec<_>>()
        .join(" + ")
}
