//! Craft Tracker
//!
//! Plans crafting recipes and tracks how much of each resource has been
//! collected.

mod calculator;
mod catalog;
mod config;
mod db;
mod models;
mod progress;
#[cfg(test)]
mod test_utils;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rusqlite::Connection;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

use crate::catalog::Catalog;
use crate::config::{CONFIG_FILE, DEFAULT_LOG_FILTER, TrackerConfig, View};

#[derive(Parser)]
#[command(name = "craft-tracker")]
#[command(about = "Crafting recipe planner and resource collection tracker")]
struct Cli {
    /// Path to the configuration file
    #[arg(long, default_value = CONFIG_FILE)]
    config: PathBuf,

    /// Catalog JSON file or directory (overrides the config file)
    #[arg(short, long)]
    catalog: Option<PathBuf>,

    /// Path to the SQLite database (overrides the config file)
    #[arg(short, long)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and write the sample catalog if none exists
    Init,

    /// List all recipes in the catalog
    Recipes,

    /// Show details for a recipe
    Recipe {
        /// Recipe ID
        id: String,
    },

    /// Add a recipe to the selection
    Select {
        /// Recipe ID
        id: String,

        /// Number of crafts wanted (defaults to the recipe's own count)
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Remove a recipe from the selection
    Unselect {
        /// Recipe ID
        id: String,
    },

    /// List selected recipes
    Selected,

    /// Show resources required by the selected recipes
    Plan {
        /// Tree per recipe, or merged list per resource
        #[arg(short, long, value_enum)]
        view: Option<View>,
    },

    /// Calculate requirements for a resource without selecting it
    Calc {
        /// Resource to craft (a recipe output id)
        resource: String,

        /// Number of crafts
        #[arg(short = 'n', long, default_value = "1")]
        count: u64,
    },

    /// Set how many units of a resource have been collected
    Collect {
        /// Resource ID
        resource: String,

        /// Collected amount
        count: u64,
    },

    /// List resources that still need collecting
    Remaining,

    /// Clear selections and collected amounts
    Reset,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise start from the default and switch to the
    // config file's filter once it is loaded
    let env_filter = EnvFilter::try_from_default_env().ok();
    let from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER)));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = TrackerConfig::load_from(&cli.config).with_overrides(cli.catalog, cli.database);
    if !from_env {
        if let Err(e) = filter_handle.reload(config.env_filter()) {
            warn!("Failed to apply log filter from config: {e}");
        }
    }
    debug!(?config, "effective configuration");

    let conn = Connection::open(&config.database)
        .with_context(|| format!("Failed to open database {}", config.database.display()))?;
    db::init_schema(&conn)?;

    match cli.command {
        Commands::Init => {
            if config.catalog.exists() {
                println!("Catalog already present at: {}", config.catalog.display());
            } else {
                let sample = Catalog::from_json(catalog::SAMPLE_CATALOG)
                    .context("Bundled sample catalog is invalid")?;
                debug!(entries = sample.len(), "validated sample catalog");
                fs::write(&config.catalog, catalog::SAMPLE_CATALOG).with_context(|| {
                    format!("Failed to write sample catalog {}", config.catalog.display())
                })?;
                println!("Sample catalog written to: {}", config.catalog.display());
            }
            println!("Database initialized at: {}", config.database.display());
        }

        Commands::Recipes => {
            let catalog = load_catalog(&config)?;
            let selected = db::selected_recipes(&conn)?;
            if catalog.recipes().next().is_none() {
                println!("No recipes in catalog. Run 'init' or point --catalog at a recipe file.");
            } else {
                println!(
                    "{:<3} {:<24} {:<20} {:<30} {:>5}",
                    "", "Recipe", "Produces", "Name", "Items"
                );
                println!("{}", "-".repeat(86));
                for recipe in catalog.recipes() {
                    let mark = if selected.contains(&recipe.id) { "*" } else { "" };
                    println!(
                        "{:<3} {:<24} {:<20} {:<30} {:>5}",
                        mark,
                        recipe.id,
                        recipe.output().unwrap_or(""),
                        recipe.info.name,
                        recipe.ingredients().len()
                    );
                }
                println!(
                    "\n{} recipes, {} catalog entries, {} selected",
                    catalog.recipes().count(),
                    catalog.entries().len(),
                    selected.len()
                );
            }
        }

        Commands::Recipe { id } => {
            let catalog = load_catalog(&config)?;
            match catalog.get(&id) {
                Some(entry) => print_entry(entry),
                None => println!("Recipe '{}' not found", id),
            }
        }

        Commands::Select { id, count } => {
            let catalog = load_catalog(&config)?;
            if !catalog.get(&id).is_some_and(|e| e.is_recipe()) {
                bail!("'{id}' is not a recipe in the catalog");
            }
            if db::select_recipe(&conn, &id)? {
                println!("Selected {}", id);
            } else {
                println!("{} is already selected", id);
            }
            if let Some(count) = count {
                db::set_selection_count(&conn, &id, count)?;
                println!("  crafts: {}", count);
            }
        }

        Commands::Unselect { id } => {
            if db::unselect_recipe(&conn, &id)? {
                println!("Unselected {}", id);
            } else {
                println!("{} was not selected", id);
            }
        }

        Commands::Selected => {
            let catalog = load_catalog(&config)?;
            let ids = db::selected_recipes(&conn)?;
            if ids.is_empty() {
                println!("No recipes selected. Use 'select <id>' to add one.");
            } else {
                let selections = catalog.selections(&ids, &db::selection_counts(&conn)?);
                for (id, selection) in ids.iter().zip(&selections) {
                    let name = catalog.get(id).map_or(id.as_str(), |e| e.info.name.as_str());
                    println!(
                        "  {:>4}x {} ({} -> {})",
                        selection.count, name, id, selection.resource_id
                    );
                }
            }
        }

        Commands::Plan { view } => {
            let catalog = load_catalog(&config)?;
            let selections =
                catalog.selections(&db::selected_recipes(&conn)?, &db::selection_counts(&conn)?);
            let collected = db::collected_resources(&conn)?;

            let forest = calculator::build_forest(&selections, &catalog);
            let nodes = calculator::flatten(&forest);
            let merged = calculator::merge(&nodes);
            info!(
                selections = selections.len(),
                nodes = nodes.len(),
                resources = merged.len(),
                "calculated plan"
            );

            match view.unwrap_or(config.view) {
                View::Tree => {
                    let allocated = progress::allocate(&nodes, &collected);
                    for root in &forest {
                        print!("{}", calculator::format_tree(root, &allocated, 0));
                    }
                }
                View::List => {
                    for p in progress::progress(&merged, &collected) {
                        let mark = if p.is_complete() { "[x]" } else { "[ ]" };
                        println!(
                            "{} {:<30} {:>6}/{:<6} ({})",
                            mark,
                            p.resource.info.name,
                            p.collected,
                            p.required(),
                            p.resource.resource_id
                        );
                    }
                }
            }

            println!();
            println!("{}", progress::summarize_plan(&forest, &nodes, &merged, &collected));
        }

        Commands::Calc { resource, count } => {
            let catalog = load_catalog(&config)?;
            let tree = calculator::build_requirement_tree(&resource, count, &catalog, None);
            let nodes = calculator::flatten(std::slice::from_ref(&tree));

            println!("Requirement tree:\n");
            let allocated = progress::allocate(&nodes, &Default::default());
            print!("{}", calculator::format_tree(&tree, &allocated, 0));

            let raw: Vec<_> = nodes.iter().copied().filter(|n| n.is_leaf()).collect();
            println!("\nRaw materials:");
            for m in calculator::merge(&raw) {
                println!("  {:>6}x {} ({})", m.total_required, m.info.name, m.resource_id);
            }
        }

        Commands::Collect { resource, count } => {
            db::set_collected(&conn, &resource, count)?;
            println!("Collected {}: {}", resource, count);
        }

        Commands::Remaining => {
            let catalog = load_catalog(&config)?;
            let selections =
                catalog.selections(&db::selected_recipes(&conn)?, &db::selection_counts(&conn)?);
            let collected = db::collected_resources(&conn)?;

            let forest = calculator::build_forest(&selections, &catalog);
            let merged = calculator::merge(&calculator::flatten(&forest));
            let left = progress::remaining(&merged, &collected);

            if left.is_empty() {
                println!("Nothing left to collect.");
            } else {
                println!("Remaining resources:");
                for p in left {
                    println!(
                        "  {:>6}x {} ({})",
                        p.remaining(),
                        p.resource.info.name,
                        p.resource.resource_id
                    );
                }
            }
        }

        Commands::Reset => {
            db::clear_state(&conn)?;
            println!("Selections and collected amounts cleared.");
        }
    }

    Ok(())
}

fn load_catalog(config: &TrackerConfig) -> Result<Catalog> {
    let catalog = Catalog::load(&config.catalog)
        .with_context(|| format!("Failed to load catalog {}", config.catalog.display()))?;
    if catalog.is_empty() {
        warn!("catalog {} has no entries", config.catalog.display());
    }
    debug!(entries = catalog.len(), "catalog ready");
    Ok(catalog)
}

fn print_entry(entry: &models::CatalogEntry) {
    println!("{}", entry.info.name);
    println!("  ID: {}", entry.id);
    if !entry.info.type_element.is_empty() {
        println!("  Type: {}", entry.info.type_element);
    }
    if let Some(grade) = &entry.info.grade {
        println!("  Grade: {}", grade);
    }
    println!("  Weight: {}  Price: {}", entry.info.weight, entry.info.price);
    if !entry.info.icon.is_empty() {
        println!("  Icon: {}", entry.info.icon);
    }
    if !entry.info.description.is_empty() {
        println!("  {}", entry.info.description);
    }

    let (Some(output), Some(meta)) = (entry.output(), entry.recipe_meta()) else {
        println!("  (raw resource)");
        return;
    };

    println!("  Produces: {} (x{} per selection)", output, entry.default_count());
    if let Some(icon) = &meta.output_icon {
        println!("  Output icon: {}", icon);
    }
    if !meta.recipe.is_empty() {
        println!("  Recipe: {} [{}]", meta.recipe, meta.recipe_type);
    }
    println!("  Chance: {}%  Min level: {}", meta.chance, meta.min_level);
    if let Some(price) = meta.craft_price {
        println!("  Craft price: {}", price);
    }
    if let Some(author) = &meta.author_service {
        println!("  Author: {}", author);
    }

    if !entry.ingredients().is_empty() {
        println!("  Ingredients:");
        for i in entry.ingredients() {
            let grade = i.info.grade.as_deref().map(|g| format!(" [{g}]")).unwrap_or_default();
            let name = if i.info.name.is_empty() { &i.resource_id } else { &i.info.name };
            println!("    {:>4}x {}{} ({})", i.count, name, grade, i.resource_id);
            if let Some(exp) = i.info.need_exp {
                println!("          needs {} exp", exp);
            }
            if let Some(recipe) = &i.craft_recipe {
                println!("          crafted via {}", recipe);
            }
            if !i.original_id.is_empty() {
                println!("          source id {}", i.original_id);
            }
        }
    }
}
