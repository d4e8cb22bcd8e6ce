use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mealplan::models::format_quantity;
use mealplan::planner::{Planner, SUGGESTION_BASE_SERVINGS};
use mealplan::suggest::SuggestClient;
use mealplan::{api, db};

#[derive(Parser)]
#[command(name = "mealplan")]
#[command(about = "Household meal planner with a consolidated shopping list")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the meal planner server
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Print the consolidated shopping list
    Shopping,
    /// Export all data to a JSON backup
    Export {
        /// Output file (default: mealplan_backup_<date>.json)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Replace all data from a JSON backup
    Import {
        /// Backup file to import
        path: PathBuf,
    },
    /// Ask the suggestion service for a dish's ingredients
    Suggest {
        /// Name of the dish
        meal_name: String,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "mealplan=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn open_planner() -> anyhow::Result<Planner> {
    let db = db::Database::open_default()?;
    db.migrate()?;
    Planner::load(db)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Some(Commands::Serve { port }) => serve(port).await?,
        // Default: start the server
        None => serve(3000).await?,
        Some(Commands::Shopping) => {
            let planner = open_planner()?;
            print_shopping_list(&planner);
        }
        Some(Commands::Export { out }) => {
            let planner = open_planner()?;
            let path = out.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "mealplan_backup_{}.json",
                    chrono::Utc::now().format("%Y-%m-%d")
                ))
            });
            let snapshot = planner.export_snapshot();
            let json = serde_json::to_string_pretty(&snapshot)?;
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write backup to {}", path.display()))?;
            println!("Exported to {}", path.display());
        }
        Some(Commands::Import { path }) => {
            let planner = open_planner()?;
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read backup from {}", path.display()))?;
            match planner.import_snapshot(&text) {
                Ok(()) => println!("Imported {}", path.display()),
                Err(e) => anyhow::bail!("Import rejected, current data left untouched: {e}"),
            }
        }
        Some(Commands::Suggest { meal_name }) => {
            let client = SuggestClient::from_env();
            let suggestions = client.suggest_ingredients(&meal_name, None).await?;
            if suggestions.is_empty() {
                println!("No suggestions for \"{meal_name}\".");
            } else {
                println!("Ingredients for \"{meal_name}\" ({SUGGESTION_BASE_SERVINGS} servings):");
                for ingredient in suggestions {
                    println!(
                        "- {}: {} {}",
                        ingredient.name,
                        format_quantity(ingredient.quantity),
                        ingredient.unit
                    );
                }
            }
        }
    }

    Ok(())
}

async fn serve(port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting meal planner server on port {}", port);

    let planner = open_planner()?;
    let suggest = SuggestClient::from_env();
    let app = api::create_router(planner, suggest);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("Meal planner listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn print_shopping_list(planner: &Planner) {
    let aggregation = planner.shopping_list();

    for id in &aggregation.malformed_meals {
        tracing::warn!(meal_id = %id, "Meal has zero base servings and was skipped");
    }

    if aggregation.items.is_empty() {
        println!("Shopping list is empty. Select meals or add items first.");
        return;
    }
    for item in &aggregation.items {
        println!(
            "- {}: {} {} ({})",
            item.name,
            format_quantity(item.quantity),
            item.unit,
            item.from_meals.join(", ")
        );
    }
}
