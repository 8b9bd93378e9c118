mod commands;
mod config;
mod gemini;
mod server;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::{
    cmd_categorize, cmd_compare, cmd_estimate, cmd_meal_import, cmd_meal_plan, cmd_route,
    cmd_suggest, cmd_tips,
};
use crate::config::Config;
use crate::gemini::GeminiClient;
use grozo_core::suggest::SuggestionClient;

#[derive(Parser)]
#[command(
    name = "grozo",
    version,
    about = "A grocery list planner with AI suggestions",
    long_about = "\n\n   ██████╗ ██████╗  ██████╗ ███████╗ ██████╗
  ██╔════╝ ██╔══██╗██╔═══██╗╚══███╔╝██╔═══██╗
  ██║  ███╗██████╔╝██║   ██║  ███╔╝ ██║   ██║
  ██║   ██║██╔══██╗██║   ██║ ███╔╝  ██║   ██║
  ╚██████╔╝██║  ██║╚██████╔╝███████╗╚██████╔╝
   ╚═════╝ ╚═╝  ╚═╝ ╚═════╝ ╚══════╝ ╚═════╝
        shop smarter, waste less.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server (in-memory store)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
    /// Suggest grocery items related to a query
    Suggest {
        /// What you are looking for (e.g. "breakfast", "pa")
        query: String,
        /// Items already on your list, to avoid repeats
        #[arg(short, long)]
        existing: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Pick a store category for an item
    Categorize {
        /// Item name
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate meal ideas with their ingredients
    MealPlan {
        /// Preferences (e.g. "vegetarian, quick weeknight dinners")
        preferences: String,
        /// Number of servings per meal
        #[arg(short, long, default_value = "4")]
        servings: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Shopping tips for a set of items
    Tips {
        /// Item names
        #[arg(required = true)]
        items: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Estimate the total cost of the items in a CSV file
    Estimate {
        /// Items CSV (columns: Name, Quantity, Unit, Category, Price, Notes, Completed)
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Order the items in a CSV file by store aisle
    Route {
        /// Items CSV
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compare store prices for the items in a CSV file
    Compare {
        /// Items CSV
        file: PathBuf,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Work with meal plans
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Turn a Cooklang (.cook) recipe into a meal plan and its grocery items
    Import {
        /// Path to the .cook file
        file: PathBuf,
        /// Meal name override (defaults to metadata title or filename)
        #[arg(long)]
        name: Option<String>,
        /// Servings override (defaults to metadata servings, then 4)
        #[arg(long)]
        servings: Option<u32>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "grozo=info,grozo_core=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v == "json");

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    let gemini = GeminiClient::new(config.gemini_api_key.clone(), &config.gemini_api_url)?;
    let client = SuggestionClient::new(Arc::new(gemini));

    match cli.command {
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let api_key = if no_auth {
                None
            } else {
                let (key, _new) = config.load_or_create_api_key()?;
                Some(key)
            };
            server::start_server(client, port, &bind, api_key).await
        }
        Commands::Suggest {
            query,
            existing,
            json,
        } => cmd_suggest(&client, &query, &existing, json).await,
        Commands::Categorize { item, json } => cmd_categorize(&client, &item, json).await,
        Commands::MealPlan {
            preferences,
            servings,
            json,
        } => cmd_meal_plan(&client, &preferences, servings, json).await,
        Commands::Tips { items, json } => cmd_tips(&client, &items, json).await,
        Commands::Estimate { file, json } => cmd_estimate(&file, json),
        Commands::Route { file, json } => cmd_route(&file, json),
        Commands::Compare { file, json } => cmd_compare(&file, json),
        Commands::Meal { command } => match command {
            MealCommands::Import {
                file,
                name,
                servings,
                json,
            } => cmd_meal_import(&file, name, servings, json),
        },
    }
}
