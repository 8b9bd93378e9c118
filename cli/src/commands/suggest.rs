use anyhow::Result;
use serde::Serialize;

use grozo_core::analytics::{ShoppingTip, shopping_tips};
use grozo_core::models::{Item, NewItem, validate_name};
use grozo_core::store::{GroceryStore, MIN_SUGGESTION_QUERY};
use grozo_core::suggest::{Outcome, SuggestionClient};

use super::helpers::not_found;

#[derive(Debug, Serialize)]
struct SuggestOutput<'a> {
    query: &'a str,
    source: &'static str,
    suggestions: Vec<String>,
}

/// Model suggestions, or the offline seed list when the model has nothing.
/// The seed list is only filtered for queries of two or more characters, so
/// shorter ones get no local matches.
fn pick_suggestions<'a>(query: &'a str, outcome: Outcome<Vec<String>>) -> SuggestOutput<'a> {
    match outcome {
        Outcome::Generated(suggestions) if !suggestions.is_empty() => SuggestOutput {
            query,
            source: "model",
            suggestions,
        },
        _ => {
            let suggestions = if query.chars().count() < MIN_SUGGESTION_QUERY {
                Vec::new()
            } else {
                let mut store = GroceryStore::new();
                store.update_suggestions(query);
                store.suggestions().to_vec()
            };
            SuggestOutput {
                query,
                source: "local",
                suggestions,
            }
        }
    }
}

pub(crate) async fn cmd_suggest(
    client: &SuggestionClient,
    query: &str,
    existing: &[String],
    json: bool,
) -> Result<()> {
    let query = validate_name("search term", query)?;
    let outcome = client.grocery_suggestions(&query, existing).await;
    let output = pick_suggestions(&query, outcome);

    if output.suggestions.is_empty() {
        not_found(&format!("No suggestions for '{query}'"), json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for s in &output.suggestions {
            println!("  {s}");
        }
        if output.source == "local" {
            eprintln!("(offline suggestions)");
        }
    }
    Ok(())
}

pub(crate) async fn cmd_categorize(client: &SuggestionClient, item: &str, json: bool) -> Result<()> {
    let item = validate_name("item name", item)?;
    let outcome = client.categorize_item(&item).await;
    let fallback = outcome.is_fallback();
    let category = outcome.into_inner();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "item": item,
                "category": category,
                "fallback": fallback,
            }))?
        );
    } else if fallback {
        println!("{item} → {category} (default)");
    } else {
        println!("{item} → {category}");
    }
    Ok(())
}

fn items_from_names(names: &[String]) -> Vec<Item> {
    let mut store = GroceryStore::new();
    for name in names {
        if let Ok(name) = validate_name("item name", name) {
            store.add_item(NewItem::named(name));
        }
    }
    store.items().to_vec()
}

fn print_tip(tip: &ShoppingTip) {
    println!("{} {}", tip.icon, tip.title);
    println!("   {}", tip.description);
}

pub(crate) async fn cmd_tips(client: &SuggestionClient, names: &[String], json: bool) -> Result<()> {
    let items = items_from_names(names);
    let tips = shopping_tips(client, &items).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&tips)?);
    } else {
        for tip in &tips {
            print_tip(tip);
        }
    }
    Ok(())
}
