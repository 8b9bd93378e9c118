use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::Serialize;

use grozo_core::models::{Item, MealPlan, NewMealPlan, validate_name, validate_servings};
use grozo_core::store::GroceryStore;
use grozo_core::suggest::SuggestionClient;

use super::helpers::print_items_table;

const DEFAULT_SERVINGS: u32 = 4;

#[derive(Debug, Serialize)]
struct MealImport {
    meal_plan: MealPlan,
    items: Vec<Item>,
}

fn print_meal(plan: &MealPlan) {
    println!("• {} ({} servings)", plan.name, plan.servings);
    if !plan.description.is_empty() {
        println!("  {}", plan.description);
    }
    println!("  Ingredients: {}", plan.ingredients.join(", "));
}

pub(crate) async fn cmd_meal_plan(
    client: &SuggestionClient,
    preferences: &str,
    servings: u32,
    json: bool,
) -> Result<()> {
    let preferences = validate_name("meal preference", preferences)?;
    let servings = validate_servings(servings)?;

    let outcome = client.generate_meal_plan(&preferences, servings).await;
    let fallback = outcome.is_fallback();

    let mut store = GroceryStore::new();
    for meal in outcome.into_inner() {
        store.add_meal_plan(meal.into_new_meal_plan(servings));
    }

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "fallback": fallback,
                "meal_plans": store.meal_plans(),
            }))?
        );
    } else {
        if fallback {
            eprintln!("Meal generation unavailable; showing starter ideas.");
        }
        for plan in store.meal_plans() {
            print_meal(plan);
            println!();
        }
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_servings(value: f64) -> Option<u32> {
    (value.is_finite() && value >= 1.0).then(|| value.round() as u32)
}

/// Build a meal plan from Cooklang source. Name falls back to the metadata
/// title, then `fallback_name`; servings to the metadata, then four.
fn meal_from_cooklang(
    input: &str,
    fallback_name: Option<&str>,
    name_override: Option<String>,
    servings_override: Option<u32>,
) -> Result<NewMealPlan> {
    let (recipe, _report) = cooklang::parse(input)
        .into_result()
        .map_err(|e| anyhow::anyhow!("Failed to parse Cooklang file: {e}"))?;

    let name = name_override
        .or_else(|| recipe.metadata.title().map(String::from))
        .or_else(|| fallback_name.map(String::from))
        .context("Could not determine meal name. Use --name to specify one")?;
    let name = validate_name("meal name", &name)?;

    let servings = match servings_override {
        Some(s) => s,
        None => recipe
            .metadata
            .servings()
            .and_then(|s| s.as_number().map(f64::from))
            .and_then(whole_servings)
            .unwrap_or(DEFAULT_SERVINGS),
    };
    let servings = validate_servings(servings)?;

    let converter = cooklang::Converter::default();
    let mut ingredients: Vec<String> = Vec::new();
    for gi in recipe.group_ingredients(&converter) {
        let display = gi.ingredient.display_name().to_string();
        if !ingredients.iter().any(|i| i.eq_ignore_ascii_case(&display)) {
            ingredients.push(display);
        }
    }

    if ingredients.is_empty() {
        bail!("No ingredients found in recipe");
    }

    Ok(NewMealPlan {
        name,
        description: String::new(),
        ingredients,
        servings,
    })
}

pub(crate) fn cmd_meal_import(
    file: &Path,
    name_override: Option<String>,
    servings_override: Option<u32>,
    json: bool,
) -> Result<()> {
    let input = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read file: {}", file.display()))?;
    let stem = file.file_stem().and_then(|s| s.to_str());

    let draft = meal_from_cooklang(&input, stem, name_override, servings_override)?;

    let mut store = GroceryStore::new();
    let id = store.add_meal_plan(draft).id.clone();
    store.generate_grocery_list_from_meal(&id);

    let meal_plan = store
        .meal_plan(&id)
        .cloned()
        .context("Imported meal plan missing from store")?;
    let result = MealImport {
        meal_plan,
        items: store.items().to_vec(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let plan = &result.meal_plan;
        println!(
            "Imported meal: {} ({} ingredients, {} servings)",
            plan.name,
            plan.ingredients.len(),
            plan.servings
        );
        print_items_table(&result.items);
    }
    Ok(())
}
