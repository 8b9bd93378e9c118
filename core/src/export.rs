use std::fmt::Write as _;
use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use crate::models::Item;
use crate::store::GroceryStore;

const RULE: &str = "--------------------";

fn item_line(out: &mut String, item: &Item) {
    let mark = if item.is_completed { "✅" } else { "⭕" };
    let _ = writeln!(
        out,
        "{mark} {} ({} {})",
        item.name, item.quantity, item.unit
    );
}

/// Plain-text report of the main list, every named list and every meal plan,
/// suitable for sharing or pasting.
#[must_use]
pub fn export_text(store: &GroceryStore, exported_on: NaiveDate) -> String {
    let mut out = String::from("GROZO SHOPPING LISTS\n========================\n\n");

    if !store.items().is_empty() {
        out.push_str("🛒 MAIN GROCERY LIST:\n");
        out.push_str(RULE);
        out.push('\n');
        for item in store.items() {
            item_line(&mut out, item);
        }
        out.push('\n');
    }

    for list in store.lists() {
        let _ = writeln!(out, "{}:", list.name.to_uppercase());
        out.push_str(RULE);
        out.push('\n');
        if list.items.is_empty() {
            out.push_str("No items\n");
        }
        for item in &list.items {
            item_line(&mut out, item);
        }
        out.push('\n');
    }

    if !store.meal_plans().is_empty() {
        out.push_str("MEAL PLANS:\n");
        out.push_str(RULE);
        out.push('\n');
        for meal in store.meal_plans() {
            let _ = writeln!(out, "• {}", meal.name);
            let _ = writeln!(out, "  {}", meal.description);
            let _ = writeln!(out, "  Ingredients: {}\n", meal.ingredients.join(", "));
        }
    }

    if store.items().is_empty() && store.lists().is_empty() && store.meal_plans().is_empty() {
        out.push_str("No data to export\n");
    }

    let _ = write!(out, "\nExported from Grozo on {exported_on}");
    out
}

pub const CSV_HEADER: [&str; 7] = [
    "Name",
    "Quantity",
    "Unit",
    "Category",
    "Price",
    "Notes",
    "Completed",
];

/// Write items as CSV with the same columns the importer reads.
pub fn write_items_csv<W: Write>(items: &[Item], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;
    for item in items {
        wtr.write_record([
            item.name.clone(),
            item.quantity.to_string(),
            item.unit.clone(),
            item.category.clone(),
            item.price.map(|p| format!("{p:.2}")).unwrap_or_default(),
            item.notes.clone().unwrap_or_default(),
            item.is_completed.to_string(),
        ])
        .with_context(|| format!("Failed to write CSV row for '{}'", item.name))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}
