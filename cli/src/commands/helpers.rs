use std::path::Path;
use std::process;

use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use grozo_core::import::read_items_csv;
use grozo_core::models::Item;
use grozo_core::store::GroceryStore;

/// Load a CSV of items into a fresh store so every row gets an id and timestamp.
pub(crate) fn load_items(file: &Path) -> Result<Vec<Item>> {
    let mut store = GroceryStore::new();
    for draft in read_items_csv(file)? {
        store.add_item(draft);
    }
    Ok(store.items().to_vec())
}

/// Load items, exiting with status 2 when the file has none.
pub(crate) fn load_items_or_exit(file: &Path, json: bool) -> Result<Vec<Item>> {
    let items = load_items(file)?;
    if items.is_empty() {
        not_found(&format!("No items found in {}", file.display()), json);
    }
    Ok(items)
}

pub(crate) fn not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_items_table(items: &[Item]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "")]
        done: &'static str,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Qty")]
        quantity: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Price")]
        price: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            done: if i.is_completed { "✅" } else { "⭕" },
            name: truncate(&i.name, 30),
            quantity: format!("{} {}", i.quantity, i.unit),
            category: i.category.clone(),
            price: i.price.map_or("-".into(), money),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn money(v: f64) -> String {
    format!("${v:.2}")
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_items_assigns_ids() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Quantity,Price\nMilk,2,1.50\nEggs,,").unwrap();

        let items = load_items(file.path()).unwrap();
        assert_eq!(items.len(), 2);
        assert_ne!(items[0].id, items[1].id);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[1].category, "Pantry");
    }

    #[test]
    fn test_load_items_missing_file() {
        assert!(load_items(Path::new("/no/such/items.csv")).is_err());
    }

    #[test]
    fn test_json_error() {
        let v: serde_json::Value = serde_json::from_str(&json_error("No \"items\"")).unwrap();
        assert_eq!(v["error"], "No \"items\"");
    }

    #[test]
    fn test_money() {
        assert_eq!(money(3.0), "$3.00");
        assert_eq!(money(12.5), "$12.50");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }
}
