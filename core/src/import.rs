use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::models::{DEFAULT_CATEGORY, DEFAULT_UNIT, NewItem};

/// Parse grocery items from CSV.
///
/// Only `Name` is required. Optional columns (case-insensitive):
/// `Quantity`, `Unit`, `Category`, `Price`, `Notes`, `Completed`.
/// Rows with a blank name are skipped; unparseable numbers fall back to the
/// item defaults.
pub fn parse_items_csv<R: Read>(reader: R) -> Result<Vec<NewItem>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();
    let col =
        |name: &str| -> Option<usize> { headers.iter().position(|h| h.eq_ignore_ascii_case(name)) };

    let Some(idx_name) = col("Name") else {
        bail!("Missing required column: Name");
    };
    let idx_quantity = col("Quantity");
    let idx_unit = col("Unit");
    let idx_category = col("Category");
    let idx_price = col("Price");
    let idx_notes = col("Notes");
    let idx_completed = col("Completed");

    let mut items = Vec::new();

    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;

        let text = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| record.get(i))
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(String::from)
        };

        let Some(name) = text(Some(idx_name)) else {
            continue;
        };

        let mut item = NewItem::named(name);
        if let Some(q) = text(idx_quantity).and_then(|v| v.parse::<i64>().ok()) {
            item.quantity = q;
        }
        item.unit = text(idx_unit).unwrap_or_else(|| DEFAULT_UNIT.to_string());
        item.category = text(idx_category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string());
        item.price = text(idx_price).and_then(|v| v.trim_start_matches('$').parse().ok());
        item.notes = text(idx_notes);
        item.is_completed = text(idx_completed)
            .is_some_and(|v| matches!(v.to_lowercase().as_str(), "true" | "yes" | "1" | "x"));

        items.push(item);
    }

    Ok(items)
}

pub fn read_items_csv(path: &Path) -> Result<Vec<NewItem>> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    parse_items_csv(file).with_context(|| format!("Failed to import {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::write_items_csv;
    use crate::store::GroceryStore;
    use std::io::Write;

    #[test]
    fn test_parse_full_columns() {
        let data = "\
Name,Quantity,Unit,Category,Price,Notes,Completed
Milk,2,liter,Dairy & Eggs,1.99,organic,yes
Bread,,,,,,
";
        let items = parse_items_csv(data.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        let milk = &items[0];
        assert_eq!(milk.name, "Milk");
        assert_eq!(milk.quantity, 2);
        assert_eq!(milk.unit, "liter");
        assert_eq!(milk.category, "Dairy & Eggs");
        assert_eq!(milk.price, Some(1.99));
        assert_eq!(milk.notes.as_deref(), Some("organic"));
        assert!(milk.is_completed);

        let bread = &items[1];
        assert_eq!(bread.quantity, 1);
        assert_eq!(bread.unit, "piece");
        assert_eq!(bread.category, "Pantry");
        assert!(bread.price.is_none());
        assert!(!bread.is_completed);
    }

    #[test]
    fn test_parse_name_only_and_case_insensitive_headers() {
        let data = "name,PRICE\nEggs,$3.25\n  ,9\nRice,abc\n";
        let items = parse_items_csv(data.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].price, Some(3.25));
        assert_eq!(items[1].name, "Rice");
        assert!(items[1].price.is_none());
    }

    #[test]
    fn test_parse_missing_name_column() {
        let err = parse_items_csv("Item,Quantity\nMilk,1\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("Name"));
    }

    #[test]
    fn test_export_then_import_keeps_fields() {
        let mut store = GroceryStore::new();
        let id = store
            .add_item(
                NewItem::named("Olive Oil, extra virgin")
                    .with_category("Pantry")
                    .with_quantity(1, "bottle")
                    .with_price(7.5),
            )
            .id
            .clone();
        store.toggle_item_complete(&id);

        let mut buf = Vec::new();
        write_items_csv(store.items(), &mut buf).unwrap();
        let items = parse_items_csv(buf.as_slice()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Olive Oil, extra virgin");
        assert_eq!(items[0].price, Some(7.5));
        assert!(items[0].is_completed);
    }

    #[test]
    fn test_read_items_csv_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "Name,Category\nSalmon,Meat & Seafood").unwrap();
        let items = read_items_csv(file.path()).unwrap();
        assert_eq!(items[0].category, "Meat & Seafood");

        assert!(read_items_csv(Path::new("/definitely/not/here.csv")).is_err());
    }
}
