use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use grozo_core::analytics::{
    PriceComparison, calculate_total_estimate, compare_prices, generate_shopping_route,
};
use grozo_core::models::Item;

use super::helpers::{load_items_or_exit, money, truncate};

pub(crate) fn cmd_estimate(file: &Path, json: bool) -> Result<()> {
    let items = load_items_or_exit(file, json)?;
    let estimate = calculate_total_estimate(&items);

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Subtotal")]
        subtotal: String,
    }

    let rows: Vec<Row> = estimate
        .breakdown
        .iter()
        .map(|(category, subtotal)| Row {
            category: category.clone(),
            subtotal: money(*subtotal),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("Estimated total: {}", money(estimate.total));
    Ok(())
}

pub(crate) fn cmd_route(file: &Path, json: bool) -> Result<()> {
    let items = load_items_or_exit(file, json)?;
    let route = generate_shopping_route(&items);

    if json {
        println!("{}", serde_json::to_string_pretty(&route)?);
        return Ok(());
    }

    for stop in &route {
        println!("{}. {}", stop.order, stop.category);
        for item in &stop.items {
            let mark = if item.is_completed { "✅" } else { "⭕" };
            println!("   {mark} {} ({} {})", item.name, item.quantity, item.unit);
        }
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct ItemComparison<'a> {
    item: &'a str,
    stores: Vec<PriceComparison>,
}

fn comparisons(items: &[Item]) -> Vec<ItemComparison<'_>> {
    items
        .iter()
        .map(|i| ItemComparison {
            item: &i.name,
            stores: compare_prices(i),
        })
        .collect()
}

pub(crate) fn cmd_compare(file: &Path, json: bool) -> Result<()> {
    let items = load_items_or_exit(file, json)?;
    let all = comparisons(&items);

    if json {
        println!("{}", serde_json::to_string_pretty(&all)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Item")]
        item: String,
        #[tabled(rename = "Cheapest")]
        cheapest: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Rating")]
        rating: String,
        #[tabled(rename = "Priciest")]
        priciest: String,
    }

    let rows: Vec<Row> = all
        .iter()
        .filter_map(|c| {
            let best = c.stores.first()?;
            let worst = c.stores.last()?;
            Some(Row {
                item: truncate(c.item, 30),
                cheapest: best.store.clone(),
                price: money(best.price),
                rating: format!("{:.1}", best.rating),
                priciest: format!("{} {}", worst.store, money(worst.price)),
            })
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grozo_core::models::NewItem;
    use grozo_core::store::GroceryStore;

    #[test]
    fn test_comparisons_cover_every_item() {
        let mut store = GroceryStore::new();
        store.add_item(NewItem::named("Milk").with_price(2.0));
        store.add_item(NewItem::named("Rice"));

        let all = comparisons(store.items());
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item, "Milk");
        assert_eq!(all[0].stores.len(), 5);
        assert_eq!(all[0].stores[0].store, "Costco");
        assert!(all[1].stores.windows(2).all(|w| w[0].price <= w[1].price));
    }
}
