//! Shopping analytics over a snapshot of items: price estimates, totals,
//! in-store routes and tips. Nothing here touches the store.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::models::Item;
use crate::suggest::SuggestionClient;

/// Aisle order of a typical store.
pub const STORE_LAYOUT: [&str; 8] = [
    "Fruits & Vegetables",
    "Bakery",
    "Dairy & Eggs",
    "Meat & Seafood",
    "Frozen",
    "Pantry",
    "Beverages",
    "Snacks",
];

pub const MAX_TIPS: usize = 8;
const MAX_CATEGORY_TIPS: usize = 3;
const LARGE_LIST_THRESHOLD: usize = 20;
const EXPENSIVE_ITEM_PRICE: f64 = 10.0;

const STORES: [(&str, f64, f64); 5] = [
    ("Walmart", 0.85, 4.2),
    ("Target", 1.1, 4.5),
    ("Kroger", 0.95, 4.3),
    ("Whole Foods", 1.4, 4.6),
    ("Costco", 0.75, 4.4),
];

#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Typical shelf price for a category; 3.00 for anything unrecognised.
#[must_use]
pub fn base_price(category: &str) -> f64 {
    match category {
        "Fruits & Vegetables" | "Beverages" => 2.5,
        "Dairy & Eggs" | "Snacks" => 3.5,
        "Meat & Seafood" => 8.0,
        "Bakery" => 3.0,
        "Pantry" => 2.0,
        "Frozen" => 4.0,
        _ => 3.0,
    }
}

/// Rough unit price: category base plus 0.50 per step of `name length mod 5`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn estimate_price(name: &str, category: &str) -> f64 {
    let variation = (name.chars().count() % 5) as f64 * 0.5;
    round2(base_price(category) + variation)
}

/// The item's own price, or an estimate when it has none.
#[must_use]
pub fn unit_price(item: &Item) -> f64 {
    item.price
        .unwrap_or_else(|| estimate_price(&item.name, &item.category))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalEstimate {
    /// Raw sum rounded once; may differ by a cent from the sum of `breakdown`.
    pub total: f64,
    /// Per-category subtotal, each rounded on its own.
    pub breakdown: BTreeMap<String, f64>,
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn calculate_total_estimate(items: &[Item]) -> TotalEstimate {
    let mut total = 0.0;
    let mut raw: BTreeMap<String, f64> = BTreeMap::new();
    for item in items {
        let line = unit_price(item) * item.quantity as f64;
        total += line;
        *raw.entry(item.category.clone()).or_default() += line;
    }
    TotalEstimate {
        total: round2(total),
        breakdown: raw.into_iter().map(|(k, v)| (k, round2(v))).collect(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteStop {
    pub order: usize,
    pub category: String,
    pub items: Vec<Item>,
}

/// Group items by category in store-layout order, numbering stops from 1.
///
/// Only the layout categories become stops; items in any other category are
/// left off the route.
#[must_use]
pub fn generate_shopping_route(items: &[Item]) -> Vec<RouteStop> {
    STORE_LAYOUT
        .iter()
        .filter_map(|category| {
            let group: Vec<Item> = items
                .iter()
                .filter(|i| i.category == *category)
                .cloned()
                .collect();
            (!group.is_empty()).then(|| (category.to_string(), group))
        })
        .enumerate()
        .map(|(i, (category, items))| RouteStop {
            order: i + 1,
            category,
            items,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TipKind {
    Savings,
    Health,
    Convenience,
    Recipe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingTip {
    pub id: String,
    pub title: String,
    pub description: String,
    pub kind: TipKind,
    pub icon: String,
}

fn tip(id: &str, title: &str, description: &str, kind: TipKind, icon: &str) -> ShoppingTip {
    ShoppingTip {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        kind,
        icon: icon.to_string(),
    }
}

fn category_tips(category: &str) -> Vec<ShoppingTip> {
    match category {
        "Fruits & Vegetables" => vec![
            tip(
                "produce-1",
                "Buy Seasonal Produce",
                "Seasonal fruits and vegetables are fresher and more affordable",
                TipKind::Savings,
                "🍎",
            ),
            tip(
                "produce-2",
                "Check for Ripeness",
                "Buy fruits at different ripeness stages to enjoy them throughout the week",
                TipKind::Convenience,
                "🥑",
            ),
        ],
        "Dairy & Eggs" => vec![tip(
            "dairy-1",
            "Check Expiration Dates",
            "Look for the furthest expiration date, especially for milk and yogurt",
            TipKind::Convenience,
            "🥛",
        )],
        "Meat & Seafood" => vec![tip(
            "meat-1",
            "Buy in Bulk and Freeze",
            "Purchase larger quantities when on sale and freeze portions",
            TipKind::Savings,
            "🥩",
        )],
        _ => Vec::new(),
    }
}

fn general_tips(items: &[Item]) -> Vec<ShoppingTip> {
    let mut tips = vec![
        tip(
            "general-1",
            "Shop the Perimeter",
            "Fresh foods are usually located around the store perimeter",
            TipKind::Health,
            "🏪",
        ),
        tip(
            "general-2",
            "Use Store Apps",
            "Download store apps for exclusive coupons and deals",
            TipKind::Savings,
            "📱",
        ),
        tip(
            "general-3",
            "Make a Meal Plan",
            "Planning meals reduces food waste and saves money",
            TipKind::Convenience,
            "📝",
        ),
    ];

    if items.len() > LARGE_LIST_THRESHOLD {
        tips.push(tip(
            "large-list",
            "Organize by Store Layout",
            "Group items by store sections to shop more efficiently",
            TipKind::Convenience,
            "🗺️",
        ));
    }

    if items
        .iter()
        .any(|i| i.price.is_some_and(|p| p > EXPENSIVE_ITEM_PRICE))
    {
        tips.push(tip(
            "expensive-items",
            "Compare Unit Prices",
            "Check price per unit for expensive items to get the best deal",
            TipKind::Savings,
            "💰",
        ));
    }

    tips
}

/// Tips that need no model: up to three for the categories present, then the
/// general set plus the large-list and expensive-item extras.
#[must_use]
pub fn canned_tips(items: &[Item]) -> Vec<ShoppingTip> {
    let mut seen = HashSet::new();
    let mut tips: Vec<ShoppingTip> = items
        .iter()
        .filter(|i| seen.insert(i.category.as_str()))
        .flat_map(|i| category_tips(&i.category))
        .take(MAX_CATEGORY_TIPS)
        .collect();
    tips.extend(general_tips(items));
    tips
}

/// Model tips first (at most one per item, ignored if the model failed), then
/// the canned tips, capped at eight.
pub async fn shopping_tips(client: &SuggestionClient, items: &[Item]) -> Vec<ShoppingTip> {
    let names: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
    let model_tips = client
        .shopping_tips(&names)
        .await
        .generated()
        .unwrap_or_default();
    combine_tips(model_tips, items)
}

fn combine_tips(model_tips: Vec<String>, items: &[Item]) -> Vec<ShoppingTip> {
    let mut tips: Vec<ShoppingTip> = model_tips
        .into_iter()
        .take(items.len())
        .enumerate()
        .map(|(i, text)| ShoppingTip {
            id: format!("ai-{i}"),
            title: "AI Suggestion".to_string(),
            description: text,
            kind: TipKind::Savings,
            icon: "🤖".to_string(),
        })
        .collect();
    tips.extend(canned_tips(items));
    tips.truncate(MAX_TIPS);
    tips
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceComparison {
    pub store: String,
    pub price: f64,
    pub rating: f64,
}

/// Unit price of the item at each known store, cheapest first.
#[must_use]
pub fn compare_prices(item: &Item) -> Vec<PriceComparison> {
    let base = unit_price(item);
    let mut prices: Vec<PriceComparison> = STORES
        .iter()
        .map(|(store, multiplier, rating)| PriceComparison {
            store: (*store).to_string(),
            price: round2(base * multiplier),
            rating: *rating,
        })
        .collect();
    prices.sort_by(|a, b| a.price.total_cmp(&b.price));
    prices
}
