use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Category every item falls back to when nothing better is known.
pub const DEFAULT_CATEGORY: &str = "Pantry";

/// Unit given to items created without one.
pub const DEFAULT_UNIT: &str = "piece";

/// The closed set of category labels, in default order.
pub const CATEGORY_NAMES: [&str; 8] = [
    "Fruits & Vegetables",
    "Dairy & Eggs",
    "Meat & Seafood",
    "Bakery",
    "Pantry",
    "Frozen",
    "Beverages",
    "Snacks",
];

const CATEGORY_STYLES: [(&str, &str); 8] = [
    ("🥬", "#22c55e"),
    ("🥛", "#3b82f6"),
    ("🥩", "#ef4444"),
    ("🍞", "#f59e0b"),
    ("🥫", "#8b5cf6"),
    ("🧊", "#06b6d4"),
    ("🥤", "#10b981"),
    ("🍿", "#f97316"),
];

/// Seed list for local, offline suggestions.
pub const COMMON_SUGGESTIONS: [&str; 20] = [
    "Milk",
    "Bread",
    "Eggs",
    "Bananas",
    "Apples",
    "Chicken",
    "Rice",
    "Pasta",
    "Tomatoes",
    "Onions",
    "Potatoes",
    "Cheese",
    "Yogurt",
    "Butter",
    "Salt",
    "Sugar",
    "Olive Oil",
    "Garlic",
    "Carrots",
    "Spinach",
];

pub(crate) fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub quantity: i64,
    pub unit: String,
    /// Matched against `Category::name`; may name a category that doesn't exist.
    pub category: String,
    pub is_completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub added_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i64>,
}

impl Item {
    /// True when the item is tracked for stock, still pending, and at or below its threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        match self.low_stock_threshold {
            Some(threshold) if threshold > 0 && !self.is_completed => self.quantity <= threshold,
            _ => false,
        }
    }
}

fn default_quantity() -> i64 {
    1
}

fn default_unit() -> String {
    DEFAULT_UNIT.to_string()
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Everything about an item except the fields the store assigns (id, timestamp).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub low_stock_threshold: Option<i64>,
}

impl NewItem {
    /// A pending item with default quantity, unit and category.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: default_quantity(),
            unit: default_unit(),
            category: default_category(),
            is_completed: false,
            price: None,
            notes: None,
            low_stock_threshold: None,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    #[must_use]
    pub fn with_quantity(mut self, quantity: i64, unit: impl Into<String>) -> Self {
        self.quantity = quantity;
        self.unit = unit.into();
        self
    }

    #[must_use]
    pub fn with_price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub(crate) fn into_item(self, id: String, added_at: DateTime<Utc>) -> Item {
        Item {
            id,
            name: self.name,
            quantity: self.quantity,
            unit: self.unit,
            category: self.category,
            is_completed: self.is_completed,
            price: self.price,
            notes: self.notes,
            added_at,
            low_stock_threshold: self.low_stock_threshold,
        }
    }
}

/// Partial update for an item. `None` leaves a field untouched; for the
/// optional fields, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, Deserialize)]
#[allow(clippy::option_option)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub quantity: Option<i64>,
    pub unit: Option<String>,
    pub category: Option<String>,
    pub is_completed: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub price: Option<Option<f64>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub low_stock_threshold: Option<Option<i64>>,
}

impl ItemUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.quantity.is_none()
            && self.unit.is_none()
            && self.category.is_none()
            && self.is_completed.is_none()
            && self.price.is_none()
            && self.notes.is_none()
            && self.low_stock_threshold.is_none()
    }

    pub(crate) fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name.clone_from(name);
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(unit) = &self.unit {
            item.unit.clone_from(unit);
        }
        if let Some(category) = &self.category {
            item.category.clone_from(category);
        }
        if let Some(done) = self.is_completed {
            item.is_completed = done;
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(notes) = &self.notes {
            item.notes.clone_from(notes);
        }
        if let Some(threshold) = self.low_stock_threshold {
            item.low_stock_threshold = threshold;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub icon: String,
    pub color: String,
}

/// The eight built-in categories with ids "1" through "8".
#[must_use]
pub fn default_categories() -> Vec<Category> {
    CATEGORY_NAMES
        .iter()
        .zip(CATEGORY_STYLES)
        .enumerate()
        .map(|(i, (name, (icon, color)))| Category {
            id: (i + 1).to_string(),
            name: (*name).to_string(),
            icon: icon.to_string(),
            color: color.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub name: String,
    pub description: String,
    pub ingredients: Vec<String>,
    pub servings: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewMealPlan {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub ingredients: Vec<String>,
    pub servings: u32,
}

/// A user-created list that owns its own items.
///
/// Both list flavours share this shape: plain lists carry a `color`, family
/// lists carry `members` and `created_by`. Members are informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub members: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    pub items: Vec<Item>,
    pub created_at: DateTime<Utc>,
}

impl GroceryList {
    #[must_use]
    pub fn completion_percentage(&self) -> u32 {
        completion_percentage(&self.items)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
}

impl NewList {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// Which slice of the flat item collection to show.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemFilter {
    #[default]
    All,
    Pending,
    Completed,
}

impl ItemFilter {
    #[must_use]
    pub fn matches(self, item: &Item) -> bool {
        match self {
            Self::All => true,
            Self::Pending => !item.is_completed,
            Self::Completed => item.is_completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    pub total_items: usize,
    pub completed_items: usize,
    pub completion_pct: u32,
    /// Sum of explicit prices; estimates are not included.
    pub total_spent: f64,
    pub list_count: usize,
    pub total_list_items: usize,
    pub completed_list_items: usize,
    pub list_completion_pct: u32,
}

/// Share of completed items as a rounded whole percentage; 0 for no items.
#[must_use]
pub fn completion_percentage(items: &[Item]) -> u32 {
    let completed = items.iter().filter(|i| i.is_completed).count();
    percentage(completed, items.len())
}

#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub(crate) fn percentage(part: usize, whole: usize) -> u32 {
    if whole == 0 {
        return 0;
    }
    (part as f64 / whole as f64 * 100.0).round() as u32
}

/// Trim a required text field, rejecting blank input.
pub fn validate_name(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("Please enter a {field}");
    }
    Ok(trimmed.to_string())
}

pub fn validate_servings(servings: u32) -> Result<u32> {
    if servings == 0 {
        bail!("Servings must be at least 1");
    }
    Ok(servings)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(done: bool) -> Item {
        let mut it = NewItem::named("Milk").into_item("x".to_string(), Utc::now());
        it.is_completed = done;
        it
    }

    #[test]
    fn test_default_categories_order_and_ids() {
        let cats = default_categories();
        assert_eq!(cats.len(), 8);
        let names: Vec<&str> = cats.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, CATEGORY_NAMES);
        assert_eq!(cats[0].id, "1");
        assert_eq!(cats[7].id, "8");
        assert_eq!(cats[1].icon, "🥛");
    }

    #[test]
    fn test_new_item_defaults_from_json() {
        let draft: NewItem = serde_json::from_str(r#"{"name":"Rice"}"#).unwrap();
        assert_eq!(draft.quantity, 1);
        assert_eq!(draft.unit, "piece");
        assert_eq!(draft.category, "Pantry");
        assert!(!draft.is_completed);
        assert!(draft.price.is_none());
    }

    #[test]
    fn test_item_update_distinguishes_null_from_absent() {
        let update: ItemUpdate = serde_json::from_str(r#"{"price":null}"#).unwrap();
        assert_eq!(update.price, Some(None));
        assert!(update.notes.is_none());

        let mut it = NewItem::named("Cheese")
            .with_price(4.5)
            .into_item("1".into(), Utc::now());
        update.apply_to(&mut it);
        assert!(it.price.is_none());
        assert_eq!(it.name, "Cheese");
    }

    #[test]
    fn test_item_update_is_empty() {
        assert!(ItemUpdate::default().is_empty());
        let update = ItemUpdate {
            quantity: Some(3),
            ..ItemUpdate::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(&[]), 0);
        assert_eq!(completion_percentage(&[item(true), item(false)]), 50);
        assert_eq!(
            completion_percentage(&[item(true), item(false), item(false)]),
            33
        );
        assert_eq!(
            completion_percentage(&[item(true), item(true), item(false)]),
            67
        );
    }

    #[test]
    fn test_low_stock() {
        let mut it = item(false);
        assert!(!it.is_low_stock());
        it.low_stock_threshold = Some(2);
        it.quantity = 2;
        assert!(it.is_low_stock());
        it.quantity = 3;
        assert!(!it.is_low_stock());
        it.quantity = 1;
        it.is_completed = true;
        assert!(!it.is_low_stock());
    }

    #[test]
    fn test_item_filter() {
        let done = item(true);
        let open = item(false);
        assert!(ItemFilter::All.matches(&done));
        assert!(ItemFilter::Pending.matches(&open));
        assert!(!ItemFilter::Pending.matches(&done));
        assert!(ItemFilter::Completed.matches(&done));
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("list name", "  Weekly ").unwrap(), "Weekly");
        assert!(validate_name("list name", "   ").is_err());
        assert!(validate_name("list name", "").is_err());
    }

    #[test]
    fn test_validate_servings() {
        assert_eq!(validate_servings(4).unwrap(), 4);
        assert!(validate_servings(0).is_err());
    }
}
