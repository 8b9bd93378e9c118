use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{
    COMMON_SUGGESTIONS, Category, DEFAULT_CATEGORY, DEFAULT_UNIT, GroceryList, Item, ItemFilter,
    ItemUpdate, MealPlan, NewCategory, NewItem, NewList, NewMealPlan, StoreStats,
    completion_percentage, default_categories, percentage,
};

/// Minimum query length before local suggestions are recomputed.
pub const MIN_SUGGESTION_QUERY: usize = 2;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn common_suggestions() -> Vec<String> {
    COMMON_SUGGESTIONS.iter().map(ToString::to_string).collect()
}

/// In-memory state for the whole grocery app.
///
/// Every operation is total: an unknown id is a no-op, never an error. Methods
/// that address an id report whether anything matched so outer layers can tell
/// the user, but the store itself has no failure path. Nothing is persisted.
///
/// The store is single-writer. Callers sharing it across tasks wrap it in a
/// mutex and hold the lock for the whole operation, since list deletion and
/// meal expansion touch several collections at once.
#[derive(Debug, Clone, Serialize)]
pub struct GroceryStore {
    items: Vec<Item>,
    categories: Vec<Category>,
    meal_plans: Vec<MealPlan>,
    lists: Vec<GroceryList>,
    suggestions: Vec<String>,
}

impl Default for GroceryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl GroceryStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            categories: default_categories(),
            meal_plans: Vec::new(),
            lists: Vec::new(),
            suggestions: common_suggestions(),
        }
    }

    // --- Read model ---

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    #[must_use]
    pub fn meal_plans(&self) -> &[MealPlan] {
        &self.meal_plans
    }

    #[must_use]
    pub fn lists(&self) -> &[GroceryList] {
        &self.lists
    }

    #[must_use]
    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    #[must_use]
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn meal_plan(&self, id: &str) -> Option<&MealPlan> {
        self.meal_plans.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn list(&self, id: &str) -> Option<&GroceryList> {
        self.lists.iter().find(|l| l.id == id)
    }

    #[must_use]
    pub fn filtered_items(&self, filter: ItemFilter) -> Vec<&Item> {
        self.items.iter().filter(|i| filter.matches(i)).collect()
    }

    /// Items whose category name equals `category` exactly.
    #[must_use]
    pub fn items_in_category(&self, category: &str) -> Vec<&Item> {
        self.items.iter().filter(|i| i.category == category).collect()
    }

    #[must_use]
    pub fn low_stock_items(&self) -> Vec<&Item> {
        self.items.iter().filter(|i| i.is_low_stock()).collect()
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let completed_items = self.items.iter().filter(|i| i.is_completed).count();
        let total_spent: f64 = self.items.iter().filter_map(|i| i.price).sum();
        let total_list_items: usize = self.lists.iter().map(|l| l.items.len()).sum();
        let completed_list_items = self
            .lists
            .iter()
            .flat_map(|l| &l.items)
            .filter(|i| i.is_completed)
            .count();

        StoreStats {
            total_items: self.items.len(),
            completed_items,
            completion_pct: completion_percentage(&self.items),
            total_spent,
            list_count: self.lists.len(),
            total_list_items,
            completed_list_items,
            list_completion_pct: percentage(completed_list_items, total_list_items),
        }
    }

    // --- Items ---

    /// Append a new item with a fresh id and the current time. Quantity and
    /// price are taken as given.
    pub fn add_item(&mut self, draft: NewItem) -> &Item {
        let item = draft.into_item(new_id(), Utc::now());
        self.items.push(item);
        &self.items[self.items.len() - 1]
    }

    pub fn update_item(&mut self, id: &str, update: &ItemUpdate) -> Option<&Item> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        update.apply_to(item);
        Some(&*item)
    }

    pub fn delete_item(&mut self, id: &str) -> bool {
        let before = self.items.len();
        self.items.retain(|i| i.id != id);
        self.items.len() != before
    }

    pub fn toggle_item_complete(&mut self, id: &str) -> Option<&Item> {
        let item = self.items.iter_mut().find(|i| i.id == id)?;
        item.is_completed = !item.is_completed;
        Some(&*item)
    }

    /// Remove every completed item from the flat collection, returning how many went.
    pub fn clear_completed(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|i| !i.is_completed);
        before - self.items.len()
    }

    // --- Categories ---

    /// Append a category. Names are not checked for duplicates.
    pub fn add_category(&mut self, draft: NewCategory) -> &Category {
        self.categories.push(Category {
            id: new_id(),
            name: draft.name,
            icon: draft.icon,
            color: draft.color,
        });
        &self.categories[self.categories.len() - 1]
    }

    // --- Meal plans ---

    pub fn add_meal_plan(&mut self, draft: NewMealPlan) -> &MealPlan {
        self.meal_plans.push(MealPlan {
            id: new_id(),
            name: draft.name,
            description: draft.description,
            ingredients: draft.ingredients,
            servings: draft.servings,
            created_at: Utc::now(),
        });
        &self.meal_plans[self.meal_plans.len() - 1]
    }

    /// Add one item per ingredient of the meal plan to the flat collection.
    ///
    /// Every generated item lands in the default category as a single piece,
    /// whatever the ingredient is; categorising them is left to the caller.
    /// Returns the number of items added, 0 when the plan is unknown.
    pub fn generate_grocery_list_from_meal(&mut self, meal_plan_id: &str) -> usize {
        let Some(plan) = self.meal_plan(meal_plan_id) else {
            return 0;
        };
        let ingredients = plan.ingredients.clone();
        let count = ingredients.len();
        for ingredient in ingredients {
            self.add_item(
                NewItem::named(ingredient)
                    .with_quantity(1, DEFAULT_UNIT)
                    .with_category(DEFAULT_CATEGORY),
            );
        }
        count
    }

    // --- Suggestions ---

    /// Replace the suggestion list with the seed terms containing `query`
    /// (case-insensitive). Queries shorter than two characters leave the
    /// current list alone.
    ///
    /// This is the only writer of the stored list. Model-backed suggestions are
    /// returned to the caller separately and never merged in here.
    pub fn update_suggestions(&mut self, query: &str) {
        if query.chars().count() < MIN_SUGGESTION_QUERY {
            return;
        }
        let needle = query.to_lowercase();
        self.suggestions = COMMON_SUGGESTIONS
            .iter()
            .filter(|s| s.to_lowercase().contains(&needle))
            .map(ToString::to_string)
            .collect();
    }

    // --- Named lists ---

    pub fn create_list(&mut self, draft: NewList) -> &GroceryList {
        let members = draft.created_by.iter().cloned().collect();
        self.lists.push(GroceryList {
            id: new_id(),
            name: draft.name,
            color: draft.color,
            members,
            created_by: draft.created_by,
            items: Vec::new(),
            created_at: Utc::now(),
        });
        &self.lists[self.lists.len() - 1]
    }

    /// Delete a list together with every item it owns.
    pub fn delete_list(&mut self, id: &str) -> bool {
        let before = self.lists.len();
        self.lists.retain(|l| l.id != id);
        self.lists.len() != before
    }

    /// Add a member name to a list unless it is already there.
    pub fn add_list_member(&mut self, list_id: &str, member: &str) -> bool {
        let Some(list) = self.list_mut(list_id) else {
            return false;
        };
        if !list.members.iter().any(|m| m == member) {
            list.members.push(member.to_string());
        }
        true
    }

    pub fn add_item_to_list(&mut self, list_id: &str, draft: NewItem) -> Option<&Item> {
        let list = self.list_mut(list_id)?;
        list.items.push(draft.into_item(new_id(), Utc::now()));
        list.items.last()
    }

    pub fn remove_item_from_list(&mut self, list_id: &str, item_id: &str) -> bool {
        let Some(list) = self.list_mut(list_id) else {
            return false;
        };
        let before = list.items.len();
        list.items.retain(|i| i.id != item_id);
        list.items.len() != before
    }

    pub fn toggle_list_item_complete(&mut self, list_id: &str, item_id: &str) -> Option<&Item> {
        let item = self
            .list_mut(list_id)?
            .items
            .iter_mut()
            .find(|i| i.id == item_id)?;
        item.is_completed = !item.is_completed;
        Some(&*item)
    }

    fn list_mut(&mut self, id: &str) -> Option<&mut GroceryList> {
        self.lists.iter_mut().find(|l| l.id == id)
    }

    // --- Reset ---

    /// Drop all items, meal plans and lists, and restore the default
    /// categories and suggestion seed.
    pub fn clear_all_data(&mut self) {
        *self = Self::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meal(ingredients: &[&str]) -> NewMealPlan {
        NewMealPlan {
            name: "Tacos".to_string(),
            description: "Taco night".to_string(),
            ingredients: ingredients.iter().map(ToString::to_string).collect(),
            servings: 4,
        }
    }

    #[test]
    fn test_new_store_has_seed_data() {
        let store = GroceryStore::new();
        assert!(store.items().is_empty());
        assert!(store.meal_plans().is_empty());
        assert!(store.lists().is_empty());
        assert_eq!(store.categories().len(), 8);
        assert_eq!(store.suggestions().len(), 20);
    }

    #[test]
    fn test_add_then_delete_restores_size() {
        let mut store = GroceryStore::new();
        store.add_item(NewItem::named("Bread"));
        let before = store.items().len();

        let id = store.add_item(NewItem::named("Milk")).id.clone();
        assert_eq!(store.items().len(), before + 1);

        assert!(store.delete_item(&id));
        assert_eq!(store.items().len(), before);
        assert!(store.item(&id).is_none());
    }

    #[test]
    fn test_add_item_assigns_unique_ids() {
        let mut store = GroceryStore::new();
        let a = store.add_item(NewItem::named("Eggs")).id.clone();
        let b = store.add_item(NewItem::named("Eggs")).id.clone();
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_item_accepts_odd_values() {
        let mut store = GroceryStore::new();
        let item = store.add_item(
            NewItem::named("Mystery")
                .with_quantity(-3, "crate")
                .with_price(-1.0),
        );
        assert_eq!(item.quantity, -3);
        assert_eq!(item.price, Some(-1.0));
    }

    #[test]
    fn test_missing_ids_are_noops() {
        let mut store = GroceryStore::new();
        store.add_item(NewItem::named("Rice"));
        let snapshot = store.items().to_vec();

        assert!(!store.delete_item("nope"));
        assert!(store.toggle_item_complete("nope").is_none());
        let update = ItemUpdate {
            name: Some("Changed".to_string()),
            ..ItemUpdate::default()
        };
        assert!(store.update_item("nope", &update).is_none());
        assert_eq!(store.items(), snapshot.as_slice());
    }

    #[test]
    fn test_update_item_merges_fields() {
        let mut store = GroceryStore::new();
        let id = store
            .add_item(NewItem::named("Apples").with_category("Fruits & Vegetables"))
            .id
            .clone();
        let update = ItemUpdate {
            quantity: Some(6),
            price: Some(Some(0.4)),
            ..ItemUpdate::default()
        };
        let item = store.update_item(&id, &update).unwrap();
        assert_eq!(item.quantity, 6);
        assert_eq!(item.price, Some(0.4));
        assert_eq!(item.name, "Apples");
        assert_eq!(item.category, "Fruits & Vegetables");
    }

    #[test]
    fn test_toggle_is_an_involution() {
        let mut store = GroceryStore::new();
        let id = store.add_item(NewItem::named("Salt")).id.clone();
        let before = store.item(&id).unwrap().is_completed;

        assert_eq!(
            store.toggle_item_complete(&id).unwrap().is_completed,
            !before
        );
        assert_eq!(
            store.toggle_item_complete(&id).unwrap().is_completed,
            before
        );
    }

    #[test]
    fn test_clear_completed() {
        let mut store = GroceryStore::new();
        let id = store.add_item(NewItem::named("Milk")).id.clone();
        store.add_item(NewItem::named("Bread"));
        store.toggle_item_complete(&id);

        assert_eq!(store.clear_completed(), 1);
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].name, "Bread");
    }

    #[test]
    fn test_add_category_allows_duplicate_names() {
        let mut store = GroceryStore::new();
        let draft = NewCategory {
            name: "Pantry".to_string(),
            icon: "🧂".to_string(),
            color: "#000000".to_string(),
        };
        let id = store.add_category(draft.clone()).id.clone();
        store.add_category(draft);
        assert_eq!(store.categories().len(), 10);
        assert!(!id.is_empty());
        assert!(store.categories()[..8].iter().all(|c| c.id != id));
    }

    #[test]
    fn test_generate_grocery_list_from_meal() {
        let mut store = GroceryStore::new();
        store.add_item(NewItem::named("Bread"));
        let plan_id = store
            .add_meal_plan(meal(&["tortillas", "ground beef", "salsa"]))
            .id
            .clone();
        let before = store.items().len();

        assert_eq!(store.generate_grocery_list_from_meal(&plan_id), 3);
        assert_eq!(store.items().len(), before + 3);
        for item in &store.items()[before..] {
            assert_eq!(item.category, "Pantry");
            assert_eq!(item.quantity, 1);
            assert_eq!(item.unit, "piece");
            assert!(!item.is_completed);
        }
        let names: Vec<&str> = store.items()[before..]
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(names, ["tortillas", "ground beef", "salsa"]);

        // The plan itself is left as it was
        assert_eq!(store.meal_plan(&plan_id).unwrap().ingredients.len(), 3);
    }

    #[test]
    fn test_generate_grocery_list_unknown_meal() {
        let mut store = GroceryStore::new();
        store.add_meal_plan(meal(&["beans"]));
        assert_eq!(store.generate_grocery_list_from_meal("missing"), 0);
        assert!(store.items().is_empty());
    }

    #[test]
    fn test_update_suggestions_filters_seed() {
        let mut store = GroceryStore::new();
        store.update_suggestions("to");
        assert_eq!(store.suggestions(), ["Tomatoes", "Potatoes"]);

        store.update_suggestions("OIL");
        assert_eq!(store.suggestions(), ["Olive Oil"]);

        store.update_suggestions("zzz");
        assert!(store.suggestions().is_empty());
    }

    #[test]
    fn test_update_suggestions_ignores_short_query() {
        let mut store = GroceryStore::new();
        store.update_suggestions("mi");
        assert_eq!(store.suggestions(), ["Milk"]);
        store.update_suggestions("b");
        assert_eq!(store.suggestions(), ["Milk"]);
        store.update_suggestions("");
        assert_eq!(store.suggestions(), ["Milk"]);
    }

    #[test]
    fn test_list_item_operations() {
        let mut store = GroceryStore::new();
        let list_id = store
            .create_list(NewList {
                name: "Weekend".to_string(),
                color: Some("#22c55e".to_string()),
                created_by: None,
            })
            .id
            .clone();

        let item_id = store
            .add_item_to_list(&list_id, NewItem::named("Chips"))
            .unwrap()
            .id
            .clone();
        assert!(store.items().is_empty());
        assert_eq!(store.list(&list_id).unwrap().items.len(), 1);

        assert!(
            store
                .toggle_list_item_complete(&list_id, &item_id)
                .unwrap()
                .is_completed
        );
        assert_eq!(store.list(&list_id).unwrap().completion_percentage(), 100);
        assert!(
            !store
                .toggle_list_item_complete(&list_id, &item_id)
                .unwrap()
                .is_completed
        );

        assert!(store.remove_item_from_list(&list_id, &item_id));
        assert!(!store.remove_item_from_list(&list_id, &item_id));
        assert!(store.list(&list_id).unwrap().items.is_empty());
    }

    #[test]
    fn test_list_ops_on_unknown_list_are_noops() {
        let mut store = GroceryStore::new();
        store.create_list(NewList::named("Main"));
        let snapshot = store.lists().to_vec();

        assert!(
            store
                .add_item_to_list("nope", NewItem::named("Tea"))
                .is_none()
        );
        assert!(!store.remove_item_from_list("nope", "x"));
        assert!(store.toggle_list_item_complete("nope", "x").is_none());
        assert!(!store.add_list_member("nope", "sam"));
        assert!(!store.delete_list("nope"));
        assert_eq!(store.lists(), snapshot.as_slice());
    }

    #[test]
    fn test_delete_list_drops_nested_items() {
        let mut store = GroceryStore::new();
        let keep = store.create_list(NewList::named("Keep")).id.clone();
        let doomed = store.create_list(NewList::named("Doomed")).id.clone();
        store.add_item_to_list(&keep, NewItem::named("Tea"));
        let nested: Vec<String> = ["Coffee", "Sugar"]
            .into_iter()
            .map(|n| {
                store
                    .add_item_to_list(&doomed, NewItem::named(n))
                    .unwrap()
                    .id
                    .clone()
            })
            .collect();

        assert!(store.delete_list(&doomed));
        assert!(store.list(&doomed).is_none());
        assert_eq!(store.lists().len(), 1);

        let reachable: Vec<&str> = store
            .items()
            .iter()
            .chain(store.lists().iter().flat_map(|l| &l.items))
            .map(|i| i.id.as_str())
            .collect();
        for id in &nested {
            assert!(!reachable.contains(&id.as_str()));
        }
    }

    #[test]
    fn test_family_list_members() {
        let mut store = GroceryStore::new();
        let id = store
            .create_list(NewList {
                name: "Family".to_string(),
                color: None,
                created_by: Some("alex".to_string()),
            })
            .id
            .clone();
        assert_eq!(store.list(&id).unwrap().members, ["alex"]);

        assert!(store.add_list_member(&id, "sam"));
        assert!(store.add_list_member(&id, "sam"));
        assert_eq!(store.list(&id).unwrap().members, ["alex", "sam"]);
    }

    #[test]
    fn test_clear_all_data_restores_defaults() {
        let mut store = GroceryStore::new();
        store.add_item(NewItem::named("Milk"));
        store.add_category(NewCategory {
            name: "Household".to_string(),
            icon: "🧽".to_string(),
            color: "#64748b".to_string(),
        });
        store.add_meal_plan(meal(&["rice"]));
        store.create_list(NewList::named("Party"));
        store.update_suggestions("zzz");

        store.clear_all_data();

        assert!(store.items().is_empty());
        assert!(store.meal_plans().is_empty());
        assert!(store.lists().is_empty());
        assert_eq!(store.categories(), default_categories().as_slice());
        assert_eq!(store.suggestions().len(), COMMON_SUGGESTIONS.len());
    }

    #[test]
    fn test_filters_and_category_lookup() {
        let mut store = GroceryStore::new();
        let id = store
            .add_item(NewItem::named("Milk").with_category("Dairy & Eggs"))
            .id
            .clone();
        store.add_item(NewItem::named("Rice"));
        store.add_item(NewItem::named("Glitter").with_category("Crafts"));
        store.toggle_item_complete(&id);

        assert_eq!(store.filtered_items(ItemFilter::All).len(), 3);
        assert_eq!(store.filtered_items(ItemFilter::Completed).len(), 1);
        assert_eq!(store.filtered_items(ItemFilter::Pending).len(), 2);
        assert_eq!(store.items_in_category("Dairy & Eggs").len(), 1);
        // Dangling category names are kept as-is
        assert_eq!(store.items_in_category("Crafts").len(), 1);
    }

    #[test]
    fn test_low_stock_items() {
        let mut store = GroceryStore::new();
        let mut draft = NewItem::named("Coffee").with_quantity(1, "bag");
        draft.low_stock_threshold = Some(2);
        store.add_item(draft);
        store.add_item(NewItem::named("Tea").with_quantity(1, "box"));

        let low: Vec<&str> = store
            .low_stock_items()
            .iter()
            .map(|i| i.name.as_str())
            .collect();
        assert_eq!(low, ["Coffee"]);
    }

    #[test]
    fn test_stats() {
        let mut store = GroceryStore::new();
        let id = store
            .add_item(NewItem::named("Steak").with_price(12.5))
            .id
            .clone();
        store.add_item(NewItem::named("Rice").with_price(2.0));
        store.add_item(NewItem::named("Salt"));
        store.toggle_item_complete(&id);
        let list = store.create_list(NewList::named("Party")).id.clone();
        let nested = store
            .add_item_to_list(&list, NewItem::named("Chips"))
            .unwrap()
            .id
            .clone();
        store.add_item_to_list(&list, NewItem::named("Soda"));
        store.toggle_list_item_complete(&list, &nested);

        let stats = store.stats();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.completed_items, 1);
        assert_eq!(stats.completion_pct, 33);
        assert!((stats.total_spent - 14.5).abs() < 1e-9);
        assert_eq!(stats.list_count, 1);
        assert_eq!(stats.total_list_items, 2);
        assert_eq!(stats.completed_list_items, 1);
        assert_eq!(stats.list_completion_pct, 50);
    }
}
