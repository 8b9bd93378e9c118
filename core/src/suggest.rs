//! Model-assisted suggestions, categorisation, meal planning and tips.
//!
//! The language model sits behind [`TextGenerator`]: one free-text prompt in,
//! free text out. Everything here tolerates whatever comes back. Transport
//! errors, empty replies and unparseable payloads are logged and replaced by a
//! deterministic fallback, so callers always get a usable value.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{CATEGORY_NAMES, DEFAULT_CATEGORY, NewMealPlan};

pub const MAX_SUGGESTIONS: usize = 8;
pub const MAX_TIPS: usize = 5;

/// A remote text-generation endpoint.
///
/// The CLI implements this over HTTP with reqwest; tests use canned replies.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// A value produced by the model, or the fallback used in its place.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Generated(T),
    Fallback(T),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn into_inner(self) -> T {
        match self {
            Self::Generated(v) | Self::Fallback(v) => v,
        }
    }

    #[must_use]
    pub fn value(&self) -> &T {
        match self {
            Self::Generated(v) | Self::Fallback(v) => v,
        }
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }

    /// The model's value, or `None` if this is a fallback.
    #[must_use]
    pub fn generated(self) -> Option<T> {
        match self {
            Self::Generated(v) => Some(v),
            Self::Fallback(_) => None,
        }
    }
}

/// One meal as returned by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMeal {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
}

impl GeneratedMeal {
    #[must_use]
    pub fn into_new_meal_plan(self, servings: u32) -> NewMealPlan {
        NewMealPlan {
            name: self.name,
            description: self.description,
            ingredients: self.ingredients,
            servings,
        }
    }
}

#[derive(Deserialize)]
struct MealPlanPayload {
    meals: Vec<GeneratedMeal>,
}

// --- Prompts ---

#[must_use]
pub fn suggestions_prompt(query: &str, existing_items: &[String]) -> String {
    let existing = existing_items.join(", ");
    format!(
        "Given the search query \"{query}\" and existing grocery items [{existing}], \
         suggest 5-8 relevant grocery items that would complement this search.\n\
         Return only the item names, one per line, without numbers or bullets.\n\
         Focus on common grocery items that people typically buy together."
    )
}

#[must_use]
pub fn meal_plan_prompt(preferences: &str, servings: u32) -> String {
    format!(
        "Create a weekly meal plan for {servings} people with these preferences: {preferences}.\n\
         Return 7 meals in this exact JSON format:\n\
         {{\"meals\": [{{\"name\": \"Meal Name\", \"description\": \"Brief description\", \
         \"ingredients\": [\"ingredient1\", \"ingredient2\"]}}]}}\n\
         Focus on practical, common ingredients that are easy to find in grocery stores."
    )
}

#[must_use]
pub fn categorize_prompt(item_name: &str) -> String {
    let options: String = CATEGORY_NAMES.iter().map(|c| format!("- {c}\n")).collect();
    format!("Categorize this grocery item: \"{item_name}\"\nReturn only one of these categories:\n{options}")
}

#[must_use]
pub fn tips_prompt(item_names: &[String]) -> String {
    let items = item_names.join(", ");
    format!(
        "Given this grocery list: [{items}]\n\
         Provide 3-5 helpful shopping tips, money-saving advice, or recipe suggestions.\n\
         Return each tip on a new line without numbers or bullets.\n\
         Keep tips practical and actionable."
    )
}

// --- Response parsing ---

/// Split a reply into trimmed, non-empty lines, dropping list bullets, at most `max`.
#[must_use]
pub fn parse_line_list(text: &str, max: usize) -> Vec<String> {
    text.lines()
        .map(|line| line.trim().trim_start_matches(['-', '*', '•']).trim())
        .filter(|line| !line.is_empty())
        .take(max)
        .map(String::from)
        .collect()
}

/// Pull the `{"meals": [...]}` object out of a reply.
///
/// Code-fence markers are stripped and the payload is taken from the first
/// `{` to the last `}`, so prose around the JSON is ignored. Meals without a
/// name are dropped; `None` if nothing usable is left.
#[must_use]
pub fn parse_meal_plan(text: &str) -> Option<Vec<GeneratedMeal>> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('{')?;
    let end = cleaned.rfind('}')?;
    if end < start {
        return None;
    }
    let payload: MealPlanPayload = serde_json::from_str(&cleaned[start..=end]).ok()?;
    let meals: Vec<GeneratedMeal> = payload
        .meals
        .into_iter()
        .filter(|m| !m.name.trim().is_empty())
        .collect();
    if meals.is_empty() { None } else { Some(meals) }
}

/// Find the category label mentioned in a reply, case-insensitively.
///
/// The reply only has to contain a label. If several appear, the earliest
/// mention wins.
#[must_use]
pub fn match_category(text: &str) -> Option<&'static str> {
    let haystack = text.to_lowercase();
    CATEGORY_NAMES
        .iter()
        .filter_map(|name| haystack.find(&name.to_lowercase()).map(|pos| (pos, *name)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, name)| name)
}

// --- Fallbacks ---

#[must_use]
pub fn fallback_meals() -> Vec<GeneratedMeal> {
    let meal = |name: &str, description: &str, ingredients: &[&str]| GeneratedMeal {
        name: name.to_string(),
        description: description.to_string(),
        ingredients: ingredients.iter().map(ToString::to_string).collect(),
    };
    vec![
        meal(
            "Simple Pasta",
            "Quick and easy pasta dish",
            &["pasta", "tomato sauce", "cheese", "garlic", "olive oil"],
        ),
        meal(
            "Vegetable Stir Fry",
            "Colourful vegetables tossed with rice",
            &["rice", "broccoli", "carrots", "bell pepper", "soy sauce"],
        ),
        meal(
            "Chicken Salad",
            "Light salad with grilled chicken",
            &["chicken breast", "lettuce", "tomatoes", "cucumber", "olive oil"],
        ),
    ]
}

#[must_use]
pub fn fallback_tips() -> Vec<String> {
    vec![
        "Buy seasonal produce for better prices".to_string(),
        "Check store brands for savings".to_string(),
    ]
}

// --- Client ---

/// Turns grocery intents into prompts and replies into typed values.
#[derive(Clone)]
pub struct SuggestionClient {
    generator: Arc<dyn TextGenerator>,
}

impl SuggestionClient {
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Send a prompt, returning `None` on error or a blank reply.
    async fn ask(&self, intent: &str, prompt: &str) -> Option<String> {
        match self.generator.generate(prompt).await {
            Ok(text) if !text.trim().is_empty() => Some(text),
            Ok(_) => {
                tracing::warn!(intent, "empty reply from text generator");
                None
            }
            Err(err) => {
                let error = format!("{err:#}");
                tracing::warn!(intent, %error, "text generator request failed");
                None
            }
        }
    }

    /// Up to eight item names that go with `query`. Empty on failure.
    pub async fn grocery_suggestions(
        &self,
        query: &str,
        existing_items: &[String],
    ) -> Outcome<Vec<String>> {
        let prompt = suggestions_prompt(query, existing_items);
        match self.ask("suggestions", &prompt).await {
            Some(text) => Outcome::Generated(parse_line_list(&text, MAX_SUGGESTIONS)),
            None => Outcome::Fallback(Vec::new()),
        }
    }

    /// Meals for the given preferences. Never empty: canned meals stand in
    /// when the reply is missing or unparseable.
    pub async fn generate_meal_plan(
        &self,
        preferences: &str,
        servings: u32,
    ) -> Outcome<Vec<GeneratedMeal>> {
        let prompt = meal_plan_prompt(preferences, servings);
        let Some(text) = self.ask("meal_plan", &prompt).await else {
            return Outcome::Fallback(fallback_meals());
        };
        if let Some(meals) = parse_meal_plan(&text) {
            Outcome::Generated(meals)
        } else {
            tracing::warn!(intent = "meal_plan", "unparseable meal plan reply");
            Outcome::Fallback(fallback_meals())
        }
    }

    /// One of the eight category labels; the default category when the reply
    /// names none of them.
    pub async fn categorize_item(&self, item_name: &str) -> Outcome<String> {
        let prompt = categorize_prompt(item_name);
        let matched = self
            .ask("categorize", &prompt)
            .await
            .and_then(|text| match_category(&text));
        match matched {
            Some(category) => Outcome::Generated(category.to_string()),
            None => Outcome::Fallback(DEFAULT_CATEGORY.to_string()),
        }
    }

    /// Up to five tips for the list. An empty list gets the generic pair
    /// without asking the model.
    pub async fn shopping_tips(&self, item_names: &[String]) -> Outcome<Vec<String>> {
        if item_names.is_empty() {
            return Outcome::Fallback(fallback_tips());
        }
        let prompt = tips_prompt(item_names);
        let tips = self
            .ask("tips", &prompt)
            .await
            .map(|text| parse_line_list(&text, MAX_TIPS))
            .filter(|tips| !tips.is_empty());
        match tips {
            Some(tips) => Outcome::Generated(tips),
            None => Outcome::Fallback(fallback_tips()),
        }
    }
}
