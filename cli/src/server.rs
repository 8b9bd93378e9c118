use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use grozo_core::analytics::{
    RouteStop, ShoppingTip, TotalEstimate, calculate_total_estimate, generate_shopping_route,
    shopping_tips,
};
use grozo_core::export::{export_text, write_items_csv};
use grozo_core::models::{
    Category, GroceryList, Item, ItemFilter, ItemUpdate, MealPlan, NewCategory, NewItem, NewList,
    NewMealPlan, StoreStats, validate_name, validate_servings,
};
use grozo_core::store::GroceryStore;
use grozo_core::suggest::SuggestionClient;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    store: Arc<Mutex<GroceryStore>>,
    suggest: SuggestionClient,
    api_key: Option<String>,
}

impl AppState {
    /// Lock the store. A panic mid-operation leaves it consistent enough to keep serving.
    fn store(&self) -> MutexGuard<'_, GroceryStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// --- Request / Response types ---

#[derive(Deserialize, Default, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
enum ExportFormat {
    #[default]
    Text,
    Csv,
}

#[derive(Deserialize)]
struct ExportQuery {
    #[serde(default)]
    format: ExportFormat,
}

#[derive(Deserialize)]
struct ItemsQuery {
    #[serde(default)]
    filter: ItemFilter,
}

#[derive(Deserialize)]
struct SuggestionQuery {
    q: String,
}

#[derive(Deserialize)]
struct CategorizeRequest {
    name: String,
}

fn default_servings() -> u32 {
    4
}

#[derive(Deserialize)]
struct GenerateMealsRequest {
    preferences: String,
    #[serde(default = "default_servings")]
    servings: u32,
}

#[derive(Deserialize)]
struct MemberRequest {
    name: String,
}

#[derive(Serialize)]
struct CategorizeResponse {
    item: String,
    category: String,
    fallback: bool,
}

#[derive(Serialize)]
struct GeneratedMealsResponse {
    fallback: bool,
    meal_plans: Vec<MealPlan>,
}

#[derive(Serialize)]
struct RemoteSuggestionsResponse {
    fallback: bool,
    suggestions: Vec<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Internal(err) => {
                let error = format!("{err:#}");
                tracing::error!(%error, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err)
    }
}

fn bad_request(err: &anyhow::Error) -> ApiError {
    ApiError::BadRequest(format!("{err}"))
}

fn item_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("Item {id} not found"))
}

fn list_not_found(id: &str) -> ApiError {
    ApiError::NotFound(format!("List {id} not found"))
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Store snapshot ---

async fn get_state(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let store = state.store();
    let value = serde_json::to_value(&*store).context("failed to serialize store")?;
    Ok(Json(value))
}

async fn get_stats(State(state): State<AppState>) -> Json<StoreStats> {
    Json(state.store().stats())
}

async fn reset(State(state): State<AppState>) -> StatusCode {
    state.store().clear_all_data();
    tracing::info!("store reset to defaults");
    StatusCode::NO_CONTENT
}

async fn export(
    State(state): State<AppState>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    if query.format == ExportFormat::Csv {
        let mut buf = Vec::new();
        write_items_csv(state.store().items(), &mut buf)?;
        return Ok((
            [
                (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"grozo-items.csv\"",
                ),
            ],
            buf,
        )
            .into_response());
    }

    let today = chrono::Local::now().date_naive();
    let text = export_text(&state.store(), today);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response())
}

// --- Items ---

async fn list_items(
    State(state): State<AppState>,
    Query(query): Query<ItemsQuery>,
) -> Json<Vec<Item>> {
    let store = state.store();
    Json(
        store
            .filtered_items(query.filter)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn create_item(
    State(state): State<AppState>,
    Json(mut draft): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    draft.name = validate_name("item name", &draft.name).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    let item = store.add_item(draft).clone();
    Ok((StatusCode::CREATED, Json(item)))
}

async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut update): Json<ItemUpdate>,
) -> Result<Json<Item>, ApiError> {
    if update.is_empty() {
        return Err(ApiError::BadRequest(
            "At least one field must be provided".to_string(),
        ));
    }
    if let Some(name) = &update.name {
        update.name = Some(validate_name("item name", name).map_err(|e| bad_request(&e))?);
    }

    let mut store = state.store();
    let item = store
        .update_item(&id, &update)
        .ok_or_else(|| item_not_found(&id))?;
    Ok(Json(item.clone()))
}

async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_item(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found(&id))
    }
}

async fn toggle_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Item>, ApiError> {
    let mut store = state.store();
    let item = store
        .toggle_item_complete(&id)
        .ok_or_else(|| item_not_found(&id))?;
    Ok(Json(item.clone()))
}

async fn clear_completed(State(state): State<AppState>) -> Json<serde_json::Value> {
    let removed = state.store().clear_completed();
    Json(serde_json::json!({ "removed": removed }))
}

async fn low_stock(State(state): State<AppState>) -> Json<Vec<Item>> {
    let store = state.store();
    Json(store.low_stock_items().into_iter().cloned().collect())
}

// --- Categories ---

async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.store().categories().to_vec())
}

async fn create_category(
    State(state): State<AppState>,
    Json(mut draft): Json<NewCategory>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    draft.name = validate_name("category name", &draft.name).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    let category = store.add_category(draft).clone();
    Ok((StatusCode::CREATED, Json(category)))
}

async fn categorize(
    State(state): State<AppState>,
    Json(req): Json<CategorizeRequest>,
) -> Result<Json<CategorizeResponse>, ApiError> {
    let item = validate_name("item name", &req.name).map_err(|e| bad_request(&e))?;
    let outcome = state.suggest.categorize_item(&item).await;
    Ok(Json(CategorizeResponse {
        item,
        fallback: outcome.is_fallback(),
        category: outcome.into_inner(),
    }))
}

// --- Meal plans ---

async fn list_meal_plans(State(state): State<AppState>) -> Json<Vec<MealPlan>> {
    Json(state.store().meal_plans().to_vec())
}

async fn create_meal_plan(
    State(state): State<AppState>,
    Json(mut draft): Json<NewMealPlan>,
) -> Result<(StatusCode, Json<MealPlan>), ApiError> {
    draft.name = validate_name("meal name", &draft.name).map_err(|e| bad_request(&e))?;
    validate_servings(draft.servings).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    let plan = store.add_meal_plan(draft).clone();
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn generate_meal_plans(
    State(state): State<AppState>,
    Json(req): Json<GenerateMealsRequest>,
) -> Result<(StatusCode, Json<GeneratedMealsResponse>), ApiError> {
    let preferences =
        validate_name("meal preference", &req.preferences).map_err(|e| bad_request(&e))?;
    let servings = validate_servings(req.servings).map_err(|e| bad_request(&e))?;

    // The model call happens before the store is locked.
    let outcome = state.suggest.generate_meal_plan(&preferences, servings).await;
    let fallback = outcome.is_fallback();

    let mut store = state.store();
    let meal_plans = outcome
        .into_inner()
        .into_iter()
        .map(|meal| store.add_meal_plan(meal.into_new_meal_plan(servings)).clone())
        .collect();

    Ok((
        StatusCode::CREATED,
        Json(GeneratedMealsResponse {
            fallback,
            meal_plans,
        }),
    ))
}

async fn meal_to_grocery_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut store = state.store();
    if store.meal_plan(&id).is_none() {
        return Err(ApiError::NotFound(format!("Meal plan {id} not found")));
    }
    let added = store.generate_grocery_list_from_meal(&id);
    Ok(Json(serde_json::json!({ "added": added })))
}

// --- Suggestions ---

async fn local_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Json<Vec<String>> {
    let mut store = state.store();
    store.update_suggestions(&query.q);
    Json(store.suggestions().to_vec())
}

async fn remote_suggestions(
    State(state): State<AppState>,
    Query(query): Query<SuggestionQuery>,
) -> Json<RemoteSuggestionsResponse> {
    let existing: Vec<String> = state
        .store()
        .items()
        .iter()
        .map(|i| i.name.clone())
        .collect();
    let outcome = state.suggest.grocery_suggestions(&query.q, &existing).await;
    Json(RemoteSuggestionsResponse {
        fallback: outcome.is_fallback(),
        suggestions: outcome.into_inner(),
    })
}

// --- Named lists ---

async fn list_lists(State(state): State<AppState>) -> Json<Vec<GroceryList>> {
    Json(state.store().lists().to_vec())
}

async fn create_list(
    State(state): State<AppState>,
    Json(mut draft): Json<NewList>,
) -> Result<(StatusCode, Json<GroceryList>), ApiError> {
    draft.name = validate_name("list name", &draft.name).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    let list = store.create_list(draft).clone();
    Ok((StatusCode::CREATED, Json(list)))
}

async fn delete_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.store().delete_list(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(list_not_found(&id))
    }
}

async fn add_list_member(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<MemberRequest>,
) -> Result<Json<GroceryList>, ApiError> {
    let member = validate_name("member name", &req.name).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    if !store.add_list_member(&id, &member) {
        return Err(list_not_found(&id));
    }
    let list = store.list(&id).cloned().ok_or_else(|| list_not_found(&id))?;
    Ok(Json(list))
}

async fn add_list_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut draft): Json<NewItem>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    draft.name = validate_name("item name", &draft.name).map_err(|e| bad_request(&e))?;
    let mut store = state.store();
    let item = store
        .add_item_to_list(&id, draft)
        .cloned()
        .ok_or_else(|| list_not_found(&id))?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn remove_list_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    if state.store().remove_item_from_list(&id, &item_id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(item_not_found(&item_id))
    }
}

async fn toggle_list_item(
    State(state): State<AppState>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<Item>, ApiError> {
    let mut store = state.store();
    let item = store
        .toggle_list_item_complete(&id, &item_id)
        .cloned()
        .ok_or_else(|| item_not_found(&item_id))?;
    Ok(Json(item))
}

// --- Analytics ---

fn items_snapshot(state: &AppState) -> Vec<Item> {
    state.store().items().to_vec()
}

async fn get_estimate(State(state): State<AppState>) -> Json<TotalEstimate> {
    Json(calculate_total_estimate(&items_snapshot(&state)))
}

async fn get_route(State(state): State<AppState>) -> Json<Vec<RouteStop>> {
    Json(generate_shopping_route(&items_snapshot(&state)))
}

async fn get_tips(State(state): State<AppState>) -> Json<Vec<ShoppingTip>> {
    let items = items_snapshot(&state);
    Json(shopping_tips(&state.suggest, &items).await)
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/state", get(get_state))
        .route("/api/stats", get(get_stats))
        .route("/api/reset", post(reset))
        .route("/api/export", get(export))
        .route("/api/items", get(list_items).post(create_item))
        .route("/api/items/clear-completed", post(clear_completed))
        .route("/api/items/low-stock", get(low_stock))
        .route("/api/items/{id}", put(update_item).delete(delete_item))
        .route("/api/items/{id}/toggle", post(toggle_item))
        .route("/api/categories", get(list_categories).post(create_category))
        .route("/api/categorize", post(categorize))
        .route(
            "/api/meal-plans",
            get(list_meal_plans).post(create_meal_plan),
        )
        .route("/api/meal-plans/generate", post(generate_meal_plans))
        .route(
            "/api/meal-plans/{id}/grocery-list",
            post(meal_to_grocery_list),
        )
        .route("/api/suggestions", get(local_suggestions))
        .route("/api/suggestions/remote", get(remote_suggestions))
        .route("/api/lists", get(list_lists).post(create_list))
        .route("/api/lists/{id}", delete(delete_list))
        .route("/api/lists/{id}/members", post(add_list_member))
        .route("/api/lists/{id}/items", post(add_list_item))
        .route(
            "/api/lists/{id}/items/{item_id}",
            delete(remove_list_item),
        )
        .route(
            "/api/lists/{id}/items/{item_id}/toggle",
            post(toggle_list_item),
        )
        .route("/api/analytics/estimate", get(get_estimate))
        .route("/api/analytics/route", get(get_route))
        .route("/api/analytics/tips", get(get_tips))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    suggest: SuggestionClient,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        store: Arc::new(Mutex::new(GroceryStore::new())),
        suggest,
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        let head = key.get(..4).unwrap_or_default();
        let tail = key.get(key.len().saturating_sub(4)..).unwrap_or_default();
        eprintln!("API key: {head}...{tail} (see api_key file in data directory)");
    } else {
        tracing::warn!("authentication disabled (--no-auth); API is open to anyone");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        tracing::warn!(
            bind,
            "listening with no authentication; any device on your network can access this API"
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}"))
        .await
        .with_context(|| format!("failed to bind {bind}:{port}"))?;
    tracing::info!("listening on http://{bind}:{port} (in-memory store, discarded on exit)");
    axum::serve(listener, app).await?;

    Ok(())
}
