use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::api::AppState;
use crate::engine::Aggregation;
use crate::models::{
    CreateMealInput, ManualItem, Meal, Snapshot, SnapshotError, TabId, UpdateMealInput,
};
use crate::suggest::SuggestError;

// ============================================================
// Error Handling
// ============================================================

/// Log an internal error and return a sanitized response to the client.
/// The full error is logged server-side for debugging, but clients only
/// see a generic message to avoid leaking internal details.
fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    tracing::error!("Internal error: {}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".to_string(),
    )
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Meal catalog
// ============================================================

pub async fn list_meals(State(state): State<AppState>) -> Json<Vec<Meal>> {
    Json(state.planner.meals())
}

pub async fn get_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Meal>, (StatusCode, String)> {
    state
        .planner
        .meal(id)
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))
}

pub async fn create_meal(
    State(state): State<AppState>,
    Json(input): Json<CreateMealInput>,
) -> Result<(StatusCode, Json<Meal>), (StatusCode, String)> {
    state
        .planner
        .add_meal(input)
        .map_err(internal_error)?
        .map(|meal| (StatusCode::CREATED, Json(meal)))
        .ok_or((
            StatusCode::BAD_REQUEST,
            "Meal name must not be empty and base servings must be at least 1".to_string(),
        ))
}

pub async fn update_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateMealInput>,
) -> Result<Json<Meal>, (StatusCode, String)> {
    state
        .planner
        .update_meal(id, input)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))
}

pub async fn delete_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    if state.planner.delete_meal(id).map_err(internal_error)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, "Meal not found".to_string()))
    }
}

// ============================================================
// Selection / servings
// ============================================================

pub async fn get_selection(State(state): State<AppState>) -> Json<BTreeMap<Uuid, u32>> {
    Json(state.planner.selection())
}

pub async fn toggle_selection(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BTreeMap<Uuid, u32>>, (StatusCode, String)> {
    if state.planner.meal(id).is_none() {
        return Err((StatusCode::NOT_FOUND, "Meal not found".to_string()));
    }
    state.planner.toggle_selection(id).map_err(internal_error)?;
    Ok(Json(state.planner.selection()))
}

pub async fn deselect_meal(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.planner.deselect(id).map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct SetServingsInput {
    pub servings: u32,
}

pub async fn set_servings(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<SetServingsInput>,
) -> Result<Json<BTreeMap<Uuid, u32>>, (StatusCode, String)> {
    if state.planner.meal(id).is_none() {
        return Err((StatusCode::NOT_FOUND, "Meal not found".to_string()));
    }
    if !state
        .planner
        .set_servings(id, input.servings)
        .map_err(internal_error)?
    {
        return Err((
            StatusCode::BAD_REQUEST,
            "Servings must be a positive integer".to_string(),
        ));
    }
    Ok(Json(state.planner.selection()))
}

// ============================================================
// Shopping list
// ============================================================

pub async fn get_shopping_list(State(state): State<AppState>) -> Json<Aggregation> {
    let aggregation = state.planner.shopping_list();
    if !aggregation.malformed_meals.is_empty() {
        tracing::warn!(
            meal_ids = ?aggregation.malformed_meals,
            "Skipped meals with zero base servings during aggregation"
        );
    }
    Json(aggregation)
}

pub async fn add_shopping_item(
    State(state): State<AppState>,
    Json(item): Json<ManualItem>,
) -> Result<(StatusCode, Json<Aggregation>), (StatusCode, String)> {
    if !state.planner.add_manual_item(item).map_err(internal_error)? {
        return Err((
            StatusCode::BAD_REQUEST,
            "Item name must not be empty and quantity must be positive".to_string(),
        ));
    }
    Ok((StatusCode::CREATED, Json(state.planner.shopping_list())))
}

pub async fn remove_shopping_line(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, (StatusCode, String)> {
    state
        .planner
        .remove_shopping_line(&key)
        .map_err(internal_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================
// Tabs
// ============================================================

pub async fn get_tabs(State(state): State<AppState>) -> Json<Vec<TabId>> {
    Json(state.planner.tabs())
}

#[derive(Debug, Deserialize)]
pub struct MoveTabInput {
    pub dragged: TabId,
    pub target: TabId,
}

pub async fn move_tab(
    State(state): State<AppState>,
    Json(input): Json<MoveTabInput>,
) -> Result<Json<Vec<TabId>>, (StatusCode, String)> {
    state
        .planner
        .move_tab(input.dragged, input.target)
        .map(Json)
        .map_err(internal_error)
}

// ============================================================
// Snapshot import / export
// ============================================================

pub async fn export_snapshot(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.planner.export_snapshot())
}

pub async fn import_snapshot(
    State(state): State<AppState>,
    body: String,
) -> Result<StatusCode, (StatusCode, String)> {
    match state.planner.import_snapshot(&body) {
        Ok(()) => Ok(StatusCode::NO_CONTENT),
        Err(e @ (SnapshotError::Parse(_) | SnapshotError::MissingFields)) => {
            Err((StatusCode::BAD_REQUEST, e.to_string()))
        }
        Err(SnapshotError::Persist(e)) => Err(internal_error(e)),
    }
}

// ============================================================
// Suggestions
// ============================================================

pub async fn suggest_ingredients(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Meal>, (StatusCode, String)> {
    let Some(meal) = state.planner.meal(id) else {
        return Err((StatusCode::NOT_FOUND, "Meal not found".to_string()));
    };

    let Some(_permit) = state.gate.try_acquire() else {
        return Err((
            StatusCode::CONFLICT,
            "A suggestion request is already in flight".to_string(),
        ));
    };

    let api_key_override = state.planner.manual_api_key();
    let suggestions = state
        .suggest
        .suggest_ingredients(&meal.name, api_key_override.as_deref())
        .await
        .map_err(map_suggest_error)?;

    state
        .planner
        .apply_suggestions(id, suggestions)
        .map_err(internal_error)?
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "Meal not found".to_string()))
}

/// Suggestion failures surface with their own message: the user needs to
/// know whether to configure a key, retry later, or give up on this dish.
fn map_suggest_error(e: SuggestError) -> (StatusCode, String) {
    let status = match e {
        SuggestError::ApiKeyMissing => StatusCode::BAD_REQUEST,
        SuggestError::Http(_) | SuggestError::Api { .. } => StatusCode::BAD_GATEWAY,
        SuggestError::Parse(_) | SuggestError::InvalidUnit(_) => StatusCode::BAD_GATEWAY,
    };
    tracing::warn!("Suggestion request failed: {}", e);
    (status, e.to_string())
}
