mod handlers;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::planner::Planner;
use crate::suggest::{SuggestClient, SuggestionGate};

/// Shared state for the HTTP surface: the planner handle, the suggestion
/// client, and the one-at-a-time suggestion gate.
#[derive(Clone)]
pub struct AppState {
    pub planner: Planner,
    pub suggest: SuggestClient,
    pub gate: Arc<SuggestionGate>,
}

pub fn create_router(planner: Planner, suggest: SuggestClient) -> Router {
    let state = AppState {
        planner,
        suggest,
        gate: Arc::new(SuggestionGate::default()),
    };

    let api = Router::new()
        // Meal catalog
        .route("/meals", get(handlers::list_meals))
        .route("/meals", post(handlers::create_meal))
        .route("/meals/{id}", get(handlers::get_meal))
        .route("/meals/{id}", put(handlers::update_meal))
        .route("/meals/{id}", delete(handlers::delete_meal))
        // Selection / servings
        .route("/meals/{id}/select", post(handlers::toggle_selection))
        .route("/meals/{id}/select", delete(handlers::deselect_meal))
        .route("/meals/{id}/servings", put(handlers::set_servings))
        .route("/selection", get(handlers::get_selection))
        // Shopping list
        .route("/shopping-list", get(handlers::get_shopping_list))
        .route("/shopping-list/items", post(handlers::add_shopping_item))
        .route(
            "/shopping-list/items/{key}",
            delete(handlers::remove_shopping_line),
        )
        // Tabs
        .route("/tabs", get(handlers::get_tabs))
        .route("/tabs", put(handlers::move_tab))
        // Snapshot import/export
        .route("/snapshot", get(handlers::export_snapshot))
        .route("/snapshot", post(handlers::import_snapshot))
        // Suggestions
        .route("/meals/{id}/suggest", post(handlers::suggest_ingredients))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
