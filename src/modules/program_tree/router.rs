use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

use super::controller::{
    create_link, delete_link, get_adjacency_list, get_reverse_adjacency_list, update_link,
};

/// Routes: POST /links, PUT /links/{id}, DELETE /links/{id}, GET /adjacency,
/// GET /reverse-adjacency
pub fn init_program_tree_router() -> Router<AppState> {
    Router::new()
        .route("/links", post(create_link))
        .route("/links/{id}", put(update_link).delete(delete_link))
        .route("/adjacency", get(get_adjacency_list))
        .route("/reverse-adjacency", get(get_reverse_adjacency_list))
}
