pub mod chat;
pub mod health;

use crate::state::AppState;
use axum::Router;

pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state.clone()))
        .merge(health::routes(state))
}
