use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod password;
pub mod session;
pub mod store;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
