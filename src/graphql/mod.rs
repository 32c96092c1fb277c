use axum::{extract::FromRef, routing::get, Router};

use crate::state::AppState;

mod handlers;
mod schema;

pub use schema::{build_schema, AppSchema};

pub const GRAPHQL_PATH: &str = "/graphql";

impl FromRef<AppState> for AppSchema {
    fn from_ref(state: &AppState) -> Self {
        state.schema.clone()
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route(
        GRAPHQL_PATH,
        get(handlers::graphql_get).post(handlers::graphql_post),
    )
}
