use async_graphql::{http::GraphiQLSource, ServerError};
use axum::{
    extract::{RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{instrument, warn};

use super::{AppSchema, GRAPHQL_PATH};

#[instrument(skip(schema, request))]
pub async fn graphql_post(
    State(schema): State<AppSchema>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    Json(schema.execute(request).await)
}

/// GET with a query string executes it; a bare GET serves GraphiQL.
#[instrument(skip(schema))]
pub async fn graphql_get(
    State(schema): State<AppSchema>,
    RawQuery(query): RawQuery,
) -> Response {
    let Some(query) = query.filter(|q| !q.is_empty()) else {
        return Html(GraphiQLSource::build().endpoint(GRAPHQL_PATH).finish()).into_response();
    };

    match async_graphql::http::parse_query_string(&query) {
        Ok(request) => Json(schema.execute(request).await).into_response(),
        Err(e) => {
            warn!(error = %e, "invalid graphql query string");
            let body = async_graphql::Response::from_errors(vec![ServerError::new(
                e.to_string(),
                None,
            )]);
            (StatusCode::BAD_REQUEST, Json(body)).into_response()
        }
    }
}
