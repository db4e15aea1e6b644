//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application,
//! including the REST API, WebSocket endpoint, and OpenAPI documentation.

use crate::{
    handlers,
    models::{CallbackAck, CallbackResult, ErrorResponse, RegisterCallPayload},
    state::AppState,
    ws::ws_handler,
};

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::fulfill_callback,
        handlers::callback_result,
        handlers::register_call,
    ),
    components(
        schemas(CallbackAck, CallbackResult, RegisterCallPayload, ErrorResponse)
    ),
    tags(
        (name = "Front Desk API", description = "Callback bridge and call registration for the voice front-desk agent")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Group all routes that require AppState into their own router.
    let api_router = Router::new()
        .route("/callbacks/{callback_id}", post(handlers::fulfill_callback))
        .route(
            "/callbacks/{callback_id}/result",
            get(handlers::callback_result),
        )
        .route("/register-call", post(handlers::register_call))
        .route("/llm-websocket/{call_id}", get(ws_handler))
        .with_state(app_state);

    // Merge the stateful routes with the stateless Swagger UI routes.
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api_router)
}
