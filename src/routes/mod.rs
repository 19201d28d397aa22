pub mod health;
pub mod lookup;
pub mod session;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::rate_limit::{rps_middleware, RateLimiter};
use crate::AppState;

pub fn build_router(state: AppState, public_rps: u32) -> Router {
    let public_api = Router::new()
        .route("/api/verify", post(lookup::verify_identity))
        .route("/api/tests/:test_id/questions", get(lookup::list_questions))
        .route("/api/sessions", post(session::create_session))
        .route(
            "/api/sessions/:id",
            get(session::get_session).delete(session::delete_session),
        )
        .route("/api/sessions/:id/verify", post(session::verify_session))
        .route("/api/sessions/:id/start", post(session::start_session))
        .route("/api/sessions/:id/answers", put(session::save_answer))
        .route("/api/sessions/:id/flags/:index", post(session::toggle_flag))
        .route("/api/sessions/:id/finish", post(session::finish_test))
        .route("/api/sessions/:id/next", post(session::next_test))
        .route("/api/sessions/:id/reset", post(session::reset_session))
        .layer(axum::middleware::from_fn_with_state(
            RateLimiter::new(public_rps),
            rps_middleware,
        ));

    Router::new()
        .route("/health", get(health::health))
        .merge(public_api)
        .layer(
            CorsLayer::new()
                .allow_methods(Any)
                .allow_headers(Any)
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
