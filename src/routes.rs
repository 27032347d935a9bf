// src/routes.rs

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::{
    cors::CorsLayer,
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

use crate::{
    handlers::{admin, attempts, auth, dashboard, papers, sessions},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, papers, sessions, attempts, admin).
/// * Applies global middleware (Trace, CORS).
/// * Serves the frontend bundle when `STATIC_DIR` is configured.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().expect("valid origin"),
        "http://127.0.0.1:3000".parse().expect("valid origin"),
        "http://localhost:5173".parse().expect("valid origin"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/me", get(auth::me))
                .layer(auth_layer.clone()),
        );

    let paper_routes = Router::new()
        .route("/", get(papers::list_papers))
        .route("/{id}", get(papers::get_paper))
        .route("/{id}/leaderboard", get(papers::get_leaderboard))
        // Starting a session requires a logged-in user
        .merge(
            Router::new()
                .route("/{id}/sessions", post(sessions::start_session))
                .layer(auth_layer.clone()),
        );

    let session_routes = Router::new()
        .route(
            "/{id}",
            get(sessions::get_session).delete(sessions::abandon_session),
        )
        .route("/{id}/answers", put(sessions::set_answer))
        .route("/{id}/answers/{question_id}", delete(sessions::clear_answer))
        .route("/{id}/marks/{question_id}", post(sessions::toggle_mark))
        .route("/{id}/navigate", post(sessions::navigate))
        .route("/{id}/submit", post(sessions::submit_session))
        .layer(auth_layer.clone());

    let attempt_routes = Router::new()
        .route("/", get(attempts::list_my_attempts))
        .route("/{id}", get(attempts::get_attempt))
        .layer(auth_layer.clone());

    let dashboard_routes = Router::new()
        .route("/", get(dashboard::get_dashboard))
        .layer(auth_layer.clone());

    let admin_routes = Router::new()
        .route("/users", get(admin::list_users))
        .route(
            "/users/{id}",
            put(admin::update_user).delete(admin::delete_user),
        )
        .route("/papers", post(admin::create_paper))
        .route(
            "/papers/{id}",
            put(admin::update_paper).delete(admin::delete_paper),
        )
        .route("/papers/{id}/questions", post(admin::create_question))
        .route(
            "/questions/{id}",
            put(admin::update_question).delete(admin::delete_question),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(auth_layer);

    let mut router = Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/papers", paper_routes)
        .nest("/api/sessions", session_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/dashboard", dashboard_routes)
        .nest("/api/admin", admin_routes);

    if let Some(dir) = &state.config.static_dir {
        // Unknown paths fall back to index.html so client-side routes resolve
        let index = format!("{}/index.html", dir);
        router = router.fallback_service(ServeDir::new(dir).fallback(ServeFile::new(index)));
    }

    router
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
