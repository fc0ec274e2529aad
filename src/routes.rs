// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::Method,
    middleware,
    routing::{delete, get, patch, post},
};
use tower_governor::{GovernorLayer, governor::GovernorConfigBuilder};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{auth, catalog, comments, reviews, titles, users},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Anonymous reads for the catalog and user-generated content.
/// * Authenticated writes for reviews, comments and /users/me.
/// * Admin-gated catalog writes and account management.
/// * Rate-limited signup/token endpoints (each signup sends an email).
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(5)
            .burst_size(50)
            .finish()
            .unwrap(),
    );

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/token", post(auth::token))
        .layer(GovernorLayer::new(governor_conf));

    let public_routes = Router::new()
        .route("/categories", get(catalog::list_categories))
        .route("/genres", get(catalog::list_genres))
        .route("/titles", get(titles::list_titles))
        .route("/titles/{title_id}", get(titles::get_title))
        .route("/titles/{title_id}/reviews", get(reviews::list_reviews))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            get(reviews::get_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            get(comments::list_comments),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            get(comments::get_comment),
        );

    // Writes on user-generated content: any authenticated user may create;
    // ownership and role checks happen in the handlers.
    let content_routes = Router::new()
        .route("/titles/{title_id}/reviews", post(reviews::create_review))
        .route(
            "/titles/{title_id}/reviews/{review_id}",
            patch(reviews::update_review).delete(reviews::delete_review),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments",
            post(comments::create_comment),
        )
        .route(
            "/titles/{title_id}/reviews/{review_id}/comments/{comment_id}",
            patch(comments::update_comment).delete(comments::delete_comment),
        )
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let admin_routes = Router::new()
        .route("/categories", post(catalog::create_category))
        .route("/categories/{slug}", delete(catalog::delete_category))
        .route("/genres", post(catalog::create_genre))
        .route("/genres/{slug}", delete(catalog::delete_genre))
        .route("/titles", post(titles::create_title))
        .route(
            "/titles/{title_id}",
            patch(titles::update_title).delete(titles::delete_title),
        )
        .route("/users", get(users::list_users).post(users::create_user))
        .route(
            "/users/{username}",
            get(users::get_user)
                .patch(users::update_user)
                .delete(users::delete_user),
        )
        // Double middleware protection: Auth first, then Admin check
        .layer(middleware::from_fn(admin_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .merge(public_routes)
        .merge(content_routes)
        .merge(admin_routes);

    Router::new()
        .nest("/api/v1", api)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
