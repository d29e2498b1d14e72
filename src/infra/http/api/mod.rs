pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod state;

pub use state::ApiState;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::infra::http::RouterState;

/// JSON API. Content, subscription and taxonomy reads are public; post
/// management, taxonomy writes and the subscriber count sit behind
/// [`middleware::admin_auth`].
pub fn build_api_router(state: RouterState) -> Router<RouterState> {
    let public = Router::new()
        .route("/api/content/{locale}/posts", get(handlers::latest_posts))
        .route(
            "/api/content/{locale}/posts/featured",
            get(handlers::featured_post),
        )
        .route(
            "/api/content/{locale}/posts/{slug}",
            get(handlers::post_detail),
        )
        .route(
            "/api/content/{locale}/categories",
            get(handlers::localized_categories),
        )
        .route(
            "/api/content/{locale}/categories/{slug}",
            get(handlers::localized_category),
        )
        .route(
            "/api/content/{locale}/tags",
            get(handlers::localized_tags),
        )
        .route(
            "/api/content/{locale}/tags/{slug}",
            get(handlers::localized_tag),
        )
        .route("/api/subscribe", post(handlers::subscribe))
        .route("/api/unsubscribe", get(handlers::unsubscribe))
        .route("/api/categories", get(handlers::list_categories))
        .route("/api/tags", get(handlers::list_tags))
        .route(
            "/api/admin/session",
            post(handlers::open_session).delete(handlers::close_session),
        );

    let admin = Router::new()
        .route(
            "/api/posts",
            get(handlers::list_posts)
                .post(handlers::create_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route("/api/categories", post(handlers::upsert_category))
        .route("/api/tags", post(handlers::upsert_tag))
        .route("/api/subscribers/count", get(handlers::subscriber_count))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::admin_auth,
        ));

    public.merge(admin)
}
