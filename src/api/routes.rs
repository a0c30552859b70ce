use std::sync::PoisonError;

use axum::{
    routing::get,
    Router,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName},
    response::IntoResponse,
};
use tower_http::cors::{CorsLayer, Any};
use tower_http::trace::TraceLayer;
use chrono::Utc;

use crate::error::{AppError, Result};
use crate::api::models::{ListParams, PostParams, RevalidateInfo, RevalidateResponse};
use crate::api::response;
use crate::transport::{CachePolicy, POSTS_TAG};
use crate::AppState;

/// Header carrying the shared revalidation secret.
pub const REVALIDATE_HEADER: &str = "x-vercel-reval-key";

/// Rendered paths that depend on CMS content.
const REVALIDATED_PATHS: [&str; 2] = ["/", "/posts/[slug]"];

pub fn create_router(app_state: AppState) -> Router {
    Router::new()
        .route("/api/posts", get(list_posts_handler))
        .route("/api/posts/:slug", get(post_handler))
        .route("/api/preview/:slug", get(preview_handler))
        .route("/api/metrics", get(metrics_handler))
        .route(
            "/api/revalidate",
            get(revalidate_info_handler).post(revalidate_handler),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(app_state)
}

fn cache_headers(preview: bool) -> [(HeaderName, String); 2] {
    let policy = CachePolicy::for_preview(preview);
    [
        (header::CACHE_CONTROL, policy.cache_control()),
        (HeaderName::from_static("cache-tag"), policy.tags.join(",")),
    ]
}

async fn list_posts_handler(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse> {
    let posts = state.posts.get_all_posts(params.draft).await?;
    tracing::debug!(count = posts.len(), draft = params.draft, "listed posts");
    Ok((cache_headers(params.draft), response::success(posts)))
}

async fn post_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<PostParams>,
) -> impl IntoResponse {
    let result = state.posts.get_post_and_more_posts(&slug, params.preview).await;
    (cache_headers(params.preview), response::success(result))
}

async fn preview_handler(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse> {
    let post = state
        .posts
        .get_preview_post_by_slug(&slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("post `{}`", slug)))?;
    Ok((cache_headers(true), response::success(post)))
}

async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    response::success(state.posts.coordinator().metrics())
}

async fn revalidate_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse> {
    let provided = headers
        .get(REVALIDATE_HEADER)
        .and_then(|value| value.to_str().ok());

    match (provided, state.config.revalidate_secret.as_deref()) {
        (Some(provided), Some(secret)) if provided == secret => {}
        _ => {
            tracing::warn!("rejected revalidation request");
            return Err(AppError::Unauthorized);
        }
    }

    let now = Utc::now();
    *state
        .last_revalidated
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = Some(now);
    tracing::info!(tag = POSTS_TAG, paths = ?REVALIDATED_PATHS, "cache revalidated");

    Ok(response::success(RevalidateResponse {
        revalidated: true,
        now,
        tags: vec![POSTS_TAG.to_string()],
        paths: REVALIDATED_PATHS.iter().map(|p| p.to_string()).collect(),
    }))
}

async fn revalidate_info_handler(State(state): State<AppState>) -> impl IntoResponse {
    let last_revalidated_at = *state
        .last_revalidated
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    response::success(RevalidateInfo {
        message: "Cache revalidation endpoint".to_string(),
        method: "POST".to_string(),
        header: REVALIDATE_HEADER.to_string(),
        last_revalidated_at,
    })
}
