use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument};

use super::{
    dto::{
        CreateCommentRequest, CreatePostQuery, CreatePostRequest, LikePostRequest, ListPostsQuery,
        PostWithComments,
    },
    repo::PostRepo,
    repo_types::{Comment, Like, Post, PostWithLikes},
};
use crate::{auth::extractors::CurrentUser, state::AppState, tasks::Job};

// --- public routers ---

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/post", get(list_posts))
        .route("/post/:id", get(get_post_with_comments))
        .route("/post/:id/comment", get(list_comments))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/post", post(create_post))
        .route("/comment", post(create_comment))
        .route("/like", post(like_post))
}

// --- handlers ---

#[instrument(skip(state, user, payload))]
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(q): Query<CreatePostQuery>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<Post>), (StatusCode, String)> {
    if payload.body.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "body is required".into()));
    }

    let post = state
        .db
        .create_post(user.id, &payload.body)
        .await
        .map_err(internal)?;
    info!(post_id = post.id, user_id = user.id, "post created");

    if let Some(prompt) = q.prompt.filter(|p| !p.trim().is_empty()) {
        state.tasks.enqueue(Job::GeneratePostImage {
            email: user.email,
            post_id: post.id,
            post_url: format!("{}/post/{}", state.config.public_base_url, post.id),
            prompt,
        });
    }

    Ok((StatusCode::CREATED, Json(post)))
}

#[instrument(skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(q): Query<ListPostsQuery>,
) -> Result<Json<Vec<PostWithLikes>>, (StatusCode, String)> {
    let posts = state.db.list_posts(q.sorting).await.map_err(internal)?;
    Ok(Json(posts))
}

#[instrument(skip(state))]
pub async fn get_post_with_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostWithComments>, (StatusCode, String)> {
    let Some(post) = state.db.find_post_with_likes(id).await.map_err(internal)? else {
        return Err(not_found());
    };
    let comments = state.db.list_comments(id).await.map_err(internal)?;
    Ok(Json(PostWithComments { post, comments }))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Vec<Comment>>, (StatusCode, String)> {
    let comments = state.db.list_comments(id).await.map_err(internal)?;
    Ok(Json(comments))
}

#[instrument(skip(state, user, payload))]
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), (StatusCode, String)> {
    ensure_post_exists(&state, payload.post_id).await?;

    let comment = state
        .db
        .create_comment(payload.post_id, user.id, &payload.body)
        .await
        .map_err(internal)?;
    info!(comment_id = comment.id, post_id = comment.post_id, "comment created");
    Ok((StatusCode::CREATED, Json(comment)))
}

#[instrument(skip(state, user, payload))]
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<LikePostRequest>,
) -> Result<(StatusCode, Json<Like>), (StatusCode, String)> {
    ensure_post_exists(&state, payload.post_id).await?;

    let like = state
        .db
        .create_like(payload.post_id, user.id)
        .await
        .map_err(internal)?;
    info!(post_id = like.post_id, user_id = user.id, "post liked");
    Ok((StatusCode::CREATED, Json(like)))
}

async fn ensure_post_exists(state: &AppState, post_id: i64) -> Result<(), (StatusCode, String)> {
    match state.db.find_post(post_id).await.map_err(internal)? {
        Some(_) => Ok(()),
        None => Err(not_found()),
    }
}

fn not_found() -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, "Post not found".into())
}

fn internal(e: anyhow::Error) -> (StatusCode, String) {
    error!(error = %format!("{e:#}"), "post store error");
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
}
