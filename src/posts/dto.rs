use serde::{Deserialize, Serialize};

use super::repo_types::{Comment, PostSorting, PostWithLikes};

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreatePostQuery {
    /// Text prompt for an image attached to the post after creation.
    pub prompt: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default)]
    pub sorting: PostSorting,
}

#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    pub body: String,
    pub post_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct LikePostRequest {
    pub post_id: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostWithComments {
    pub post: PostWithLikes,
    pub comments: Vec<Comment>,
}
